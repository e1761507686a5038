#![deny(warnings)]

//! Scenario model for the trading simulation: counterparties, contract
//! terms, starting balances, and the per-month market documents.
//!
//! A scenario is validated once up front; after that the core may assume
//! every month it will ever ask for exists and every supplier/region pair
//! it quotes has a freight lane. The crate also ships a seeded demo
//! scenario generator so headless runs and tests get a deterministic
//! multi-month market without external data files.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{
    Calendar, ExchangeCurve, ExchangeId, FreightLane, FuturesSpec, MarketData, MarketDataError,
    MonthData, PortId, RegionId, SupplierId,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// A metal supplier the player can buy from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    /// Load port for the supplier's material.
    pub port: PortId,
    /// Premium over the exchange base price, USD per tonne.
    pub premium_per_tonne: Decimal,
    /// Exchange whose curve prices this supplier's material.
    pub exchange: ExchangeId,
}

/// A buyer region the player can sell into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    /// Discharge port for deliveries into the region.
    pub port: PortId,
}

/// Errors found while validating a scenario.
#[derive(Debug, Error, PartialEq)]
pub enum ScenarioError {
    /// Scenario must run at least one month.
    #[error("scenario duration must be >= 1 month")]
    ZeroDuration,
    /// Market data must cover every scenario month.
    #[error("market data covers {have} months, scenario needs {need}")]
    MarketTooShort { need: u32, have: u32 },
    /// Starting balances and limits must be non-negative.
    #[error("negative starting balance or limit")]
    NegativeBalance,
    /// Offset margin must be strictly below full margin for netting to be
    /// a benefit.
    #[error("offset margin per contract must be below full margin")]
    OffsetMarginNotBelowFull,
    /// Futures contracts must cover at least one tonne.
    #[error("contract size must be >= 1 tonne")]
    ZeroContractSize,
    /// Every supplier/region pair needs a freight lane every month.
    #[error("no freight lane {origin} -> {destination} in month {month}")]
    MissingLane {
        origin: String,
        destination: String,
        month: u32,
    },
    /// Underlying market-data validation failure.
    #[error(transparent)]
    Market(#[from] MarketDataError),
}

/// Complete configuration for one game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Display name.
    pub name: String,
    /// Months the game runs.
    pub duration_months: u32,
    /// Player's opening cash.
    pub starting_cash: Decimal,
    /// Credit line ceiling.
    pub credit_limit: Decimal,
    /// Futures margin ceiling.
    pub margin_limit: Decimal,
    /// Interest charged per sub-period on drawn credit.
    pub interest_rate_per_period: Decimal,
    /// Futures contract terms.
    pub futures_spec: FuturesSpec,
    pub suppliers: Vec<Supplier>,
    pub regions: Vec<Region>,
    /// Validated month-indexed market documents.
    pub market: MarketData,
}

impl Scenario {
    /// Calendar implied by the scenario duration.
    pub fn calendar(&self) -> Calendar {
        Calendar::new(self.duration_months)
    }

    /// Look up a supplier by id.
    pub fn supplier(&self, id: &SupplierId) -> Option<&Supplier> {
        self.suppliers.iter().find(|s| &s.id == id)
    }

    /// Look up a region by id.
    pub fn region(&self, id: &RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| &r.id == id)
    }

    /// Check all cross-references and numeric preconditions.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.duration_months == 0 {
            return Err(ScenarioError::ZeroDuration);
        }
        if self.market.len_months() < self.duration_months {
            return Err(ScenarioError::MarketTooShort {
                need: self.duration_months,
                have: self.market.len_months(),
            });
        }
        if self.starting_cash < Decimal::ZERO
            || self.credit_limit < Decimal::ZERO
            || self.margin_limit < Decimal::ZERO
            || self.interest_rate_per_period < Decimal::ZERO
        {
            return Err(ScenarioError::NegativeBalance);
        }
        let spec = &self.futures_spec;
        if spec.contract_size_tonnes == 0 {
            return Err(ScenarioError::ZeroContractSize);
        }
        if spec.offset_margin_per_contract >= spec.full_margin_per_contract {
            return Err(ScenarioError::OffsetMarginNotBelowFull);
        }
        for month in 1..=self.duration_months {
            let doc = self
                .market
                .month_data(month)
                .map_err(|_| ScenarioError::MarketTooShort {
                    need: self.duration_months,
                    have: self.market.len_months(),
                })?;
            for s in &self.suppliers {
                for r in &self.regions {
                    if doc.lane(&s.port, &r.port).is_none() {
                        return Err(ScenarioError::MissingLane {
                            origin: s.port.0.clone(),
                            destination: r.port.0.clone(),
                            month,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Build a deterministic demo scenario: one exchange, two suppliers, two
/// buyer regions, and a seeded random walk over the price curve. The same
/// seed always yields the same scenario.
pub fn demo_scenario(seed: u64) -> Scenario {
    const MONTHS: u32 = 12;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let lme = ExchangeId("LME".to_string());
    let callao = PortId("Callao".to_string());
    let antofagasta = PortId("Antofagasta".to_string());
    let shanghai = PortId("Shanghai".to_string());
    let rotterdam = PortId("Rotterdam".to_string());

    let supplier_a = SupplierId("callao-mining".to_string());
    let supplier_b = SupplierId("atacama-copper".to_string());
    let east_asia = RegionId("east-asia".to_string());
    let europe = RegionId("europe".to_string());

    let mut spot: i64 = 9_000;
    let mut docs = Vec::with_capacity(MONTHS as usize);
    for month in 1..=MONTHS {
        spot = (spot + rng.gen_range(-180..=180)).max(5_000);
        let contango = rng.gen_range(10..=40);
        let avg_noise = rng.gen_range(-25..=25);
        let curve = ExchangeCurve {
            spot: Decimal::new(spot, 0),
            m1: Decimal::new(spot + contango, 0),
            m3: Decimal::new(spot + contango * 3, 0),
            m12: Decimal::new(spot + contango * 9, 0),
            m1_settlement_avg: Decimal::new(spot + contango + avg_noise, 0),
        };
        let mut curves = BTreeMap::new();
        curves.insert(lme.clone(), curve);

        let mut supply_limits = BTreeMap::new();
        supply_limits.insert(supplier_a.clone(), rng.gen_range(40..=80));
        supply_limits.insert(supplier_b.clone(), rng.gen_range(30..=60));
        let mut demand_limits = BTreeMap::new();
        demand_limits.insert(east_asia.clone(), rng.gen_range(50..=90));
        demand_limits.insert(europe.clone(), rng.gen_range(30..=70));

        let freight = vec![
            FreightLane {
                origin: callao.clone(),
                destination: shanghai.clone(),
                cost_per_tonne: Decimal::new(rng.gen_range(55..=75), 0),
                travel_days: 28,
            },
            FreightLane {
                origin: callao.clone(),
                destination: rotterdam.clone(),
                cost_per_tonne: Decimal::new(rng.gen_range(45..=65), 0),
                travel_days: 22,
            },
            FreightLane {
                origin: antofagasta.clone(),
                destination: shanghai.clone(),
                cost_per_tonne: Decimal::new(rng.gen_range(60..=80), 0),
                travel_days: 30,
            },
            FreightLane {
                origin: antofagasta.clone(),
                destination: rotterdam.clone(),
                cost_per_tonne: Decimal::new(rng.gen_range(50..=70), 0),
                travel_days: 24,
            },
        ];

        docs.push(MonthData {
            month,
            curves,
            supply_limits,
            demand_limits,
            freight,
        });
    }

    let market = MarketData::new(docs).expect("generated months are contiguous and non-negative");
    Scenario {
        name: format!("demo-{seed}"),
        duration_months: MONTHS,
        starting_cash: Decimal::new(500_000, 0),
        credit_limit: Decimal::new(300_000, 0),
        margin_limit: Decimal::new(100_000, 0),
        interest_rate_per_period: Decimal::new(5, 3), // 0.5% per sub-period
        futures_spec: FuturesSpec {
            contract_size_tonnes: 25,
            price_multiplier: Decimal::new(25, 0),
            fee_per_contract: Decimal::new(50, 0),
            full_margin_per_contract: Decimal::new(10_000, 0),
            offset_margin_per_contract: Decimal::new(1_500, 0),
        },
        suppliers: vec![
            Supplier {
                id: supplier_a,
                port: callao,
                premium_per_tonne: Decimal::new(95, 0),
                exchange: lme.clone(),
            },
            Supplier {
                id: supplier_b,
                port: antofagasta,
                premium_per_tonne: Decimal::new(80, 0),
                exchange: lme,
            },
        ],
        regions: vec![
            Region {
                id: east_asia,
                port: shanghai,
            },
            Region {
                id: europe,
                port: rotterdam,
            },
        ],
        market,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_scenario_is_valid() {
        let s = demo_scenario(42);
        s.validate().unwrap();
        assert_eq!(s.duration_months, 12);
        assert_eq!(s.market.len_months(), 12);
    }

    #[test]
    fn demo_scenario_is_deterministic() {
        assert_eq!(demo_scenario(7), demo_scenario(7));
        assert_ne!(demo_scenario(7), demo_scenario(8));
    }

    #[test]
    fn short_market_is_rejected() {
        let mut s = demo_scenario(1);
        s.duration_months = 24;
        assert_eq!(
            s.validate(),
            Err(ScenarioError::MarketTooShort { need: 24, have: 12 })
        );
    }

    #[test]
    fn offset_margin_must_be_below_full() {
        let mut s = demo_scenario(1);
        s.futures_spec.offset_margin_per_contract = s.futures_spec.full_margin_per_contract;
        assert_eq!(s.validate(), Err(ScenarioError::OffsetMarginNotBelowFull));
    }

    #[test]
    fn missing_lane_is_reported() {
        let s = demo_scenario(1);
        // Rebuild with a region whose port has no lanes.
        let mut s2 = s.clone();
        s2.regions.push(Region {
            id: RegionId("nowhere".into()),
            port: PortId("Mombasa".into()),
        });
        match s2.validate() {
            Err(ScenarioError::MissingLane {
                destination, month, ..
            }) => {
                assert_eq!(destination, "Mombasa");
                assert_eq!(month, 1);
            }
            other => panic!("expected MissingLane, got {other:?}"),
        }
    }
}
