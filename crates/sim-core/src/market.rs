//! Per-month market data: exchange price curves, supplier capacity, buyer
//! demand, and freight lanes.
//!
//! The simulation consumes this data and never mutates it. Lookups go
//! through [`MarketData::month_data`], a typed month-indexed accessor
//! validated once at scenario load; a missing month at runtime is a fatal
//! configuration error, not something to paper over.

use crate::error::SimError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Identifier of a metals exchange, e.g. "LME" or "SHFE".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExchangeId(pub String);

/// Identifier of a supplier (mine or smelter).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SupplierId(pub String);

/// Identifier of a buyer region.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId(pub String);

/// Identifier of a port, e.g. "Callao".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub String);

/// Futures contract tenor: periods-ahead average pricing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ContractTenor {
    /// One month ahead.
    M1,
    /// Three months ahead.
    M3,
    /// Twelve months ahead.
    M12,
}

impl ContractTenor {
    /// Months until expiry for a contract opened now.
    pub fn offset_months(self) -> u32 {
        match self {
            ContractTenor::M1 => 1,
            ContractTenor::M3 => 3,
            ContractTenor::M12 => 12,
        }
    }
}

impl std::fmt::Display for ContractTenor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractTenor::M1 => write!(f, "M+1"),
            ContractTenor::M3 => write!(f, "M+3"),
            ContractTenor::M12 => write!(f, "M+12"),
        }
    }
}

/// One exchange's price curve for a month, in USD per tonne.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeCurve {
    /// Spot (cash) price.
    pub spot: Decimal,
    /// One-month futures price.
    pub m1: Decimal,
    /// Three-month futures price.
    pub m3: Decimal,
    /// Twelve-month futures price.
    pub m12: Decimal,
    /// Finalized monthly average of the M+1 price, used to settle
    /// quotational pricing for lots whose QP month this is.
    pub m1_settlement_avg: Decimal,
}

impl ExchangeCurve {
    /// Price for a contract tenor.
    pub fn tenor_price(&self, tenor: ContractTenor) -> Decimal {
        match tenor {
            ContractTenor::M1 => self.m1,
            ContractTenor::M3 => self.m3,
            ContractTenor::M12 => self.m12,
        }
    }
}

/// A shipping lane between two ports with this month's freight rate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FreightLane {
    /// Load port.
    pub origin: PortId,
    /// Discharge port.
    pub destination: PortId,
    /// Freight cost in USD per tonne.
    pub cost_per_tonne: Decimal,
    /// Transit time in days.
    pub travel_days: u32,
}

/// All externally supplied market data for one month.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthData {
    /// Month index this document covers.
    pub month: u32,
    /// Price curves per exchange.
    pub curves: BTreeMap<ExchangeId, ExchangeCurve>,
    /// Maximum purchasable tonnage per supplier this month.
    pub supply_limits: BTreeMap<SupplierId, u32>,
    /// Maximum sellable tonnage per buyer region this month.
    pub demand_limits: BTreeMap<RegionId, u32>,
    /// Freight lanes available this month.
    pub freight: Vec<FreightLane>,
}

impl MonthData {
    /// Curve for an exchange, or `DataNotFound` for the month if the
    /// exchange is missing (validation should have caught this).
    pub fn curve(&self, exchange: &ExchangeId) -> Result<&ExchangeCurve, SimError> {
        self.curves
            .get(exchange)
            .ok_or(SimError::DataNotFound(self.month))
    }

    /// Freight lane between two ports, if one exists this month.
    pub fn lane(&self, origin: &PortId, destination: &PortId) -> Option<&FreightLane> {
        self.freight
            .iter()
            .find(|l| &l.origin == origin && &l.destination == destination)
    }
}

/// Contract terms for futures trading, fixed per scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuturesSpec {
    /// Tonnes per contract.
    pub contract_size_tonnes: u32,
    /// Dollars of P&L per contract per dollar of price move.
    pub price_multiplier: Decimal,
    /// Fee charged per contract on open and on close.
    pub fee_per_contract: Decimal,
    /// Margin per net (unhedged) contract.
    pub full_margin_per_contract: Decimal,
    /// Margin per offset pair; a small fraction of the full margin.
    pub offset_margin_per_contract: Decimal,
}

/// Errors found while validating loaded market data.
#[derive(Debug, Error, PartialEq)]
pub enum MarketDataError {
    /// Months must run 1, 2, 3, ... with no gaps.
    #[error("month documents are not contiguous: expected month {expected}, found {found}")]
    NonContiguousMonth { expected: u32, found: u32 },
    /// Every exchange must appear in every month.
    #[error("exchange {0} missing from month {1}")]
    MissingExchange(String, u32),
    /// Prices and freight rates must be non-negative.
    #[error("negative price in month {0}")]
    NegativePrice(u32),
    /// A scenario needs at least one month of data.
    #[error("no month documents")]
    Empty,
}

/// Month-indexed store of market documents, validated at load time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    months: Vec<MonthData>,
}

impl MarketData {
    /// Validate and take ownership of month documents. Months must be
    /// contiguous from 1, every month must carry every exchange seen in
    /// month 1, and all prices must be non-negative.
    pub fn new(months: Vec<MonthData>) -> Result<Self, MarketDataError> {
        let first = months.first().ok_or(MarketDataError::Empty)?;
        let exchanges: Vec<ExchangeId> = first.curves.keys().cloned().collect();
        for (i, doc) in months.iter().enumerate() {
            let expected = i as u32 + 1;
            if doc.month != expected {
                return Err(MarketDataError::NonContiguousMonth {
                    expected,
                    found: doc.month,
                });
            }
            for ex in &exchanges {
                let curve = doc
                    .curves
                    .get(ex)
                    .ok_or_else(|| MarketDataError::MissingExchange(ex.0.clone(), doc.month))?;
                let prices = [curve.spot, curve.m1, curve.m3, curve.m12, curve.m1_settlement_avg];
                if prices.iter().any(|p| *p < Decimal::ZERO) {
                    return Err(MarketDataError::NegativePrice(doc.month));
                }
            }
            if doc.freight.iter().any(|l| l.cost_per_tonne < Decimal::ZERO) {
                return Err(MarketDataError::NegativePrice(doc.month));
            }
        }
        Ok(Self { months })
    }

    /// Number of months covered.
    pub fn len_months(&self) -> u32 {
        self.months.len() as u32
    }

    /// Document for a month, or `DataNotFound`.
    pub fn month_data(&self, month: u32) -> Result<&MonthData, SimError> {
        if month == 0 {
            return Err(SimError::DataNotFound(month));
        }
        self.months
            .get((month - 1) as usize)
            .ok_or(SimError::DataNotFound(month))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(base: i64) -> ExchangeCurve {
        ExchangeCurve {
            spot: Decimal::new(base, 0),
            m1: Decimal::new(base + 20, 0),
            m3: Decimal::new(base + 50, 0),
            m12: Decimal::new(base + 120, 0),
            m1_settlement_avg: Decimal::new(base + 10, 0),
        }
    }

    fn doc(month: u32) -> MonthData {
        let mut curves = BTreeMap::new();
        curves.insert(ExchangeId("LME".into()), curve(9000));
        MonthData {
            month,
            curves,
            supply_limits: BTreeMap::new(),
            demand_limits: BTreeMap::new(),
            freight: Vec::new(),
        }
    }

    #[test]
    fn accessor_finds_loaded_months_only() {
        let md = MarketData::new(vec![doc(1), doc(2)]).unwrap();
        assert_eq!(md.month_data(2).unwrap().month, 2);
        assert_eq!(md.month_data(3), Err(SimError::DataNotFound(3)));
        assert_eq!(md.month_data(0), Err(SimError::DataNotFound(0)));
    }

    #[test]
    fn gaps_in_months_are_rejected() {
        let err = MarketData::new(vec![doc(1), doc(3)]).unwrap_err();
        assert_eq!(
            err,
            MarketDataError::NonContiguousMonth {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn missing_exchange_is_rejected() {
        let mut second = doc(2);
        second.curves.clear();
        let err = MarketData::new(vec![doc(1), second]).unwrap_err();
        assert_eq!(err, MarketDataError::MissingExchange("LME".into(), 2));
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut bad = doc(1);
        bad.curves.get_mut(&ExchangeId("LME".into())).unwrap().m3 = Decimal::new(-1, 0);
        assert_eq!(
            MarketData::new(vec![bad]).unwrap_err(),
            MarketDataError::NegativePrice(1)
        );
    }

    #[test]
    fn serde_roundtrip_month_doc() {
        let d = doc(1);
        let s = serde_json::to_string(&d).unwrap();
        let back: MonthData = serde_json::from_str(&s).unwrap();
        assert_eq!(back, d);
    }
}
