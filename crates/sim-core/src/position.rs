//! Physical and futures position records.
//!
//! A physical position tracks a purchased lot of metal from purchase
//! through transit, optional sale, and settlement. Transit status and sale
//! status are independent axes: a lot can arrive unsold, and it can be sold
//! (and even settle) while still on the water. A futures position is a
//! leveraged bet on one exchange's curve at a fixed tenor.

use crate::clock::Period;
use crate::market::{ContractTenor, ExchangeId, PortId, RegionId, SupplierId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Unique id for a physical position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub u64);

/// Unique id for a futures position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FuturesId(pub u64);

/// Who pays the freight on a physical trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingBasis {
    /// Free on board: quoted cost excludes freight.
    Fob,
    /// Cost, insurance and freight: quoted cost includes freight.
    Cif,
}

/// Transit status of a physical lot. Time-driven and irreversible.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    InTransit,
    Arrived,
}

/// Sale terms attached to a lot awaiting settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    /// Buyer region.
    pub region: RegionId,
    /// Agreed sale price per tonne.
    pub price_per_tonne: Decimal,
    /// Total contracted revenue.
    pub total_revenue: Decimal,
    /// Period the sale was struck.
    pub sale_period: Period,
    /// Period the cash settles and the lot leaves the book.
    pub settlement_period: Period,
}

/// A purchased, still-tracked lot of metal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalPosition {
    pub id: PositionId,
    pub supplier: SupplierId,
    /// Load port.
    pub origin: PortId,
    /// Discharge port.
    pub destination: PortId,
    /// Tonnes in the lot; changes only by partial sale, which splits it.
    pub tonnage: u32,
    /// Exchange whose curve prices this lot.
    pub exchange: ExchangeId,
    pub basis: ShippingBasis,
    pub purchase_period: Period,
    /// Transit time in days.
    pub travel_days: u32,
    /// Derived from purchase period plus travel time.
    pub arrival_period: Period,
    /// Quotational-pricing month: purchase month + 1.
    pub qp_month: u32,
    /// Cost per tonne: provisional until finalized.
    pub cost_per_tonne: Decimal,
    /// Tonnage times cost per tonne.
    pub total_cost: Decimal,
    /// Fixed over-exchange component (supplier premium plus freight)
    /// captured from the original trade terms; re-applied verbatim at
    /// finalization.
    pub premium_freight_per_tonne: Decimal,
    /// Set exactly once, when the QP month has fully elapsed.
    pub finalized: bool,
    /// Credit portion of the purchase draw, repaid pro rata at settlement.
    pub credit_drawn: Decimal,
    pub status: PositionStatus,
    /// Present once sold; the lot is then pending settlement.
    pub sale: Option<Sale>,
}

impl PhysicalPosition {
    /// Whether the lot has been sold and awaits settlement.
    pub fn is_sold(&self) -> bool {
        self.sale.is_some()
    }
}

/// Side of a futures bet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short; multiplies into P&L.
    pub fn sign(self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => -Decimal::ONE,
        }
    }
}

/// An open futures position, marked to market every period.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FuturesPosition {
    pub id: FuturesId,
    pub exchange: ExchangeId,
    pub tenor: ContractTenor,
    pub direction: Direction,
    /// Number of contracts (> 0).
    pub contracts: u32,
    /// Contracts times the scenario contract size.
    pub tonnage: u32,
    /// Tenor price at open.
    pub entry_price: Decimal,
    /// Latest marked tenor price.
    pub current_price: Decimal,
    /// `(current - entry) * multiplier * contracts * sign`.
    pub unrealized_pnl: Decimal,
    pub open_period: Period,
    /// Turn at which the position is force-closed; open turn plus the
    /// tenor offset, capped at the scenario's final turn.
    pub expiry_turn: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SubPeriod;

    #[test]
    fn direction_signs() {
        assert_eq!(Direction::Long.sign(), Decimal::ONE);
        assert_eq!(Direction::Short.sign(), -Decimal::ONE);
    }

    #[test]
    fn serde_roundtrip_physical_position() {
        let p = PhysicalPosition {
            id: PositionId(7),
            supplier: SupplierId("callao-mining".into()),
            origin: PortId("Callao".into()),
            destination: PortId("Shanghai".into()),
            tonnage: 5,
            exchange: ExchangeId("LME".into()),
            basis: ShippingBasis::Cif,
            purchase_period: Period::new(1, SubPeriod::Early),
            travel_days: 28,
            arrival_period: Period::new(2, SubPeriod::Early),
            qp_month: 2,
            cost_per_tonne: Decimal::new(9_150, 0),
            total_cost: Decimal::new(45_750, 0),
            premium_freight_per_tonne: Decimal::new(130, 0),
            finalized: false,
            credit_drawn: Decimal::ZERO,
            status: PositionStatus::InTransit,
            sale: None,
        };
        let s = serde_json::to_string(&p).unwrap();
        let back: PhysicalPosition = serde_json::from_str(&s).unwrap();
        assert_eq!(back, p);
        assert!(!back.is_sold());
    }
}
