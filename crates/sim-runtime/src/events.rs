//! Change notifications emitted by the simulation.
//!
//! Consumers (UI, map, persistence) subscribe an [`Observer`] on the
//! simulation aggregate; there is no global event bus. Events carry owned
//! data so a consumer can update without re-querying simulation state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::{FuturesId, Period, PhysicalPosition, PositionId, PositionStatus};

/// Receives simulation events. Observers only read; they cannot reach back
/// into the simulation while an event is being dispatched.
pub trait Observer {
    fn on_event(&mut self, event: &SimEvent);
}

/// One settled physical lot, as reported in a period summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettlementReport {
    pub id: PositionId,
    pub tonnage: u32,
    /// Contracted sale revenue.
    pub revenue: Decimal,
    /// Final cost of the settled tonnage.
    pub cost: Decimal,
    /// Revenue minus cost, added to cumulative physical P&L.
    pub profit: Decimal,
    /// Credit returned to the ledger out of the proceeds.
    pub credit_repaid: Decimal,
}

/// Combined result of all futures positions force-closed this period.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpirySummary {
    pub closed: Vec<FuturesId>,
    /// Sum of settled P&L across the simultaneous expiries, net of fees.
    pub pnl: Decimal,
    /// Closing fees charged.
    pub fees: Decimal,
}

/// Everything that changed during one period advance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    /// The period just entered.
    pub period: Period,
    pub turn: u32,
    /// Whether this advance crossed into a new month.
    pub new_month: bool,
    /// Lots that reached their arrival turn.
    pub arrivals: Vec<PositionId>,
    /// Lots whose quotational pricing was finalized.
    pub repriced: Vec<PositionId>,
    /// Lots settled and removed from the book.
    pub settlements: Vec<SettlementReport>,
    /// Futures force-closed at expiry.
    pub expiries: ExpirySummary,
    /// Credit interest charged at the start of this period.
    pub interest_charged: Decimal,
}

/// Letter grade for the final report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Grade from return on starting capital.
    pub fn from_roi(roi: Decimal) -> Self {
        if roi >= Decimal::new(50, 2) {
            Grade::A
        } else if roi >= Decimal::new(25, 2) {
            Grade::B
        } else if roi >= Decimal::new(5, 2) {
            Grade::C
        } else if roi >= Decimal::ZERO {
            Grade::D
        } else {
            Grade::F
        }
    }
}

/// Final results reported when the scenario's last turn has been played.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub physical_pnl: Decimal,
    pub futures_pnl: Decimal,
    pub total_pnl: Decimal,
    /// Total P&L over starting capital.
    pub roi: Decimal,
    pub grade: Grade,
}

/// Notifications pushed to subscribed observers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    /// A physical position entered the book (purchase, or the remainder of
    /// a partial sale).
    PositionCreated(PhysicalPosition),
    /// A lot's transit status changed.
    PositionStatusChanged {
        id: PositionId,
        status: PositionStatus,
    },
    /// Quotational pricing finalized; pairs of (id, final cost per tonne).
    PositionsRepriced(Vec<(PositionId, Decimal)>),
    /// A full period advance completed.
    PeriodAdvanced(PeriodSummary),
    /// The scenario's final turn has been played out. Emitted exactly once.
    GameEnded(FinalReport),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_thresholds() {
        assert_eq!(Grade::from_roi(Decimal::new(60, 2)), Grade::A);
        assert_eq!(Grade::from_roi(Decimal::new(50, 2)), Grade::A);
        assert_eq!(Grade::from_roi(Decimal::new(30, 2)), Grade::B);
        assert_eq!(Grade::from_roi(Decimal::new(10, 2)), Grade::C);
        assert_eq!(Grade::from_roi(Decimal::ZERO), Grade::D);
        assert_eq!(Grade::from_roi(Decimal::new(-1, 2)), Grade::F);
    }
}
