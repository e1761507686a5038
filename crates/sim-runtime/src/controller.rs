//! Period controller: the one place that advances time.
//!
//! The ordering inside an advance is load-bearing: arrivals, then
//! quotational repricing, then settlements, then futures mark-to-market.
//! Settling before repricing would realize P&L off a stale provisional
//! cost.

use crate::events::{FinalReport, Grade, PeriodSummary, SimEvent};
use crate::{GamePhase, Simulation};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sim_core::SimError;
use tracing::info;

/// Result of one `advance_period` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AdvanceOutcome {
    /// The game moved to the next period.
    Advanced(PeriodSummary),
    /// The final turn had been played; the game is over.
    Ended(FinalReport),
}

impl Simulation {
    /// Advance one period, or end the game if the final turn has been
    /// played. Non-reentrant: a second call while one is in flight fails
    /// with `AdvanceInProgress`. After the game has ended every further
    /// call fails with `GameAlreadyEnded`.
    pub fn advance_period(&mut self) -> Result<AdvanceOutcome, SimError> {
        self.ensure_active()?;
        if self.advancing {
            return Err(SimError::AdvanceInProgress);
        }
        self.advancing = true;
        let result = self.advance_inner();
        self.advancing = false;
        result
    }

    fn advance_inner(&mut self) -> Result<AdvanceOutcome, SimError> {
        if self.state.turn >= self.calendar.final_turn() {
            let report = self.final_report();
            self.state.phase = GamePhase::Ended;
            info!(
                total_pnl = %report.total_pnl,
                roi = %report.roi,
                grade = ?report.grade,
                "game ended"
            );
            self.emit(SimEvent::GameEnded(report.clone()));
            return Ok(AdvanceOutcome::Ended(report));
        }

        let old = self.state.current;
        let next = self
            .calendar
            .advance(old)?
            .ok_or(SimError::GameAlreadyEnded)?;
        let new_month = self.calendar.month_boundary_crossed(old, next);
        if new_month {
            // Fail before mutating anything if the month's data is absent.
            self.scenario.market.month_data(next.month)?;
            self.state.limits.reset();
        }
        self.state.current = next;
        self.state.turn = self.calendar.turn_of(next)?;

        // Interest accrued on last period's credit balance is charged
        // every period, not only on month boundaries.
        let interest_charged = self.state.ledger.charge_accrued_interest();

        let arrivals = self.update_status(self.state.turn)?;
        let repriced = self.reprice_pending(self.state.current.month)?;
        let settlements = self.process_settlements(self.state.turn)?;
        let expiries = self.mark_to_market(self.state.turn)?;
        self.state
            .ledger
            .accrue_interest(self.scenario.interest_rate_per_period);

        let summary = PeriodSummary {
            period: self.state.current,
            turn: self.state.turn,
            new_month,
            arrivals,
            repriced,
            settlements,
            expiries,
            interest_charged,
        };
        info!(
            period = %summary.period,
            turn = summary.turn,
            arrivals = summary.arrivals.len(),
            repriced = summary.repriced.len(),
            settlements = summary.settlements.len(),
            expiries = summary.expiries.closed.len(),
            "period advanced"
        );
        self.emit(SimEvent::PeriodAdvanced(summary.clone()));
        Ok(AdvanceOutcome::Advanced(summary))
    }

    fn final_report(&self) -> FinalReport {
        let ledger = &self.state.ledger;
        let total = ledger.total_pnl();
        let roi = if self.scenario.starting_cash > Decimal::ZERO {
            total / self.scenario.starting_cash
        } else {
            Decimal::ZERO
        };
        FinalReport {
            physical_pnl: ledger.physical_pnl,
            futures_pnl: ledger.futures_pnl,
            total_pnl: total,
            roi,
            grade: Grade::from_roi(roi),
        }
    }
}
