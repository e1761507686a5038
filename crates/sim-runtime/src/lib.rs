#![deny(warnings)]

//! The simulation aggregate: one owned game session.
//!
//! A [`Simulation`] is constructed once per session from a validated
//! scenario and drives the whole core: the physical-position lifecycle,
//! the futures engine, and the period controller. All commands are
//! `Result`-returning methods; external consumers read snapshots or
//! subscribe an [`Observer`] and never mutate core state directly.
//!
//! Everything runs single-threaded under the period controller's
//! orchestration. A period advance is non-reentrant and uncancellable:
//! it either fully completes or was never started.

mod controller;
mod events;
mod futures;
mod physical;

pub use controller::AdvanceOutcome;
pub use events::{
    ExpirySummary, FinalReport, Grade, Observer, PeriodSummary, SettlementReport, SimEvent,
};
pub use futures::margin_with_netting;

use serde::{Deserialize, Serialize};
use sim_core::{
    Calendar, FuturesPosition, Ledger, MonthlyLimits, Period, PhysicalPosition, PositionId,
    SimError, SubPeriod,
};
use sim_market::{Scenario, ScenarioError};

/// Whether the session is still playable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    Active,
    Ended,
}

/// The full mutable state of a session, separated out so persistence can
/// snapshot and restore it without reaching into the aggregate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub current: Period,
    pub turn: u32,
    pub phase: GamePhase,
    pub ledger: Ledger,
    pub limits: MonthlyLimits,
    pub physical: Vec<PhysicalPosition>,
    pub futures: Vec<FuturesPosition>,
    pub next_position_id: u64,
    pub next_futures_id: u64,
}

/// One game session. Owns the scenario, the ledger, both position books,
/// and the subscribed observers.
pub struct Simulation {
    scenario: Scenario,
    calendar: Calendar,
    state: SimulationState,
    /// Guards against re-entrant advancement through a shared handle.
    advancing: bool,
    observers: Vec<Box<dyn Observer>>,
}

impl Simulation {
    /// Start a fresh session at month 1, early sub-period, turn 1.
    /// Validates the scenario first.
    pub fn new(scenario: Scenario) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let calendar = scenario.calendar();
        let start = Period::new(1, SubPeriod::Early);
        let ledger = Ledger::new(
            scenario.starting_cash,
            scenario.credit_limit,
            scenario.margin_limit,
        );
        Ok(Self {
            scenario,
            calendar,
            state: SimulationState {
                current: start,
                turn: 1,
                phase: GamePhase::Active,
                ledger,
                limits: MonthlyLimits::new(),
                physical: Vec::new(),
                futures: Vec::new(),
                next_position_id: 1,
                next_futures_id: 1,
            },
            advancing: false,
            observers: Vec::new(),
        })
    }

    /// Rebuild a session from persisted state. The scenario must be the
    /// one the state was saved under; it is re-validated here.
    pub fn restore(scenario: Scenario, state: SimulationState) -> Result<Self, ScenarioError> {
        scenario.validate()?;
        let calendar = scenario.calendar();
        Ok(Self {
            scenario,
            calendar,
            state,
            advancing: false,
            observers: Vec::new(),
        })
    }

    /// Owned snapshot of the mutable session state, for persistence.
    pub fn snapshot_state(&self) -> SimulationState {
        self.state.clone()
    }

    /// Subscribe an observer to all subsequent events.
    pub fn subscribe(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn current_period(&self) -> Period {
        self.state.current
    }

    pub fn current_turn(&self) -> u32 {
        self.state.turn
    }

    pub fn phase(&self) -> GamePhase {
        self.state.phase
    }

    pub fn ledger(&self) -> &Ledger {
        &self.state.ledger
    }

    /// Active physical positions (unsold and pending-settlement).
    pub fn physical_positions(&self) -> &[PhysicalPosition] {
        &self.state.physical
    }

    /// Open futures positions.
    pub fn futures_positions(&self) -> &[FuturesPosition] {
        &self.state.futures
    }

    /// One physical position by id.
    pub fn position(&self, id: PositionId) -> Option<&PhysicalPosition> {
        self.state.physical.iter().find(|p| p.id == id)
    }

    /// Tonnage still purchasable from a supplier this month.
    pub fn remaining_supply(&self, supplier: &sim_core::SupplierId) -> Result<u32, SimError> {
        let month = self.scenario.market.month_data(self.state.current.month)?;
        Ok(self.state.limits.remaining_supply(month, supplier))
    }

    /// Tonnage still sellable into a region this month.
    pub fn remaining_demand(&self, region: &sim_core::RegionId) -> Result<u32, SimError> {
        let month = self.scenario.market.month_data(self.state.current.month)?;
        Ok(self.state.limits.remaining_demand(month, region))
    }

    fn ensure_active(&self) -> Result<(), SimError> {
        match self.state.phase {
            GamePhase::Active => Ok(()),
            GamePhase::Ended => Err(SimError::GameAlreadyEnded),
        }
    }

    fn emit(&mut self, event: SimEvent) {
        for obs in &mut self.observers {
            obs.on_event(&event);
        }
    }

    fn next_position_id(&mut self) -> PositionId {
        let id = PositionId(self.state.next_position_id);
        self.state.next_position_id += 1;
        id
    }

    fn next_futures_id(&mut self) -> sim_core::FuturesId {
        let id = sim_core::FuturesId(self.state.next_futures_id);
        self.state.next_futures_id += 1;
        id
    }
}
