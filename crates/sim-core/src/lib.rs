#![deny(warnings)]

//! Core domain models and invariants for the metal trading simulation.
//!
//! This crate defines the serializable types shared across the simulation:
//! the period calendar, per-month market data, the cash/credit/margin
//! ledger, and physical/futures position records. Validation helpers
//! guarantee the basic invariants; the `sim-runtime` crate drives the
//! lifecycle on top of them.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod market;
pub mod position;

pub use clock::{Calendar, Period, SubPeriod, PERIODS_PER_MONTH};
pub use error::SimError;
pub use ledger::{Ledger, MonthlyLimits};
pub use market::{
    ContractTenor, ExchangeCurve, ExchangeId, FreightLane, FuturesSpec, MarketData,
    MarketDataError, MonthData, PortId, RegionId, SupplierId,
};
pub use position::{
    Direction, FuturesId, FuturesPosition, PhysicalPosition, PositionId, PositionStatus, Sale,
    ShippingBasis,
};
