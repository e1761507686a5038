//! Domain errors shared by simulation operations.

use thiserror::Error;

/// Errors produced by simulation commands and period advancement.
///
/// Validation failures (capacity, funds, margin, inventory) are recoverable:
/// the attempted operation is fully rolled back and the caller may retry
/// with different parameters. `InvalidPeriod` and `DataNotFound` are
/// configuration errors; the core refuses to proceed rather than guess.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    /// Month or turn outside the scenario's calendar.
    #[error("invalid period: {0}")]
    InvalidPeriod(String),
    /// Monthly supplier or buyer-region limit would be exceeded.
    #[error("monthly capacity exceeded for {counterparty}: requested {requested} t, {remaining} t remaining")]
    CapacityExceeded {
        counterparty: String,
        requested: u32,
        remaining: u32,
    },
    /// Purchase exceeds cash plus available credit.
    #[error("insufficient buying power")]
    InsufficientBuyingPower,
    /// Sale tonnage exceeds the lot, or the lot is already sold.
    #[error("insufficient inventory")]
    InsufficientInventory,
    /// The lot's discharge port does not match the buyer region's port.
    #[error("destination mismatch: position {position} does not discharge in {region}")]
    DestinationMismatch { position: u64, region: String },
    /// Opening the futures position would push netted margin past the limit.
    #[error("margin limit exceeded")]
    MarginLimitExceeded,
    /// No active position with the given id.
    #[error("position not found: {0}")]
    PositionNotFound(u64),
    /// The scenario's final turn has been played out.
    #[error("game already ended")]
    GameAlreadyEnded,
    /// A period advance is already in flight; advancement is non-reentrant.
    #[error("period advance already in progress")]
    AdvanceInProgress,
    /// No market data loaded for the requested month.
    #[error("no market data for month {0}")]
    DataNotFound(u32),
}
