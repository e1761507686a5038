//! Period calendar: conversions between (month, sub-period) pairs and the
//! global turn counter, plus the arrival and settlement offset rules.
//!
//! Each game month is split into two sub-periods. Turns are 1-based:
//! month 1 Early is turn 1, month 1 Late is turn 2, and so on. The +1 month
//! quotational-pricing offset and +2 month settlement offset are fixed
//! business rules, not per-trade configuration.

use crate::error::SimError;
use serde::{Deserialize, Serialize};

/// Sub-periods per game month.
pub const PERIODS_PER_MONTH: u32 = 2;

/// Nominal days in a game month; sub-periods cover half of this each.
const DAYS_PER_MONTH: u32 = 30;

/// First or second half of a month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubPeriod {
    /// Days 1..=15.
    Early,
    /// Days 16..=30.
    Late,
}

impl SubPeriod {
    /// 1-based index within the month.
    pub fn index(self) -> u32 {
        match self {
            SubPeriod::Early => 1,
            SubPeriod::Late => 2,
        }
    }

    /// Midpoint day of this sub-period's half-month window, used as the
    /// representative departure day for travel-time arithmetic.
    fn midpoint_day(self) -> u32 {
        match self {
            SubPeriod::Early => 8,
            SubPeriod::Late => 23,
        }
    }
}

/// An ordered (month, sub-period) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Month index in `[1, scenario months]`.
    pub month: u32,
    /// Half of the month.
    pub sub: SubPeriod,
}

impl Period {
    pub fn new(month: u32, sub: SubPeriod) -> Self {
        Self { month, sub }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let half = match self.sub {
            SubPeriod::Early => "early",
            SubPeriod::Late => "late",
        };
        write!(f, "month {} ({})", self.month, half)
    }
}

/// Fixed game calendar: a scenario runs `months` months of two sub-periods
/// each. All conversions are pure; the calendar holds no mutable state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    /// Total months in the scenario (>= 1).
    pub months: u32,
}

impl Calendar {
    pub fn new(months: u32) -> Self {
        Self { months }
    }

    /// Last playable turn of the scenario.
    pub fn final_turn(self) -> u32 {
        self.months * PERIODS_PER_MONTH
    }

    /// Last playable period of the scenario.
    pub fn final_period(self) -> Period {
        Period::new(self.months, SubPeriod::Late)
    }

    fn check_month(self, month: u32) -> Result<(), SimError> {
        if month == 0 || month > self.months {
            return Err(SimError::InvalidPeriod(format!(
                "month {} outside [1, {}]",
                month, self.months
            )));
        }
        Ok(())
    }

    /// Global 1-based turn number for a period.
    pub fn turn_of(self, period: Period) -> Result<u32, SimError> {
        self.check_month(period.month)?;
        Ok((period.month - 1) * PERIODS_PER_MONTH + period.sub.index())
    }

    /// Inverse of [`turn_of`](Self::turn_of).
    pub fn period_of(self, turn: u32) -> Result<Period, SimError> {
        if turn == 0 || turn > self.final_turn() {
            return Err(SimError::InvalidPeriod(format!(
                "turn {} outside [1, {}]",
                turn,
                self.final_turn()
            )));
        }
        let month = (turn - 1) / PERIODS_PER_MONTH + 1;
        let sub = if (turn - 1) % PERIODS_PER_MONTH == 0 {
            SubPeriod::Early
        } else {
            SubPeriod::Late
        };
        Ok(Period::new(month, sub))
    }

    /// Next period, or `None` when `period` is the final one.
    pub fn advance(self, period: Period) -> Result<Option<Period>, SimError> {
        let turn = self.turn_of(period)?;
        if turn >= self.final_turn() {
            return Ok(None);
        }
        Ok(Some(self.period_of(turn + 1)?))
    }

    /// Whether moving from `old` to `new` crosses a month boundary.
    pub fn month_boundary_crossed(self, old: Period, new: Period) -> bool {
        old.month != new.month
    }

    /// Arrival period for a lot purchased in `purchase` with the given
    /// transit time. The sub-period maps to the midpoint day of its
    /// half-month window; overflow past the scenario end clamps to the
    /// final period.
    pub fn arrival_period(self, purchase: Period, travel_days: u32) -> Result<Period, SimError> {
        self.check_month(purchase.month)?;
        let depart = (purchase.month - 1) * DAYS_PER_MONTH + purchase.sub.midpoint_day();
        let arrive = depart + travel_days;
        let month = (arrive - 1) / DAYS_PER_MONTH + 1;
        if month > self.months {
            return Ok(self.final_period());
        }
        let day_in_month = (arrive - 1) % DAYS_PER_MONTH + 1;
        let sub = if day_in_month <= DAYS_PER_MONTH / 2 {
            SubPeriod::Early
        } else {
            SubPeriod::Late
        };
        Ok(Period::new(month, sub))
    }

    /// Settlement period for a lot purchased in `purchase`: two months
    /// later, first sub-period (the first turn after the QP month has fully
    /// elapsed), clamped to the final period.
    pub fn settlement_period(self, purchase: Period) -> Result<Period, SimError> {
        self.check_month(purchase.month)?;
        let month = purchase.month + 2;
        if month > self.months {
            return Ok(self.final_period());
        }
        Ok(Period::new(month, SubPeriod::Early))
    }

    /// Quotational-pricing month for a purchase month: the following month.
    pub fn qp_month(self, purchase_month: u32) -> u32 {
        purchase_month + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CAL: Calendar = Calendar { months: 6 };

    #[test]
    fn turn_numbering_is_one_based() {
        assert_eq!(CAL.turn_of(Period::new(1, SubPeriod::Early)).unwrap(), 1);
        assert_eq!(CAL.turn_of(Period::new(1, SubPeriod::Late)).unwrap(), 2);
        assert_eq!(CAL.turn_of(Period::new(3, SubPeriod::Early)).unwrap(), 5);
        assert_eq!(CAL.final_turn(), 12);
    }

    #[test]
    fn out_of_range_month_is_rejected() {
        assert!(matches!(
            CAL.turn_of(Period::new(0, SubPeriod::Early)),
            Err(SimError::InvalidPeriod(_))
        ));
        assert!(matches!(
            CAL.turn_of(Period::new(7, SubPeriod::Early)),
            Err(SimError::InvalidPeriod(_))
        ));
        assert!(matches!(CAL.period_of(0), Err(SimError::InvalidPeriod(_))));
        assert!(matches!(CAL.period_of(13), Err(SimError::InvalidPeriod(_))));
    }

    #[test]
    fn advance_stops_at_final_period() {
        let last = Period::new(6, SubPeriod::Late);
        assert_eq!(CAL.advance(last).unwrap(), None);
        let next_to_last = Period::new(6, SubPeriod::Early);
        assert_eq!(CAL.advance(next_to_last).unwrap(), Some(last));
    }

    #[test]
    fn arrival_28_days_from_month_1_early_lands_in_month_2() {
        // Departs day 8, arrives day 36 = month 2 day 6 (early half).
        let arrival = CAL
            .arrival_period(Period::new(1, SubPeriod::Early), 28)
            .unwrap();
        assert_eq!(arrival, Period::new(2, SubPeriod::Early));
    }

    #[test]
    fn arrival_clamps_to_final_period() {
        let arrival = CAL
            .arrival_period(Period::new(6, SubPeriod::Late), 60)
            .unwrap();
        assert_eq!(arrival, CAL.final_period());
    }

    #[test]
    fn settlement_is_purchase_month_plus_two_early() {
        let s = CAL
            .settlement_period(Period::new(1, SubPeriod::Late))
            .unwrap();
        assert_eq!(s, Period::new(3, SubPeriod::Early));
        // Clamped at the end of the scenario.
        let s = CAL
            .settlement_period(Period::new(5, SubPeriod::Early))
            .unwrap();
        assert_eq!(s, CAL.final_period());
    }

    proptest! {
        #[test]
        fn period_turn_round_trip(month in 1u32..=24, late in proptest::bool::ANY) {
            let cal = Calendar::new(24);
            let sub = if late { SubPeriod::Late } else { SubPeriod::Early };
            let p = Period::new(month, sub);
            let turn = cal.turn_of(p).unwrap();
            prop_assert_eq!(cal.period_of(turn).unwrap(), p);
        }

        #[test]
        fn turns_are_contiguous(turn in 1u32..48) {
            let cal = Calendar::new(24);
            let p = cal.period_of(turn).unwrap();
            let next = cal.period_of(turn + 1).unwrap();
            prop_assert!(cal.advance(p).unwrap() == Some(next));
        }
    }
}
