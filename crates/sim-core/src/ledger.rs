//! Cash, credit, margin, and realized-P&L accounting, plus the per-month
//! purchase/sale counters.
//!
//! The ledger is owned by the simulation aggregate and mutated only under
//! the period controller's single-threaded orchestration. Every operation
//! either fully applies or leaves the ledger untouched.

use crate::error::SimError;
use crate::market::{MonthData, RegionId, SupplierId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All balances the game tracks against the player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Cash on hand. May go negative after interest charges.
    pub cash: Decimal,
    /// Credit line currently drawn.
    pub credit_used: Decimal,
    /// Credit line ceiling.
    pub credit_limit: Decimal,
    /// Interest accrued on `credit_used` last period, charged on the next
    /// period advance.
    pub interest_next_period: Decimal,
    /// Netted margin currently posted against open futures.
    pub margin_posted: Decimal,
    /// Margin ceiling for open futures.
    pub margin_limit: Decimal,
    /// Cumulative realized P&L from settled physical lots.
    pub physical_pnl: Decimal,
    /// Cumulative realized P&L from closed futures (net of fees).
    pub futures_pnl: Decimal,
}

impl Ledger {
    /// Fresh ledger with starting cash and the configured limits.
    pub fn new(starting_cash: Decimal, credit_limit: Decimal, margin_limit: Decimal) -> Self {
        Self {
            cash: starting_cash,
            credit_used: Decimal::ZERO,
            credit_limit,
            interest_next_period: Decimal::ZERO,
            margin_posted: Decimal::ZERO,
            margin_limit,
            physical_pnl: Decimal::ZERO,
            futures_pnl: Decimal::ZERO,
        }
    }

    /// Cash plus undrawn credit. Negative cash reduces buying power.
    pub fn buying_power(&self) -> Decimal {
        self.cash + (self.credit_limit - self.credit_used)
    }

    /// Combined realized P&L.
    pub fn total_pnl(&self) -> Decimal {
        self.physical_pnl + self.futures_pnl
    }

    /// Draw `total` for a purchase: cash first, remainder from credit.
    /// Returns the credit portion drawn. Fails without mutation when the
    /// draw exceeds buying power or the available credit headroom.
    pub fn draw(&mut self, total: Decimal) -> Result<Decimal, SimError> {
        if total > self.buying_power() {
            return Err(SimError::InsufficientBuyingPower);
        }
        let from_cash = self.cash.max(Decimal::ZERO).min(total);
        let from_credit = total - from_cash;
        if self.credit_used + from_credit > self.credit_limit {
            return Err(SimError::InsufficientBuyingPower);
        }
        self.cash -= from_cash;
        self.credit_used += from_credit;
        Ok(from_credit)
    }

    /// Repay drawn credit; any amount beyond `credit_used` lands in cash.
    pub fn repay_credit(&mut self, amount: Decimal) {
        let applied = amount.min(self.credit_used);
        self.credit_used -= applied;
        self.cash += amount - applied;
    }

    /// Accrue one period of interest on the current credit balance, to be
    /// charged at the start of the next period.
    pub fn accrue_interest(&mut self, rate_per_period: Decimal) {
        self.interest_next_period = self.credit_used * rate_per_period;
    }

    /// Charge the previously accrued interest. Returns the amount charged.
    pub fn charge_accrued_interest(&mut self) -> Decimal {
        let charged = self.interest_next_period;
        self.cash -= charged;
        self.interest_next_period = Decimal::ZERO;
        charged
    }
}

/// Tonnage bought/sold against each counterparty this month. Reset on
/// every month boundary; compared against the month's supply and demand
/// limits.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyLimits {
    purchased: BTreeMap<SupplierId, u32>,
    sold: BTreeMap<RegionId, u32>,
}

impl MonthlyLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all counters at a month boundary.
    pub fn reset(&mut self) {
        self.purchased.clear();
        self.sold.clear();
    }

    /// Tonnage still purchasable from a supplier this month. Suppliers
    /// absent from the month document have zero capacity.
    pub fn remaining_supply(&self, month: &MonthData, supplier: &SupplierId) -> u32 {
        let limit = month.supply_limits.get(supplier).copied().unwrap_or(0);
        let used = self.purchased.get(supplier).copied().unwrap_or(0);
        limit.saturating_sub(used)
    }

    /// Tonnage still sellable into a region this month.
    pub fn remaining_demand(&self, month: &MonthData, region: &RegionId) -> u32 {
        let limit = month.demand_limits.get(region).copied().unwrap_or(0);
        let used = self.sold.get(region).copied().unwrap_or(0);
        limit.saturating_sub(used)
    }

    /// Count purchased tonnage against a supplier.
    pub fn record_purchase(&mut self, supplier: &SupplierId, tonnage: u32) {
        *self.purchased.entry(supplier.clone()).or_insert(0) += tonnage;
    }

    /// Count sold tonnage against a region.
    pub fn record_sale(&mut self, region: &RegionId, tonnage: u32) {
        *self.sold.entry(region.clone()).or_insert(0) += tonnage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        Ledger::new(
            Decimal::new(100_000, 0),
            Decimal::new(50_000, 0),
            Decimal::new(100_000, 0),
        )
    }

    #[test]
    fn draw_prefers_cash_then_credit() {
        let mut l = ledger();
        let credit = l.draw(Decimal::new(120_000, 0)).unwrap();
        assert_eq!(credit, Decimal::new(20_000, 0));
        assert_eq!(l.cash, Decimal::ZERO);
        assert_eq!(l.credit_used, Decimal::new(20_000, 0));
    }

    #[test]
    fn draw_beyond_buying_power_fails_without_mutation() {
        let mut l = ledger();
        let before = l.clone();
        assert_eq!(
            l.draw(Decimal::new(150_001, 0)),
            Err(SimError::InsufficientBuyingPower)
        );
        assert_eq!(l, before);
    }

    #[test]
    fn draw_with_negative_cash_uses_credit_only() {
        let mut l = ledger();
        l.cash = Decimal::new(-1_000, 0);
        let credit = l.draw(Decimal::new(10_000, 0)).unwrap();
        assert_eq!(credit, Decimal::new(10_000, 0));
        assert_eq!(l.cash, Decimal::new(-1_000, 0));
    }

    #[test]
    fn repay_overflow_lands_in_cash() {
        let mut l = ledger();
        l.credit_used = Decimal::new(5_000, 0);
        l.repay_credit(Decimal::new(8_000, 0));
        assert_eq!(l.credit_used, Decimal::ZERO);
        assert_eq!(l.cash, Decimal::new(103_000, 0));
    }

    #[test]
    fn interest_accrues_then_charges_once() {
        let mut l = ledger();
        l.credit_used = Decimal::new(10_000, 0);
        l.accrue_interest(Decimal::new(1, 2)); // 1% per period
        assert_eq!(l.interest_next_period, Decimal::new(100, 0));
        let charged = l.charge_accrued_interest();
        assert_eq!(charged, Decimal::new(100, 0));
        assert_eq!(l.cash, Decimal::new(99_900, 0));
        assert_eq!(l.charge_accrued_interest(), Decimal::ZERO);
    }

    #[test]
    fn monthly_counters_track_and_reset() {
        let supplier = SupplierId("callao-mining".into());
        let region = RegionId("east-asia".into());
        let mut supply = BTreeMap::new();
        supply.insert(supplier.clone(), 100);
        let mut demand = BTreeMap::new();
        demand.insert(region.clone(), 60);
        let month = MonthData {
            month: 1,
            curves: BTreeMap::new(),
            supply_limits: supply,
            demand_limits: demand,
            freight: Vec::new(),
        };

        let mut limits = MonthlyLimits::new();
        assert_eq!(limits.remaining_supply(&month, &supplier), 100);
        limits.record_purchase(&supplier, 70);
        assert_eq!(limits.remaining_supply(&month, &supplier), 30);
        limits.record_sale(&region, 60);
        assert_eq!(limits.remaining_demand(&month, &region), 0);
        limits.reset();
        assert_eq!(limits.remaining_supply(&month, &supplier), 100);
        assert_eq!(limits.remaining_demand(&month, &region), 60);
    }
}
