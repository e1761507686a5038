//! Futures engine: open, mark-to-market, margin netting, close, expiry.
//!
//! Margin is count-based: offsetting long/short exposure within the same
//! (exchange, tenor) class is charged the cheap offset rate, only the net
//! contracts carry full margin. The aggregate is recomputed after every
//! open and close, and the cash delta of posting or releasing margin
//! settles immediately.

use crate::events::ExpirySummary;
use crate::Simulation;
use rust_decimal::Decimal;
use sim_core::{
    ContractTenor, Direction, ExchangeId, FuturesId, FuturesPosition, FuturesSpec, SimError,
    PERIODS_PER_MONTH,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Aggregate margin requirement across open positions, with netting.
///
/// Positions are grouped by (exchange, tenor); within a group,
/// `min(long, short)` contract pairs are charged the offset rate and the
/// absolute net is charged the full rate.
pub fn margin_with_netting(positions: &[FuturesPosition], spec: &FuturesSpec) -> Decimal {
    let mut groups: BTreeMap<(&ExchangeId, ContractTenor), (u32, u32)> = BTreeMap::new();
    for pos in positions {
        let entry = groups.entry((&pos.exchange, pos.tenor)).or_insert((0, 0));
        match pos.direction {
            Direction::Long => entry.0 += pos.contracts,
            Direction::Short => entry.1 += pos.contracts,
        }
    }
    let mut total = Decimal::ZERO;
    for (long, short) in groups.values() {
        let offset_pairs = (*long).min(*short);
        let net = long.abs_diff(*short);
        total += Decimal::from(offset_pairs) * spec.offset_margin_per_contract
            + Decimal::from(net) * spec.full_margin_per_contract;
    }
    total
}

impl Simulation {
    /// Open a futures position at the current tenor price.
    ///
    /// The position is appended speculatively; if the recomputed netted
    /// margin would exceed the margin limit it is removed again and the
    /// open fails with no state change. On success the margin delta and
    /// the opening fee settle against cash. `contracts` must be > 0.
    pub fn open_futures(
        &mut self,
        exchange: &ExchangeId,
        tenor: ContractTenor,
        direction: Direction,
        contracts: u32,
    ) -> Result<FuturesId, SimError> {
        debug_assert!(contracts > 0);
        self.ensure_active()?;
        let month = self.scenario.market.month_data(self.state.current.month)?;
        let entry_price = month.curve(exchange)?.tenor_price(tenor);
        let spec = self.scenario.futures_spec.clone();

        let expiry_turn = (self.state.turn + tenor.offset_months() * PERIODS_PER_MONTH)
            .min(self.calendar.final_turn());
        let id = sim_core::FuturesId(self.state.next_futures_id);
        let position = FuturesPosition {
            id,
            exchange: exchange.clone(),
            tenor,
            direction,
            contracts,
            tonnage: contracts * spec.contract_size_tonnes,
            entry_price,
            current_price: entry_price,
            unrealized_pnl: Decimal::ZERO,
            open_period: self.state.current,
            expiry_turn,
        };

        self.state.futures.push(position);
        let required = margin_with_netting(&self.state.futures, &spec);
        if required > self.state.ledger.margin_limit {
            self.state.futures.pop();
            return Err(SimError::MarginLimitExceeded);
        }

        // Commit: consume the id, post the margin delta, charge the fee.
        let id = self.next_futures_id();
        let fee = spec.fee_per_contract * Decimal::from(contracts);
        let delta = required - self.state.ledger.margin_posted;
        self.state.ledger.cash -= delta + fee;
        self.state.ledger.futures_pnl -= fee;
        self.state.ledger.margin_posted = required;
        info!(
            id = id.0,
            exchange = %exchange.0,
            tenor = %tenor,
            ?direction,
            contracts,
            %entry_price,
            expiry_turn,
            "opened futures position"
        );
        Ok(id)
    }

    /// Close a position at its current marked price, settling unrealized
    /// P&L and the closing fee into cash and releasing freed margin.
    pub fn close_futures(&mut self, id: FuturesId) -> Result<Decimal, SimError> {
        self.ensure_active()?;
        let idx = self
            .state
            .futures
            .iter()
            .position(|p| p.id == id)
            .ok_or(SimError::PositionNotFound(id.0))?;
        let (pnl, _fee) = self.liquidate_at(idx);
        Ok(pnl)
    }

    /// Remove the position at `idx` and settle it. Shared by explicit
    /// closes and forced liquidation at expiry. Returns (net P&L, fee).
    fn liquidate_at(&mut self, idx: usize) -> (Decimal, Decimal) {
        let spec = self.scenario.futures_spec.clone();
        let pos = self.state.futures.remove(idx);
        let required = margin_with_netting(&self.state.futures, &spec);
        let released = self.state.ledger.margin_posted - required;
        let fee = spec.fee_per_contract * Decimal::from(pos.contracts);
        let net = pos.unrealized_pnl - fee;
        self.state.ledger.margin_posted = required;
        self.state.ledger.cash += released + net;
        self.state.ledger.futures_pnl += net;
        info!(
            id = pos.id.0,
            pnl = %net,
            %released,
            "closed futures position"
        );
        (net, fee)
    }

    /// Refresh every open position against the current month's curve and
    /// recompute unrealized P&L, then force-close expiries.
    pub(crate) fn mark_to_market(&mut self, current_turn: u32) -> Result<ExpirySummary, SimError> {
        let month = self.scenario.market.month_data(self.state.current.month)?;
        let spec = &self.scenario.futures_spec;
        for pos in &mut self.state.futures {
            let price = month.curve(&pos.exchange)?.tenor_price(pos.tenor);
            pos.current_price = price;
            pos.unrealized_pnl = (price - pos.entry_price)
                * spec.price_multiplier
                * Decimal::from(pos.contracts)
                * pos.direction.sign();
        }
        // The aggregate requirement is re-derived after every price
        // update, not only on open and close.
        self.state.ledger.margin_posted = margin_with_netting(&self.state.futures, spec);
        debug!(open = self.state.futures.len(), "marked futures to market");
        Ok(self.check_expiry(current_turn))
    }

    /// Force-close every position whose expiry turn has been reached,
    /// aggregating the combined P&L and fees.
    pub(crate) fn check_expiry(&mut self, current_turn: u32) -> ExpirySummary {
        let mut summary = ExpirySummary::default();
        loop {
            let Some(idx) = self
                .state
                .futures
                .iter()
                .position(|p| p.expiry_turn <= current_turn)
            else {
                break;
            };
            let id = self.state.futures[idx].id;
            let (pnl, fee) = self.liquidate_at(idx);
            summary.closed.push(id);
            summary.pnl += pnl;
            summary.fees += fee;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{Period, SubPeriod};

    fn spec() -> FuturesSpec {
        FuturesSpec {
            contract_size_tonnes: 25,
            price_multiplier: Decimal::new(25, 0),
            fee_per_contract: Decimal::new(50, 0),
            full_margin_per_contract: Decimal::new(10_000, 0),
            offset_margin_per_contract: Decimal::new(1_500, 0),
        }
    }

    fn position(
        id: u64,
        exchange: &str,
        tenor: ContractTenor,
        direction: Direction,
        contracts: u32,
    ) -> FuturesPosition {
        FuturesPosition {
            id: FuturesId(id),
            exchange: ExchangeId(exchange.into()),
            tenor,
            direction,
            contracts,
            tonnage: contracts * 25,
            entry_price: Decimal::new(9_000, 0),
            current_price: Decimal::new(9_000, 0),
            unrealized_pnl: Decimal::ZERO,
            open_period: Period::new(1, SubPeriod::Early),
            expiry_turn: 3,
        }
    }

    #[test]
    fn fully_offset_pair_pays_only_offset_margin() {
        let positions = vec![
            position(1, "LME", ContractTenor::M3, Direction::Long, 3),
            position(2, "LME", ContractTenor::M3, Direction::Short, 3),
        ];
        let margin = margin_with_netting(&positions, &spec());
        assert_eq!(margin, Decimal::new(4_500, 0)); // 3 pairs * 1500
        assert!(margin < Decimal::new(60_000, 0)); // vs 6 * 10k unhedged
    }

    #[test]
    fn net_exposure_pays_full_margin() {
        let positions = vec![
            position(1, "LME", ContractTenor::M3, Direction::Long, 5),
            position(2, "LME", ContractTenor::M3, Direction::Short, 2),
        ];
        // 2 offset pairs + 3 net contracts.
        assert_eq!(
            margin_with_netting(&positions, &spec()),
            Decimal::new(2 * 1_500 + 3 * 10_000, 0)
        );
    }

    #[test]
    fn netting_never_crosses_contract_classes() {
        let positions = vec![
            position(1, "LME", ContractTenor::M1, Direction::Long, 2),
            position(2, "LME", ContractTenor::M3, Direction::Short, 2),
            position(3, "SHFE", ContractTenor::M3, Direction::Long, 1),
        ];
        // All net: different tenor or different exchange.
        assert_eq!(
            margin_with_netting(&positions, &spec()),
            Decimal::new(50_000, 0)
        );
    }

    #[test]
    fn empty_book_needs_no_margin() {
        assert_eq!(margin_with_netting(&[], &spec()), Decimal::ZERO);
    }
}
