//! Physical-position lifecycle: purchase, sale, arrival tracking,
//! quotational-pricing finalization, and settlement.
//!
//! Purchases are priced provisionally against the current M+1 price; the
//! difference to the quoted cost (supplier premium plus freight) is frozen
//! at purchase and re-applied when the QP month's settlement average
//! becomes known. Sale and settlement never require physical arrival:
//! transit and sale are independent state axes.

use crate::events::{SettlementReport, SimEvent};
use crate::Simulation;
use rust_decimal::Decimal;
use sim_core::{
    ExchangeId, PhysicalPosition, PortId, PositionId, PositionStatus, RegionId, Sale,
    ShippingBasis, SimError, SupplierId,
};
use tracing::{debug, info};

impl Simulation {
    /// Buy `tonnage` tonnes from a supplier for delivery to `destination`.
    ///
    /// `cost_per_tonne` and `total_cost` are the quoted trade terms
    /// (exchange base plus premium and freight, per the shipping basis).
    /// Validates monthly supplier capacity and buying power; on any
    /// failure nothing is mutated. Returns the new position's id.
    pub fn purchase(
        &mut self,
        supplier: &SupplierId,
        tonnage: u32,
        cost_per_tonne: Decimal,
        total_cost: Decimal,
        exchange: &ExchangeId,
        basis: ShippingBasis,
        destination: &PortId,
    ) -> Result<PositionId, SimError> {
        self.ensure_active()?;
        let month = self.scenario.market.month_data(self.state.current.month)?;
        let remaining = self.state.limits.remaining_supply(month, supplier);
        if tonnage == 0 || tonnage > remaining {
            return Err(SimError::CapacityExceeded {
                counterparty: supplier.0.clone(),
                requested: tonnage,
                remaining,
            });
        }
        // A supplier with listed capacity but no configuration would be a
        // broken scenario; treat it like a missing month document.
        let origin = self
            .scenario
            .supplier(supplier)
            .map(|s| s.port.clone())
            .ok_or(SimError::DataNotFound(self.state.current.month))?;
        let lane = month
            .lane(&origin, destination)
            .ok_or(SimError::DataNotFound(self.state.current.month))?;
        let travel_days = lane.travel_days;
        let provisional_base = month.curve(exchange)?.m1;

        let purchase_period = self.state.current;
        let arrival_period = self.calendar.arrival_period(purchase_period, travel_days)?;
        let qp_month = self.calendar.qp_month(purchase_period.month);

        let credit_drawn = self.state.ledger.draw(total_cost)?;
        self.state.limits.record_purchase(supplier, tonnage);
        let id = self.next_position_id();
        let position = PhysicalPosition {
            id,
            supplier: supplier.clone(),
            origin,
            destination: destination.clone(),
            tonnage,
            exchange: exchange.clone(),
            basis,
            purchase_period,
            travel_days,
            arrival_period,
            qp_month,
            cost_per_tonne,
            total_cost,
            premium_freight_per_tonne: cost_per_tonne - provisional_base,
            finalized: false,
            credit_drawn,
            status: PositionStatus::InTransit,
            sale: None,
        };
        info!(
            id = id.0,
            supplier = %supplier.0,
            tonnage,
            %cost_per_tonne,
            arrival = %arrival_period,
            "purchased lot"
        );
        self.state.physical.push(position.clone());
        self.emit(SimEvent::PositionCreated(position));
        Ok(id)
    }

    /// Sell `tonnage` tonnes of a lot into a buyer region at the quoted
    /// price. A partial sale splits the lot: the sold tranche keeps the id
    /// and its share of the original credit draw; the remainder continues
    /// as a new unsold position.
    ///
    /// The lot need not have arrived; only the destination must match a
    /// buyer. No profit is realized here, settlement does that two months
    /// after purchase. Always returns zero immediate profit.
    pub fn sell(
        &mut self,
        id: PositionId,
        tonnage: u32,
        region: &RegionId,
        price_per_tonne: Decimal,
        total_revenue: Decimal,
    ) -> Result<Decimal, SimError> {
        self.ensure_active()?;
        let month = self.scenario.market.month_data(self.state.current.month)?;
        let remaining_demand = self.state.limits.remaining_demand(month, region);

        let idx = self
            .state
            .physical
            .iter()
            .position(|p| p.id == id)
            .ok_or(SimError::PositionNotFound(id.0))?;
        {
            let pos = &self.state.physical[idx];
            if pos.is_sold() || tonnage == 0 || tonnage > pos.tonnage {
                return Err(SimError::InsufficientInventory);
            }
        }
        // The lot must be consigned to the buyer region's discharge port;
        // arrival is not required.
        let buyer_port = self
            .scenario
            .region(region)
            .map(|r| r.port.clone())
            .ok_or(SimError::DataNotFound(self.state.current.month))?;
        if self.state.physical[idx].destination != buyer_port {
            return Err(SimError::DestinationMismatch {
                position: id.0,
                region: region.0.clone(),
            });
        }
        if tonnage > remaining_demand {
            return Err(SimError::CapacityExceeded {
                counterparty: region.0.clone(),
                requested: tonnage,
                remaining: remaining_demand,
            });
        }

        let sale_period = self.state.current;
        let purchase_period = self.state.physical[idx].purchase_period;
        let settlement_period = self.calendar.settlement_period(purchase_period)?;

        let remainder = {
            let pos = &mut self.state.physical[idx];
            let remainder_tonnage = pos.tonnage - tonnage;
            // Credit apportioned against the tonnage remaining at the time
            // of this sale, so successive tranches each carry their share.
            let sold_fraction = Decimal::from(tonnage) / Decimal::from(pos.tonnage);
            let sold_credit = pos.credit_drawn * sold_fraction;
            let sold_cost = pos.cost_per_tonne * Decimal::from(tonnage);

            let remainder = if remainder_tonnage > 0 {
                let mut rest = pos.clone();
                rest.tonnage = remainder_tonnage;
                rest.total_cost = rest.cost_per_tonne * Decimal::from(remainder_tonnage);
                rest.credit_drawn = pos.credit_drawn - sold_credit;
                rest.sale = None;
                Some(rest)
            } else {
                None
            };

            pos.tonnage = tonnage;
            pos.total_cost = sold_cost;
            pos.credit_drawn = sold_credit;
            pos.sale = Some(Sale {
                region: region.clone(),
                price_per_tonne,
                total_revenue,
                sale_period,
                settlement_period,
            });
            remainder
        };

        self.state.limits.record_sale(region, tonnage);
        info!(
            id = id.0,
            tonnage,
            region = %region.0,
            %price_per_tonne,
            settlement = %settlement_period,
            "sold lot, pending settlement"
        );
        if let Some(mut rest) = remainder {
            rest.id = self.next_position_id();
            self.state.physical.push(rest.clone());
            self.emit(SimEvent::PositionCreated(rest));
        }
        Ok(Decimal::ZERO)
    }

    /// Flip every in-transit lot whose arrival turn has been reached.
    pub(crate) fn update_status(&mut self, current_turn: u32) -> Result<Vec<PositionId>, SimError> {
        let mut arrived = Vec::new();
        for pos in &mut self.state.physical {
            if pos.status == PositionStatus::InTransit {
                let arrival_turn = self.calendar.turn_of(pos.arrival_period)?;
                if arrival_turn <= current_turn {
                    pos.status = PositionStatus::Arrived;
                    arrived.push(pos.id);
                }
            }
        }
        for id in &arrived {
            self.emit(SimEvent::PositionStatusChanged {
                id: *id,
                status: PositionStatus::Arrived,
            });
        }
        Ok(arrived)
    }

    /// Finalize quotational pricing for every lot whose QP month has fully
    /// elapsed. Final cost is the QP month's M+1 settlement average plus
    /// the premium/freight component frozen at purchase. Runs exactly once
    /// per lot; finalized lots are skipped.
    pub(crate) fn reprice_pending(
        &mut self,
        current_month: u32,
    ) -> Result<Vec<PositionId>, SimError> {
        let mut repriced = Vec::new();
        for idx in 0..self.state.physical.len() {
            let (qp_month, finalized, exchange) = {
                let p = &self.state.physical[idx];
                (p.qp_month, p.finalized, p.exchange.clone())
            };
            if finalized || current_month <= qp_month {
                continue;
            }
            let avg = self
                .scenario
                .market
                .month_data(qp_month)?
                .curve(&exchange)?
                .m1_settlement_avg;
            let pos = &mut self.state.physical[idx];
            pos.cost_per_tonne = avg + pos.premium_freight_per_tonne;
            pos.total_cost = pos.cost_per_tonne * Decimal::from(pos.tonnage);
            pos.finalized = true;
            debug!(
                id = pos.id.0,
                qp_month,
                final_cost = %pos.cost_per_tonne,
                "finalized quotational pricing"
            );
            repriced.push((pos.id, pos.cost_per_tonne));
        }
        if !repriced.is_empty() {
            self.emit(SimEvent::PositionsRepriced(repriced.clone()));
        }
        Ok(repriced.into_iter().map(|(id, _)| id).collect())
    }

    /// Settle every sold lot whose settlement turn has been reached:
    /// repay the lot's credit share, credit the remaining proceeds to
    /// cash, realize the profit, and drop the lot from the book.
    pub(crate) fn process_settlements(
        &mut self,
        current_turn: u32,
    ) -> Result<Vec<SettlementReport>, SimError> {
        let mut due = Vec::new();
        for (idx, pos) in self.state.physical.iter().enumerate() {
            if let Some(sale) = &pos.sale {
                if self.calendar.turn_of(sale.settlement_period)? <= current_turn {
                    due.push(idx);
                }
            }
        }
        let mut reports = Vec::with_capacity(due.len());
        // Remove back-to-front so earlier indices stay valid.
        for idx in due.into_iter().rev() {
            let pos = self.state.physical.remove(idx);
            let sale = pos.sale.as_ref().ok_or(SimError::InsufficientInventory)?;
            let cost = pos.cost_per_tonne * Decimal::from(pos.tonnage);
            let profit = sale.total_revenue - cost;
            self.state.ledger.repay_credit(pos.credit_drawn);
            self.state.ledger.cash += sale.total_revenue - pos.credit_drawn;
            self.state.ledger.physical_pnl += profit;
            info!(
                id = pos.id.0,
                revenue = %sale.total_revenue,
                %profit,
                "settled lot"
            );
            reports.push(SettlementReport {
                id: pos.id,
                tonnage: pos.tonnage,
                revenue: sale.total_revenue,
                cost,
                profit,
                credit_repaid: pos.credit_drawn,
            });
        }
        reports.reverse();
        Ok(reports)
    }
}
