#![deny(warnings)]

//! Headless CLI: plays a scripted session against the demo scenario and
//! prints the final ledger. Useful for smoke-testing the core without a
//! frontend.

use anyhow::Result;
use rust_decimal::Decimal;
use sim_core::{ContractTenor, Direction, ShippingBasis};
use sim_market::demo_scenario;
use sim_runtime::{AdvanceOutcome, GamePhase, Simulation};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

fn parse_args() -> (u64, Option<u32>, Option<String>, Option<String>) {
    let mut seed: u64 = 42;
    let mut periods: Option<u32> = None;
    let mut save: Option<String> = None;
    let mut load: Option<String> = None;
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--seed" => seed = it.next().and_then(|s| s.parse().ok()).unwrap_or(seed),
            "--periods" => periods = it.next().and_then(|s| s.parse().ok()),
            "--save" => save = it.next(),
            "--load" => load = it.next(),
            _ => {}
        }
    }
    (seed, periods, save, load)
}

/// Buy a lot from the first supplier, sell it straight to the first
/// region, and hedge with a short M+3. Everything else is just advancing
/// the clock.
fn play_opening_trades(sim: &mut Simulation) -> Result<()> {
    let scenario = sim.scenario().clone();
    let supplier = &scenario.suppliers[0];
    let region = &scenario.regions[0];
    let month = scenario.market.month_data(sim.current_period().month)?;
    let curve = month.curve(&supplier.exchange)?;
    let lane = month
        .lane(&supplier.port, &region.port)
        .ok_or_else(|| anyhow::anyhow!("no lane for demo trade"))?;

    let tonnage = 10u32;
    let quote = curve.m1 + supplier.premium_per_tonne + lane.cost_per_tonne;
    let id = sim.purchase(
        &supplier.id,
        tonnage,
        quote,
        quote * Decimal::from(tonnage),
        &supplier.exchange,
        ShippingBasis::Cif,
        &region.port,
    )?;
    let sale_price = curve.m1 + Decimal::new(250, 0);
    sim.sell(
        id,
        tonnage,
        &region.id,
        sale_price,
        sale_price * Decimal::from(tonnage),
    )?;
    sim.open_futures(&supplier.exchange, ContractTenor::M3, Direction::Short, 1)?;
    Ok(())
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let (seed, periods, save_path, load_path) = parse_args();
    info!(seed, ?periods, "starting demo session");

    let mut sim = match load_path {
        Some(path) => {
            let save = persistence::load_json(&path)?;
            info!(path = %path, "resuming from save");
            persistence::restore(save, demo_scenario(seed))?
        }
        None => {
            let mut sim = Simulation::new(demo_scenario(seed))?;
            play_opening_trades(&mut sim)?;
            sim
        }
    };

    let max_advances = if sim.phase() == GamePhase::Ended {
        0
    } else {
        periods.unwrap_or(sim.calendar().final_turn())
    };
    for _ in 0..max_advances {
        match sim.advance_period()? {
            AdvanceOutcome::Advanced(_) => {}
            AdvanceOutcome::Ended(report) => {
                println!(
                    "Game over | P&L: physical ${} futures ${} total ${} | ROI {} | grade {:?}",
                    report.physical_pnl,
                    report.futures_pnl,
                    report.total_pnl,
                    report.roi,
                    report.grade
                );
                break;
            }
        }
    }

    let ledger = sim.ledger();
    println!(
        "Ledger | {} | cash ${} | credit ${}/{} | margin ${}/{} | P&L ${}",
        sim.current_period(),
        ledger.cash,
        ledger.credit_used,
        ledger.credit_limit,
        ledger.margin_posted,
        ledger.margin_limit,
        ledger.total_pnl()
    );
    println!(
        "Book | physical lots: {} | open futures: {}",
        sim.physical_positions().len(),
        sim.futures_positions().len()
    );

    if let Some(path) = save_path {
        let save = persistence::snapshot(&sim);
        persistence::save_json(&save, &path)?;
        println!("Saved to {path}");
    }

    Ok(())
}
