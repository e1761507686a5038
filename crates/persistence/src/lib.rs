#![deny(warnings)]

//! Versioned save games: snapshot a running simulation, restore one later.
//!
//! The persisted shape is the simulation's own [`SimulationState`] wrapped
//! with a format version. Loading a save with a different version refuses
//! with [`SaveError::VersionMismatch`]; state is never silently migrated
//! or corrupted. JSON is the on-disk format; bincode byte snapshots exist
//! for in-memory transport.

use serde::{Deserialize, Serialize};
use sim_market::{Scenario, ScenarioError};
use sim_runtime::{Simulation, SimulationState};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Current save-format version. Bump on any breaking state-shape change.
pub const SAVE_VERSION: u32 = 1;

/// Errors while saving or loading a game.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The save was written by a different format version.
    #[error("save version {found} does not match supported version {expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
    /// The scenario supplied for restore failed validation.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// A versioned snapshot of one game session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    pub state: SimulationState,
}

fn check_version(found: u32) -> Result<(), SaveError> {
    if found != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            found,
            expected: SAVE_VERSION,
        });
    }
    Ok(())
}

/// Snapshot a running simulation into a save game.
pub fn snapshot(sim: &Simulation) -> SaveGame {
    SaveGame {
        version: SAVE_VERSION,
        state: sim.snapshot_state(),
    }
}

/// Rebuild a simulation from a save and the scenario it was played under.
pub fn restore(save: SaveGame, scenario: Scenario) -> Result<Simulation, SaveError> {
    check_version(save.version)?;
    Ok(Simulation::restore(scenario, save.state)?)
}

/// Serialize a save to bincode bytes.
pub fn to_bytes(save: &SaveGame) -> Result<Vec<u8>, SaveError> {
    Ok(bincode::serialize(save)?)
}

/// Deserialize and version-check bincode bytes.
pub fn from_bytes(bytes: &[u8]) -> Result<SaveGame, SaveError> {
    let save: SaveGame = bincode::deserialize(bytes)?;
    check_version(save.version)?;
    Ok(save)
}

/// Write a save as pretty JSON.
pub fn save_json<P: AsRef<Path>>(save: &SaveGame, path: P) -> Result<(), SaveError> {
    let text = serde_json::to_string_pretty(save)?;
    fs::write(&path, text)?;
    info!(path = %path.as_ref().display(), "wrote save game");
    Ok(())
}

/// Read a JSON save, checking the version before trusting the body.
pub fn load_json<P: AsRef<Path>>(path: P) -> Result<SaveGame, SaveError> {
    let text = fs::read_to_string(&path)?;
    // Peek at the version first so a future-format file fails with the
    // version error, not an opaque parse error.
    #[derive(Deserialize)]
    struct Probe {
        version: u32,
    }
    let probe: Probe = serde_json::from_str(&text)?;
    check_version(probe.version)?;
    let save: SaveGame = serde_json::from_str(&text)?;
    info!(path = %path.as_ref().display(), "loaded save game");
    Ok(save)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use sim_core::{ContractTenor, Direction, ExchangeId};
    use sim_market::demo_scenario;

    fn played_sim() -> Simulation {
        let scenario = demo_scenario(42);
        let mut sim = Simulation::new(scenario).unwrap();
        sim.open_futures(
            &ExchangeId("LME".into()),
            ContractTenor::M3,
            Direction::Long,
            2,
        )
        .unwrap();
        sim.advance_period().unwrap();
        sim.advance_period().unwrap();
        sim
    }

    #[test]
    fn bytes_round_trip_preserves_state() {
        let sim = played_sim();
        let save = snapshot(&sim);
        let bytes = to_bytes(&save).unwrap();
        let back = from_bytes(&bytes).unwrap();
        assert_eq!(back, save);
    }

    #[test]
    fn json_file_round_trip_and_restore() {
        let sim = played_sim();
        let save = snapshot(&sim);
        let path = std::env::temp_dir().join(format!("metal-tycoon-save-{}.json", std::process::id()));
        save_json(&save, &path).unwrap();
        let loaded = load_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, save);

        let restored = restore(loaded, demo_scenario(42)).unwrap();
        assert_eq!(restored.snapshot_state(), sim.snapshot_state());
        assert_eq!(restored.current_turn(), 3);
        assert_eq!(restored.futures_positions().len(), 1);
        assert!(restored.ledger().cash < Decimal::new(500_000, 0));
    }

    #[test]
    fn version_mismatch_is_refused() {
        let sim = played_sim();
        let mut save = snapshot(&sim);
        save.version = 99;
        match restore(save.clone(), demo_scenario(42)) {
            Err(SaveError::VersionMismatch { found, expected }) => {
                assert_eq!(found, 99);
                assert_eq!(expected, SAVE_VERSION);
            }
            Err(other) => panic!("expected version mismatch, got {other}"),
            Ok(_) => panic!("expected version mismatch, got Ok"),
        }
        let bytes = bincode::serialize(&save).unwrap();
        assert!(matches!(
            from_bytes(&bytes),
            Err(SaveError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn restored_sim_keeps_playing() {
        let sim = played_sim();
        let save = snapshot(&sim);
        let mut restored = restore(save, demo_scenario(42)).unwrap();
        restored.advance_period().unwrap();
        assert_eq!(restored.current_turn(), 4);
    }
}
