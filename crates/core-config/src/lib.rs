//! Configuration loading, parsing and validation.
//!
//! Parses `nanopond.toml` (or an override path provided by the binary) with
//! every field defaulted to the canonical tunables, then validates the
//! result into a [`Config`]. Unknown fields are ignored so the file format
//! can grow without breaking older files.
//!
//! Validation is fail-fast: a malformed file or an out-of-range parameter
//! (depth not a power of two, 1x1 grid, unknown neighbor count, zero
//! frequency) aborts startup rather than falling back to defaults, since a
//! silently substituted parameter would change the simulation trajectory
//! without a trace. A missing file is not an error; it just means "all
//! defaults".

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GridConfig {
    pub x: usize,
    pub y: usize,
    /// Genome depth in codons; must be a power of two, at least 16.
    pub depth: usize,
    /// Neighborhood size: 4, 6 or 8.
    pub neighbors: u8,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            x: 640,
            y: 480,
            depth: 512,
            neighbors: 6,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Ticks between CSV report rows.
    pub report: u64,
    /// Ticks between refresh callbacks (frame pacing / input polling).
    pub refresh: u64,
    /// Ticks between genome dumps.
    pub dump: u64,
    /// Ticks between seeding events.
    pub inflow: u64,
    /// Stop after this many ticks; absent means run unbounded.
    pub stop_at: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            report: 1_000_000,
            refresh: 20_000,
            dump: 10_000_000,
            inflow: 100,
            stop_at: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InflowConfig {
    pub rate_base: u64,
    /// Uniform extra energy in `[0, rate_variation)` added per seeding; 0
    /// disables the variation.
    pub rate_variation: u64,
    /// Skip the energy grant when the target cell already holds this much.
    /// 0 disables the cap.
    pub cell_energy_cap: u64,
    /// Skip the energy grant when the pond total (as of the last report
    /// scan) reaches this. 0 disables the cap.
    pub total_energy_cap: u64,
}

impl Default for InflowConfig {
    fn default() -> Self {
        Self {
            rate_base: 2_000,
            rate_variation: 4_000,
            cell_energy_cap: 10_000,
            total_energy_cap: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Mutation probability per fetched instruction, out of 2^32.
    pub mutation_rate: u32,
    /// Divisor for the energy charge on a denied KILL of a viable cell.
    pub failed_kill_penalty: u64,
    /// Energy debited from a parent on successful birth, and the minimum
    /// energy required to attempt one.
    pub reproduction_cost: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 100_000,
            failed_kill_penalty: 3,
            reproduction_cost: 20,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FlagsConfig {
    /// Zero offspring RAM instead of randomising it.
    pub clear_ram_on_birth: bool,
    /// Randomise one RAM byte after an execution that ends with no energy.
    pub decay_ram_when_idle: bool,
    /// Access sense used by the TURN gene-combination test: 0 or 1.
    pub combine_sense: u8,
}

impl Default for FlagsConfig {
    fn default() -> Self {
        Self {
            clear_ram_on_birth: false,
            decay_ram_when_idle: false,
            combine_sense: 0,
        }
    }
}

/// Raw parse tree of the config file.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ConfigFile {
    pub grid: GridConfig,
    pub schedule: ScheduleConfig,
    pub inflow: InflowConfig,
    pub evolution: EvolutionConfig,
    pub flags: FlagsConfig,
    /// PRNG seed; wall clock when absent.
    pub seed: Option<u32>,
}

/// Validated configuration consumed by the engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub grid: GridConfig,
    pub schedule: ScheduleConfig,
    pub inflow: InflowConfig,
    pub evolution: EvolutionConfig,
    pub flags: FlagsConfig,
    pub seed: Option<u32>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("genome depth {0} must be a power of two")]
    DepthNotPowerOfTwo(usize),
    #[error("genome depth {0} must be at least 16")]
    DepthTooSmall(usize),
    #[error("pond dimensions {0}x{1} must both be at least 2")]
    GridTooSmall(usize, usize),
    #[error("neighbor count {0} is not one of 4, 6, 8")]
    BadNeighborCount(u8),
    #[error("{0} frequency must be at least 1 tick")]
    ZeroFrequency(&'static str),
    #[error("failed_kill_penalty must be at least 1")]
    ZeroKillPenalty,
    #[error("combine_sense {0} must be 0 or 1")]
    BadCombineSense(u8),
}

impl ConfigFile {
    pub fn validate(self) -> std::result::Result<Config, ConfigError> {
        let g = &self.grid;
        if !g.depth.is_power_of_two() {
            return Err(ConfigError::DepthNotPowerOfTwo(g.depth));
        }
        if g.depth < 16 {
            return Err(ConfigError::DepthTooSmall(g.depth));
        }
        if g.x < 2 || g.y < 2 {
            return Err(ConfigError::GridTooSmall(g.x, g.y));
        }
        if !matches!(g.neighbors, 4 | 6 | 8) {
            return Err(ConfigError::BadNeighborCount(g.neighbors));
        }
        let s = &self.schedule;
        for (name, f) in [
            ("report", s.report),
            ("refresh", s.refresh),
            ("dump", s.dump),
            ("inflow", s.inflow),
        ] {
            if f == 0 {
                return Err(ConfigError::ZeroFrequency(name));
            }
        }
        if self.evolution.failed_kill_penalty == 0 {
            return Err(ConfigError::ZeroKillPenalty);
        }
        if self.flags.combine_sense > 1 {
            return Err(ConfigError::BadCombineSense(self.flags.combine_sense));
        }
        Ok(Config {
            grid: self.grid,
            schedule: self.schedule,
            inflow: self.inflow,
            evolution: self.evolution,
            flags: self.flags,
            seed: self.seed,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigFile::default()
            .validate()
            .expect("default configuration is valid")
    }
}

/// Best-effort config path: local `nanopond.toml` first, then the platform
/// config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("nanopond.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("nanopond").join("nanopond.toml");
    }
    PathBuf::from("nanopond.toml")
}

/// Loads and validates the config file at `path` (or the discovered
/// location). A missing file yields the defaults; a malformed or invalid
/// file is an error.
pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let file = match fs::read_to_string(&path) {
        Ok(content) => {
            info!(target: "config", path = %path.display(), "config_file_loaded");
            toml::from_str::<ConfigFile>(&content)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        Err(_) => {
            info!(target: "config", path = %path.display(), "config_file_absent_using_defaults");
            ConfigFile::default()
        }
    };
    file.validate()
        .with_context(|| format!("validating {}", path.display()))
}
