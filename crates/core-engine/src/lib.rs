//! The outer simulation loop.
//!
//! `Engine` bundles everything the original kept in globals (pond, PRNG,
//! id counter, per-report tallies) into one value owned by the caller.
//! One `tick` runs one scheduler pass: due observer callbacks, possibly a
//! seeding event, then execution of one randomly chosen cell to
//! completion. Strictly sequential; observers run synchronously between
//! phases and see the pond through shared references only.

use core_config::Config;
use core_grid::{Grid, Topology};
use core_pond::{Census, IdCounter, Pond};
use core_rng::Mt19937;
use core_vm::{ExecEnv, Sense, StatCounters, Tuning, VmScratch, run_cell};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

mod observer;

pub use observer::{Control, NoopObserver, Observer};

/// Snapshot handed to `on_report`: the fresh whole-pond census plus the
/// tallies accumulated since the previous report.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub clock: u64,
    pub census: Census,
    pub counters: StatCounters,
}

pub struct Engine {
    config: Config,
    tuning: Tuning,
    grid: Grid,
    pond: Pond,
    rng: Mt19937,
    ids: IdCounter,
    counters: StatCounters,
    scratch: VmScratch,
    /// Census as of the last report boundary; feeds the total-energy
    /// inflow cap and the energy-relative color schemes.
    census: Census,
    clock: u64,
    seed: u32,
}

impl Engine {
    /// Builds a zeroed pond from a validated configuration. The PRNG seed
    /// comes from the config or, failing that, the wall clock.
    pub fn new(config: Config) -> Self {
        let seed = config.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as u32)
                .unwrap_or(0)
        });
        let topology = Topology::from_neighbor_count(config.grid.neighbors)
            .expect("neighbor count validated by config");
        let grid = Grid::new(config.grid.x, config.grid.y, topology);
        let pond = Pond::new(config.grid.x, config.grid.y, config.grid.depth);
        let tuning = Tuning {
            mutation_rate: config.evolution.mutation_rate,
            failed_kill_penalty: config.evolution.failed_kill_penalty,
            reproduction_cost: config.evolution.reproduction_cost,
            clear_ram_on_birth: config.flags.clear_ram_on_birth,
            decay_ram_when_idle: config.flags.decay_ram_when_idle,
            combine_sense: Sense::from_flag(config.flags.combine_sense),
        };
        let scratch = VmScratch::new(config.grid.depth);
        info!(
            target: "engine",
            width = config.grid.x,
            height = config.grid.y,
            depth = config.grid.depth,
            neighbors = config.grid.neighbors,
            seed,
            "engine_initialized"
        );
        Self {
            config,
            tuning,
            grid,
            pond,
            rng: Mt19937::warmed(seed),
            ids: IdCounter::default(),
            counters: StatCounters::new(),
            scratch,
            census: Census::default(),
            clock: 0,
            seed,
        }
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pond(&self) -> &Pond {
        &self.pond
    }

    /// Direct pond access for the owner (scenario setup, inspection).
    /// Observers never see this; they get shared references only.
    pub fn pond_mut(&mut self) -> &mut Pond {
        &mut self.pond
    }

    /// Census taken at the last report boundary.
    pub fn census(&self) -> &Census {
        &self.census
    }

    pub fn counters(&self) -> &StatCounters {
        &self.counters
    }

    /// Runs until `stop_at` (if configured) or until an observer signals
    /// stop from its refresh callback. A `stop_at` exit emits a final
    /// dump first.
    pub fn run(&mut self, observers: &mut [Box<dyn Observer + '_>]) {
        loop {
            if let Some(stop_at) = self.config.schedule.stop_at
                && self.clock >= stop_at
            {
                for obs in observers.iter_mut() {
                    obs.on_dump(self.clock, &self.pond);
                }
                info!(target: "engine", clock = self.clock, "stop_at_reached");
                return;
            }
            if self.tick(observers) == Control::Stop {
                info!(target: "engine", clock = self.clock, "stopped_by_observer");
                return;
            }
        }
    }

    /// One scheduler pass. Returns `Control::Stop` when a refresh observer
    /// asks to terminate; the remainder of that tick is skipped, matching
    /// the between-ticks-only cancellation contract.
    pub fn tick(&mut self, observers: &mut [Box<dyn Observer + '_>]) -> Control {
        let clock = self.clock;

        if clock % self.config.schedule.report == 0 {
            self.report(observers);
        }
        if clock % self.config.schedule.refresh == 0 {
            for obs in observers.iter_mut() {
                if obs.on_refresh(clock, &self.pond, &self.census) == Control::Stop {
                    return Control::Stop;
                }
            }
        }
        if clock % self.config.schedule.dump == 0 {
            for obs in observers.iter_mut() {
                obs.on_dump(clock, &self.pond);
            }
        }
        if clock % self.config.schedule.inflow == 0 {
            self.seed_random_cell();
        }

        let x = (self.rng.next_word() % self.pond.width() as u64) as usize;
        let y = (self.rng.next_word() % self.pond.height() as u64) as usize;
        self.step_cell(x, y);

        self.clock += 1;
        Control::Continue
    }

    /// Executes the cell at `(x, y)` to completion (one unit of scheduling
    /// work, normally driven by `tick`'s random pick).
    pub fn step_cell(&mut self, x: usize, y: usize) {
        let mut env = ExecEnv {
            pond: &mut self.pond,
            grid: &self.grid,
            rng: &mut self.rng,
            ids: &mut self.ids,
            counters: &mut self.counters,
        };
        run_cell(&mut env, &self.tuning, &mut self.scratch, (x, y));
    }

    fn report(&mut self, observers: &mut [Box<dyn Observer + '_>]) {
        self.census = Census::scan(&self.pond);
        let report = Report {
            clock: self.clock,
            census: self.census,
            counters: self.counters.clone(),
        };
        for obs in observers.iter_mut() {
            obs.on_report(self.clock, &report);
        }
        self.counters.reset();
    }

    /// Inflow: refresh a random position with a fresh identity, a fully
    /// random genome, and an energy grant subject to the optional caps. A
    /// capped grant still refreshes identity, genome and RAM.
    fn seed_random_cell(&mut self) {
        let x = (self.rng.next_word() % self.pond.width() as u64) as usize;
        let y = (self.rng.next_word() % self.pond.height() as u64) as usize;
        let id = self.ids.fresh();
        let inflow = self.config.inflow.clone();
        let clear_ram = self.config.flags.clear_ram_on_birth;
        let total_energy = self.census.total_energy;
        let depth = self.pond.depth();

        let rng = &mut self.rng;
        let cell = self.pond.cell_mut(x, y);
        cell.id = id;
        cell.parent_id = 0;
        cell.lineage = id;
        cell.generation = 0;
        cell.set_logo(0);
        cell.set_facing(0);

        let total_ok = inflow.total_energy_cap == 0 || total_energy < inflow.total_energy_cap;
        let cell_ok = inflow.cell_energy_cap == 0 || cell.energy < inflow.cell_energy_cap;
        if total_ok && cell_ok {
            let extra = if inflow.rate_variation > 0 {
                rng.next_word() % inflow.rate_variation
            } else {
                0
            };
            cell.energy += inflow.rate_base + extra;
        }

        for i in 0..depth {
            cell.set_codon(i, rng.next_word() as u8);
        }
        for i in 0..core_pond::RAM_SIZE {
            if clear_ram {
                cell.set_ram(i, 0);
            } else {
                cell.set_ram(i, rng.next_word() as u8);
            }
        }
    }
}
