//! Scheduler and reproduction lifecycle scenarios.

use core_config::{Config, ConfigFile};
use core_engine::{Control, Engine, Observer, Report};
use core_pond::{Census, Pond};

const READG: u8 = 5;
const WRITEO: u8 = 8;
const FWD: u8 = 1;
const REP: u8 = 10;

fn config(mutate: impl FnOnce(&mut ConfigFile)) -> Config {
    let mut file = ConfigFile::default();
    file.grid.x = 8;
    file.grid.y = 8;
    file.grid.depth = 16;
    file.schedule.report = 1_000;
    file.schedule.refresh = 1_000;
    file.schedule.dump = 1_000;
    file.schedule.inflow = 1_000;
    file.seed = Some(2024);
    mutate(&mut file);
    file.validate().unwrap()
}

#[derive(Default)]
struct Recorder {
    reports: Vec<Report>,
    refreshes: Vec<u64>,
    dumps: Vec<u64>,
    stop_after_refreshes: Option<usize>,
}

impl Observer for Recorder {
    fn on_report(&mut self, _clock: u64, report: &Report) {
        self.reports.push(report.clone());
    }

    fn on_refresh(&mut self, clock: u64, _pond: &Pond, _census: &Census) -> Control {
        self.refreshes.push(clock);
        match self.stop_after_refreshes {
            Some(n) if self.refreshes.len() >= n => Control::Stop,
            _ => Control::Continue,
        }
    }

    fn on_dump(&mut self, clock: u64, _pond: &Pond) {
        self.dumps.push(clock);
    }
}

#[test]
fn replicator_gives_birth_into_faced_neighbor() {
    let mut engine = Engine::new(config(|file| {
        file.evolution.mutation_rate = 0;
    }));
    {
        let pond = engine.pond_mut();
        let parent = pond.cell_mut(1, 1);
        parent.id = 5;
        parent.lineage = 5;
        parent.generation = 3;
        parent.energy = 100;
        parent.set_facing(1); // odd row: east, toward (2, 1)
        for (i, &c) in [READG, WRITEO, FWD, REP].iter().enumerate() {
            parent.set_codon(i, c);
        }
        pond.cell_mut(2, 1).energy = 50;
    }

    engine.step_cell(1, 1);

    let child = engine.pond().cell(2, 1);
    assert_eq!(child.parent_id, 5);
    assert_eq!(child.lineage, 5);
    assert_eq!(child.generation, 4);
    assert!(child.id > 0, "child got a fresh id");
    // The output buffer held the first copied codon; the rest stayed STOP.
    assert_eq!(child.codon(0), READG);
    assert!(child.genome()[1..].iter().all(|&c| c == 0));
    // Five fetches (READG WRITEO FWD REP STOP) plus the reproduction cost.
    assert_eq!(engine.pond().cell(1, 1).energy, 100 - 5 - 20);
}

#[test]
fn repeated_births_assign_strictly_increasing_ids() {
    let mut engine = Engine::new(config(|file| {
        file.evolution.mutation_rate = 0;
    }));
    let mut last_id = 0;
    for round in 0..5u64 {
        {
            let pond = engine.pond_mut();
            let parent = pond.cell_mut(1, 1);
            parent.id = 1000 + round;
            parent.lineage = 9;
            parent.generation = round;
            parent.energy = 100;
            parent.set_facing(1);
            for (i, &c) in [READG, WRITEO, FWD, REP].iter().enumerate() {
                parent.set_codon(i, c);
            }
            pond.cell_mut(2, 1).energy = 50;
            pond.cell_mut(2, 1).parent_id = 0;
        }
        engine.step_cell(1, 1);
        let child_id = engine.pond().cell(2, 1).id;
        assert!(child_id > last_id, "{child_id} !> {last_id}");
        last_id = child_id;
    }
}

#[test]
fn observer_cadence_follows_frequencies() {
    let mut engine = Engine::new(config(|file| {
        file.schedule.report = 2;
        file.schedule.refresh = 3;
        file.schedule.dump = 5;
        file.schedule.inflow = 7;
        file.schedule.stop_at = Some(12);
    }));
    let mut recorder = Recorder::default();
    let mut observers: Vec<Box<dyn Observer + '_>> = vec![Box::new(&mut recorder)];
    engine.run(&mut observers);
    drop(observers);

    assert_eq!(
        recorder.reports.iter().map(|r| r.clock).collect::<Vec<_>>(),
        vec![0, 2, 4, 6, 8, 10]
    );
    assert_eq!(recorder.refreshes, vec![0, 3, 6, 9]);
    // Periodic dumps plus the final stop_at dump.
    assert_eq!(recorder.dumps, vec![0, 5, 10, 12]);
}

#[test]
fn counters_reset_after_each_report() {
    let mut engine = Engine::new(config(|file| {
        file.schedule.report = 1;
        file.schedule.stop_at = Some(3);
    }));
    let mut recorder = Recorder::default();
    let mut observers: Vec<Box<dyn Observer + '_>> = vec![Box::new(&mut recorder)];
    engine.run(&mut observers);
    drop(observers);

    // Every tick executes exactly one cell, and every tick reports, so
    // each report after the first carries exactly one cell execution.
    assert_eq!(recorder.reports[0].counters.cell_executions, 0.0);
    for report in &recorder.reports[1..] {
        assert_eq!(report.counters.cell_executions, 1.0);
    }
}

#[test]
fn refresh_observer_can_stop_the_run() {
    let mut engine = Engine::new(config(|file| {
        file.schedule.refresh = 4;
    }));
    let mut recorder = Recorder {
        stop_after_refreshes: Some(3),
        ..Recorder::default()
    };
    let mut observers: Vec<Box<dyn Observer + '_>> = vec![Box::new(&mut recorder)];
    engine.run(&mut observers);
    drop(observers);

    // Refreshes at 0, 4, 8; the third one stops the run mid-tick.
    assert_eq!(recorder.refreshes, vec![0, 4, 8]);
    assert_eq!(engine.clock(), 8);
}

#[test]
fn inflow_populates_the_pond_over_time() {
    let mut engine = Engine::new(config(|file| {
        file.schedule.inflow = 2;
        file.schedule.stop_at = Some(200);
        file.inflow.rate_base = 100;
        file.inflow.rate_variation = 100;
    }));
    let mut observers: Vec<Box<dyn Observer + '_>> = vec![];
    engine.run(&mut observers);

    let seeded = engine.pond().iter().filter(|(_, c)| c.id != 0).count();
    assert!(seeded > 10, "expected many seeded cells, got {seeded}");
    let energetic = engine.pond().iter().filter(|(_, c)| c.energy > 0).count();
    assert!(energetic > 0);
}
