//! Report and dump observers: the CSV statistics stream and the periodic
//! genome dump files.
//!
//! Both are ordinary [`Observer`]s wired up by the binary. The reporter
//! renders one row per report boundary in the original column layout
//! (groups separated by literal `|` columns) and flushes the sink so the
//! stream stays tail-able. The dumper writes one `<clock>.dump.csv` per
//! boundary; a file that cannot be opened is logged and skipped, never
//! fatal.

use core_engine::{Observer, Report};
use core_pond::{NUM_INST, Pond, STOP_CODON};
use core_vm::codon_char;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Streams one CSV row per report to any `Write` sink.
///
/// Columns: clock, total energy, max cell energy, max living cell energy,
/// mean living energy, mean viable energy, `|`, active/living/viable cell
/// counts, max generation, `|`, the eight memory access counters, `|`,
/// viable cells replaced/killed/shared, `|`, 32 per-instruction execution
/// frequencies, metabolism. Frequencies are per cell execution; means
/// over empty tiers render as 0.
pub struct CsvReporter<W: Write> {
    sink: W,
    last_viable: u64,
}

impl<W: Write> CsvReporter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            last_viable: 0,
        }
    }

    fn render(report: &Report) -> String {
        let census = &report.census;
        let counters = &report.counters;
        let mut row = format!(
            "{},{},{},{},{:.2},{:.2},|,{},{},{},{},|,{},{},{},{},{},{},{},{},|,{},{},{},|",
            report.clock,
            census.total_energy,
            census.max_cell_energy,
            census.max_living_cell_energy,
            census.mean_living_energy(),
            census.mean_viable_energy(),
            census.active_cells,
            census.living_cells,
            census.viable_cells,
            census.max_generation,
            counters.mem_special_reads,
            counters.mem_private_reads,
            counters.mem_output_reads,
            counters.mem_input_reads,
            counters.mem_special_writes,
            counters.mem_private_writes,
            counters.mem_output_writes,
            counters.mem_input_writes,
            counters.viable_cells_replaced,
            counters.viable_cells_killed,
            counters.viable_cell_shares,
        );
        let executions = counters.cell_executions;
        for i in 0..NUM_INST {
            let frequency = if executions > 0.0 {
                counters.instruction_executions[i] / executions
            } else {
                0.0
            };
            row.push_str(&format!(",{frequency:.4}"));
        }
        let metabolism = if executions > 0.0 {
            counters.total_metabolism() / executions
        } else {
            0.0
        };
        row.push_str(&format!(",{metabolism:.4}"));
        row
    }
}

impl<W: Write> Observer for CsvReporter<W> {
    fn on_report(&mut self, clock: u64, report: &Report) {
        let row = Self::render(report);
        if let Err(error) = writeln!(self.sink, "{row}").and_then(|()| self.sink.flush()) {
            warn!(target: "report", clock, %error, "report_row_write_failed");
        }

        let viable = report.census.viable_cells;
        if self.last_viable > 0 && viable == 0 {
            info!(target: "report", clock, "viable_replicators_extinct");
        } else if self.last_viable == 0 && viable > 0 {
            info!(target: "report", clock, "viable_replicators_appeared");
        }
        self.last_viable = viable;
    }
}

/// Writes every viable, energetic cell to `<clock>.dump.csv` under the
/// configured directory.
pub struct GenomeDumper {
    dir: PathBuf,
}

impl GenomeDumper {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Row: `id,parent_id,lineage,generation,logo,facing,<genome>` in the
    /// codon alphabet. Runs of STOP collapse: the first STOP keeps its
    /// character, the next three render as `.`, anything longer is cut.
    fn render_cell(cell: &core_pond::Cell) -> String {
        let mut row = format!(
            "{},{},{},{},{},{},",
            cell.id,
            cell.parent_id,
            cell.lineage,
            cell.generation,
            codon_char(cell.logo()),
            codon_char(cell.facing()),
        );
        let mut stop_run = 0usize;
        for &codon in cell.genome() {
            if codon == STOP_CODON {
                stop_run += 1;
            } else {
                stop_run = 0;
            }
            if stop_run < 5 {
                row.push(if stop_run > 1 { '.' } else { codon_char(codon) });
            }
        }
        row
    }
}

impl Observer for GenomeDumper {
    fn on_dump(&mut self, clock: u64, pond: &Pond) {
        let path = self.dir.join(format!("{clock}.dump.csv"));
        let file = match File::create(&path) {
            Ok(file) => file,
            Err(error) => {
                warn!(target: "dump", clock, path = %path.display(), %error, "dump_open_failed");
                return;
            }
        };
        info!(target: "dump", clock, path = %path.display(), "dumping_viable_cells");
        let mut sink = BufWriter::new(file);
        let mut rows = 0u64;
        for (_, cell) in pond.iter() {
            if cell.energy > 0 && cell.is_viable() {
                if let Err(error) = writeln!(sink, "{}", Self::render_cell(cell)) {
                    warn!(target: "dump", clock, %error, "dump_row_write_failed");
                    return;
                }
                rows += 1;
            }
        }
        if let Err(error) = sink.flush() {
            warn!(target: "dump", clock, %error, "dump_flush_failed");
        }
        info!(target: "dump", clock, rows, "dump_complete");
    }
}
