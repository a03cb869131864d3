//! Per-report tally counters.
//!
//! Accumulated by the VM and the engine between report boundaries and
//! zeroed after each report is rendered. Instruction tallies are `f64`
//! because the report divides them by the (also fractional-friendly)
//! execution count; the event counters are exact.

use core_pond::NUM_INST;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatCounters {
    /// Executions per instruction since the last report. Skipped
    /// instructions inside a false LOOP body are not counted.
    pub instruction_executions: [f64; NUM_INST],
    /// Cell executions since the last report; incremented even when the
    /// chosen cell is dormant and the fetch loop never runs.
    pub cell_executions: f64,
    /// Viable cells replaced by another cell's offspring.
    pub viable_cells_replaced: u64,
    /// Viable cells destroyed by KILL.
    pub viable_cells_killed: u64,
    /// SHARE operations that reached a viable cell.
    pub viable_cell_shares: u64,

    pub mem_special_reads: u64,
    pub mem_private_reads: u64,
    pub mem_output_reads: u64,
    pub mem_input_reads: u64,

    pub mem_special_writes: u64,
    pub mem_private_writes: u64,
    pub mem_output_writes: u64,
    pub mem_input_writes: u64,
}

impl StatCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter; called after each report.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Sum of all instruction executions since the last report.
    pub fn total_metabolism(&self) -> f64 {
        self.instruction_executions.iter().sum()
    }
}
