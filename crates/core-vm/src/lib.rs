//! The cell virtual machine: instruction set, access-permission oracle,
//! memory window, and per-tick genome execution.
//!
//! The instruction set is evolvable by construction: every 5-bit codon
//! decodes to a defined operation, every operation is total on every
//! reachable VM state, and failed inter-cell accesses degrade to no-ops or
//! penalties instead of faults. Execution of one cell is a single
//! synchronous call; all effects on the pond (genome edits, energy
//! movement, births) are applied through index pairs before it returns.

pub mod access;
pub mod exec;
pub mod isa;
pub mod mem;
pub mod stats;

pub use access::{Sense, access_allowed};
pub use exec::{ExecEnv, VmScratch, run_cell};
pub use isa::{CODON_CHARS, Opcode, codon_char};
pub use stats::StatCounters;

/// Evolution parameters and behavior flags consumed by the VM. The engine
/// builds one from the validated configuration.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Mutation probability per fetched instruction, out of 2^32.
    pub mutation_rate: u32,
    /// Divisor for the energy charge on a denied KILL of a viable target.
    pub failed_kill_penalty: u64,
    /// Energy debited on a successful birth; also the minimum energy
    /// required to attempt one.
    pub reproduction_cost: u64,
    /// Zero offspring RAM instead of randomising it.
    pub clear_ram_on_birth: bool,
    /// Randomise one RAM byte when an execution ends with no energy left.
    pub decay_ram_when_idle: bool,
    /// Access sense for the TURN gene-combination test.
    pub combine_sense: Sense,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            mutation_rate: 100_000,
            failed_kill_penalty: 3,
            reproduction_cost: 20,
            clear_ram_on_birth: false,
            decay_ram_when_idle: false,
            combine_sense: Sense::Negative,
        }
    }
}
