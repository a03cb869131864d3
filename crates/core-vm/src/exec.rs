//! Per-tick execution of one cell's genome.
//!
//! The fetch loop runs until the cell stops, overflows its loop stack, or
//! runs out of energy; every fetched instruction costs one unit. Mutation
//! is injected inside the loop, between fetch and dispatch, so a
//! perturbation can corrupt a copy in progress; that is the only channel
//! through which genome edits reach offspring.
//!
//! Interactions with the faced neighbor (KILL, SHARE, TURN, the memory
//! input band, and the end-of-execution birth) address the pond through
//! index pairs; the VM itself holds positions, never references.

use core_grid::Grid;
use core_pond::{IdCounter, INST_MASK, MEM_MASK, Pond, RAM_SIZE, STOP_CODON};
use core_rng::Mt19937;
use tracing::trace;

use crate::Tuning;
use crate::access::{Sense, access_allowed};
use crate::isa::Opcode;
use crate::mem;
use crate::stats::StatCounters;

/// Everything a cell execution may touch. Field borrows are disjoint so
/// the executor can hold the pond mutably while drawing randomness and
/// bumping counters.
pub struct ExecEnv<'a> {
    pub pond: &'a mut Pond,
    pub grid: &'a Grid,
    pub rng: &'a mut Mt19937,
    pub ids: &'a mut IdCounter,
    pub counters: &'a mut StatCounters,
}

/// Reusable per-execution buffers, sized once at startup: the candidate
/// offspring output buffer and the LOOP return stack (capacity = genome
/// depth; a push past that ends the execution).
#[derive(Debug)]
pub struct VmScratch {
    out: Box<[u8]>,
    loop_stack: Vec<usize>,
}

impl VmScratch {
    pub fn new(depth: usize) -> Self {
        Self {
            out: vec![STOP_CODON; depth].into_boxed_slice(),
            loop_stack: Vec::with_capacity(depth),
        }
    }

    fn reset(&mut self) {
        self.out.fill(STOP_CODON);
        self.loop_stack.clear();
    }

    /// Output buffer as left by the last execution.
    pub fn out(&self) -> &[u8] {
        &self.out
    }
}

/// Execute the cell at `pos` to completion, applying all side effects.
pub fn run_cell(env: &mut ExecEnv<'_>, tuning: &Tuning, scratch: &mut VmScratch, pos: (usize, usize)) {
    let (x, y) = pos;
    let depth = env.pond.depth();
    debug_assert_eq!(scratch.out.len(), depth);
    let depth_mask = depth - 1;

    scratch.reset();
    let mut ip: usize = 0;
    let mut reg: u8 = 0;
    let mut io: usize = 0;
    let mut mp: u8 = 0;
    let mut false_loop_depth: usize = 0;
    let mut stop = false;

    env.counters.cell_executions += 1.0;

    while env.pond.cell(x, y).energy > 0 && !stop {
        let mut inst = env.pond.cell(x, y).codon(ip);

        // Mutation injection: one perturbation, selected by two bits of a
        // second draw, aimed at the fetched instruction, the register, the
        // memory pointer, or one RAM byte.
        if (env.rng.next_word() & 0xffff_ffff) < tuning.mutation_rate as u64 {
            let m = env.rng.next_word();
            if m & 0x20000 != 0 {
                if m & 0x10000 != 0 {
                    inst = (m as u8) & INST_MASK;
                } else {
                    reg = m as u8;
                }
            } else if m & 0x10000 != 0 {
                mp = (m as u8) & MEM_MASK;
            } else {
                env.pond
                    .cell_mut(x, y)
                    .set_ram(((m >> 8) & 0xf) as usize, m as u8);
            }
        }

        env.pond.cell_mut(x, y).energy -= 1;

        if false_loop_depth > 0 {
            // Skipping a taken-false LOOP: only loop structure matters.
            match Opcode::decode(inst) {
                Opcode::Loop => false_loop_depth += 1,
                Opcode::Rep => false_loop_depth -= 1,
                _ => {}
            }
        } else {
            env.counters.instruction_executions[(inst & INST_MASK) as usize] += 1.0;

            match Opcode::decode(inst) {
                Opcode::Stop => stop = true,
                Opcode::Fwd => io = (io + 1) & depth_mask,
                Opcode::Back => io = (io + depth - 1) & depth_mask,
                Opcode::Inc => reg = reg.wrapping_add(1),
                Opcode::Dec => reg = reg.wrapping_sub(1),
                Opcode::ReadG => reg = env.pond.cell(x, y).codon(io),
                Opcode::WriteG => env.pond.cell_mut(x, y).set_codon(io, reg),
                Opcode::ReadO => reg = scratch.out[io],
                Opcode::WriteO => scratch.out[io] = reg & INST_MASK,
                Opcode::Loop => {
                    if reg != 0 {
                        if scratch.loop_stack.len() >= depth {
                            stop = true;
                        } else {
                            scratch.loop_stack.push(ip);
                        }
                    } else {
                        false_loop_depth = 1;
                    }
                }
                Opcode::Rep => {
                    if let Some(top) = scratch.loop_stack.pop()
                        && reg != 0
                    {
                        // Re-run the LOOP slot itself, not the one after it.
                        ip = top;
                        continue;
                    }
                }
                Opcode::Turn => {
                    // Gene-combination read, not a rotation: viable cells
                    // facing viable, accessible neighbors read one codon
                    // from a randomly chosen genome of the two.
                    if env.pond.cell(x, y).is_viable() {
                        let facing = env.pond.cell(x, y).facing();
                        let (nx, ny) = env.grid.neighbor(x, y, facing);
                        let combinable = env.pond.cell(nx, ny).is_viable()
                            && access_allowed(
                                env.rng,
                                env.pond.cell(nx, ny),
                                reg,
                                tuning.combine_sense,
                            );
                        reg = if combinable {
                            if env.rng.next_word() & 0x8 != 0 {
                                env.pond.cell(x, y).codon(io)
                            } else {
                                env.pond.cell(nx, ny).codon(io)
                            }
                        } else {
                            env.pond.cell(x, y).codon(io)
                        };
                    } else {
                        reg = env.pond.cell(x, y).codon(io);
                    }
                }
                Opcode::Xchg => {
                    ip = (ip + 1) & depth_mask;
                    let cell = env.pond.cell_mut(x, y);
                    let swapped = cell.codon(ip);
                    cell.set_codon(ip, reg);
                    reg = swapped;
                }
                Opcode::Kill => {
                    let facing = env.pond.cell(x, y).facing();
                    let (nx, ny) = env.grid.neighbor(x, y, facing);
                    let target_viable = env.pond.cell(nx, ny).is_viable();
                    if access_allowed(env.rng, env.pond.cell(nx, ny), reg, Sense::Negative) {
                        if target_viable {
                            env.counters.viable_cells_killed += 1;
                        }
                        let fresh = env.ids.fresh();
                        env.pond.cell_mut(nx, ny).reset_killed(fresh);
                        trace!(target: "vm", x, y, nx, ny, "kill");
                    } else if target_viable {
                        let attacker = env.pond.cell_mut(x, y);
                        let penalty = attacker.energy / tuning.failed_kill_penalty;
                        attacker.energy = attacker.energy.saturating_sub(penalty);
                    }
                }
                Opcode::Share => {
                    let facing = env.pond.cell(x, y).facing();
                    let (nx, ny) = env.grid.neighbor(x, y, facing);
                    if access_allowed(env.rng, env.pond.cell(nx, ny), reg, Sense::Positive) {
                        let (me, neighbor) = env.pond.pair_mut((x, y), (nx, ny));
                        if neighbor.is_viable() {
                            env.counters.viable_cell_shares += 1;
                        }
                        let pot = me.energy + neighbor.energy;
                        neighbor.energy = pot / 2;
                        me.energy = pot - neighbor.energy;
                    }
                }
                Opcode::Zero => reg = 0,
                Opcode::SetP => io = (reg as usize) & depth_mask,
                Opcode::NextB => mp = mp.wrapping_add(8) & MEM_MASK,
                Opcode::PrevB => mp = mp.wrapping_sub(8) & MEM_MASK,
                Opcode::NextM => mp = mp.wrapping_add(1) & MEM_MASK,
                Opcode::PrevM => mp = mp.wrapping_sub(1) & MEM_MASK,
                Opcode::ReadM => {
                    reg = mem::read(env.pond, env.grid, env.counters, (x, y), mp);
                }
                Opcode::WriteM => {
                    mem::write(env.pond, env.grid, env.rng, env.counters, (x, y), mp, reg);
                }
                Opcode::ClearM => env.pond.cell_mut(x, y).clear_ram(),
                Opcode::Add => {
                    let operand = mem::read(env.pond, env.grid, env.counters, (x, y), mp);
                    reg = reg.wrapping_add(operand);
                }
                Opcode::Sub => {
                    let operand = mem::read(env.pond, env.grid, env.counters, (x, y), mp);
                    reg = reg.wrapping_sub(operand);
                }
                Opcode::Mul => {
                    let operand = mem::read(env.pond, env.grid, env.counters, (x, y), mp);
                    reg = reg.wrapping_mul(operand);
                }
                Opcode::Div => {
                    let operand = mem::read(env.pond, env.grid, env.counters, (x, y), mp);
                    reg = if operand != 0 { reg / operand } else { 0 };
                }
                Opcode::Shl => reg <<= 1,
                Opcode::Shr => reg >>= 1,
                Opcode::SetMp => mp = reg & MEM_MASK,
                Opcode::Rand => reg = env.rng.next_word() as u8,
            }
        }

        ip = (ip + 1) & depth_mask;
    }

    finish_execution(env, tuning, scratch, pos, reg);
}

/// Post-loop effects: idle RAM decay, or the birth attempt into the faced
/// neighbor.
fn finish_execution(
    env: &mut ExecEnv<'_>,
    tuning: &Tuning,
    scratch: &VmScratch,
    (x, y): (usize, usize),
    reg: u8,
) {
    let energy = env.pond.cell(x, y).energy;
    if energy == 0 {
        if tuning.decay_ram_when_idle {
            let w = env.rng.next_word();
            env.pond
                .cell_mut(x, y)
                .set_ram(((w >> 8) & 0xf) as usize, w as u8);
        }
        return;
    }
    if energy < tuning.reproduction_cost || scratch.out[0] == STOP_CODON {
        return;
    }

    // A candidate offspring only lands in a cell that already holds
    // energy: anything copied into a dormant slot would never run and
    // would eventually be overwritten by seeding anyway.
    let facing = env.pond.cell(x, y).facing();
    let (nx, ny) = env.grid.neighbor(x, y, facing);
    if env.pond.cell(nx, ny).energy > 0
        && access_allowed(env.rng, env.pond.cell(nx, ny), reg, Sense::Negative)
    {
        let fresh = env.ids.fresh();
        let clear_ram = tuning.clear_ram_on_birth;
        let (parent, child) = env.pond.pair_mut((x, y), (nx, ny));
        if child.is_viable() {
            env.counters.viable_cells_replaced += 1;
        }
        child.id = fresh;
        child.parent_id = parent.id;
        child.lineage = parent.lineage;
        child.generation = parent.generation + 1;
        child.set_logo(0);
        child.set_facing(0);
        child.overwrite_genome(&scratch.out);
        if clear_ram {
            child.clear_ram();
        } else {
            for i in 0..RAM_SIZE {
                child.set_ram(i, env.rng.next_word() as u8);
            }
        }
        parent.energy -= tuning.reproduction_cost;
        trace!(
            target: "vm",
            parent_id = child.parent_id,
            child_id = child.id,
            generation = child.generation,
            nx,
            ny,
            "birth"
        );
    }
}
