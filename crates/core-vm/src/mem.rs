//! The 32-slot memory window seen through READM/WRITEM.
//!
//! Layout: eight special slots (identity projections and masked
//! logo/facing stores), eight private RAM bytes, eight own output RAM
//! bytes, and the faced neighbor's output RAM as the input band. Reads
//! from read-only slots return a projection; writes to them are ignored
//! but still tallied. Writes into the neighbor's band are gated by a
//! positive-sense access test using the writer's own logo as the guess.

use core_grid::Grid;
use core_pond::Pond;
use core_rng::Mt19937;

use crate::access::{Sense, access_allowed};
use crate::stats::StatCounters;

/// Compressed energy projection at slot 0x02: 0 for a dormant cell, else
/// 1 + energy/4096, saturated into the 5-bit range.
pub fn compress_energy(energy: u64) -> u8 {
    if energy == 0 {
        0
    } else {
        31.min(1 + (energy >> 12)) as u8
    }
}

/// Read the window slot `addr` (masked to 5 bits) of the cell at `pos`.
pub fn read(
    pond: &Pond,
    grid: &Grid,
    counters: &mut StatCounters,
    pos: (usize, usize),
    addr: u8,
) -> u8 {
    let cell = pond.cell(pos.0, pos.1);
    match addr & 0x1f {
        0x00 => {
            counters.mem_special_reads += 1;
            cell.logo()
        }
        0x01 => {
            counters.mem_special_reads += 1;
            cell.facing()
        }
        0x02 => {
            counters.mem_special_reads += 1;
            compress_energy(cell.energy)
        }
        0x03 => {
            counters.mem_special_reads += 1;
            (cell.lineage & 0xff) as u8
        }
        0x04 => {
            counters.mem_special_reads += 1;
            (cell.id & 0xff) as u8
        }
        0x05 => {
            counters.mem_special_reads += 1;
            (cell.parent_id & 0xff) as u8
        }
        0x06 => {
            counters.mem_special_reads += 1;
            ((cell.generation >> 8) & 0xff) as u8
        }
        0x07 => {
            counters.mem_special_reads += 1;
            (cell.generation & 0xff) as u8
        }
        addr @ 0x08..=0x0f => {
            counters.mem_private_reads += 1;
            cell.ram((addr & 0x7) as usize)
        }
        addr @ 0x10..=0x17 => {
            counters.mem_output_reads += 1;
            cell.ram(8 + (addr & 0x7) as usize)
        }
        addr => {
            counters.mem_input_reads += 1;
            let (nx, ny) = grid.neighbor(pos.0, pos.1, cell.facing());
            pond.cell(nx, ny).ram(8 + (addr & 0x7) as usize)
        }
    }
}

/// Write `value` to the window slot `addr` of the cell at `pos`.
pub fn write(
    pond: &mut Pond,
    grid: &Grid,
    rng: &mut Mt19937,
    counters: &mut StatCounters,
    pos: (usize, usize),
    addr: u8,
    value: u8,
) {
    match addr & 0x1f {
        0x00 => {
            counters.mem_special_writes += 1;
            pond.cell_mut(pos.0, pos.1).set_logo(value);
        }
        0x01 => {
            counters.mem_special_writes += 1;
            pond.cell_mut(pos.0, pos.1).set_facing(value);
        }
        0x02..=0x07 => {
            // Read-only slots: the write is dropped, the tally is not.
            counters.mem_special_writes += 1;
        }
        addr @ 0x08..=0x0f => {
            counters.mem_private_writes += 1;
            pond.cell_mut(pos.0, pos.1).set_ram((addr & 0x7) as usize, value);
        }
        addr @ 0x10..=0x17 => {
            counters.mem_output_writes += 1;
            pond.cell_mut(pos.0, pos.1)
                .set_ram(8 + (addr & 0x7) as usize, value);
        }
        addr => {
            counters.mem_input_writes += 1;
            let me = pond.cell(pos.0, pos.1);
            let guess = me.logo();
            let (nx, ny) = grid.neighbor(pos.0, pos.1, me.facing());
            if access_allowed(rng, pond.cell(nx, ny), guess, Sense::Positive) {
                pond.cell_mut(nx, ny).set_ram(8 + (addr & 0x7) as usize, value);
            }
        }
    }
}
