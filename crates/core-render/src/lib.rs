//! Per-cell color mapping for the visualiser.
//!
//! Pure math over a cell and the last census; the terminal (or any other)
//! backend owns the actual blit. Colors are 8-bit palette indices. Cells
//! without energy are black in every scheme, and most schemes also hide
//! cells below generation 2 so the display tracks the living population
//! rather than seed noise.

use core_pond::{Cell, Census};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    /// Genome hash hue: related genomes get similar values.
    #[default]
    Kinship,
    Lineage,
    Logo,
    Facing,
    /// Energy relative to the strongest living cell.
    Energy1,
    /// Energy relative to the strongest cell, living or not.
    Energy2,
    /// Private RAM checksum.
    Ram0,
    /// Output RAM checksum.
    Ram1,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 8] = [
        Self::Kinship,
        Self::Lineage,
        Self::Logo,
        Self::Facing,
        Self::Energy1,
        Self::Energy2,
        Self::Ram0,
        Self::Ram1,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Kinship => "KINSHIP",
            Self::Lineage => "LINEAGE",
            Self::Logo => "LOGO",
            Self::Facing => "FACING",
            Self::Energy1 => "ENERGY1",
            Self::Energy2 => "ENERGY2",
            Self::Ram0 => "RAM0",
            Self::Ram1 => "RAM1",
        }
    }

    /// Cycle to the next scheme (interactive switching).
    pub fn next(self) -> Self {
        match self {
            Self::Kinship => Self::Lineage,
            Self::Lineage => Self::Logo,
            Self::Logo => Self::Facing,
            Self::Facing => Self::Energy1,
            Self::Energy1 => Self::Energy2,
            Self::Energy2 => Self::Ram0,
            Self::Ram0 => Self::Ram1,
            Self::Ram1 => Self::Kinship,
        }
    }
}

impl std::str::FromStr for ColorScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|scheme| scheme.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown color scheme `{s}`"))
    }
}

/// 8-bit palette index for one cell under the given scheme. `census` is
/// the scan from the last report boundary; the energy schemes scale
/// against its maxima.
pub fn cell_color(cell: &Cell, scheme: ColorScheme, census: &Census) -> u8 {
    if cell.energy == 0 {
        return 0;
    }
    match scheme {
        ColorScheme::Kinship => {
            if cell.is_living() {
                let sum: u64 = cell.genome().iter().map(|&c| c as u64).sum();
                ((sum % 192) + 64) as u8
            } else {
                0
            }
        }
        ColorScheme::Lineage => {
            if cell.is_living() {
                (cell.lineage as u8) | 1
            } else {
                0
            }
        }
        ColorScheme::Logo => {
            if cell.is_living() {
                73 + cell.logo()
            } else {
                0
            }
        }
        ColorScheme::Facing => {
            if cell.is_living() {
                157 + cell.facing()
            } else {
                0
            }
        }
        ColorScheme::Energy1 => {
            if cell.is_living() && census.max_living_cell_energy > 0 {
                (255.0 * cell.energy as f64 / census.max_living_cell_energy as f64) as u8
            } else {
                0
            }
        }
        // Deliberately generation-blind: shows the whole energy field.
        ColorScheme::Energy2 => {
            if census.max_cell_energy > 0 {
                (255.0 * cell.energy as f64 / census.max_cell_energy as f64) as u8
            } else {
                0
            }
        }
        ColorScheme::Ram0 => ram_checksum(cell, 0),
        ColorScheme::Ram1 => ram_checksum(cell, 8),
    }
}

fn ram_checksum(cell: &Cell, base: usize) -> u8 {
    if !cell.is_living() {
        return 0;
    }
    let sum: u64 = (0..8).map(|i| cell.ram(base + i) as u64).sum();
    ((sum & 0x7f) + 128) as u8
}
