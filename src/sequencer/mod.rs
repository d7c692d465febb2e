//! Core sequencer logic - grid state and instrument mapping
//! Rows select an instrument, columns select the tick within one bar
use crate::error::FormatError;

pub mod playback;
pub mod track;

pub const ROWS: usize = 16;
pub const STEPS: usize = 16;
pub const CELLS: usize = ROWS * STEPS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [bool; CELLS],
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: [false; CELLS],
        }
    }

    /// Build a grid from row-major flags, as written by [`Grid::flags`].
    pub fn from_flags(flags: &[bool]) -> Result<Self, FormatError> {
        let cells: [bool; CELLS] = flags.try_into().map_err(|_| FormatError::WrongLength {
            expected: CELLS,
            found: flags.len(),
        })?;
        Ok(Self { cells })
    }

    fn index(row: usize, col: usize) -> usize {
        assert!(
            row < ROWS && col < STEPS,
            "cell ({row}, {col}) is outside the {ROWS}x{STEPS} grid"
        );
        row * STEPS + col
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[Self::index(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        self.cells[Self::index(row, col)] = value;
    }

    pub fn toggle(&mut self, row: usize, col: usize) {
        let current = self.get(row, col);
        self.set(row, col, !current);
    }

    /// The 16 steps of one instrument row.
    pub fn row_flags(&self, row: usize) -> &[bool] {
        let start = Self::index(row, 0);
        &self.cells[start..start + STEPS]
    }

    pub fn clear(&mut self) {
        self.cells = [false; CELLS];
    }

    pub fn fill(&mut self) {
        self.cells = [true; CELLS];
    }

    pub fn active_count(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell).count()
    }

    /// All cells in row-major order.
    pub fn flags(&self) -> Vec<bool> {
        self.cells.to_vec()
    }

    /// Replace every cell. On error the grid keeps its previous contents.
    pub fn restore(&mut self, flags: &[bool]) -> Result<(), FormatError> {
        *self = Self::from_flags(flags)?;
        Ok(())
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instrument {
    pub name: &'static str,
    pub key: u8,
}

/// Row index to General MIDI percussion key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstrumentTable {
    instruments: [Instrument; ROWS],
}

const fn instrument(name: &'static str, key: u8) -> Instrument {
    Instrument { name, key }
}

pub const DEFAULT_INSTRUMENTS: [Instrument; ROWS] = [
    instrument("Bass Drum", 35),
    instrument("Closed Hi-Hat", 42),
    instrument("Open Hi-Hat", 46),
    instrument("Acoustic Snare", 38),
    instrument("Crash Cymbal", 49),
    instrument("Hand Clap", 39),
    instrument("High Tom", 50),
    instrument("Hi Bongo", 60),
    instrument("Maracas", 70),
    instrument("Whistle", 72),
    instrument("Low Conga", 64),
    instrument("Cowbell", 56),
    instrument("Vibraslap", 58),
    instrument("Low-mid Tom", 47),
    instrument("High Agogo", 67),
    instrument("Open Hi Conga", 63),
];

impl InstrumentTable {
    pub const fn new(instruments: [Instrument; ROWS]) -> Self {
        Self { instruments }
    }

    pub fn key(&self, row: usize) -> u8 {
        self.instruments[row].key
    }

    pub fn name(&self, row: usize) -> &'static str {
        self.instruments[row].name
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }
}

impl Default for InstrumentTable {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUMENTS)
    }
}
