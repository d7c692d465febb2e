//! Track compiler - turns the grid into timed MIDI events for one bar
use super::{Grid, InstrumentTable, ROWS, STEPS};

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PROGRAM_CHANGE: u8 = 0xC0;
pub const CHANNEL_PRESSURE: u8 = 0xD0;

/// General MIDI percussion channel (10, zero-based 9).
pub const DRUM_CHANNEL: u8 = 9;
pub const VELOCITY: u8 = 100;

// Per-row marker and trailing program change, kept for parity with the
// classic BeatBox event stream.
const MARKER_CHANNEL: u8 = 1;
const MARKER_CONTROLLER: u8 = 127;
const MARKER_TICK: u64 = STEPS as u64;
const TRAILER_PROGRAM: u8 = 1;
const TRAILER_TICK: u64 = STEPS as u64 - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub command: u8,
    pub channel: u8,
    pub data1: u8,
    pub data2: u8,
    pub tick: u64,
}

impl Event {
    pub fn new(command: u8, channel: u8, data1: u8, data2: u8, tick: u64) -> Self {
        Self {
            command,
            channel,
            data1,
            data2,
            tick,
        }
    }

    /// Raw MIDI message bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let status = (self.command & 0xF0) | (self.channel & 0x0F);
        match self.command & 0xF0 {
            PROGRAM_CHANGE | CHANNEL_PRESSURE => vec![status, self.data1],
            _ => vec![status, self.data1, self.data2],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Track {
    events: Vec<Event>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events in emission order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Loop length: the last tick that carries an event.
    pub fn length_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.tick).max().unwrap_or(0)
    }

    /// Events ordered by tick, emission order kept among equal ticks.
    pub fn schedule(&self) -> Vec<Event> {
        let mut events = self.events.clone();
        events.sort_by_key(|e| e.tick);
        events
    }
}

/// Build a fresh track from the grid. Pure and deterministic.
pub fn compile(grid: &Grid, instruments: &InstrumentTable) -> Track {
    let mut track = Track::new();

    for row in 0..ROWS {
        let key = instruments.key(row);

        for (step, &active) in grid.row_flags(row).iter().enumerate() {
            if !active {
                continue;
            }
            let tick = step as u64;
            track.push(Event::new(NOTE_ON, DRUM_CHANNEL, key, VELOCITY, tick));
            track.push(Event::new(NOTE_OFF, DRUM_CHANNEL, key, VELOCITY, tick + 1));
        }

        track.push(Event::new(
            CONTROL_CHANGE,
            MARKER_CHANNEL,
            MARKER_CONTROLLER,
            0,
            MARKER_TICK,
        ));
    }

    track.push(Event::new(
        PROGRAM_CHANGE,
        DRUM_CHANNEL,
        TRAILER_PROGRAM,
        0,
        TRAILER_TICK,
    ));

    tracing::debug!(events = track.len(), "compiled track");
    track
}
