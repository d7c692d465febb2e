//! BeatBox - a 16-step, 16-instrument drum machine
//!
//! This library provides the core components behind the BeatBox app:
//! - A fixed 16x16 grid of steps, one row per percussion instrument
//! - A compiler turning the grid into a one-bar MIDI event track
//! - A playback engine looping that track through a MIDI output
//! - Pattern files and user settings

pub mod beatbox;
pub mod config;
pub mod error;
pub mod midi;
pub mod persistence;
pub mod sequencer;

// Re-export commonly used types
pub use beatbox::BeatBox;
pub use config::Config;
pub use error::{DeviceError, Error, FormatError, Result};
pub use midi::{MidiOutputDevice, MidiSink};
pub use sequencer::playback::{PlaybackEngine, PlaybackEvent};
pub use sequencer::track::{compile, Event, Track};
pub use sequencer::{Grid, Instrument, InstrumentTable};
