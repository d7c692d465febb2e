//! BeatBox controller - the operations behind each UI control
use std::path::Path;

use crate::config::Config;
use crate::error::Result;
use crate::midi::MidiSink;
use crate::persistence;
use crate::sequencer::playback::{PlaybackEngine, PlaybackEvent};
use crate::sequencer::track::{compile, Track};
use crate::sequencer::{Grid, InstrumentTable};

pub struct BeatBox {
    grid: Grid,
    instruments: InstrumentTable,
    engine: PlaybackEngine,
    config: Config,
    current_tick: Option<u64>,
}

impl BeatBox {
    pub fn new(config: Config) -> Self {
        let mut engine = PlaybackEngine::with_resolution(config.tempo.resolution);
        engine.set_tempo_bpm(config.tempo.bpm);

        Self {
            grid: Grid::new(),
            instruments: InstrumentTable::default(),
            engine,
            config,
            current_tick: None,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn instruments(&self) -> &InstrumentTable {
        &self.instruments
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: bool) {
        self.grid.set(row, col, value);
    }

    pub fn toggle(&mut self, row: usize, col: usize) {
        self.grid.toggle(row, col);
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    /// The track `start` would play for the current grid.
    pub fn build_track(&self) -> Track {
        compile(&self.grid, &self.instruments)
    }

    pub fn open_output(&mut self, sink: Box<dyn MidiSink>) {
        self.engine.open(sink);
    }

    pub fn close_output(&mut self) {
        self.engine.close();
        self.current_tick = None;
    }

    pub fn has_output(&self) -> bool {
        self.engine.is_open()
    }

    /// Rebuild the track from the grid and loop it from tick 0.
    pub fn start(&mut self) -> Result<()> {
        let track = self.build_track();
        self.engine.set_sequence(&track);
        self.engine.set_loop_continuous(true);
        self.engine.start()?;
        self.engine.set_tempo_bpm(self.config.tempo.bpm);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.engine.stop();
        self.current_tick = None;
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_running()
    }

    pub fn tempo_up(&mut self) {
        self.scale_tempo(self.config.tempo.up_factor);
    }

    pub fn tempo_down(&mut self) {
        self.scale_tempo(self.config.tempo.down_factor);
    }

    /// Multiply the current tempo factor; no bounds applied.
    pub fn scale_tempo(&mut self, multiplier: f32) {
        let factor = self.engine.tempo_factor() * multiplier;
        self.engine.set_tempo_factor(factor);
        tracing::debug!(factor, "tempo factor changed");
    }

    pub fn tempo_factor(&self) -> f32 {
        self.engine.tempo_factor()
    }

    pub fn effective_bpm(&self) -> f32 {
        self.engine.tempo_bpm() * self.engine.tempo_factor()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        persistence::save_pattern(path, &self.grid)
    }

    /// Replace the grid with a saved pattern. The grid is untouched on error.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.grid = persistence::load_pattern(path)?;
        Ok(())
    }

    /// Drain playback notifications and track the playing tick.
    pub fn poll_events(&mut self) -> Vec<PlaybackEvent> {
        let events = self.engine.poll_events();
        for event in &events {
            match event {
                PlaybackEvent::TickAdvanced(tick) => self.current_tick = Some(*tick),
                PlaybackEvent::Stopped => self.current_tick = None,
            }
        }
        events
    }

    pub fn current_tick(&self) -> Option<u64> {
        self.current_tick
    }
}

impl Default for BeatBox {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DeviceError, Error, FormatError};
    use crate::midi::testing::RecordingSink;
    use std::time::{Duration, Instant};

    #[test]
    fn test_start_without_output_stays_stopped() {
        let mut beatbox = BeatBox::default();
        let err = beatbox.start().unwrap_err();
        assert!(matches!(err, Error::Device(DeviceError::NotOpen)));
        assert!(!beatbox.is_playing());
    }

    #[test]
    fn test_start_and_stop() {
        let sink = RecordingSink::default();
        let mut beatbox = BeatBox::default();
        beatbox.open_output(Box::new(sink.clone()));
        beatbox.toggle(0, 0);

        beatbox.start().unwrap();
        assert!(beatbox.is_playing());

        let deadline = Instant::now() + Duration::from_secs(5);
        while sink.snapshot().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(sink.snapshot()[0], vec![0x99, 35, 100]);

        beatbox.stop();
        beatbox.stop();
        assert!(!beatbox.is_playing());
        assert_eq!(beatbox.current_tick(), None);
    }

    #[test]
    fn test_stop_reports_stopped_and_clears_tick() {
        let sink = RecordingSink::default();
        let mut beatbox = BeatBox::default();
        beatbox.open_output(Box::new(sink.clone()));
        beatbox.toggle(0, 0);
        beatbox.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while beatbox.current_tick().is_none() && Instant::now() < deadline {
            beatbox.poll_events();
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(beatbox.current_tick().is_some());

        beatbox.stop();
        let mut stopped = false;
        while !stopped && Instant::now() < deadline {
            stopped = beatbox.poll_events().contains(&PlaybackEvent::Stopped);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(stopped);
        assert_eq!(beatbox.current_tick(), None);
    }

    #[test]
    fn test_start_rebuilds_track_from_grid() {
        let mut beatbox = BeatBox::default();
        let empty = beatbox.build_track();
        beatbox.toggle(2, 4);
        let one_hit = beatbox.build_track();
        assert_eq!(one_hit.len(), empty.len() + 2);
    }

    #[test]
    fn test_tempo_buttons_compound() {
        let mut beatbox = BeatBox::default();
        beatbox.tempo_up();
        assert!((beatbox.tempo_factor() - 1.3).abs() < 1e-6);
        beatbox.tempo_up();
        assert!((beatbox.tempo_factor() - 1.69).abs() < 1e-5);
        beatbox.tempo_down();
        assert!((beatbox.tempo_factor() - 1.69 * 0.97).abs() < 1e-5);
        assert!((beatbox.effective_bpm() - 120.0 * 1.69 * 0.97).abs() < 1e-3);
    }

    #[test]
    fn test_clear() {
        let mut beatbox = BeatBox::default();
        beatbox.set_cell(4, 4, true);
        beatbox.clear();
        assert_eq!(beatbox.grid().active_count(), 0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("groove.json");

        let mut beatbox = BeatBox::default();
        beatbox.toggle(1, 1);
        beatbox.toggle(14, 8);
        beatbox.save(&path).unwrap();
        let saved_track = beatbox.build_track();

        beatbox.clear();
        beatbox.load(&path).unwrap();
        assert!(beatbox.grid().get(1, 1));
        assert!(beatbox.grid().get(14, 8));
        assert_eq!(beatbox.build_track(), saved_track);
    }

    #[test]
    fn test_failed_load_keeps_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.json");
        std::fs::write(&path, "[true, true, true]").unwrap();

        let mut beatbox = BeatBox::default();
        beatbox.toggle(5, 5);
        let before = beatbox.grid().clone();

        let err = beatbox.load(&path).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::WrongLength { .. })));
        assert_eq!(beatbox.grid(), &before);
    }
}
