//! Playback engine - loops a compiled track through a MIDI sink
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use super::track::{Event, Track, NOTE_OFF, NOTE_ON};
use crate::error::DeviceError;
use crate::midi::MidiSink;

pub const DEFAULT_BPM: f32 = 120.0;
/// Ticks per quarter note.
pub const DEFAULT_RESOLUTION: u16 = 4;
/// Longest tick the engine will wait, however slow the tempo.
pub const MAX_TICK_DURATION: Duration = Duration::from_secs(60);

type SharedSink = Arc<Mutex<Box<dyn MidiSink>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    TickAdvanced(u64),
    Stopped,
}

#[derive(Debug)]
struct Transport {
    running: bool,
    generation: u64,
    bpm: f32,
    tempo_factor: f32,
    resolution: u16,
    looping: bool,
}

impl Transport {
    fn tick_duration(&self) -> Duration {
        let ticks_per_second = self.bpm * self.tempo_factor * self.resolution as f32 / 60.0;
        if !(ticks_per_second > 0.0 && ticks_per_second.is_finite()) {
            return MAX_TICK_DURATION;
        }
        Duration::try_from_secs_f32(1.0 / ticks_per_second)
            .map_or(MAX_TICK_DURATION, |d| d.min(MAX_TICK_DURATION))
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct PlaybackEngine {
    sender: Sender<PlaybackEvent>,
    receiver: Receiver<PlaybackEvent>,
    transport: Arc<Mutex<Transport>>,
    sink: Option<SharedSink>,
    sequence: Option<Arc<Vec<Event>>>,
    loop_ticks: u64,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self::with_resolution(DEFAULT_RESOLUTION)
    }

    pub fn with_resolution(resolution: u16) -> Self {
        let (sender, receiver) = channel();

        Self {
            sender,
            receiver,
            transport: Arc::new(Mutex::new(Transport {
                running: false,
                generation: 0,
                bpm: DEFAULT_BPM,
                tempo_factor: 1.0,
                resolution: resolution.max(1),
                looping: false,
            })),
            sink: None,
            sequence: None,
            loop_ticks: 0,
        }
    }

    pub fn open(&mut self, sink: Box<dyn MidiSink>) {
        self.stop();
        self.sink = Some(Arc::new(Mutex::new(sink)));
    }

    pub fn close(&mut self) {
        self.stop();
        self.sink = None;
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    /// Install the track used by the next [`PlaybackEngine::start`].
    pub fn set_sequence(&mut self, track: &Track) {
        self.loop_ticks = track.length_ticks();
        self.sequence = Some(Arc::new(track.schedule()));
    }

    pub fn set_loop_continuous(&mut self, looping: bool) {
        lock(&self.transport).looping = looping;
    }

    pub fn set_tempo_bpm(&mut self, bpm: f32) {
        lock(&self.transport).bpm = bpm;
    }

    pub fn tempo_bpm(&self) -> f32 {
        lock(&self.transport).bpm
    }

    pub fn set_tempo_factor(&mut self, factor: f32) {
        lock(&self.transport).tempo_factor = factor;
    }

    pub fn tempo_factor(&self) -> f32 {
        lock(&self.transport).tempo_factor
    }

    pub fn start(&mut self) -> Result<(), DeviceError> {
        let sink = self.sink.clone().ok_or(DeviceError::NotOpen)?;
        let sequence = self.sequence.clone().ok_or(DeviceError::NoSequence)?;
        let loop_ticks = self.loop_ticks;

        let generation = {
            let mut transport = lock(&self.transport);
            transport.generation += 1;
            transport.running = true;
            transport.generation
        };

        let transport = Arc::clone(&self.transport);
        let sender = self.sender.clone();

        let spawned = thread::Builder::new()
            .name("beatbox-playback".into())
            .spawn(move || run(transport, generation, sink, sequence, loop_ticks, sender));

        if let Err(e) = spawned {
            let mut transport = lock(&self.transport);
            if transport.generation == generation {
                transport.running = false;
            }
            return Err(DeviceError::Thread(e));
        }

        tracing::info!(loop_ticks, "playback started");
        Ok(())
    }

    pub fn stop(&mut self) {
        let mut transport = lock(&self.transport);
        if transport.running {
            transport.running = false;
            transport.generation += 1;
            tracing::info!("playback stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.transport).running
    }

    pub fn poll_events(&self) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Notes that have had a note-on but no note-off yet.
#[derive(Default)]
struct SoundingNotes {
    notes: Vec<(u8, u8, u8)>,
}

impl SoundingNotes {
    fn track(&mut self, event: &Event) {
        let note = (event.channel, event.data1);
        match event.command {
            NOTE_ON if event.data2 > 0 => {
                if !self.notes.iter().any(|&(ch, key, _)| (ch, key) == note) {
                    self.notes.push((event.channel, event.data1, event.data2));
                }
            }
            NOTE_ON | NOTE_OFF => self.notes.retain(|&(ch, key, _)| (ch, key) != note),
            _ => {}
        }
    }

    fn release(&mut self, sink: &SharedSink) {
        let mut sink = lock(sink);
        for (channel, key, velocity) in self.notes.drain(..) {
            let note_off = Event::new(NOTE_OFF, channel, key, velocity, 0);
            if let Err(e) = sink.send(&note_off.to_bytes()) {
                tracing::warn!("failed to release note {}: {}", key, e);
            }
        }
    }
}

fn run(
    transport: Arc<Mutex<Transport>>,
    generation: u64,
    sink: SharedSink,
    sequence: Arc<Vec<Event>>,
    loop_ticks: u64,
    sender: Sender<PlaybackEvent>,
) {
    let mut tick = 0;
    let mut cursor = 0;
    let mut next_due = Instant::now();
    let mut sounding = SoundingNotes::default();

    loop {
        let (looping, tick_duration) = {
            let t = lock(&transport);
            if !t.running || t.generation != generation {
                // A restart bumps the generation but keeps running set.
                let stopped = !t.running;
                drop(t);
                sounding.release(&sink);
                if stopped {
                    let _ = sender.send(PlaybackEvent::Stopped);
                }
                return;
            }
            (t.looping, t.tick_duration())
        };

        let now = Instant::now();
        if now < next_due {
            thread::sleep((next_due - now).min(Duration::from_millis(1)));
            continue;
        }

        while let Some(event) = sequence.get(cursor).filter(|e| e.tick == tick) {
            if let Err(e) = lock(&sink).send(&event.to_bytes()) {
                tracing::warn!("dropped MIDI event at tick {}: {}", tick, e);
            }
            sounding.track(event);
            cursor += 1;
        }
        let _ = sender.send(PlaybackEvent::TickAdvanced(tick));

        if tick >= loop_ticks {
            if !looping {
                let mut t = lock(&transport);
                if t.generation == generation {
                    t.running = false;
                }
                drop(t);
                sounding.release(&sink);
                let _ = sender.send(PlaybackEvent::Stopped);
                return;
            }
            // The last tick of a bar is tick 0 of the next one.
            tick = 0;
            cursor = 0;
            if loop_ticks == 0 {
                next_due += tick_duration;
            }
            continue;
        }

        tick += 1;
        next_due += tick_duration;
    }
}
