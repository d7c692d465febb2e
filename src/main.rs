#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use beatbox::sequencer::{ROWS, STEPS};
#[cfg(feature = "gui")]
use beatbox::{config, BeatBox, Config, MidiOutputDevice};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([760.0, 620.0])
            .with_title("BeatBox"),
        ..Default::default()
    };

    eframe::run_native(
        "BeatBox",
        options,
        Box::new(|_cc| Ok(Box::new(BeatBoxApp::new(config::load())))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct BeatBoxApp {
    beatbox: BeatBox,

    // UI state
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    status: Option<Status>,
}

#[cfg(feature = "gui")]
enum Status {
    Info(String),
    Error(String),
}

#[cfg(feature = "gui")]
impl BeatBoxApp {
    fn new(config: Config) -> Self {
        let available_midi_ports = MidiOutputDevice::available_ports(&config.midi.client_name);
        let preferred = config.midi.port.clone();

        let mut app = Self {
            beatbox: BeatBox::new(config),
            available_midi_ports,
            selected_port: None,
            status: None,
        };

        if let Some(name) = preferred {
            if let Some(index) = app.available_midi_ports.iter().position(|p| *p == name) {
                app.connect_port(index, false);
            } else {
                tracing::warn!("configured MIDI port {} is not available", name);
            }
        }
        app
    }

    fn connect_port(&mut self, index: usize, remember: bool) {
        self.beatbox.stop();
        let mut device = MidiOutputDevice::new(self.beatbox.config().midi.client_name.clone());
        match device.connect(index) {
            Ok(()) => {
                let name = device.port_name().map(str::to_owned);
                self.beatbox.open_output(Box::new(device));
                self.selected_port = Some(index);
                if remember {
                    self.beatbox.config_mut().midi.port = name;
                    if let Err(e) = config::save(self.beatbox.config()) {
                        tracing::warn!("failed to save settings: {}", e);
                    }
                }
            }
            Err(e) => {
                self.beatbox.close_output();
                self.selected_port = None;
                self.report(e.into());
            }
        }
    }

    fn report(&mut self, error: beatbox::Error) {
        tracing::error!("{}", error);
        self.status = Some(Status::Error(error.to_string()));
    }

    fn start(&mut self) {
        match self.beatbox.start() {
            Ok(()) => self.status = None,
            Err(e) => self.report(e),
        }
    }

    fn save(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("BeatBox pattern", &["json"])
            .set_file_name("pattern.json")
            .save_file()
        else {
            return;
        };
        match self.beatbox.save(&path) {
            Ok(()) => self.status = Some(Status::Info(format!("Saved {}", path.display()))),
            Err(e) => self.report(e),
        }
    }

    fn load(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("BeatBox pattern", &["json"])
            .pick_file()
        else {
            return;
        };
        match self.beatbox.load(&path) {
            Ok(()) => self.status = Some(Status::Info(format!("Loaded {}", path.display()))),
            Err(e) => self.report(e),
        }
    }
}

#[cfg(feature = "gui")]
impl eframe::App for BeatBoxApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.beatbox.poll_events();
        if self.beatbox.is_playing() {
            ctx.request_repaint();
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("BeatBox");
            ui.add_space(10.0);

            // MIDI Port Selection
            let mut selected_port_changed = None;
            ui.horizontal(|ui| {
                ui.label("MIDI Output:");
                if self.available_midi_ports.is_empty() {
                    ui.label("No MIDI ports available");
                } else {
                    egui::ComboBox::from_id_source("midi_port")
                        .selected_text(
                            self.selected_port
                                .map(|i| self.available_midi_ports[i].as_str())
                                .unwrap_or("Select port..."),
                        )
                        .show_ui(ui, |ui| {
                            for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                                if ui
                                    .selectable_label(self.selected_port == Some(i), port_name)
                                    .clicked()
                                {
                                    selected_port_changed = Some(i);
                                }
                            }
                        });
                }
                if ui.button("⟳").on_hover_text("Rescan ports").clicked() {
                    self.available_midi_ports =
                        MidiOutputDevice::available_ports(&self.beatbox.config().midi.client_name);
                    self.selected_port = None;
                    self.beatbox.close_output();
                }
            });

            if let Some(port_idx) = selected_port_changed {
                self.connect_port(port_idx, true);
            }

            ui.add_space(10.0);

            // Transport controls
            ui.horizontal(|ui| {
                if ui.button("▶ Start").clicked() {
                    self.start();
                }
                if ui.button("⏹ Stop").clicked() {
                    self.beatbox.stop();
                }
                if ui.button("Tempo Up").clicked() {
                    self.beatbox.tempo_up();
                }
                if ui.button("Tempo Down").clicked() {
                    self.beatbox.tempo_down();
                }
                ui.label(format!("{:.0} BPM", self.beatbox.effective_bpm()));

                ui.add_space(20.0);

                if ui.button("Clear").clicked() {
                    self.beatbox.clear();
                }
                if ui.button("Save").clicked() {
                    self.save();
                }
                if ui.button("Load").clicked() {
                    self.load();
                }
            });

            ui.add_space(10.0);

            let playing_step = self
                .beatbox
                .current_tick()
                .map(|tick| tick as usize)
                .filter(|&tick| tick < STEPS);

            egui::Grid::new("steps")
                .spacing([2.0, 2.0])
                .show(ui, |ui| {
                    ui.label("");
                    for step in 0..STEPS {
                        let text = egui::RichText::new(format!("{}", step + 1)).small();
                        if playing_step == Some(step) {
                            ui.colored_label(egui::Color32::from_rgb(100, 200, 100), text);
                        } else {
                            ui.label(text);
                        }
                    }
                    ui.end_row();

                    for row in 0..ROWS {
                        ui.label(self.beatbox.instruments().name(row));
                        for step in 0..STEPS {
                            let mut enabled = self.beatbox.grid().get(row, step);
                            if ui.checkbox(&mut enabled, "").changed() {
                                self.beatbox.set_cell(row, step, enabled);
                            }
                        }
                        ui.end_row();
                    }
                });

            // Info
            ui.separator();
            match &self.status {
                Some(Status::Error(message)) => {
                    ui.colored_label(egui::Color32::RED, message);
                }
                Some(Status::Info(message)) => {
                    ui.label(message);
                }
                None if !self.beatbox.has_output() => {
                    ui.colored_label(
                        egui::Color32::YELLOW,
                        "⚠ No MIDI output connected - select a port to play",
                    );
                }
                None => {
                    ui.label("Tick the boxes to build a beat, then press Start");
                }
            }
        });
    }
}
