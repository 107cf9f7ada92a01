#[cfg(feature = "gui")]
use eframe::egui;

#[cfg(feature = "gui")]
use pianoroll::{
    midi, midi_note_name, roll::pitch::ROW_COUNT, CpalBackend, DeviceEvent, DeviceHandle,
    EditorConfig, GenerationRequest, Generator, GridConfig, GridModel, MidiDeviceConnector,
    Pitch, PlaybackEvent, PlaybackScheduler, SnapUnit, TickClock,
};

#[cfg(feature = "gui")]
use std::time::Instant;

#[cfg(feature = "gui")]
const KEYS_WIDTH: f32 = 56.0;
#[cfg(feature = "gui")]
const ZOOM_STEP: f32 = 0.25;

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => EditorConfig::load(&path).unwrap_or_else(|e| {
            log::warn!("Falling back to default config: {}", e);
            EditorConfig::default()
        }),
        None => EditorConfig::default(),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 860.0])
            .with_title("Composition Companion"),
        ..Default::default()
    };

    eframe::run_native(
        "pianoroll",
        options,
        Box::new(|_cc| Ok(Box::new(EditorApp::new(config)))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

#[cfg(feature = "gui")]
struct EditorApp {
    config: EditorConfig,
    grid: GridModel,
    scheduler: PlaybackScheduler<CpalBackend>,
    clock: TickClock,
    generator: Generator,
    connector: MidiDeviceConnector,
    device: Option<DeviceHandle>,

    // UI state
    request: GenerationRequest,
    only_save_generated: bool,
    roll_expanded: bool,
    audio_error: Option<String>,
    status: Option<String>,
}

#[cfg(feature = "gui")]
impl EditorApp {
    fn new(config: EditorConfig) -> Self {
        Self {
            grid: GridModel::new(GridConfig::new(&config)),
            scheduler: PlaybackScheduler::new(CpalBackend, &config),
            clock: TickClock::new(config.tick_interval()),
            generator: Generator::from_entropy(&config),
            connector: MidiDeviceConnector::new(),
            device: None,
            request: GenerationRequest::default(),
            only_save_generated: false,
            roll_expanded: true,
            audio_error: None,
            status: None,
            config,
        }
    }

    fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.status = Some(message);
    }

    fn handle_playback_ticks(&mut self) {
        let due = self.clock.due_ticks(Instant::now());
        for _ in 0..due {
            let events = self.scheduler.tick(&self.grid);
            if events.contains(&PlaybackEvent::Finished) {
                self.clock.stop();
                break;
            }
        }
        if !self.scheduler.is_playing() {
            self.clock.stop();
        }
    }

    fn handle_device_events(&mut self) {
        let events = match &self.device {
            Some(device) => device.poll_events(),
            None => return,
        };

        for event in events {
            if let DeviceEvent::NoteOn { key, .. } = event {
                match midi::pitch_for_key(key) {
                    Some(pitch) => self.preview(pitch),
                    None => log::debug!("Key {} is off the grid", midi_note_name(key)),
                }
            }
        }
    }

    fn preview(&mut self, pitch: Pitch) {
        if let Err(e) = self.scheduler.trigger_note(pitch) {
            self.audio_error = Some(e.to_string());
        }
    }

    fn toggle_playback(&mut self) {
        if self.scheduler.is_playing() {
            self.scheduler.stop();
            self.clock.stop();
            return;
        }
        match self.scheduler.start() {
            Ok(()) => self.clock.start(Instant::now()),
            Err(e) => {
                self.audio_error = Some(e.to_string());
                self.set_status(format!("Playback unavailable: {}", e));
            }
        }
    }

    fn connect_device(&mut self) {
        match self.connector.connect() {
            Ok(device) => {
                self.set_status(format!("Connected to {}", device.port_name()));
                self.device = Some(device);
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn generate_notes(&mut self) {
        match self.generator.generate(self.request) {
            Ok(notes) => {
                let added = self.grid.add_notes(notes);
                self.set_status(format!("Generated {} notes", added));
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn upload_midi(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("MIDI", &["mid", "midi"])
            .pick_file()
        else {
            return;
        };

        let result = std::fs::read(&path)
            .map_err(pianoroll::FileError::from)
            .and_then(|bytes| midi::upload(&bytes));
        match result {
            Ok(notes) => {
                self.grid.clear();
                let loaded = self.grid.add_notes(notes);
                self.set_status(format!("Loaded {} notes from {}", loaded, path.display()));
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn save_midi(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("MIDI", &["mid", "midi"])
            .set_file_name("composition.mid")
            .save_file()
        else {
            return;
        };

        let result = midi::save(
            self.grid.notes(),
            self.only_save_generated,
            self.config.tempo_bpm(),
        )
        .and_then(|bytes| std::fs::write(&path, bytes).map_err(pianoroll::FileError::from));
        match result {
            Ok(()) => self.set_status(format!("Saved {}", path.display())),
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn ui_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Options");
        ui.add_space(10.0);

        ui.label("Number of ideas to generate:");
        ui.add(egui::Slider::new(&mut self.request.idea_count, 1..=3));
        ui.label("Total notes to generate:");
        ui.add(egui::Slider::new(&mut self.request.note_count, 10..=100));
        ui.checkbox(&mut self.request.beginner_mode, "Use Beginner Mode");
        if ui.button("Generate Notes").clicked() {
            self.generate_notes();
        }

        ui.add_space(20.0);
        ui.heading("MIDI File Management");
        ui.add_space(10.0);

        if ui.button("Upload MIDI File").clicked() {
            self.upload_midi();
        }
        ui.checkbox(&mut self.only_save_generated, "Only Save AI Notes");
        if ui.button("Save MIDI File").clicked() {
            self.save_midi();
        }
    }

    fn ui_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let label = if self.scheduler.is_playing() {
                "⏹ Stop"
            } else {
                "▶ Play"
            };
            let can_play = self.audio_error.is_none() || self.scheduler.is_playing();
            if ui.add_enabled(can_play, egui::Button::new(label)).clicked() {
                self.toggle_playback();
            }

            if ui.button("−").clicked() {
                self.grid.adjust_zoom(-ZOOM_STEP);
            }
            if ui.button("+").clicked() {
                self.grid.adjust_zoom(ZOOM_STEP);
            }
            ui.label(format!("{:.0}%", self.grid.config().zoom() * 100.0));

            let mut snap = self.grid.config().snap();
            egui::ComboBox::from_label("Snap")
                .selected_text(snap.label())
                .show_ui(ui, |ui| {
                    for unit in SnapUnit::ALL {
                        ui.selectable_value(&mut snap, unit, unit.label());
                    }
                });
            if snap != self.grid.config().snap() {
                self.grid.set_snap(snap);
            }

            if let Some(error) = &self.audio_error {
                ui.colored_label(egui::Color32::YELLOW, format!("⚠ {}", error));
            }
        });
    }

    fn ui_piano_roll(&mut self, ui: &mut egui::Ui) {
        let config = *self.grid.config();
        let size = egui::vec2(KEYS_WIDTH + config.width_px(), config.height_px());

        egui::ScrollArea::both()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click_and_drag());
                let origin = rect.min + egui::vec2(KEYS_WIDTH, 0.0);
                let to_local = |pos: egui::Pos2| (pos.x - origin.x, pos.y - origin.y);

                self.handle_pointer(ui, &response, to_local);

                let painter = ui.painter_at(rect);
                paint_keys(&painter, rect.min, &config);
                paint_grid(&painter, origin, &config);

                let note_color = egui::Color32::from_rgb(59, 130, 246);
                for note in self.grid.notes() {
                    let note_rect = self.grid.note_rect(note);
                    let min = origin + egui::vec2(note_rect.x, note_rect.y);
                    let max = min + egui::vec2(note_rect.width, note_rect.height - 1.0);
                    painter.rect_filled(egui::Rect::from_min_max(min, max), 2.0, note_color);
                }

                let state = self.scheduler.state();
                if state.is_playing {
                    let x = origin.x + state.playhead_px(&config);
                    painter.line_segment(
                        [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
                        egui::Stroke::new(1.0, egui::Color32::RED),
                    );
                }
            });
    }

    fn handle_pointer(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        to_local: impl Fn(egui::Pos2) -> (f32, f32),
    ) {
        let (pressed, down, released, pointer) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });

        if pressed && response.hovered() {
            if let Some((x, y)) = response.hover_pos().map(&to_local) {
                if x < 0.0 {
                    // Clicking a key previews its pitch.
                    if let Some(pitch) = self.grid.config().pitch_at(y) {
                        self.preview(pitch);
                    }
                } else {
                    self.grid.create(x, y);
                }
            }
        } else if down && self.grid.is_resizing() {
            if let Some((x, _)) = pointer.map(&to_local) {
                self.grid.resize(x);
            }
        }

        if released {
            self.grid.end_resize();
        }

        if response.secondary_clicked() {
            if let Some((x, y)) = response.hover_pos().map(&to_local) {
                self.grid.erase(x, y);
            }
        }
    }
}

#[cfg(feature = "gui")]
fn paint_keys(painter: &egui::Painter, top_left: egui::Pos2, config: &GridConfig) {
    let row_height = config.row_height_px();
    for row in 0..ROW_COUNT {
        let Some(pitch) = Pitch::from_row(row) else {
            continue;
        };
        let min = top_left + egui::vec2(0.0, config.row_top_px(row));
        let key = egui::Rect::from_min_size(min, egui::vec2(KEYS_WIDTH, row_height - 1.0));
        let fill = if pitch.class.is_sharp() {
            egui::Color32::from_gray(31)
        } else {
            egui::Color32::from_gray(55)
        };
        painter.rect_filled(key, 0.0, fill);
        painter.text(
            key.right_center() - egui::vec2(6.0, 0.0),
            egui::Align2::RIGHT_CENTER,
            pitch.to_string(),
            egui::FontId::monospace(10.0),
            egui::Color32::from_gray(200),
        );
    }
}

#[cfg(feature = "gui")]
fn paint_grid(painter: &egui::Painter, origin: egui::Pos2, config: &GridConfig) {
    let width = config.width_px();
    let height = config.height_px();
    let area = egui::Rect::from_min_size(origin, egui::vec2(width, height));
    painter.rect_filled(area, 0.0, egui::Color32::from_gray(17));

    let faint = egui::Stroke::new(1.0, egui::Color32::from_white_alpha(25));
    for row in 0..=ROW_COUNT {
        let y = origin.y + config.row_top_px(row);
        painter.line_segment([egui::pos2(origin.x, y), egui::pos2(origin.x + width, y)], faint);
    }

    let beats = config.length_beats().ceil() as u32;
    let measure = egui::Stroke::new(1.0, egui::Color32::from_gray(110));
    for beat in 0..=beats {
        let x = origin.x + config.beats_to_px(beat as f32);
        let stroke = if beat % config.beats_per_measure() == 0 {
            measure
        } else {
            faint
        };
        painter.line_segment([egui::pos2(x, origin.y), egui::pos2(x, origin.y + height)], stroke);
    }
}

#[cfg(feature = "gui")]
impl eframe::App for EditorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_playback_ticks();
        self.handle_device_events();

        if self.scheduler.is_playing() {
            let wait = self
                .clock
                .time_until_next(Instant::now())
                .unwrap_or(self.clock.interval());
            ctx.request_repaint_after(wait);
        }

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Composition Companion");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let label = match &self.device {
                        Some(device) => format!("🎹 {}", device.port_name()),
                        None => "Connect MIDI Device".to_string(),
                    };
                    if ui.button(label).clicked() {
                        self.connect_device();
                    }
                });
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let status = self.status.as_deref().unwrap_or("Ready");
            ui.label(status);
        });

        egui::SidePanel::left("options")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| self.ui_sidebar(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Piano Roll Editor");
                let label = if self.roll_expanded { "Collapse" } else { "Expand" };
                if ui.button(label).clicked() {
                    self.roll_expanded = !self.roll_expanded;
                }
            });
            ui.separator();

            if self.roll_expanded {
                self.ui_toolbar(ui);
                ui.add_space(5.0);
                self.ui_piano_roll(ui);
            }

            if self.device.is_none() {
                ui.colored_label(
                    egui::Color32::YELLOW,
                    "⚠ No MIDI device connected - pointer editing only",
                );
            }
        });
    }
}
