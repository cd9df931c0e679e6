mod hint_panel;
mod palette;

pub use hint_panel::{HintAction, HintPanel, HintPanelState};
pub use palette::{to_color32, PaletteAction, ToolPalette, SWATCHES};

use crate::overlay::composite::fit_contain;
use crate::overlay::source::UPLOAD_MAX_SIDE;
use crate::overlay::{
    AnnotationOverlay, BackgroundImage, ImageLoad, ImageSource, LayoutRect, PointerAction,
    PointerEvent, Rgba,
};
use crate::service::{Analysis, ChatReply, ServiceClient, ServiceError};
use crate::settings::Settings;
use crate::text::transcript_html;
use crate::tutor::{TurnId, TutorSession};
use eframe::egui::{self, Color32, Pos2, Rect, Sense, TextureHandle, TextureOptions};
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, Sender};

const LETTERBOX: Rgba = Rgba::new(255, 255, 255, 255);

/// Results posted back by the network worker threads. Analyses carry the
/// session epoch and replies their turn so results for a replaced image are
/// dropped.
enum ServiceEvent {
    Health(bool),
    Analyzed {
        epoch: u64,
        result: Result<Analysis, ServiceError>,
    },
    Replied {
        turn: TurnId,
        result: Result<ChatReply, ServiceError>,
    },
}

pub struct SocraticApp {
    settings: Settings,
    client: Option<ServiceClient>,
    tx: Sender<ServiceEvent>,
    rx: Receiver<ServiceEvent>,
    path_input: String,
    loading: Option<ImageLoad>,
    overlay: Option<AnnotationOverlay>,
    background_tex: Option<TextureHandle>,
    ink_tex: Option<TextureHandle>,
    palette: ToolPalette,
    hint_panel: HintPanel,
    session: TutorSession,
    analyzing: bool,
    online: Option<bool>,
    error: Option<String>,
}

impl SocraticApp {
    pub fn new(settings: Settings) -> Self {
        let (tx, rx) = channel();
        let client = match ServiceClient::new(&settings.service_url, settings.request_timeout()) {
            Ok(client) => Some(client),
            Err(err) => {
                tracing::error!(error = %err, "service client unavailable");
                None
            }
        };
        let mut app = Self {
            palette: ToolPalette::new(settings.brush()),
            settings,
            client,
            tx,
            rx,
            path_input: String::new(),
            loading: None,
            overlay: None,
            background_tex: None,
            ink_tex: None,
            hint_panel: HintPanel::default(),
            session: TutorSession::new(),
            analyzing: false,
            online: None,
            error: None,
        };
        app.check_health();
        app
    }

    fn check_health(&mut self) {
        let Some(client) = self.client.clone() else {
            self.online = Some(false);
            return;
        };
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let _ = tx.send(ServiceEvent::Health(client.health()));
        });
    }

    /// Starts decoding a new background. The previous image, its ink and
    /// the conversation about it are dropped.
    fn open_image(&mut self, source: ImageSource) {
        tracing::info!(source = %source_label(&source), "loading background image");
        self.drop_image();
        self.loading = Some(ImageLoad::spawn(source));
    }

    fn close_image(&mut self) {
        tracing::info!("background image removed");
        self.drop_image();
    }

    fn drop_image(&mut self) {
        self.loading = None;
        self.overlay = None;
        self.background_tex = None;
        self.ink_tex = None;
        self.session.reset();
        self.analyzing = false;
        self.error = None;
    }

    fn poll_service(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                ServiceEvent::Health(online) => self.online = Some(online),
                ServiceEvent::Analyzed { epoch, result } => {
                    if epoch != self.session.epoch() {
                        tracing::debug!(epoch, "analysis for a replaced image dropped");
                        continue;
                    }
                    self.analyzing = false;
                    match result {
                        Ok(analysis) => {
                            self.online = Some(true);
                            let _ = self.session.set_analysis(epoch, &analysis);
                        }
                        Err(err) => self.report_service_error(&err),
                    }
                }
                ServiceEvent::Replied { turn, result } => {
                    if let Err(ServiceError::Unreachable { .. }) = &result {
                        self.online = Some(false);
                    }
                    let _ = self.session.complete(turn, result);
                }
            }
        }
    }

    fn report_service_error(&mut self, err: &ServiceError) {
        if err.is_unreachable() {
            self.online = Some(false);
        }
        self.error = Some(err.to_string());
    }

    fn analyze(&mut self) {
        let Some(client) = self.client.clone() else {
            self.error = Some("service URL is not configured".into());
            return;
        };
        let Some(flat) = self.overlay.as_ref().and_then(|o| o.flatten(LETTERBOX)) else {
            return;
        };
        let encoded = BackgroundImage::from_rgba(flat).and_then(|f| f.to_jpeg(UPLOAD_MAX_SIDE));
        let jpeg = match encoded {
            Ok(jpeg) => jpeg,
            Err(err) => {
                tracing::warn!(error = %err, "could not encode annotated image");
                self.error = Some(err.to_string());
                return;
            }
        };
        self.analyzing = true;
        self.error = None;
        let epoch = self.session.epoch();
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = client.analyze(jpeg);
            let _ = tx.send(ServiceEvent::Analyzed { epoch, result });
        });
    }

    fn send_message(&mut self, text: String) {
        let Some(client) = self.client.clone() else {
            self.error = Some("service URL is not configured".into());
            return;
        };
        let turn = match self.session.begin(&text) {
            Ok(turn) => turn,
            Err(err) => {
                tracing::debug!(error = %err, "message not sent");
                return;
            }
        };
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            let result = client.chat(&turn.request);
            let _ = tx.send(ServiceEvent::Replied {
                turn: turn.id,
                result,
            });
        });
    }

    fn save_transcript(&mut self) {
        let path = PathBuf::from("transcript.html");
        match std::fs::write(&path, transcript_html(self.session.messages())) {
            Ok(()) => tracing::info!(path = %path.display(), "transcript saved"),
            Err(err) => {
                tracing::warn!(error = %err, "failed to save transcript");
                self.error = Some(format!("Could not save transcript: {err}"));
            }
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let Some(file) = dropped.into_iter().next() else {
            return;
        };
        if let Some(path) = file.path {
            self.path_input = path.display().to_string();
            self.open_image(ImageSource::File(path));
        } else if let Some(bytes) = file.bytes {
            self.open_image(ImageSource::Bytes(bytes.to_vec()));
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Image:");
            let edit = ui.add(
                egui::TextEdit::singleline(&mut self.path_input)
                    .hint_text("path, or data:image/...;base64,...")
                    .desired_width(320.0),
            );
            let enter = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if (ui.button("Open").clicked() || enter) && !self.path_input.trim().is_empty() {
                let raw = self.path_input.trim();
                let source = if raw.starts_with("data:") {
                    ImageSource::DataUrl(raw.to_string())
                } else {
                    ImageSource::File(PathBuf::from(raw))
                };
                self.open_image(source);
            }
            if self.overlay.is_some() && ui.button("Remove").clicked() {
                self.close_image();
            }
        });

        let ready = self.overlay.as_ref().is_some_and(|o| o.is_ready());
        match self.palette.ui(ui, ready) {
            Some(PaletteAction::Changed(brush)) => {
                if let Some(overlay) = self.overlay.as_mut() {
                    overlay.set_brush(brush);
                }
            }
            Some(PaletteAction::ClearInk) => {
                if let Some(overlay) = self.overlay.as_mut() {
                    overlay.clear();
                }
                self.ink_tex = None;
            }
            None => {}
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), Sense::drag());
        let container = LayoutRect::new(rect.min.x, rect.min.y, rect.width(), rect.height());

        if let Some(load) = self.loading.as_mut() {
            if let Some(result) = load.try_take() {
                self.loading = None;
                let mut overlay: AnnotationOverlay =
                    AnnotationOverlay::new(container, self.settings.resize_policy);
                overlay.set_brush(self.palette.brush());
                if let Err(err) = &result {
                    self.error = Some(format!("Could not load image: {err}"));
                }
                if overlay.on_image_decoded(result) {
                    self.session.attach_image();
                    self.overlay = Some(overlay);
                }
            } else {
                ui.put(rect, egui::Spinner::new());
                ui.ctx().request_repaint();
                return;
            }
        }

        let Some(overlay) = self.overlay.as_mut() else {
            ui.put(
                rect,
                egui::Label::new("Open or drop a photo of your homework problem"),
            );
            return;
        };
        if overlay.container() != container {
            overlay.on_container_resized(container);
        }

        // Presses landing on a popup above the canvas must not start a stroke.
        let accepts_press = response.hovered();
        let events: Vec<PointerEvent> = ui.ctx().input(|i| {
            i.events
                .iter()
                .filter_map(|event| pointer_event(event, accepts_press))
                .collect()
        });
        for event in &events {
            overlay.handle_pointer(event);
        }

        let Some((width, height)) = overlay.surface_size() else {
            return;
        };
        let surface = Rect::from_min_size(rect.min, egui::vec2(width as f32, height as f32));
        let painter = ui.painter_at(rect);

        if let Some(background) = overlay.background() {
            let tex = self.background_tex.get_or_insert_with(|| {
                ui.ctx().load_texture(
                    "background",
                    egui::ColorImage::from_rgba_unmultiplied(
                        [background.width() as usize, background.height() as usize],
                        background.rgba().as_raw(),
                    ),
                    TextureOptions::LINEAR,
                )
            });
            let fit = fit_contain(background.size(), (width, height));
            let image_rect = Rect::from_min_size(
                surface.min + egui::vec2(fit.x as f32, fit.y as f32),
                egui::vec2(fit.width as f32, fit.height as f32),
            );
            painter.rect_filled(surface, 0.0, Color32::WHITE);
            painter.image(tex.id(), image_rect, full_uv(), Color32::WHITE);
        }

        let dirty = overlay.take_dirty();
        if let Some(ink) = overlay.ink() {
            let size = [ink.width() as usize, ink.height() as usize];
            let frame = || egui::ColorImage::from_rgba_unmultiplied(size, ink.pixels());
            let stale = self.ink_tex.as_ref().map_or(true, |tex| tex.size() != size);
            if stale {
                self.ink_tex = Some(ui.ctx().load_texture("ink", frame(), TextureOptions::LINEAR));
            } else if dirty.is_some() {
                if let Some(tex) = self.ink_tex.as_mut() {
                    tex.set(frame(), TextureOptions::LINEAR);
                }
            }
            if let Some(tex) = &self.ink_tex {
                painter.image(tex.id(), surface, full_uv(), Color32::WHITE);
            }
        }
    }
}

impl eframe::App for SocraticApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_service();
        self.handle_dropped_files(ctx);

        egui::SidePanel::right("hint_panel")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| {
                let state = HintPanelState {
                    session: &self.session,
                    analyzing: self.analyzing,
                    online: self.online,
                    error: self.error.as_deref(),
                };
                match self.hint_panel.ui(ui, state) {
                    Some(HintAction::Send(text)) => self.send_message(text),
                    Some(HintAction::Analyze) => self.analyze(),
                    Some(HintAction::SaveTranscript) => self.save_transcript(),
                    None => {}
                }
            });

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ui));

        if self.analyzing || self.session.is_pending() || self.online.is_none() {
            ctx.request_repaint_after(std::time::Duration::from_millis(100));
        }
    }
}

/// Maps primary-button pointer activity to an overlay event, in screen
/// coordinates. Touch input arrives here too since egui mirrors the first
/// touch as the pointer. Presses are dropped unless `accepts_press`; moves
/// and releases always pass so an open stroke can end.
fn pointer_event(event: &egui::Event, accepts_press: bool) -> Option<PointerEvent> {
    match event {
        egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            ..
        } => {
            if *pressed && !accepts_press {
                return None;
            }
            let action = if *pressed {
                PointerAction::Press
            } else {
                PointerAction::Release
            };
            Some(PointerEvent::mouse(action, pos.x, pos.y))
        }
        egui::Event::PointerMoved(pos) => {
            Some(PointerEvent::mouse(PointerAction::Move, pos.x, pos.y))
        }
        egui::Event::PointerGone => Some(PointerEvent::mouse(PointerAction::Leave, 0.0, 0.0)),
        _ => None,
    }
}

fn full_uv() -> Rect {
    Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0))
}

fn source_label(source: &ImageSource) -> String {
    match source {
        ImageSource::Bytes(bytes) => format!("{} bytes", bytes.len()),
        ImageSource::File(path) => path.display().to_string(),
        ImageSource::DataUrl(url) => format!("data URL ({} chars)", url.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> SocraticApp {
        SocraticApp::new(Settings::default())
    }

    fn analysis() -> Analysis {
        Analysis {
            extracted_text: "x + 1 = 3".into(),
            problem_type: "equation".into(),
            subject: "algebra".into(),
            difficulty: None,
            key_concepts: vec![],
        }
    }

    fn button(pressed: bool) -> egui::Event {
        egui::Event::PointerButton {
            pos: Pos2::new(12.0, 34.0),
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        }
    }

    #[test]
    fn analysis_for_removed_image_is_dropped() {
        let mut app = app();
        let epoch = app.session.epoch();
        app.analyzing = true;
        app.close_image();

        app.tx
            .send(ServiceEvent::Analyzed {
                epoch,
                result: Err(ServiceError::Malformed("late".into())),
            })
            .expect("send");
        app.tx
            .send(ServiceEvent::Analyzed {
                epoch,
                result: Ok(analysis()),
            })
            .expect("send");
        app.poll_service();

        assert!(app.session.problem().is_none());
        assert!(app.error.is_none());
        assert!(!app.analyzing);
    }

    #[test]
    fn reply_for_removed_image_is_dropped() {
        let mut app = app();
        app.session.attach_image();
        let turn = app.session.begin("is it 2?").expect("begin");
        app.close_image();

        app.tx
            .send(ServiceEvent::Replied {
                turn: turn.id,
                result: Ok(ChatReply {
                    response: "What did you subtract?".into(),
                    hint_type: "question".into(),
                }),
            })
            .expect("send");
        app.poll_service();

        assert_eq!(app.session.messages().len(), 1);
        assert!(!app.session.is_pending());
    }

    #[test]
    fn current_analysis_is_applied() {
        let mut app = app();
        app.analyzing = true;
        let epoch = app.session.epoch();
        app.tx
            .send(ServiceEvent::Analyzed {
                epoch,
                result: Ok(analysis()),
            })
            .expect("send");
        app.poll_service();

        assert!(!app.analyzing);
        assert_eq!(
            app.session.problem().map(|p| p.extracted_text.as_str()),
            Some("x + 1 = 3")
        );
    }

    #[test]
    fn removing_image_clears_error() {
        let mut app = app();
        app.error = Some("Could not load image: image has no pixels".into());
        app.close_image();
        assert!(app.error.is_none());
    }

    #[test]
    fn press_outside_canvas_is_ignored() {
        assert_eq!(pointer_event(&button(true), false), None);
        assert_eq!(
            pointer_event(&button(true), true),
            Some(PointerEvent::mouse(PointerAction::Press, 12.0, 34.0))
        );
        assert_eq!(
            pointer_event(&button(false), false),
            Some(PointerEvent::mouse(PointerAction::Release, 12.0, 34.0))
        );
        assert_eq!(
            pointer_event(&egui::Event::PointerMoved(Pos2::new(1.0, 2.0)), false),
            Some(PointerEvent::mouse(PointerAction::Move, 1.0, 2.0))
        );
        assert_eq!(
            pointer_event(&egui::Event::PointerGone, false).map(|e| e.action),
            Some(PointerAction::Leave)
        );
    }
}
