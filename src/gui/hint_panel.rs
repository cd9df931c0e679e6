use crate::service::Role;
use crate::tutor::TutorSession;
use eframe::egui;
use egui_commonmark::{CommonMarkCache, CommonMarkViewer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintAction {
    Send(String),
    Analyze,
    SaveTranscript,
}

/// Conversation side panel.
pub struct HintPanel {
    input: String,
    markdown_cache: CommonMarkCache,
}

impl Default for HintPanel {
    fn default() -> Self {
        Self {
            input: String::new(),
            markdown_cache: CommonMarkCache::default(),
        }
    }
}

pub struct HintPanelState<'a> {
    pub session: &'a TutorSession,
    pub analyzing: bool,
    pub online: Option<bool>,
    pub error: Option<&'a str>,
}

impl HintPanel {
    pub fn ui(&mut self, ui: &mut egui::Ui, state: HintPanelState<'_>) -> Option<HintAction> {
        let session = state.session;
        let has_image = session.has_image();
        let mut action = None;

        ui.horizontal(|ui| {
            ui.heading("Socratic Guide");
            let (text, color) = match state.online {
                Some(true) => ("online", egui::Color32::from_rgb(0x22, 0xc5, 0x5e)),
                Some(false) => ("offline", egui::Color32::from_rgb(0xef, 0x44, 0x44)),
                None => ("checking", ui.visuals().weak_text_color()),
            };
            ui.colored_label(color, text);
        });
        ui.label("I'll help you think, not give answers");
        ui.horizontal(|ui| {
            let can_analyze = has_image && !state.analyzing;
            if ui
                .add_enabled(can_analyze, egui::Button::new("Analyze problem"))
                .clicked()
            {
                action = Some(HintAction::Analyze);
            }
            if ui.button("Save transcript").clicked() {
                action = Some(HintAction::SaveTranscript);
            }
        });
        if let Some(problem) = session.problem() {
            ui.small(format!("{} / {}", problem.subject, problem.problem_type));
        }
        ui.separator();

        let input_height = 40.0;
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .max_height((ui.available_height() - input_height).max(0.0))
            .show(ui, |ui| {
                for (idx, message) in session.messages().iter().enumerate() {
                    let who = match message.role {
                        Role::Assistant => "Socratic Tutor",
                        Role::User => "You",
                    };
                    ui.strong(who);
                    CommonMarkViewer::new(format!("hint_msg_{idx}")).show(
                        ui,
                        &mut self.markdown_cache,
                        &message.content,
                    );
                    ui.add_space(6.0);
                }
                if session.is_pending() || state.analyzing {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.weak("thinking...");
                    });
                }
                if let Some(err) = state.error.or(session.last_error()) {
                    ui.colored_label(ui.visuals().error_fg_color, err);
                }
            });

        ui.separator();
        ui.horizontal(|ui| {
            let hint = if has_image {
                "Ask about your problem..."
            } else {
                "Upload an image first..."
            };
            let edit = ui.add_enabled(
                has_image,
                egui::TextEdit::singleline(&mut self.input)
                    .hint_text(hint)
                    .desired_width(ui.available_width() - 40.0),
            );
            let enter = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            let can_send = has_image && !session.is_pending() && !self.input.trim().is_empty();
            let clicked = ui.add_enabled(can_send, egui::Button::new("➤")).clicked();
            if can_send && (clicked || enter) {
                action = Some(HintAction::Send(std::mem::take(&mut self.input)));
                if enter {
                    edit.request_focus();
                }
            }
        });

        action
    }
}
