use crate::overlay::{BrushConfig, BrushSize, Rgb, Tool};
use eframe::egui;

pub const SWATCHES: [Rgb; 6] = [
    Rgb::RED,
    Rgb::new(0xf5, 0x9e, 0x0b),
    Rgb::new(0xfa, 0xcc, 0x15),
    Rgb::new(0x22, 0xc5, 0x5e),
    Rgb::new(0x3b, 0x82, 0xf6),
    Rgb::BLACK,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteAction {
    Changed(BrushConfig),
    ClearInk,
}

/// Tool, color and size selector. Owns the current brush configuration and
/// reports changes; the overlay reads it at the start of each stroke.
#[derive(Debug, Clone)]
pub struct ToolPalette {
    brush: BrushConfig,
}

impl ToolPalette {
    pub fn new(brush: BrushConfig) -> Self {
        Self { brush }
    }

    pub fn brush(&self) -> BrushConfig {
        self.brush
    }

    pub fn ui(&mut self, ui: &mut egui::Ui, enabled: bool) -> Option<PaletteAction> {
        let before = self.brush;
        let mut action = None;

        ui.add_enabled_ui(enabled, |ui| {
            ui.horizontal(|ui| {
                for tool in Tool::ALL {
                    ui.selectable_value(&mut self.brush.tool, tool, tool.label());
                }
                ui.separator();

                // Color is irrelevant while erasing.
                ui.add_enabled_ui(self.brush.tool != Tool::Eraser, |ui| {
                    for swatch in SWATCHES {
                        let color = to_color32(swatch);
                        let selected = self.brush.color == swatch;
                        let (rect, response) =
                            ui.allocate_exact_size(egui::vec2(18.0, 18.0), egui::Sense::click());
                        ui.painter().circle_filled(rect.center(), 8.0, color);
                        if selected {
                            ui.painter().circle_stroke(
                                rect.center(),
                                9.0,
                                egui::Stroke::new(2.0, ui.visuals().strong_text_color()),
                            );
                        }
                        if response.on_hover_text(swatch.to_hex()).clicked() {
                            self.brush.color = swatch;
                        }
                    }
                    let mut rgb = [self.brush.color.r, self.brush.color.g, self.brush.color.b];
                    if ui.color_edit_button_srgb(&mut rgb).changed() {
                        self.brush.color = Rgb::new(rgb[0], rgb[1], rgb[2]);
                    }
                });
                ui.separator();

                egui::ComboBox::from_id_source("brush_size")
                    .selected_text(self.brush.size.label())
                    .show_ui(ui, |ui| {
                        for size in BrushSize::ALL {
                            ui.selectable_value(&mut self.brush.size, size, size.label());
                        }
                    });
                ui.separator();

                if ui.button("Clear").clicked() {
                    action = Some(PaletteAction::ClearInk);
                }
            });
        });

        if action.is_none() && self.brush != before {
            tracing::debug!(brush = ?self.brush, "brush changed");
            action = Some(PaletteAction::Changed(self.brush));
        }
        action
    }
}

pub fn to_color32(color: Rgb) -> egui::Color32 {
    egui::Color32::from_rgb(color.r, color.g, color.b)
}
