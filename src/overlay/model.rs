use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    #[default]
    Pen,
    Highlighter,
    Eraser,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Pen, Tool::Highlighter, Tool::Eraser];

    pub fn label(self) -> &'static str {
        match self {
            Tool::Pen => "Pen",
            Tool::Highlighter => "Highlighter",
            Tool::Eraser => "Eraser",
        }
    }
}

/// Stroke color. Alpha is not part of the configuration; opacity comes from
/// the tool when render parameters are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(0xef, 0x44, 0x44);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |s: &str| channel(s).map(|v| v * 17);
                Some(Self::new(
                    expand(&hex[0..1])?,
                    expand(&hex[1..2])?,
                    expand(&hex[2..3])?,
                ))
            }
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Rgb::RED
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Rgb::from_hex(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{raw}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BrushSize {
    Thin,
    #[default]
    Medium,
    Thick,
    ExtraThick,
}

impl BrushSize {
    pub const ALL: [BrushSize; 4] = [
        BrushSize::Thin,
        BrushSize::Medium,
        BrushSize::Thick,
        BrushSize::ExtraThick,
    ];

    pub const fn pixels(self) -> u32 {
        match self {
            BrushSize::Thin => 2,
            BrushSize::Medium => 4,
            BrushSize::Thick => 8,
            BrushSize::ExtraThick => 16,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BrushSize::Thin => "Thin",
            BrushSize::Medium => "Medium",
            BrushSize::Thick => "Thick",
            BrushSize::ExtraThick => "Extra Thick",
        }
    }

    pub fn from_pixels(pixels: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|size| size.pixels() == pixels)
    }

    /// Snaps an arbitrary width to the closest supported size.
    pub fn nearest(pixels: u32) -> Self {
        Self::ALL
            .into_iter()
            .min_by_key(|size| size.pixels().abs_diff(pixels))
            .unwrap_or_default()
    }
}

impl Serialize for BrushSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.pixels())
    }
}

impl<'de> Deserialize<'de> for BrushSize {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = u32::deserialize(deserializer)?;
        Ok(BrushSize::nearest(raw))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BrushConfig {
    #[serde(default)]
    pub tool: Tool,
    #[serde(default)]
    pub color: Rgb,
    #[serde(default)]
    pub size: BrushSize,
}

impl BrushConfig {
    pub const fn new(tool: Tool, color: Rgb, size: BrushSize) -> Self {
        Self { tool, color, size }
    }
}

/// A position in device-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset_from(self, origin: Point) -> Point {
        Point::new(self.x - origin.x, self.y - origin.y)
    }
}

/// On-screen bounding box of the container the overlay lives in.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Pixel dimensions of a surface laid over this box.
    pub fn pixel_size(&self) -> (u32, u32) {
        let w = self.width.max(0.0).round() as u32;
        let h = self.height.max(0.0).round() as u32;
        (w, h)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left
            && p.y >= self.top
            && p.x < self.left + self.width
            && p.y < self.top + self.height
    }
}
