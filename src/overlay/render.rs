use crate::overlay::model::{BrushConfig, Point, Rgb, Tool};
use crate::overlay::surface::{DirtyRect, InkLayer, Rgba};

pub const PEN_OPACITY: f32 = 1.0;
pub const HIGHLIGHTER_OPACITY: f32 = 0.3;
pub const ERASER_OPACITY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineJoin {
    Round,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    /// Paint over whatever is already on the ink layer.
    SourceOver,
    /// Remove ink where the primitive covers, revealing the background.
    DestinationOut,
}

/// Parameters a primitive is rasterised with. Derived from the brush at the
/// start of every stroke and never changed while the stroke is in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub line_width: u32,
    pub color: Rgb,
    pub opacity: f32,
    pub composite: CompositeMode,
}

impl RenderParams {
    pub fn from_brush(brush: &BrushConfig) -> Self {
        let (opacity, composite) = match brush.tool {
            Tool::Pen => (PEN_OPACITY, CompositeMode::SourceOver),
            Tool::Highlighter => (HIGHLIGHTER_OPACITY, CompositeMode::SourceOver),
            Tool::Eraser => (ERASER_OPACITY, CompositeMode::DestinationOut),
        };
        Self {
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            line_width: brush.size.pixels(),
            color: brush.color,
            opacity,
            composite,
        }
    }

    pub fn radius(&self) -> f32 {
        self.line_width.max(1) as f32 / 2.0
    }
}

impl Default for RenderParams {
    fn default() -> Self {
        Self::from_brush(&BrushConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Dot { center: Point, radius: f32 },
    Segment { from: Point, to: Point },
}

/// Anything strokes can be painted onto. The overlay only talks to its ink
/// through this trait, so the pointer state machine can be exercised against
/// a recording target without rasterising.
pub trait InkTarget {
    fn render(&mut self, primitive: &Primitive, params: &RenderParams) -> Option<DirtyRect>;
}

impl InkTarget for InkLayer {
    fn render(&mut self, primitive: &Primitive, params: &RenderParams) -> Option<DirtyRect> {
        match *primitive {
            Primitive::Dot { center, radius } => fill_circle(self, center, radius, params),
            Primitive::Segment { from, to } => stroke_segment(self, from, to, params),
        }
    }
}

/// Bounds of a capsule around `from`..`to`, padded by one pixel.
pub fn primitive_bounds(from: Point, to: Point, radius: f32) -> DirtyRect {
    let min_x = (from.x.min(to.x) - radius).floor() as i32 - 1;
    let min_y = (from.y.min(to.y) - radius).floor() as i32 - 1;
    let max_x = (from.x.max(to.x) + radius).ceil() as i32 + 1;
    let max_y = (from.y.max(to.y) + radius).ceil() as i32 + 1;
    DirtyRect {
        x: min_x,
        y: min_y,
        width: (max_x - min_x).max(1),
        height: (max_y - min_y).max(1),
    }
}

fn fill_circle(
    layer: &mut InkLayer,
    center: Point,
    radius: f32,
    params: &RenderParams,
) -> Option<DirtyRect> {
    rasterize_capsule(layer, center, center, radius, params)
}

fn stroke_segment(
    layer: &mut InkLayer,
    from: Point,
    to: Point,
    params: &RenderParams,
) -> Option<DirtyRect> {
    rasterize_capsule(layer, from, to, params.radius(), params)
}

// A capsule covers every pixel centre within `radius` of the segment, which
// gives round caps, and round joins wherever two segments share an endpoint.
fn rasterize_capsule(
    layer: &mut InkLayer,
    from: Point,
    to: Point,
    radius: f32,
    params: &RenderParams,
) -> Option<DirtyRect> {
    let clip = primitive_bounds(from, to, radius).clamp(layer.width(), layer.height())?;
    let radius_sq = radius * radius;
    let mut touched: Option<DirtyRect> = None;

    for y in clip.y..(clip.y + clip.height) {
        for x in clip.x..(clip.x + clip.width) {
            let centre = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            if point_segment_distance_sq(centre, from, to) > radius_sq {
                continue;
            }
            let (px, py) = (x as u32, y as u32);
            let blended = composite_pixel(layer.pixel(px, py), params);
            layer.set_pixel(px, py, blended);
            let cell = DirtyRect {
                x,
                y,
                width: 1,
                height: 1,
            };
            touched = Some(touched.map_or(cell, |rect| rect.union(cell)));
        }
    }

    touched
}

fn point_segment_distance_sq(point: Point, start: Point, end: Point) -> f32 {
    let vx = end.x - start.x;
    let vy = end.y - start.y;
    let wx = point.x - start.x;
    let wy = point.y - start.y;
    let len_sq = vx * vx + vy * vy;
    if len_sq <= f32::EPSILON {
        return wx * wx + wy * wy;
    }
    let t = ((wx * vx + wy * vy) / len_sq).clamp(0.0, 1.0);
    let dx = point.x - (start.x + vx * t);
    let dy = point.y - (start.y + vy * t);
    dx * dx + dy * dy
}

pub fn composite_pixel(dst: Rgba, params: &RenderParams) -> Rgba {
    let sa = params.opacity.clamp(0.0, 1.0);
    let da = dst.a as f32 / 255.0;

    match params.composite {
        CompositeMode::DestinationOut => {
            let out_a = da * (1.0 - sa);
            let a = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
            if a == 0 {
                return Rgba::TRANSPARENT;
            }
            Rgba { a, ..dst }
        }
        CompositeMode::SourceOver => {
            let out_a = sa + da * (1.0 - sa);
            if out_a <= f32::EPSILON {
                return Rgba::TRANSPARENT;
            }
            let blend = |s: u8, d: u8| -> u8 {
                (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
                    .round()
                    .clamp(0.0, 255.0) as u8
            };
            Rgba {
                r: blend(params.color.r, dst.r),
                g: blend(params.color.g, dst.g),
                b: blend(params.color.b, dst.b),
                a: (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
            }
        }
    }
}
