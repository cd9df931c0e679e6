use crate::overlay::composite::flatten;
use crate::overlay::input::{surface_local, PointerAction, PointerEvent, StrokeMachine};
use crate::overlay::model::{BrushConfig, LayoutRect, Point};
use crate::overlay::render::{InkTarget, Primitive, RenderParams};
use crate::overlay::source::{BackgroundImage, ImageError};
use crate::overlay::state::{OverlayLifecycle, StrokePhase};
use crate::overlay::surface::{DirtyRect, InkLayer, Rgba};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// What happens to the surface when the container changes size after the
/// background has loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePolicy {
    /// Keep the size measured at load time.
    #[default]
    Fixed,
    /// Reallocate the ink layer to the new container size, keeping the
    /// overlapping ink.
    Follow,
}

/// Ink storage the overlay can allocate once it knows its size.
pub trait InkSurface: InkTarget + Sized {
    fn allocate(width: u32, height: u32) -> Self;
    fn resized(&self, width: u32, height: u32) -> Self;
    fn size(&self) -> (u32, u32);
    /// Drops all ink, keeping the size.
    fn clear(&mut self);
}

impl InkSurface for InkLayer {
    fn allocate(width: u32, height: u32) -> Self {
        InkLayer::new(width, height)
    }

    fn resized(&self, width: u32, height: u32) -> Self {
        InkLayer::resized(self, width, height)
    }

    fn size(&self) -> (u32, u32) {
        InkLayer::size(self)
    }

    fn clear(&mut self) {
        InkLayer::clear(self)
    }
}

/// Freehand ink layered over a background image.
///
/// The overlay starts `Pending` and ignores all input until a decoded
/// background arrives through [`AnnotationOverlay::on_image_decoded`]. At that
/// moment the surface is sized to the container's current bounding box, not
/// to the image. Brush changes are picked up when the next stroke starts.
#[derive(Debug)]
pub struct AnnotationOverlay<S: InkSurface = InkLayer> {
    container: LayoutRect,
    policy: ResizePolicy,
    lifecycle: OverlayLifecycle,
    background: Option<BackgroundImage>,
    surface: Option<S>,
    brush: BrushConfig,
    machine: StrokeMachine,
    primitives_rendered: u64,
    dirty: Option<DirtyRect>,
}

impl<S: InkSurface> AnnotationOverlay<S> {
    pub fn new(container: LayoutRect, policy: ResizePolicy) -> Self {
        Self {
            container,
            policy,
            lifecycle: OverlayLifecycle::Pending,
            background: None,
            surface: None,
            brush: BrushConfig::default(),
            machine: StrokeMachine::default(),
            primitives_rendered: 0,
            dirty: None,
        }
    }

    /// One-shot decode completion. A failed decode leaves the overlay pending
    /// and inert; reporting it is up to the caller.
    pub fn on_image_decoded(&mut self, result: Result<BackgroundImage, ImageError>) -> bool {
        let background = match result {
            Ok(background) => background,
            Err(err) => {
                tracing::debug!(error = %err, "background decode failed; overlay stays pending");
                return false;
            }
        };

        let (width, height) = self.container.pixel_size();
        tracing::info!(
            image_width = background.width(),
            image_height = background.height(),
            width,
            height,
            "annotation surface ready"
        );
        self.surface = Some(S::allocate(width, height));
        self.background = Some(background);
        self.machine.reset();
        self.dirty = None;
        self.lifecycle = OverlayLifecycle::Ready;
        true
    }

    /// Latest configuration from the tool palette. Takes effect on the next
    /// engage.
    pub fn set_brush(&mut self, brush: BrushConfig) {
        self.brush = brush;
    }

    pub fn brush(&self) -> BrushConfig {
        self.brush
    }

    pub fn handle_pointer(&mut self, event: &PointerEvent) -> Option<Primitive> {
        match event.action {
            PointerAction::Press => self.engage(event.position()?),
            PointerAction::Move => self.extend(event.position()?),
            PointerAction::Release | PointerAction::Leave => {
                self.disengage();
                None
            }
        }
    }

    pub fn engage(&mut self, raw: Point) -> Option<Primitive> {
        if !self.lifecycle.accepts_input() {
            return None;
        }
        let local = self.to_local(raw);
        if !self.in_bounds(local) {
            return None;
        }
        let params = RenderParams::from_brush(&self.brush);
        let primitive = self.machine.engage(local, params)?;
        tracing::debug!(x = local.x, y = local.y, tool = ?self.brush.tool, "stroke engaged");
        self.paint(primitive);
        Some(primitive)
    }

    pub fn extend(&mut self, raw: Point) -> Option<Primitive> {
        if !self.lifecycle.accepts_input() || !self.machine.phase().is_drawing() {
            return None;
        }
        let local = self.to_local(raw);
        if !self.in_bounds(local) {
            self.disengage();
            return None;
        }
        let primitive = self.machine.extend(local)?;
        self.paint(primitive);
        Some(primitive)
    }

    pub fn disengage(&mut self) {
        if self.machine.disengage() {
            tracing::debug!(
                primitives = self.primitives_rendered,
                "stroke disengaged"
            );
        }
    }

    /// Container layout changed. The on-screen origin always follows the
    /// container so coordinate mapping stays correct; the surface size only
    /// follows with [`ResizePolicy::Follow`].
    pub fn on_container_resized(&mut self, container: LayoutRect) {
        self.container = container;
        if self.policy != ResizePolicy::Follow {
            return;
        }
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        let (width, height) = container.pixel_size();
        if surface.size() != (width, height) {
            tracing::debug!(width, height, "resizing annotation surface");
            *surface = surface.resized(width, height);
            self.dirty = None;
        }
    }

    /// Drops all ink, keeping the background.
    pub fn clear(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
        }
        self.machine.reset();
        self.dirty = None;
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.accepts_input()
    }

    pub fn lifecycle(&self) -> OverlayLifecycle {
        self.lifecycle
    }

    pub fn phase(&self) -> StrokePhase {
        self.machine.phase()
    }

    pub fn container(&self) -> LayoutRect {
        self.container
    }

    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.surface.as_ref().map(InkSurface::size)
    }

    pub fn ink(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    pub fn background(&self) -> Option<&BackgroundImage> {
        self.background.as_ref()
    }

    pub fn primitives_rendered(&self) -> u64 {
        self.primitives_rendered
    }

    /// Region painted since the last call.
    pub fn take_dirty(&mut self) -> Option<DirtyRect> {
        self.dirty.take()
    }

    fn to_local(&self, raw: Point) -> Point {
        surface_local(raw, self.container.origin())
    }

    fn in_bounds(&self, local: Point) -> bool {
        let Some((width, height)) = self.surface_size() else {
            return false;
        };
        LayoutRect::new(0.0, 0.0, width as f32, height as f32).contains(local)
    }

    fn paint(&mut self, primitive: Primitive) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        self.primitives_rendered += 1;
        if let Some(rect) = surface.render(&primitive, self.machine.params()) {
            self.dirty = Some(self.dirty.map_or(rect, |d| d.union(rect)));
        }
    }
}

impl AnnotationOverlay<InkLayer> {
    /// Background with the ink composited on top, at surface resolution.
    pub fn flatten(&self, letterbox: Rgba) -> Option<RgbaImage> {
        Some(flatten(self.background.as_ref()?, self.surface.as_ref()?, letterbox))
    }
}
