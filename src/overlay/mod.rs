//! Freehand annotation layered over a background image.

pub mod composite;
pub mod controller;
pub mod input;
pub mod model;
pub mod render;
pub mod source;
pub mod state;
pub mod surface;

pub use controller::{AnnotationOverlay, InkSurface, ResizePolicy};
pub use input::{PointerAction, PointerDevice, PointerEvent};
pub use model::{BrushConfig, BrushSize, LayoutRect, Point, Rgb, Tool};
pub use render::{CompositeMode, InkTarget, Primitive, RenderParams};
pub use source::{BackgroundImage, ImageError, ImageLoad, ImageSource};
pub use state::{OverlayLifecycle, StrokePhase};
pub use surface::{DirtyRect, InkLayer, Rgba};
