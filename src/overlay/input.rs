use crate::overlay::model::Point;
use crate::overlay::render::{Primitive, RenderParams};
use crate::overlay::state::{next_phase, StrokePhase, StrokeTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Press,
    Move,
    Release,
    /// The pointer left the surface.
    Leave,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PointerDevice {
    Mouse { position: Point },
    /// Active contacts in the order the platform reports them; the first one
    /// is the primary contact. Empty on release.
    Touch { contacts: Vec<Point> },
}

/// Raw input in device coordinates (the same space the surface offset is
/// expressed in).
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub action: PointerAction,
    pub device: PointerDevice,
}

impl PointerEvent {
    pub fn mouse(action: PointerAction, x: f32, y: f32) -> Self {
        Self {
            action,
            device: PointerDevice::Mouse {
                position: Point::new(x, y),
            },
        }
    }

    pub fn touch(action: PointerAction, contacts: Vec<Point>) -> Self {
        Self {
            action,
            device: PointerDevice::Touch { contacts },
        }
    }

    /// Device position of the mouse or the primary touch contact.
    pub fn position(&self) -> Option<Point> {
        match &self.device {
            PointerDevice::Mouse { position } => Some(*position),
            PointerDevice::Touch { contacts } => contacts.first().copied(),
        }
    }
}

/// Maps a raw device coordinate into surface-local space.
pub fn surface_local(raw: Point, surface_origin: Point) -> Point {
    raw.offset_from(surface_origin)
}

/// The engage/extend/disengage pointer stream. Holds no pixels; every
/// transition that paints hands back the primitive to render.
#[derive(Debug, Clone, Default)]
pub struct StrokeMachine {
    phase: StrokePhase,
    anchor: Point,
    params: RenderParams,
}

impl StrokeMachine {
    pub fn phase(&self) -> StrokePhase {
        self.phase
    }

    pub fn anchor(&self) -> Option<Point> {
        self.phase.is_drawing().then_some(self.anchor)
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    /// Starts a stroke at `local` with freshly derived `params`. Returns the
    /// dot marking the press, or `None` if a stroke is already in progress.
    pub fn engage(&mut self, local: Point, params: RenderParams) -> Option<Primitive> {
        self.phase = next_phase(self.phase, StrokeTransition::Engage)?;
        self.params = params;
        self.anchor = local;
        Some(Primitive::Dot {
            center: local,
            radius: params.radius(),
        })
    }

    pub fn extend(&mut self, local: Point) -> Option<Primitive> {
        self.phase = next_phase(self.phase, StrokeTransition::Extend)?;
        let from = std::mem::replace(&mut self.anchor, local);
        Some(Primitive::Segment { from, to: local })
    }

    /// Ends the stroke. Returns `false` when there was nothing to end.
    pub fn disengage(&mut self) -> bool {
        match next_phase(self.phase, StrokeTransition::Disengage) {
            Some(phase) => {
                self.phase = phase;
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.phase = StrokePhase::Idle;
    }
}
