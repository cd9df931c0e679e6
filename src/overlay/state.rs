/// Phase of the pointer stream driving a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrokePhase {
    #[default]
    Idle,
    Drawing,
}

impl StrokePhase {
    pub fn is_drawing(self) -> bool {
        matches!(self, Self::Drawing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeTransition {
    Engage,
    Extend,
    Disengage,
}

/// Target phase for a transition, or `None` when the transition is not legal
/// from `from` and must be ignored.
pub fn next_phase(from: StrokePhase, transition: StrokeTransition) -> Option<StrokePhase> {
    match (from, transition) {
        (StrokePhase::Idle, StrokeTransition::Engage) => Some(StrokePhase::Drawing),
        (StrokePhase::Drawing, StrokeTransition::Extend) => Some(StrokePhase::Drawing),
        (StrokePhase::Drawing, StrokeTransition::Disengage) => Some(StrokePhase::Idle),
        _ => None,
    }
}

/// Lifecycle of the overlay itself. Input is only accepted once `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayLifecycle {
    #[default]
    Pending,
    Ready,
}

impl OverlayLifecycle {
    pub fn accepts_input(self) -> bool {
        matches!(self, Self::Ready)
    }
}
