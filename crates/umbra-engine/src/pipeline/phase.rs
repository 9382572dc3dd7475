use crate::error::RenderError;

/// Where a frame is in the deferred sequence.
///
/// The only legal cycle is
/// `Idle → GBufferFill → LightAccumulate → Composite → Idle`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum FramePhase {
    #[default]
    Idle,
    GBufferFill,
    LightAccumulate,
    Composite,
}

impl FramePhase {
    /// The phase that must follow this one.
    pub const fn next(self) -> FramePhase {
        match self {
            FramePhase::Idle => FramePhase::GBufferFill,
            FramePhase::GBufferFill => FramePhase::LightAccumulate,
            FramePhase::LightAccumulate => FramePhase::Composite,
            FramePhase::Composite => FramePhase::Idle,
        }
    }

    /// Moves to `to` if it is the successor, otherwise leaves `self` untouched.
    pub fn advance(&mut self, to: FramePhase) -> Result<(), RenderError> {
        if self.next() != to {
            return Err(RenderError::PhaseOrder { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle_returns_to_idle() {
        let mut phase = FramePhase::Idle;
        for to in [
            FramePhase::GBufferFill,
            FramePhase::LightAccumulate,
            FramePhase::Composite,
            FramePhase::Idle,
        ] {
            phase.advance(to).unwrap();
        }
        assert_eq!(phase, FramePhase::Idle);
    }

    #[test]
    fn skipping_a_phase_is_rejected() {
        let mut phase = FramePhase::Idle;
        assert_eq!(
            phase.advance(FramePhase::Composite),
            Err(RenderError::PhaseOrder { from: FramePhase::Idle, to: FramePhase::Composite })
        );
        assert_eq!(phase, FramePhase::Idle);

        phase.advance(FramePhase::GBufferFill).unwrap();
        assert!(phase.advance(FramePhase::GBufferFill).is_err());
    }
}
