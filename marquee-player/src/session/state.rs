use marquee_model::PlaybackState;

/// Outcome of a requested transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Changed {
        from: PlaybackState,
        to: PlaybackState,
    },
    /// Already in the requested state; nothing to publish
    Unchanged,
    Rejected {
        from: PlaybackState,
        to: PlaybackState,
    },
}

/// Pure playback state machine of a session.
///
/// `Ended` and `Failed` are left only through [`begin_load`] or [`reset`].
///
/// [`begin_load`]: SessionStateMachine::begin_load
/// [`reset`]: SessionStateMachine::reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStateMachine {
    state: PlaybackState,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Whether an event may move the session from `from` to `to`
    pub fn allows(from: PlaybackState, to: PlaybackState) -> bool {
        use PlaybackState::*;

        match (from, to) {
            (Failed, _) | (Ended, _) => false,
            (_, Failed) => true,
            (Loading, Ready) => true,
            (Ready | Paused | Buffering, Playing) => true,
            (Playing | Buffering, Paused) => true,
            (Ready | Playing | Paused, Buffering) => true,
            (Playing | Buffering, Ended) => true,
            _ => false,
        }
    }

    pub fn apply(&mut self, to: PlaybackState) -> Transition {
        let from = self.state;
        if from == to {
            return Transition::Unchanged;
        }
        if !Self::allows(from, to) {
            return Transition::Rejected { from, to };
        }
        self.state = to;
        Transition::Changed { from, to }
    }

    /// A new load starts from any state
    pub fn begin_load(&mut self) -> Transition {
        self.force(PlaybackState::Loading)
    }

    /// Back to `Idle` after teardown
    pub fn reset(&mut self) -> Transition {
        self.force(PlaybackState::Idle)
    }

    fn force(&mut self, to: PlaybackState) -> Transition {
        let from = self.state;
        if from == to {
            return Transition::Unchanged;
        }
        self.state = to;
        Transition::Changed { from, to }
    }
}
