//! Sink element model
//!
//! The surrounding pipeline framework only ever talks to a sink through
//! [`VideoSink`]; concrete sinks never depend on framework types.

use crate::types::{FrameInfo, FrameRef};

/// Lifecycle state of a sink, ordered from idle to running
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum RunState {
    #[default]
    Null = 0,
    Ready = 1,
    Paused = 2,
    Playing = 3,
}

impl RunState {
    /// Frames may be rendered from Paused (preroll) upwards
    pub fn can_render(self) -> bool {
        self >= RunState::Paused
    }
}

/// One step of the lifecycle state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    NullToReady,
    ReadyToPaused,
    PausedToPlaying,
    PlayingToPaused,
    PausedToReady,
    ReadyToNull,
}

impl StateTransition {
    /// State the sink is in once the transition completes
    pub fn target(self) -> RunState {
        match self {
            StateTransition::NullToReady | StateTransition::PausedToReady => RunState::Ready,
            StateTransition::ReadyToPaused | StateTransition::PlayingToPaused => RunState::Paused,
            StateTransition::PausedToPlaying => RunState::Playing,
            StateTransition::ReadyToNull => RunState::Null,
        }
    }

    /// Transitions that leave the streaming states and drop frame resources
    pub fn is_teardown(self) -> bool {
        matches!(
            self,
            StateTransition::PausedToReady | StateTransition::ReadyToNull
        )
    }
}

/// What happened to a frame handed to [`VideoSink::render`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Frame went through to the consumer; `acknowledged` is informational
    Rendered { acknowledged: bool },
    /// Frame was queued for another thread
    Queued,
    /// Frame was skipped because a transform stage rejected it
    Skipped,
    /// Frame was refused by admission control
    Dropped,
}

/// Capability set a pipeline framework needs from a video sink
pub trait VideoSink {
    type Error;

    /// Accept a new stream format. Called on every format change.
    fn negotiate(&mut self, info: FrameInfo) -> Result<(), Self::Error>;

    /// Process one frame
    fn render(&mut self, frame: FrameRef) -> Result<RenderOutcome, Self::Error>;

    /// React to a lifecycle transition
    fn change_state(&mut self, transition: StateTransition) -> Result<(), Self::Error>;
}
