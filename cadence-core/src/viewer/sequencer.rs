//! View sequence state machine for a selected lesson.
//!
//! The viewer walks teaser → preview → lesson video → progress. The cover
//! preview never auto-advances; paid content must not start from a timer.
//! A "start now" shortcut bypasses the intro entirely.

use std::fmt;

use tracing::debug;

/// Stage of the per-lesson view sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerStage {
    /// Autoplaying intro clip.
    Teaser,
    /// Static course cover; waits for explicit user action.
    Preview,
    /// Active playback session.
    LessonVideo,
    /// Terminal per-lesson state showing aggregate progress.
    Progress,
}

impl ViewerStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ViewerStage::Progress)
    }
}

impl fmt::Display for ViewerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewerStage::Teaser => write!(f, "teaser"),
            ViewerStage::Preview => write!(f, "preview"),
            ViewerStage::LessonVideo => write!(f, "lesson-video"),
            ViewerStage::Progress => write!(f, "progress"),
        }
    }
}

/// How the viewer session was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    /// Full sequence starting at the teaser.
    Standard,
    /// "Start now" shortcut straight into the lesson video.
    QuickStart,
}

/// Inputs that drive stage transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEvent {
    /// Intro clip reached its natural end.
    TeaserEnded,
    /// Bounded fallback fired because the intro never started loading.
    TeaserStartTimedOut,
    /// Explicit user action on the cover preview.
    CoverConfirmed,
    /// Playback session reported a natural end of stream.
    VideoEnded,
    /// Playback session was destroyed by a terminal error.
    VideoFailed,
}

/// Per-lesson stage machine. Events that do not apply to the current stage
/// are swallowed.
#[derive(Debug, Clone)]
pub struct Sequencer {
    stage: ViewerStage,
    entry: EntryMode,
}

impl Sequencer {
    pub fn new(entry: EntryMode) -> Self {
        Self {
            stage: Self::initial_stage(entry),
            entry,
        }
    }

    fn initial_stage(entry: EntryMode) -> ViewerStage {
        match entry {
            EntryMode::Standard => ViewerStage::Teaser,
            EntryMode::QuickStart => ViewerStage::LessonVideo,
        }
    }

    pub fn stage(&self) -> ViewerStage {
        self.stage
    }

    pub fn entry(&self) -> EntryMode {
        self.entry
    }

    /// Restarts the sequence for a newly selected lesson.
    pub fn reset(&mut self) {
        self.stage = Self::initial_stage(self.entry);
    }

    /// Applies an event and returns the (possibly unchanged) stage.
    pub fn apply(&mut self, event: SequencerEvent) -> ViewerStage {
        let next = match (self.stage, event) {
            (ViewerStage::Teaser, SequencerEvent::TeaserEnded)
            | (ViewerStage::Teaser, SequencerEvent::TeaserStartTimedOut) => ViewerStage::Preview,
            (ViewerStage::Preview, SequencerEvent::CoverConfirmed) => ViewerStage::LessonVideo,
            // A failed video also lands on progress; it is the path back to
            // a default view rather than a dead end.
            (ViewerStage::LessonVideo, SequencerEvent::VideoEnded)
            | (ViewerStage::LessonVideo, SequencerEvent::VideoFailed) => ViewerStage::Progress,
            (stage, event) => {
                debug!(%stage, ?event, "sequencer event swallowed");
                stage
            }
        };

        self.stage = next;
        next
    }
}
