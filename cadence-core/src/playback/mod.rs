//! Adaptive-bitrate playback session management.
//!
//! One lesson, one session, one engine handle: the manager normalizes the
//! lesson's playback reference to a canonical manifest URL, attaches the
//! best engine the target supports, classifies stream errors into
//! swallowed/recoverable/terminal, and guarantees the previous engine is
//! torn down before the next one attaches.

pub mod engine;
pub mod reference;
pub mod session;

use crate::catalog::LessonId;

pub use engine::{
    EngineEvent, EngineFactory, EngineKind, PlaybackTarget, SimulationEngineFactory,
    SimulationStreamEngine, StreamEngine, StreamErrorKind,
};
pub use reference::{MANIFEST_SUFFIX, manifest_url, stream_id};
pub use session::{PlaybackEvent, PlaybackSessionManager};

/// Errors from opening or driving a playback session.
///
/// Only a small set of terminal conditions ever becomes user-visible; the
/// session manager swallows transient engine noise internally.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("Lesson {lesson_id} has no usable playback reference")]
    NoPlayableReference { lesson_id: LessonId },

    #[error("Playback target supports no streaming engine")]
    UnsupportedTarget,

    #[error("Stream load did not become ready within {seconds}s")]
    LoadTimeout { seconds: u64 },

    #[error("Streaming engine failed ({kind}): {reason}")]
    EngineFailed {
        kind: StreamErrorKind,
        reason: String,
    },
}
