//! Cadence Core - student content-delivery engine
//!
//! This crate provides the building blocks of the course viewer: drip
//! scheduling of purchased lessons against a start date, per-lesson
//! completion tracking with optimistic local state, and a resilient
//! adaptive-bitrate playback session with classified error recovery.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod playback;
pub mod progress;
pub mod schedule;
pub mod tracing_setup;
pub mod viewer;

// Re-export main types for convenient access
pub use catalog::{CatalogClient, CatalogError, Course, Lesson, Purchase};
pub use config::CadenceConfig;
pub use playback::{PlaybackError, PlaybackEvent, PlaybackSessionManager};
pub use schedule::{LessonStatus, available_lesson_index};
pub use viewer::CourseViewer;

/// Core errors that can bubble up from any Cadence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum CadenceError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Course load timed out")]
    LoadTimedOut,

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CadenceError {
    /// Returns a user-friendly message suitable for display.
    ///
    /// Transient network blips never reach the learner; only terminal
    /// conditions carry a visible message, and each corresponds to a view
    /// that offers a way back to the course overview.
    pub fn user_message(&self) -> String {
        match self {
            CadenceError::Playback(e) => match e {
                PlaybackError::NoPlayableReference { .. } => {
                    "This lesson has no playable video yet".to_string()
                }
                PlaybackError::UnsupportedTarget => {
                    "Video playback is not supported on this device".to_string()
                }
                PlaybackError::LoadTimeout { .. } => {
                    "The video took too long to load".to_string()
                }
                PlaybackError::EngineFailed { .. } => "Video unavailable".to_string(),
            },
            CadenceError::LoadTimedOut => {
                "Loading took too long, returning to the overview".to_string()
            }
            CadenceError::Catalog(_) => "Could not reach the course library".to_string(),
            CadenceError::Configuration { reason } => {
                format!("Configuration error: {reason}")
            }
            CadenceError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Whether this error maps to a terminal, user-visible viewer state.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            CadenceError::LoadTimedOut
                | CadenceError::Playback(
                    PlaybackError::NoPlayableReference { .. }
                        | PlaybackError::UnsupportedTarget
                        | PlaybackError::LoadTimeout { .. }
                )
        )
    }
}

pub type Result<T> = std::result::Result<T, CadenceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_for_terminal_conditions() {
        let unsupported = CadenceError::Playback(PlaybackError::UnsupportedTarget);
        assert!(unsupported.is_user_visible());
        assert!(unsupported.user_message().contains("not supported"));

        let timed_out = CadenceError::LoadTimedOut;
        assert!(timed_out.is_user_visible());
        assert!(timed_out.user_message().contains("overview"));
    }

    #[test]
    fn test_catalog_errors_stay_generic() {
        let error = CadenceError::Catalog(CatalogError::Decode {
            reason: "bad json".to_string(),
        });

        assert!(!error.is_user_visible());
        // Internals never leak into the learner-facing message.
        assert!(!error.user_message().contains("bad json"));
    }
}
