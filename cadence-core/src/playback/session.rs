//! Playback session lifecycle.
//!
//! Exactly one session is live at a time. Opening a session for a new
//! lesson implicitly closes the previous one; two engines attached to the
//! same rendering target duplicate audio and decoders. Teardown also runs
//! on drop as a backstop, so an abandoned manager never leaks a handle.

use std::sync::Arc;

use tracing::{debug, error, trace, warn};
use url::Url;

use super::engine::{EngineEvent, EngineFactory, EngineKind, PlaybackTarget, StreamEngine};
use super::reference::manifest_url;
use super::{PlaybackError, StreamErrorKind};
use crate::catalog::{Lesson, LessonId};
use crate::config::{PlaybackConfig, StreamConfig};

/// Events the session manager surfaces to its caller.
///
/// `Ended` fires exactly once per session; completion side effects belong
/// to the caller, the manager performs no persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    LoadingStarted,
    /// Playback can start.
    Ready,
    /// Natural end of stream.
    Ended,
    /// Session destroyed; show the terminal "video unavailable" state.
    Fatal {
        kind: StreamErrorKind,
        detail: String,
    },
}

/// In-memory state of the one live session.
struct PlaybackSession {
    lesson_id: LessonId,
    manifest: Url,
    engine: Box<dyn StreamEngine>,
    loading: bool,
    ended: bool,
    network_reloads: u32,
    media_recoveries: u32,
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.engine.detach();
    }
}

/// Owns the lifecycle of the active lesson's streaming session.
pub struct PlaybackSessionManager {
    factory: Arc<dyn EngineFactory>,
    target: PlaybackTarget,
    stream: StreamConfig,
    policy: PlaybackConfig,
    session: Option<PlaybackSession>,
}

impl PlaybackSessionManager {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        target: PlaybackTarget,
        stream: StreamConfig,
        policy: PlaybackConfig,
    ) -> Self {
        Self {
            factory,
            target,
            stream,
            policy,
            session: None,
        }
    }

    /// Opens a session for the lesson, closing any prior session first.
    ///
    /// The load is kicked off fire-and-forget; readiness arrives via
    /// [`PlaybackEvent::Ready`] from the event pump.
    ///
    /// # Errors
    ///
    /// - `PlaybackError::NoPlayableReference` - lesson carries no usable reference
    /// - `PlaybackError::UnsupportedTarget` - target supports no engine
    /// - `PlaybackError::EngineFailed` - engine could not be attached
    pub async fn open(&mut self, lesson: &Lesson) -> Result<(), PlaybackError> {
        self.close();

        let reference = lesson.video_reference.as_deref().unwrap_or_default();
        let Some(manifest) = manifest_url(reference, &self.stream) else {
            warn!(lesson_id = %lesson.id, "lesson has no usable playback reference");
            return Err(PlaybackError::NoPlayableReference {
                lesson_id: lesson.id,
            });
        };

        let Some(kind) = EngineKind::select(&self.target) else {
            warn!(lesson_id = %lesson.id, "playback target supports no streaming engine");
            return Err(PlaybackError::UnsupportedTarget);
        };

        let mut engine = self.factory.attach(kind, &manifest)?;
        engine.load(&manifest).await?;
        debug!(
            lesson_id = %lesson.id,
            engine = %kind,
            manifest = %manifest,
            "playback session opened"
        );

        self.session = Some(PlaybackSession {
            lesson_id: lesson.id,
            manifest,
            engine,
            loading: true,
            ended: false,
            network_reloads: 0,
            media_recoveries: 0,
        });
        Ok(())
    }

    /// Deterministically tears down the live engine handle.
    ///
    /// Safe to call when no session is open; runs on every lesson switch
    /// and on viewer teardown.
    pub fn close(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.engine.detach();
            debug!(lesson_id = %session.lesson_id, "playback session closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn current_lesson(&self) -> Option<LessonId> {
        self.session.as_ref().map(|session| session.lesson_id)
    }

    pub fn is_loading(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| session.loading)
            .unwrap_or(false)
    }

    /// Next caller-facing event, or `None` when the session is gone or the
    /// engine has nothing more to report.
    ///
    /// Transient engine errors are swallowed here; fatal network errors get
    /// one bounded manifest reload, fatal media errors one recovery
    /// attempt. Anything past those budgets destroys the session and
    /// surfaces as [`PlaybackEvent::Fatal`].
    pub async fn next_event(&mut self) -> Option<PlaybackEvent> {
        let network_limit = self.policy.network_reload_limit;
        let media_limit = self.policy.media_recovery_limit;

        let (event, terminal) = {
            let session = self.session.as_mut()?;
            loop {
                let Some(engine_event) = session.engine.next_event().await else {
                    return None;
                };

                match engine_event {
                    EngineEvent::LoadingStarted => {
                        session.loading = true;
                        break (PlaybackEvent::LoadingStarted, false);
                    }
                    EngineEvent::ManifestLoaded => {
                        trace!(lesson_id = %session.lesson_id, "manifest loaded");
                    }
                    EngineEvent::Ready => {
                        session.loading = false;
                        break (PlaybackEvent::Ready, false);
                    }
                    EngineEvent::Ended => {
                        if session.ended {
                            continue;
                        }
                        session.ended = true;
                        break (PlaybackEvent::Ended, false);
                    }
                    EngineEvent::Error { kind, detail } => {
                        if kind.is_transient() {
                            debug!(%kind, %detail, "transient stream error swallowed");
                            continue;
                        }

                        let recovered = match kind {
                            StreamErrorKind::NetworkFatal
                                if session.network_reloads < network_limit =>
                            {
                                session.network_reloads += 1;
                                warn!(
                                    %detail,
                                    attempt = session.network_reloads,
                                    "fatal network error, reloading manifest"
                                );
                                let manifest = session.manifest.clone();
                                session.engine.reload(&manifest).await.is_ok()
                            }
                            StreamErrorKind::MediaFatal
                                if session.media_recoveries < media_limit =>
                            {
                                session.media_recoveries += 1;
                                warn!(
                                    %detail,
                                    attempt = session.media_recoveries,
                                    "fatal media error, attempting recovery"
                                );
                                session.engine.recover_media().await.is_ok()
                            }
                            _ => false,
                        };

                        if recovered {
                            continue;
                        }

                        error!(%kind, %detail, "unrecoverable stream error, destroying session");
                        break (PlaybackEvent::Fatal { kind, detail }, true);
                    }
                }
            }
        };

        if terminal {
            self.close();
        }
        Some(event)
    }
}

impl Drop for PlaybackSessionManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::super::engine::SimulationEngineFactory;
    use super::*;
    use crate::catalog::LessonId;

    fn lesson(id: u128, reference: Option<&str>) -> Lesson {
        Lesson {
            id: LessonId::new(Uuid::from_u128(id)),
            title: "Test lesson".to_string(),
            description: String::new(),
            duration_minutes: 20,
            video_reference: reference.map(str::to_string),
            preview_image: None,
            lesson_order: 0,
        }
    }

    fn manager(
        factory: Arc<SimulationEngineFactory>,
        target: PlaybackTarget,
    ) -> PlaybackSessionManager {
        PlaybackSessionManager::new(
            factory,
            target,
            StreamConfig::default(),
            PlaybackConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_open_closes_previous_session() {
        let factory = Arc::new(SimulationEngineFactory::new());
        let mut sessions = manager(factory.clone(), PlaybackTarget::native());

        let first = lesson(1, Some("aaa111"));
        let second = lesson(2, Some("bbb222"));

        sessions.open(&first).await.unwrap();
        sessions.open(&second).await.unwrap();

        assert_eq!(factory.live_engines(), 1);
        assert_eq!(sessions.current_lesson(), Some(second.id));
    }

    #[tokio::test]
    async fn test_open_without_reference_fails_fast() {
        let factory = Arc::new(SimulationEngineFactory::new());
        let mut sessions = manager(factory.clone(), PlaybackTarget::native());

        let result = sessions.open(&lesson(1, None)).await;

        assert!(matches!(
            result,
            Err(PlaybackError::NoPlayableReference { .. })
        ));
        assert!(!sessions.is_open());
        assert_eq!(factory.live_engines(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_target_surfaces_hard_state() {
        let factory = Arc::new(SimulationEngineFactory::new());
        let mut sessions = manager(factory, PlaybackTarget::unsupported());

        let result = sessions.open(&lesson(1, Some("aaa111"))).await;
        assert!(matches!(result, Err(PlaybackError::UnsupportedTarget)));
    }

    #[tokio::test]
    async fn test_happy_path_event_sequence() {
        let factory = Arc::new(SimulationEngineFactory::new());
        let mut sessions = manager(factory, PlaybackTarget::native());
        sessions.open(&lesson(1, Some("aaa111"))).await.unwrap();

        assert_eq!(
            sessions.next_event().await,
            Some(PlaybackEvent::LoadingStarted)
        );
        assert_eq!(sessions.next_event().await, Some(PlaybackEvent::Ready));
        assert!(!sessions.is_loading());
        assert_eq!(sessions.next_event().await, Some(PlaybackEvent::Ended));
        assert_eq!(sessions.next_event().await, None);
    }

    #[tokio::test]
    async fn test_ended_fires_exactly_once() {
        let factory = Arc::new(SimulationEngineFactory::new());
        factory.set_script(vec![EngineEvent::Ended, EngineEvent::Ended]);
        let mut sessions = manager(factory, PlaybackTarget::native());
        sessions.open(&lesson(1, Some("aaa111"))).await.unwrap();

        assert_eq!(sessions.next_event().await, Some(PlaybackEvent::Ended));
        assert_eq!(sessions.next_event().await, None);
    }

    #[tokio::test]
    async fn test_transient_errors_are_swallowed() {
        let factory = Arc::new(SimulationEngineFactory::new());
        factory.set_script(vec![
            EngineEvent::LoadingStarted,
            EngineEvent::Error {
                kind: StreamErrorKind::BufferStall,
                detail: "buffer underrun".to_string(),
            },
            EngineEvent::Error {
                kind: StreamErrorKind::FragmentTimeout,
                detail: "fragment 12 timed out".to_string(),
            },
            EngineEvent::Ready,
            EngineEvent::Ended,
        ]);
        let mut sessions = manager(factory, PlaybackTarget::native());
        sessions.open(&lesson(1, Some("aaa111"))).await.unwrap();

        assert_eq!(
            sessions.next_event().await,
            Some(PlaybackEvent::LoadingStarted)
        );
        assert_eq!(sessions.next_event().await, Some(PlaybackEvent::Ready));
        assert_eq!(sessions.next_event().await, Some(PlaybackEvent::Ended));
    }

    #[tokio::test]
    async fn test_network_fatal_recovers_via_reload() {
        let factory = Arc::new(SimulationEngineFactory::new());
        factory.set_script(vec![
            EngineEvent::LoadingStarted,
            EngineEvent::Error {
                kind: StreamErrorKind::NetworkFatal,
                detail: "manifest fetch failed".to_string(),
            },
        ]);
        let mut sessions = manager(factory, PlaybackTarget::native());
        sessions.open(&lesson(1, Some("aaa111"))).await.unwrap();

        assert_eq!(
            sessions.next_event().await,
            Some(PlaybackEvent::LoadingStarted)
        );
        // The reload queues a Ready instead of surfacing the failure.
        assert_eq!(sessions.next_event().await, Some(PlaybackEvent::Ready));
        assert!(sessions.is_open());
    }

    #[tokio::test]
    async fn test_exhausted_recovery_budget_is_terminal() {
        let factory = Arc::new(SimulationEngineFactory::new());
        factory.set_script(vec![EngineEvent::Error {
            kind: StreamErrorKind::NetworkFatal,
            detail: "manifest fetch failed".to_string(),
        }]);
        factory.set_fail_recovery(true);
        let mut sessions = manager(factory.clone(), PlaybackTarget::native());
        sessions.open(&lesson(1, Some("aaa111"))).await.unwrap();

        let event = sessions.next_event().await;
        assert!(matches!(
            event,
            Some(PlaybackEvent::Fatal {
                kind: StreamErrorKind::NetworkFatal,
                ..
            })
        ));
        assert!(!sessions.is_open());
        assert_eq!(factory.live_engines(), 0);
    }

    #[tokio::test]
    async fn test_media_fatal_gets_one_recovery_attempt() {
        let factory = Arc::new(SimulationEngineFactory::new());
        factory.set_script(vec![EngineEvent::Error {
            kind: StreamErrorKind::MediaFatal,
            detail: "decode failure".to_string(),
        }]);
        let mut sessions = manager(factory, PlaybackTarget::software_only());
        sessions.open(&lesson(1, Some("aaa111"))).await.unwrap();

        assert_eq!(sessions.next_event().await, Some(PlaybackEvent::Ready));
    }

    #[tokio::test]
    async fn test_other_fatal_is_immediately_terminal() {
        let factory = Arc::new(SimulationEngineFactory::new());
        factory.set_script(vec![EngineEvent::Error {
            kind: StreamErrorKind::Other,
            detail: "engine internal assertion".to_string(),
        }]);
        let mut sessions = manager(factory, PlaybackTarget::native());
        sessions.open(&lesson(1, Some("aaa111"))).await.unwrap();

        assert!(matches!(
            sessions.next_event().await,
            Some(PlaybackEvent::Fatal {
                kind: StreamErrorKind::Other,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let factory = Arc::new(SimulationEngineFactory::new());
        let mut sessions = manager(factory.clone(), PlaybackTarget::native());
        sessions.open(&lesson(1, Some("aaa111"))).await.unwrap();

        sessions.close();
        sessions.close();

        assert_eq!(factory.live_engines(), 0);
        assert_eq!(sessions.next_event().await, None);
    }
}
