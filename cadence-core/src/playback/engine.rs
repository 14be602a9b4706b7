//! Streaming engine selection and the engine seam.
//!
//! The session manager drives a single engine instance per lesson. Targets
//! that can play adaptive streams natively get the native engine; everything
//! else falls back to a software demuxing engine when one can be attached.
//! The engine's internal I/O is opaque here and only observed via events.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use super::PlaybackError;

/// Capabilities of the playback target the viewer renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTarget {
    /// Target plays adaptive streams natively.
    pub native_adaptive: bool,
    /// A software demuxing engine can be attached to the target.
    pub software_engine: bool,
}

impl PlaybackTarget {
    pub fn native() -> Self {
        Self {
            native_adaptive: true,
            software_engine: true,
        }
    }

    pub fn software_only() -> Self {
        Self {
            native_adaptive: false,
            software_engine: true,
        }
    }

    pub fn unsupported() -> Self {
        Self {
            native_adaptive: false,
            software_engine: false,
        }
    }
}

/// Which engine implementation is attached to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Target handles the adaptive stream itself.
    NativeAdaptive,
    /// Software demuxer feeding the target.
    SoftwareDemux,
}

impl EngineKind {
    /// Selects an engine for the target, preferring native adaptive support.
    ///
    /// `None` means the target cannot play the stream at all and the session
    /// must surface a hard unsupported state.
    pub fn select(target: &PlaybackTarget) -> Option<EngineKind> {
        if target.native_adaptive {
            Some(EngineKind::NativeAdaptive)
        } else if target.software_engine {
            Some(EngineKind::SoftwareDemux)
        } else {
            None
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::NativeAdaptive => write!(f, "native-adaptive"),
            EngineKind::SoftwareDemux => write!(f, "software-demux"),
        }
    }
}

/// Classification of engine-reported stream errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// Buffer underrun the engine rides out on its own.
    BufferStall,
    /// Seek landed in a gap of buffered media.
    SeekOverHole,
    /// A single fragment request timed out.
    FragmentTimeout,
    /// Manifest or fragment delivery failed fatally.
    NetworkFatal,
    /// Decode or media pipeline failure.
    MediaFatal,
    /// Anything the engine could not classify.
    Other,
}

impl StreamErrorKind {
    /// Transient errors are swallowed and logged, never surfaced or retried
    /// by the session manager.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StreamErrorKind::BufferStall
                | StreamErrorKind::SeekOverHole
                | StreamErrorKind::FragmentTimeout
        )
    }
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamErrorKind::BufferStall => write!(f, "buffer-stall"),
            StreamErrorKind::SeekOverHole => write!(f, "seek-over-hole"),
            StreamErrorKind::FragmentTimeout => write!(f, "fragment-timeout"),
            StreamErrorKind::NetworkFatal => write!(f, "network-fatal"),
            StreamErrorKind::MediaFatal => write!(f, "media-fatal"),
            StreamErrorKind::Other => write!(f, "other"),
        }
    }
}

/// Events an attached engine reports to the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    LoadingStarted,
    ManifestLoaded,
    /// Playback can start.
    Ready,
    /// Natural end of stream.
    Ended,
    Error {
        kind: StreamErrorKind,
        detail: String,
    },
}

/// A single attached streaming engine instance.
///
/// Implementations own whatever decoder or player handle backs them; the
/// manager guarantees `detach` runs before another engine touches the same
/// target.
#[async_trait]
pub trait StreamEngine: Send {
    /// Begins loading the manifest. Readiness arrives via events, not the
    /// return value.
    async fn load(&mut self, manifest: &Url) -> Result<(), PlaybackError>;

    /// Reloads the manifest after a fatal network error.
    async fn reload(&mut self, manifest: &Url) -> Result<(), PlaybackError>;

    /// One-shot internal recovery after a fatal media error.
    async fn recover_media(&mut self) -> Result<(), PlaybackError>;

    /// Synchronously tears down the engine handle. Idempotent.
    fn detach(&mut self);

    /// Next engine event; `None` once the stream is exhausted or the engine
    /// is detached.
    async fn next_event(&mut self) -> Option<EngineEvent>;

    fn kind(&self) -> EngineKind;

    fn is_attached(&self) -> bool;
}

/// Attaches engines of a given kind to a manifest.
pub trait EngineFactory: Send + Sync {
    /// Creates an engine handle bound to the target.
    ///
    /// # Errors
    ///
    /// - `PlaybackError::EngineFailed` - the engine could not be constructed
    fn attach(
        &self,
        kind: EngineKind,
        manifest: &Url,
    ) -> Result<Box<dyn StreamEngine>, PlaybackError>;
}

/// Scripted engine for tests and headless demo runs.
///
/// Plays back a queue of [`EngineEvent`]s; `reload` and `recover_media`
/// append a `Ready` on success so recovery paths can be exercised without
/// real media.
pub struct SimulationStreamEngine {
    kind: EngineKind,
    events: VecDeque<EngineEvent>,
    attached: bool,
    fail_recovery: bool,
    reloads: u32,
    media_recoveries: u32,
    live: Option<Arc<AtomicUsize>>,
}

impl SimulationStreamEngine {
    /// Engine scripted with the happy path: load, manifest, ready, ended.
    pub fn new(kind: EngineKind) -> Self {
        Self::with_script(
            kind,
            vec![
                EngineEvent::LoadingStarted,
                EngineEvent::ManifestLoaded,
                EngineEvent::Ready,
                EngineEvent::Ended,
            ],
        )
    }

    pub fn with_script(kind: EngineKind, script: Vec<EngineEvent>) -> Self {
        Self {
            kind,
            events: script.into(),
            attached: true,
            fail_recovery: false,
            reloads: 0,
            media_recoveries: 0,
            live: None,
        }
    }

    /// Makes `reload` and `recover_media` produce another fatal error
    /// instead of recovering.
    pub fn fail_recovery(mut self) -> Self {
        self.fail_recovery = true;
        self
    }

    fn track_live(&mut self, live: Arc<AtomicUsize>) {
        live.fetch_add(1, Ordering::SeqCst);
        self.live = Some(live);
    }

    pub fn reloads(&self) -> u32 {
        self.reloads
    }

    pub fn media_recoveries(&self) -> u32 {
        self.media_recoveries
    }
}

#[async_trait]
impl StreamEngine for SimulationStreamEngine {
    async fn load(&mut self, _manifest: &Url) -> Result<(), PlaybackError> {
        Ok(())
    }

    async fn reload(&mut self, _manifest: &Url) -> Result<(), PlaybackError> {
        self.reloads += 1;
        if self.fail_recovery {
            self.events.push_back(EngineEvent::Error {
                kind: StreamErrorKind::NetworkFatal,
                detail: "manifest reload failed".to_string(),
            });
        } else {
            self.events.push_back(EngineEvent::Ready);
        }
        Ok(())
    }

    async fn recover_media(&mut self) -> Result<(), PlaybackError> {
        self.media_recoveries += 1;
        if self.fail_recovery {
            self.events.push_back(EngineEvent::Error {
                kind: StreamErrorKind::MediaFatal,
                detail: "media recovery failed".to_string(),
            });
        } else {
            self.events.push_back(EngineEvent::Ready);
        }
        Ok(())
    }

    fn detach(&mut self) {
        if self.attached {
            self.attached = false;
            if let Some(live) = &self.live {
                live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    async fn next_event(&mut self) -> Option<EngineEvent> {
        if !self.attached {
            return None;
        }
        self.events.pop_front()
    }

    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn is_attached(&self) -> bool {
        self.attached
    }
}

impl Drop for SimulationStreamEngine {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Factory producing [`SimulationStreamEngine`]s and counting live handles.
#[derive(Default)]
pub struct SimulationEngineFactory {
    live: Arc<AtomicUsize>,
    script: Mutex<Option<Vec<EngineEvent>>>,
    fail_recovery: Mutex<bool>,
}

impl SimulationEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script applied to every subsequently attached engine.
    pub fn set_script(&self, script: Vec<EngineEvent>) {
        *self.script.lock() = Some(script);
    }

    pub fn set_fail_recovery(&self, fail: bool) {
        *self.fail_recovery.lock() = fail;
    }

    /// Number of attached engine handles that have not been detached.
    pub fn live_engines(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl EngineFactory for SimulationEngineFactory {
    fn attach(
        &self,
        kind: EngineKind,
        _manifest: &Url,
    ) -> Result<Box<dyn StreamEngine>, PlaybackError> {
        let mut engine = match self.script.lock().clone() {
            Some(script) => SimulationStreamEngine::with_script(kind, script),
            None => SimulationStreamEngine::new(kind),
        };
        if *self.fail_recovery.lock() {
            engine = engine.fail_recovery();
        }
        engine.track_live(Arc::clone(&self.live));
        Ok(Box::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_selection_prefers_native() {
        assert_eq!(
            EngineKind::select(&PlaybackTarget::native()),
            Some(EngineKind::NativeAdaptive)
        );
        assert_eq!(
            EngineKind::select(&PlaybackTarget::software_only()),
            Some(EngineKind::SoftwareDemux)
        );
        assert_eq!(EngineKind::select(&PlaybackTarget::unsupported()), None);
    }

    #[test]
    fn test_transient_error_classification() {
        assert!(StreamErrorKind::BufferStall.is_transient());
        assert!(StreamErrorKind::SeekOverHole.is_transient());
        assert!(StreamErrorKind::FragmentTimeout.is_transient());
        assert!(!StreamErrorKind::NetworkFatal.is_transient());
        assert!(!StreamErrorKind::MediaFatal.is_transient());
        assert!(!StreamErrorKind::Other.is_transient());
    }

    #[tokio::test]
    async fn test_simulation_engine_plays_script_then_drains() {
        let mut engine = SimulationStreamEngine::new(EngineKind::NativeAdaptive);

        assert_eq!(engine.next_event().await, Some(EngineEvent::LoadingStarted));
        assert_eq!(engine.next_event().await, Some(EngineEvent::ManifestLoaded));
        assert_eq!(engine.next_event().await, Some(EngineEvent::Ready));
        assert_eq!(engine.next_event().await, Some(EngineEvent::Ended));
        assert_eq!(engine.next_event().await, None);
    }

    #[tokio::test]
    async fn test_detached_engine_reports_no_events() {
        let mut engine = SimulationStreamEngine::new(EngineKind::SoftwareDemux);
        engine.detach();

        assert!(!engine.is_attached());
        assert_eq!(engine.next_event().await, None);
    }

    #[test]
    fn test_factory_counts_live_handles() {
        let factory = SimulationEngineFactory::new();
        let manifest = Url::parse("https://stream.example.com/a.m3u8").unwrap();

        let mut first = factory
            .attach(EngineKind::NativeAdaptive, &manifest)
            .unwrap();
        let second = factory
            .attach(EngineKind::NativeAdaptive, &manifest)
            .unwrap();
        assert_eq!(factory.live_engines(), 2);

        first.detach();
        first.detach();
        assert_eq!(factory.live_engines(), 1);

        drop(second);
        assert_eq!(factory.live_engines(), 0);
    }
}
