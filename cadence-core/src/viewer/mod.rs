//! Course viewer orchestration.
//!
//! Wires the pipeline together: purchase resolution feeds the drip
//! scheduler, the scheduler picks the initially selected lesson, the
//! sequencer walks the view stages, the playback manager owns the stream,
//! and lesson completions flow into the tracker and back into status
//! derivation. All status computation happens fresh per pass from the
//! injected clock.

pub mod sequencer;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::CadenceError;
use crate::catalog::{
    CatalogClient, CatalogError, Course, Lesson, Purchase, UserId, effective_purchase,
};
use crate::clock::Clock;
use crate::config::CadenceConfig;
use crate::playback::{EngineFactory, PlaybackEvent, PlaybackSessionManager, PlaybackTarget};
use crate::progress::{CompletionTracker, ProgressSummary};
use crate::schedule::{
    LessonStatus, available_lesson_index, course_status_list, days_since_start,
    purchase_start_date,
};

pub use sequencer::{EntryMode, Sequencer, SequencerEvent, ViewerStage};

/// Result of loading the viewer's records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Course ready; the initially selected lesson comes from the
    /// scheduler, never from scanning the rendered status list.
    Ready { selected: Option<usize> },
    /// User holds no active purchase; the viewer shows its empty state.
    NoActivePurchase,
}

struct LoadedCourse {
    purchase: Purchase,
    course: Course,
    tracker: CompletionTracker,
}

/// Orchestrates one user's course viewing session.
pub struct CourseViewer {
    catalog: Arc<dyn CatalogClient>,
    clock: Arc<dyn Clock>,
    config: CadenceConfig,
    playback: PlaybackSessionManager,
    sequencer: Sequencer,
    loaded: Option<LoadedCourse>,
    selected: Option<usize>,
    last_reconcile: Option<DateTime<Utc>>,
}

impl CourseViewer {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        clock: Arc<dyn Clock>,
        engines: Arc<dyn EngineFactory>,
        target: PlaybackTarget,
        config: CadenceConfig,
        entry: EntryMode,
    ) -> Self {
        let playback = PlaybackSessionManager::new(
            engines,
            target,
            config.stream.clone(),
            config.playback.clone(),
        );

        Self {
            catalog,
            clock,
            config,
            playback,
            sequencer: Sequencer::new(entry),
            loaded: None,
            selected: None,
            last_reconcile: None,
        }
    }

    /// Loads the user's purchase and course records and selects today's
    /// lesson.
    ///
    /// The whole load is bounded by `viewer.course_load_timeout`; on expiry
    /// the viewer force-exits to its empty state instead of hanging.
    ///
    /// # Errors
    ///
    /// - `CadenceError::LoadTimedOut` - records did not resolve in time
    /// - `CadenceError::Catalog` - a catalog read failed
    pub async fn load(&mut self, user_id: UserId) -> Result<LoadOutcome, CadenceError> {
        self.playback.close();
        self.loaded = None;
        self.selected = None;

        let catalog = Arc::clone(&self.catalog);
        let fetch = async move {
            let purchases = catalog.fetch_purchases(user_id).await?;
            let Some(purchase) = effective_purchase(&purchases).cloned() else {
                return Ok::<_, CatalogError>(None);
            };
            let course = catalog.fetch_course(purchase.course_id).await?;
            Ok(Some((purchase, course)))
        };

        let records = tokio::time::timeout(self.config.viewer.course_load_timeout, fetch)
            .await
            .map_err(|_| {
                warn!(%user_id, "course load expired, exiting to empty state");
                CadenceError::LoadTimedOut
            })??;

        let Some((purchase, course)) = records else {
            info!(%user_id, "no active purchase, nothing unlockable");
            return Ok(LoadOutcome::NoActivePurchase);
        };

        let tracker = CompletionTracker::new(Arc::clone(&self.catalog), &purchase);
        info!(
            purchase_id = %purchase.id,
            course_id = %course.id,
            lessons = course.lesson_count(),
            "course loaded"
        );

        self.loaded = Some(LoadedCourse {
            purchase,
            course,
            tracker,
        });
        self.last_reconcile = Some(self.clock.now_utc());
        self.selected = self.available_index();
        self.sequencer.reset();
        if self.sequencer.stage() == ViewerStage::LessonVideo {
            self.open_selected().await;
        }

        Ok(LoadOutcome::Ready {
            selected: self.selected,
        })
    }

    /// Day offset of today relative to the purchase start date.
    pub fn days_diff(&self) -> Option<i64> {
        let loaded = self.loaded.as_ref()?;
        Some(days_since_start(
            purchase_start_date(&loaded.purchase),
            self.clock.today(),
        ))
    }

    /// Index of the lesson unlockable today, straight from the scheduler.
    pub fn available_index(&self) -> Option<usize> {
        let loaded = self.loaded.as_ref()?;
        available_lesson_index(
            purchase_start_date(&loaded.purchase),
            self.clock.today(),
            loaded.course.lesson_count(),
        )
    }

    /// Fresh per-lesson statuses for list rendering and click gating.
    pub fn status_list(&self) -> Vec<LessonStatus> {
        let Some(loaded) = self.loaded.as_ref() else {
            return Vec::new();
        };
        let days_diff = days_since_start(
            purchase_start_date(&loaded.purchase),
            self.clock.today(),
        );
        course_status_list(days_diff, &loaded.course.lessons, &loaded.tracker.snapshot())
    }

    pub fn course(&self) -> Option<&Course> {
        self.loaded.as_ref().map(|loaded| &loaded.course)
    }

    pub fn selected_lesson(&self) -> Option<&Lesson> {
        let loaded = self.loaded.as_ref()?;
        loaded.course.lesson_at(self.selected?)
    }

    pub fn stage(&self) -> ViewerStage {
        self.sequencer.stage()
    }

    pub fn config(&self) -> &CadenceConfig {
        &self.config
    }

    /// Selects a lesson from the rendered list.
    ///
    /// Only `Available` lessons may be (re)selected; clicks on locked or
    /// completed entries are swallowed. A successful selection cancels the
    /// current playback session and restarts the stage sequence.
    pub async fn select_lesson(&mut self, position: usize) -> bool {
        let status = self.status_list().get(position).copied();
        let Some(status) = status else {
            debug!(position, "lesson selection out of range, swallowed");
            return false;
        };
        if !status.is_available() {
            debug!(position, %status, "lesson not selectable, click swallowed");
            return false;
        }

        // Switching cancels the old session before its end; the engine must
        // never survive into the next lesson.
        self.playback.close();
        self.selected = Some(position);
        self.sequencer.reset();
        if self.sequencer.stage() == ViewerStage::LessonVideo {
            self.open_selected().await;
        }
        true
    }

    /// Applies a sequencer event, opening the playback session when the
    /// sequence enters the lesson video stage.
    pub async fn advance(&mut self, event: SequencerEvent) -> ViewerStage {
        let before = self.sequencer.stage();
        let after = self.sequencer.apply(event);
        if after == ViewerStage::LessonVideo && before != ViewerStage::LessonVideo {
            self.open_selected().await;
        }
        self.sequencer.stage()
    }

    async fn open_selected(&mut self) {
        let Some(lesson) = self.selected_lesson().cloned() else {
            debug!("no selectable lesson, skipping playback open");
            self.sequencer.apply(SequencerEvent::VideoFailed);
            return;
        };

        if let Err(error) = self.playback.open(&lesson).await {
            // Terminal for this lesson; progress is the path back.
            warn!(lesson_id = %lesson.id, %error, "video unavailable");
            self.sequencer.apply(SequencerEvent::VideoFailed);
        }
    }

    /// Pumps the playback session and applies its side effects.
    ///
    /// On `Ended` the completion is tracked before the stage advances, so
    /// the status list recomputed by the caller already shows the lesson
    /// completed. On `Fatal` the sequence lands on the progress view.
    pub async fn pump_playback(&mut self) -> Option<PlaybackEvent> {
        let event = self.playback.next_event().await?;

        match &event {
            PlaybackEvent::Ended => {
                if let Some(lesson_id) = self.playback.current_lesson() {
                    let duration = self
                        .loaded
                        .as_ref()
                        .and_then(|loaded| {
                            let position = loaded.course.position_of(lesson_id)?;
                            loaded.course.lesson_at(position)
                        })
                        .map(|lesson| lesson.duration_minutes)
                        .unwrap_or_default();

                    if let Some(loaded) = self.loaded.as_ref() {
                        loaded.tracker.mark_completed(lesson_id, duration).await;
                    }
                }
                self.playback.close();
                self.sequencer.apply(SequencerEvent::VideoEnded);
            }
            PlaybackEvent::Fatal { kind, detail } => {
                warn!(%kind, %detail, "lesson video unavailable");
                self.sequencer.apply(SequencerEvent::VideoFailed);
            }
            PlaybackEvent::LoadingStarted | PlaybackEvent::Ready => {}
        }

        Some(event)
    }

    /// Runs a reconcile pass when the configured interval has elapsed.
    /// Returns whether a pass ran.
    pub async fn reconcile_if_due(&mut self) -> bool {
        let due = match self.last_reconcile {
            Some(last) => (self.clock.now_utc() - last)
                .to_std()
                .map(|elapsed| elapsed >= self.config.viewer.reconcile_interval)
                .unwrap_or(true),
            None => true,
        };

        if !due {
            return false;
        }
        self.force_reconcile().await;
        true
    }

    /// Reconciles immediately; run when the viewer regains focus.
    pub async fn on_focus(&mut self) {
        self.force_reconcile().await;
    }

    async fn force_reconcile(&mut self) {
        let Some(loaded) = self.loaded.as_ref() else {
            return;
        };
        if let Err(error) = loaded.tracker.reconcile().await {
            warn!(%error, "completed-set reconcile failed");
        }
        self.last_reconcile = Some(self.clock.now_utc());
    }

    pub fn progress(&self) -> Option<ProgressSummary> {
        let loaded = self.loaded.as_ref()?;
        Some(loaded.tracker.summary(loaded.course.lesson_count()))
    }

    /// Tears down the playback session on viewer exit.
    pub fn teardown(&mut self) {
        self.playback.close();
    }
}
