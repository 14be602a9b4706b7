//! CLI command implementations

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use cadence_core::catalog::{
    CatalogClient, Course, CourseId, HttpCatalogClient, InMemoryCatalog, Lesson, LessonId,
    Purchase, PurchaseId, UserId,
};
use cadence_core::clock::{Clock, SystemClock};
use cadence_core::config::CadenceConfig;
use cadence_core::playback::{PlaybackError, PlaybackEvent, PlaybackTarget, SimulationEngineFactory};
use cadence_core::schedule::{available_lesson_index, days_since_start, lesson_status};
use cadence_core::viewer::{CourseViewer, EntryMode, LoadOutcome, SequencerEvent, ViewerStage};
use cadence_core::{CadenceError, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::Subcommand;
use serde::Deserialize;
use uuid::Uuid;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the drip schedule for a purchase start date
    Schedule {
        /// Purchase start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: NaiveDate,
        /// Date to evaluate instead of today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
        /// Number of lessons in the course
        #[arg(short, long, default_value = "7")]
        lessons: usize,
    },
    /// Show lesson statuses for a user's active purchase
    Status {
        /// Path to a catalog fixture (JSON with purchases and courses)
        #[arg(long, conflicts_with = "api")]
        fixture: Option<PathBuf>,
        /// Base URL of the platform API to query instead of a fixture
        #[arg(long)]
        api: Option<String>,
        /// User to resolve; defaults to the fixture's first purchase owner
        #[arg(long)]
        user: Option<Uuid>,
    },
    /// Run the full viewer flow headlessly against simulated streams
    Watch {
        /// Days since the demo purchase started
        #[arg(long, default_value = "0")]
        days_in: u32,
        /// Skip teaser and cover via the start-now shortcut
        #[arg(long)]
        quick_start: bool,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Schedule {
            start_date,
            today,
            lessons,
        } => show_schedule(start_date, today, lessons),
        Commands::Status { fixture, api, user } => show_status(fixture, api, user).await,
        Commands::Watch {
            days_in,
            quick_start,
        } => watch(days_in, quick_start).await,
    }
}

/// Print the drip schedule derived from a start date.
fn show_schedule(start_date: NaiveDate, today: Option<NaiveDate>, lessons: usize) -> Result<()> {
    let today = today.unwrap_or_else(|| SystemClock.today());
    let days = days_since_start(start_date, today);

    match available_lesson_index(start_date, today, lessons) {
        Some(index) => {
            println!("Day offset {days}: lesson {index} of {lessons} is unlockable today")
        }
        None if lessons == 0 => println!("Course has no lessons"),
        None => println!("Course starts in {} day(s)", -days),
    }

    let completed = HashSet::new();
    for position in 0..lessons {
        let status = lesson_status(position, days, LessonId::generate(), &completed);
        println!("  lesson {position}: {status}");
    }

    Ok(())
}

/// Catalog records loaded from a JSON fixture file.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFixture {
    purchases: Vec<Purchase>,
    courses: Vec<Course>,
}

/// Resolve a user's purchase and print the derived status list.
async fn show_status(
    fixture: Option<PathBuf>,
    api: Option<String>,
    user: Option<Uuid>,
) -> Result<()> {
    let mut config = CadenceConfig::from_env();
    let (catalog, user_id): (Arc<dyn CatalogClient>, UserId) = match (fixture, api) {
        (Some(path), _) => {
            let raw = std::fs::read_to_string(&path)?;
            let records: CatalogFixture =
                serde_json::from_str(&raw).map_err(|e| CadenceError::Configuration {
                    reason: format!("invalid fixture {}: {e}", path.display()),
                })?;

            let user_id = user
                .map(UserId::new)
                .or_else(|| records.purchases.first().map(|purchase| purchase.user_id))
                .ok_or_else(|| CadenceError::Configuration {
                    reason: "fixture contains no purchases and no --user was given".to_string(),
                })?;

            let catalog = InMemoryCatalog::new();
            for purchase in records.purchases {
                catalog.insert_purchase(purchase);
            }
            for course in records.courses {
                catalog.insert_course(course);
            }
            (Arc::new(catalog), user_id)
        }
        (None, Some(base_url)) => {
            let user_id = user.map(UserId::new).ok_or_else(|| {
                CadenceError::Configuration {
                    reason: "--user is required with --api".to_string(),
                }
            })?;
            config.api.base_url = base_url;
            let client = HttpCatalogClient::new(&config.api).map_err(CadenceError::Catalog)?;
            (Arc::new(client), user_id)
        }
        (None, None) => {
            return Err(CadenceError::Configuration {
                reason: "either --fixture or --api must be given".to_string(),
            });
        }
    };

    let mut viewer = CourseViewer::new(
        catalog,
        Arc::new(SystemClock),
        Arc::new(SimulationEngineFactory::new()),
        PlaybackTarget::native(),
        config,
        EntryMode::Standard,
    );

    match viewer.load(user_id).await? {
        LoadOutcome::NoActivePurchase => {
            println!("User {user_id} has no active purchase");
            return Ok(());
        }
        LoadOutcome::Ready { selected } => {
            print_status_list(&viewer, selected);
        }
    }

    Ok(())
}

fn print_status_list(viewer: &CourseViewer, selected: Option<usize>) {
    let Some(course) = viewer.course() else {
        return;
    };

    println!("{} ({} lessons)", course.title, course.lesson_count());
    for (position, (lesson, status)) in course
        .lessons
        .iter()
        .zip(viewer.status_list())
        .enumerate()
    {
        let marker = if selected == Some(position) { ">" } else { " " };
        println!(
            "{marker} {position:>2}  {status:<9}  {} ({} min)",
            lesson.title, lesson.duration_minutes
        );
    }

    if let Some(summary) = viewer.progress() {
        println!(
            "Progress: {}/{} lessons ({:.0}%)",
            summary.completed,
            summary.total,
            summary.percent()
        );
    }
}

/// Run the whole viewer sequence against an in-memory catalog and
/// simulated engines, printing every stage and playback event.
async fn watch(days_in: u32, quick_start: bool) -> Result<()> {
    tracing::info!(days_in, quick_start, "starting headless viewer run");

    let catalog = Arc::new(demo_catalog(days_in));
    let user_id = demo_user();
    let entry = if quick_start {
        EntryMode::QuickStart
    } else {
        EntryMode::Standard
    };

    let mut viewer = CourseViewer::new(
        catalog,
        Arc::new(SystemClock),
        Arc::new(SimulationEngineFactory::new()),
        PlaybackTarget::native(),
        CadenceConfig::from_env(),
        entry,
    );

    let selected = match viewer.load(user_id).await? {
        LoadOutcome::NoActivePurchase => {
            println!("No active purchase");
            return Ok(());
        }
        LoadOutcome::Ready { selected } => selected,
    };

    print_status_list(&viewer, selected);
    println!("stage: {}", viewer.stage());

    if viewer.stage() == ViewerStage::Teaser {
        println!("teaser finished");
        println!("stage: {}", viewer.advance(SequencerEvent::TeaserEnded).await);
        println!("cover confirmed");
        println!(
            "stage: {}",
            viewer.advance(SequencerEvent::CoverConfirmed).await
        );
    }

    let load_timeout = viewer.config().playback.load_timeout;
    loop {
        let event = match tokio::time::timeout(load_timeout, viewer.pump_playback()).await {
            Err(_) => {
                let expired = CadenceError::Playback(PlaybackError::LoadTimeout {
                    seconds: load_timeout.as_secs(),
                });
                println!("{}", expired.user_message());
                break;
            }
            Ok(None) => break,
            Ok(Some(event)) => event,
        };

        println!("playback: {event:?}");
        match event {
            PlaybackEvent::Ended | PlaybackEvent::Fatal { .. } => break,
            PlaybackEvent::LoadingStarted | PlaybackEvent::Ready => {}
        }
    }

    println!("stage: {}", viewer.stage());
    print_status_list(&viewer, viewer.available_index());
    viewer.teardown();

    Ok(())
}

fn demo_user() -> UserId {
    UserId::new(Uuid::from_u128(1))
}

/// Seven-day demo course with a purchase that started `days_in` days ago.
fn demo_catalog(days_in: u32) -> InMemoryCatalog {
    let catalog = InMemoryCatalog::new();
    let course_id = CourseId::new(Uuid::from_u128(2));

    catalog.insert_course(Course {
        id: course_id,
        title: "Mobility Reset".to_string(),
        lessons: (0..7u32)
            .map(|day| Lesson {
                id: LessonId::new(Uuid::from_u128(100 + u128::from(day))),
                title: format!("Day {} session", day + 1),
                description: String::new(),
                duration_minutes: 15 + day * 5,
                video_reference: Some(format!("demo-day-{day}")),
                preview_image: None,
                lesson_order: day,
            })
            .collect(),
    });

    catalog.insert_purchase(Purchase {
        id: PurchaseId::new(Uuid::from_u128(3)),
        user_id: demo_user(),
        course_id,
        start_date: Some(Utc::now() - Duration::days(i64::from(days_in))),
        created_at: Utc::now() - Duration::days(i64::from(days_in)),
        completed_lesson_ids: Vec::new(),
        is_active: true,
    });

    catalog
}
