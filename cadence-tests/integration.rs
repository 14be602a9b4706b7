//! Integration tests for Cadence
//!
//! These tests verify the interaction between the drip scheduler, the
//! completion tracker, the playback session manager and the viewer
//! orchestration, driving the system the way the student-facing shell
//! does: load records, walk the stage sequence, pump playback events and
//! watch the derived statuses move.

#[path = "integration/support.rs"]
mod support;

#[path = "integration/drip_schedule.rs"]
mod drip_schedule;

#[path = "integration/playback_recovery.rs"]
mod playback_recovery;

#[path = "integration/viewer_flow.rs"]
mod viewer_flow;

#[path = "integration/wire_fixture.rs"]
mod wire_fixture;
