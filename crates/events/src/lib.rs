//! Structured event system for depot.
//!
//! Resolution, publication and verification code never prints. It emits
//! `tracing` events through the `emit_*!` macros below, each carrying a
//! `depot::<area>` target and an `event_type` field. Any subscriber can render
//! them; [`DepotEventLayer`] turns them back into typed [`DepotEvent`] values
//! for consumers that want a structured stream.
//!
//! # Usage
//!
//! ```rust,ignore
//! use depot_events::{DepotEventLayer, emit_resolution_started};
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//!
//! let (tx, rx) = std::sync::mpsc::channel();
//! tracing_subscriber::registry()
//!     .with(DepotEventLayer::new(tx))
//!     .init();
//!
//! emit_resolution_started!(":app:runtimeClasspath");
//! ```

pub mod event;
pub mod layer;

pub use event::{
    DepotEvent, EventCategory, PublishEvent, ResolutionEvent, VerificationEvent,
};
pub use layer::DepotEventLayer;

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` when the variable is unset or invalid.
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

// ============================================================================
// Emit Macros
// ============================================================================

/// Emit a resolution started event.
#[macro_export]
macro_rules! emit_resolution_started {
    ($configuration:expr) => {
        ::tracing::info!(
            target: "depot::resolve",
            event_type = "resolution.started",
            configuration = %$configuration,
        )
    };
}

/// Emit an unresolved dependency event.
///
/// # Example
/// ```rust,ignore
/// emit_resolution_failure!(":compile", "org:foo:1.0", "module not found");
/// ```
#[macro_export]
macro_rules! emit_resolution_failure {
    ($configuration:expr, $selector:expr, $error:expr) => {
        ::tracing::warn!(
            target: "depot::resolve",
            event_type = "resolution.failure",
            configuration = %$configuration,
            selector = %$selector,
            error = %$error,
        )
    };
}

/// Emit an artifact materialized event.
#[macro_export]
macro_rules! emit_artifact_resolved {
    ($artifact:expr) => {
        ::tracing::debug!(
            target: "depot::resolve",
            event_type = "artifact.resolved",
            artifact = %$artifact,
        )
    };
}

/// Emit a resolution completed event.
#[macro_export]
macro_rules! emit_resolution_completed {
    ($configuration:expr, $nodes:expr, $failures:expr) => {
        ::tracing::info!(
            target: "depot::resolve",
            event_type = "resolution.completed",
            configuration = %$configuration,
            nodes = $nodes,
            failures = $failures,
        )
    };
}

/// Emit a publish started event.
#[macro_export]
macro_rules! emit_publish_started {
    ($module:expr, $repository:expr) => {
        ::tracing::info!(
            target: "depot::publish",
            event_type = "publish.started",
            module = %$module,
            repository = %$repository,
        )
    };
}

/// Emit a resource uploaded event.
#[macro_export]
macro_rules! emit_publish_uploaded {
    ($resource:expr) => {
        ::tracing::debug!(
            target: "depot::publish",
            event_type = "publish.uploaded",
            resource = %$resource,
        )
    };
}

/// Emit a publish completed event.
#[macro_export]
macro_rules! emit_publish_completed {
    ($module:expr, $repository:expr) => {
        ::tracing::info!(
            target: "depot::publish",
            event_type = "publish.completed",
            module = %$module,
            repository = %$repository,
        )
    };
}

/// Emit a verification failed event.
#[macro_export]
macro_rules! emit_verification_failed {
    ($subject:expr, $count:expr) => {
        ::tracing::warn!(
            target: "depot::verification",
            event_type = "verification.failed",
            subject = %$subject,
            count = $count,
        )
    };
}
