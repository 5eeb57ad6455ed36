//! Custom tracing Layer for capturing depot events.
//!
//! This layer intercepts tracing events whose target starts with `depot`,
//! converts those carrying a known `event_type` field into [`DepotEvent`]
//! values and forwards them over a channel.

use crate::event::{
    DepotEvent, EventCategory, PublishEvent, ResolutionEvent, VerificationEvent,
};
use std::sync::mpsc::Sender;
use tracing::Subscriber;
use tracing::field::{Field, Visit};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// A tracing Layer that captures depot-specific events.
pub struct DepotEventLayer {
    sender: Sender<DepotEvent>,
}

impl DepotEventLayer {
    /// Create a new layer that sends events to the given channel.
    #[must_use]
    pub const fn new(sender: Sender<DepotEvent>) -> Self {
        Self { sender }
    }
}

impl<S> Layer<S> for DepotEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let target = event.metadata().target();
        if !target.starts_with("depot") {
            return;
        }

        let mut visitor = DepotEventVisitor::default();
        event.record(&mut visitor);

        if let Some(category) = visitor.build() {
            // A dropped receiver only means nobody is listening any more.
            let _ = self.sender.send(DepotEvent::new(target, category));
        }
    }
}

#[derive(Default)]
struct DepotEventVisitor {
    event_type: Option<String>,
    configuration: Option<String>,
    selector: Option<String>,
    error: Option<String>,
    artifact: Option<String>,
    module: Option<String>,
    repository: Option<String>,
    resource: Option<String>,
    subject: Option<String>,
    nodes: Option<u64>,
    failures: Option<u64>,
    count: Option<u64>,
}

impl DepotEventVisitor {
    fn build(self) -> Option<EventCategory> {
        let category = match self.event_type.as_deref()? {
            "resolution.started" => EventCategory::Resolution(ResolutionEvent::Started {
                configuration: self.configuration?,
            }),
            "resolution.failure" => EventCategory::Resolution(ResolutionEvent::Failure {
                configuration: self.configuration?,
                selector: self.selector?,
                error: self.error.unwrap_or_default(),
            }),
            "artifact.resolved" => EventCategory::Resolution(ResolutionEvent::ArtifactResolved {
                artifact: self.artifact?,
            }),
            "resolution.completed" => EventCategory::Resolution(ResolutionEvent::Completed {
                configuration: self.configuration?,
                nodes: self.nodes.unwrap_or(0),
                failures: self.failures.unwrap_or(0),
            }),
            "publish.started" => EventCategory::Publish(PublishEvent::Started {
                module: self.module?,
                repository: self.repository?,
            }),
            "publish.uploaded" => EventCategory::Publish(PublishEvent::Uploaded {
                resource: self.resource?,
            }),
            "publish.completed" => EventCategory::Publish(PublishEvent::Completed {
                module: self.module?,
                repository: self.repository?,
            }),
            "verification.failed" => EventCategory::Verification(VerificationEvent::Failed {
                subject: self.subject?,
                count: self.count.unwrap_or(0),
            }),
            _ => return None,
        };
        Some(category)
    }

    fn record_text(&mut self, name: &str, value: String) {
        match name {
            "event_type" => self.event_type = Some(value),
            "configuration" => self.configuration = Some(value),
            "selector" => self.selector = Some(value),
            "error" => self.error = Some(value),
            "artifact" => self.artifact = Some(value),
            "module" => self.module = Some(value),
            "repository" => self.repository = Some(value),
            "resource" => self.resource = Some(value),
            "subject" => self.subject = Some(value),
            _ => {}
        }
    }

    fn record_count(&mut self, name: &str, value: u64) {
        match name {
            "nodes" => self.nodes = Some(value),
            "failures" => self.failures = Some(value),
            "count" => self.count = Some(value),
            _ => {}
        }
    }
}

impl Visit for DepotEventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.record_text(field.name(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_count(field.name(), value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if let Ok(value) = u64::try_from(value) {
            self.record_count(field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // `%value` fields arrive here already rendered through Display.
        self.record_text(field.name(), format!("{value:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_layer_captures_resolution_events() {
        let (tx, rx) = mpsc::channel();
        let subscriber = tracing_subscriber::registry().with(DepotEventLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            crate::emit_resolution_started!(":app:runtime");
        });

        let event = rx.try_recv().unwrap();
        assert_eq!(event.target, "depot::resolve");
        assert_eq!(
            event.category,
            EventCategory::Resolution(ResolutionEvent::Started {
                configuration: ":app:runtime".to_string()
            })
        );
    }

    #[test]
    fn test_layer_ignores_foreign_targets() {
        let (tx, rx) = mpsc::channel();
        let subscriber = tracing_subscriber::registry().with(DepotEventLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(
                target: "other::target",
                event_type = "resolution.started",
                configuration = ":ignored",
            );
        });

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_layer_captures_counts() {
        let (tx, rx) = mpsc::channel();
        let subscriber = tracing_subscriber::registry().with(DepotEventLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            crate::emit_resolution_completed!(":compile", 4_u64, 1_u64);
            crate::emit_verification_failed!("configuration ':compile'", 2_u64);
        });

        let completed = rx.try_recv().unwrap();
        assert_eq!(
            completed.category,
            EventCategory::Resolution(ResolutionEvent::Completed {
                configuration: ":compile".to_string(),
                nodes: 4,
                failures: 1,
            })
        );
        let failed = rx.try_recv().unwrap();
        assert_eq!(
            failed.category,
            EventCategory::Verification(VerificationEvent::Failed {
                subject: "configuration ':compile'".to_string(),
                count: 2,
            })
        );
    }

    #[test]
    fn test_layer_drops_events_missing_required_fields() {
        let (tx, rx) = mpsc::channel();
        let subscriber = tracing_subscriber::registry().with(DepotEventLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: "depot::publish", event_type = "publish.started");
        });

        assert!(rx.try_recv().is_err());
    }
}
