//! Fire-and-forget analytics events
//!
//! Sinks never report errors to the caller and never retry. When no
//! measurement backend is configured, events go to [`NoopSink`]. Short-lived
//! processes call [`AnalyticsSink::flush`] before exiting so queued events
//! still go out.

mod config;
mod measurement;

pub use config::AnalyticsConfig;
pub use measurement::{AnalyticsError, MeasurementProtocolSink};

use serde::Serialize;
use std::time::Duration;

/// Action name sent after a successful conversion
pub const PDF_GENERATED_ACTION: &str = "pdf_generated";

/// Category used for conversion events
pub const CONVERSION_CATEGORY: &str = "conversion";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsEvent {
    pub action: String,
    pub category: String,
    pub label: Option<String>,
}

impl AnalyticsEvent {
    pub fn new(action: &str, category: &str, label: Option<&str>) -> Self {
        Self {
            action: action.to_string(),
            category: category.to_string(),
            label: label.map(str::to_string),
        }
    }

    /// Event emitted once per successful conversion
    pub fn pdf_generated(image_count: usize, file_name: &str) -> Self {
        let label = format!("{}_images_{}", image_count, file_name);
        Self::new(PDF_GENERATED_ACTION, CONVERSION_CATEGORY, Some(&label))
    }
}

/// Destination for analytics events
pub trait AnalyticsSink: Send + Sync {
    fn track_event(&self, event: &AnalyticsEvent);

    /// Wait up to `timeout` for events still being delivered. Returns false
    /// if some were still pending when the wait ended.
    fn flush(&self, _timeout: Duration) -> bool {
        true
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl AnalyticsSink for NoopSink {
    fn track_event(&self, _event: &AnalyticsEvent) {}
}

/// Writes events to the log at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl AnalyticsSink for LogSink {
    fn track_event(&self, event: &AnalyticsEvent) {
        log::info!(
            target: "analytics",
            "{} [{}] {}",
            event.action,
            event.category,
            event.label.as_deref().unwrap_or("-")
        );
    }
}

pub fn track_event(sink: &dyn AnalyticsSink, action: &str, category: &str, label: Option<&str>) {
    sink.track_event(&AnalyticsEvent::new(action, category, label));
}

pub fn track_pdf_conversion(sink: &dyn AnalyticsSink, image_count: usize, file_name: &str) {
    sink.track_event(&AnalyticsEvent::pdf_generated(image_count, file_name));
}
