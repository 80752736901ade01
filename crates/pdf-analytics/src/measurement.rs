use crate::{AnalyticsEvent, AnalyticsSink};
use serde_json::{Value, json};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("HTTP error: {0}")]
    Http(#[from] Box<ureq::Error>),
    #[error("Failed to spawn sender thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Clone)]
struct Collector {
    agent: ureq::Agent,
    endpoint: String,
    measurement_id: String,
    api_secret: String,
}

impl Collector {
    fn post(&self, payload: Value) -> Result<(), AnalyticsError> {
        self.agent
            .post(&self.endpoint)
            .query("measurement_id", &self.measurement_id)
            .query("api_secret", &self.api_secret)
            .send_json(payload)
            .map_err(Box::new)?;
        Ok(())
    }
}

/// Count of requests still running on sender threads
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    done: Condvar,
}

impl InFlight {
    fn start(&self) {
        if let Ok(mut count) = self.count.lock() {
            *count += 1;
        }
    }

    fn finish(&self) {
        if let Ok(mut count) = self.count.lock() {
            *count = count.saturating_sub(1);
        }
        self.done.notify_all();
    }

    fn pending(&self) -> usize {
        self.count.lock().map(|count| *count).unwrap_or(0)
    }

    /// Block until nothing is in flight or `timeout` passes
    fn wait(&self, timeout: Duration) -> bool {
        let Ok(count) = self.count.lock() else {
            return false;
        };
        match self.done.wait_timeout_while(count, timeout, |count| *count > 0) {
            Ok((count, _)) => *count == 0,
            Err(_) => false,
        }
    }
}

/// Sends events to a GA4 Measurement Protocol endpoint
pub struct MeasurementProtocolSink {
    collector: Collector,
    client_id: String,
    in_flight: Arc<InFlight>,
}

impl MeasurementProtocolSink {
    pub fn new(
        endpoint: String,
        measurement_id: String,
        api_secret: String,
        client_id: String,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            collector: Collector {
                agent,
                endpoint,
                measurement_id,
                api_secret,
            },
            client_id,
            in_flight: Arc::default(),
        }
    }

    /// JSON body for one event
    pub fn payload(&self, event: &AnalyticsEvent) -> Value {
        let mut params = json!({ "event_category": event.category });
        if let Some(label) = &event.label {
            params["event_label"] = json!(label);
        }
        json!({
            "client_id": self.client_id,
            "events": [{ "name": event.action, "params": params }],
        })
    }

    /// Post one event and wait for the response
    pub fn send(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.collector.post(self.payload(event))
    }

    /// Requests started by [`AnalyticsSink::track_event`] that have not finished
    pub fn pending(&self) -> usize {
        self.in_flight.pending()
    }

    fn send_in_background(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        let collector = self.collector.clone();
        let payload = self.payload(event);
        let action = event.action.clone();
        let in_flight = Arc::clone(&self.in_flight);

        self.in_flight.start();
        let spawned = std::thread::Builder::new()
            .name("analytics".to_string())
            .spawn(move || {
                match collector.post(payload) {
                    Ok(()) => log::debug!("Sent analytics event {}", action),
                    Err(e) => log::debug!("Dropped analytics event {}: {}", action, e),
                }
                in_flight.finish();
            });
        if let Err(e) = spawned {
            self.in_flight.finish();
            return Err(e.into());
        }
        Ok(())
    }
}

impl AnalyticsSink for MeasurementProtocolSink {
    fn track_event(&self, event: &AnalyticsEvent) {
        if let Err(e) = self.send_in_background(event) {
            log::debug!("Dropped analytics event {}: {}", event.action, e);
        }
    }

    fn flush(&self, timeout: Duration) -> bool {
        let delivered = self.in_flight.wait(timeout);
        if !delivered {
            log::debug!("Gave up waiting for {} analytics request(s)", self.pending());
        }
        delivered
    }
}
