use crate::{AnalyticsSink, MeasurementProtocolSink, NoopSink};
use rand::Rng;

/// GA4 Measurement Protocol collection endpoint
pub const DEFAULT_ENDPOINT: &str = "https://www.google-analytics.com/mp/collect";

pub const MEASUREMENT_ID_VAR: &str = "GA_MEASUREMENT_ID";
pub const API_SECRET_VAR: &str = "GA_API_SECRET";

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsConfig {
    pub measurement_id: Option<String>,
    pub api_secret: Option<String>,
    pub client_id: String,
    pub endpoint: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            measurement_id: None,
            api_secret: None,
            client_id: generate_client_id(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
        }
    }
}

impl AnalyticsConfig {
    /// Read `GA_MEASUREMENT_ID` and `GA_API_SECRET` from the environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            measurement_id: read(MEASUREMENT_ID_VAR),
            api_secret: read(API_SECRET_VAR),
            ..Default::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.measurement_id.is_some() && self.api_secret.is_some()
    }

    /// The Measurement Protocol sink when configured, otherwise a no-op
    pub fn into_sink(self) -> Box<dyn AnalyticsSink> {
        match (self.measurement_id, self.api_secret) {
            (Some(measurement_id), Some(api_secret)) => Box::new(MeasurementProtocolSink::new(
                self.endpoint,
                measurement_id,
                api_secret,
                self.client_id,
            )),
            _ => {
                log::debug!("Analytics not configured, events are discarded");
                Box::new(NoopSink)
            }
        }
    }
}

/// Pseudo-anonymous client id in the `<random>.<timestamp>` form gtag uses
fn generate_client_id() -> String {
    let random: u32 = rand::thread_rng().r#gen();
    format!("{}.{}", random, chrono::Utc::now().timestamp())
}
