//! Places lookups for WHATSAT.
//!
//! The adapter turns a stored record into a nearby-search around the
//! record's coordinates, waits at most the configured timeout, and keeps the
//! first `bound` results in the order the service returned them. The rest of
//! the service's answer is passed through with its keys in their original
//! order.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::PlacesConfig;
use crate::error::PlacesError;
use crate::registry::LocationRecord;

/// Meters per WHATSAT radius unit (kilometers).
pub const METERS_PER_RADIUS_UNIT: u32 = 1000;

/// A nearby-search answer: a JSON object with a `results` array, plus
/// whatever else the service sent alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacesReply {
    body: Map<String, Value>,
}

impl PlacesReply {
    /// A reply holding only `results`.
    pub fn from_results(results: Vec<Value>) -> Self {
        let mut body = Map::new();
        body.insert("results".to_string(), Value::Array(results));
        Self { body }
    }

    /// Parse a service response body.
    pub fn from_json(body: &str) -> Result<Self, PlacesError> {
        let body: Map<String, Value> = serde_json::from_str(body)?;
        if !body.get("results").is_some_and(Value::is_array) {
            return Err(PlacesError::Malformed("missing `results` array".into()));
        }
        Ok(Self { body })
    }

    /// The places, in service order.
    pub fn results(&self) -> &[Value] {
        match self.body.get("results") {
            Some(Value::Array(results)) => results,
            _ => &[],
        }
    }

    /// Keep only the first `bound` results.
    pub fn truncate(&mut self, bound: usize) {
        if let Some(Value::Array(results)) = self.body.get_mut("results") {
            results.truncate(bound);
        }
    }

    /// Indented JSON, keys in the order the service sent them.
    pub fn to_pretty_json(&self) -> Result<String, PlacesError> {
        Ok(serde_json::to_string_pretty(&self.body)?)
    }
}

/// An external nearby-search service.
#[async_trait]
pub trait PlacesClient: Send + Sync {
    /// Places within `radius_m` meters of (`latitude`, `longitude`).
    async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
    ) -> Result<PlacesReply, PlacesError>;
}

/// Google Places nearby-search over HTTPS.
pub struct GooglePlaces {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GooglePlaces {
    /// Create a client for the configured endpoint.
    pub fn new(config: &PlacesConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl PlacesClient for GooglePlaces {
    async fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: u32,
    ) -> Result<PlacesReply, PlacesError> {
        let location = format!("{latitude},{longitude}");
        let radius = radius_m.to_string();
        info!(
            "Places query: {}?location={}&radius={}",
            self.endpoint, location, radius
        );

        let body = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("location", location.as_str()),
                ("radius", radius.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        PlacesReply::from_json(&body)
    }
}

/// A WHATSAT answer ready to be written to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacesAnswer {
    /// The stored AT line for the client
    pub at_line: String,
    /// At most `bound` places
    pub reply: PlacesReply,
}

impl PlacesAnswer {
    /// `<AT line>\n<pretty JSON>\n\n`
    pub fn to_response(&self) -> Result<String, PlacesError> {
        let json = self.reply.to_pretty_json()?;
        Ok(format!("{}\n{}\n\n", self.at_line, json))
    }
}

/// Bounded-wait adapter in front of a [`PlacesClient`].
#[derive(Clone)]
pub struct PlacesAdapter {
    client: Arc<dyn PlacesClient>,
    timeout: Duration,
}

impl PlacesAdapter {
    /// Wrap `client`, giving each query at most `timeout`.
    pub fn new(client: Arc<dyn PlacesClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Places near `record`, `radius` in kilometers, at most `bound` results.
    pub async fn query(
        &self,
        record: &LocationRecord,
        radius: u32,
        bound: usize,
    ) -> Result<PlacesAnswer, PlacesError> {
        let radius_m = radius.saturating_mul(METERS_PER_RADIUS_UNIT);
        let lookup = self
            .client
            .nearby(record.latitude, record.longitude, radius_m);

        let mut reply = tokio::time::timeout(self.timeout, lookup)
            .await
            .map_err(|_| PlacesError::Timeout(self.timeout))??;

        debug!(
            "Places returned {} results for {}, keeping {}",
            reply.results().len(),
            record.client_id,
            bound
        );
        reply.truncate(bound);

        Ok(PlacesAnswer {
            at_line: record.formatted_line.clone(),
            reply,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedPlaces {
        count: usize,
        delay: Duration,
        seen: Mutex<Vec<(f64, f64, u32)>>,
    }

    impl FixedPlaces {
        fn new(count: usize, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                count,
                delay,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl PlacesClient for FixedPlaces {
        async fn nearby(&self, lat: f64, lon: f64, radius_m: u32) -> Result<PlacesReply, PlacesError> {
            self.seen.lock().unwrap().push((lat, lon, radius_m));
            tokio::time::sleep(self.delay).await;
            let results = (0..self.count)
                .map(|i| serde_json::json!({ "name": format!("place-{i}") }))
                .collect();
            Ok(PlacesReply::from_results(results))
        }
    }

    fn record() -> LocationRecord {
        LocationRecord {
            client_id: "kiwi.cs.ucla.edu".into(),
            latitude: 34.068930,
            longitude: -118.445127,
            observed_time: 1491161100.0,
            formatted_line: "AT Alford +0.263873 kiwi.cs.ucla.edu +34.068930-118.445127 1491161100.0".into(),
        }
    }

    #[tokio::test]
    async fn truncates_to_bound_in_service_order() {
        let places = FixedPlaces::new(12, Duration::ZERO);
        let adapter = PlacesAdapter::new(places.clone(), Duration::from_secs(1));

        let answer = adapter.query(&record(), 10, 3).await.unwrap();
        assert_eq!(answer.reply.results().len(), 3);
        assert_eq!(answer.reply.results()[0]["name"], "place-0");
        assert_eq!(answer.reply.results()[2]["name"], "place-2");
        assert_eq!(answer.at_line, record().formatted_line);

        let seen = places.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(34.068930, -118.445127, 10_000)]);
    }

    #[tokio::test]
    async fn short_result_list_is_kept_whole() {
        let adapter = PlacesAdapter::new(FixedPlaces::new(2, Duration::ZERO), Duration::from_secs(1));
        let answer = adapter.query(&record(), 5, 20).await.unwrap();
        assert_eq!(answer.reply.results().len(), 2);
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let adapter = PlacesAdapter::new(
            FixedPlaces::new(1, Duration::from_millis(500)),
            Duration::from_millis(20),
        );
        let err = adapter.query(&record(), 5, 5).await.unwrap_err();
        assert!(matches!(err, PlacesError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[test]
    fn reply_keeps_extra_fields() {
        let mut reply = PlacesReply::from_json(
            r#"{ "html_attributions": [], "results": [{"name": "a"}, {"name": "b"}], "status": "OK" }"#,
        )
        .unwrap();
        reply.truncate(1);
        assert_eq!(reply.results().len(), 1);

        let answer = PlacesAnswer {
            at_line: "AT x".into(),
            reply,
        };
        let text = answer.to_response().unwrap();
        assert!(text.starts_with("AT x\n{"));
        assert!(text.ends_with("}\n\n"));
        assert!(text.contains("\"status\": \"OK\""));
    }

    #[test]
    fn reply_keeps_service_key_order() {
        let reply = PlacesReply::from_json(
            r#"{ "next_page_token": "t", "html_attributions": [], "results": [], "status": "OK" }"#,
        )
        .unwrap();
        let text = reply.to_pretty_json().unwrap();
        let at = |key: &str| text.find(key).unwrap();
        assert!(at("next_page_token") < at("html_attributions"));
        assert!(at("html_attributions") < at("results"));
        assert!(at("results") < at("status"));
    }

    #[test]
    fn reply_without_results_is_malformed() {
        assert!(matches!(
            PlacesReply::from_json(r#"{ "status": "REQUEST_DENIED" }"#),
            Err(PlacesError::Malformed(_))
        ));
        assert!(matches!(PlacesReply::from_json("<html>"), Err(PlacesError::Malformed(_))));
        assert!(matches!(
            PlacesReply::from_json(r#"{ "results": {} }"#),
            Err(PlacesError::Malformed(_))
        ));
    }
}
