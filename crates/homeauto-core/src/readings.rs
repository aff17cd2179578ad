//! Reading store backed by a document search API.
//!
//! The store issues a single match-all query sorted by timestamp, newest first,
//! and maps each hit's `_source.id` / `_source.temp` to a [`RawReading`]. The
//! search backend itself (indexing, query engine) is out of scope; only its
//! `_search` endpoint is used.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use homeauto_types::{ProbeId, RawReading};

use crate::error::{Error, Result};
use crate::traits::ReadingStore;

/// Default search endpoint.
pub const DEFAULT_SEARCH_URL: &str = "http://elasticsearch-master:9200/logstash-*/_search";

/// Default field used to order documents.
pub const DEFAULT_TIMESTAMP_FIELD: &str = "@timestamp";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Source,
}

/// Other documents share the index, so neither field is trusted to exist or
/// to have the expected type.
#[derive(Debug, Default, Deserialize)]
struct Source {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    temp: Value,
}

impl Source {
    fn into_reading(self) -> Option<RawReading> {
        let id = ProbeId::new(self.id.as_str()?).ok()?;
        Some(RawReading::new(id, self.temp.as_f64()?))
    }
}

/// [`ReadingStore`] querying an Elasticsearch-compatible `_search` endpoint.
#[derive(Debug, Clone)]
pub struct SearchReadingStore {
    client: Client,
    url: String,
    timestamp_field: String,
}

impl SearchReadingStore {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
        })
    }

    /// Sort on a different timestamp field.
    pub fn timestamp_field(mut self, field: impl Into<String>) -> Self {
        self.timestamp_field = field.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query body for the `limit` newest documents across all probes.
    pub fn query_body(&self, limit: usize) -> Value {
        json!({
            "query": { "match_all": {} },
            "size": limit,
            "sort": [
                { self.timestamp_field.as_str(): { "order": "desc" } }
            ]
        })
    }
}

/// Decode a `_search` response body into newest-first readings.
///
/// Hits without a non-empty `id` or without a numeric `temp` are not probe
/// readings and are skipped. Only a body that is not shaped like
/// `hits.hits[]` is a [`Error::Decode`].
fn decode_readings(body: &[u8]) -> Result<Vec<RawReading>> {
    let response: SearchResponse = serde_json::from_slice(body).map_err(Error::Decode)?;
    let total = response.hits.hits.len();
    let readings: Vec<RawReading> = response
        .hits
        .hits
        .into_iter()
        .filter_map(|hit| hit.source.into_reading())
        .collect();

    if readings.len() < total {
        debug!("Skipped {} hit(s) that are not probe readings", total - readings.len());
    }
    Ok(readings)
}

#[async_trait]
impl ReadingStore for SearchReadingStore {
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<RawReading>> {
        let response = self
            .client
            .post(&self.url)
            .json(&self.query_body(limit))
            .send()
            .await
            .map_err(|e| Error::Query(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Query(format!(
                "{} returned status {}",
                self.url, status
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Query(format!("failed to read response body: {}", e)))?;

        let readings = decode_readings(&body)?;
        debug!("Fetched {} reading(s) from {}", readings.len(), self.url);
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, http::StatusCode, routing::post};
    use homeauto_types::{ProbeSlot, ProbeSlotMap};

    use super::*;
    use crate::test_support::serve;

    fn search_response() -> Value {
        json!({
            "took": 3,
            "timed_out": false,
            "hits": {
                "total": { "value": 812, "relation": "eq" },
                "hits": [
                    {
                        "_index": "logstash-2024.06.01",
                        "_source": { "id": "A", "temp": 12.0, "@timestamp": "2024-06-01T12:00:03Z" }
                    },
                    {
                        "_index": "logstash-2024.06.01",
                        "_source": { "id": "B", "temp": 5.0, "@timestamp": "2024-06-01T12:00:02Z" }
                    },
                    {
                        "_index": "logstash-2024.06.01",
                        "_source": { "id": "A", "temp": 11.5, "@timestamp": "2024-06-01T12:00:01Z" }
                    }
                ]
            }
        })
    }

    #[test]
    fn test_query_body_shape() {
        let store = SearchReadingStore::new(DEFAULT_SEARCH_URL, Duration::from_secs(5)).unwrap();

        let body = store.query_body(10);

        assert_eq!(body["size"], 10);
        assert!(body["query"]["match_all"].as_object().unwrap().is_empty());
        assert_eq!(body["sort"][0]["@timestamp"]["order"], "desc");
    }

    #[test]
    fn test_query_body_custom_timestamp_field() {
        let store = SearchReadingStore::new(DEFAULT_SEARCH_URL, Duration::from_secs(5))
            .unwrap()
            .timestamp_field("received_at");

        assert_eq!(store.query_body(3)["sort"][0]["received_at"]["order"], "desc");
    }

    #[test]
    fn test_decode_keeps_order() {
        let body = serde_json::to_vec(&search_response()).unwrap();

        let readings = decode_readings(&body).unwrap();

        let ids: Vec<&str> = readings.iter().map(|r| r.probe_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "A"]);
        assert_eq!(readings[2].temperature, 11.5);
    }

    #[test]
    fn test_decode_rejects_unexpected_shape() {
        let not_found = br#"{"error": "index_not_found"}"#;
        assert!(matches!(decode_readings(not_found), Err(Error::Decode(_))));
        assert!(matches!(decode_readings(b"not json"), Err(Error::Decode(_))));
        let hits_not_list = br#"{"hits": {"hits": {"_source": {"id": "A"}}}}"#;
        assert!(matches!(decode_readings(hits_not_list), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_skips_unrelated_documents() {
        let body = serde_json::to_vec(&json!({
            "hits": {
                "hits": [
                    { "_source": { "id": "A", "temp": 12.0 } },
                    { "_source": { "id": "H1", "humidity": 61 } },
                    { "_source": { "id": "", "temp": 1.0 } },
                    { "_source": { "id": "A", "temp": "n/a" } },
                    { "_source": { "id": 7, "temp": 3.0 } },
                    { "_source": { "message": "GET /api/environment 200" } },
                    { "_index": "logstash-2024.06.01" },
                    { "_source": { "id": "B", "temp": 5.0 } },
                    { "_source": { "id": "C", "temp": 9.0 } }
                ]
            }
        }))
        .unwrap();

        let readings = decode_readings(&body).unwrap();

        let ids: Vec<&str> = readings.iter().map(|r| r.probe_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        let slots: ProbeSlotMap = [("A", "pool"), ("B", "shade"), ("C", "sun")]
            .into_iter()
            .map(|(id, slot)| (ProbeId::new(id).unwrap(), ProbeSlot::new(slot).unwrap()))
            .collect();
        let env = slots.resolve(&readings).unwrap();
        assert_eq!(env.temperature("pool"), Some(12.0));
        assert_eq!(env.temperature("shade"), Some(5.0));
        assert_eq!(env.temperature("sun"), Some(9.0));
    }

    #[tokio::test]
    async fn test_fetch_latest_posts_query() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let captured = Arc::clone(&seen);
        let router = Router::new().route(
            "/logstash/_search",
            post(move |Json(query): Json<Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    *captured.lock().unwrap() = Some(query);
                    Json(search_response())
                }
            }),
        );
        let base = serve(router).await;
        let store =
            SearchReadingStore::new(format!("{}/logstash/_search", base), Duration::from_secs(5))
                .unwrap();

        let readings = store.fetch_latest(10).await.unwrap();

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0], RawReading::new(ProbeId::new("A").unwrap(), 12.0));
        let query = seen.lock().unwrap().clone().unwrap();
        assert_eq!(query, store.query_body(10));
    }

    #[tokio::test]
    async fn test_fetch_latest_non_success_status() {
        let router = Router::new().route(
            "/_search",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "shard failure") }),
        );
        let base = serve(router).await;
        let store =
            SearchReadingStore::new(format!("{}/_search", base), Duration::from_secs(5)).unwrap();

        let err = store.fetch_latest(10).await.unwrap_err();

        assert!(matches!(err, Error::Query(ref msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn test_fetch_latest_unreachable() {
        let store =
            SearchReadingStore::new("http://127.0.0.1:9/_search", Duration::from_secs(5)).unwrap();

        assert!(matches!(store.fetch_latest(10).await, Err(Error::Query(_))));
    }
}
