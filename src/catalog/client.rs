//! Remote event catalog access, one request per day

use super::error::CatalogError;
use super::geojson::FeatureCollection;
use crate::cache::CacheStore;
use crate::config::CatalogConfig;
use crate::core::types::{Magnitude, day_window};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const USER_AGENT: &str = concat!("faultline/", env!("CARGO_PKG_VERSION"));

/// Source of raw daily catalog bodies.
///
/// Implementations return the body exactly as received; a "no content" answer is
/// returned as an empty FeatureCollection.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch_day(&self, day: NaiveDate, magnitude: Magnitude) -> Result<Vec<u8>, CatalogError>;
}

/// FDSN event web service over HTTP
pub struct UsgsCatalogSource {
    client: Client,
    base_url: Url,
    timeout: Duration,
    event_type: String,
    order_by: String,
}

impl UsgsCatalogSource {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let base_url = Url::parse(&config.url).map_err(|e| CatalogError::InvalidUrl(format!("{}: {}", config.url, e)))?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CatalogError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout: config.timeout(),
            event_type: config.event_type.clone(),
            order_by: config.order_by.clone(),
        })
    }

    /// Query URL covering `[day 00:00, day+1 00:00)`
    pub fn query_url(&self, day: NaiveDate, magnitude: Magnitude) -> Url {
        let (start, end) = day_window(day);
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "geojson")
            .append_pair("starttime", &start.format(QUERY_TIME_FORMAT).to_string())
            .append_pair("endtime", &end.format(QUERY_TIME_FORMAT).to_string())
            .append_pair("minmagnitude", &magnitude.to_string())
            .append_pair("eventtype", &self.event_type)
            .append_pair("orderby", &self.order_by);
        url
    }

    fn classify(&self, err: reqwest::Error) -> CatalogError {
        if err.is_timeout() {
            CatalogError::Timeout(self.timeout)
        } else if err.is_decode() {
            CatalogError::Malformed(err.to_string())
        } else {
            CatalogError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl CatalogSource for UsgsCatalogSource {
    async fn fetch_day(&self, day: NaiveDate, magnitude: Magnitude) -> Result<Vec<u8>, CatalogError> {
        let url = self.query_url(day, magnitude);
        trace!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return FeatureCollection::empty().to_vec().map_err(|e| CatalogError::Malformed(e.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = body.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim().to_string();
            return Err(CatalogError::Status { status: status.as_u16(), message });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        Ok(bytes.to_vec())
    }
}

/// What a successful fetch left in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchedDay {
    pub feature_count: usize,
    pub bytes: usize,
}

/// Fetches one day from a [`CatalogSource`], validates it, and persists it.
///
/// Never retries; a failed day is left absent from the cache.
pub struct CatalogClient {
    source: Arc<dyn CatalogSource>,
    store: Arc<dyn CacheStore>,
    request_delay: Duration,
}

impl CatalogClient {
    pub fn new(source: Arc<dyn CatalogSource>, store: Arc<dyn CacheStore>, request_delay: Duration) -> Self {
        Self { source, store, request_delay }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Pause the caller observes before each request
    pub fn request_delay(&self) -> Duration {
        self.request_delay
    }

    /// Request, validate and persist one day. The pre-request delay is the caller's.
    pub async fn fetch_day(&self, day: NaiveDate, magnitude: Magnitude) -> Result<FetchedDay, CatalogError> {
        let body = self.source.fetch_day(day, magnitude).await?;
        let collection = FeatureCollection::parse(&body).map_err(|e| CatalogError::Malformed(e.to_string()))?;
        let feature_count = collection.len();

        self.store.write(day, magnitude, &body).await?;
        debug!("Persisted {} features ({} bytes) for {}", feature_count, body.len(), day);

        Ok(FetchedDay { feature_count, bytes: body.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DiskCacheStore;
    use crate::core::types::parse_day;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct StaticSource {
        body: Result<&'static str, u16>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CatalogSource for StaticSource {
        async fn fetch_day(&self, _day: NaiveDate, _magnitude: Magnitude) -> Result<Vec<u8>, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.body {
                Ok(body) => Ok(body.as_bytes().to_vec()),
                Err(status) => Err(CatalogError::Status { status, message: "unavailable".to_string() }),
            }
        }
    }

    fn client(body: Result<&'static str, u16>, dir: &TempDir) -> (CatalogClient, Arc<StaticSource>, Arc<DiskCacheStore>) {
        let source = Arc::new(StaticSource { body, calls: AtomicUsize::new(0) });
        let store = Arc::new(DiskCacheStore::new(dir.path()));
        let client = CatalogClient::new(source.clone(), store.clone(), Duration::ZERO);
        (client, source, store)
    }

    #[test]
    fn test_query_url() {
        let source = UsgsCatalogSource::new(&CatalogConfig::default()).unwrap();
        let url = source.query_url(parse_day("2024-02-29").unwrap(), Magnitude::new(4.5).unwrap());
        assert_eq!(
            url.as_str(),
            "https://earthquake.usgs.gov/fdsnws/event/1/query?format=geojson\
             &starttime=2024-02-29T00%3A00%3A00&endtime=2024-03-01T00%3A00%3A00\
             &minmagnitude=4.5&eventtype=earthquake&orderby=time-asc"
        );
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = CatalogConfig { url: "not a url".to_string(), ..CatalogConfig::default() };
        assert!(matches!(UsgsCatalogSource::new(&config), Err(CatalogError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_persists_exact_body() {
        let dir = TempDir::new().unwrap();
        let body = r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[1,2]}}]}"#;
        let (client, _, store) = client(Ok(body), &dir);
        let day = parse_day("2024-01-01").unwrap();
        let mag = Magnitude::new(4.5).unwrap();

        let fetched = client.fetch_day(day, mag).await.unwrap();
        assert_eq!(fetched.feature_count, 1);
        assert_eq!(store.read(day, mag).await.unwrap(), body.as_bytes());
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_persisted() {
        let dir = TempDir::new().unwrap();
        let (client, _, store) = client(Ok("<html>maintenance</html>"), &dir);
        let day = parse_day("2024-01-01").unwrap();
        let mag = Magnitude::new(4.5).unwrap();

        let err = client.fetch_day(day, mag).await.unwrap_err();
        assert_eq!(err.kind(), crate::core::types::FailureKind::Malformed);
        assert!(!store.exists(day, mag).await.unwrap());
    }

    #[tokio::test]
    async fn test_status_error_passes_through_once() {
        let dir = TempDir::new().unwrap();
        let (client, source, _) = client(Err(503), &dir);
        let err = client.fetch_day(parse_day("2024-01-01").unwrap(), Magnitude::new(4.5).unwrap()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Status { status: 503, .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
