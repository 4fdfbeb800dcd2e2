//! Optional StatsD metrics. Every helper is a no-op until [`setup_metrics`] succeeds.
use crate::config::Config;
use cadence::{BufferedUdpMetricSink, Counted, CountedExt, Gauged, QueuingMetricSink, StatsdClient, Timed};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;

// Wrapper for StatsdClient that hides the tagged/untagged split
pub struct StatsdClientWrapper {
    client: Arc<StatsdClient>,
    use_tags: bool,
}

impl Clone for StatsdClientWrapper {
    fn clone(&self) -> Self {
        Self { client: self.client.clone(), use_tags: self.use_tags }
    }
}

impl StatsdClientWrapper {
    pub fn new(client: StatsdClient, use_tags: bool) -> Self {
        tracing::info!("Created StatsdClient wrapper with use_tags={}", use_tags);
        Self { client: Arc::new(client), use_tags }
    }

    pub fn count(&self, key: &str, value: u64) {
        if self.use_tags {
            self.client.count_with_tags(key, value as i64).send();
            tracing::trace!("Sent tagged metric: {} = {}", key, value);
        } else {
            match self.client.count(key, value as i64) {
                Ok(_) => tracing::trace!("Sent metric: {} = {}", key, value),
                Err(e) => tracing::warn!("Failed to send metric {}: {}", key, e),
            }
        }
    }

    pub fn incr(&self, key: &str) {
        if self.use_tags {
            self.client.incr_with_tags(key).send();
            tracing::trace!("Sent tagged metric: {}", key);
        } else {
            match self.client.incr(key) {
                Ok(_) => tracing::trace!("Sent metric: {}", key),
                Err(e) => tracing::warn!("Failed to send metric {}: {}", key, e),
            }
        }
    }

    pub fn gauge(&self, key: &str, value: impl Into<f64>) {
        let value = value.into();
        if self.use_tags {
            self.client.gauge_with_tags(key, value).send();
            tracing::trace!("Sent tagged metric: {} = {}", key, value);
        } else {
            match self.client.gauge(key, value) {
                Ok(_) => tracing::trace!("Sent metric: {} = {}", key, value),
                Err(e) => tracing::warn!("Failed to send metric {}: {}", key, e),
            }
        }
    }

    pub fn time(&self, key: &str, value: u64) {
        if self.use_tags {
            self.client.time_with_tags(key, value).send();
            tracing::trace!("Sent tagged metric: {} = {}ms", key, value);
        } else {
            match self.client.time(key, value) {
                Ok(_) => tracing::trace!("Sent metric: {} = {}ms", key, value),
                Err(e) => tracing::warn!("Failed to send metric {}: {}", key, e),
            }
        }
    }
}

// Static client storage
static METRICS_CLIENT: OnceCell<Option<StatsdClientWrapper>> = OnceCell::new();

/// Initialize and set up metrics
pub fn setup_metrics(config: &Config) {
    METRICS_CLIENT.get_or_init(|| {
        if !config.statsd.enabled {
            tracing::debug!("Metrics disabled in configuration");
            return None;
        }

        let addr = config.statsd.addr.as_str();
        let prefix = config.statsd.prefix.as_str();
        tracing::info!(
            "Initializing StatsD metrics with endpoint {} and prefix '{}' (use_tags={})",
            addr,
            prefix,
            config.statsd.use_tags
        );

        match create_statsd_client(addr, prefix) {
            Ok(client) => {
                let wrapper = StatsdClientWrapper::new(client, config.statsd.use_tags);
                wrapper.incr("metrics.initialization");
                Some(wrapper)
            },
            Err(e) => {
                tracing::error!("Failed to create StatsD client: {}", e);
                None
            },
        }
    });
}

// Create a properly configured StatsD client
fn create_statsd_client(
    addr: &str,
    prefix: &str,
) -> Result<StatsdClient, Box<dyn std::error::Error + Send + Sync>> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0")?;
    socket.set_nonblocking(true)?;

    let udp_sink = BufferedUdpMetricSink::from(addr, socket)?;
    let queuing_sink = QueuingMetricSink::from(udp_sink);

    Ok(StatsdClient::from_sink(prefix, queuing_sink))
}

fn get_client() -> Option<&'static StatsdClientWrapper> {
    METRICS_CLIENT.get().and_then(|client_opt| client_opt.as_ref())
}

// Acquisition metrics
pub fn increment_days_fetched() {
    if let Some(client) = get_client() {
        client.incr("acquisition.days_fetched");
    }
}

pub fn increment_days_empty() {
    if let Some(client) = get_client() {
        client.incr("acquisition.days_empty");
    }
}

pub fn increment_days_failed() {
    if let Some(client) = get_client() {
        client.incr("acquisition.days_failed");
    }
}

pub fn increment_days_cached() {
    if let Some(client) = get_client() {
        client.incr("acquisition.days_cached");
    }
}

pub fn time_day_fetch(duration: Duration) {
    if let Some(client) = get_client() {
        client.time("acquisition.fetch_time", duration.as_millis() as u64);
    }
}

// Merge and enrichment metrics
pub fn increment_points_merged(count: u64) {
    if let Some(client) = get_client() {
        client.count("merge.points", count);
    }
}

pub fn increment_points_enriched(count: u64) {
    if let Some(client) = get_client() {
        client.count("enrich.points", count);
    }
}

pub fn increment_enrichment_failures(count: u64) {
    if count == 0 {
        return;
    }
    if let Some(client) = get_client() {
        client.count("enrich.failures", count);
    }
}

pub fn set_boundary_segments(count: usize) {
    if let Some(client) = get_client() {
        client.gauge("enrich.boundary_segments", count as f64);
    }
}
