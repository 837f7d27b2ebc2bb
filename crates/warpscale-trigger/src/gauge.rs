//! HTTP gauge monitor.
//!
//! Fetches `GET http://{address}{path}` and expects a plain-text number in
//! the body, e.g. the depth of a work queue.

use std::time::Duration;

use http_body_util::BodyExt;
use tracing::debug;

use warpscale_core::{
    BoxFuture, MonitorConfig, ScaleError, ScaleMonitor, ScaleMonitorDescriptor, ScaleResult,
    ScaleStatus, ScaleStatusContext, ScaleVote, TriggerMetrics,
};

/// Metric name under which the gauge value is stored.
pub const GAUGE_METRIC: &str = "gauge";

/// Scale up above this multiple of the per-worker target.
const SCALE_OUT_FACTOR: f64 = 1.1;

/// Scale down below this multiple of the per-worker target.
const SCALE_IN_FACTOR: f64 = 0.5;

/// Monitors a numeric gauge exposed over HTTP.
#[derive(Debug)]
pub struct HttpGaugeMonitor {
    descriptor: ScaleMonitorDescriptor,
    address: String,
    path: String,
    target_per_worker: f64,
    timeout: Duration,
}

impl HttpGaugeMonitor {
    pub fn new(
        id: &str,
        address: impl Into<String>,
        path: impl Into<String>,
        target_per_worker: f64,
    ) -> ScaleResult<Self> {
        if !(target_per_worker.is_finite() && target_per_worker > 0.0) {
            return Err(ScaleError::Config(format!(
                "monitor {id}: target_per_worker must be positive, got {target_per_worker}"
            )));
        }

        let path = path.into();
        let path = if path.starts_with('/') { path } else { format!("/{path}") };

        Ok(Self {
            descriptor: ScaleMonitorDescriptor::new(id, "http_gauge"),
            address: address.into(),
            path,
            target_per_worker,
            timeout: Duration::from_secs(2),
        })
    }

    pub fn from_config(config: &MonitorConfig) -> ScaleResult<Self> {
        Ok(Self::new(&config.id, &config.address, &config.path, config.target_per_worker)?
            .with_timeout(config.timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn target_per_worker(&self) -> f64 {
        self.target_per_worker
    }

    async fn fetch(&self) -> Result<f64, String> {
        let uri = format!("http://{}{}", self.address, self.path);

        let stream = tokio::net::TcpStream::connect(&self.address)
            .await
            .map_err(|e| format!("connect {uri}: {e}"))?;

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(|e| format!("handshake {uri}: {e}"))?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", &self.address)
            .header("user-agent", "warpscale-trigger/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .map_err(|e| format!("build request {uri}: {e}"))?;

        let resp = sender
            .send_request(req)
            .await
            .map_err(|e| format!("request {uri}: {e}"))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(format!("{uri} returned {status}"));
        }

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| format!("read body {uri}: {e}"))?
            .to_bytes();

        parse_gauge(&body).ok_or_else(|| format!("{uri} did not return a non-negative number"))
    }
}

impl ScaleMonitor for HttpGaugeMonitor {
    fn descriptor(&self) -> &ScaleMonitorDescriptor {
        &self.descriptor
    }

    fn get_metrics(&self) -> BoxFuture<'_, ScaleResult<TriggerMetrics>> {
        Box::pin(async move {
            let value = match tokio::time::timeout(self.timeout, self.fetch()).await {
                Ok(result) => result,
                Err(_) => Err(format!("timed out after {}ms", self.timeout.as_millis())),
            }
            .map_err(|msg| ScaleError::monitor(self.id(), msg))?;

            debug!(monitor = %self.id(), value, "gauge sampled");
            Ok(TriggerMetrics::single(GAUGE_METRIC, value))
        })
    }

    fn get_scale_status(&self, context: &ScaleStatusContext) -> ScaleResult<ScaleStatus> {
        let vote = gauge_vote(&context.metrics, context.worker_count, self.target_per_worker);
        Ok(vote.into())
    }
}

/// Vote on a gauge given its retained samples (oldest first).
pub fn gauge_vote(samples: &[TriggerMetrics], worker_count: u32, target_per_worker: f64) -> ScaleVote {
    let gauges: Vec<f64> = samples.iter().filter_map(|s| s.get(GAUGE_METRIC)).collect();
    let Some(&latest) = gauges.last() else {
        return ScaleVote::None;
    };

    if worker_count == 0 {
        return if latest > 0.0 { ScaleVote::ScaleOut } else { ScaleVote::None };
    }

    if gauges.iter().all(|g| *g == 0.0) {
        return ScaleVote::ScaleIn;
    }

    let per_worker = latest / worker_count as f64;
    if per_worker > target_per_worker * SCALE_OUT_FACTOR {
        ScaleVote::ScaleOut
    } else if per_worker < target_per_worker * SCALE_IN_FACTOR {
        ScaleVote::ScaleIn
    } else {
        ScaleVote::None
    }
}

fn parse_gauge(body: &[u8]) -> Option<f64> {
    let value: f64 = std::str::from_utf8(body).ok()?.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn samples(values: &[f64]) -> Vec<TriggerMetrics> {
        values.iter().map(|v| TriggerMetrics::single(GAUGE_METRIC, *v)).collect()
    }

    /// Serve a single canned HTTP response and return the bound address.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        addr
    }

    #[test]
    fn no_samples_votes_none() {
        assert_eq!(gauge_vote(&[], 3, 10.0), ScaleVote::None);
        assert_eq!(gauge_vote(&[TriggerMetrics::single("other", 5.0)], 3, 10.0), ScaleVote::None);
    }

    #[test]
    fn idle_pool_with_backlog_scales_out() {
        assert_eq!(gauge_vote(&samples(&[0.0, 3.0]), 0, 100.0), ScaleVote::ScaleOut);
        assert_eq!(gauge_vote(&samples(&[0.0, 0.0]), 0, 100.0), ScaleVote::None);
    }

    #[test]
    fn drained_gauge_scales_in() {
        assert_eq!(gauge_vote(&samples(&[0.0, 0.0, 0.0]), 2, 100.0), ScaleVote::ScaleIn);
    }

    #[test]
    fn above_target_scales_out() {
        // 250 per worker against a target of 100.
        assert_eq!(gauge_vote(&samples(&[100.0, 500.0]), 2, 100.0), ScaleVote::ScaleOut);
    }

    #[test]
    fn below_target_scales_in() {
        // 10 per worker against a target of 100.
        assert_eq!(gauge_vote(&samples(&[80.0, 40.0]), 4, 100.0), ScaleVote::ScaleIn);
    }

    #[test]
    fn near_target_holds() {
        assert_eq!(gauge_vote(&samples(&[300.0]), 3, 100.0), ScaleVote::None);
        assert_eq!(gauge_vote(&samples(&[330.0]), 3, 100.0), ScaleVote::None);
    }

    #[test]
    fn invalid_target_rejected() {
        assert!(HttpGaugeMonitor::new("q", "127.0.0.1:1", "/depth", 0.0).is_err());
        assert!(HttpGaugeMonitor::new("q", "127.0.0.1:1", "/depth", f64::NAN).is_err());
    }

    #[test]
    fn from_config_normalizes_path() {
        let config = MonitorConfig {
            id: "orders".to_string(),
            address: "127.0.0.1:9100".to_string(),
            path: "queue/orders".to_string(),
            target_per_worker: 50.0,
            timeout: Some("500ms".to_string()),
        };
        let monitor = HttpGaugeMonitor::from_config(&config).unwrap();
        assert_eq!(monitor.path, "/queue/orders");
        assert_eq!(monitor.timeout, Duration::from_millis(500));
        assert_eq!(monitor.id().as_str(), "orders");
        assert_eq!(monitor.descriptor().trigger, "http_gauge");
    }

    #[test]
    fn parse_gauge_values() {
        assert_eq!(parse_gauge(b"42"), Some(42.0));
        assert_eq!(parse_gauge(b" 7.5\n"), Some(7.5));
        assert_eq!(parse_gauge(b"-1"), None);
        assert_eq!(parse_gauge(b"lots"), None);
    }

    #[tokio::test]
    async fn get_metrics_reads_gauge() {
        let addr = serve_once("200 OK", "42").await;
        let monitor = HttpGaugeMonitor::new("orders", addr, "/depth", 10.0).unwrap();

        let sample = monitor.get_metrics().await.unwrap();
        assert_eq!(sample.get(GAUGE_METRIC), Some(42.0));
    }

    #[tokio::test]
    async fn non_success_status_is_monitor_error() {
        let addr = serve_once("503 Service Unavailable", "").await;
        let monitor = HttpGaugeMonitor::new("orders", addr, "/depth", 10.0).unwrap();

        let err = monitor.get_metrics().await.unwrap_err();
        assert!(matches!(err, ScaleError::Monitor { .. }));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_monitor_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let monitor = HttpGaugeMonitor::new("orders", addr, "/depth", 10.0)
            .unwrap()
            .with_timeout(Duration::from_millis(500));
        assert!(matches!(monitor.get_metrics().await, Err(ScaleError::Monitor { .. })));
    }
}
