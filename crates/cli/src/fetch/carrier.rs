//! Carrier tracking page fetcher.
//!
//! One GET per tracking number against the configured URL template.
//! Rate limiting (429) and 5xx responses are retried with exponential
//! backoff; everything else maps straight to a [`FetchOutcome`].

use std::io::Read;
use std::thread;
use std::time::Duration;

use shiptrack_config::settings::expand_tracking_url;
use shiptrack_config::Settings;
use shiptrack_recon::{FetchOutcome, TrackingFetcher};
use tracing::{debug, warn};

use super::extract::StatusExtractor;

const MAX_RETRIES: u32 = 2;
const MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;

pub struct HttpTrackingFetcher {
    http: reqwest::blocking::Client,
    url_template: String,
    extractor: StatusExtractor,
    backoff: Duration,
    max_body: u64,
}

impl HttpTrackingFetcher {
    pub fn new(settings: &Settings) -> Result<Self, String> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        let extractor =
            StatusExtractor::new().map_err(|e| format!("invalid status pattern: {e}"))?;

        Ok(Self {
            http,
            url_template: settings.tracking_url.clone(),
            extractor,
            backoff: Duration::from_secs(1),
            max_body: MAX_BODY_BYTES,
        })
    }

    /// Override the initial retry backoff.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Override the largest page body accepted.
    pub fn with_max_body(mut self, bytes: u64) -> Self {
        self.max_body = bytes;
        self
    }

    /// Read at most `max_body` bytes; larger pages are rejected unread.
    fn read_body(&self, resp: reqwest::blocking::Response) -> Result<String, String> {
        if let Some(len) = resp.content_length() {
            if len > self.max_body {
                return Err(format!("response too large ({len} bytes)"));
            }
        }
        let mut buf = Vec::new();
        resp.take(self.max_body + 1)
            .read_to_end(&mut buf)
            .map_err(|e| format!("failed to read body: {e}"))?;
        if buf.len() as u64 > self.max_body {
            return Err(format!("response too large (over {} bytes)", self.max_body));
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Page body, retrying transient failures. `Err` carries the cause.
    fn get_page(&self, url: &str) -> Result<String, String> {
        let mut backoff = self.backoff;

        for attempt in 0..=MAX_RETRIES {
            let cause = match self.http.get(url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return self.read_body(resp);
                    }
                    let code = status.as_u16();
                    if code != 429 && !status.is_server_error() {
                        return Err(format!("HTTP {code}"));
                    }
                    format!("HTTP {code}")
                }
                Err(e) if e.is_timeout() => "timed out".to_string(),
                Err(e) => e.to_string(),
            };

            if attempt == MAX_RETRIES {
                return Err(format!("{cause} after {} attempts", MAX_RETRIES + 1));
            }
            warn!(url, attempt = attempt + 1, wait_ms = backoff.as_millis() as u64, %cause, "retrying");
            thread::sleep(backoff);
            backoff *= 2;
        }

        Err("no attempts made".into())
    }
}

impl TrackingFetcher for HttpTrackingFetcher {
    fn fetch(&mut self, tracking_number: &str) -> FetchOutcome {
        let url = expand_tracking_url(&self.url_template, tracking_number);
        debug!(tracking_number, %url, "fetching carrier page");

        match self.get_page(&url) {
            Ok(html) => match self.extractor.extract(&html) {
                Some(text) => FetchOutcome::Text(text),
                None => FetchOutcome::NotFound,
            },
            Err(cause) => FetchOutcome::Failed { cause },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn fetcher(server: &MockServer) -> HttpTrackingFetcher {
        let settings = Settings {
            tracking_url: format!("{}/sigue-tu-envio?guia={{tracking_number}}", server.base_url()),
            timeout_secs: 5,
            ..Settings::default()
        };
        HttpTrackingFetcher::new(&settings)
            .unwrap()
            .with_backoff(Duration::ZERO)
    }

    #[test]
    fn test_status_text_from_page() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET)
                .path("/sigue-tu-envio")
                .query_param("guia", "240012345");
            then.status(200)
                .header("content-type", "text/html; charset=utf-8")
                .body("<h2>Estado del envío</h2><p>Entregado al destinatario</p>");
        });

        let outcome = fetcher(&server).fetch("240012345");
        assert_eq!(outcome, FetchOutcome::Text("Entregado al destinatario".into()));
        page.assert_calls(1);
    }

    #[test]
    fn test_page_without_status_is_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/sigue-tu-envio");
            then.status(200).body("<html><body>Consulta tu guía</body></html>");
        });

        assert_eq!(fetcher(&server).fetch("1"), FetchOutcome::NotFound);
    }

    #[test]
    fn test_server_errors_are_retried_then_fail() {
        let server = MockServer::start();
        let down = server.mock(|when, then| {
            when.method(GET).path("/sigue-tu-envio");
            then.status(503);
        });

        let outcome = fetcher(&server).fetch("1");
        match outcome {
            FetchOutcome::Failed { cause } => assert!(cause.contains("503"), "cause: {cause}"),
            other => panic!("expected failure, got {other:?}"),
        }
        down.assert_calls(3);
    }

    #[test]
    fn test_oversized_page_is_rejected_without_retry() {
        let server = MockServer::start();
        let big = server.mock(|when, then| {
            when.method(GET).path("/sigue-tu-envio");
            then.status(200).body(format!("<p>Entregado</p>{}", "x".repeat(200)));
        });

        let mut f = fetcher(&server).with_max_body(64);
        match f.fetch("1") {
            FetchOutcome::Failed { cause } => assert!(cause.contains("too large"), "cause: {cause}"),
            other => panic!("expected failure, got {other:?}"),
        }
        big.assert_calls(1);
    }

    #[test]
    fn test_tracking_number_is_url_encoded() {
        let server = MockServer::start();
        let page = server.mock(|when, then| {
            when.method(GET)
                .path("/sigue-tu-envio")
                .query_param("guia", "24&00#1");
            then.status(200).body("<h2>Estado del envío</h2><p>Entregado</p>");
        });

        let outcome = fetcher(&server).fetch("24&00#1");
        assert_eq!(outcome, FetchOutcome::Text("Entregado".into()));
        page.assert_calls(1);
    }

    #[test]
    fn test_client_error_is_not_retried() {
        let server = MockServer::start();
        let missing = server.mock(|when, then| {
            when.method(GET).path("/sigue-tu-envio");
            then.status(404);
        });

        assert!(matches!(fetcher(&server).fetch("1"), FetchOutcome::Failed { .. }));
        missing.assert_calls(1);
    }

    #[test]
    fn test_unreachable_host_fails() {
        let settings = Settings {
            tracking_url: "http://127.0.0.1:9/track/{tracking_number}".into(),
            timeout_secs: 2,
            ..Settings::default()
        };
        let mut f = HttpTrackingFetcher::new(&settings)
            .unwrap()
            .with_backoff(Duration::ZERO);
        assert!(matches!(f.fetch("1"), FetchOutcome::Failed { .. }));
    }
}
