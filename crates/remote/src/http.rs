//! Blocking HTTP with retry, backoff and error classification.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};

pub(crate) const MAX_RETRIES: u32 = 3;
pub(crate) const USER_AGENT: &str = concat!("wrsync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("{service} auth failed ({status}): {message}")]
    Auth { service: &'static str, status: u16, message: String },

    /// A 4xx other than 401/403/429.
    #[error("{service} request rejected ({status}): {message}")]
    Rejected { service: &'static str, status: u16, message: String },

    #[error("{service} rate limited after {attempts} attempts")]
    RateLimited { service: &'static str, attempts: u32 },

    #[error("{service} upstream error after {attempts} attempts: {detail}")]
    Upstream { service: &'static str, attempts: u32, detail: String },

    #[error("{service} returned an unreadable response: {detail}")]
    Parse { service: &'static str, detail: String },
}

impl HttpError {
    pub fn is_auth(&self) -> bool {
        matches!(self, HttpError::Auth { .. })
    }
}

/// Shared HTTP client that handles retry, backoff, and error classification.
///
/// Callers pass a request-building closure which is invoked once per attempt.
pub(crate) struct RetryingClient {
    pub(crate) http: Client,
    service: &'static str,
    backoff: Duration,
}

impl RetryingClient {
    pub(crate) fn new(service: &'static str, http: Client) -> Self {
        Self { http, service, backoff: Duration::from_secs(1) }
    }

    /// First retry delay; doubles on each further attempt.
    pub(crate) fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub(crate) fn request_json(
        &self,
        build_request: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<serde_json::Value, HttpError> {
        let mut backoff = self.backoff;
        let mut attempt = 0;

        loop {
            let resp = match build_request(&self.http).send() {
                Ok(resp) => resp,
                Err(e) => {
                    // Network/timeout errors: retry
                    if attempt == MAX_RETRIES {
                        return Err(HttpError::Upstream {
                            service: self.service,
                            attempts: MAX_RETRIES + 1,
                            detail: e.to_string(),
                        });
                    }
                    log::warn!("{} retry {}/{} in {:?} ({e})", self.service, attempt + 1, MAX_RETRIES, backoff);
                    thread::sleep(backoff);
                    backoff *= 2;
                    attempt += 1;
                    continue;
                }
            };

            let status = resp.status().as_u16();

            if status == 401 || status == 403 {
                let message = error_message(resp);
                return Err(HttpError::Auth { service: self.service, status, message });
            }

            if (400..500).contains(&status) && status != 429 {
                let message = error_message(resp);
                return Err(HttpError::Rejected { service: self.service, status, message });
            }

            // Retryable: 429, 5xx
            if status == 429 || status >= 500 {
                if attempt == MAX_RETRIES {
                    return Err(if status == 429 {
                        HttpError::RateLimited { service: self.service, attempts: MAX_RETRIES + 1 }
                    } else {
                        HttpError::Upstream {
                            service: self.service,
                            attempts: MAX_RETRIES + 1,
                            detail: format!("HTTP {status}"),
                        }
                    });
                }

                // Respect Retry-After header for 429
                let wait = if status == 429 {
                    resp.headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or(backoff)
                } else {
                    backoff
                };

                log::warn!("{} retry {}/{} in {:?} (HTTP {status})", self.service, attempt + 1, MAX_RETRIES, wait);
                thread::sleep(wait);
                backoff *= 2;
                attempt += 1;
                continue;
            }

            let text = resp.text().map_err(|e| HttpError::Parse { service: self.service, detail: e.to_string() })?;
            return serde_json::from_str(&text).map_err(|e| HttpError::Parse {
                service: self.service,
                detail: format!("{e} (body: {})", truncate(&text, 200)),
            });
        }
    }
}

/// Best-effort message from an error body: Google's `error.message`,
/// MediaWiki's `error.info`, else the raw text.
fn error_message(resp: reqwest::blocking::Response) -> String {
    let status = resp.status();
    let text = resp.text().unwrap_or_default();
    let body: serde_json::Value = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
    body["error"]["message"]
        .as_str()
        .or_else(|| body["error"]["info"].as_str())
        .map(String::from)
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                truncate(&text, 200).to_string()
            }
        })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
