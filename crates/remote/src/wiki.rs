//! MediaWiki action API client.
//!
//! Bot login is a login token fetch followed by `action=login`; the session
//! lives in the client's cookie store. Reads return the page text with the
//! base revision timestamp and a start timestamp, packed into the opaque
//! `Page::version`, and writes hand both back so the wiki can detect a
//! concurrent edit.

use std::cell::RefCell;
use std::thread;
use std::time::{Duration, Instant};

use serde_json::Value;

use wrsync_core::{DocumentStore, Page, SyncError, SyncResult};

use crate::http::{HttpError, RetryingClient};

#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("login failed: {0}")]
    Login(String),

    #[error("page '{0}' does not exist")]
    MissingPage(String),

    /// An `error` object in an otherwise successful response.
    #[error("{code}: {info}")]
    Api { code: String, info: String },

    #[error("unexpected response: {0}")]
    Shape(String),

    #[error("malformed page version '{0}'")]
    BadVersion(String),
}

/// API error codes that mean the session or token is gone.
const SESSION_ERRORS: &[&str] = &["badtoken", "notloggedin", "assertuserfailed", "assertbotfailed", "permissiondenied"];

impl WikiError {
    /// Map to the sync taxonomy for one entity.
    pub fn into_sync(self, entity_id: &str) -> SyncError {
        match self {
            WikiError::MissingPage(_) => SyncError::PageNotFound { entity_id: entity_id.to_string() },
            WikiError::Api { ref code, .. } if code == "editconflict" => {
                SyncError::PublishConflict { entity_id: entity_id.to_string() }
            }
            WikiError::Api { ref code, .. } if code == "missingtitle" => {
                SyncError::PageNotFound { entity_id: entity_id.to_string() }
            }
            WikiError::Api { ref code, .. } if SESSION_ERRORS.contains(&code.as_str()) => {
                SyncError::Fatal(format!("wiki session lost: {self}"))
            }
            WikiError::Http(ref e) if e.is_auth() => SyncError::Fatal(format!("wiki: {e}")),
            WikiError::Login(_) => SyncError::Fatal(self.to_string()),
            other => SyncError::PublishRejected { entity_id: entity_id.to_string(), reason: other.to_string() },
        }
    }
}

#[derive(Debug, Clone)]
pub struct WikiConfig {
    pub api_url: String,
    pub title_prefix: String,
    pub request_delay: Duration,
    pub user_agent: String,
}

/// MediaWiki client (blocking, cookie session).
pub struct WikiClient {
    client: RetryingClient,
    config: WikiConfig,
    csrf_token: RefCell<Option<String>>,
    last_request: RefCell<Option<Instant>>,
}

impl WikiClient {
    pub fn new(config: WikiConfig) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .build()
            .expect("failed to build HTTP client");

        Self {
            client: RetryingClient::new("wiki", http),
            config,
            csrf_token: RefCell::new(None),
            last_request: RefCell::new(None),
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.client = self.client.with_backoff(backoff);
        self
    }

    pub fn title_for(&self, entity_id: &str) -> String {
        format!("{}{}", self.config.title_prefix, entity_id)
    }

    /// Log in with a bot password.
    pub fn login(&self, username: &str, password: &str) -> Result<(), WikiError> {
        let body = self.get(&[("action", "query"), ("meta", "tokens"), ("type", "login")])?;
        let token = body["query"]["tokens"]["logintoken"]
            .as_str()
            .ok_or_else(|| WikiError::Shape("no login token".into()))?
            .to_string();

        let body = self.post("login", &[("lgname", username), ("lgpassword", password), ("lgtoken", token.as_str())])?;
        match body["login"]["result"].as_str() {
            Some("Success") => {
                log::info!("logged in to {} as {username}", self.config.api_url);
                Ok(())
            }
            Some(other) => {
                let reason = body["login"]["reason"].as_str().unwrap_or(other);
                Err(WikiError::Login(reason.to_string()))
            }
            None => Err(WikiError::Shape("no login result".into())),
        }
    }

    /// Current text of a page, its revision timestamp, and a fresh edit token.
    pub fn read_page(&self, title: &str) -> Result<Page, WikiError> {
        let body = self.get(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("rvprop", "content|timestamp"),
            ("rvslots", "main"),
            ("titles", title),
            ("meta", "tokens"),
            ("curtimestamp", "1"),
        ])?;

        let page = body["query"]["pages"]
            .get(0)
            .ok_or_else(|| WikiError::Shape("no pages in response".into()))?;
        if page.get("missing").is_some() || page.get("invalid").is_some() {
            return Err(WikiError::MissingPage(title.to_string()));
        }
        let revision = page["revisions"]
            .get(0)
            .ok_or_else(|| WikiError::Shape(format!("no revisions for '{title}'")))?;
        let text = revision["slots"]["main"]["content"]
            .as_str()
            .ok_or_else(|| WikiError::Shape(format!("no content for '{title}'")))?;
        let base = str_field(revision, "timestamp")?;
        let start = str_field(&body, "curtimestamp")?;

        if let Some(token) = body["query"]["tokens"]["csrftoken"].as_str() {
            *self.csrf_token.borrow_mut() = Some(token.to_string());
        }

        Ok(Page { text: text.to_string(), version: format!("{base}|{start}") })
    }

    /// Save a page, failing with `editconflict` if it changed since `version`.
    pub fn edit_page(&self, title: &str, text: &str, version: &str, summary: &str) -> Result<(), WikiError> {
        let (base, start) = version.split_once('|').ok_or_else(|| WikiError::BadVersion(version.to_string()))?;
        let cached = self.csrf_token.borrow().clone();
        let token = match cached {
            Some(token) => token,
            None => self.fetch_csrf_token()?,
        };

        let body = self.post(
            "edit",
            &[
                ("title", title),
                ("text", text),
                ("summary", summary),
                ("basetimestamp", base),
                ("starttimestamp", start),
                ("nocreate", "1"),
                ("bot", "1"),
                ("assert", "user"),
                ("token", token.as_str()),
            ],
        )?;
        match body["edit"]["result"].as_str() {
            Some("Success") => {
                if body["edit"].get("nochange").is_some() {
                    log::debug!("edit of '{title}' was a no-op");
                }
                Ok(())
            }
            Some(other) => Err(WikiError::Api { code: other.to_lowercase(), info: body["edit"].to_string() }),
            None => Err(WikiError::Shape("no edit result".into())),
        }
    }

    fn fetch_csrf_token(&self) -> Result<String, WikiError> {
        let body = self.get(&[("action", "query"), ("meta", "tokens")])?;
        let token = str_field(&body["query"]["tokens"], "csrftoken")?;
        *self.csrf_token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn get(&self, params: &[(&str, &str)]) -> Result<Value, WikiError> {
        self.pace();
        let body = self.client.request_json(|http| {
            http.get(&self.config.api_url)
                .query(params)
                .query(&[("format", "json"), ("formatversion", "2")])
        })?;
        check_api_error(body)
    }

    /// POST with `action` in the query string and everything else form-encoded.
    fn post(&self, action: &str, form: &[(&str, &str)]) -> Result<Value, WikiError> {
        self.pace();
        let body = self.client.request_json(|http| {
            http.post(&self.config.api_url)
                .query(&[("action", action), ("format", "json"), ("formatversion", "2")])
                .form(form)
        })?;
        check_api_error(body)
    }

    /// Wait out the configured delay since the previous request.
    fn pace(&self) {
        let mut last = self.last_request.borrow_mut();
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.config.request_delay {
                thread::sleep(self.config.request_delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

impl DocumentStore for WikiClient {
    fn get_text(&self, entity_id: &str) -> SyncResult<Page> {
        let title = self.title_for(entity_id);
        log::debug!("reading '{title}'");
        self.read_page(&title).map_err(|e| e.into_sync(entity_id))
    }

    fn put_text(&self, entity_id: &str, text: &str, version: &str, summary: &str) -> SyncResult<()> {
        let title = self.title_for(entity_id);
        self.edit_page(&title, text, version, summary).map_err(|e| e.into_sync(entity_id))?;
        log::info!("edited '{title}': {summary}");
        Ok(())
    }
}

fn check_api_error(body: Value) -> Result<Value, WikiError> {
    if let Some(err) = body.get("error") {
        return Err(WikiError::Api {
            code: err["code"].as_str().unwrap_or("unknown").to_string(),
            info: err["info"].as_str().unwrap_or_default().to_string(),
        });
    }
    Ok(body)
}

fn str_field(value: &Value, key: &str) -> Result<String, WikiError> {
    value[key]
        .as_str()
        .map(String::from)
        .ok_or_else(|| WikiError::Shape(format!("missing {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_missing_map_to_entity_errors() {
        let conflict = WikiError::Api { code: "editconflict".into(), info: "Edit conflict.".into() };
        assert!(matches!(conflict.into_sync("A"), SyncError::PublishConflict { entity_id } if entity_id == "A"));

        let missing = WikiError::MissingPage("RTA Guide/A".into());
        assert!(matches!(missing.into_sync("A"), SyncError::PageNotFound { .. }));

        let missing_title = WikiError::Api { code: "missingtitle".into(), info: String::new() };
        assert!(matches!(missing_title.into_sync("A"), SyncError::PageNotFound { .. }));
    }

    #[test]
    fn session_loss_is_fatal() {
        let err = WikiError::Api { code: "assertuserfailed".into(), info: "not logged in".into() };
        assert!(matches!(err.into_sync("A"), SyncError::Fatal(_)));
    }

    #[test]
    fn other_api_errors_are_rejections() {
        let err = WikiError::Api { code: "spamblacklist".into(), info: "blocked link".into() };
        match err.into_sync("A") {
            SyncError::PublishRejected { entity_id, reason } => {
                assert_eq!(entity_id, "A");
                assert!(reason.contains("spamblacklist"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
