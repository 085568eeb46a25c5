//! Portal session handling: login and sequential page fetching.
//!
//! One login yields one session cookie. The portal ties a session to a single
//! serial stream of requests, so pages are always fetched one at a time.

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

use crate::config::PortalConfig;
use crate::error::{HarvesterError, Result};
use crate::http::{create_client, response_text, send_with_retry};
use crate::markup::normalize_whitespace;
use crate::types::CourseLink;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static SESSION_COOKIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^session_token=([^;]+);").expect("valid regex"));

/// Value the portal sends when it clears a session cookie.
const CLEARED_COOKIE: &str = "deleted";

/// Portal login credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated portal session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    cookie: String,
    homepage_url: Url,
}

impl Session {
    /// Cookie header value (`session_token=...`).
    #[must_use]
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Address the portal redirected to after login.
    #[must_use]
    pub fn homepage_url(&self) -> &Url {
        &self.homepage_url
    }
}

/// Blocking client for the portal.
#[derive(Debug, Clone)]
pub struct PortalClient {
    http: Client,
    config: PortalConfig,
    login_url: Url,
}

impl PortalClient {
    pub fn new(config: PortalConfig) -> Result<Self> {
        let http = create_client(&config)?;
        let login_url = Url::parse(&config.login_url())?;
        Ok(Self {
            http,
            config,
            login_url,
        })
    }

    /// Log in and capture the session cookie and homepage address.
    ///
    /// # Errors
    /// `Login` when the response lacks a redirect or a live `session_token` cookie.
    pub fn login(&self, credentials: &Credentials) -> Result<Session> {
        let body = format!(
            "username={}&password={}",
            urlencoding::encode(&credentials.username),
            urlencoding::encode(&credentials.password)
        );

        let response = self
            .http
            .post(self.login_url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()?
            .error_for_status()?;

        let login_error = |reason: &str| HarvesterError::Login {
            username: credentials.username.clone(),
            reason: reason.to_string(),
        };

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| login_error("no redirect in login response"))?;

        let token = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|cookie| SESSION_COOKIE.captures(cookie))
            .map(|caps| caps[1].to_string())
            .find(|token| token != CLEARED_COOKIE)
            .ok_or_else(|| login_error("no session cookie in login response"))?;

        // Relative redirects resolve against the login page.
        let homepage_url = self.login_url.join(location)?;
        tracing::debug!(username = %credentials.username, homepage = %homepage_url, "logged in");

        Ok(Session {
            cookie: format!("session_token={token}"),
            homepage_url,
        })
    }

    /// Fetch a page on the session and normalise its whitespace.
    pub fn fetch_page(&self, session: &Session, url: &str) -> Result<String> {
        let response = send_with_retry(|| {
            self.http
                .get(url)
                .header(COOKIE, session.cookie())
        })?;
        let page = response_text(response, url)?;
        Ok(normalize_whitespace(&page).into_owned())
    }

    /// Fetch the homepage the login redirected to.
    pub fn fetch_homepage(&self, session: &Session) -> Result<String> {
        self.fetch_page(session, session.homepage_url().as_str())
            .map_err(|e| HarvesterError::Session(format!("homepage unavailable: {e}")))
    }

    /// Fetch one course's report page.
    pub fn fetch_report(&self, session: &Session, link: &CourseLink) -> Result<String> {
        let started = std::time::Instant::now();
        let url = self.config.report_url(&link.course_id, &link.student_id);
        let page = self
            .fetch_page(session, &url)
            .map_err(|e| e.while_loading(format!("report for course {}", link.course_id)))?;
        tracing::debug!(
            course_id = %link.course_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "got report"
        );
        Ok(page)
    }
}
