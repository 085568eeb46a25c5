//! Blocking HTTP plumbing shared by every portal request.

use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::redirect::Policy;

use crate::config::{PortalConfig, MAX_RETRIES, RETRY_BASE_DELAY_MS};
use crate::error::{HarvesterError, Result};

const USER_AGENT: &str = concat!("gradesync-harvester/", env!("CARGO_PKG_VERSION"));

/// Build the portal HTTP client.
///
/// Redirects are not followed: the login response's `Location` header is the
/// homepage address and must be read, not chased.
pub fn create_client(config: &PortalConfig) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .redirect(Policy::none())
        .build()?)
}

/// Delay before retry number `attempt` (1-based): 500ms, 1000ms, 2000ms, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS << attempt.saturating_sub(1))
}

/// Send a request, retrying connection failures, timeouts and 5xx responses.
///
/// `build` is called once per attempt. 4xx responses fail immediately.
pub fn send_with_retry<F>(build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_failure = String::from("no attempt made");

    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            let delay = backoff_delay(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "backing off");
            thread::sleep(delay);
        }

        last_failure = match build().send() {
            Ok(response) if response.status().is_server_error() => {
                format!("portal returned {}", response.status())
            }
            Ok(response) => return Ok(response.error_for_status()?),
            Err(e) if e.is_connect() || e.is_timeout() => e.to_string(),
            Err(e) => return Err(HarvesterError::Http(e)),
        };

        tracing::warn!(
            attempt = attempt + 1,
            of = MAX_RETRIES,
            failure = %last_failure,
            "transient portal failure"
        );
    }

    Err(HarvesterError::RetriesExhausted {
        attempts: MAX_RETRIES,
        message: last_failure,
    })
}

/// Read a response body as text.
pub fn response_text(response: Response, context: &str) -> Result<String> {
    let bytes = response.bytes()?;
    Ok(bytes_to_string(&bytes, context))
}

/// Decode a page, replacing invalid UTF-8 rather than failing on it.
pub fn bytes_to_string(bytes: &[u8], context: &str) -> String {
    match String::from_utf8(bytes.to_vec()) {
        Ok(text) => text,
        Err(_) => {
            tracing::warn!(context, "page is not valid UTF-8, replacing invalid sequences");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(create_client(&PortalConfig::default()).is_ok());
    }

    #[test]
    fn test_backoff_doubles() {
        assert_eq!(backoff_delay(1), Duration::from_millis(500));
        assert_eq!(backoff_delay(2), Duration::from_millis(1000));
        assert_eq!(backoff_delay(3), Duration::from_millis(2000));
    }

    #[test]
    fn test_bytes_to_string_valid() {
        assert_eq!(bytes_to_string(b"<h2>X</h2>", "test"), "<h2>X</h2>");
    }

    #[test]
    fn test_bytes_to_string_lossy() {
        assert_eq!(bytes_to_string(&[b'a', 0xff, b'b'], "test"), "a\u{fffd}b");
    }
}
