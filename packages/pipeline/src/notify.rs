//! Push notifications for mark changes and device token pruning.

use async_trait::async_trait;

use crate::error::{PipelineError, Result};
use crate::models::{ChangeRecord, Destination, Payload};

/// Delivery error codes meaning a token will never work again.
///
/// Any other failure is treated as transient and the token is kept.
pub const UNREGISTERED_TOKEN_CODES: [&str; 3] = [
    "messaging/registration-token-not-registered",
    "messaging/invalid-registration-token",
    "messaging/invalid-argument",
];

/// Result of delivering to one device token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed { code: String },
}

/// Trait for notification backends, enabling mocking in tests.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message to every token, returning one outcome per token in order.
    async fn send(&self, tokens: &[String], title: &str, body: &str) -> Result<Vec<DeliveryOutcome>>;
}

pub fn should_remove_token(code: &str) -> bool {
    UNREGISTERED_TOKEN_CODES.contains(&code)
}

/// Tokens that should stay registered after a delivery attempt.
///
/// Tokens without an outcome are kept.
pub fn surviving_tokens(tokens: &[String], outcomes: &[DeliveryOutcome]) -> Vec<String> {
    tokens
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            !matches!(
                outcomes.get(*idx),
                Some(DeliveryOutcome::Failed { code }) if should_remove_token(code)
            )
        })
        .map(|(_, token)| token.clone())
        .collect()
}

/// Send a message and return the tokens that survived it.
///
/// A backend that answers with a different number of outcomes than tokens
/// is a `Notification` error, since outcomes are matched to tokens by position.
pub async fn deliver(
    notifier: &dyn Notifier,
    tokens: &[String],
    title: &str,
    body: &str,
) -> Result<Vec<String>> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let outcomes = notifier.send(tokens, title, body).await?;
    if outcomes.len() != tokens.len() {
        return Err(PipelineError::Notification(format!(
            "expected {} delivery outcomes, got {}",
            tokens.len(),
            outcomes.len()
        )));
    }
    let surviving = surviving_tokens(tokens, &outcomes);
    if surviving.len() < tokens.len() {
        tracing::warn!(
            removed = tokens.len() - surviving.len(),
            remaining = surviving.len(),
            "pruning unregistered device tokens"
        );
    }
    Ok(surviving)
}

/// One line per mark change: `-: <hash>` for removals and
/// `+: <strand> <name> <numerator>/<denominator> (<weight>)` for additions.
///
/// Returns `None` when `changes` holds no mark changes.
pub fn summarize_mark_changes(changes: &[ChangeRecord]) -> Option<String> {
    let lines: Vec<String> = changes
        .iter()
        .filter(|change| change.is_mark_change())
        .filter_map(|change| match (change, change.destination()) {
            (ChangeRecord::Delete { .. }, Destination::Mark { mark_hash, .. }) => {
                Some(format!("-: {mark_hash}"))
            }
            (
                ChangeRecord::Create {
                    payload: Payload::Mark(m),
                    ..
                },
                _,
            ) => Some(format!(
                "+: {} {} {}/{} ({})",
                m.strand, m.name, m.numerator, m.denominator, m.weight
            )),
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Notifier that writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, tokens: &[String], title: &str, body: &str) -> Result<Vec<DeliveryOutcome>> {
        tracing::info!(devices = tokens.len(), title, body, "notification");
        Ok(vec![DeliveryOutcome::Delivered; tokens.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradesync_harvester::{Mark, Strand};
    use pretty_assertions::assert_eq;

    fn tokens(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_should_remove_token() {
        for code in UNREGISTERED_TOKEN_CODES {
            assert!(should_remove_token(code));
        }
        assert!(!should_remove_token("messaging/internal-error"));
        assert!(!should_remove_token("messaging/quota-exceeded"));
    }

    #[test]
    fn test_surviving_tokens_drops_only_unregistered() {
        let outcomes = vec![
            DeliveryOutcome::Delivered,
            DeliveryOutcome::Failed {
                code: "messaging/registration-token-not-registered".into(),
            },
            DeliveryOutcome::Failed {
                code: "messaging/server-unavailable".into(),
            },
            DeliveryOutcome::Failed {
                code: "messaging/invalid-argument".into(),
            },
        ];

        assert_eq!(
            surviving_tokens(&tokens(&["a", "b", "c", "d", "e"]), &outcomes),
            tokens(&["a", "c", "e"])
        );
    }

    #[test]
    fn test_summarize_mark_changes() {
        let mark = Mark::new(Strand::K, "uid", "9", "Unit Test", 4.0, 18.0, 20.0);
        let changes = vec![
            ChangeRecord::Delete {
                destination: Destination::mark("c1", "old-hash"),
            },
            ChangeRecord::Create {
                destination: Destination::mark("c1", mark.hash.as_str()),
                payload: Payload::Mark(mark),
            },
        ];

        assert_eq!(
            summarize_mark_changes(&changes).unwrap(),
            "-: old-hash\n+: k Unit Test 18/20 (4)"
        );
    }

    #[test]
    fn test_summarize_ignores_course_and_state_records() {
        let changes = vec![ChangeRecord::Delete {
            destination: Destination::student_state("c1", "uid"),
        }];
        assert_eq!(summarize_mark_changes(&changes), None);
    }

    struct ShortNotifier;

    #[async_trait]
    impl Notifier for ShortNotifier {
        async fn send(&self, _: &[String], _: &str, _: &str) -> Result<Vec<DeliveryOutcome>> {
            Ok(vec![DeliveryOutcome::Delivered])
        }
    }

    #[tokio::test]
    async fn test_deliver_rejects_mismatched_outcomes() {
        let devices = tokens(&["a", "b"]);
        let err = deliver(&ShortNotifier, &devices, "MHF4U1-01", "body")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Notification(_)));
    }

    #[tokio::test]
    async fn test_deliver_with_log_notifier_keeps_all_tokens() {
        let devices = tokens(&["a", "b"]);
        let surviving = deliver(&LogNotifier, &devices, "MHF4U1-01", "+: k Quiz 4/5 (1)")
            .await
            .unwrap();
        assert_eq!(surviving, devices);
    }
}
