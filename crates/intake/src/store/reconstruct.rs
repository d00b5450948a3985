//! Rebuild a request from the admin notification it was announced in.
//!
//! The process-local cache does not survive a restart, but the notification
//! does. Structured message metadata is tried first; the labeled fields of
//! the rendered text are the fallback. Either way the result is tagged
//! [`Provenance::Reconstructed`].

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use sape_core::{Provenance, Request, RequestId, RequestKind, RequestSnapshot, UserId};
use tracing::{debug, warn};

use crate::slack::InteractionMessage;
use crate::slack::messages::{LABEL_PROJECT, LABEL_REQUEST_ID, LABEL_REQUESTED_BY};

static REQUEST_ID_RE: LazyLock<Regex> = LazyLock::new(|| labeled(LABEL_REQUEST_ID, r"([A-Za-z]+-\d+)"));

static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| labeled(LABEL_PROJECT, r"([^\n*]+)"));

static REQUESTED_BY_RE: LazyLock<Regex> =
    LazyLock::new(|| labeled(LABEL_REQUESTED_BY, r"<@([A-Za-z0-9]+)>"));

/// `*Label:*` optionally followed by a newline, then the value pattern.
fn labeled(label: &str, value: &str) -> Regex {
    Regex::new(&format!(r"\*?{}:\*?\s*{value}", regex::escape(label))).expect("Invalid regex")
}

/// Rebuild the request announced by `message`.
///
/// When `expected` is given, a candidate for a different id is discarded.
#[must_use]
pub fn reconstruct(message: &InteractionMessage, expected: Option<&RequestId>) -> Option<Request> {
    let request = from_metadata(message).or_else(|| from_text(&message.display_text()))?;

    if let Some(expected) = expected {
        if &request.request_id != expected {
            warn!(
                expected = %expected,
                found = %request.request_id,
                "Reconstructed request id does not match the action"
            );
            return None;
        }
    }

    Some(request)
}

fn from_metadata(message: &InteractionMessage) -> Option<Request> {
    let metadata = message.metadata.as_ref()?;
    let kind = RequestKind::from_event_type(&metadata.event_type)?;

    match serde_json::from_value::<RequestSnapshot>(metadata.event_payload.clone()) {
        Ok(snapshot) => {
            let mut request = snapshot.into_request(kind);
            request.provenance = Provenance::Reconstructed;
            debug!(request_id = %request.request_id, "Reconstructed request from message metadata");
            Some(request)
        }
        Err(e) => {
            warn!(error = %e, "Message metadata does not hold a request snapshot");
            None
        }
    }
}

fn from_text(text: &str) -> Option<Request> {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    };

    let request_id = RequestId::parse(capture(&REQUEST_ID_RE)?).ok()?;
    let project_name = capture(&PROJECT_RE).filter(|p| !p.is_empty())?;
    let requested_by = UserId::parse(capture(&REQUESTED_BY_RE)?).ok()?;

    let kind = request_id.kind().unwrap_or(RequestKind::Pentest);
    let requested_at = request_id.timestamp().unwrap_or_else(Utc::now);

    let mut request = Request::new(request_id, kind, project_name, requested_by, requested_at);
    request.provenance = Provenance::Reconstructed;
    debug!(request_id = %request.request_id, "Reconstructed request from message text");
    Some(request)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::slack::MessageMetadata;

    fn id(value: &str) -> RequestId {
        RequestId::parse(value).expect("id")
    }

    #[test]
    fn test_from_metadata_snapshot() {
        let message = InteractionMessage {
            ts: "1700000000.000100".to_string(),
            metadata: Some(MessageMetadata {
                event_type: "pentest_request".to_string(),
                event_payload: json!({
                    "requestId": "PT-1000",
                    "projectName": "Foo",
                    "requestedBy": "U0000000001",
                    "targetScope": "https://foo.example"
                }),
            }),
            ..InteractionMessage::default()
        };

        let request = reconstruct(&message, Some(&id("PT-1000"))).expect("request");
        assert_eq!(request.request_id.as_str(), "PT-1000");
        assert_eq!(request.project_name, "Foo");
        assert_eq!(request.requested_by.as_str(), "U0000000001");
        assert_eq!(request.target_scope, "https://foo.example");
        assert_eq!(request.provenance, Provenance::Reconstructed);
    }

    #[test]
    fn test_from_rendered_fields() {
        let message = InteractionMessage {
            ts: "1700000000.000100".to_string(),
            text: "Ny pentest-forespørsel: Foo".to_string(),
            blocks: vec![json!({
                "type": "section",
                "fields": [
                    {"type": "mrkdwn", "text": "*Forespørsels-ID:*\nTM-1700000000000"},
                    {"type": "mrkdwn", "text": "*Forespurt av:*\n<@U0000000001>"},
                    {"type": "mrkdwn", "text": "*Prosjektnavn:*\nFoo Bar"}
                ]
            })],
            metadata: None,
        };

        let request = reconstruct(&message, None).expect("request");
        assert_eq!(request.request_id.as_str(), "TM-1700000000000");
        assert_eq!(request.kind, RequestKind::ThreatModeling);
        assert_eq!(request.project_name, "Foo Bar");
        assert_eq!(request.requested_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_mismatched_id_is_discarded() {
        let message = InteractionMessage {
            text: "*Forespørsels-ID:* PT-1 *Prosjektnavn:* Foo *Forespurt av:* <@U0000000001>"
                .to_string(),
            ..InteractionMessage::default()
        };
        assert!(reconstruct(&message, Some(&id("PT-2"))).is_none());
        assert!(reconstruct(&message, Some(&id("PT-1"))).is_some());
    }

    #[test]
    fn test_missing_fields_yield_nothing() {
        let message = InteractionMessage {
            text: "*Forespørsels-ID:*\nPT-1000".to_string(),
            ..InteractionMessage::default()
        };
        assert!(reconstruct(&message, None).is_none());
    }
}
