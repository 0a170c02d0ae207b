//! # Error Classifier
//!
//! Decides whether a strategy failure looks like a dead signed link. The
//! answer only gates the single fresh-link retry; it never changes which
//! strategies are tried.

use crate::error::FailureKind;
use bridge_traits::error::BridgeError;

/// `Forbidden`, `NotFound` and `Network` failures are treated as a dead link.
pub fn is_link_expired(kind: FailureKind) -> bool {
    match kind {
        FailureKind::Forbidden | FailureKind::NotFound | FailureKind::Network => true,
        FailureKind::Decode
        | FailureKind::PlayBlocked
        | FailureKind::Timeout
        | FailureKind::Other => false,
    }
}

/// Map an HTTP status code to a failure kind.
pub fn kind_from_status(status: u16) -> FailureKind {
    match status {
        401 | 403 => FailureKind::Forbidden,
        404 | 410 => FailureKind::NotFound,
        408 | 429 | 500..=599 => FailureKind::Network,
        _ => FailureKind::Other,
    }
}

/// Heuristic for hosts that only report free text.
///
/// A lone `"4"` is the media-element code for an unsupported or missing
/// source.
pub fn classify_message(message: &str) -> FailureKind {
    let trimmed = message.trim();
    if trimmed.contains("403") || trimmed.contains("Forbidden") {
        FailureKind::Forbidden
    } else if trimmed.contains("404") || trimmed.contains("Not Found") || trimmed == "4" {
        FailureKind::NotFound
    } else if trimmed.contains("network") || trimmed.contains("Network") {
        FailureKind::Network
    } else if trimmed.contains("timed out") {
        FailureKind::Timeout
    } else {
        FailureKind::Other
    }
}

/// Classify an error surfaced by a host bridge.
pub fn classify_bridge_error(error: &BridgeError) -> FailureKind {
    match error {
        BridgeError::HttpStatus { status, .. } => kind_from_status(*status),
        BridgeError::NotFound(_) => FailureKind::NotFound,
        BridgeError::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => FailureKind::Timeout,
        BridgeError::Io(_) => FailureKind::Network,
        BridgeError::OperationFailed(message) => classify_message(message),
        BridgeError::Serialization(_) | BridgeError::NotAvailable(_) => FailureKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_expired_kinds() {
        assert!(is_link_expired(FailureKind::Forbidden));
        assert!(is_link_expired(FailureKind::NotFound));
        assert!(is_link_expired(FailureKind::Network));
        assert!(!is_link_expired(FailureKind::Decode));
        assert!(!is_link_expired(FailureKind::PlayBlocked));
        assert!(!is_link_expired(FailureKind::Timeout));
    }

    #[test]
    fn status_codes() {
        assert_eq!(kind_from_status(401), FailureKind::Forbidden);
        assert_eq!(kind_from_status(410), FailureKind::NotFound);
        assert_eq!(kind_from_status(503), FailureKind::Network);
        assert_eq!(kind_from_status(429), FailureKind::Network);
        assert_eq!(kind_from_status(400), FailureKind::Other);
    }

    #[test]
    fn free_text_heuristic() {
        assert_eq!(classify_message("GET failed: 403"), FailureKind::Forbidden);
        assert_eq!(classify_message("Forbidden"), FailureKind::Forbidden);
        assert_eq!(classify_message("404 Not Found"), FailureKind::NotFound);
        assert_eq!(classify_message(" 4 "), FailureKind::NotFound);
        assert_eq!(
            classify_message("Network connection failed"),
            FailureKind::Network
        );
        assert_eq!(classify_message("Request timed out"), FailureKind::Timeout);
        assert_eq!(classify_message("NotAllowedError"), FailureKind::Other);
    }

    #[test]
    fn bridge_errors() {
        assert_eq!(
            classify_bridge_error(&BridgeError::http_status(404, "gone")),
            FailureKind::NotFound
        );
        assert_eq!(
            classify_bridge_error(&BridgeError::NotFound("tts/a.mp3".into())),
            FailureKind::NotFound
        );
        assert_eq!(
            classify_bridge_error(&BridgeError::OperationFailed(
                "Network error: connection reset".into()
            )),
            FailureKind::Network
        );
        assert_eq!(
            classify_bridge_error(&BridgeError::Serialization("bad".into())),
            FailureKind::Other
        );
    }
}
