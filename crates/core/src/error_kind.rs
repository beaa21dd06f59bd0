//! User-visible crawl failure categories and their classification.
//!
//! Any failure reaching the scheduler's retry path is classified exactly
//! once into an [`ErrorKind`]. The rules are ordered: not-found beats
//! maintenance beats network, and anything unmatched is `Unknown`.

use serde::{Deserialize, Serialize};

/// A classified crawl failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    CharacterNotFound,
    Maintenance,
    NetworkError,
    Unknown,
}

impl ErrorKind {
    /// Every kind, in reporting order.
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::CharacterNotFound,
        ErrorKind::Maintenance,
        ErrorKind::NetworkError,
        ErrorKind::Unknown,
    ];

    /// Stable code used in storage, cache keys and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::CharacterNotFound => "CHARACTER_NOT_FOUND",
            ErrorKind::Maintenance => "MAINTENANCE",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }

    /// Parse a stored code. Unrecognised codes map to `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "CHARACTER_NOT_FOUND" => ErrorKind::CharacterNotFound,
            "MAINTENANCE" => ErrorKind::Maintenance,
            "NETWORK_ERROR" => ErrorKind::NetworkError,
            _ => ErrorKind::Unknown,
        }
    }

    /// Fixed Korean message shown to end users.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::CharacterNotFound => {
                "캐릭터를 찾을 수 없습니다. 캐릭터 이름을 확인해 주세요."
            }
            ErrorKind::Maintenance => {
                "메이플스토리 서버 점검 중입니다. 점검 종료 후 다시 시도해 주세요."
            }
            ErrorKind::NetworkError => {
                "네트워크 오류가 발생했습니다. 잠시 후 다시 시도해 주세요."
            }
            ErrorKind::Unknown => "알 수 없는 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.",
        }
    }

    /// Whether a run failing with this kind is worth another attempt.
    ///
    /// A vendor 404 is terminal; retrying cannot make the character exist.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorKind::CharacterNotFound)
    }

    /// Classify a failure from the facts its origin could observe.
    pub fn classify(signal: &FailureSignal<'_>) -> Self {
        let lowered = signal.message.to_lowercase();

        if signal.http_status == Some(404)
            || lowered.contains("not found")
            || lowered.contains("404")
        {
            return ErrorKind::CharacterNotFound;
        }

        if signal.http_status == Some(503)
            || signal.message.contains("점검")
            || lowered.contains("maintenance")
        {
            return ErrorKind::Maintenance;
        }

        if signal.timed_out || signal.transport {
            return ErrorKind::NetworkError;
        }

        ErrorKind::Unknown
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable facts about a failure, gathered by whichever layer raised it.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureSignal<'a> {
    /// HTTP status returned by the upstream, if the failure had one.
    pub http_status: Option<u16>,
    /// The failure was a deadline expiry (REST, navigation or selector wait).
    pub timed_out: bool,
    /// The failure was a transport-level or generic client error.
    pub transport: bool,
    /// Human-readable message; matched by substring.
    pub message: &'a str,
}
