//! Error translation
//!
//! Turns any [`RawFailure`] into a canonical [`BridgeError`]. Resolution is an
//! ordered chain of recognizers; the first one returning `Some` wins:
//!
//! 1. already canonical (pass-through)
//! 2. structured `{error, code, details?}` payload, as an object, as JSON
//!    text, or embedded inside a longer message
//! 3. process exit descriptor
//! 4. generic error message, classified by known substrings
//! 5. bare string
//! 6. anything else
//!
//! Translation is total: the last recognizer always matches.

use crate::error::{BridgeError, ErrorCode, ProcessFailure, RawFailure};
use serde_json::{Map, Value};

type Recognizer = fn(&RawFailure) -> Option<BridgeError>;

const RECOGNIZERS: &[Recognizer] = &[
    recognize_canonical,
    recognize_structured,
    recognize_process,
    recognize_message,
    recognize_bare_string,
    recognize_anything,
];

const UNKNOWN_MESSAGE: &str = "An unknown error occurred";

/// Translate any failure value into a canonical error
pub fn translate(raw: impl Into<RawFailure>) -> BridgeError {
    translate_ref(&raw.into())
}

/// Translate a borrowed failure value
pub fn translate_ref(raw: &RawFailure) -> BridgeError {
    RECOGNIZERS
        .iter()
        .find_map(|recognize| recognize(raw))
        .unwrap_or_else(|| BridgeError::new(ErrorCode::UnknownError, UNKNOWN_MESSAGE))
}

/// Translate, then compare the resulting code
pub fn is_error_code(raw: impl Into<RawFailure>, code: &ErrorCode) -> bool {
    translate(raw).is(code)
}

/// Translate, then rephrase well-known codes for end users
pub fn user_message(raw: impl Into<RawFailure>) -> String {
    let err = translate(raw);
    let friendly = match &err.code {
        ErrorCode::PackageNotFound => Some("The requested package could not be found."),
        ErrorCode::PermissionDenied => Some(
            "You do not have permission to perform this action. Administrator access is required.",
        ),
        ErrorCode::Locked => Some(
            "The package manager is currently in use by another process. Please wait and try again.",
        ),
        ErrorCode::CacheError => {
            Some("The package cache could not be read. Try refreshing the package lists.")
        }
        ErrorCode::Timeout => Some("The operation took too long and was stopped."),
        ErrorCode::Other(code) if code == "DISK_FULL" => {
            Some("There is not enough free disk space to complete the operation.")
        }
        ErrorCode::Other(code) if code == "ESSENTIAL_PACKAGE" => {
            Some("This package is essential to the system and cannot be removed.")
        }
        ErrorCode::Other(code) if code == "NETWORK_ERROR" => {
            Some("The package repositories could not be reached. Check your network connection.")
        }
        _ => None,
    };
    friendly.map(str::to_string).unwrap_or(err.message)
}

/// Check whether an error describes a held package-manager lock.
///
/// Process failures keep the `COMMAND_FAILED` code, so the message and
/// details are inspected as well.
pub fn is_lock_error(err: &BridgeError) -> bool {
    if err.is(&ErrorCode::Locked) {
        return true;
    }
    classify_text(&err.message) == Some(ErrorCode::Locked)
        || err
            .details
            .as_deref()
            .is_some_and(|d| classify_text(d) == Some(ErrorCode::Locked))
}

/// Classify free text by well-known substrings (case-insensitive)
pub(crate) fn classify_text(text: &str) -> Option<ErrorCode> {
    let lower = text.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["not found", "no such package", "unable to locate package"]) {
        Some(ErrorCode::PackageNotFound)
    } else if has(&["permission denied", "not authorized", "are you root"]) {
        Some(ErrorCode::PermissionDenied)
    } else if has(&["unable to lock", "could not get lock", "lock"]) {
        // apt lock files live under /var/cache and /var/lib/dpkg, so lock
        // wording is checked before the broader "cache" match
        Some(ErrorCode::Locked)
    } else if has(&["cache"]) {
        Some(ErrorCode::CacheError)
    } else {
        None
    }
}

fn recognize_canonical(raw: &RawFailure) -> Option<BridgeError> {
    match raw {
        RawFailure::Canonical(err) => Some(err.clone()),
        _ => None,
    }
}

fn recognize_structured(raw: &RawFailure) -> Option<BridgeError> {
    match raw {
        RawFailure::Value(Value::Object(map)) => payload_from_object(map),
        RawFailure::Value(Value::String(s)) => payload_from_text(s),
        RawFailure::Message(m) => payload_from_text(m),
        RawFailure::Process(p) => payload_from_text(&p.stderr)
            .or_else(|| p.reason.as_deref().and_then(payload_from_text)),
        _ => None,
    }
}

fn recognize_process(raw: &RawFailure) -> Option<BridgeError> {
    let RawFailure::Process(failure) = raw else {
        return None;
    };
    Some(process_error(failure))
}

fn recognize_message(raw: &RawFailure) -> Option<BridgeError> {
    let message = match raw {
        RawFailure::Message(m) => m.as_str(),
        RawFailure::Value(Value::Object(map)) => map.get("message")?.as_str()?,
        _ => return None,
    };
    let code = classify_text(message).unwrap_or(ErrorCode::CommandFailed);
    Some(BridgeError::new(code, message))
}

fn recognize_bare_string(raw: &RawFailure) -> Option<BridgeError> {
    match raw {
        RawFailure::Value(Value::String(s)) => {
            Some(BridgeError::new(ErrorCode::UnknownError, s.clone()).with_details(s.clone()))
        }
        _ => None,
    }
}

fn recognize_anything(raw: &RawFailure) -> Option<BridgeError> {
    let details = match raw {
        RawFailure::Value(v) => v.to_string(),
        other => format!("{:?}", other),
    };
    Some(BridgeError::new(ErrorCode::UnknownError, UNKNOWN_MESSAGE).with_details(details))
}

fn payload_from_object(map: &Map<String, Value>) -> Option<BridgeError> {
    let message = map.get("error")?.as_str()?;
    let code = map.get("code")?.as_str()?;
    let details = match map.get("details") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };
    Some(BridgeError {
        message: message.to_string(),
        code: ErrorCode::from_wire(code),
        details,
    })
}

/// Try the whole text as JSON first, then the outermost `{...}` span
fn payload_from_text(text: &str) -> Option<BridgeError> {
    let trimmed = text.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        if let Some(err) = payload_from_object(&map) {
            return Some(err);
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if start >= end {
        return None;
    }
    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(map)) => payload_from_object(&map),
        _ => None,
    }
}

fn process_error(failure: &ProcessFailure) -> BridgeError {
    let status = match (failure.exit_status, failure.signal) {
        (Some(code), _) => Some(format!("exit code {}", code)),
        (None, Some(signal)) => Some(format!("signal {}", signal)),
        (None, None) => None,
    };

    let reason = failure
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let stderr = Some(failure.stderr.trim()).filter(|s| !s.is_empty());

    let message = match (reason, stderr, &status) {
        (Some(reason), _, _) => reason.to_string(),
        (None, Some(stderr), _) => stderr.to_string(),
        (None, None, Some(status)) => format!("Command failed with {}", status),
        (None, None, None) => "Command failed".to_string(),
    };

    let err = BridgeError::new(ErrorCode::CommandFailed, message);
    match status {
        Some(status) => err.with_details(status),
        None => err,
    }
}
