//! Inbound request payload and wire error bodies.

use crate::os::Os;
use serde::{Deserialize, Serialize};

/// Raw ask payload as received from the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub device: String,
}

/// Structurally valid request, ready for the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRequest {
    pub issue: String,
    pub os: Os,
    pub device: String,
}

impl AskRequest {
    /// Check the payload shape; on failure return the offending field names.
    pub fn validate(&self) -> Result<ValidRequest, Vec<&'static str>> {
        let mut bad_fields = Vec::new();
        if self.issue.trim().is_empty() {
            bad_fields.push("issue");
        }
        let os = self.os.parse::<Os>();
        if os.is_err() {
            bad_fields.push("os");
        }
        if self.device.trim().is_empty() {
            bad_fields.push("device");
        }
        if !bad_fields.is_empty() {
            return Err(bad_fields);
        }
        Ok(ValidRequest {
            issue: self.issue.trim().to_string(),
            os: os.expect("checked above"),
            device: self.device.trim().to_string(),
        })
    }
}

impl ValidRequest {
    /// Canonical cache key for this request. Field order is fixed so two
    /// logically identical requests always produce byte-identical keys.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}",
            self.issue,
            self.os.as_str(),
            self.device
        )
    }
}

/// Structured error body returned to the caller. Never carries internal
/// error text or model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Offending payload fields, for input errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Seconds until the caller should retry, for admission errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            fields: None,
            retry_after_secs: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after_secs = Some(secs);
        self
    }
}

/// Non-error response shape used when the model needs one clarifying
/// question answered before it can produce a full answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClarificationBody {
    pub clarification: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(issue: &str, os: &str, device: &str) -> AskRequest {
        AskRequest {
            issue: issue.to_string(),
            os: os.to_string(),
            device: device.to_string(),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        let valid = request("My computer won't turn on", "Windows", "Desktop")
            .validate()
            .unwrap();
        assert_eq!(valid.os, Os::Windows);
        assert_eq!(valid.issue, "My computer won't turn on");
    }

    #[test]
    fn test_empty_issue_reports_field() {
        let err = request("   ", "Windows", "Desktop").validate().unwrap_err();
        assert_eq!(err, vec!["issue"]);
    }

    #[test]
    fn test_unknown_os_reports_field() {
        let err = request("Broken", "AmigaOS", "Desktop").validate().unwrap_err();
        assert_eq!(err, vec!["os"]);
    }

    #[test]
    fn test_all_bad_fields_reported() {
        let err = request("", "", "").validate().unwrap_err();
        assert_eq!(err, vec!["issue", "os", "device"]);
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = request("Wi-Fi drops", "Linux", "Laptop").validate().unwrap();
        let b = request("  Wi-Fi drops ", "linux", " Laptop").validate().unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_differs_per_field() {
        let a = request("Wi-Fi drops", "Linux", "Laptop").validate().unwrap();
        let b = request("Wi-Fi drops", "Linux", "Router").validate().unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
