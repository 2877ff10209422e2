use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of `GET /health/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub name: String,
    pub version: String,
}

/// Body of `GET /health/live`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Body of `GET /health/ready`. A 503 carries the same shape under `detail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(default)]
    pub checks: BTreeMap<String, String>,
}

impl ReadinessResponse {
    pub fn is_ready(&self) -> bool {
        self.status == "ready" && self.checks.values().all(|v| v == "ok")
    }

    /// Names of the checks that did not report `ok`.
    pub fn failing_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, v)| v.as_str() != "ok")
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReadinessDetail {
    pub detail: ReadinessResponse,
}

/// Decode a not-ready (503) body, which nests the report under `detail`.
pub fn parse_not_ready_body(body: &str) -> Option<ReadinessResponse> {
    serde_json::from_str::<ReadinessDetail>(body)
        .map(|d| d.detail)
        .or_else(|_| serde_json::from_str::<ReadinessResponse>(body))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_response() {
        let ready: ReadinessResponse = serde_json::from_str(
            r#"{"status": "ready", "checks": {"database": "ok", "storage": "ok"}}"#,
        )
        .unwrap();
        assert!(ready.is_ready());
        assert!(ready.failing_checks().is_empty());
    }

    #[test]
    fn test_not_ready_detail_body() {
        let body = r#"{"detail": {"status": "not_ready", "checks": {"database": "error: locked", "storage": "ok"}}}"#;
        let report = parse_not_ready_body(body).unwrap();
        assert!(!report.is_ready());
        assert_eq!(report.failing_checks(), vec!["database"]);
    }

    #[test]
    fn test_not_ready_unparseable_body() {
        assert!(parse_not_ready_body("Service Unavailable").is_none());
    }
}
