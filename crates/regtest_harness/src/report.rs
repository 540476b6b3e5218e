use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub id: String,
    pub timestamp: String,
    pub source: SourceInfo,
    pub summary: ReportSummary,
    pub checks: Vec<CheckResult>,
}

impl ScenarioReport {
    pub fn new(
        id: impl Into<String>,
        source: SourceInfo,
        checks: Vec<CheckResult>,
        notes: impl Into<String>,
    ) -> Self {
        let (status, score) = summarize_checks(&checks);
        Self {
            id: id.into(),
            timestamp: Utc::now().to_rfc3339(),
            source,
            summary: ReportSummary {
                status,
                score,
                notes: notes.into(),
            },
            checks,
        }
    }

    /// One line for terminals and CI logs.
    pub fn one_line(&self) -> String {
        let failed = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count();
        format!(
            "{} {:?} score={:.2} checks={} failed={}",
            self.id,
            self.summary.status,
            self.summary.score,
            self.checks.len(),
            failed
        )
    }
}

fn summarize_checks(checks: &[CheckResult]) -> (ReportStatus, f32) {
    if checks.iter().any(|c| c.status == CheckStatus::Fail) {
        (ReportStatus::Fail, 0.0)
    } else if checks.iter().any(|c| c.status == CheckStatus::Warn) {
        (ReportStatus::Warn, 0.7)
    } else {
        (ReportStatus::Pass, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub scenarios_path: PathBuf,
    #[serde(default)]
    pub params_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub status: ReportStatus,
    pub score: f32,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Pass,
    Fail,
    Warn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub scenario: String,
    pub status: CheckStatus,
    pub details: String,
}

impl CheckResult {
    pub fn new(
        name: impl Into<String>,
        scenario: impl Into<String>,
        status: CheckStatus,
        details: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            scenario: scenario.into(),
            status,
            details: details.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceInfo {
        SourceInfo {
            scenarios_path: PathBuf::from("scenarios"),
            params_path: None,
        }
    }

    #[test]
    fn any_failure_fails_the_report() {
        let report = ScenarioReport::new(
            "run",
            source(),
            vec![
                CheckResult::new("replay", "a", CheckStatus::Pass, ""),
                CheckResult::new("reorg", "a", CheckStatus::Fail, "diverged"),
                CheckResult::new("invariants", "a", CheckStatus::Warn, ""),
            ],
            "",
        );
        assert_eq!(report.summary.status, ReportStatus::Fail);
        assert_eq!(report.summary.score, 0.0);
        assert!(report.one_line().ends_with("checks=3 failed=1"));
    }

    #[test]
    fn skipped_checks_still_pass() {
        let report = ScenarioReport::new(
            "run",
            source(),
            vec![CheckResult::new("reorg", "a", CheckStatus::Skipped, "")],
            "",
        );
        assert_eq!(report.summary.status, ReportStatus::Pass);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["checks"][0]["status"], "skipped");
    }
}
