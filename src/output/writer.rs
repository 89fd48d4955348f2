//! Persists loop outcomes under `<output_dir>/<TICKER>/`.
//!
//! Accepted posts go to `<date>-<platform>.txt` behind a short metadata
//! header. Failure reports go to `<date>-<platform>.failed.json`.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use log::info;

use crate::content::{FailureReport, FinalArtifact, LoopOutcome, Platform};
use crate::error::Result;
use crate::id::fingerprint;

/// Separates the metadata header from the post body
pub const HEADER_END: &str = "---";

pub struct ArtifactWriter {
    output_dir: PathBuf,
    date: NaiveDate,
}

impl ArtifactWriter {
    /// Writer stamping files with today's local date
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            date: Local::now().date_naive(),
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = date;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn write(&self, outcome: &LoopOutcome) -> Result<PathBuf> {
        match outcome {
            LoopOutcome::Accepted(artifact) => self.write_artifact(artifact),
            LoopOutcome::Failed(report) => self.write_failure(report),
        }
    }

    pub fn write_artifact(&self, artifact: &FinalArtifact) -> Result<PathBuf> {
        let path = self.path_for(&artifact.ticker, artifact.platform, "txt")?;
        fs::write(&path, render_artifact(artifact))?;
        info!("Wrote {} artifact to {}", artifact.platform, path.display());
        Ok(path)
    }

    pub fn write_failure(&self, report: &FailureReport) -> Result<PathBuf> {
        let path = self.path_for(&report.ticker, report.platform, "failed.json")?;
        fs::write(&path, serde_json::to_string_pretty(report)?)?;
        info!("Wrote {} failure report to {}", report.platform, path.display());
        Ok(path)
    }

    fn path_for(&self, ticker: &str, platform: Platform, extension: &str) -> Result<PathBuf> {
        let dir = self.output_dir.join(ticker.to_uppercase());
        fs::create_dir_all(&dir)?;
        Ok(dir.join(format!("{}-{}.{}", self.date.format("%Y-%m-%d"), platform, extension)))
    }
}

/// Metadata header, separator, then the publishable body
pub fn render_artifact(artifact: &FinalArtifact) -> String {
    let body = artifact.candidate.body();
    let mut out = String::new();
    let _ = writeln!(out, "ticker: {}", artifact.ticker.to_uppercase());
    let _ = writeln!(out, "platform: {}", artifact.platform);
    let _ = writeln!(out, "run_id: {}", artifact.run_id);
    let _ = writeln!(out, "strategy: {}", artifact.candidate.strategy());
    let _ = writeln!(out, "rounds: {}", artifact.rounds);
    let _ = writeln!(out, "score: {:.2}", artifact.score.weighted);
    let _ = writeln!(out, "length: {}", artifact.measured_length);
    let _ = writeln!(out, "sha256: {}", fingerprint(&body));
    if !artifact.warnings.is_empty() {
        let reasons: Vec<&str> = artifact
            .warnings
            .iter()
            .flat_map(|w| w.reasons.iter().map(String::as_str))
            .collect();
        let _ = writeln!(out, "warnings: {}", reasons.join("; "));
    }
    let _ = writeln!(out, "{}", HEADER_END);
    out.push_str(&body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::{CheckResult, FailureCategory, FailureDetail, RoundFeedback, RoundStage, Severity};
    use crate::content::{Candidate, FailureKind};
    use crate::evaluator::{QualityScore, Rubric};
    use tempfile::TempDir;

    fn artifact() -> FinalArtifact {
        FinalArtifact {
            run_id: "twitter-tsm-1-abcd".to_string(),
            platform: Platform::Twitter,
            ticker: "tsm".to_string(),
            candidate: Candidate::text(2, "single_pass", "Wafer revenue grew.\nData: https://x"),
            rounds: 2,
            score: QualityScore::uniform(&Rubric::default(), 4.0),
            measured_length: 5,
            warnings: vec![
                CheckResult::fail("fabrication", FailureCategory::Fabrication, "number 42 does not appear in the source")
                    .with_severity(Severity::Warn),
            ],
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn test_render_header() {
        let text = render_artifact(&artifact());
        let (header, body) = text.split_once(&format!("{}\n", HEADER_END)).unwrap();
        assert!(header.starts_with("ticker: TSM\nplatform: twitter\n"));
        assert!(header.contains("rounds: 2\n"));
        assert!(header.contains("score: 4.00\n"));
        assert!(header.contains("warnings: number 42 does not appear in the source\n"));
        assert!(header.contains(&format!("sha256: {}\n", fingerprint("Wafer revenue grew.\nData: https://x"))));
        assert_eq!(body, "Wafer revenue grew.\nData: https://x\n");
    }

    #[test]
    fn test_write_artifact_path() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path()).with_date(date());
        let path = writer.write(&LoopOutcome::Accepted(artifact())).unwrap();
        assert_eq!(path, dir.path().join("TSM").join("2025-03-14-twitter.txt"));
        assert!(fs::read_to_string(&path).unwrap().contains("Wafer revenue grew."));
    }

    #[test]
    fn test_write_failure_report_as_json() {
        let dir = TempDir::new().unwrap();
        let report = FailureReport {
            run_id: "xueqiu-tsm-1-abcd".to_string(),
            platform: Platform::Xueqiu,
            ticker: "TSM".to_string(),
            kind: FailureKind::QualityThresholdNotMet,
            rounds: 3,
            best: None,
            history: vec![RoundFeedback::fail(
                1,
                RoundStage::Checks,
                vec![FailureDetail::new(FailureCategory::Length, "too short: 900 characters (required 2000-5000)")],
                12,
            )],
            summary: "Round 1 (checks): 1 issue(s) in length".to_string(),
        };
        let path = ArtifactWriter::new(dir.path()).with_date(date()).write_failure(&report).unwrap();
        assert_eq!(path, dir.path().join("TSM").join("2025-03-14-xueqiu.failed.json"));

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["kind"], "quality_threshold_not_met");
        assert_eq!(value["rounds"], 3);
        assert_eq!(value["history"][0]["failures"][0]["category"], "length");
    }
}
