//! Run reporting: the formatted terminal summary for a batch run.
//!
//! We keep formatting code in one place so:
//! - the estimation code stays clean and testable
//! - output changes are localized (important for future snapshot tests)
//!
//! A run never ends in silent partial success: processed, skipped, and
//! zero-priced counts are always part of the summary.

use crate::app::pipeline::RunOutput;
use crate::domain::{PricingConfig, Strategy};

/// Cap on how many per-record problems we list in full.
const MAX_LISTED_ERRORS: usize = 20;

/// Format the full run summary.
pub fn format_run_summary(out: &RunOutput, config: &PricingConfig) -> String {
    let mut text = String::new();

    text.push_str("=== fares - Synthetic Price Estimation ===\n");
    text.push_str(&format!("Store : {}\n", config.store_dir.display()));
    text.push_str(&format!("Catalog: {}\n", config.catalog_path.display()));
    text.push_str(&format!("As-of : {}\n", config.as_of));
    text.push_str(&format!("Strategy: {}\n", strategy_label(config.strategy)));

    if let Some((n_obs, rmse)) = out.model_stats {
        text.push_str(&format!(
            "Model : regression fitted on {n_obs} labeled routes (rmse {rmse:.2})\n"
        ));
    }
    if let Some(reason) = &out.fallback_reason {
        text.push_str(&format!(
            "Model : fell back to rule-based estimation ({reason})\n"
        ));
    }

    let s = &out.summary;
    text.push_str(&format!(
        "\nRecords: read={} (labeled={}) estimated={} skipped={} failed={} zero-priced={}\n",
        s.rows_read, s.labeled_rows, s.estimated, s.rows_skipped, s.estimate_failures, s.zero_priced
    ));
    if s.cancelled > 0 {
        text.push_str(&format!("Cancelled before estimation: {}\n", s.cancelled));
    }
    if s.persist_failures > 0 {
        text.push_str(&format!("Catalog writes rejected: {}\n", s.persist_failures));
    }

    if !out.row_errors.is_empty() {
        text.push_str("\nSkipped rows:\n");
        for row in out.row_errors.iter().take(MAX_LISTED_ERRORS) {
            match &row.key {
                Some(key) => {
                    text.push_str(&format!("- line {} [{}]: {}\n", row.line, key, row.message));
                }
                None => text.push_str(&format!("- line {}: {}\n", row.line, row.message)),
            }
        }
        if out.row_errors.len() > MAX_LISTED_ERRORS {
            text.push_str(&format!(
                "  (+{} more)\n",
                out.row_errors.len() - MAX_LISTED_ERRORS
            ));
        }
    }

    if !out.estimate_errors.is_empty() {
        text.push_str("\nFailed estimates:\n");
        for (key, message) in out.estimate_errors.iter().take(MAX_LISTED_ERRORS) {
            text.push_str(&format!("- {key}: {message}\n"));
        }
        if out.estimate_errors.len() > MAX_LISTED_ERRORS {
            text.push_str(&format!(
                "  (+{} more)\n",
                out.estimate_errors.len() - MAX_LISTED_ERRORS
            ));
        }
    }

    if !out.persist_errors.is_empty() {
        text.push_str("\nRejected catalog writes:\n");
        for (key, message) in out.persist_errors.iter().take(MAX_LISTED_ERRORS) {
            text.push_str(&format!("- {key}: {message}\n"));
        }
    }

    text
}

fn strategy_label(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::RuleBased => "rule-based",
        Strategy::Regression => "regression",
        Strategy::Both => "regression with rule-based fallback",
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;
    use crate::app::pipeline::{RunOutput, RunSummary};
    use crate::domain::Weights;
    use crate::io::ingest::RowError;

    fn test_output() -> RunOutput {
        RunOutput {
            estimates: Vec::new(),
            row_errors: vec![RowError {
                line: 3,
                key: Some("OSL-TRD".to_string()),
                message: "Invalid duration '9.99'".to_string(),
            }],
            estimate_errors: Vec::new(),
            persist_errors: Vec::new(),
            model_stats: Some((24, 13.5)),
            fallback_reason: None,
            summary: RunSummary {
                rows_read: 10,
                rows_skipped: 1,
                labeled_rows: 4,
                estimated: 9,
                estimate_failures: 0,
                zero_priced: 2,
                cancelled: 0,
                persist_failures: 0,
            },
        }
    }

    fn test_config() -> PricingConfig {
        PricingConfig {
            store_dir: PathBuf::from("store"),
            catalog_path: PathBuf::from("catalog.json"),
            strategy: Strategy::Regression,
            as_of: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
            base_price_per_minute: 1.15,
            calibration_divisor: 1.4,
            duration_threshold: 80,
            log_k: 50.0,
            weights: Weights::default(),
            short_notice_multiplier: 1.0,
            rescale: 0.85,
            offset: 12.0,
            brackets: Vec::new(),
            seed: 42,
            jitter_enabled: true,
        }
    }

    #[test]
    fn summary_always_reports_the_core_counts() {
        let text = format_run_summary(&test_output(), &test_config());
        assert!(text.contains("read=10"));
        assert!(text.contains("estimated=9"));
        assert!(text.contains("skipped=1"));
        assert!(text.contains("zero-priced=2"));
        assert!(text.contains("regression fitted on 24"));
        assert!(text.contains("line 3 [OSL-TRD]"));
    }
}
