//! Run results and their text rendering

use crate::analysis::{AnalysisResult, AnalysisStage};
use crate::error::Result;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Outcome for one ticker
#[derive(Debug, Clone, Serialize)]
pub struct TickerReport {
    pub ticker: String,
    /// Every stage entered, in order
    pub stages: Vec<AnalysisStage>,
    pub result: AnalysisResult,
    /// Overlay trace names drawn on the chart
    pub overlays: Vec<String>,
    #[serde(skip)]
    pub chart_png: Option<Vec<u8>>,
}

impl TickerReport {
    pub fn final_stage(&self) -> AnalysisStage {
        self.stages.last().copied().unwrap_or(AnalysisStage::Idle)
    }
}

/// Everything a run produced
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Tickers that were skipped, one message each
    pub warnings: Vec<String>,
    pub tickers: Vec<TickerReport>,
}

impl RunReport {
    pub fn get(&self, ticker: &str) -> Option<&TickerReport> {
        self.tickers.iter().find(|t| t.ticker == ticker)
    }

    pub fn error_count(&self) -> usize {
        self.tickers.iter().filter(|t| t.result.is_error()).count()
    }

    /// Overall summary, one row per analysed ticker
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Stock", "Recommendation"]);
        for report in &self.tickers {
            table.add_row(vec![report.ticker.as_str(), report.result.summary_label()]);
        }
        table
    }

    /// Per-ticker analysis text
    pub fn render_details(&self) -> String {
        let mut out = String::new();
        for report in &self.tickers {
            out.push_str(&format!("## Analysis for {}\n\n", report.ticker));
            if !report.overlays.is_empty() {
                out.push_str(&format!("Overlays: {}\n\n", report.overlays.join(", ")));
            }
            if let Some(action) = report.result.action() {
                out.push_str(&format!("**Recommendation:** {action}\n\n"));
            }
            out.push_str("**Detailed Justification:**\n\n");
            out.push_str(report.result.detail());
            out.push_str("\n\n");
        }
        out
    }

    /// Write each rendered chart as `<TICKER>.png` under `dir`
    pub fn save_charts(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for report in &self.tickers {
            if let Some(png) = &report.chart_png {
                let path = dir.join(format!("{}.png", report.ticker));
                std::fs::write(&path, png)?;
                written.push(path);
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Action, Recommendation};

    fn report(ticker: &str, result: AnalysisResult, chart: Option<Vec<u8>>) -> TickerReport {
        TickerReport {
            ticker: ticker.to_string(),
            stages: vec![AnalysisStage::Idle, AnalysisStage::Displayed],
            result,
            overlays: vec!["SMA (20)".to_string()],
            chart_png: chart,
        }
    }

    fn run_report() -> RunReport {
        RunReport {
            warnings: vec!["Data not available for BADTICKER: no rows".to_string()],
            tickers: vec![
                report(
                    "AAPL",
                    AnalysisResult::Structured(Recommendation::new(Action::StrongBuy, "")),
                    Some(vec![1, 2, 3]),
                ),
                report("MSFT", AnalysisResult::error("Analysis request failed: reset"), None),
                report("GOOG", AnalysisResult::free_text("Sideways."), Some(vec![4])),
            ],
        }
    }

    #[test]
    fn test_summary_table() {
        let rendered = run_report().summary_table().to_string();
        assert!(rendered.contains("Stock"));
        assert!(rendered.contains("Recommendation"));
        assert!(rendered.contains("Strong Buy"));
        assert!(rendered.contains("Error"));
        assert!(rendered.contains("N/A"));
    }

    #[test]
    fn test_details_fill_missing_justification() {
        let details = run_report().render_details();
        assert!(details.contains("## Analysis for AAPL"));
        assert!(details.contains("No justification provided."));
        assert!(details.contains("Sideways."));
    }

    #[test]
    fn test_error_count_and_lookup() {
        let report = run_report();
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.get("GOOG").unwrap().final_stage(), AnalysisStage::Displayed);
        assert!(report.get("BADTICKER").is_none());
    }

    #[test]
    fn test_save_charts() {
        let dir = tempfile::tempdir().unwrap();
        let written = run_report().save_charts(&dir.path().join("charts")).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(std::fs::read(&written[0]).unwrap(), vec![1, 2, 3]);
        assert!(written[1].ends_with("GOOG.png"));
    }

    #[test]
    fn test_json_omits_chart_bytes() {
        let json = serde_json::to_value(run_report()).unwrap();
        assert!(json["tickers"][0].get("chart_png").is_none());
        assert_eq!(json["tickers"][0]["result"]["action"], "Strong Buy");
        assert_eq!(json["tickers"][2]["result"]["mode"], "free-text");
    }
}
