//! Plain-text risk report implementing ReportPort.
//!
//! Sections: run header, selection thresholds, positions per side, side
//! summary with budget usage and HHI, then skipped symbols, rejected
//! candidates and run flags.

use crate::adapters::ensure_parent_dir;
use crate::domain::error::NeutraderError;
use crate::domain::order::Side;
use crate::domain::pipeline::PipelineResult;
use crate::domain::summary::{AllocationSummary, SideSummary};
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Default)]
pub struct RiskReportAdapter;

impl RiskReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportPort for RiskReportAdapter {
    fn write(&self, result: &PipelineResult, output_path: &str) -> Result<(), NeutraderError> {
        let path = Path::new(output_path);
        ensure_parent_dir(path)?;
        fs::write(path, render(result))?;
        info!(path = output_path, "wrote risk report");
        Ok(())
    }
}

pub fn render(result: &PipelineResult) -> String {
    let mut output = String::new();

    output.push_str(&render_header(result));
    output.push_str(&render_selection(result));
    for side in [Side::Buy, Side::Sell] {
        output.push_str(&render_positions(result, side));
    }
    output.push_str(&render_exposure(&result.summary));

    if !result.skipped.is_empty() {
        let mut section = String::from("\nSKIPPED\n");
        for s in &result.skipped {
            section.push_str(&format!("  {:<8} {}\n", s.symbol, s.reason));
        }
        output.push_str(&section);
    }

    if !result.allocation.rejected.is_empty() {
        let mut section = String::from("\nREJECTED\n");
        for r in &result.allocation.rejected {
            section.push_str(&format!(
                "  {:<8} {:<4} score {:+.2}  {}\n",
                r.symbol, r.side, r.score, r.reason
            ));
        }
        output.push_str(&section);
    }

    if !result.flags.is_empty() {
        let mut section = String::from("\nFLAGS\n");
        for flag in &result.flags {
            section.push_str(&format!("  {}\n", flag));
        }
        output.push_str(&section);
    }

    output
}

fn render_header(result: &PipelineResult) -> String {
    let benchmark_date = result
        .benchmark_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "n/a".into());

    let mut output = format!("RISK REPORT {}\n", result.as_of);
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "Benchmark:     {} (row {}, return {:+.2}%)\n",
        result.benchmark_symbol,
        benchmark_date,
        result.scores.benchmark_return * 100.0
    ));
    output.push_str(&format!(
        "Generated:     {}\n",
        result.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("Total budget:  {:.2}\n", result.summary.total_budget));
    output.push_str(&format!("Side budget:   {:.2}\n", result.summary.side_budget));
    output.push('\n');
    output
}

fn render_selection(result: &PipelineResult) -> String {
    let selection = &result.selection;
    let mut output = String::from("SELECTION\n");
    output.push_str(&format!(
        "  scored {}  best {:+.2}  worst {:+.2}\n",
        result.scores.scores.len(),
        selection.best_score,
        selection.worst_score
    ));
    output.push_str(&format!(
        "  buy threshold {:+.2}  ({} before quality, {} after)\n",
        selection.buy_threshold,
        selection.buys_before_quality,
        selection.buys.len()
    ));
    output.push_str(&format!(
        "  sell threshold {:+.2}  ({} before quality, {} after)\n",
        selection.sell_threshold,
        selection.sells_before_quality,
        selection.sells.len()
    ));
    output.push('\n');
    output
}

fn render_positions(result: &PipelineResult, side: Side) -> String {
    let positions = result.allocation.positions(side);
    let mut output = format!("{} POSITIONS ({})\n", side, positions.len());
    if positions.is_empty() {
        output.push_str("  none\n");
    }
    for p in positions {
        output.push_str(&format!(
            "  {:<8} {:>8} @ {:>10.2}  exposure {:>12.2}  score {:+.2}  lot {}  orders {}\n",
            p.symbol,
            p.quantity,
            p.price,
            p.exposure,
            p.score,
            p.lot,
            p.orders.len()
        ));
    }
    output.push('\n');
    output
}

fn render_exposure(summary: &AllocationSummary) -> String {
    let mut output = String::from("EXPOSURE\n");
    output.push_str(&render_side(&summary.buy));
    output.push_str(&render_side(&summary.sell));
    output.push_str(&format!(
        "  gross {:.2}  net {:+.2}\n",
        summary.gross_exposure, summary.net_exposure
    ));
    if summary.single_sided {
        output.push_str("  WARNING: book is not market-neutral\n");
    }
    output
}

fn render_side(side: &SideSummary) -> String {
    let largest = side
        .largest
        .as_ref()
        .map(|l| {
            format!(
                "{} {:.2} ({:.1}% of budget)",
                l.symbol, l.exposure, l.share_of_budget
            )
        })
        .unwrap_or_else(|| "-".into());
    format!(
        "  {:<4} positions {:>3}  orders {:>3}  exposure {:>12.2}  usage {:>6.2}%  HHI {:>8.1}  largest {}\n",
        side.side, side.positions, side.orders, side.exposure, side.budget_usage, side.hhi, largest
    )
}
