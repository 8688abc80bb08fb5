//! Report assembly and text rendering.

use std::fmt::Write;

use crate::pipeline::HorseAnalysis;
use crate::scoring::{round2, Ranked};
use crate::types::{HorseCard, RankedReport, ScoringMode};

/// Builds the ranked report from scored horses
pub struct ReportAssembler;

impl ReportAssembler {
    /// Assemble a report from horses already in ranking order
    pub fn assemble(
        race_id: &str,
        race_name: &str,
        mode: ScoringMode,
        ranked: Vec<Ranked<HorseAnalysis>>,
    ) -> RankedReport {
        let horses = ranked
            .into_iter()
            .enumerate()
            .map(|(i, r)| HorseCard {
                rank: i + 1,
                score: round2(r.score),
                entry_score: r.item.entry_score,
                condition_score: r.item.condition_score,
                features: r.item.features,
                past_runs: r.item.past_runs,
                narrative: r.item.narrative,
                error: r.item.error,
                entry: r.item.entry,
            })
            .collect();

        RankedReport {
            race_id: race_id.to_string(),
            title: Self::title(race_id, race_name),
            mode,
            horses,
        }
    }

    fn title(race_id: &str, race_name: &str) -> String {
        if race_name.is_empty() {
            format!("Race {}", race_id)
        } else {
            format!("{} ({})", race_name, race_id)
        }
    }
}

fn opt_num(value: Option<impl std::fmt::Display>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Render a report as a plain text table
pub fn render_text(report: &RankedReport) -> String {
    let mut out = String::new();
    let mode = match report.mode {
        ScoringMode::Condition => "condition",
        ScoringMode::Entry => "entry",
    };

    let _ = writeln!(out, "{}", report.title);
    let _ = writeln!(out, "Mode: {}", mode);
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  {:>2}  {:>2} {:>2}  {:<18} {:<8} {:>6} {:>7} {:>7} {:>7}",
        "#", "枠", "番", "馬名", "騎手", "単勝", "entry", "cond", "score"
    );

    for horse in &report.horses {
        let e = &horse.entry;
        let _ = writeln!(
            out,
            "  {:>2}  {:>2} {:>2}  {:<18} {:<8} {:>6} {:>7.2} {:>7} {:>7.2}",
            horse.rank,
            opt_num(e.post_group),
            opt_num(e.start_number),
            e.horse_name,
            e.jockey_name,
            opt_num(e.odds),
            horse.entry_score,
            horse
                .condition_score
                .map(|c| format!("{:.2}", c))
                .unwrap_or_else(|| "-".to_string()),
            horse.score,
        );

        if let Some(j) = &horse.narrative {
            if !j.strong.is_empty() {
                let _ = writeln!(out, "        強み: {}", j.strong);
            }
            if !j.weak.is_empty() {
                let _ = writeln!(out, "        弱み: {}", j.weak);
            }
            if !j.reason.is_empty() {
                let _ = writeln!(out, "        理由: {}", j.reason);
            }
            if !j.suitability.is_empty() {
                let _ = writeln!(out, "        適性: {}", j.suitability);
            }
        }
        if let Some(err) = &horse.error {
            let _ = writeln!(out, "        (!) {}", err);
        }
    }

    out
}
