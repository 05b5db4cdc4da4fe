use std::fmt::Write;

use crate::alert::AlertDetail;
use crate::campaign;
use crate::models::{CampaignSummary, Dataset, Row};
use crate::schema::{Column, SchemaCapabilities};
use crate::session::{Selection, Session};
use crate::tier::{self, AlertTier};

pub fn format_amount(value: Option<f64>) -> String {
    match value {
        Some(v) => with_thousands(v.round() as i64),
        None => "n/a".to_string(),
    }
}

pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "n/a".to_string(),
    }
}

fn with_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn cell(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

/// Table of rows coloured by tier, restricted to the columns the sheet has.
pub fn tier_table(dataset: &Dataset, caps: &SchemaCapabilities) -> String {
    let mut output = String::new();
    if !dataset.derived.roas {
        let _ = writeln!(output, "ROAS could not be calculated. Check column names.");
        return output;
    }

    let mut headers: Vec<&str> = Vec::new();
    for column in [Column::CampaignName, Column::Category, Column::Spend, Column::Revenue] {
        if caps.has(column) {
            headers.push(column.header());
        }
    }
    headers.push("ROAS");
    if dataset.derived.cpa {
        headers.push("CPA");
    }
    headers.push("tier");

    let _ = writeln!(output, "| {} |", headers.join(" | "));
    let _ = writeln!(output, "|{}", " --- |".repeat(headers.len()));
    for row in &dataset.rows {
        let _ = writeln!(output, "| {} |", row_cells(row, caps, dataset).join(" | "));
    }
    output
}

fn row_cells(row: &Row, caps: &SchemaCapabilities, dataset: &Dataset) -> Vec<String> {
    let mut cells = Vec::new();
    if caps.campaign_name {
        cells.push(cell(row.campaign_name.as_deref()).to_string());
    }
    if caps.category {
        cells.push(cell(row.category.as_deref()).to_string());
    }
    if caps.spend {
        cells.push(format_amount(row.spend));
    }
    if caps.revenue {
        cells.push(format_amount(row.revenue));
    }
    cells.push(format_ratio(row.roas));
    if dataset.derived.cpa {
        cells.push(format_ratio(row.cpa));
    }
    cells.push(row.tier().map(|t| t.label()).unwrap_or("-").to_string());
    cells
}

pub fn summary_section(summary: &CampaignSummary) -> String {
    let mut output = String::new();
    if !summary.is_found() {
        let _ = writeln!(
            output,
            "No rows found for campaign '{}'.",
            summary.campaign_name
        );
        return output;
    }

    let _ = writeln!(output, "- Rows: {}", summary.row_count);
    let _ = writeln!(output, "- Total spend: {}", format_amount(summary.total_spend));
    let _ = writeln!(output, "- Total revenue: {}", format_amount(summary.total_revenue));
    let _ = writeln!(output, "- Average ROAS: {}", format_ratio(summary.average_roas));
    output
}

pub fn trend_section(summary: &CampaignSummary) -> String {
    let mut output = String::new();
    match &summary.trend {
        None => {
            let _ = writeln!(output, "Cannot plot trend - missing c_date or ROAS.");
        }
        Some(points) if points.is_empty() => {
            let _ = writeln!(output, "No dated rows to plot.");
        }
        Some(points) => {
            for point in points {
                // Undefined points stay in the series but are not plotted.
                let value = point
                    .roas
                    .map(|v| format!("{v:.2}"))
                    .unwrap_or_else(|| "gap".to_string());
                let _ = writeln!(output, "- {}: {}", point.date, value);
            }
        }
    }
    if summary.excluded_trend_points > 0 {
        let _ = writeln!(
            output,
            "({} row(s) without a usable date omitted)",
            summary.excluded_trend_points
        );
    }
    output
}

pub fn alert_section(detail: &AlertDetail) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Alert details: `{}`", detail.campaign_name);
    let _ = writeln!(output);
    let _ = writeln!(output, "- Total spend: €{}", format_amount(detail.total_spend));
    let _ = writeln!(output, "- Total revenue: €{}", format_amount(detail.total_revenue));
    let _ = writeln!(
        output,
        "- ROAS: {:.2} (below target {:.1})",
        detail.average_roas,
        tier::RED_BELOW
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Recommended actions:");
    for (index, action) in detail.actions.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", index + 1, action.description());
    }
    output
}

pub fn selection_section(selection: &Selection) -> String {
    match selection {
        Selection::NoCampaignSelected => {
            "Select a campaign above to view alert details.\n".to_string()
        }
        Selection::Normal { summary } if !summary.is_found() => {
            format!("Campaign '{}' not found; no alert to show.\n", summary.campaign_name)
        }
        Selection::Normal { summary } if summary.average_roas.is_none() => format!(
            "Average ROAS for '{}' is not computable; no alert to show.\n",
            summary.campaign_name
        ),
        Selection::Normal { .. } => format!(
            "The selected campaign is not a red alert (ROAS ≥ {:.1}), so no critical popup is shown.\n",
            tier::RED_BELOW
        ),
        Selection::Alert { detail, .. } => alert_section(detail),
    }
}

/// Machine-readable view of the derived dataset: schema, notices, rows and
/// the tier of each row.
pub fn metrics_json(session: &Session) -> serde_json::Value {
    let tiers: Vec<serde_json::Value> = session
        .dataset
        .rows
        .iter()
        .map(|row| {
            let tier = row.tier();
            serde_json::json!({
                "tier": tier,
                "background": tier.map(AlertTier::background_hex),
            })
        })
        .collect();
    serde_json::json!({
        "session": session.id,
        "schema": session.caps,
        "notices": session.notices.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "dataset": session.dataset,
        "tiers": tiers,
    })
}

pub fn build_report(session: &Session) -> String {
    let dataset = &session.dataset;
    let caps = &session.caps;
    let mut output = String::new();

    let _ = writeln!(output, "# Marketing Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} rows across {} campaigns",
        dataset.rows.len(),
        campaign::campaign_names(dataset).len()
    );
    let _ = writeln!(output);

    let _ = writeln!(output, "## Columns");
    for (column, present) in caps.presence() {
        let _ = writeln!(
            output,
            "- {}: {}",
            column.header(),
            if present { "present" } else { "missing" }
        );
    }

    if !session.notices.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Notices");
        for notice in &session.notices {
            let _ = writeln!(output, "- {notice}");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## ROAS Tier Mix");
    if dataset.derived.roas {
        let mix = tier::tier_mix(dataset);
        let _ = writeln!(output, "- RED: {}", mix.red);
        let _ = writeln!(output, "- YELLOW: {}", mix.yellow);
        let _ = writeln!(output, "- GREEN: {}", mix.green);
        let _ = writeln!(output, "- not computable: {}", mix.unclassified);
    } else {
        let _ = writeln!(output, "ROAS could not be calculated. Check column names.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## ROAS Alerts");
    output.push_str(&tier_table(dataset, caps));

    let _ = writeln!(output);
    let _ = writeln!(output, "## Campaign Drill-down");
    match session.selection().summary() {
        Some(summary) => {
            let _ = writeln!(output, "Details for: {}", summary.campaign_name);
            let _ = writeln!(output);
            output.push_str(&summary_section(summary));
            let _ = writeln!(output);
            let _ = writeln!(output, "## ROAS Trend");
            output.push_str(&trend_section(summary));
        }
        None if !caps.can_drill_down() => {
            let _ = writeln!(output, "campaign_name column not found in dataset.");
        }
        None => {
            let _ = writeln!(output, "No campaign selected.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Alert Detail");
    if caps.can_resolve_alerts() {
        output.push_str(&selection_section(session.selection()));
    } else {
        let _ = writeln!(
            output,
            "Alert detail panel requires ROAS and campaign_name columns."
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_reader;

    fn session(csv: &str) -> Session {
        Session::from_dataset(load_reader(csv.as_bytes()).unwrap())
    }

    #[test]
    fn amounts_use_thousands_separators() {
        assert_eq!(format_amount(Some(1234567.4)), "1,234,567");
        assert_eq!(format_amount(Some(999.0)), "999");
        assert_eq!(format_amount(Some(-2500.0)), "-2,500");
        assert_eq!(format_amount(None), "n/a");
        assert_eq!(format_ratio(Some(2.254)), "2.25");
    }

    #[test]
    fn report_includes_alert_for_red_selection() {
        let mut session = session(
            "c_date,campaign_name,category,mark_spent,revenue,orders\n\
             2024-01-01,CampB,search,200,100,5\n",
        );
        session.select("CampB").unwrap();
        let report = build_report(&session);

        assert!(report.contains("# Marketing Performance Report"));
        assert!(report.contains("- RED: 1"));
        assert!(report.contains("| campaign_name | category | mark_spent | revenue | ROAS | CPA | tier |"));
        assert!(report.contains("| CampB | search | 200 | 100 | 0.50 | 40.00 | RED |"));
        assert!(report.contains("- Average ROAS: 0.50"));
        assert!(report.contains("- 2024-01-01: 0.50"));
        assert!(report.contains("Alert details: `CampB`"));
        assert!(report.contains("2. Reduce daily budget by 50% while you test fixes."));
    }

    #[test]
    fn report_degrades_without_revenue() {
        let session = session("campaign_name,mark_spent\nCampA,10\n");
        let report = build_report(&session);
        assert!(report.contains("- revenue: missing"));
        assert!(report.contains("ROAS requires column(s) revenue"));
        assert!(report.contains("ROAS could not be calculated. Check column names."));
        assert!(report.contains("Alert detail panel requires ROAS and campaign_name columns."));
    }

    #[test]
    fn healthy_selection_is_informational() {
        let mut session = session("campaign_name,mark_spent,revenue\nCampA,100,450\n");
        session.select("CampA").unwrap();
        let section = selection_section(session.selection());
        assert!(section.starts_with("The selected campaign is not a red alert"));
    }

    #[test]
    fn trend_marks_gaps_and_omissions() {
        let mut session = session(
            "c_date,campaign_name,mark_spent,revenue\n\
             2024-03-02,C,0,5\nlater,C,1,1\n2024-03-01,C,2,1\n",
        );
        session.select("C").unwrap();
        let trend = trend_section(session.selection().summary().unwrap());
        assert_eq!(
            trend,
            "- 2024-03-01: 0.50\n- 2024-03-02: gap\n(1 row(s) without a usable date omitted)\n"
        );
    }

    #[test]
    fn metrics_json_carries_session_and_tiers() {
        let session = session("campaign_name,mark_spent,revenue\nCampA,100,50\nCampB,0,10\n");
        let value = metrics_json(&session);
        assert_eq!(value["session"], serde_json::json!(session.id.to_string()));
        assert_eq!(value["tiers"][0]["tier"], "RED");
        assert_eq!(value["tiers"][0]["background"], "#ffcccc");
        assert!(value["tiers"][1]["tier"].is_null());
        assert_eq!(value["dataset"]["rows"][0]["roas"], 0.5);
        assert!(value["dataset"]["rows"][1]["roas"].is_null());
    }
}
