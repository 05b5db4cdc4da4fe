use serde::Serialize;
use tracing::info;

use crate::models::CampaignSummary;
use crate::tier::AlertTier;

/// Recommended responses to a RED campaign, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Pause,
    ReduceBudget,
    Investigate,
}

impl RecommendedAction {
    pub const ALL: [RecommendedAction; 3] = [
        RecommendedAction::Pause,
        RecommendedAction::ReduceBudget,
        RecommendedAction::Investigate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RecommendedAction::Pause => "pause campaign",
            RecommendedAction::ReduceBudget => "reduce daily budget by 50%",
            RecommendedAction::Investigate => "investigate targeting/creatives/landing page",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RecommendedAction::Pause => "Pause campaign to stop immediate losses.",
            RecommendedAction::ReduceBudget => {
                "Reduce daily budget by 50% while you test fixes."
            }
            RecommendedAction::Investigate => {
                "Investigate root causes: targeting, creatives, and landing page."
            }
        }
    }

    /// Outcome text for a simulated run of this action. Nothing is changed.
    pub fn simulate(self, campaign: &str) -> String {
        match self {
            RecommendedAction::Pause => {
                format!("Campaign '{campaign}' marked as PAUSED (simulation).")
            }
            RecommendedAction::ReduceBudget => {
                format!("Budget for '{campaign}' reduced by 50% (simulation).")
            }
            RecommendedAction::Investigate => "Next steps: check targeting settings, review ad \
                 creatives, and analyze landing page conversion rate."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDetail {
    pub campaign_name: String,
    pub total_spend: Option<f64>,
    pub total_revenue: Option<f64>,
    pub average_roas: f64,
    pub actions: [RecommendedAction; 3],
}

impl AlertDetail {
    pub fn simulate(&self, action: RecommendedAction) -> String {
        let message = action.simulate(&self.campaign_name);
        info!(
            campaign = %self.campaign_name,
            action = action.label(),
            "simulated action"
        );
        message
    }
}

/// A detail payload exists only for a selected campaign whose average ROAS
/// is defined and falls in the RED tier.
pub fn resolve(summary: Option<&CampaignSummary>) -> Option<AlertDetail> {
    let summary = summary?;
    let average_roas = summary.average_roas?;
    if AlertTier::classify(average_roas) != Some(AlertTier::Red) {
        return None;
    }

    Some(AlertDetail {
        campaign_name: summary.campaign_name.clone(),
        total_spend: summary.total_spend,
        total_revenue: summary.total_revenue,
        average_roas,
        actions: RecommendedAction::ALL,
    })
}
