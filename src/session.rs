use std::path::Path;

use serde::Serialize;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::alert::{self, AlertDetail};
use crate::campaign;
use crate::error::{LoadError, Notice};
use crate::loader;
use crate::metrics;
use crate::models::{CampaignSummary, Dataset};
use crate::schema::{Column, SchemaCapabilities};

/// Selection state. A new selection always re-evaluates from the dataset;
/// nothing about a previous selection is retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Selection {
    NoCampaignSelected,
    Normal {
        summary: CampaignSummary,
    },
    Alert {
        summary: CampaignSummary,
        detail: AlertDetail,
    },
}

impl Selection {
    pub fn summary(&self) -> Option<&CampaignSummary> {
        match self {
            Selection::NoCampaignSelected => None,
            Selection::Normal { summary } | Selection::Alert { summary, .. } => Some(summary),
        }
    }

    pub fn detail(&self) -> Option<&AlertDetail> {
        match self {
            Selection::Alert { detail, .. } => Some(detail),
            _ => None,
        }
    }
}

/// One loaded dataset and what the user has selected in it. Sessions own
/// their data; two sessions never share state.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub dataset: Dataset,
    pub caps: SchemaCapabilities,
    pub notices: Vec<Notice>,
    selection: Selection,
}

impl Session {
    pub fn open(path: &Path) -> Result<Self, LoadError> {
        Ok(Self::from_dataset(loader::load_path(path)?))
    }

    pub fn from_dataset(mut dataset: Dataset) -> Self {
        let id = Uuid::new_v4();
        let _span = info_span!("session", %id).entered();

        let caps = SchemaCapabilities::from_headers(&dataset.headers);
        let mut notices = Vec::new();
        notices.extend(caps.missing("ROAS", &[Column::Revenue, Column::Spend]));
        notices.extend(caps.missing("CPA", &[Column::Spend, Column::Orders]));
        notices.extend(metrics::derive(&mut dataset, &caps));
        info!(rows = dataset.rows.len(), notices = notices.len(), "session ready");

        Self {
            id,
            dataset,
            caps,
            notices,
            selection: Selection::NoCampaignSelected,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Selects a campaign and re-derives its summary and alert state.
    /// Returns a `CampaignNotFound` notice alongside the (empty) selection
    /// when no row carries that name.
    pub fn select(&mut self, name: &str) -> Result<&Selection, Notice> {
        let _span = info_span!("session", id = %self.id).entered();

        if let Some(notice) = self.caps.missing("campaign drill-down", &[Column::CampaignName]) {
            return Err(notice);
        }

        let summary = campaign::aggregate(&self.dataset, &self.caps, name);
        let found = summary.is_found();
        self.selection = match alert::resolve(Some(&summary)) {
            Some(detail) => Selection::Alert { summary, detail },
            None => Selection::Normal { summary },
        };
        info!(
            campaign = name,
            found,
            alert = self.selection.detail().is_some(),
            "campaign selected"
        );

        if found {
            Ok(&self.selection)
        } else {
            Err(Notice::CampaignNotFound {
                name: name.to_string(),
            })
        }
    }
}
