use serde::Serialize;

use crate::error::Notice;

/// Columns the engine understands. Anything else in the sheet is carried
/// along untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Column {
    Date,
    CampaignName,
    Category,
    Spend,
    Revenue,
    Orders,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Date,
        Column::CampaignName,
        Column::Category,
        Column::Spend,
        Column::Revenue,
        Column::Orders,
    ];

    pub fn header(self) -> &'static str {
        match self {
            Column::Date => "c_date",
            Column::CampaignName => "campaign_name",
            Column::Category => "category",
            Column::Spend => "mark_spent",
            Column::Revenue => "revenue",
            Column::Orders => "orders",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.header() == header)
    }
}

/// Presence map computed once per load and handed to every downstream step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchemaCapabilities {
    pub date: bool,
    pub campaign_name: bool,
    pub category: bool,
    pub spend: bool,
    pub revenue: bool,
    pub orders: bool,
}

impl SchemaCapabilities {
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut caps = SchemaCapabilities::default();
        for column in headers.iter().filter_map(|h| Column::from_header(h.as_ref())) {
            caps.set(column);
        }
        caps
    }

    fn set(&mut self, column: Column) {
        match column {
            Column::Date => self.date = true,
            Column::CampaignName => self.campaign_name = true,
            Column::Category => self.category = true,
            Column::Spend => self.spend = true,
            Column::Revenue => self.revenue = true,
            Column::Orders => self.orders = true,
        }
    }

    pub fn has(&self, column: Column) -> bool {
        match column {
            Column::Date => self.date,
            Column::CampaignName => self.campaign_name,
            Column::Category => self.category,
            Column::Spend => self.spend,
            Column::Revenue => self.revenue,
            Column::Orders => self.orders,
        }
    }

    pub fn presence(&self) -> Vec<(Column, bool)> {
        Column::ALL.into_iter().map(|c| (c, self.has(c))).collect()
    }

    pub fn can_derive_roas(&self) -> bool {
        self.revenue && self.spend
    }

    pub fn can_derive_cpa(&self) -> bool {
        self.spend && self.orders
    }

    pub fn can_drill_down(&self) -> bool {
        self.campaign_name
    }

    pub fn can_plot_trend(&self) -> bool {
        self.date && self.can_derive_roas()
    }

    pub fn can_resolve_alerts(&self) -> bool {
        self.campaign_name && self.can_derive_roas()
    }

    /// `None` when every column in `needed` is present, otherwise a notice
    /// naming the absent ones.
    pub fn missing(&self, what: &'static str, needed: &[Column]) -> Option<Notice> {
        let columns: Vec<Column> = needed.iter().copied().filter(|c| !self.has(*c)).collect();
        if columns.is_empty() {
            None
        } else {
            Some(Notice::MissingColumns { what, columns })
        }
    }
}
