use serde::{Deserialize, Serialize};

use super::portfolio::PortfolioStatus;

/// Aggregate view over the whole portfolios collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Number of portfolios
    pub portfolio_count: usize,

    /// Sum of every portfolio's recorded `total_value`
    pub total_value: f64,

    /// Sum of `current_value` across all holdings of all portfolios
    pub holdings_value: f64,

    /// Mean of `returns` over all portfolios (0 when there are none)
    pub average_returns: f64,

    /// Sum of known holding gain/loss figures
    pub total_gain_loss: f64,

    /// One entry per status, in tab order
    pub by_status: Vec<StatusBreakdown>,
}

/// Per-status slice of a [`PortfolioSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub status: PortfolioStatus,
    pub portfolio_count: usize,
    pub total_value: f64,
}

/// Outcome of linking portfolios to clients by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientLinkReport {
    /// Portfolio ids that now carry a `client_id`
    pub linked: Vec<String>,

    /// Portfolio ids whose client name matched no client
    pub unmatched: Vec<String>,

    /// Portfolio ids whose client name matched more than one client
    pub ambiguous: Vec<String>,
}

impl ClientLinkReport {
    /// `true` if every portfolio was linked.
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty() && self.ambiguous.is_empty()
    }
}
