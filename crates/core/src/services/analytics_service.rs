use crate::models::analytics::{PortfolioSummary, StatusBreakdown};
use crate::models::portfolio::{Portfolio, PortfolioStatus};

/// Aggregate figures over the portfolios collection.
///
/// Every aggregate tolerates missing holdings and returns the identity value
/// (zero) for empty input.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    pub fn portfolio_summary(&self, portfolios: &[Portfolio]) -> PortfolioSummary {
        let portfolio_count = portfolios.len();
        let total_value: f64 = portfolios.iter().map(|p| p.total_value).sum();
        let holdings_value: f64 = portfolios.iter().map(Portfolio::holdings_value).sum();
        let total_gain_loss: f64 = portfolios
            .iter()
            .flat_map(|p| p.holdings.as_deref().unwrap_or_default())
            .filter_map(|h| h.effective_gain_loss())
            .sum();

        let average_returns = if portfolio_count > 0 {
            portfolios.iter().map(|p| p.returns).sum::<f64>() / portfolio_count as f64
        } else {
            0.0
        };

        let by_status = PortfolioStatus::ALL
            .into_iter()
            .map(|status| self.status_breakdown(portfolios, status))
            .collect();

        PortfolioSummary {
            portfolio_count,
            total_value,
            holdings_value,
            average_returns,
            total_gain_loss,
            by_status,
        }
    }

    pub fn status_breakdown(&self, portfolios: &[Portfolio], status: PortfolioStatus) -> StatusBreakdown {
        let (portfolio_count, total_value) = portfolios
            .iter()
            .filter(|p| p.status == status)
            .fold((0, 0.0), |(count, value), p| (count + 1, value + p.total_value));

        StatusBreakdown {
            status,
            portfolio_count,
            total_value,
        }
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
