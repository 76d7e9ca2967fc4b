use crate::errors::CoreError;
use crate::models::analytics::ClientLinkReport;
use crate::models::client::Client;
use crate::models::portfolio::{Portfolio, PortfolioStatus};
use crate::models::record::Record;

use super::client_service::{normalize_name, ClientService};

/// Read-side queries over the portfolios collection, plus the
/// portfolio-to-client linking pass.
///
/// Pure business logic — no I/O. Easy to test.
pub struct PortfolioService;

impl PortfolioService {
    pub fn new() -> Self {
        Self
    }

    /// Portfolios whose name or client name contains `search_term` (ignoring
    /// case) AND whose status equals `status`. Both conditions must hold.
    pub fn filter<'a>(
        &self,
        portfolios: &'a [Portfolio],
        search_term: &str,
        status: PortfolioStatus,
    ) -> Vec<&'a Portfolio> {
        let needle = search_term.to_lowercase();
        portfolios
            .iter()
            .filter(|p| p.matches_search(&needle) && p.status == status)
            .collect()
    }

    /// Sum of holdings' `current_value` for the portfolio with `portfolio_id`.
    ///
    /// Returns `0.0` when the portfolio does not exist or has no holdings.
    pub fn total_value(&self, portfolios: &[Portfolio], portfolio_id: &str) -> f64 {
        portfolios
            .iter()
            .find(|p| p.matches_id(portfolio_id))
            .map(Portfolio::holdings_value)
            .unwrap_or(0.0)
    }

    /// Fails on the first portfolio carrying NaN or an infinity, which
    /// JSON would silently turn into `null`.
    pub fn ensure_finite(&self, portfolios: &[Portfolio]) -> Result<(), CoreError> {
        match portfolios
            .iter()
            .find_map(|p| p.non_finite_field().map(|field| (p, field)))
        {
            Some((portfolio, field)) => Err(CoreError::Serialization(format!(
                "portfolio '{}' has a non-finite {field}",
                portfolio.id.as_deref().unwrap_or_default()
            ))),
            None => Ok(()),
        }
    }

    /// Portfolios whose free-text `client` equals `client_name`
    /// (ignoring case and surrounding whitespace).
    pub fn for_client<'a>(&self, portfolios: &'a [Portfolio], client_name: &str) -> Vec<&'a Portfolio> {
        let wanted = normalize_name(client_name);
        portfolios
            .iter()
            .filter(|p| normalize_name(&p.client) == wanted)
            .collect()
    }

    /// Portfolios explicitly linked to `client_id`. Unlinked portfolios never match.
    pub fn for_client_id<'a>(&self, portfolios: &'a [Portfolio], client_id: &str) -> Vec<&'a Portfolio> {
        portfolios
            .iter()
            .filter(|p| p.client_id.as_deref() == Some(client_id))
            .collect()
    }

    /// Fill `client_id` on every portfolio whose `client` name matches exactly
    /// one client. Ambiguous and unmatched portfolios are left as they are
    /// and reported.
    pub fn link_to_clients(&self, portfolios: &mut [Portfolio], clients: &[Client]) -> ClientLinkReport {
        let client_service = ClientService::new();
        let mut report = ClientLinkReport::default();

        for portfolio in portfolios.iter_mut() {
            let portfolio_id = portfolio.id.clone().unwrap_or_default();
            let matches: Vec<&Client> = client_service
                .find_by_name(clients, &portfolio.client)
                .into_iter()
                .filter(|c| c.has_identity())
                .collect();

            match matches.as_slice() {
                [only] => {
                    portfolio.client_id = only.id.clone();
                    report.linked.push(portfolio_id);
                }
                [] => report.unmatched.push(portfolio_id),
                _ => report.ambiguous.push(portfolio_id),
            }
        }

        report
    }
}

impl Default for PortfolioService {
    fn default() -> Self {
        Self::new()
    }
}
