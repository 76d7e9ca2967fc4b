use chrono::NaiveDate;

use crate::models::client::{Client, ClientStatus};
use crate::models::portfolio::{Holding, HoldingType, Portfolio, PortfolioStatus};

/// Clients a fresh store starts with when nothing is stored.
pub fn seed_clients() -> Vec<Client> {
    vec![
        Client::new("John Smith", "john.smith@example.com", "+1 555 0100", ClientStatus::Active)
            .with_id("seed-client-1"),
        Client::new("Anna Lee", "anna.lee@example.com", "+1 555 0101", ClientStatus::Active)
            .with_id("seed-client-2"),
        Client::new("Maria Garcia", "maria.garcia@example.com", "+1 555 0102", ClientStatus::Pending)
            .with_id("seed-client-3"),
        Client::new("David Chen", "david.chen@example.com", "+1 555 0103", ClientStatus::Inactive)
            .with_id("seed-client-4"),
    ]
}

/// Portfolios a fresh store starts with when nothing is stored.
pub fn seed_portfolios() -> Vec<Portfolio> {
    vec![
        Portfolio::new("Growth Plan", "John Smith", date(2024, 3, 1), PortfolioStatus::Active)
            .with_id("seed-portfolio-1")
            .with_returns(8.4)
            .with_total_value(125_000.0)
            .with_holdings(vec![
                Holding::new("1", "AAPL", HoldingType::Stock, 40.0, 50_000.0).with_initial_value(42_000.0),
                Holding::new("2", "VTI", HoldingType::Etf, 35.0, 43_750.0).with_initial_value(40_000.0),
                Holding::new("3", "US Treasury 10Y", HoldingType::Bond, 25.0, 31_250.0)
                    .with_initial_value(31_000.0),
            ]),
        Portfolio::new("Retirement Income", "Anna Lee", date(2023, 9, 15), PortfolioStatus::Active)
            .with_id("seed-portfolio-2")
            .with_returns(4.1)
            .with_total_value(80_000.0)
            .with_holdings(vec![
                Holding::new("1", "BND", HoldingType::Etf, 60.0, 48_000.0).with_gain_loss(1_200.0),
                Holding::new("2", "Cash", HoldingType::Cash, 40.0, 32_000.0).with_gain_loss(0.0),
            ]),
        Portfolio::new("College Fund", "Maria Garcia", date(2026, 1, 10), PortfolioStatus::Upcoming)
            .with_id("seed-portfolio-3")
            .with_total_value(15_000.0),
        Portfolio::new("Tech Momentum", "David Chen", date(2021, 6, 1), PortfolioStatus::Closed)
            .with_id("seed-portfolio-4")
            .with_returns(-3.2)
            .with_total_value(0.0)
            .with_holdings(Vec::new()),
    ]
}

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}
