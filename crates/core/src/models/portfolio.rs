use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::record::Record;

/// Lifecycle label of a portfolio, used as the list view's status tab.
///
/// Stored labels other than the three tabs are kept verbatim in `Custom`;
/// such portfolios appear in no tab.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PortfolioStatus {
    #[default]
    Active,
    Upcoming,
    Closed,
    Custom(String),
}

impl PortfolioStatus {
    /// All tab statuses, in tab order.
    pub const ALL: [PortfolioStatus; 3] = [
        PortfolioStatus::Active,
        PortfolioStatus::Upcoming,
        PortfolioStatus::Closed,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            PortfolioStatus::Active => "ACTIVE",
            PortfolioStatus::Upcoming => "UPCOMING",
            PortfolioStatus::Closed => "CLOSED",
            PortfolioStatus::Custom(label) => label,
        }
    }
}

impl From<String> for PortfolioStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "ACTIVE" => PortfolioStatus::Active,
            "UPCOMING" => PortfolioStatus::Upcoming,
            "CLOSED" => PortfolioStatus::Closed,
            _ => PortfolioStatus::Custom(label),
        }
    }
}

impl From<PortfolioStatus> for String {
    fn from(status: PortfolioStatus) -> Self {
        match status {
            PortfolioStatus::Custom(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for PortfolioStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of instrument behind a holding. Unlisted kinds (e.g. "REIT")
/// are kept verbatim in `Custom`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HoldingType {
    #[default]
    Stock,
    Etf,
    Bond,
    MutualFund,
    Crypto,
    Cash,
    Commodity,
    Other,
    Custom(String),
}

impl HoldingType {
    pub fn as_str(&self) -> &str {
        match self {
            HoldingType::Stock => "Stock",
            HoldingType::Etf => "ETF",
            HoldingType::Bond => "Bond",
            HoldingType::MutualFund => "Mutual Fund",
            HoldingType::Crypto => "Crypto",
            HoldingType::Cash => "Cash",
            HoldingType::Commodity => "Commodity",
            HoldingType::Other => "Other",
            HoldingType::Custom(label) => label,
        }
    }
}

impl From<String> for HoldingType {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Stock" => HoldingType::Stock,
            "ETF" => HoldingType::Etf,
            "Bond" => HoldingType::Bond,
            "Mutual Fund" => HoldingType::MutualFund,
            "Crypto" => HoldingType::Crypto,
            "Cash" => HoldingType::Cash,
            "Commodity" => HoldingType::Commodity,
            "Other" => HoldingType::Other,
            _ => HoldingType::Custom(label),
        }
    }
}

impl From<HoldingType> for String {
    fn from(holding_type: HoldingType) -> Self {
        match holding_type {
            HoldingType::Custom(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for HoldingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start date of a portfolio as stored.
///
/// Anything that is not a `YYYY-MM-DD` date, including the empty text of an
/// unfilled form field, is kept as `Unparsed` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum StartDate {
    Date(NaiveDate),
    Unparsed(String),
}

impl StartDate {
    /// The calendar date, if the stored text is one.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            StartDate::Date(date) => Some(*date),
            StartDate::Unparsed(_) => None,
        }
    }
}

impl Default for StartDate {
    fn default() -> Self {
        StartDate::Unparsed(String::new())
    }
}

impl From<NaiveDate> for StartDate {
    fn from(date: NaiveDate) -> Self {
        StartDate::Date(date)
    }
}

impl From<Option<String>> for StartDate {
    fn from(text: Option<String>) -> Self {
        let Some(text) = text else {
            return StartDate::default();
        };
        // Only accept text that formats back identically.
        match text.parse::<NaiveDate>() {
            Ok(date) if date.to_string() == text => StartDate::Date(date),
            _ => StartDate::Unparsed(text),
        }
    }
}

impl From<StartDate> for String {
    fn from(start_date: StartDate) -> Self {
        match start_date {
            StartDate::Date(date) => date.to_string(),
            StartDate::Unparsed(text) => text,
        }
    }
}

impl std::fmt::Display for StartDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartDate::Date(date) => write!(f, "{date}"),
            StartDate::Unparsed(text) => f.write_str(text),
        }
    }
}

/// Numeric field that reads `null` as zero.
fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Name of the first field in `fields` holding NaN or an infinity.
fn first_non_finite<'a>(fields: impl IntoIterator<Item = (&'a str, Option<f64>)>) -> Option<&'a str> {
    fields
        .into_iter()
        .find(|(_, value)| value.is_some_and(|v| !v.is_finite()))
        .map(|(name, _)| name)
}

/// A line item within a portfolio.
///
/// The holdings schema varies between data sets: some carry `initialValue`,
/// some carry `gainLoss`, some neither. Both are optional, and any field this
/// struct does not know about is kept in `extra` so it survives a
/// save/load cycle untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// Unique within the parent portfolio only
    #[serde(default)]
    pub id: String,

    /// Ticker or instrument name (e.g., "AAPL", "US Treasury 10Y")
    #[serde(default)]
    pub asset: String,

    #[serde(rename = "type", default)]
    pub holding_type: HoldingType,

    /// Share of the portfolio, in percent
    #[serde(default, deserialize_with = "number_or_zero")]
    pub allocation: f64,

    #[serde(default, deserialize_with = "number_or_zero")]
    pub current_value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain_loss: Option<f64>,

    /// Fields not modelled above, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Holding {
    pub fn new(
        id: impl Into<String>,
        asset: impl Into<String>,
        holding_type: HoldingType,
        allocation: f64,
        current_value: f64,
    ) -> Self {
        Self {
            id: id.into(),
            asset: asset.into(),
            holding_type,
            allocation,
            current_value,
            initial_value: None,
            gain_loss: None,
            extra: Map::new(),
        }
    }

    pub fn with_initial_value(mut self, initial_value: f64) -> Self {
        self.initial_value = Some(initial_value);
        self
    }

    pub fn with_gain_loss(mut self, gain_loss: f64) -> Self {
        self.gain_loss = Some(gain_loss);
        self
    }

    /// Gain/loss of this holding.
    ///
    /// A stored `gain_loss` wins; otherwise it is derived as
    /// `current_value - initial_value`. `None` when neither is known.
    pub fn effective_gain_loss(&self) -> Option<f64> {
        self.gain_loss
            .or_else(|| self.initial_value.map(|initial| self.current_value - initial))
    }

    /// Name of the first numeric field holding NaN or an infinity.
    /// JSON has no spelling for those values.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite([
            ("allocation", Some(self.allocation)),
            ("currentValue", Some(self.current_value)),
            ("initialValue", self.initial_value),
            ("gainLoss", self.gain_loss),
        ])
    }
}

/// A named collection of holdings belonging to one client.
///
/// `client` is the owning client's display name, not an id. The optional
/// `client_id` is only filled by an explicit linking pass
/// (see [`crate::RecordStore::link_portfolios_to_clients`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    /// Unique within the portfolios collection; `None` until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub name: String,

    /// Owning client's name (free text)
    #[serde(default)]
    pub client: String,

    /// Strict link to `Client.id`, set only by the linking migration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default)]
    pub start_date: StartDate,

    #[serde(default)]
    pub status: PortfolioStatus,

    /// Return to date, in percent
    #[serde(default, deserialize_with = "number_or_zero")]
    pub returns: f64,

    #[serde(default, deserialize_with = "number_or_zero")]
    pub total_value: f64,

    /// Absent for portfolios that have never had holdings recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holdings: Option<Vec<Holding>>,

    /// Fields not modelled above, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Portfolio {
    pub fn new(
        name: impl Into<String>,
        client: impl Into<String>,
        start_date: NaiveDate,
        status: PortfolioStatus,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            client: client.into(),
            client_id: None,
            start_date: StartDate::Date(start_date),
            status,
            returns: 0.0,
            total_value: 0.0,
            holdings: None,
            extra: Map::new(),
        }
    }

    /// Same record with an explicit id (used for edits of an existing portfolio).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_returns(mut self, returns: f64) -> Self {
        self.returns = returns;
        self
    }

    pub fn with_total_value(mut self, total_value: f64) -> Self {
        self.total_value = total_value;
        self
    }

    pub fn with_holdings(mut self, holdings: Vec<Holding>) -> Self {
        self.holdings = Some(holdings);
        self
    }

    /// Sum of `current_value` over all holdings. `0.0` without holdings.
    pub fn holdings_value(&self) -> f64 {
        self.holdings
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|h| h.current_value)
            .sum()
    }

    /// Name of the first numeric field, on the portfolio or one of its
    /// holdings, holding NaN or an infinity.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        first_non_finite([
            ("returns", Some(self.returns)),
            ("totalValue", Some(self.total_value)),
        ])
        .or_else(|| {
            self.holdings
                .as_deref()
                .unwrap_or_default()
                .iter()
                .find_map(Holding::non_finite_field)
        })
    }

    /// Case-insensitive substring match on name or client name.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.client.to_lowercase().contains(needle)
    }
}

impl Record for Portfolio {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }
}
