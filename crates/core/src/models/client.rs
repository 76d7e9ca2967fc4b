use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::Record;

/// Account status label shown in client lists.
/// The store enforces no transition rules between statuses.
///
/// Labels outside the usual three are kept verbatim in `Custom`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientStatus {
    #[default]
    Active,
    Pending,
    Inactive,
    Custom(String),
}

impl ClientStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ClientStatus::Active => "Active",
            ClientStatus::Pending => "Pending",
            ClientStatus::Inactive => "Inactive",
            ClientStatus::Custom(label) => label,
        }
    }
}

impl From<String> for ClientStatus {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Active" => ClientStatus::Active,
            "Pending" => ClientStatus::Pending,
            "Inactive" => ClientStatus::Inactive,
            _ => ClientStatus::Custom(label),
        }
    }
}

impl From<ClientStatus> for String {
    fn from(status: ClientStatus) -> Self {
        match status {
            ClientStatus::Custom(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person or account owning zero or more portfolios.
///
/// `id` is assigned by the store on creation. A new client built with
/// [`Client::new`] has no id until it is saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Client {
    /// Unique within the clients collection; `None` until created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name, also a search key
    #[serde(default)]
    pub name: String,

    /// Contact email, also a search key
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub status: ClientStatus,

    /// Fields not modelled above, preserved verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Client {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
        status: ClientStatus,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            status,
            extra: Map::new(),
        }
    }

    /// Same record with an explicit id (used for edits of an existing client).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Case-insensitive substring match on name or email.
    /// `needle` must already be lowercased.
    pub(crate) fn matches_search(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.email.to_lowercase().contains(needle)
    }
}

impl Record for Client {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_id(&mut self, id: String) {
        self.id = Some(id);
    }
}
