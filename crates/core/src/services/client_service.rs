use crate::models::client::Client;

/// Read-side queries over the clients collection.
pub struct ClientService;

impl ClientService {
    pub fn new() -> Self {
        Self
    }

    /// Clients whose name or email contains `search_term`, ignoring case.
    /// An empty term matches every client. Collection order is kept.
    pub fn filter<'a>(&self, clients: &'a [Client], search_term: &str) -> Vec<&'a Client> {
        let needle = search_term.to_lowercase();
        clients.iter().filter(|c| c.matches_search(&needle)).collect()
    }

    /// Clients whose name equals `name`, ignoring case and surrounding whitespace.
    pub fn find_by_name<'a>(&self, clients: &'a [Client], name: &str) -> Vec<&'a Client> {
        let wanted = normalize_name(name);
        clients
            .iter()
            .filter(|c| normalize_name(&c.name) == wanted)
            .collect()
    }
}

impl Default for ClientService {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical form used when matching client names across collections.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
