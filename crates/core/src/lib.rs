pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use log::{debug, info, warn};
use models::{
    analytics::{ClientLinkReport, PortfolioSummary},
    client::Client,
    portfolio::{Portfolio, PortfolioStatus},
    record::Record,
    settings::StoreSettings,
};
use serde::de::DeserializeOwned;
use services::{
    analytics_service::AnalyticsService,
    client_service::ClientService,
    collection_service::CollectionService,
    id_generator::{IdGenerator, UuidIdGenerator},
    portfolio_service::PortfolioService,
};
use storage::{bucket::KeyValueBucket, manager::StorageManager, seed};

use errors::CoreError;

/// Bucket key of the clients collection.
pub const CLIENTS_KEY: &str = "clients";

/// Bucket key of the portfolios collection.
pub const PORTFOLIOS_KEY: &str = "portfolios";

/// Suffix of the key an unreadable stored collection is copied to before
/// the store falls back, e.g. `clients.unreadable`.
pub const UNREADABLE_SUFFIX: &str = ".unreadable";

/// The two collections a store owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Clients,
    Portfolios,
}

impl Collection {
    /// Collection name, also its un-prefixed bucket key.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Clients => CLIENTS_KEY,
            Collection::Portfolios => PORTFOLIOS_KEY,
        }
    }
}

/// What a save did with the record it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No identity on the record: appended with this freshly assigned id.
    Created(String),
    /// Replaced the existing record with the same id, in place.
    Updated,
    /// Had an id that no record carries. Nothing changed.
    NotFound,
}

/// Main entry point for the clientbook core library.
///
/// Holds the clients and portfolios collections, reads and writes them, and
/// mirrors every write into an optional durable bucket. All operations are
/// synchronous and complete before returning.
#[must_use]
pub struct RecordStore {
    clients: Vec<Client>,
    portfolios: Vec<Portfolio>,
    settings: StoreSettings,
    bucket: Option<Box<dyn KeyValueBucket>>,
    ids: Box<dyn IdGenerator>,
    collection_service: CollectionService,
    client_service: ClientService,
    portfolio_service: PortfolioService,
    analytics_service: AnalyticsService,
    /// Set when the latest clients state has not reached the bucket.
    clients_unsynced: bool,
    /// Set when the latest portfolios state has not reached the bucket.
    portfolios_unsynced: bool,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("clients", &self.clients.len())
            .field("portfolios", &self.portfolios.len())
            .field("settings", &self.settings)
            .field("bucket", &self.bucket.as_ref().map(|b| b.name()))
            .field("unsynced", &self.has_unsynced_changes())
            .finish()
    }
}

impl RecordStore {
    /// Volatile store with no bucket, starting from the seed data
    /// (or empty, if `seed_when_empty` is off).
    pub fn in_memory(settings: StoreSettings) -> Self {
        let clients = fallback_collection(&settings, seed::seed_clients);
        let portfolios = fallback_collection(&settings, seed::seed_portfolios);
        info!(
            "record store started in memory ({} clients, {} portfolios)",
            clients.len(),
            portfolios.len()
        );
        Self::build(clients, portfolios, settings, None)
    }

    /// Store persisted through `bucket`.
    ///
    /// Each collection is loaded from its key. A missing key, a failing
    /// bucket, or a value that does not parse all fall back to the seed data;
    /// start-up never fails. A value that does not parse is first copied to
    /// its [`UNREADABLE_SUFFIX`] key; the next write replaces the original.
    pub fn with_bucket(mut bucket: Box<dyn KeyValueBucket>, settings: StoreSettings) -> Self {
        let clients = load_or_fallback(
            bucket.as_mut(),
            &settings.key_for(CLIENTS_KEY),
            &settings,
            seed::seed_clients,
        );
        let portfolios = load_or_fallback(
            bucket.as_mut(),
            &settings.key_for(PORTFOLIOS_KEY),
            &settings,
            seed::seed_portfolios,
        );
        Self::build(clients, portfolios, settings, Some(bucket))
    }

    /// Replace the id generator used for new records.
    pub fn with_id_generator(mut self, ids: Box<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    // ── Clients: reads ──────────────────────────────────────────────

    /// The full clients collection, in insertion order.
    #[must_use]
    pub fn get_clients(&self) -> &[Client] {
        &self.clients
    }

    #[must_use]
    pub fn get_client_by_id(&self, id: &str) -> Option<&Client> {
        self.collection_service.find(&self.clients, id)
    }

    /// Clients whose name or email contains `search_term`, ignoring case.
    /// An empty term returns every client.
    #[must_use]
    pub fn filtered_clients(&self, search_term: &str) -> Vec<&Client> {
        self.client_service.filter(&self.clients, search_term)
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    // ── Portfolios: reads ───────────────────────────────────────────

    /// The full portfolios collection, in insertion order.
    #[must_use]
    pub fn get_portfolios(&self) -> &[Portfolio] {
        &self.portfolios
    }

    #[must_use]
    pub fn get_portfolio_by_id(&self, id: &str) -> Option<&Portfolio> {
        self.collection_service.find(&self.portfolios, id)
    }

    /// Portfolios matching `search_term` on name or client name (ignoring
    /// case) that are also in `status`.
    #[must_use]
    pub fn filtered_portfolios(&self, search_term: &str, status: PortfolioStatus) -> Vec<&Portfolio> {
        self.portfolio_service
            .filter(&self.portfolios, search_term, status)
    }

    /// Sum of holdings' current value for one portfolio.
    /// `0.0` if the portfolio is unknown or has no holdings.
    #[must_use]
    pub fn total_portfolio_value(&self, portfolio_id: &str) -> f64 {
        self.portfolio_service
            .total_value(&self.portfolios, portfolio_id)
    }

    #[must_use]
    pub fn portfolio_count(&self) -> usize {
        self.portfolios.len()
    }

    // ── Clients: writes ─────────────────────────────────────────────

    /// Append a new client under a freshly assigned id. Returns the id.
    pub fn add_client(&mut self, client: Client) -> String {
        let id = self
            .collection_service
            .add(&mut self.clients, client, self.ids.as_mut());
        debug!("added client {id}");
        self.persist(Collection::Clients);
        id
    }

    /// Replace the client with the same id in place.
    /// Unknown ids are ignored; returns whether a client was replaced.
    pub fn update_client(&mut self, client: Client) -> bool {
        let id = client.id.clone().unwrap_or_default();
        let updated = self.collection_service.update(&mut self.clients, client);
        if updated {
            debug!("updated client {id}");
        } else {
            debug!("update ignored, no client {id}");
        }
        self.persist(Collection::Clients);
        updated
    }

    /// Remove every client with `id`. Returns how many were removed.
    pub fn delete_client(&mut self, id: &str) -> usize {
        let removed = self.collection_service.delete(&mut self.clients, id);
        debug!("deleted {removed} client(s) with id {id}");
        self.persist(Collection::Clients);
        removed
    }

    // ── Portfolios: writes ──────────────────────────────────────────

    /// Append a new portfolio under a freshly assigned id. Returns the id.
    pub fn add_portfolio(&mut self, portfolio: Portfolio) -> String {
        let id = self
            .collection_service
            .add(&mut self.portfolios, portfolio, self.ids.as_mut());
        debug!("added portfolio {id}");
        self.persist(Collection::Portfolios);
        id
    }

    /// Replace the portfolio with the same id in place.
    /// Unknown ids are ignored; returns whether a portfolio was replaced.
    pub fn update_portfolio(&mut self, portfolio: Portfolio) -> bool {
        let id = portfolio.id.clone().unwrap_or_default();
        let updated = self
            .collection_service
            .update(&mut self.portfolios, portfolio);
        if updated {
            debug!("updated portfolio {id}");
        } else {
            debug!("update ignored, no portfolio {id}");
        }
        self.persist(Collection::Portfolios);
        updated
    }

    /// Remove every portfolio with `id`. Returns how many were removed.
    pub fn delete_portfolio(&mut self, id: &str) -> usize {
        let removed = self.collection_service.delete(&mut self.portfolios, id);
        debug!("deleted {removed} portfolio(s) with id {id}");
        self.persist(Collection::Portfolios);
        removed
    }

    // ── Save / Remove (create-or-update dispatch) ───────────────────

    /// Update the client if it carries an id, otherwise create it.
    pub fn save_client(&mut self, client: Client) -> SaveOutcome {
        if client.has_identity() {
            if self.update_client(client) {
                SaveOutcome::Updated
            } else {
                SaveOutcome::NotFound
            }
        } else {
            SaveOutcome::Created(self.add_client(client))
        }
    }

    pub fn remove_client(&mut self, id: &str) -> usize {
        self.delete_client(id)
    }

    /// Update the portfolio if it carries an id, otherwise create it.
    pub fn save_portfolio(&mut self, portfolio: Portfolio) -> SaveOutcome {
        if portfolio.has_identity() {
            if self.update_portfolio(portfolio) {
                SaveOutcome::Updated
            } else {
                SaveOutcome::NotFound
            }
        } else {
            SaveOutcome::Created(self.add_portfolio(portfolio))
        }
    }

    pub fn remove_portfolio(&mut self, id: &str) -> usize {
        self.delete_portfolio(id)
    }

    // ── Client ↔ Portfolio ──────────────────────────────────────────

    /// Portfolios whose `client` name equals `client_name` (ignoring case).
    #[must_use]
    pub fn portfolios_for_client(&self, client_name: &str) -> Vec<&Portfolio> {
        self.portfolio_service
            .for_client(&self.portfolios, client_name)
    }

    /// Portfolios explicitly linked to `client_id` by
    /// [`link_portfolios_to_clients`](Self::link_portfolios_to_clients).
    #[must_use]
    pub fn portfolios_for_client_id(&self, client_id: &str) -> Vec<&Portfolio> {
        self.portfolio_service
            .for_client_id(&self.portfolios, client_id)
    }

    /// Owning client of a portfolio: by `client_id` when linked, otherwise
    /// the first client whose name matches the portfolio's `client`.
    #[must_use]
    pub fn client_for_portfolio(&self, portfolio_id: &str) -> Option<&Client> {
        let portfolio = self.get_portfolio_by_id(portfolio_id)?;
        match portfolio.client_id.as_deref() {
            Some(client_id) => self.get_client_by_id(client_id),
            None => self
                .client_service
                .find_by_name(&self.clients, &portfolio.client)
                .into_iter()
                .next(),
        }
    }

    /// Record `client_id` on every portfolio whose client name identifies
    /// exactly one client. Returns which portfolios were linked and which
    /// could not be. Portfolios are persisted if anything was linked.
    pub fn link_portfolios_to_clients(&mut self) -> ClientLinkReport {
        let report = self
            .portfolio_service
            .link_to_clients(&mut self.portfolios, &self.clients);
        info!(
            "linked {} portfolio(s) to clients ({} unmatched, {} ambiguous)",
            report.linked.len(),
            report.unmatched.len(),
            report.ambiguous.len()
        );
        if !report.linked.is_empty() {
            self.persist(Collection::Portfolios);
        }
        report
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Totals over all portfolios, with a per-status breakdown.
    #[must_use]
    pub fn portfolio_summary(&self) -> PortfolioSummary {
        self.analytics_service.portfolio_summary(&self.portfolios)
    }

    // ── Persistence ─────────────────────────────────────────────────

    /// `true` if some collection's latest state has not been written to the
    /// bucket (a write failed, or `persist_writes` is off).
    #[must_use]
    pub fn has_unsynced_changes(&self) -> bool {
        self.clients_unsynced || self.portfolios_unsynced
    }

    /// Write both collections to the bucket now.
    /// Without a bucket this does nothing.
    pub fn flush(&mut self) -> Result<(), CoreError> {
        let Some(bucket) = self.bucket.as_deref_mut() else {
            return Ok(());
        };
        StorageManager::persist_collection(bucket, &self.settings.key_for(CLIENTS_KEY), &self.clients)?;
        self.clients_unsynced = false;
        self.portfolio_service.ensure_finite(&self.portfolios)?;
        StorageManager::persist_collection(
            bucket,
            &self.settings.key_for(PORTFOLIOS_KEY),
            &self.portfolios,
        )?;
        self.portfolios_unsynced = false;
        Ok(())
    }

    #[must_use]
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    #[must_use]
    pub fn bucket(&self) -> Option<&dyn KeyValueBucket> {
        self.bucket.as_deref()
    }

    /// Consume the store and hand back its bucket, if any.
    pub fn into_bucket(self) -> Option<Box<dyn KeyValueBucket>> {
        self.bucket
    }

    // ── Export ──────────────────────────────────────────────────────

    pub fn export_clients_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.clients)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize clients to JSON: {e}")))
    }

    pub fn export_portfolios_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.portfolios)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize portfolios to JSON: {e}")))
    }

    /// Columns: id, name, email, phone, status
    #[must_use]
    pub fn export_clients_to_csv(&self) -> String {
        let mut csv = String::from("id,name,email,phone,status\n");
        for client in &self.clients {
            csv.push_str(&format!(
                "{},{},{},{},{}\n",
                csv_field(client.id.as_deref().unwrap_or("")),
                csv_field(&client.name),
                csv_field(&client.email),
                csv_field(&client.phone),
                csv_field(client.status.as_str()),
            ));
        }
        csv
    }

    /// Columns: id, name, client, start_date, status, returns, total_value,
    /// holdings, holdings_value
    #[must_use]
    pub fn export_portfolios_to_csv(&self) -> String {
        let mut csv = String::from(
            "id,name,client,start_date,status,returns,total_value,holdings,holdings_value\n",
        );
        for portfolio in &self.portfolios {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                csv_field(portfolio.id.as_deref().unwrap_or("")),
                csv_field(&portfolio.name),
                csv_field(&portfolio.client),
                csv_field(&portfolio.start_date.to_string()),
                csv_field(portfolio.status.as_str()),
                portfolio.returns,
                portfolio.total_value,
                portfolio.holdings.as_ref().map_or(0, Vec::len),
                portfolio.holdings_value(),
            ));
        }
        csv
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(
        mut clients: Vec<Client>,
        mut portfolios: Vec<Portfolio>,
        settings: StoreSettings,
        bucket: Option<Box<dyn KeyValueBucket>>,
    ) -> Self {
        let collection_service = CollectionService::new();
        let mut ids: Box<dyn IdGenerator> = Box::new(UuidIdGenerator::new());

        let repaired = collection_service.repair_identities(&mut clients, ids.as_mut());
        if repaired > 0 {
            warn!("assigned fresh ids to {repaired} client(s) with missing or duplicate ids");
        }
        let repaired = collection_service.repair_identities(&mut portfolios, ids.as_mut());
        if repaired > 0 {
            warn!("assigned fresh ids to {repaired} portfolio(s) with missing or duplicate ids");
        }

        Self {
            clients,
            portfolios,
            settings,
            bucket,
            ids,
            collection_service,
            client_service: ClientService::new(),
            portfolio_service: PortfolioService::new(),
            analytics_service: AnalyticsService::new(),
            clients_unsynced: false,
            portfolios_unsynced: false,
        }
    }

    /// Mirror `collection` into the bucket. Failures are logged and leave
    /// the in-memory state as it is.
    fn persist(&mut self, collection: Collection) {
        let Some(bucket) = self.bucket.as_deref_mut() else {
            return;
        };
        if !self.settings.persist_writes {
            self.mark_unsynced(collection, true);
            return;
        }

        let key = self.settings.key_for(collection.name());
        let result = match collection {
            Collection::Clients => StorageManager::persist_collection(bucket, &key, &self.clients),
            Collection::Portfolios => match self.portfolio_service.ensure_finite(&self.portfolios) {
                Ok(()) => StorageManager::persist_collection(&mut *bucket, &key, &self.portfolios),
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(()) => self.mark_unsynced(collection, false),
            Err(e) => {
                warn!("failed to persist '{key}' to {} bucket: {e}", bucket.name());
                self.mark_unsynced(collection, true);
            }
        }
    }

    fn mark_unsynced(&mut self, collection: Collection, unsynced: bool) {
        match collection {
            Collection::Clients => self.clients_unsynced = unsynced,
            Collection::Portfolios => self.portfolios_unsynced = unsynced,
        }
    }
}

/// Load one collection, falling back when nothing usable is stored.
fn load_or_fallback<T: DeserializeOwned>(
    bucket: &mut dyn KeyValueBucket,
    key: &str,
    settings: &StoreSettings,
    seed: fn() -> Vec<T>,
) -> Vec<T> {
    let stored = match bucket.get(key) {
        Ok(Some(stored)) => stored,
        Ok(None) => {
            info!("nothing stored under '{key}', using defaults");
            return fallback_collection(settings, seed);
        }
        Err(e) => {
            warn!("could not read '{key}' from {} bucket, using defaults: {e}", bucket.name());
            return fallback_collection(settings, seed);
        }
    };

    match StorageManager::deserialize_collection(&stored) {
        Ok(records) => {
            info!("loaded {} record(s) from '{key}' in {} bucket", records.len(), bucket.name());
            records
        }
        Err(e) => {
            let backup_key = format!("{key}{UNREADABLE_SUFFIX}");
            warn!("could not parse '{key}', copied to '{backup_key}', using defaults: {e}");
            if let Err(e) = bucket.set(&backup_key, &stored) {
                warn!("could not keep unreadable '{key}' under '{backup_key}': {e}");
            }
            fallback_collection(settings, seed)
        }
    }
}

fn fallback_collection<T>(settings: &StoreSettings, seed: fn() -> Vec<T>) -> Vec<T> {
    if settings.seed_when_empty {
        seed()
    } else {
        Vec::new()
    }
}

/// Quote a CSV field if it contains a comma, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
