pub mod analytics;
pub mod client;
pub mod portfolio;
pub mod record;
pub mod settings;
