pub mod analytics_service;
pub mod client_service;
pub mod collection_service;
pub mod id_generator;
pub mod portfolio_service;
