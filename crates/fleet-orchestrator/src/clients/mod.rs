//! Remote collaborator clients.

pub mod http_experiment_client;
pub use http_experiment_client::HttpExperimentClient;
