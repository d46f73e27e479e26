pub mod agents;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod predictor;
pub mod server;
pub mod tracker;
