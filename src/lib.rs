pub mod configuration;
pub mod connectors;
pub mod health;
mod helpers;
pub mod routes;
pub mod startup;
pub mod telemetry;
