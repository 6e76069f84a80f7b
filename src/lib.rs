pub mod api;
pub mod cards;
pub mod catalog;
pub mod charts;
pub mod clicks;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod models;
pub mod ui;

#[cfg(test)]
mod testing;

pub use api::{Backend, HttpBackend};
pub use catalog::CatalogController;
pub use config::Config;
pub use dashboard::DashboardController;
pub use errors::DashboardError;
