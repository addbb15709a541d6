use std::sync::Arc;

use config::Config;
use dispatcher::DispatchStats;

pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod intake;
pub mod models;
pub mod routes;
pub mod transport;
pub mod utils;

pub use error::RelayError;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub stats: Arc<DispatchStats>,
}
