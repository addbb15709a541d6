mod handler;
mod model;

pub use handler::{ping, stats};
pub use model::{PingResponse, StatsResponse};
