pub mod config;
pub mod handlers;
pub mod metrics_server;
pub mod observability;
pub mod server;

pub use handlers::AppState;
