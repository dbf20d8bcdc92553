pub mod handlers;
pub mod metrics;
pub mod server;

pub use server::run_exporter;
