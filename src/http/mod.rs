// Private module declaration
mod server;

// Re-export for public API
pub use server::{configure_routes, start_http_server};
