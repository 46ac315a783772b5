pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, DbPool};

#[cfg(test)]
pub(crate) async fn test_pool(url: &str) -> DbPool {
    connection::connect(&vendo_core::config::DatabaseConfig {
        url: url.to_string(),
        max_connections: 1,
        timeout_secs: 30,
    })
    .await
    .expect("test pool should connect")
}
