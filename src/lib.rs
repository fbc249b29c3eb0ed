pub mod auth;
pub mod config;
pub mod errors;
pub mod llm;
pub mod logging;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod state;

use deadpool_diesel::postgres::Pool as DeadpoolPool;

// Library-wide pool alias
pub type PgPool = DeadpoolPool;

pub use state::AppState;

// Mock collaborators used by the integration tests
pub mod test_helpers;
