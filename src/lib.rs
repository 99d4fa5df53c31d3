pub mod config;
pub mod models;
pub mod responses;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod sweeper;

pub use state::AppState;
