pub mod auth;
pub mod complaints;
pub mod notifications;
pub mod reports;
pub mod uploads;
pub mod workers;
