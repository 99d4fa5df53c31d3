pub mod notification;
pub mod report;
pub mod user;
pub mod worker;
