pub mod blob;
pub mod relay;
pub mod vision;
