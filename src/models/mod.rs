pub mod configuration;
pub mod show;
pub mod user;
