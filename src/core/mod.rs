pub mod auth;
pub mod client;
pub mod config;
pub mod dataset;
pub mod fetch;
pub mod paths;
pub mod table;
