pub mod account;
pub mod auth;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod req;
pub mod server;
pub mod utils;
