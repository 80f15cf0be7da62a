#![doc = "The `taskvault` library crate."]
#![doc = ""]
#![doc = "This crate contains the domain models, authentication mechanisms, storage"]
#![doc = "gateway, routing configuration, and error handling for the TaskVault"]
#![doc = "application. It is used by the main binary (`main.rs`) to construct and"]
#![doc = "run the HTTP server."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod storage;
