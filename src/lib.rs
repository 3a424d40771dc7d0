pub mod auth;
pub mod certificates;
pub mod clock;
pub mod config;
pub mod domain;
pub mod notify;
pub mod ranking;
pub mod routes;
pub mod state;
pub mod store;
pub mod workflow;
