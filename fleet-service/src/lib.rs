//! fleet-service: back office of a trucking company.
//!
//! Owning firms, their workers, trucks, tours, fuel cards, contacts,
//! invoices and credit notes behind a token-authenticated JSON API, with
//! every mutation written to an audit log.

pub mod audit;
pub mod billing;
pub mod config;
pub mod dtos;
pub mod export;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod services;
pub mod startup;
pub mod utils;
