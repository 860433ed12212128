//! Fraud Detection Service Library
//!
//! Real-time risk scoring for financial transactions: stateless amount,
//! pattern, time and type rules, per-account velocity tracking over sliding
//! windows, and a threshold decision engine, served over HTTP.

pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
