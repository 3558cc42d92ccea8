//! HTTP Handlers
//!
//! Request handlers for all HTTP endpoints.

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod posts;
pub mod reports;
pub mod subscriptions;
pub mod tags;
pub mod users;
pub mod wallet;
