//! # Market Server Library
//!
//! Backend for a creator marketplace:
//! - Accounts with JWT access tokens and rotating refresh sessions
//! - Posts with tags, images and subscriber-only private content
//! - Paid chat requests with in-chat credit transfers and ratings
//! - A WebSocket gateway that pushes chat and wallet events live
//! - Reports and an admin surface for moderation
//!
//! ## Architecture
//!
//! - **Domain Layer**: Entities, value objects and repository traits
//! - **Application Layer**: Business services and DTOs
//! - **Infrastructure Layer**: PostgreSQL, Redis, media storage, metrics
//! - **Presentation Layer**: HTTP handlers, middleware and the gateway
//!
//! ## Module Structure
//!
//! ```text
//! market_server/
//! +-- config/         Configuration management
//! +-- domain/         Entities, value objects, repository traits
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Database, cache, storage, metrics
//! +-- presentation/   HTTP routes and WebSocket gateway
//! +-- shared/         Errors, pagination, validation, snowflake IDs
//! ```

pub mod config;

pub mod domain;

pub mod application;

pub mod infrastructure;

pub mod presentation;

pub mod shared;

pub mod startup;

pub mod telemetry;
