//! HTTP Surface
//!
//! REST handlers, custom extractors and the router.

pub mod extractors;
pub mod handlers;
pub mod routes;

pub use routes::create_router;
