//! # Domain Value Objects
//!
//! Immutable value types that represent domain concepts without identity.
//!
//! ## Value Objects
//!
//! - **Credits**: Wallet amount in minor currency units with checked arithmetic
//! - **TagName**: Normalised tag label

mod credits;
mod tag_name;

pub use credits::*;
pub use tag_name::*;
