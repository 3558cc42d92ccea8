//! # Domain Services
//!
//! Domain services encapsulate business rules that don't naturally belong to
//! a single entity. They are pure: no I/O, no clocks beyond what callers pass.
//!
//! ## Services
//!
//! - **ChatPolicy**: Which participant may do what in each chat request state
//! - **AccessPolicy**: Full view vs locked preview of private posts

mod access_policy;
mod chat_policy;

pub use access_policy::*;
pub use chat_policy::*;
