//! Bearer token verification.
//!
//! - [`jwt`] -- HS256 access-token validation (and generation for tests and
//!   local tooling).

pub mod jwt;
