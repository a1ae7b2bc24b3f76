//! Business logic services for the storefront.
//!
//! - `auth` - Password registration and login

pub mod auth;
