//! Business services for the admin console.

pub mod analytics;
pub mod auth;
pub mod upload;
