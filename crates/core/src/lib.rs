//! Mi Store Core - Shared domain types and business rules.
//!
//! This crate provides the types and rules used across all Mi Store components:
//! - `storefront` - Public JSON API consumed by the shop pages
//! - `admin` - Management API consumed by the admin console
//! - `db` - `PostgreSQL` repositories
//! - `cli` - Migrations, seeding and admin user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Anything that decides *whether* something is allowed (an
//! order status change, a coupon redemption, a lottery outcome) lives here so
//! it can be unit tested without a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money rounding, emails and status enums
//! - [`pagination`] - Page requests and page arithmetic
//! - [`listing`] - In-memory filter/sort/slice helpers for small tables
//! - [`validation`] - Field-level form validation
//! - [`pricing`] - Shipping and order total calculation
//! - [`coupon`] - Coupon eligibility and discount rules
//! - [`lottery`] - Prize odds and weighted draws
//! - [`api`] - JSON response envelopes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod coupon;
pub mod listing;
pub mod lottery;
pub mod pagination;
pub mod pricing;
pub mod types;
pub mod validation;

pub use types::*;
