//! Router Module Index
//!
//! Routes are split by who may call them; access control is attached per module.

/// Anonymous, read-only routes.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Content management for ADMIN users.
pub mod admin;
