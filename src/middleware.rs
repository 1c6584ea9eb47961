// src/middleware.rs

pub mod auth;
pub mod tenancy;

pub use auth::{guard, RouteDecision, DEFAULT_LANDING, LOGIN_PATH};
pub use tenancy::OrganizationContext;
