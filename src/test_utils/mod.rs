//! Test utilities for integration testing.
//!
//! This module provides:
//! - In-memory repository implementations for mocking persistence
//! - Static stand-ins for the outbound Google and host-session calls
//! - A builder for constructing `AppState` with test dependencies

mod app_state_builder;
mod auth_mocks;
mod credit_mocks;
mod factories;

pub use app_state_builder::*;
pub use auth_mocks::*;
pub use credit_mocks::*;
pub use factories::*;
