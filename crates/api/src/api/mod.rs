// HTTP API routes
//
// This module contains the non-auth route handlers. Each submodule handles
// a specific resource type with its own AppState.

pub mod common;
pub mod users;

// Re-export common types
pub use common::{ErrorResponse, ListResponse};
