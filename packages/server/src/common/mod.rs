// Common types and utilities shared across the application

pub mod api_response;
pub mod entity_ids;
pub mod id;
pub mod restate_serde;
pub mod restate_types;

pub use api_response::{ApiError, ApiResponse};
pub use entity_ids::*;
pub use id::{Id, V4, V7};
pub use restate_types::EmptyRequest;
