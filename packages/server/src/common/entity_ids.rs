//! Typed ID definitions for all domain entities.
//!
//! This module defines type aliases for each domain entity, providing
//! compile-time type safety for ID usage throughout the application. All
//! entity ids are 128-bit random (v4) identifiers.
//!
//! # Example
//!
//! ```rust
//! use server_core::common::{TargetId, ScheduleId};
//!
//! // These are incompatible types - compiler prevents mixing them up
//! let target_id: TargetId = TargetId::new();
//! let schedule_id: ScheduleId = ScheduleId::new();
//!
//! // This would be a compile error:
//! // let wrong: ScheduleId = target_id;
//! ```

// Re-export the core Id type and version markers
pub use super::id::{Id, V4, V7};

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for URL entities (a parsed, reconstructable URL).
pub struct Url;

/// Marker type for Target entities (a reusable HTTP request template).
pub struct Target;

/// Marker type for Schedule entities (Interval or Window variant).
pub struct Schedule;

/// Marker type for Run entities (one end-to-end execution of a schedule tick).
pub struct Run;

/// Marker type for Attempt entities (one HTTP try within a Run).
pub struct Attempt;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

/// Typed ID for URL entities.
pub type UrlId = Id<Url, V4>;

/// Typed ID for Target entities.
pub type TargetId = Id<Target, V4>;

/// Typed ID for Schedule entities (shared across the Interval and Window tables).
pub type ScheduleId = Id<Schedule, V4>;

/// Typed ID for Run entities.
pub type RunId = Id<Run, V4>;

/// Typed ID for Attempt entities.
pub type AttemptId = Id<Attempt, V4>;
