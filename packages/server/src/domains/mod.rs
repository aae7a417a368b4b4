pub mod control_plane;
pub mod probe;
pub mod runs;
pub mod schedules;
pub mod targets;
pub mod urls;
pub mod workflows;
