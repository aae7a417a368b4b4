pub mod activities;
pub mod interval;
pub mod window;

pub use interval::{IntervalScheduleWorkflow, IntervalScheduleWorkflowImpl, ScheduleWorkflowRequest, ScheduleWorkflowResult};
pub use window::{WindowScheduleWorkflow, WindowScheduleWorkflowImpl};
