//! Background task runner
//!
//! Runs one blocking operation on its own worker thread and queues every
//! progress message plus the final result for a single consumer thread,
//! which drains them on its own schedule.

pub mod task;

pub use task::{run_in_background, BackgroundTask, ProgressSink, TaskEvent};
