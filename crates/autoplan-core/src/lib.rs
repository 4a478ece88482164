//! # AutoPlan Core Library
//!
//! This library turns a snapshot of a task manager's tasks into a proposed
//! working timeline. It holds no state between passes: the host hands over
//! task records, busy time and a configuration, and gets back a plan it can
//! write back on its own terms.
//!
//! ## Architecture
//!
//! - **Calendar filter**: Tasks that look like synced calendar events are left out
//! - **Urgency**: Weighted score from list position, tags, remaining effort and age
//! - **Splitter**: Remaining effort is cut into linked, titled blocks
//! - **Scheduler**: Blocks are placed into free slots of the working-day window
//!
//! ## Key Components
//!
//! - [`plan`]: One full scheduling pass
//! - [`Config`]: Scheduler configuration (TOML)
//! - [`Task`]: Host task record
//! - [`AutoScheduler`]: Placement of blocks on the timeline

pub mod calendar;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod task;
pub mod time;
pub mod urgency;

pub use calendar::{looks_like_calendar_import, partition_calendar_imports};
pub use config::{Config, DurationPreference, PlacementConfig, TagAggregate, UrgencyConfig, UrgencyWeights};
pub use error::{ConfigError, CoreError, Result, ValidationError};
pub use pipeline::{plan, SchedulePlan};
pub use scheduler::{AutoScheduler, BusyInterval, FreeSlot, Placement, ScheduledBlock, ScoredUnit};
pub use task::{
    load_tasks, process_all_tasks, split_task, tasks_from_json, ClassificationResult, SplitUnit, Task,
    Timestamp,
};
pub use urgency::{sort_by_urgency, ScoredTask, UrgencyBreakdown, UrgencyScorer};
