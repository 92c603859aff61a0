//! Default in-memory implementations of the orchestrator's stores and
//! directories.
//!
//! These let a [`Scheduler`](crate::Scheduler) start with zero external
//! configuration and back the crate's tests. Each can be replaced via the
//! [`SchedulerBuilder`](crate::SchedulerBuilder).

pub mod in_memory_goal_store;
pub mod in_memory_step_store;
pub mod in_memory_trigger_store;
pub mod static_agent_directory;
pub use in_memory_goal_store::InMemoryExecutionGoalStore;
pub use in_memory_step_store::InMemoryStepStore;
pub use in_memory_trigger_store::InMemoryTriggerStore;
pub use static_agent_directory::StaticAgentDirectory;
