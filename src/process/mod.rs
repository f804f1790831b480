//! Process supervision
//!
//! Spawns the browser and driver as detached processes, tracks their pids,
//! and tears every tracked process down at shutdown. Also exposes the
//! [`Health`] capability the event reactor polls while waiting for the
//! debugging service to come up.

pub mod supervisor;
pub mod traits;

pub use supervisor::{PidHealth, ProcessSupervisorImpl};
pub use traits::{Health, ProcessSupervisor};
