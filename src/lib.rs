mod job;
mod matcher;
mod registry;
mod scheduler;
mod server;
mod store;
mod worker;

pub use job::{Job, JobId, JobSpec, MinuteKey, Schedule, ValidationError};
pub use matcher::{Matcher, Tick};
pub use registry::{JobRegistry, RegistryError};
pub use scheduler::Scheduler;
pub use server::router;
pub use store::JobStore;
pub use worker::{Dispatcher, HelloRunner, JobRunner};
