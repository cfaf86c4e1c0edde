pub mod backoff;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod store;
pub mod worker;

pub use backoff::Backoff;
pub use coordinator::{Coordinator, RunReport};
pub use error::FetchlineError;
pub use store::{DedupStore, ResultLog, WorkQueue};
