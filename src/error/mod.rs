mod fetchline;

pub use fetchline::{FetchlineError, Outcome};

pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}
