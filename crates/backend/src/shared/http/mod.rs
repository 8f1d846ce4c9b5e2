pub mod retry;

pub use retry::{execute_with_retry, ApiError, RetryPolicy};
