//! Utility modules.

pub mod file;
pub mod retry;

pub use file::{collect_files, display_name, read_file_content};
pub use retry::{RetryPolicy, Retryable, with_retry};
