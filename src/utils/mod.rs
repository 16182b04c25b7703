/// Retry helpers for transient upstream failures
pub mod retry;
/// Path normalization and per-request directory naming
pub mod path;

pub use retry::{with_retry, RetryPolicy};
pub use path::{normalize_user_input_path, sanitize_component, unique_workdir_name};
