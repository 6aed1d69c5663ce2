//! Terminate-on-error policy for binaries.

use std::error::Error;
use std::fmt::Write;

/// Unwrap a result or end the process.
///
/// On `Err` the error and its `source()` chain are logged at `error` level
/// and the process exits with status 1. Libraries never call this; it is
/// meant for `main`.
pub trait OrAbort<T> {
    fn or_abort(self) -> T;
}

impl<T, E: Error> OrAbort<T> for Result<T, E> {
    fn or_abort(self) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                log::error!("{}", error_chain(&e));
                log::logger().flush();
                std::process::exit(1);
            }
        }
    }
}

/// `outer: inner: root` rendering of an error and its sources.
#[must_use]
pub fn error_chain(error: &dyn Error) -> String {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(text, ": {cause}");
        source = cause.source();
    }
    text
}
