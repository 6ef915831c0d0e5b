use std::io;
use std::time::Duration;

use log::warn;

/// Delays between attempts of a file operation; the first entry is the delay
/// before the first attempt and is normally zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            return Self::once();
        }
        Self { delays }
    }

    /// A single immediate attempt.
    #[must_use]
    pub fn once() -> Self {
        Self {
            delays: vec![Duration::ZERO],
        }
    }

    #[must_use]
    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    /// Run `operation`, retrying only while it fails with an error that
    /// indicates another process still holds the file.
    ///
    /// # Errors
    /// Returns the first non-lock error, or the last lock error once every
    /// attempt is used up.
    pub async fn run<T, F>(&self, what: &str, mut operation: F) -> io::Result<T>
    where
        F: FnMut() -> io::Result<T>,
    {
        let attempts = self.attempts();
        let mut last_error = None;

        for (index, delay) in self.delays.iter().enumerate() {
            if !delay.is_zero() {
                tokio::time::sleep(*delay).await;
            }

            match operation() {
                Ok(value) => return Ok(value),
                Err(error) if is_lock_error(&error) => {
                    warn!("{what} failed: {error} (attempt {}/{attempts})", index + 1);
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(last_error.unwrap_or_else(|| io::Error::other(format!("{what}: no attempts made"))))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}

fn is_lock_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::PermissionDenied {
        return true;
    }
    // ERROR_ACCESS_DENIED, ERROR_SHARING_VIOLATION
    cfg!(windows) && matches!(error.raw_os_error(), Some(5 | 32))
}
