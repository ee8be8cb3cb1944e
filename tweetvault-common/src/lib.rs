//! Shared error type and observability helpers for the tweetvault crates.
//!
//! Every adapter returns [`Result`], whose error side is [`VaultError`]. The
//! variants follow the failure taxonomy the archiving pipeline cares about:
//! configuration problems are fatal at construction, network failures are
//! propagated, and media selection failures are *expected* errors that the
//! caller reports verbatim instead of treating them as bugs.
//!
//! ```rust
//! use tweetvault_common::VaultError;
//!
//! let err = VaultError::NotAVideo(1);
//! assert!(err.is_expected());
//! assert_eq!(err.to_string(), "Media #1 is not a video");
//! ```

pub mod observability;

/// Error types used across the tweetvault workspace.
#[derive(thiserror::Error, Debug)]
pub enum VaultError {
    /// A required option was missing or blank.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport or API failure while talking to the platform.
    #[error("Network error: {0}")]
    Network(String),

    /// The requested 1-based media index has no entry.
    #[error("Video #{0} is unavailable")]
    Unavailable(usize),

    /// The requested 1-based media index exists but is not a video.
    #[error("Media #{0} is not a video")]
    NotAVideo(usize),

    /// Nothing extractable and no external link to fall back to.
    #[error("No video could be found in tweet {0}")]
    NoMedia(String),

    /// The locator does not look like a status URL.
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),

    /// A response did not have the shape we map from.
    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Expected errors describe the input, not a defect; callers surface the
    /// message to the user without a backtrace.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            VaultError::Unavailable(_)
                | VaultError::NotAVideo(_)
                | VaultError::NoMedia(_)
                | VaultError::UnsupportedLocator(_)
        )
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        VaultError::Malformed(e.to_string())
    }
}

/// Convenient alias for results that use [`VaultError`].
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_errors_are_expected() {
        assert!(VaultError::Unavailable(3).is_expected());
        assert!(VaultError::NotAVideo(1).is_expected());
        assert!(!VaultError::Network("reset".into()).is_expected());
        assert!(!VaultError::Config("username".into()).is_expected());
    }

    #[test]
    fn messages_name_the_index() {
        assert_eq!(
            VaultError::Unavailable(3).to_string(),
            "Video #3 is unavailable"
        );
    }

    #[test]
    fn json_errors_become_malformed() {
        let err: VaultError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, VaultError::Malformed(_)));
    }
}
