/// Unified error handling for the local music skill
///
/// Internal helpers return `SkillError` and propagate with `?`. The skill
/// facade turns every error into a "not found" result bundle with a message
/// key, so nothing here is fatal to the host.

use thiserror::Error;

/// Main error type for all skill operations
#[derive(Error, Debug)]
pub enum SkillError {
    /// The player command ran but returned a non-zero exit code
    #[error("mpc {cmd} failed with exit code {code}")]
    Player { cmd: String, code: i32 },

    /// The stream helper ran but returned a non-zero exit code
    #[error("Stream helper {cmd} failed with exit code {code}")]
    StreamHelper { cmd: String, code: i32 },

    /// An external program could not be started at all
    #[error("Failed to run {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// Configuration and settings errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Radio station file errors (missing file, malformed rows)
    #[error("Station list error: {0}")]
    Stations(String),

    /// Internet music search errors (unexpected page layout, API failures)
    #[error("Search error: {0}")]
    Search(String),

    /// News bulletin errors (page scraping, download)
    #[error("News error: {0}")]
    News(String),

    /// File I/O errors (settings, downloads, station file)
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SkillError {
    /// Exit code to report in an `mpc_failed` message
    pub fn return_code(&self) -> i32 {
        match self {
            SkillError::Player { code, .. } | SkillError::StreamHelper { code, .. } => *code,
            _ => -1,
        }
    }
}

/// Helper trait to convert external error types to SkillError
pub trait IntoSkillError<T> {
    fn map_skill_err<F>(self, f: F) -> Result<T, SkillError>
    where
        F: FnOnce(String) -> SkillError;
}

impl<T, E: std::fmt::Display> IntoSkillError<T> for Result<T, E> {
    fn map_skill_err<F>(self, f: F) -> Result<T, SkillError>
    where
        F: FnOnce(String) -> SkillError,
    {
        self.map_err(|e| f(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SkillError::Player {
            cmd: "load road_trip".to_string(),
            code: 1,
        };
        assert_eq!(err.to_string(), "mpc load road_trip failed with exit code 1");
        assert_eq!(err.return_code(), 1);
    }

    #[test]
    fn test_stream_helper_error_display() {
        let err = SkillError::StreamHelper {
            cmd: "ytadd https://www.youtube.com/watch?v=abc".to_string(),
            code: 2,
        };
        assert_eq!(
            err.to_string(),
            "Stream helper ytadd https://www.youtube.com/watch?v=abc failed with exit code 2"
        );
        assert!(!err.to_string().starts_with("mpc"));
        assert_eq!(err.return_code(), 2);
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let skill_err: SkillError = io_err.into();
        assert!(skill_err.to_string().contains("file not found"));
        assert_eq!(skill_err.return_code(), -1);
    }

    #[test]
    fn test_map_skill_err() {
        let result: Result<(), &str> = Err("bad row");
        let err = result.map_skill_err(SkillError::Stations).unwrap_err();
        assert_eq!(err.to_string(), "Station list error: bad row");
    }
}
