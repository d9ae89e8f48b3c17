//! Enhanced error handling: wraps failures with a colored message plus a
//! numbered list of suggested fixes.

use anyhow::Result;
use colored::Colorize;

/// Adds helpful context and suggestions to an error.
pub trait EnhancedError<T> {
    /// Add context with helpful suggestions.
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> EnhancedError<T> for Result<T, E> {
    fn context_with_help(self, msg: &str, help: &[&str]) -> Result<T> {
        self.map_err(|e| {
            let mut error_msg = format!("{}\n\n{}", msg.red().bold(), e);
            if !help.is_empty() {
                error_msg.push_str(&format!("\n\n{}", "Possible solutions:".yellow().bold()));
                for (i, h) in help.iter().enumerate() {
                    error_msg.push_str(&format!("\n  {}. {}", i + 1, h));
                }
            }
            anyhow::anyhow!(error_msg)
        })
    }
}

/// Common error messages and help text for this CLI's operations.
pub mod helpers {
    /// Memory not found error help.
    pub const MEMORY_NOT_FOUND_HELP: &[&str] = &[
        "Check that the memory id is correct",
        "Run 'cognitive-memory stats' to see current counts by level",
    ];

    /// Storage connection error help.
    pub const STORAGE_CONNECTION_HELP: &[&str] = &[
        "Verify the vector_store_endpoint / metadata_db_path in your configuration",
        "If using Turso, check TURSO_AUTH_TOKEN and that the URL uses the libsql:// scheme",
        "Try the local redb backend by unsetting a libsql:// endpoint",
    ];

    /// Configuration error help.
    pub const CONFIG_ERROR_HELP: &[&str] = &[
        "Check the TOML file passed via --config",
        "Recognized overrides include ACTIVATION_THRESHOLD, MAX_ACTIVATIONS, BRIDGE_K, \
         BRIDGE_NOVELTY_MIN, BRIDGE_CP_MIN, EPISODIC_DECAY, SEMANTIC_DECAY, \
         PROMOTE_ACCESS_COUNT, MONITORING_ENABLED, MONITORING_INTERVAL_SECONDS, \
         and SYNC_ATOMIC_OPERATIONS",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enhanced_error_lists_suggestions() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));
        let enhanced = result.context_with_help("Operation failed", &["Solution 1", "Solution 2"]);
        let error_str = enhanced.unwrap_err().to_string();
        assert!(error_str.contains("Possible solutions:"));
        assert!(error_str.contains("Solution 1"));
    }

    #[test]
    fn enhanced_error_without_help_omits_the_section() {
        let result: Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"));
        let enhanced = result.context_with_help("Operation failed", &[]);
        let error_str = enhanced.unwrap_err().to_string();
        assert!(!error_str.contains("Possible solutions:"));
    }
}
