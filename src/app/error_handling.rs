//! Error handling utilities
//!
//! This module provides centralized handling of fatal errors.

use crate::error::Error;
use tracing::error;

pub const EXIT_GENERAL_ERROR: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Map a fatal error to the process exit code
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<Error>() {
        Some(Error::Config(_)) => EXIT_CONFIG_ERROR,
        _ => EXIT_GENERAL_ERROR,
    }
}

/// Handle fatal errors and exit with appropriate status code
///
/// - `verbose = 0`: the error message only
/// - `verbose >= 1`: the full error chain
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_exit_with_two() {
        let err = anyhow::Error::new(Error::Config("Missing CALTOPO_CRED_ID".into()));
        assert_eq!(exit_code(&err), EXIT_CONFIG_ERROR);
    }

    #[test]
    fn test_other_errors_exit_with_one() {
        let api = anyhow::Error::new(Error::Api {
            status: 500,
            body: String::new(),
        });
        assert_eq!(exit_code(&api), EXIT_GENERAL_ERROR);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_GENERAL_ERROR);
    }
}
