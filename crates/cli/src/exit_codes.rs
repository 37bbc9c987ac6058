//! CLI Exit Code Registry
//!
//! Single source of truth for `shiptrack` exit codes. Schedulers and
//! wrapper scripts branch on them, so treat them as a stable contract.
//!
//! | Code | Meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | Success                                          |
//! | 1    | General error (unspecified)                      |
//! | 2    | Usage error (bad args, unreadable input file)    |
//! | 3    | Configuration invalid                            |
//! | 4    | No usable import batch                           |
//! | 5    | Tracking sheet could not be opened or read       |
//! | 6    | Carrier fetcher could not be set up              |
//! | 7    | Differences found (only with `--fail-on-diff`)   |

use shiptrack_config::ConfigError;
use shiptrack_recon::ReconError;

/// Command completed.
pub const EXIT_SUCCESS: u8 = 0;

/// Unspecified failure. Prefer a specific code.
pub const EXIT_ERROR: u8 = 1;

/// Bad arguments or an input file that cannot be used.
pub const EXIT_USAGE: u8 = 2;

/// Config file unreadable, unparsable or out of range.
pub const EXIT_CONFIG: u8 = 3;

/// No import batch in the source folder, or none of its rows is usable.
pub const EXIT_IMPORT_UNAVAILABLE: u8 = 4;

/// Tracking sheet could not be opened or loaded.
pub const EXIT_STORE: u8 = 5;

/// HTTP client for the carrier could not be built.
pub const EXIT_FETCH_SETUP: u8 = 6;

/// The run found differences and `--fail-on-diff` was given.
pub const EXIT_DIFFERENCES: u8 = 7;

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ImportUnavailable(_) => EXIT_IMPORT_UNAVAILABLE,
        ReconError::StoreLoad(_) => EXIT_STORE,
        ReconError::CollaboratorInit(_) => EXIT_FETCH_SETUP,
    }
}

pub fn config_exit_code(_err: &ConfigError) -> u8 {
    EXIT_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiptrack_recon::StoreError;

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG,
            EXIT_IMPORT_UNAVAILABLE,
            EXIT_STORE,
            EXIT_FETCH_SETUP,
            EXIT_DIFFERENCES,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn recon_errors_map_to_codes() {
        assert_eq!(
            recon_exit_code(&ReconError::ImportUnavailable("x".into())),
            EXIT_IMPORT_UNAVAILABLE
        );
        assert_eq!(
            recon_exit_code(&ReconError::StoreLoad(StoreError::Malformed("x".into()))),
            EXIT_STORE
        );
        assert_eq!(
            recon_exit_code(&ReconError::CollaboratorInit("x".into())),
            EXIT_FETCH_SETUP
        );
    }
}
