//! Best-effort folder handling shared by both pipelines.

use std::fs;
use std::path::Path;
use tracing::error;

/// Create `path` and its parents if missing.
///
/// Failures are logged, never returned: callers carry on and let the
/// following file operation report the real problem.
pub fn ensure_folder(path: &Path) -> bool {
    match fs::create_dir_all(path) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %path.display(), error = %e, "could not create folder");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_creates_nested_folders() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        assert!(ensure_folder(&nested));
        assert!(nested.is_dir());
        // already present is fine
        assert!(ensure_folder(&nested));
    }

    #[test]
    fn test_reports_failure_when_a_file_is_in_the_way() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        assert!(!ensure_folder(&blocker.join("child")));
    }
}
