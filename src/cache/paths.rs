// Cache path utilities.
// Locates the cache directory and the store file inside it.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

/// File name of the cache store.
pub const DB_FILE_NAME: &str = "cache.redb";

/// Get the base cache directory (~/.cache/stargrep on Linux).
pub fn cache_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "stargrep").map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Path to the cache store inside `dir`.
pub fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILE_NAME)
}

/// Name of the item partition for a credential.
pub fn starred_partition(token: &str) -> String {
    format!("{}_starred", token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_paths() {
        let db = db_path(Path::new("/var/cache/stargrep"));
        assert_eq!(db, PathBuf::from("/var/cache/stargrep/cache.redb"));

        if let Some(dir) = cache_dir() {
            assert!(dir.ends_with("stargrep"));
        }
    }

    #[test]
    fn test_partition_names_are_per_token() {
        assert_eq!(starred_partition("abc"), "abc_starred");
        assert_ne!(starred_partition("abc"), starred_partition("abd"));
    }
}
