use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Directory under the temp root that holds all form flash state.
pub const FORMS_DIR: &str = "forms";

/// Index document name inside each flash directory.
pub const INDEX_FILE: &str = "index.json";

/// Per-session flash root, `None` when the session id is empty.
#[must_use]
pub fn session_tmp_dir(tmp_root: &Path, session_id: &str) -> Option<PathBuf> {
    if session_id.is_empty() {
        return None;
    }

    Some(tmp_root.join(FORMS_DIR).join(session_id))
}

/// Flash directory for one (session, form instance) pair.
#[must_use]
pub fn flash_dir(tmp_root: &Path, session_id: &str, unique_id: &str) -> Option<PathBuf> {
    session_tmp_dir(tmp_root, session_id).map(|dir| dir.join(unique_id))
}

#[must_use]
pub fn index_path(flash_dir: &Path) -> PathBuf {
    flash_dir.join(INDEX_FILE)
}

/// Randomized on-disk name for a moved upload, decoupled from the
/// client-supplied filename.
#[must_use]
pub fn random_tmp_name() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Resolves a stored temp name inside a flash directory. Generated names are
/// plain hex; anything with a path separator came from a tampered index and
/// must not resolve.
#[must_use]
pub fn tmp_file_path(flash_dir: &Path, tmp_name: &str) -> Option<PathBuf> {
    if tmp_name.is_empty() || tmp_name == ".." || tmp_name.contains(['/', '\\']) {
        return None;
    }

    Some(flash_dir.join(tmp_name))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{flash_dir, session_tmp_dir, tmp_file_path};

    #[test]
    fn empty_session_has_no_directory() {
        assert_eq!(session_tmp_dir(Path::new("/tmp"), ""), None);
        assert_eq!(flash_dir(Path::new("/tmp"), "", "form-1"), None);
    }

    #[test]
    fn flash_dir_nests_session_and_unique_id() {
        let dir = flash_dir(Path::new("/tmp"), "abc", "f1").expect("dir should resolve");
        assert_eq!(dir, Path::new("/tmp/forms/abc/f1"));
    }

    #[test]
    fn tmp_file_path_rejects_traversal_names() {
        let dir = Path::new("/tmp/forms/abc/f1");
        assert!(tmp_file_path(dir, "").is_none());
        assert!(tmp_file_path(dir, "..").is_none());
        assert!(tmp_file_path(dir, "../escape").is_none());
        assert!(tmp_file_path(dir, "a\\b").is_none());
        assert!(tmp_file_path(dir, "0f8fad5bd9cb469fa165408766e3d7b2").is_some());
    }
}
