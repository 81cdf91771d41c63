//! Runtime helpers for the `docpack` dispatcher.
//!
//! Centralizes executable detection and the helper search order so the
//! umbrella binary finds `validate-docpack` and friends whether it runs from
//! a cargo build tree or an installed location.

use anyhow::{Result, bail};
use std::env;
use std::path::{Path, PathBuf};

/// Returns true when a file exists and has any execute bit set.
pub fn helper_is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            return meta.permissions().mode() & 0o111 != 0;
        }
        false
    }
    #[cfg(not(unix))]
    {
        true
    }
}

/// Candidate helper locations, most specific first.
///
/// A sibling of the running executable wins (the normal case for both
/// `cargo build` output and installed binaries), then the repository's
/// `target/release` and `target/debug` builds.
pub fn helper_candidates(exe_dir: Option<&Path>, repo_root: Option<&Path>, name: &str) -> Vec<PathBuf> {
    let file_name = format!("{name}{}", env::consts::EXE_SUFFIX);
    let mut candidates = Vec::new();
    if let Some(dir) = exe_dir {
        candidates.push(dir.join(&file_name));
    }
    if let Some(root) = repo_root {
        candidates.push(root.join("target").join("release").join(&file_name));
        candidates.push(root.join("target").join("debug").join(&file_name));
    }
    candidates
}

/// Locate helper `name`: next to the current executable, under the repo's
/// cargo target dir, then on PATH.
pub fn resolve_helper(name: &str, repo_root: Option<&Path>) -> Result<PathBuf> {
    let current_exe = env::current_exe().ok();
    let exe_dir = current_exe.as_deref().and_then(Path::parent);
    for candidate in helper_candidates(exe_dir, repo_root, name) {
        if helper_is_executable(&candidate) {
            return Ok(candidate);
        }
    }

    if let Some(path) = find_on_path(name) {
        return Ok(path);
    }

    bail!("Unable to locate helper '{name}'. Run 'cargo build' or put the docpack binaries on PATH.")
}

/// Find an executable by name somewhere on PATH.
pub fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    let file_name = format!("{name}{}", env::consts::EXE_SUFFIX);
    env::split_paths(&paths)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| helper_is_executable(candidate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn candidates_prefer_exe_sibling_then_release() {
        let candidates = helper_candidates(
            Some(Path::new("/opt/docpack/bin")),
            Some(Path::new("/repo")),
            "map-changes",
        );
        let suffix = env::consts::EXE_SUFFIX;
        assert_eq!(
            candidates,
            vec![
                PathBuf::from(format!("/opt/docpack/bin/map-changes{suffix}")),
                PathBuf::from(format!("/repo/target/release/map-changes{suffix}")),
                PathBuf::from(format!("/repo/target/debug/map-changes{suffix}")),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn executable_bit_is_required() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("helper");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        assert!(!helper_is_executable(&path));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        assert!(helper_is_executable(&path));
        assert!(!helper_is_executable(temp.path()));
    }
}
