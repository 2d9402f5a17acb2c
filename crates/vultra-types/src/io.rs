//! Atomic output-file discipline shared by the codecs and the build cache.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Write `bytes` to `path` atomically.
///
/// The bytes go to `<path>.tmp.<pid>` first, then the temp file is renamed
/// over the target, so a reader can never observe a partially written file.
/// If the rename fails because the target exists (Windows semantics), the
/// target is removed and the rename retried once. Parent directories are
/// created as needed.
pub fn write_file_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::io(format!(
                    "failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }

    let tmp_path = temp_sibling(path);
    fs::write(&tmp_path, bytes)
        .map_err(|e| Error::io(format!("failed to write {}: {e}", tmp_path.display())))?;

    if fs::rename(&tmp_path, path).is_ok() {
        return Ok(());
    }

    let _ = fs::remove_file(path);
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::io(format!(
            "failed to rename {} to {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(format!(".tmp.{}", std::process::id()));
    PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_replaces_target() {
        let dir = std::env::temp_dir().join(format!("vultra-io-test-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let path = dir.join("nested").join("out.bin");

        write_file_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first");

        write_file_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        // No temp file left behind.
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("out.bin")]);

        let _ = fs::remove_dir_all(&dir);
    }
}
