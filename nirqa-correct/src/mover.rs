//! Atomic record-file moves for routing
//!
//! Move = copy to destination, verify, then remove the source. A crash
//! between the copy and the remove leaves both copies on disk, never zero;
//! the next run then sees the destination occupied and reports a collision
//! instead of overwriting it.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Mover errors
#[derive(Debug, Error)]
pub enum MoveError {
    #[error("destination already exists: {}", .0.display())]
    Collision(PathBuf),

    #[error("destination write incomplete: {} ({written} of {expected} bytes)", dest.display())]
    IncompleteWrite {
        dest: PathBuf,
        written: u64,
        expected: u64,
    },

    #[error("IO error moving {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a (possibly dry-run) move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// File now lives at the destination; source removed
    Moved(PathBuf),
    /// Dry-run: the move that would happen
    WouldMove(PathBuf),
}

/// Move `src` into `dest_dir`, keeping its file name.
///
/// The destination directory is created on demand. An existing destination
/// file is preserved and reported as a collision; the source stays put. The
/// source is only removed after the destination's length matches.
pub fn move_into(src: &Path, dest_dir: &Path, dry_run: bool) -> Result<MoveOutcome, MoveError> {
    let file_name = src.file_name().ok_or_else(|| MoveError::Io {
        path: src.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
    })?;
    let dest = dest_dir.join(file_name);

    if dest.exists() {
        return Err(MoveError::Collision(dest));
    }

    if dry_run {
        tracing::info!(src = %src.display(), dest = %dest.display(), "Dry-run: would move");
        return Ok(MoveOutcome::WouldMove(dest));
    }

    std::fs::create_dir_all(dest_dir).map_err(|e| MoveError::Io {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let expected = std::fs::metadata(src)
        .map_err(|e| MoveError::Io {
            path: src.to_path_buf(),
            source: e,
        })?
        .len();

    let written = std::fs::copy(src, &dest).map_err(|e| MoveError::Io {
        path: dest.clone(),
        source: e,
    })?;

    if written != expected {
        // Keep the source; discard the partial destination copy.
        let _ = std::fs::remove_file(&dest);
        return Err(MoveError::IncompleteWrite {
            dest,
            written,
            expected,
        });
    }

    std::fs::remove_file(src).map_err(|e| MoveError::Io {
        path: src.to_path_buf(),
        source: e,
    })?;

    tracing::info!(src = %src.display(), dest = %dest.display(), "Moved");
    Ok(MoveOutcome::Moved(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn moves_file_and_removes_source() {
        let tmp = TempDir::new().unwrap();
        let src = write(tmp.path(), "rec.json", "{\"id\":\"rec\"}");
        let dest_dir = tmp.path().join("Possible_Out_Of_Scope");

        let outcome = move_into(&src, &dest_dir, false).unwrap();
        assert_eq!(outcome, MoveOutcome::Moved(dest_dir.join("rec.json")));
        assert!(!src.exists());
        assert_eq!(
            std::fs::read_to_string(dest_dir.join("rec.json")).unwrap(),
            "{\"id\":\"rec\"}"
        );
    }

    #[test]
    fn collision_preserves_both_files() {
        let tmp = TempDir::new().unwrap();
        let src = write(tmp.path(), "rec.json", "new content");
        let dest_dir = tmp.path().join("Possible_Duplicates");
        std::fs::create_dir_all(&dest_dir).unwrap();
        write(&dest_dir, "rec.json", "existing content");

        let err = move_into(&src, &dest_dir, false).unwrap_err();
        assert!(matches!(err, MoveError::Collision(_)));
        // Existing destination untouched, source still in place
        assert_eq!(
            std::fs::read_to_string(dest_dir.join("rec.json")).unwrap(),
            "existing content"
        );
        assert!(src.exists());
    }

    #[test]
    fn crash_between_copy_and_delete_never_loses_the_record() {
        let tmp = TempDir::new().unwrap();
        let src = write(tmp.path(), "rec.json", "payload");
        let dest_dir = tmp.path().join("Possible_Out_Of_Scope");
        std::fs::create_dir_all(&dest_dir).unwrap();

        // Simulate a prior run that crashed after the destination write:
        // the destination copy exists and the source was never removed.
        std::fs::copy(&src, dest_dir.join("rec.json")).unwrap();

        // The re-run reports a collision; at no point are there zero copies.
        let err = move_into(&src, &dest_dir, false).unwrap_err();
        assert!(matches!(err, MoveError::Collision(_)));
        assert!(src.exists());
        assert!(dest_dir.join("rec.json").exists());
    }

    #[test]
    fn dry_run_touches_nothing() {
        let tmp = TempDir::new().unwrap();
        let src = write(tmp.path(), "rec.json", "payload");
        let dest_dir = tmp.path().join("Possible_Out_Of_Scope");

        let outcome = move_into(&src, &dest_dir, true).unwrap();
        assert_eq!(outcome, MoveOutcome::WouldMove(dest_dir.join("rec.json")));
        assert!(src.exists());
        assert!(!dest_dir.exists());
    }
}
