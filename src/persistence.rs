//! Pattern files: a flat JSON array of 256 booleans in row-major order.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{FormatError, Result};
use crate::sequencer::Grid;

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Parse pattern file contents into a grid.
pub fn parse_pattern(contents: &str) -> std::result::Result<Grid, FormatError> {
    let flags: Vec<bool> = serde_json::from_str(contents)?;
    Grid::from_flags(&flags)
}

pub fn load_pattern(path: &Path) -> Result<Grid> {
    let contents = fs::read_to_string(path)?;
    let grid = parse_pattern(&contents)?;
    tracing::info!("loaded pattern from {}", path.display());
    Ok(grid)
}

/// Write the grid to `path` via a temporary file and rename, so a failed
/// save never leaves a truncated pattern behind.
pub fn save_pattern(path: &Path, grid: &Grid) -> Result<()> {
    let json = serde_json::to_string(&grid.flags()).map_err(FormatError::from)?;
    let tmp_path = tmp_path(path);

    let written = (|| -> std::io::Result<()> {
        {
            let mut f = fs::File::create(&tmp_path)?;
            f.write_all(json.as_bytes())?;
            f.sync_all()?;
        }

        #[cfg(windows)]
        {
            if path.exists() {
                // Windows rename fails if destination exists.
                fs::remove_file(path)?;
            }
        }

        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }

    tracing::info!("saved pattern to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::sequencer::CELLS;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.json");

        let mut grid = Grid::new();
        grid.set(0, 0, true);
        grid.set(7, 9, true);
        grid.set(15, 15, true);

        save_pattern(&path, &grid).unwrap();
        assert_eq!(load_pattern(&path).unwrap(), grid);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_file_is_flat_bool_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.json");
        let mut grid = Grid::new();
        grid.set(0, 1, true);
        save_pattern(&path, &grid).unwrap();

        let raw: Vec<bool> = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), CELLS);
        assert!(raw[1]);
        assert!(!raw[0]);
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.json");
        fs::write(&path, "old contents that are much longer than a pattern").unwrap();

        let grid = Grid::new();
        save_pattern(&path, &grid).unwrap();
        assert_eq!(load_pattern(&path).unwrap(), grid);
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("pattern.json");
        assert!(matches!(save_pattern(&path, &Grid::new()), Err(Error::Io(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_parse_wrong_length() {
        let err = parse_pattern("[true, false]").unwrap_err();
        assert!(matches!(err, FormatError::WrongLength { found: 2, .. }));
    }

    #[test]
    fn test_parse_wrong_type() {
        let json = serde_json::to_string(&vec![1; CELLS]).unwrap();
        assert!(matches!(parse_pattern(&json), Err(FormatError::Malformed(_))));
        assert!(matches!(parse_pattern("not json"), Err(FormatError::Malformed(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_pattern(&dir.path().join("nope.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
