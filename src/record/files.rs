//! Record file discovery
//!
//! Input listing and `part-NNNNN` naming for job output directories.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{NumberError, Result};

/// Names starting with these are bookkeeping, never data
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| {
            let n = n.to_string_lossy();
            n.starts_with('_') || n.starts_with('.')
        })
        .unwrap_or(true)
}

/// Resolve an input path into the record files it names
///
/// A file is its own single input. A directory contributes every regular,
/// non-hidden file it contains, in name order.
pub fn list_input_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(NumberError::Argument(format!(
            "input path does not exist: {}",
            path.display()
        )));
    }

    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let file_path = entry?.path();
        if file_path.is_file() && !is_hidden(&file_path) {
            files.push(file_path);
        }
    }
    files.sort();
    Ok(files)
}

/// File name of reduce partition `index`
pub fn part_file_name(index: usize) -> String {
    format!("part-{:05}", index)
}

/// Parse the partition index from a part file name
/// "part-00042" → Some(42)
pub fn parse_part_index(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_string_lossy();
    let id_str = name.strip_prefix("part-")?;
    id_str.parse().ok()
}

/// Part files of a job output directory, ordered by partition index
pub fn list_part_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut parts: Vec<(usize, PathBuf)> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let file_path = entry?.path();
        if !file_path.is_file() || is_hidden(&file_path) {
            continue;
        }
        if let Some(index) = parse_part_index(&file_path) {
            parts.push((index, file_path));
        }
    }

    parts.sort_by_key(|(index, _)| *index);
    Ok(parts.into_iter().map(|(_, path)| path).collect())
}

/// Replace `path` with `bytes` atomically: temporary sibling, fsync, rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp = temp_sibling(path);
    {
        let mut file = File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    if let Err(e) = fs::rename(&temp, path) {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }
    Ok(())
}

/// "dir/number.stage2" → "dir/.number.stage2.tmp"
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}
