//! Save directory
//!
//! Save files are named `save-<N>.json`; a new save takes the highest
//! existing N plus one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SaveDirError {
    #[error("save directory i/o on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("save file {path} is not valid: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Id of a file named `save-<N>.json`.
pub fn parse_save_id(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("save-")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

pub fn save_file_name(id: u32) -> String {
    format!("save-{id}.json")
}

/// Existing saves sorted by id. A missing directory holds no saves.
pub fn list_saves(dir: &Path) -> Result<Vec<(u32, PathBuf)>, SaveDirError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let io_err = |source| SaveDirError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut saves = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        let name = entry.file_name();
        if let Some(id) = name.to_str().and_then(parse_save_id) {
            saves.push((id, entry.path()));
        }
    }
    saves.sort_by_key(|(id, _)| *id);
    Ok(saves)
}

pub fn next_save_path(dir: &Path) -> Result<PathBuf, SaveDirError> {
    let next = list_saves(dir)?
        .last()
        .map_or(1, |(id, _)| id.saturating_add(1));
    Ok(dir.join(save_file_name(next)))
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), SaveDirError> {
    let io_err = |source| SaveDirError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let text = serde_json::to_string_pretty(value).map_err(|source| SaveDirError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, text).map_err(io_err)?;
    debug!(path = %path.display(), "save written");
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SaveDirError> {
    let text = fs::read_to_string(path).map_err(|source| SaveDirError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SaveDirError::Format {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_digit_ids() {
        assert_eq!(parse_save_id("save-3.json"), Some(3));
        assert_eq!(parse_save_id("save-12.json"), Some(12));
        assert_eq!(parse_save_id("save-.json"), None);
        assert_eq!(parse_save_id("save-3.json.bak"), None);
        assert_eq!(parse_save_id("config.json"), None);
    }

    #[test]
    fn next_path_follows_highest_id() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(next_save_path(dir.path()).unwrap(), dir.path().join("save-1.json"));

        for name in ["save-2.json", "save-10.json", "notes.txt", "save-x.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        assert_eq!(next_save_path(dir.path()).unwrap(), dir.path().join("save-11.json"));

        let ids: Vec<u32> = list_saves(dir.path()).unwrap().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![2, 10]);
    }

    #[test]
    fn missing_directory_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let saves = dir.path().join("saves");
        assert_eq!(next_save_path(&saves).unwrap(), saves.join("save-1.json"));
    }

    #[test]
    fn json_roundtrip_and_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("save-1.json");
        write_json(&path, &vec![1, 2, 3]).unwrap();
        let back: Vec<i32> = read_json(&path).unwrap();
        assert_eq!(back, vec![1, 2, 3]);

        fs::write(&path, "[1,").unwrap();
        assert!(matches!(read_json::<Vec<i32>>(&path), Err(SaveDirError::Format { .. })));
    }
}
