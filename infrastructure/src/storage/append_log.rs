//! Line-oriented JSON file shared by the JSONL stores.

use chainbet_application::JournalError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

pub(super) struct AppendLog {
    file: File,
    path: PathBuf,
}

impl AppendLog {
    /// Open `path` for appending and replay the entries already in it.
    ///
    /// A final line without a trailing newline is a write interrupted by a
    /// crash; it is dropped and cut off the file. Any other line that does not
    /// parse is corruption.
    pub fn open<T: DeserializeOwned>(path: &Path) -> Result<(Self, Vec<T>), JournalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let (entries, torn_at) = match File::open(path) {
            Ok(file) => Self::replay(path, file)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Vec::new(), None),
            Err(e) => return Err(e.into()),
        };

        if let Some(len) = torn_at {
            OpenOptions::new().write(true).open(path)?.set_len(len)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok((
            Self {
                file,
                path: path.to_path_buf(),
            },
            entries,
        ))
    }

    /// Parsed entries, plus the offset to truncate at when the tail is torn
    fn replay<T: DeserializeOwned>(
        path: &Path,
        file: File,
    ) -> Result<(Vec<T>, Option<u64>), JournalError> {
        let mut reader = BufReader::new(file);
        let mut entries = Vec::new();
        let mut line = String::new();
        let mut number = 0;
        let mut offset = 0u64;

        loop {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                break;
            }
            number += 1;
            let start = offset;
            offset += read as u64;
            let complete = line.ends_with('\n');
            let text = line.trim();
            if text.is_empty() {
                continue;
            }

            match serde_json::from_str(text) {
                Ok(entry) => entries.push(entry),
                Err(e) if !complete => {
                    warn!(
                        "Dropping torn last line {} of {}: {}",
                        number,
                        path.display(),
                        e
                    );
                    return Ok((entries, Some(start)));
                }
                Err(e) => {
                    return Err(JournalError::Corrupt {
                        line: number,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok((entries, None))
    }

    /// Append one entry and make it durable before returning.
    pub fn append<T: Serialize>(&mut self, entry: &T) -> Result<(), JournalError> {
        let mut line = serde_json::to_string(entry).map_err(|e| JournalError::Io(e.to_string()))?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
