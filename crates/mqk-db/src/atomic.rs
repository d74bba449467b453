//! Atomic file persistence — the one place this workspace is allowed to
//! leave a file half-written.
//!
//! Every overwriting write goes: write to a sibling temp file in the same
//! directory → `fsync` the temp file → `rename` over the destination. A
//! reader opening the destination path never observes a partial write,
//! because `rename` within a filesystem is atomic and the temp file lives
//! next to its target (same mount, so no cross-device rename).
//!
//! Append-only `.jsonl` logs use a different discipline: open in append
//! mode, write one newline-terminated line, `fsync`. No temp file is
//! needed because a torn append can only ever lose the last line, never
//! corrupt an earlier one, and readers are expected to tolerate a missing
//! trailing newline on the last line of a log they're tailing mid-write.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

/// Serialize `value` to pretty JSON and write it atomically to `path`.
///
/// Creates parent directories if needed. On success, `path` either holds
/// the new content in full or (if the process died mid-write) the old
/// content in full — never a mix.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)
        .with_context(|| format!("serializing JSON for {}", path.display()))?;
    write_bytes_atomic(path, &body)
}

/// Atomically write raw bytes to `path` using the temp-file → fsync →
/// rename sequence.
pub fn write_bytes_atomic(path: &Path, body: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(body)
        .with_context(|| format!("writing temp file for {}", path.display()))?;
    tmp.as_file_mut()
        .sync_all()
        .with_context(|| format!("fsync temp file for {}", path.display()))?;

    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("renaming temp file onto {}", path.display()))?;

    // Best-effort: fsync the containing directory so the rename itself is
    // durable across a crash, not just the file contents.
    if let Ok(dir_file) = File::open(dir) {
        let _ = dir_file.sync_all();
    }

    Ok(())
}

/// Read and JSON-deserialize `path`. Returns `Ok(None)` if the file does
/// not exist (the caller's "missing file → empty state" convention).
pub fn read_json_opt<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing JSON from {}", path.display()))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}

/// Append a single JSON-serializable record as one newline-terminated line
/// to an append-only log. Creates the file (and parent directories) if
/// absent.
pub fn append_jsonl_line<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut line = serde_json::to_vec(record)
        .with_context(|| format!("serializing JSONL record for {}", path.display()))?;
    line.push(b'\n');
    append_bytes(path, &line)
}

fn append_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {} for append", path.display()))?;
    f.write_all(bytes)
        .with_context(|| format!("appending to {}", path.display()))?;
    f.sync_all()
        .with_context(|| format!("fsync append to {}", path.display()))?;
    Ok(())
}

/// Read every line of a `.jsonl` file, deserializing each into `T`.
///
/// Per line: a line that fails to parse is skipped, not fatal — mirrors the
/// "parse errors on individual records are logged and skipped" error
/// handling policy. Returns an empty vec for a missing file.
pub fn read_jsonl_lenient<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let mut out = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if let Ok(record) = serde_json::from_str::<T>(line) {
            out.push(record);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Widget {
        name: String,
        n: i64,
    }

    #[test]
    fn write_then_read_json_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("widget.json");
        let w = Widget {
            name: "gear".into(),
            n: 7,
        };
        write_json_atomic(&path, &w).unwrap();
        let back: Widget = read_json_opt(&path).unwrap().unwrap();
        assert_eq!(back, w);
    }

    #[test]
    fn read_json_opt_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let back: Option<Widget> = read_json_opt(&path).unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn overwrite_never_leaves_old_and_new_mixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("widget.json");
        write_json_atomic(
            &path,
            &Widget {
                name: "a".into(),
                n: 1,
            },
        )
        .unwrap();
        write_json_atomic(
            &path,
            &Widget {
                name: "b".into(),
                n: 2,
            },
        )
        .unwrap();
        let back: Widget = read_json_opt(&path).unwrap().unwrap();
        assert_eq!(
            back,
            Widget {
                name: "b".into(),
                n: 2
            }
        );
    }

    #[test]
    fn jsonl_append_and_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        for i in 0..3 {
            append_jsonl_line(
                &path,
                &Widget {
                    name: format!("w{i}"),
                    n: i,
                },
            )
            .unwrap();
        }
        let rows: Vec<Widget> = read_jsonl_lenient(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].n, 0);
        assert_eq!(rows[2].n, 2);
    }

    #[test]
    fn jsonl_read_skips_unparseable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.jsonl");
        std::fs::write(&path, "{\"name\":\"ok\",\"n\":1}\nnot json\n{\"name\":\"ok2\",\"n\":2}\n")
            .unwrap();
        let rows: Vec<Widget> = read_jsonl_lenient(&path).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn jsonl_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.jsonl");
        let rows: Vec<Widget> = read_jsonl_lenient(&path).unwrap();
        assert!(rows.is_empty());
    }
}
