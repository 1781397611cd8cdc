// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Append-only per-category log destination.
//!
//! One sink per category. A header row is written only when the file is
//! empty at open time; every data row is flushed and synced before the call
//! returns, so a concurrent reader of the file observes it immediately.

use crate::schema::Category;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Row delimiter of the legacy format. Fields must not contain spaces;
/// there is no quoting or escaping.
pub const DELIMITER: char = ' ';

/// Exclusively-owned append destination for one category.
pub struct CategorySink {
    category: Category,
    path: PathBuf,
    file: File,
    rows_written: u64,
}

impl CategorySink {
    /// Open the destination in append mode, creating it if absent.
    ///
    /// Writes exactly one header row iff the file is empty at open time.
    /// Reopening a non-empty file never duplicates the header.
    pub fn open(category: Category, path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut sink = Self {
            category,
            path,
            file,
            rows_written: 0,
        };

        if sink.file.metadata()?.len() == 0 {
            sink.write_row(category.header())?;
        }

        Ok(sink)
    }

    /// Append one data row and flush it durably.
    ///
    /// A failure here means the log may be incomplete and must be treated
    /// as fatal by the caller.
    pub fn append<S: AsRef<str>>(&mut self, values: &[S]) -> io::Result<()> {
        self.write_row(values)?;
        self.rows_written += 1;
        Ok(())
    }

    /// Serialize one delimited row and sync it to storage.
    fn write_row<S: AsRef<str>>(&mut self, values: &[S]) -> io::Result<()> {
        let mut row = String::new();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                row.push(DELIMITER);
            }
            row.push_str(value.as_ref());
        }
        row.push('\n');

        // One write per row keeps row boundaries intact on disk.
        self.file.write_all(row.as_bytes())?;
        self.file.sync_data()
    }

    /// Category this sink is bound to.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows appended since open (header excluded).
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Final sync and release of the underlying file.
    pub fn close(self) -> io::Result<()> {
        self.file.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_empty_file_writes_header() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("pressure.dat");

        let sink = CategorySink::open(Category::Pressure, &path).expect("open");
        sink.close().expect("close");

        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content, "Datetime Pressure\n");
    }

    #[test]
    fn test_reopen_does_not_duplicate_header() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("temp.dat");

        for _ in 0..3 {
            let sink = CategorySink::open(Category::Temperature, &path).expect("open");
            sink.close().expect("close");
        }

        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content.lines().count(), 1);
        assert_eq!(content, "Temperature Resistance Datetime\n");
    }

    #[test]
    fn test_append_rows_in_order() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("temp.dat");

        let mut sink = CategorySink::open(Category::Temperature, &path).expect("open");
        sink.append(&["25.3", "100.2", "2024-01-01T00:00:00"])
            .expect("append");
        sink.append(&["25.4", "100.1", "2024-01-01T00:00:10"])
            .expect("append");

        assert_eq!(sink.rows_written(), 2);
        sink.close().expect("close");

        let content = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            [
                "Temperature Resistance Datetime",
                "25.3 100.2 2024-01-01T00:00:00",
                "25.4 100.1 2024-01-01T00:00:10",
            ]
        );
    }

    #[test]
    fn test_append_visible_before_close() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("pressure.dat");

        let mut sink = CategorySink::open(Category::Pressure, &path).expect("open");
        sink.append(&["t1", "1.01"]).expect("append");

        // An independent reader sees the row while the sink stays open.
        let content = std::fs::read_to_string(&path).expect("read");
        assert_eq!(content, "Datetime Pressure\nt1 1.01\n");

        sink.close().expect("close");
    }

    #[test]
    fn test_reopen_appends_after_existing_rows() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("pressure.dat");

        let mut sink = CategorySink::open(Category::Pressure, &path).expect("open");
        sink.append(&["t1", "1.01"]).expect("append");
        sink.close().expect("close");

        let mut sink = CategorySink::open(Category::Pressure, &path).expect("open");
        assert_eq!(sink.rows_written(), 0, "counter is per open");
        sink.append(&["t2", "1.02"]).expect("append");
        sink.close().expect("close");

        let content = std::fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, ["Datetime Pressure", "t1 1.01", "t2 1.02"]);
    }

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested/logs/flow.dat");

        let sink = CategorySink::open(Category::Flow, &path).expect("open");
        sink.close().expect("close");
        assert!(path.exists());
    }
}
