//! Directory-of-TOML-files config source.
//!
//! # Responsibilities
//! - Parse every `.toml` file in the config directory into per-table
//!   record lists (`[[routes]]`, `[[auth_providers]]`, `[[sink_providers]]`)
//! - Watch the directory; add/modify/delete re-reads only the affected
//!   file
//! - On a parse failure, keep the file's previous records
//!
//! # Design Decisions
//! - The directory is the source of truth; the in-memory cache exists so
//!   record reads never touch the disk
//! - Table diffs are computed per event so only genuinely changed tables
//!   wake the watchers

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex, RwLock};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::Value;

use crate::config::ConfigError;
use crate::registry::{ConfigSource, Table};

type FileTables = HashMap<Table, Vec<Value>>;

pub struct FileSource {
    dir: PathBuf,
    files: RwLock<HashMap<PathBuf, FileTables>>,
    // Keeps the notify watcher alive for the source's lifetime.
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: RwLock::new(HashMap::new()),
            watcher: Mutex::new(None),
        }
    }

    /// Current records for a table across all parsed files.
    pub fn records(&self, table: Table) -> Vec<Value> {
        let files = self.files.read().unwrap_or_else(|e| e.into_inner());
        Self::aggregate(&files, table)
    }

    /// Re-read the whole directory. Unreadable files keep their previous
    /// records; an unreadable directory keeps everything.
    pub fn refresh(&self) -> Vec<Table> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "config directory unreadable");
                return Vec::new();
            }
        };

        let mut parsed: HashMap<PathBuf, FileTables> = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match Self::parse_file(&path) {
                Ok(tables) => {
                    parsed.insert(path, tables);
                }
                Err(e) => {
                    tracing::error!(file = %path.display(), error = %e, "failed to parse config file, keeping previous records");
                    let files = self.files.read().unwrap_or_else(|e| e.into_inner());
                    if let Some(previous) = files.get(&path) {
                        let previous = previous.clone();
                        drop(files);
                        parsed.insert(path, previous);
                    }
                }
            }
        }

        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        let changed = Table::ALL
            .into_iter()
            .filter(|&table| Self::aggregate(&files, table) != Self::aggregate(&parsed, table))
            .collect();
        *files = parsed;
        changed
    }

    /// Re-read one file after a change event.
    fn reparse(&self, path: &Path) -> Vec<Table> {
        match Self::parse_file(path) {
            Ok(tables) => self.replace_entry(path, Some(tables)),
            Err(e) => {
                tracing::error!(file = %path.display(), error = %e, "failed to parse config file, keeping previous records");
                Vec::new()
            }
        }
    }

    /// Drop one file's records after it was deleted.
    fn remove(&self, path: &Path) -> Vec<Table> {
        self.replace_entry(path, None)
    }

    fn replace_entry(&self, path: &Path, tables: Option<FileTables>) -> Vec<Table> {
        let mut files = self.files.write().unwrap_or_else(|e| e.into_inner());
        let previous = match tables {
            Some(tables) => files.insert(path.to_path_buf(), tables),
            None => files.remove(path),
        };
        let previous = previous.unwrap_or_default();
        let current = files.get(path).cloned().unwrap_or_default();
        Table::ALL
            .into_iter()
            .filter(|table| previous.get(table) != current.get(table))
            .collect()
    }

    fn parse_file(path: &Path) -> Result<FileTables, ConfigError> {
        let text = fs::read_to_string(path)?;
        let doc: toml::Table = toml::from_str(&text)?;
        let mut tables = FileTables::new();
        for table in Table::ALL {
            let Some(toml::Value::Array(records)) = doc.get(table.key()) else {
                continue;
            };
            let records = records
                .iter()
                .map(serde_json::to_value)
                .collect::<Result<Vec<_>, _>>()?;
            tables.insert(table, records);
        }
        Ok(tables)
    }

    fn aggregate(files: &HashMap<PathBuf, FileTables>, table: Table) -> Vec<Value> {
        let mut paths: Vec<&PathBuf> = files.keys().collect();
        // Deterministic merge order regardless of map iteration.
        paths.sort();
        paths
            .into_iter()
            .filter_map(|path| files[path].get(&table))
            .flatten()
            .cloned()
            .collect()
    }

    pub(crate) fn start(
        &self,
        source: Arc<ConfigSource>,
        events: mpsc::Sender<Table>,
    ) -> std::io::Result<()> {
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                let event = match result {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!(error = %e, "config directory watch error");
                        return;
                    }
                };
                if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                    return;
                }
                let ConfigSource::File(file_source) = &*source else {
                    return;
                };
                for path in &event.paths {
                    if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                        continue;
                    }
                    tracing::info!(file = %path.display(), "config file change detected");
                    let changed = if path.exists() {
                        file_source.reparse(path)
                    } else {
                        file_source.remove(path)
                    };
                    for table in changed {
                        let _ = events.send(table);
                    }
                }
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )
        .map_err(std::io::Error::other)?;

        watcher
            .watch(&self.dir, RecursiveMode::NonRecursive)
            .map_err(std::io::Error::other)?;
        tracing::info!(dir = %self.dir.display(), "config directory watcher started");

        *self.watcher.lock().unwrap_or_else(|e| e.into_inner()) = Some(watcher);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_tables_from_one_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("all.toml"),
            r#"
            [[routes]]
            path = "/t"
            topic = "t"

            [[auth_providers]]
            name = "basic"
            type = "basic_auth"

            [[sink_providers]]
            name = "default"
            type = "null"
            "#,
        )
        .unwrap();

        let source = FileSource::new(dir.path());
        let changed = source.refresh();
        assert_eq!(changed.len(), 3);
        assert_eq!(source.records(Table::Routes).len(), 1);
        assert_eq!(source.records(Table::AuthProviders).len(), 1);
        assert_eq!(source.records(Table::SinkProviders).len(), 1);
    }

    #[test]
    fn unchanged_refresh_reports_no_tables() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("r.toml"), "[[routes]]\npath = '/a'\ntopic = 'a'\n").unwrap();
        let source = FileSource::new(dir.path());
        assert_eq!(source.refresh(), vec![Table::Routes]);
        assert!(source.refresh().is_empty());
    }

    #[test]
    fn broken_file_keeps_previous_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.toml");
        fs::write(&path, "[[routes]]\npath = '/a'\ntopic = 'a'\n").unwrap();
        let source = FileSource::new(dir.path());
        source.refresh();

        fs::write(&path, "[[routes\nthis is not toml").unwrap();
        source.refresh();
        assert_eq!(source.records(Table::Routes).len(), 1);
    }

    #[test]
    fn removing_a_file_drops_only_its_records() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("keep.toml");
        let gone = dir.path().join("gone.toml");
        fs::write(&keep, "[[routes]]\npath = '/keep'\ntopic = 'k'\n").unwrap();
        fs::write(&gone, "[[routes]]\npath = '/gone'\ntopic = 'g'\n").unwrap();
        let source = FileSource::new(dir.path());
        source.refresh();
        assert_eq!(source.records(Table::Routes).len(), 2);

        let changed = source.remove(&gone);
        assert_eq!(changed, vec![Table::Routes]);
        let records = source.records(Table::Routes);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["path"], "/keep");
    }
}
