// Test doubles - in-memory implementations of the collaborator traits
//
// Used by unit tests and by the integration tests under tests/ to drive the
// orchestrator without a database, a filesystem or a terminal.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::StoreError;
use crate::sql::{KeyUpdate, RenameTable};
use crate::traits::{BaseConfigFiles, BasePrompter, BaseStore};

// =============================================================================
// Memory Store
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoryTable {
    name: String,
    key_column: Option<String>,
    keys: Vec<String>,
}

/// In-memory database with one optional key column per table
///
/// Mirrors the behavior the engine relies on: tables are listed by literal
/// prefix in name order, renames fail when the target exists, and key
/// updates touch at most the first matching row.
pub struct MemoryStore {
    tables: Arc<Mutex<Vec<MemoryTable>>>,
    mutations: Arc<Mutex<Vec<String>>>,
    failing_renames: Vec<String>,
    failing_updates: Vec<String>,
    failing_listing: bool,
    failing_scans: Vec<String>,
    case_insensitive: bool,
    host: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Vec::new())),
            mutations: Arc::new(Mutex::new(Vec::new())),
            failing_renames: Vec::new(),
            failing_updates: Vec::new(),
            failing_listing: false,
            failing_scans: Vec::new(),
            case_insensitive: false,
            host: "localhost/wordpress".to_string(),
        }
    }

    /// Store holding `{prefix}posts`, `{prefix}options` and `{prefix}usermeta`
    pub fn wordpress(prefix: &str, option_names: &[&str], meta_keys: &[&str]) -> Self {
        Self::new()
            .with_table(&format!("{prefix}posts"))
            .with_keyed_table(&format!("{prefix}options"), "option_name", option_names)
            .with_keyed_table(&format!("{prefix}usermeta"), "meta_key", meta_keys)
    }

    pub fn with_table(self, name: &str) -> Self {
        self.tables.lock().unwrap().push(MemoryTable {
            name: name.to_string(),
            key_column: None,
            keys: Vec::new(),
        });
        self
    }

    pub fn with_keyed_table(self, name: &str, column: &str, keys: &[&str]) -> Self {
        self.tables.lock().unwrap().push(MemoryTable {
            name: name.to_string(),
            key_column: Some(column.to_string()),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        });
        self
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Make renaming `table` fail
    pub fn failing_rename(mut self, table: &str) -> Self {
        self.failing_renames.push(table.to_string());
        self
    }

    /// Make updating a row whose key is `key` fail
    pub fn failing_update(mut self, key: &str) -> Self {
        self.failing_updates.push(key.to_string());
        self
    }

    /// Make table listing fail
    pub fn failing_listing(mut self) -> Self {
        self.failing_listing = true;
        self
    }

    /// Make listing keys of `table` fail
    pub fn failing_scan(mut self, table: &str) -> Self {
        self.failing_scans.push(table.to_string());
        self
    }

    /// List tables the way a case-insensitive collation would, with `_`
    /// treated as a single-character wildcard like an unescaped `LIKE`
    pub fn case_insensitive_listing(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Current table names, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tables
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Keys currently stored in `table`
    pub fn keys(&self, table: &str) -> Option<Vec<String>> {
        self.tables
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.keys.clone())
    }

    /// Every mutating statement that reached the store
    pub fn mutations(&self) -> Vec<String> {
        self.mutations.lock().unwrap().clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseStore for MemoryStore {
    async fn list_tables(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        if self.failing_listing {
            return Err(StoreError::Rejected("Lost connection to server".to_string()));
        }

        let case_insensitive = self.case_insensitive;
        Ok(self
            .table_names()
            .into_iter()
            .filter(|name| {
                if case_insensitive {
                    loosely_starts_with(name, prefix)
                } else {
                    name.starts_with(prefix)
                }
            })
            .collect())
    }

    async fn rename_table(&self, stmt: &RenameTable) -> Result<(), StoreError> {
        self.mutations.lock().unwrap().push(stmt.to_string());

        if self.failing_renames.contains(&stmt.from) {
            return Err(StoreError::Rejected(format!(
                "Error on rename of '{}' to '{}'",
                stmt.from, stmt.to
            )));
        }

        let mut tables = self.tables.lock().unwrap();
        if tables.iter().any(|t| t.name == stmt.to) {
            return Err(StoreError::Rejected(format!(
                "Table '{}' already exists",
                stmt.to
            )));
        }

        let table = tables
            .iter_mut()
            .find(|t| t.name == stmt.from)
            .ok_or_else(|| StoreError::Rejected(format!("Table '{}' doesn't exist", stmt.from)))?;
        table.name = stmt.to.clone();
        Ok(())
    }

    async fn update_key(&self, stmt: &KeyUpdate) -> Result<u64, StoreError> {
        self.mutations.lock().unwrap().push(stmt.to_string());

        if self.failing_updates.contains(&stmt.from) {
            return Err(StoreError::Rejected(format!(
                "Deadlock found when updating '{}'",
                stmt.from
            )));
        }

        let mut tables = self.tables.lock().unwrap();
        let table = tables
            .iter_mut()
            .find(|t| t.name == stmt.table)
            .ok_or_else(|| {
                StoreError::Rejected(format!("Table '{}' doesn't exist", stmt.table))
            })?;

        if table.key_column.as_deref() != Some(stmt.column.as_str()) {
            return Err(StoreError::Rejected(format!(
                "Unknown column '{}' in '{}'",
                stmt.column, stmt.table
            )));
        }

        match table.keys.iter_mut().find(|k| **k == stmt.from) {
            Some(key) => {
                *key = stmt.to.clone();
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_keys(&self, table: &str, column: &str) -> Result<Vec<String>, StoreError> {
        if self.failing_scans.iter().any(|t| t == table) {
            return Err(StoreError::Rejected(format!("Can't read '{}'", table)));
        }

        let tables = self.tables.lock().unwrap();
        let found = tables
            .iter()
            .find(|t| t.name == table)
            .ok_or_else(|| StoreError::Rejected(format!("Table '{}' doesn't exist", table)))?;

        if found.key_column.as_deref() != Some(column) {
            return Err(StoreError::Rejected(format!(
                "Unknown column '{}' in '{}'",
                column, table
            )));
        }

        Ok(found.keys.clone())
    }

    fn host(&self) -> String {
        self.host.clone()
    }
}

fn loosely_starts_with(name: &str, prefix: &str) -> bool {
    let mut chars = name.chars();
    prefix.chars().all(|p| match chars.next() {
        Some(c) => p == '_' || c.eq_ignore_ascii_case(&p),
        None => false,
    })
}

// =============================================================================
// Memory Files
// =============================================================================

/// In-memory config files keyed by path
pub struct MemoryFiles {
    files: Mutex<HashMap<PathBuf, String>>,
    writes: Mutex<usize>,
    read_only: bool,
}

impl MemoryFiles {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            writes: Mutex::new(0),
            read_only: false,
        }
    }

    pub fn with_file(self, path: impl AsRef<Path>, content: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.as_ref().to_path_buf(), content.to_string());
        self
    }

    /// Reject every write with a permission error
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn content(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl Default for MemoryFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseConfigFiles for MemoryFiles {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.content(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} is read-only", path.display()),
            ));
        }

        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }
}

// =============================================================================
// Scripted Prompter
// =============================================================================

/// Prompter with a fixed answer that records every prompt it was shown
pub struct ScriptedPrompter {
    answer: Option<bool>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn accepting() -> Self {
        Self {
            answer: Some(true),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn declining() -> Self {
        Self {
            answer: Some(false),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompter whose terminal is gone
    pub fn broken() -> Self {
        Self {
            answer: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl BasePrompter for ScriptedPrompter {
    fn confirm(&self, message: &str) -> io::Result<bool> {
        self.prompts.lock().unwrap().push(message.to_string());
        self.answer
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "not a terminal"))
    }
}
