//! Debug-info stores written by the instrumentation pass.
//!
//! One SQLite database per module, named `debuginfo{module}.db`, with tables
//! `FUNCNAMES(ID, NAME)`, `FILENAMES(ID, NAME)` and
//! `BBLS(ID, FID, LINESTART, LINEEND)`.

use super::{LineRange, SymbolLookup};
use crate::parser::{module_is_negative, BlockKey, FunctionKey};
use crate::utils::config::debuginfo_file_name;
use crate::utils::error::LookupError;
use log::{debug, warn};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// All debug-info stores found under one directory
pub struct DebugInfoStore {
    dir: PathBuf,
    modules: HashMap<u16, Connection>,
}

impl std::fmt::Debug for DebugInfoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut modules: Vec<&u16> = self.modules.keys().collect();
        modules.sort();
        f.debug_struct("DebugInfoStore")
            .field("dir", &self.dir)
            .field("modules", &modules)
            .finish()
    }
}

impl DebugInfoStore {
    /// Open every `debuginfo{N}.db` in `dir` read-only
    ///
    /// **Public** - main constructor
    ///
    /// # Errors
    /// * `LookupError::Io` - directory cannot be listed
    /// * `LookupError::Database` - a store cannot be opened
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, LookupError> {
        let dir = dir.as_ref().to_path_buf();
        let mut modules = HashMap::new();

        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(module_id) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_module_id)
            else {
                continue;
            };

            let conn = Connection::open_with_flags(&path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
            modules.insert(module_id, conn);
        }

        debug!("Opened {} debug-info stores under {}", modules.len(), dir.display());
        Ok(Self { dir, modules })
    }

    /// Store for in-memory connections, used by tests and tools
    pub fn from_connections(dir: impl Into<PathBuf>, modules: HashMap<u16, Connection>) -> Self {
        Self {
            dir: dir.into(),
            modules,
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Fail unless every module id has a backing store
    pub fn ensure_modules(&self, module_ids: &[u16]) -> Result<(), LookupError> {
        for &module_id in module_ids {
            if module_is_negative(module_id) {
                warn!(
                    "Module id {} is negative as a signed value; it was packed before a store was allocated",
                    module_id as i16
                );
            }
            self.connection(module_id)?;
        }
        Ok(())
    }

    fn connection(&self, module_id: u16) -> Result<&Connection, LookupError> {
        self.modules
            .get(&module_id)
            .ok_or_else(|| LookupError::MissingStore {
                module_id,
                path: self.dir.join(debuginfo_file_name(module_id)).display().to_string(),
            })
    }

    fn query_name(
        &self,
        module_id: u16,
        table: &'static str,
        id: u64,
    ) -> Result<String, LookupError> {
        let conn = self.connection(module_id)?;
        let sql = format!("SELECT NAME FROM {} WHERE ID = ?1", table);
        conn.query_row(&sql, [id as i64], |row| row.get::<_, String>(0))
            .optional()?
            .ok_or(LookupError::MissingEntry {
                table,
                module_id,
                id,
            })
    }
}

/// Module id encoded in a store's file name
///
/// **Private** - matches `debuginfo{N}.db`
fn parse_module_id(file_name: &str) -> Option<u16> {
    file_name
        .strip_prefix("debuginfo")?
        .strip_suffix(".db")?
        .parse()
        .ok()
}

impl SymbolLookup for DebugInfoStore {
    fn function_name(&self, function_id: u64) -> Result<String, LookupError> {
        let key = FunctionKey::decode(function_id);
        self.query_name(key.module_id, "FUNCNAMES", u64::from(key.function_id))
    }

    fn file_name(&self, function_id: u64) -> Result<String, LookupError> {
        let key = FunctionKey::decode(function_id);
        self.query_name(key.module_id, "FILENAMES", u64::from(key.file_id))
    }

    fn block_function_id(&self, block_id: u64) -> Result<u64, LookupError> {
        let key = BlockKey::decode(block_id);
        let conn = self.connection(key.module_id)?;
        conn.query_row(
            "SELECT FID FROM BBLS WHERE ID = ?1",
            [key.block_id as i64],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .map(|fid| fid as u64)
        .ok_or(LookupError::MissingEntry {
            table: "BBLS",
            module_id: key.module_id,
            id: key.block_id,
        })
    }

    fn block_lines(&self, block_id: u64) -> Result<LineRange, LookupError> {
        let key = BlockKey::decode(block_id);
        let conn = self.connection(key.module_id)?;
        conn.query_row(
            "SELECT LINESTART, LINEEND FROM BBLS WHERE ID = ?1",
            [key.block_id as i64],
            |row| {
                Ok(LineRange {
                    start: row.get(0)?,
                    end: row.get(1)?,
                })
            },
        )
        .optional()?
        .ok_or(LookupError::MissingEntry {
            table: "BBLS",
            module_id: key.module_id,
            id: key.block_id,
        })
    }
}
