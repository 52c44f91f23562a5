//! Audit trail of merge, rename and alias decisions.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MergeError, Result};
use crate::fsutil;

/// Why a model was renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameReason {
    /// Another service declares the name with a different shape.
    Collision,
}

/// One per-service rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameEntry {
    /// Generated name.
    pub from: String,
    /// Name after the merge.
    pub to: String,
    /// Service whose copy was renamed.
    pub service: String,
    /// Why.
    pub reason: RenameReason,
}

/// One envelope model turned into an `ApiResponse<T>` alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Alias name.
    pub alias: String,
    /// Aliased type text.
    pub target: String,
}

/// Append-only record of what happened to each model name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    /// Models relocated to `common/`.
    pub merged: Vec<String>,
    /// Collision renames, in order.
    pub renamed: Vec<RenameEntry>,
    /// Envelope aliases, in order.
    pub aliases: Vec<AliasEntry>,
}

impl MigrationRecord {
    /// Note a shared model once.
    pub fn record_merged(&mut self, name: &str) {
        if !self.merged.iter().any(|m| m == name) {
            self.merged.push(name.to_string());
        }
    }

    /// Note a collision rename.
    pub fn record_collision(&mut self, service: &str, from: &str, to: &str) {
        self.renamed.push(RenameEntry {
            from: from.to_string(),
            to: to.to_string(),
            service: service.to_string(),
            reason: RenameReason::Collision,
        });
    }

    /// Note an envelope alias.
    pub fn record_alias(&mut self, alias: &str, target: &str) {
        self.aliases.push(AliasEntry {
            alias: alias.to_string(),
            target: target.to_string(),
        });
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MigrationFile<'a> {
    generated_at: DateTime<Utc>,
    services: &'a [String],
    #[serde(flatten)]
    record: &'a MigrationRecord,
}

/// Persist the record as pretty-printed JSON.
pub fn write_record(path: &Path, services: &[String], record: &MigrationRecord) -> Result<()> {
    let file = MigrationFile {
        generated_at: Utc::now(),
        services,
        record,
    };
    let json = serde_json::to_string_pretty(&file).map_err(|err| MergeError::Parse {
        origin: path.display().to_string(),
        reason: err.to_string(),
    })?;
    fsutil::write(path, &format!("{json}\n"))
}
