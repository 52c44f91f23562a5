//! Namespaced renames for same-named, differently-shaped models and schemas.

use apiweave_common::naming::pascal_case;
use tracing::{debug, info};

use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::layout::{ArtifactKind, OutputLayout};
use crate::migration::MigrationRecord;
use crate::relocation::{RelocationMap, SymbolRename};
use crate::shared::SharedSummary;
use crate::ts::SourceFile;
use crate::ts::query::rename_ident;

/// Namespaced name of a colliding declaration: `UserDto` in `booking`
/// becomes `Booking_UserDto`, schema `$UserDto` becomes `$Booking_UserDto`.
pub fn namespaced_name(service: &str, name: &str) -> String {
    let prefix = pascal_case(service);
    match name.strip_prefix('$') {
        Some(bare) => format!("${prefix}_{bare}"),
        None => format!("{prefix}_{name}"),
    }
}

/// Rename every per-service copy of each conflicting model and schema.
/// Returns the number of files renamed.
pub fn resolve_collisions(
    layout: &OutputLayout,
    summary: &SharedSummary,
    map: &mut RelocationMap,
    record: &mut MigrationRecord,
) -> Result<usize> {
    let mut renamed = 0;
    for kind in [ArtifactKind::Model, ArtifactKind::Schema] {
        let Some(conflicts) = summary.conflicting.get(&kind) else {
            continue;
        };
        for (file_name, owners) in conflicts {
            let Some(stem) = file_name.strip_suffix(".ts") else {
                continue;
            };
            for service in owners {
                let dir = layout.kind_dir(service, kind);
                let original = dir.join(file_name);
                let to = namespaced_name(service, stem);

                let source = fsutil::read(&original)?;
                let mut file = SourceFile::parse(&source).map_err(|err| MergeError::syntax(&original, &err))?;
                let occurrences = rename_ident(&mut file.nodes, stem, &to);

                let target = dir.join(format!("{to}.ts"));
                fsutil::write(&target, &file.print())?;
                fsutil::remove(&original)?;
                map.insert_renamed(
                    &original,
                    &target,
                    SymbolRename {
                        from: stem.to_string(),
                        to: to.clone(),
                    },
                );
                if kind == ArtifactKind::Model {
                    record.record_collision(service, stem, &to);
                }
                debug!(service = %service, from = stem, to = %to, occurrences, "Renamed colliding artifact.");
                renamed += 1;
            }
        }
    }
    info!(count = renamed, "Resolved name collisions.");
    Ok(renamed)
}
