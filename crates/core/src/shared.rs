//! Content-addressed detection of artifacts that several services generated
//! identically, and their relocation into `common/`.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::layout::{ArtifactKind, OutputLayout, load_kind};
use crate::migration::MigrationRecord;
use crate::relocation::RelocationMap;
use crate::rewrite::rebase_source;
use crate::ts;

/// Hex SHA-256 of the source with comments dropped and whitespace runs
/// collapsed.
pub fn artifact_hash(source: &str) -> String {
    let normalized = ts::normalize(source).unwrap_or_else(|err| {
        warn!(error = %err, "Hashing untokenizable source by whitespace only.");
        source.split_whitespace().collect::<Vec<_>>().join(" ")
    });
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Per kind: file names identical everywhere they occur, and file names that
/// occur in several services with differing content (mapped to those
/// services, in run order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedSummary {
    /// File names relocated to `common/`, per kind.
    pub shared: BTreeMap<ArtifactKind, BTreeSet<String>>,
    /// Differing file names with their owning services, per kind.
    pub conflicting: BTreeMap<ArtifactKind, BTreeMap<String, Vec<String>>>,
}

impl SharedSummary {
    /// True when `file_name` of `kind` is shared.
    pub fn is_shared(&self, kind: ArtifactKind, file_name: &str) -> bool {
        self.shared.get(&kind).is_some_and(|names| names.contains(file_name))
    }

    /// Shared file names across all kinds.
    pub fn shared_count(&self) -> usize {
        self.shared.values().map(BTreeSet::len).sum()
    }

    /// Conflicting file names across all kinds.
    pub fn conflicting_count(&self) -> usize {
        self.conflicting.values().map(BTreeMap::len).sum()
    }
}

/// Compare same-named files of each shareable kind across services.
///
/// Sharing is limited to kinds whose directory every service generated.
/// Conflicts are detected among whichever services have the kind.
pub fn detect_shared(layout: &OutputLayout, services: &[String]) -> Result<SharedSummary> {
    let mut summary = SharedSummary::default();

    for kind in ArtifactKind::SHAREABLE {
        let present: Vec<&String> = services
            .iter()
            .filter(|s| layout.kind_dir(s, kind).is_dir())
            .collect();
        let shareable = present.len() == services.len();
        if !shareable {
            debug!(kind = kind.dir_name(), "Kind missing from a service; not shared.");
        }

        let mut copies: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
        for service in present {
            for file in load_kind(layout, service, kind)? {
                copies
                    .entry(file.file_name())
                    .or_default()
                    .push((service.clone(), artifact_hash(&file.source)));
            }
        }

        for (name, copies) in copies {
            if copies.len() < 2 {
                continue;
            }
            let first_hash = &copies[0].1;
            let identical = copies.iter().all(|(_, hash)| hash == first_hash);
            if identical && shareable {
                debug!(kind = kind.dir_name(), file = %name, copies = copies.len(), "Shared artifact.");
                summary.shared.entry(kind).or_default().insert(name);
            } else if !identical {
                debug!(kind = kind.dir_name(), file = %name, "Same name, different content.");
                let owners = copies.into_iter().map(|(service, _)| service).collect();
                summary.conflicting.entry(kind).or_default().insert(name, owners);
            }
        }
    }

    info!(
        shared = summary.shared_count(),
        conflicting = summary.conflicting_count(),
        "Compared generated artifacts."
    );
    Ok(summary)
}

/// Move every shared artifact into `common/<kind>/`, deleting the
/// per-service originals. The first service's copy is kept, with its
/// relative specifiers rebased to the new directory.
pub fn relocate_shared(
    layout: &OutputLayout,
    services: &[String],
    summary: &SharedSummary,
    map: &mut RelocationMap,
    record: &mut MigrationRecord,
) -> Result<usize> {
    let mut moved = 0;
    for (&kind, names) in &summary.shared {
        let common_dir = layout.common_kind_dir(kind);
        for name in names {
            let owners: Vec<&String> = services
                .iter()
                .filter(|s| layout.kind_dir(s, kind).join(name).is_file())
                .collect();
            let Some(first) = owners.first() else {
                continue;
            };

            let first_dir = layout.kind_dir(first, kind);
            let first_path = first_dir.join(name);
            let source = fsutil::read(&first_path)?;
            let rebased = rebase_source(&source, &first_dir, &common_dir)
                .map_err(|err| MergeError::syntax(&first_path, &err))?;
            let target = common_dir.join(name);
            fsutil::write(&target, &rebased)?;

            for service in &owners {
                let original = layout.kind_dir(service, kind).join(name);
                fsutil::remove(&original)?;
                map.insert(&original, &target);
                if kind == ArtifactKind::Core {
                    // Core files are also addressed from the service root.
                    map.insert(layout.service_dir(service).join(name), &target);
                }
            }
            if kind == ArtifactKind::Model
                && let Some(stem) = name.strip_suffix(".ts")
            {
                record.record_merged(stem);
            }
            debug!(path = %target.display(), services = owners.len(), "Relocated shared artifact.");
            moved += 1;
        }
    }
    info!(count = moved, "Relocated shared artifacts.");
    Ok(moved)
}
