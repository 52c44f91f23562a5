//! Collapse per-payload response envelope models into aliases of the generic
//! `ApiResponse<T>` declared in `types/index.ts`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use apiweave_common::naming::pascal_case;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::layout::{ArtifactKind, OutputLayout};
use crate::migration::MigrationRecord;
use crate::paths::{rebase_specifier, resolve_candidates};
use crate::relocation::RelocationMap;
use crate::ts::query::{DeclKind, Field, binding_names, declarations, module_statements, object_fields};
use crate::ts::tree::{Node, SourceFile, is_member_access, parse_nodes, print_nodes, visit_lists_mut};

/// Name of the generic envelope interface.
pub const ENVELOPE: &str = "ApiResponse";

const ENVELOPE_FIELDS: [&str; 6] = ["success", "message", "data", "errors", "meta", "timestamp"];
const REQUIRED_FIELDS: [&str; 3] = ["success", "message", "timestamp"];
const VOID_SUFFIXES: [&str; 4] = ["Void", "Success", "NoContent", "Empty"];

/// Generated models replaced by the declarations synthesized in
/// `types/index.ts`.
pub const SUPPORT_MODELS: [&str; 2] = ["ApiErrorDetail", "ApiMeta"];

/// `export type <name> = ApiResponse<<payload>>;`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvelopeAlias {
    /// Alias name, the original model name.
    pub name: String,
    /// Type argument, as TypeScript text.
    pub payload: String,
}

impl EnvelopeAlias {
    /// Right-hand side of the alias.
    pub fn target(&self) -> String {
        format!("{ENVELOPE}<{}>", self.payload)
    }
}

/// Replace every envelope-shaped `ApiResponse*` model with an alias, and fold
/// the envelope's support models into `types/index.ts`.
pub fn collapse_envelopes(
    layout: &OutputLayout,
    services: &[String],
    map: &mut RelocationMap,
    record: &mut MigrationRecord,
) -> Result<Vec<EnvelopeAlias>> {
    let types_index = layout.types_index();
    let types_dir = types_index.parent().map(Path::to_path_buf).unwrap_or_default();
    let prefixes: Vec<String> = services.iter().map(|s| format!("{}_", pascal_case(s))).collect();
    let mut aliases = Vec::new();

    let dirs = services
        .iter()
        .map(|s| layout.kind_dir(s, ArtifactKind::Model))
        .chain([layout.common_kind_dir(ArtifactKind::Model)]);
    for dir in dirs {
        for path in fsutil::ts_files_in(&dir) {
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };

            if SUPPORT_MODELS.contains(&stem.as_str()) {
                fsutil::remove(&path)?;
                map.insert(&path, &types_index);
                debug!(path = %path.display(), "Folded envelope support model.");
                continue;
            }

            let base = prefixes
                .iter()
                .find_map(|p| stem.strip_prefix(p.as_str()))
                .unwrap_or(&stem);
            let Some(suffix) = base.strip_prefix(ENVELOPE) else {
                continue;
            };
            let source = fsutil::read(&path)?;
            let file = SourceFile::parse(&source).map_err(|err| MergeError::syntax(&path, &err))?;
            let Some(fields) = envelope_fields(&file.nodes, &stem) else {
                debug!(path = %path.display(), "Not envelope-shaped; kept.");
                continue;
            };

            fsutil::remove(&path)?;
            map.insert(&path, &types_index);
            if stem == ENVELOPE {
                // The generic declaration defaults its payload to `unknown`.
                debug!(path = %path.display(), "Dropped bare envelope model.");
                continue;
            }

            let imports = imported_specifiers(&file.nodes);
            let data = fields.iter().find(|f| f.name == "data");
            let payload = payload_type(suffix, data, &imports, &dir, &types_dir, &types_index);
            let alias = EnvelopeAlias { name: stem, payload };
            record.record_alias(&alias.name, &alias.target());
            debug!(alias = %alias.name, target = %alias.target(), "Collapsed envelope model.");
            aliases.push(alias);
        }
    }

    aliases.sort_by(|a, b| a.name.cmp(&b.name));
    info!(count = aliases.len(), "Collapsed response envelopes.");
    Ok(aliases)
}

/// Fields of the declaration named `name` when they form the envelope shape.
fn envelope_fields(nodes: &[Node], name: &str) -> Option<Vec<Field>> {
    let decl = declarations(nodes)
        .into_iter()
        .find(|d| d.name == name && matches!(d.kind, DeclKind::TypeAlias | DeclKind::Interface))?;
    let fields = object_fields(nodes[decl.body?].as_group()?);
    let names: BTreeSet<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    let shaped = names.iter().all(|n| ENVELOPE_FIELDS.contains(n))
        && REQUIRED_FIELDS.iter().all(|n| names.contains(n))
        && names.len() == fields.len();
    shaped.then_some(fields)
}

/// Imported binding name to the specifier it came from.
fn imported_specifiers(nodes: &[Node]) -> BTreeMap<String, String> {
    module_statements(nodes)
        .into_iter()
        .filter(|s| !s.is_export)
        .flat_map(|s| {
            let names = s
                .bindings_index
                .and_then(|i| nodes[i].as_group())
                .map(binding_names)
                .unwrap_or_default();
            names.into_iter().map(move |n| (n, s.specifier.clone()))
        })
        .collect()
}

fn payload_type(
    suffix: &str,
    data: Option<&Field>,
    imports: &BTreeMap<String, String>,
    model_dir: &Path,
    types_dir: &Path,
    types_index: &Path,
) -> String {
    if VOID_SUFFIXES.contains(&suffix) {
        return "void".to_string();
    }
    if suffix.is_empty() {
        return "unknown".to_string();
    }
    match data {
        Some(field) => qualify_imports(&field.ty, imports, model_dir, types_dir, types_index),
        None => "unknown".to_string(),
    }
}

/// Rewrite identifiers the model imported as `import('<specifier>').Name`,
/// with the specifier rebased to `types/`. Names already exported from
/// `types/index.ts` stay bare.
fn qualify_imports(
    ty: &str,
    imports: &BTreeMap<String, String>,
    model_dir: &Path,
    types_dir: &Path,
    types_index: &Path,
) -> String {
    let Ok(mut nodes) = parse_nodes(ty) else {
        return ty.to_string();
    };
    let replacements: BTreeMap<&str, Option<String>> = imports
        .iter()
        .map(|(name, specifier)| {
            let rebased = rebase_specifier(specifier, model_dir, types_dir);
            let local = resolve_candidates(types_dir, &rebased)
                .iter()
                .any(|c| c.as_path() == types_index);
            let qualified = (!local).then(|| format!("import('{rebased}').{name}"));
            (name.as_str(), qualified)
        })
        .collect();

    visit_lists_mut(&mut nodes, &mut |list: &mut Vec<Node>| {
        let mut i = 0;
        while i < list.len() {
            let qualified = list[i]
                .ident()
                .filter(|_| !is_member_access(list, i))
                .and_then(|name| replacements.get(name).cloned().flatten());
            match qualified.and_then(|text| parse_nodes(&text).ok()) {
                Some(inserted) => {
                    let len = inserted.len();
                    list.splice(i..=i, inserted);
                    i += len;
                }
                None => i += 1,
            }
        }
    });
    print_nodes(&nodes)
}
