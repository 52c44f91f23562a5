use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use super::registry::{EnumRegistry, enum_name_for_property};
use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::layout::{ArtifactKind, OutputLayout};
use crate::paths::relative_specifier;
use crate::relocation::{RelocationMap, SymbolRename};
use crate::ts::ir::TsImport;
use crate::ts::query::{
    DeclKind, binding_names, declarations, enum_members, insert_after_imports, literal_union_values,
    module_statements, remove_declaration_range, replace_literal_unions, replace_member_refs,
};
use crate::ts::tree::{Group, Node, SourceFile, is_member_access, next_significant, visit_lists};
use crate::ts::Emit;

/// Counts from one enum lifting pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LiftReport {
    /// Model-attached namespaces removed.
    pub namespaces: usize,
    /// Standalone enum model files folded into the registry.
    pub enum_models: usize,
    /// Literal unions replaced by a registered name.
    pub unions: usize,
    /// Files that gained an import from `types/`.
    pub imports: usize,
}

/// Lift enums out of generated models, then replace matching literal
/// unions in every model and service file.
pub fn lift_enums(
    layout: &OutputLayout,
    services: &[String],
    registry: &mut EnumRegistry,
    map: &mut RelocationMap,
) -> Result<LiftReport> {
    let mut report = LiftReport::default();
    let types_index = layout.types_index();

    for path in model_files(layout, services) {
        let mut file = parse(&path)?;
        let label = path.display().to_string();

        if let Some((declared, values)) = enum_model(&file.nodes) {
            let name = registry.register(&declared, None, values, &label);
            fsutil::remove(&path)?;
            if name == declared {
                map.insert(&path, &types_index);
            } else {
                map.insert_renamed(&path, &types_index, SymbolRename { from: declared, to: name });
            }
            debug!(path = %path.display(), "Folded enum model into the registry.");
            report.enum_models += 1;
            continue;
        }

        let lifted = lift_namespaces(&mut file.nodes, registry, &label);
        if lifted > 0 {
            fsutil::write(&path, &file.print())?;
            debug!(path = %path.display(), namespaces = lifted, "Lifted namespace enums.");
            report.namespaces += lifted;
        }
    }

    let service_files = services
        .iter()
        .flat_map(|s| fsutil::ts_files_in(&layout.kind_dir(s, ArtifactKind::Service)));
    let targets: Vec<PathBuf> = model_files(layout, services).into_iter().chain(service_files).collect();
    for path in targets {
        let (unions, imported) = apply_registry(&path, registry, &types_index)?;
        report.unions += unions;
        report.imports += usize::from(imported);
    }

    info!(
        enums = registry.len(),
        namespaces = report.namespaces,
        enum_models = report.enum_models,
        unions = report.unions,
        "Lifted enums."
    );
    Ok(report)
}

fn model_files(layout: &OutputLayout, services: &[String]) -> Vec<PathBuf> {
    services
        .iter()
        .map(|s| layout.kind_dir(s, ArtifactKind::Model))
        .chain([layout.common_kind_dir(ArtifactKind::Model)])
        .flat_map(|dir| fsutil::ts_files_in(&dir))
        .collect()
}

fn parse(path: &Path) -> Result<SourceFile> {
    let source = fsutil::read(path)?;
    SourceFile::parse(&source).map_err(|err| MergeError::syntax(path, &err))
}

/// Values of an enum body whose members all carry string initializers.
fn string_enum_values(group: &Group) -> Option<BTreeSet<String>> {
    let values: Option<BTreeSet<String>> = enum_members(group).into_iter().map(|m| m.value).collect();
    values.filter(|v| !v.is_empty())
}

/// A model file holding nothing but one exported string enum or literal
/// union alias.
fn enum_model(nodes: &[Node]) -> Option<(String, BTreeSet<String>)> {
    let decls = declarations(nodes);
    let [decl] = decls.as_slice() else {
        return None;
    };
    if !decl.exported {
        return None;
    }
    let values = match decl.kind {
        DeclKind::Enum => nodes[decl.body?].as_group().and_then(string_enum_values),
        DeclKind::TypeAlias => {
            let eq = (decl.start..decl.end).find(|&i| nodes[i].is_punct("="))?;
            let end = if nodes[decl.end - 1].is_punct(";") {
                decl.end - 1
            } else {
                decl.end
            };
            literal_union_values(&nodes[eq + 1..end])
        }
        _ => None,
    }?;
    Some((decl.name.clone(), values))
}

/// Remove `export namespace <Model> { export enum <Local> { … } }` blocks,
/// registering each enum and pointing `<Model>.<Local>` at the lifted name.
/// Namespaces holding anything but string enums are kept.
fn lift_namespaces(nodes: &mut Vec<Node>, registry: &mut EnumRegistry, label: &str) -> usize {
    let mut plans = Vec::new();
    for ns in declarations(nodes).into_iter().filter(|d| d.kind == DeclKind::Namespace) {
        let Some(body) = ns.body.and_then(|b| nodes[b].as_group()) else {
            continue;
        };
        let inner = declarations(&body.children);
        let enums: Option<Vec<(String, BTreeSet<String>)>> = inner
            .iter()
            .map(|decl| {
                let values = (decl.kind == DeclKind::Enum)
                    .then_some(decl.body)
                    .flatten()
                    .and_then(|b| body.children[b].as_group())
                    .and_then(string_enum_values)?;
                Some((decl.name.clone(), values))
            })
            .collect();
        let Some(enums) = enums.filter(|e| !e.is_empty()) else {
            debug!(namespace = %ns.name, "Namespace kept.");
            continue;
        };

        let lifted: Vec<(String, String)> = enums
            .into_iter()
            .map(|(local, values)| {
                let preferred = enum_name_for_property(&local, &ns.name);
                let name = registry.register(&preferred, Some(&ns.name), values, label);
                (local, name)
            })
            .collect();
        plans.push((ns.start, ns.end, ns.name, lifted));
    }

    for (start, end, _, _) in plans.iter().rev() {
        remove_declaration_range(nodes, *start, *end);
    }
    for (_, _, parent, lifted) in &plans {
        for (local, name) in lifted {
            replace_member_refs(nodes, parent, local, name);
        }
    }
    plans.len()
}

/// Replace registered literal unions and import every registered name the
/// file now uses. Returns the replacement count and whether an import was
/// added.
fn apply_registry(path: &Path, registry: &EnumRegistry, types_index: &Path) -> Result<(usize, bool)> {
    let mut file = parse(path)?;
    let declared: BTreeSet<String> = declarations(&file.nodes).into_iter().map(|d| d.name).collect();

    let unions = replace_literal_unions(&mut file.nodes, &mut |values| {
        registry
            .lookup(values)
            .filter(|name| !declared.contains(*name))
            .map(str::to_string)
    });

    let imported: BTreeSet<String> = module_statements(&file.nodes)
        .iter()
        .filter(|s| !s.is_export)
        .filter_map(|s| s.bindings_index.and_then(|i| file.nodes[i].as_group()))
        .flat_map(binding_names)
        .collect();
    let mut missing = BTreeSet::new();
    visit_lists(&file.nodes, &mut |list| {
        for (i, node) in list.iter().enumerate() {
            let Some(name) = node.ident() else {
                continue;
            };
            if registry.get(name).is_some()
                && !is_member_access(list, i)
                && !is_property_key(list, i)
                && !declared.contains(name)
                && !imported.contains(name)
            {
                missing.insert(name.to_string());
            }
        }
    });

    if unions == 0 && missing.is_empty() {
        return Ok((0, false));
    }
    if !missing.is_empty() {
        let dir = path.parent().unwrap_or(Path::new(""));
        let import = TsImport::named(missing.iter().cloned(), &relative_specifier(dir, types_index)).type_only();
        insert_after_imports(&mut file.nodes, import.emit().trim_end())
            .map_err(|err| MergeError::syntax(path, &err))?;
    }
    fsutil::write(path, &file.print())?;
    Ok((unions, !missing.is_empty()))
}

/// `name:` or `name?:` in an object type or literal.
fn is_property_key(nodes: &[Node], index: usize) -> bool {
    match next_significant(nodes, index + 1) {
        Some(next) if nodes[next].is_punct(":") => true,
        Some(next) if nodes[next].is_punct("?") => {
            next_significant(nodes, next + 1).is_some_and(|colon| nodes[colon].is_punct(":"))
        }
        _ => false,
    }
}
