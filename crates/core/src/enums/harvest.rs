use std::collections::BTreeSet;

use apiweave_common::naming::pascal_case;
use tracing::info;

use super::registry::{EnumRegistry, enum_name_for_property};
use crate::error::Result;
use crate::fsutil;
use crate::layout::{ArtifactKind, OutputLayout};
use crate::loader::SpecDocument;
use crate::openapi::{Schema, named_schemas};

/// Build the enum registry from the raw documents.
///
/// Top-level string-enum schemas are registered first, across all documents,
/// so they keep their schema names; property enums follow.
pub fn harvest_enums(docs: &[SpecDocument], reserved: BTreeSet<String>) -> Result<EnumRegistry> {
    let mut registry = EnumRegistry::with_reserved(reserved);
    let schemas = docs
        .iter()
        .map(|doc| Ok((doc.service_id.as_str(), named_schemas(doc)?)))
        .collect::<Result<Vec<_>>>()?;

    for (service, named) in &schemas {
        for (name, schema) in named {
            if let Some(values) = schema.string_enum() {
                registry.register(&pascal_case(name), None, values, &format!("{service}:{name}"));
            }
        }
    }

    for (service, named) in &schemas {
        for (name, schema) in named {
            walk_properties(&mut registry, service, name, schema, name);
        }
    }

    info!(count = registry.len(), "Harvested enums.");
    Ok(registry)
}

fn walk_properties(registry: &mut EnumRegistry, service: &str, parent: &str, schema: &Schema, pointer: &str) {
    if let Some(properties) = &schema.properties {
        for (property, sub) in properties {
            let location = format!("{pointer}.{property}");
            let target = match (&sub.items, sub.string_enum()) {
                (Some(items), None) => items.string_enum(),
                (_, values) => values,
            };
            if let Some(values) = target {
                let preferred = enum_name_for_property(property, parent);
                registry.register(&preferred, Some(parent), values, &format!("{service}:{location}"));
            }
            walk_properties(registry, service, parent, sub, &location);
        }
    }
    if let Some(items) = &schema.items {
        walk_properties(registry, service, parent, items, &format!("{pointer}[]"));
    }
    for (i, sub) in schema.composed().enumerate() {
        walk_properties(registry, service, parent, sub, &format!("{pointer}#{i}"));
    }
}

/// Model names an enum must not take: every generated model except the
/// ones that are themselves top-level string enums.
pub fn reserved_model_names(
    layout: &OutputLayout,
    services: &[String],
    docs: &[SpecDocument],
) -> Result<BTreeSet<String>> {
    let mut enum_schemas = BTreeSet::new();
    for doc in docs {
        for (name, schema) in named_schemas(doc)? {
            if schema.string_enum().is_some() {
                enum_schemas.insert(pascal_case(&name));
            }
        }
    }

    let dirs = services
        .iter()
        .map(|s| layout.kind_dir(s, ArtifactKind::Model))
        .chain([layout.common_kind_dir(ArtifactKind::Model)]);
    Ok(dirs
        .flat_map(|dir| fsutil::ts_files_in(&dir))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|stem| !enum_schemas.contains(stem))
        .collect())
}
