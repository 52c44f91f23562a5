//! `types/index.ts`: synthesized primitives, enums, the generic response
//! envelope with its aliases, and re-exports of every surviving model.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::enums::EnumRegistry;
use crate::envelope::{ENVELOPE, EnvelopeAlias};
use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::layout::{ArtifactKind, OutputLayout};
use crate::paths::relative_specifier;
use crate::ts::ir::{TsExport, TsModule, TsPrimitive, TsProp, TsType, TsTypeDef};
use crate::ts::query::exported_names;
use crate::ts::{Emit, GENERATED_HEADER, SourceFile};

fn string() -> TsType {
    TsType::Primitive(TsPrimitive::String)
}

fn number() -> TsType {
    TsType::Primitive(TsPrimitive::Number)
}

/// Declarations every merged client shares.
fn synthesized() -> Vec<TsTypeDef> {
    let mut envelope = TsTypeDef::interface(
        ENVELOPE,
        vec![
            TsProp::required("success", TsType::Primitive(TsPrimitive::Boolean)),
            TsProp::required("message", string()),
            TsProp::optional("data", TsType::reference("T")),
            TsProp::optional("errors", TsType::Array(Box::new(TsType::reference("ApiErrorDetail")))),
            TsProp::optional("meta", TsType::reference("ApiMeta")),
            TsProp::required("timestamp", TsType::reference("DateTime")),
        ],
    );
    envelope.type_params = vec!["T = unknown".to_string()];

    vec![
        TsTypeDef::interface(
            "ApiErrorDetail",
            vec![
                TsProp::optional("field", string()),
                TsProp::required("message", string()),
                TsProp::optional("code", string()),
            ],
        ),
        TsTypeDef::interface(
            "ApiMeta",
            vec![
                TsProp::optional("page", number()),
                TsProp::optional("size", number()),
                TsProp::optional("totalElements", number()),
                TsProp::optional("totalPages", number()),
                TsProp::optional("requestId", string()),
            ],
        ),
        envelope,
    ]
}

/// Write `types/index.ts` and return its path.
pub fn write_types_index(
    layout: &OutputLayout,
    services: &[String],
    registry: &EnumRegistry,
    aliases: &[EnvelopeAlias],
) -> Result<PathBuf> {
    let path = layout.types_index();
    let types_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let mut types = vec![TsTypeDef::alias("UUID", string()), TsTypeDef::alias("DateTime", string())];
    types.extend(
        registry
            .sorted()
            .into_iter()
            .map(|entry| TsTypeDef::alias(&entry.name, TsType::string_union(entry.values.iter().cloned()))),
    );
    types.extend(synthesized());
    types.extend(aliases.iter().map(|alias| {
        TsTypeDef::alias(
            &alias.name,
            TsType::Generic {
                name: ENVELOPE.to_string(),
                args: vec![TsType::reference(alias.payload.clone())],
            },
        )
    }));

    let mut declared: BTreeSet<String> = types.iter().map(|t| t.name.clone()).collect();
    let exports = model_exports(layout, services, &types_dir, &mut declared)?;

    let module = TsModule {
        header: vec![GENERATED_HEADER.to_string()],
        types,
        exports,
        ..TsModule::default()
    };
    fsutil::write(&path, &module.emit())?;
    info!(path = %path.display(), enums = registry.len(), aliases = aliases.len(), "Wrote shared types.");
    Ok(path)
}

/// Re-exports of the models left in service and common model directories.
fn model_exports(
    layout: &OutputLayout,
    services: &[String],
    types_dir: &Path,
    declared: &mut BTreeSet<String>,
) -> Result<Vec<TsExport>> {
    let dirs = services
        .iter()
        .map(|s| layout.kind_dir(s, ArtifactKind::Model))
        .chain([layout.common_kind_dir(ArtifactKind::Model)]);

    let mut exports = Vec::new();
    for path in dirs.flat_map(|dir| fsutil::ts_files_in(&dir)) {
        let source = fsutil::read(&path)?;
        let file = SourceFile::parse(&source).map_err(|err| MergeError::syntax(&path, &err))?;

        let mut type_names = Vec::new();
        let mut value_names = Vec::new();
        for (name, kind) in exported_names(&file.nodes) {
            if !declared.insert(name.clone()) {
                warn!(path = %path.display(), name = %name, "Model name already exported from types; skipped.");
                continue;
            }
            if kind.is_type_only() {
                type_names.push(name);
            } else {
                value_names.push(name);
            }
        }

        let from = relative_specifier(types_dir, &path);
        if !type_names.is_empty() {
            exports.push(TsExport::Named {
                names: type_names,
                from: from.clone(),
                type_only: true,
            });
        }
        if !value_names.is_empty() {
            exports.push(TsExport::Named {
                names: value_names,
                from,
                type_only: false,
            });
        }
    }
    Ok(exports)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_types_index_contents_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let layout = OutputLayout::new(root);
        let services = vec!["identity".to_string(), "booking".to_string()];
        fsutil::write(&root.join("identity/models/Identity_UserDto.ts"), "export type Identity_UserDto = { id?: string };\n").unwrap();
        fsutil::write(&root.join("booking/models/Level.ts"), "export enum Level {\n    ONE = 1,\n}\n").unwrap();
        fsutil::write(&root.join("common/models/Link.ts"), "export type Link = { href?: string };\n").unwrap();
        fsutil::write(&root.join("common/models/CompanyRole.ts"), "export type CompanyRole = { x?: string };\n").unwrap();

        let mut registry = EnumRegistry::new();
        registry.register("UserRole", None, ["USER".to_string(), "ADMIN".to_string()], "a");
        registry.register("CompanyRole", None, ["EMPLOYEE".to_string(), "ADMIN".to_string()], "b");
        let aliases = [EnvelopeAlias {
            name: "ApiResponseBoolean".to_string(),
            payload: "boolean".to_string(),
        }];

        let path = write_types_index(&layout, &services, &registry, &aliases).unwrap();
        let index = fsutil::read(&path).unwrap();
        let expected = "/* generated by apiweave -- do not edit */\n\
\n\
export type UUID = string;\n\
\n\
export type DateTime = string;\n\
\n\
export type CompanyRole = 'ADMIN' | 'EMPLOYEE';\n\
\n\
export type UserRole = 'ADMIN' | 'USER';\n\
\n\
export interface ApiErrorDetail {\n    field?: string;\n    message: string;\n    code?: string;\n}\n\
\n\
export interface ApiMeta {\n    page?: number;\n    size?: number;\n    totalElements?: number;\n    totalPages?: number;\n    requestId?: string;\n}\n\
\n\
export interface ApiResponse<T = unknown> {\n    success: boolean;\n    message: string;\n    data?: T;\n    errors?: ApiErrorDetail[];\n    meta?: ApiMeta;\n    timestamp: DateTime;\n}\n\
\n\
export type ApiResponseBoolean = ApiResponse<boolean>;\n\
\n\
export type { Identity_UserDto } from '../identity/models/Identity_UserDto';\n\
export { Level } from '../booking/models/Level';\n\
export type { Link } from '../common/models/Link';\n";
        assert_eq!(index, expected);
    }
}
