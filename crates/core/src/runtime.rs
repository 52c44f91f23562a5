//! Combine the generated transport primitives into `common/core/http.ts` and
//! bind service classes to an explicit per-client configuration.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::layout::{ArtifactKind, OutputLayout};
use crate::relocation::{RelocationMap, SymbolRename};
use crate::ts::ir::{ObjectEntry, TsExpr, TsFunction, TsModule, TsParam, TsPrimitive, TsProp, TsStmt, TsType, TsTypeDef};
use crate::ts::query::{DeclKind, binding_names, declarations, find_declaration, module_statements, rename_ident};
use crate::ts::tree::{Node, SourceFile, is_member_access, next_significant, parse_nodes, prev_significant, print_nodes, visit_lists, visit_lists_mut};
use crate::ts::{Emit, GENERATED_HEADER, TokenKind};

/// Primitive file stems, in the order they appear in the runtime module.
pub const PRIMITIVES: [&str; 6] = ["ApiRequestOptions", "ApiResult", "ApiError", "CancelablePromise", "OpenAPI", "request"];

const CONFIG_MODULE: &str = "OpenAPI";
const ERROR_CLASS: &str = "ApiError";
/// Error class exported by the runtime module.
pub const RUNTIME_ERROR_CLASS: &str = "ApiHttpError";
const DEFAULT_CONFIG: &str = "defaultConfig";

struct Primitive {
    stem: &'static str,
    path: PathBuf,
    nodes: Vec<Node>,
}

/// Build the runtime module, delete every primitive copy and relocate each
/// one to the runtime (service config modules go to `<svc>/OpenAPI.ts`).
pub fn extract_runtime(layout: &OutputLayout, services: &[String], map: &mut RelocationMap) -> Result<PathBuf> {
    let mut primitives = PRIMITIVES
        .iter()
        .map(|&stem| locate(layout, services, stem))
        .collect::<Result<Vec<_>>>()?;

    let mut external = Vec::new();
    for primitive in &mut primitives {
        for import in strip_imports(&mut primitive.nodes) {
            if !external.contains(&import) {
                external.push(import);
            }
        }
        strip_leading_trivia(&mut primitive.nodes);
    }

    let (config, others): (Vec<&mut Primitive>, Vec<&mut Primitive>) =
        primitives.iter_mut().partition(|p| p.stem == CONFIG_MODULE);
    let Some(config) = config.into_iter().next() else {
        return Err(MergeError::MissingRuntime {
            name: CONFIG_MODULE.to_string(),
        });
    };
    rename_config_locals(config, &others);
    if find_declaration(&config.nodes, DeclKind::Const, CONFIG_MODULE).is_none() {
        return Err(MergeError::MissingRuntime {
            name: format!("{CONFIG_MODULE} constant"),
        });
    }
    rename_ident(&mut config.nodes, CONFIG_MODULE, DEFAULT_CONFIG);

    let mut sections = vec![GENERATED_HEADER.to_string()];
    if !external.is_empty() {
        sections.push(external.join("\n"));
    }
    for primitive in &mut primitives {
        rename_ident(&mut primitive.nodes, ERROR_CLASS, RUNTIME_ERROR_CLASS);
        sections.push(print_nodes(&primitive.nodes).trim().to_string());
    }
    sections.push(config_helpers().emit().trim_end().to_string());

    let runtime = layout.runtime_module();
    fsutil::write(&runtime, &format!("{}\n", sections.join("\n\n")))?;
    debug!(path = %runtime.display(), sources = ?primitives.iter().map(|p| p.path.display().to_string()).collect::<Vec<_>>(), "Wrote runtime module.");

    relocate_primitives(layout, services, &runtime, map)?;
    info!(path = %runtime.display(), imports = external.len(), "Extracted HTTP runtime.");
    Ok(runtime)
}

/// `common/core/<stem>.ts` if shared, otherwise the first service's copy.
fn locate(layout: &OutputLayout, services: &[String], stem: &'static str) -> Result<Primitive> {
    let file = format!("{stem}.ts");
    let path = std::iter::once(layout.common_kind_dir(ArtifactKind::Core).join(&file))
        .chain(services.iter().map(|s| layout.kind_dir(s, ArtifactKind::Core).join(&file)))
        .find(|p| p.is_file())
        .ok_or_else(|| MergeError::MissingRuntime { name: stem.to_string() })?;
    let source = fsutil::read(&path)?;
    let nodes = SourceFile::parse(&source)
        .map_err(|err| MergeError::syntax(&path, &err))?
        .nodes;
    Ok(Primitive { stem, path, nodes })
}

/// Remove top-level imports. Relative ones are dropped; the text of the
/// rest is returned.
fn strip_imports(nodes: &mut Vec<Node>) -> Vec<String> {
    let mut external = Vec::new();
    for stmt in module_statements(nodes).into_iter().rev() {
        if stmt.is_export {
            continue;
        }
        if !stmt.specifier.starts_with('.') {
            external.insert(0, print_nodes(&nodes[stmt.start..stmt.end]));
        }
        let mut end = stmt.end;
        if nodes
            .get(end)
            .and_then(Node::as_token)
            .is_some_and(|t| t.kind == TokenKind::Whitespace)
        {
            end += 1;
        }
        nodes.drain(stmt.start..end);
    }
    external
}

fn strip_leading_trivia(nodes: &mut Vec<Node>) {
    let first = next_significant(nodes, 0).unwrap_or(nodes.len());
    nodes.drain(..first);
}

/// Config-module locals such as `type Headers` would clash with names the
/// other primitives use once everything shares one module; prefix them.
fn rename_config_locals(config: &mut Primitive, others: &[&mut Primitive]) {
    let mut used = BTreeSet::new();
    for other in others {
        visit_lists(&other.nodes, &mut |list| {
            used.extend(list.iter().filter_map(Node::ident).map(str::to_string));
        });
    }
    let locals: Vec<String> = declarations(&config.nodes)
        .into_iter()
        .filter(|d| !d.exported && used.contains(&d.name))
        .map(|d| d.name)
        .collect();
    for local in locals {
        let renamed = format!("Config{local}");
        debug!(from = %local, to = %renamed, "Renamed config-module local.");
        rename_ident(&mut config.nodes, &local, &renamed);
    }
}

/// `ClientOptions`, `createConfig`, `getBaseUrl`, `getToken`.
fn config_helpers() -> TsModule {
    let config_type = TsType::reference("OpenAPIConfig");
    let options = TsExpr::ident("options");
    let config = TsExpr::ident("config");
    let arrow = |name: &str, params: Vec<TsParam>, return_type: TsType, value: TsExpr| TsFunction {
        name: name.to_string(),
        params,
        return_type: Some(return_type),
        body: vec![TsStmt::Return(value)],
    };

    TsModule {
        types: vec![TsTypeDef::interface(
            "ClientOptions",
            vec![
                TsProp::required("baseUrl", TsType::Primitive(TsPrimitive::String)),
                TsProp::optional("token", TsType::Primitive(TsPrimitive::String)),
            ],
        )],
        functions: vec![
            arrow(
                "createConfig",
                vec![TsParam::typed("options", TsType::reference("ClientOptions"))],
                config_type.clone(),
                TsExpr::call(
                    TsExpr::member(TsExpr::ident("Object"), "freeze"),
                    vec![TsExpr::Object(vec![
                        ObjectEntry::Spread(TsExpr::ident(DEFAULT_CONFIG)),
                        ObjectEntry::prop("BASE", TsExpr::member(options.clone(), "baseUrl")),
                        ObjectEntry::prop("TOKEN", TsExpr::member(options, "token")),
                    ])],
                ),
            ),
            arrow(
                "getBaseUrl",
                vec![TsParam::typed("config", config_type.clone())],
                TsType::Primitive(TsPrimitive::String),
                TsExpr::member(config.clone(), "BASE"),
            ),
            arrow(
                "getToken",
                vec![TsParam::typed("config", config_type)],
                TsType::reference("OpenAPIConfig['TOKEN']"),
                TsExpr::member(config, "TOKEN"),
            ),
        ],
        ..TsModule::default()
    }
}

fn relocate_primitives(
    layout: &OutputLayout,
    services: &[String],
    runtime: &Path,
    map: &mut RelocationMap,
) -> Result<()> {
    let core_dirs = std::iter::once(layout.common_kind_dir(ArtifactKind::Core))
        .chain(services.iter().map(|s| layout.kind_dir(s, ArtifactKind::Core)));
    for dir in core_dirs {
        for stem in PRIMITIVES {
            let path = dir.join(format!("{stem}.ts"));
            if path.is_file() {
                fsutil::remove(&path)?;
            }
            if stem == ERROR_CLASS {
                map.insert_renamed(
                    &path,
                    runtime,
                    SymbolRename {
                        from: ERROR_CLASS.to_string(),
                        to: RUNTIME_ERROR_CLASS.to_string(),
                    },
                );
            } else {
                map.insert(&path, runtime);
            }
        }
    }

    // Services keep a local config shim at their root.
    for service in services {
        let shim = layout.service_dir(service).join(format!("{CONFIG_MODULE}.ts"));
        map.remove(&shim);
        map.insert(
            layout.kind_dir(service, ArtifactKind::Core).join(format!("{CONFIG_MODULE}.ts")),
            shim,
        );
    }
    Ok(())
}

/// Turn static service classes into instances holding an `OpenAPIConfig`.
/// Returns the number of files rewritten.
pub fn bind_services(layout: &OutputLayout, services: &[String]) -> Result<usize> {
    let mut bound = 0;
    for service in services {
        for path in fsutil::ts_files_in(&layout.kind_dir(service, ArtifactKind::Service)) {
            let source = fsutil::read(&path)?;
            let mut file = SourceFile::parse(&source).map_err(|err| MergeError::syntax(&path, &err))?;
            if bind_service_nodes(&mut file.nodes).map_err(|err| MergeError::syntax(&path, &err))? {
                fsutil::write(&path, &file.print())?;
                debug!(path = %path.display(), "Bound service to instance config.");
                bound += 1;
            }
        }
    }
    info!(count = bound, "Bound service classes.");
    Ok(bound)
}

fn bind_service_nodes(nodes: &mut Vec<Node>) -> std::result::Result<bool, crate::ts::SyntaxError> {
    let Some(import) = module_statements(nodes).into_iter().find(|s| {
        !s.is_export
            && s.bindings_index
                .and_then(|i| nodes[i].as_group())
                .is_some_and(|g| binding_names(g).iter().any(|n| n == CONFIG_MODULE))
    }) else {
        return Ok(false);
    };

    let mut calls = 0;
    visit_lists_mut(nodes, &mut |list: &mut Vec<Node>| {
        for i in 0..list.len() {
            let is_call = list[i].is_paren_group()
                && prev_significant(list, i).is_some_and(|p| list[p].ident().is_some());
            if !is_call {
                continue;
            }
            let Some(group) = list[i].as_group_mut() else {
                continue;
            };
            let Some(first) = next_significant(&group.children, 0) else {
                continue;
            };
            let bare = group.children[first].is_ident(CONFIG_MODULE)
                && !next_significant(&group.children, first + 1).is_some_and(|n| group.children[n].is_punct("."));
            if bare && let Ok(replacement) = parse_nodes("this.config") {
                group.children.splice(first..=first, replacement);
                calls += 1;
            }
        }
    });

    for class in declarations(nodes).into_iter().rev().filter(|d| d.kind == DeclKind::Class) {
        let Some(body) = class.body.and_then(|b| nodes[b].as_group_mut()) else {
            continue;
        };
        let mut i = 0;
        while i < body.children.len() {
            if body.children[i].is_ident("static") && !is_member_access(&body.children, i) {
                let end = if body.children.get(i + 1).is_some_and(Node::is_trivia) { i + 2 } else { i + 1 };
                body.children.drain(i..end);
            } else {
                i += 1;
            }
        }
        let has_constructor = body.children.iter().any(|n| n.is_ident("constructor"));
        if !has_constructor {
            let constructor = parse_nodes("\n    constructor(private readonly config: OpenAPIConfig) {}\n")?;
            body.children.splice(0..0, constructor);
        }
    }

    let replacement = parse_nodes(&format!("import type {{ OpenAPIConfig }} from '{}';", import.specifier))?;
    nodes.splice(import.start..import.end, replacement);
    debug!(calls, "Rewired request calls to the instance config.");
    Ok(true)
}
