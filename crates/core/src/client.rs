//! Per-service entry points: the `client.ts` factory, the `OpenAPI.ts`
//! config shim and the `index.ts` barrel.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use apiweave_common::naming::pascal_case;
use tracing::{debug, info};

use crate::error::{MergeError, Result};
use crate::fsutil;
use crate::layout::{ArtifactKind, OutputLayout};
use crate::paths::relative_specifier;
use crate::runtime::RUNTIME_ERROR_CLASS;
use crate::ts::ir::{ObjectEntry, TsExport, TsExpr, TsFunction, TsImport, TsModule, TsParam, TsStmt, TsType};
use crate::ts::query::{DeclKind, exported_names};
use crate::ts::{Emit, GENERATED_HEADER, SourceFile};

/// Runtime exports the barrel makes public, besides the config shim.
const RUNTIME_VALUES: [&str; 3] = [RUNTIME_ERROR_CLASS, "CancelablePromise", "CancelError"];
const RUNTIME_TYPES: [&str; 3] = ["ApiRequestOptions", "ApiResult", "OnCancel"];

/// How a service module is exposed on the client object.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ServiceModule {
    /// `X: new X(config)`
    Class { name: String, specifier: String },
    /// `stem: stem`, imported as a namespace
    Functions { stem: String, specifier: String },
}

impl ServiceModule {
    fn key(&self) -> &str {
        match self {
            Self::Class { name, .. } => name,
            Self::Functions { stem, .. } => stem,
        }
    }

    fn specifier(&self) -> &str {
        match self {
            Self::Class { specifier, .. } | Self::Functions { specifier, .. } => specifier,
        }
    }
}

/// Name of the client factory for `service` (`createIdentityClient`).
pub fn factory_name(service: &str) -> String {
    format!("create{}Client", pascal_case(service))
}

/// Write `client.ts`, `OpenAPI.ts` and `index.ts` for every service.
/// Returns the written paths.
pub fn write_clients(layout: &OutputLayout, services: &[String]) -> Result<Vec<PathBuf>> {
    let runtime = layout.runtime_module();
    let runtime_exports = exported_set(&runtime)?;
    let mut written = Vec::new();

    for service in services {
        let dir = layout.service_dir(service);
        let http = relative_specifier(&dir, &runtime);
        let modules = service_modules(layout, service)?;

        let client = dir.join("client.ts");
        fsutil::write(&client, &client_module(service, &http, &modules).emit())?;
        let shim = dir.join("OpenAPI.ts");
        fsutil::write(&shim, &shim_module(&http).emit())?;
        let barrel = dir.join("index.ts");
        let types = relative_specifier(&dir, &layout.types_index());
        fsutil::write(&barrel, &barrel_module(&http, &types, &modules, &runtime_exports).emit())?;

        debug!(service = %service, modules = modules.len(), "Wrote client entry points.");
        written.extend([client, shim, barrel]);
    }

    info!(services = services.len(), "Wrote combined clients.");
    Ok(written)
}

fn exported_set(path: &Path) -> Result<BTreeSet<String>> {
    let source = fsutil::read(path)?;
    let file = SourceFile::parse(&source).map_err(|err| MergeError::syntax(path, &err))?;
    Ok(exported_names(&file.nodes).into_iter().map(|(name, _)| name).collect())
}

fn service_modules(layout: &OutputLayout, service: &str) -> Result<Vec<ServiceModule>> {
    let dir = layout.service_dir(service);
    let mut modules = Vec::new();
    for path in fsutil::ts_files_in(&layout.kind_dir(service, ArtifactKind::Service)) {
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let source = fsutil::read(&path)?;
        let file = SourceFile::parse(&source).map_err(|err| MergeError::syntax(&path, &err))?;
        let specifier = relative_specifier(&dir, &path);

        let classes: Vec<String> = exported_names(&file.nodes)
            .into_iter()
            .filter(|(_, kind)| *kind == DeclKind::Class)
            .map(|(name, _)| name)
            .collect();
        let class = classes.iter().find(|name| **name == stem).or(classes.first()).cloned();
        modules.push(match class {
            Some(name) => ServiceModule::Class { name, specifier },
            None => ServiceModule::Functions { stem, specifier },
        });
    }
    Ok(modules)
}

fn client_module(service: &str, http: &str, modules: &[ServiceModule]) -> TsModule {
    let mut imports = vec![
        TsImport::named(["createConfig"], http),
        TsImport::named(["ClientOptions"], http).type_only(),
    ];
    imports.extend(modules.iter().map(|module| match module {
        ServiceModule::Class { name, specifier } => TsImport::named([name.as_str()], specifier),
        ServiceModule::Functions { stem, specifier } => TsImport::namespace(stem, specifier),
    }));

    let config = TsExpr::ident("config");
    let members = modules
        .iter()
        .map(|module| {
            let value = match module {
                ServiceModule::Class { name, .. } => TsExpr::new_instance(name, vec![config.clone()]),
                ServiceModule::Functions { stem, .. } => TsExpr::ident(stem),
            };
            ObjectEntry::prop(module.key(), value)
        })
        .collect();

    TsModule {
        header: vec![GENERATED_HEADER.to_string()],
        imports,
        functions: vec![TsFunction {
            name: factory_name(service),
            params: vec![TsParam::typed("options", TsType::reference("ClientOptions"))],
            return_type: None,
            body: vec![
                TsStmt::Const {
                    name: "config".to_string(),
                    init: TsExpr::call(TsExpr::ident("createConfig"), vec![TsExpr::ident("options")]),
                },
                TsStmt::Return(TsExpr::Object(members)),
            ],
        }],
        ..TsModule::default()
    }
}

fn shim_module(http: &str) -> TsModule {
    TsModule {
        header: vec![GENERATED_HEADER.to_string()],
        exports: vec![
            TsExport::Named {
                names: vec!["OpenAPIConfig".to_string(), "ClientOptions".to_string()],
                from: http.to_string(),
                type_only: true,
            },
            TsExport::Named {
                names: vec!["createConfig".to_string(), "getBaseUrl".to_string(), "getToken".to_string()],
                from: http.to_string(),
                type_only: false,
            },
        ],
        ..TsModule::default()
    }
}

fn barrel_module(http: &str, types: &str, modules: &[ServiceModule], runtime_exports: &BTreeSet<String>) -> TsModule {
    let public = |names: &[&str]| -> Vec<String> {
        names
            .iter()
            .filter(|name| runtime_exports.contains(**name))
            .map(|name| (*name).to_string())
            .collect()
    };

    let mut exports: Vec<TsExport> = modules
        .iter()
        .map(|module| TsExport::Star {
            from: module.specifier().to_string(),
        })
        .collect();
    exports.extend(["./client", types, "./OpenAPI"].map(|from| TsExport::Star { from: from.to_string() }));

    let values = public(&RUNTIME_VALUES);
    if !values.is_empty() {
        exports.push(TsExport::Named {
            names: values,
            from: http.to_string(),
            type_only: false,
        });
    }
    let types = public(&RUNTIME_TYPES);
    if !types.is_empty() {
        exports.push(TsExport::Named {
            names: types,
            from: http.to_string(),
            type_only: true,
        });
    }

    TsModule {
        header: vec![GENERATED_HEADER.to_string()],
        exports,
        ..TsModule::default()
    }
}
