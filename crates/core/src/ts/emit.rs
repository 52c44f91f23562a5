//! Rendering of the IR to TypeScript source.
//!
//! Every IR node implements `Emit`; files are built by composing nodes and
//! calling `emit` on the `TsModule`.

use super::ir::{
    ImportClause, ObjectEntry, TsExport, TsExpr, TsFunction, TsImport, TsModule, TsParam, TsPrimitive, TsProp,
    TsStmt, TsType, TsTypeDef, TypeDefKind,
};

/// Render a node as TypeScript source.
pub trait Emit {
    /// Source text for this node.
    fn emit(&self) -> String;
}

const INDENT: &str = "    ";

fn join<T: Emit>(items: &[T], separator: &str) -> String {
    items.iter().map(Emit::emit).collect::<Vec<_>>().join(separator)
}

fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Property keys that are not identifiers are quoted (`'x-trace'`).
fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    let is_identifier = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        name.to_string()
    } else {
        string_literal(name)
    }
}

// =============================================================================
// Types
// =============================================================================

impl Emit for TsPrimitive {
    fn emit(&self) -> String {
        let keyword = match self {
            TsPrimitive::String => "string",
            TsPrimitive::Number => "number",
            TsPrimitive::Boolean => "boolean",
        };
        keyword.to_string()
    }
}

impl Emit for TsType {
    fn emit(&self) -> String {
        match self {
            TsType::Primitive(p) => p.emit(),
            TsType::Array(inner) if matches!(**inner, TsType::Union(_)) => format!("({})[]", inner.emit()),
            TsType::Array(inner) => format!("{}[]", inner.emit()),
            TsType::Union(members) => join(members, " | "),
            TsType::Generic { name, args } => format!("{name}<{}>", join(args, ", ")),
            TsType::StringLiteral(value) => string_literal(value),
            TsType::Ref(text) => text.clone(),
        }
    }
}

impl Emit for TsProp {
    fn emit(&self) -> String {
        let marker = if self.optional { "?" } else { "" };
        format!("{}{marker}: {}", property_key(&self.name), self.ty.emit())
    }
}

impl Emit for TsTypeDef {
    fn emit(&self) -> String {
        let params = if self.type_params.is_empty() {
            String::new()
        } else {
            format!("<{}>", self.type_params.join(", "))
        };
        match &self.kind {
            TypeDefKind::TypeAlias { ty } => format!("export type {}{params} = {};\n", self.name, ty.emit()),
            TypeDefKind::Interface { properties } => {
                let body: String = properties.iter().map(|p| format!("{INDENT}{};\n", p.emit())).collect();
                format!("export interface {}{params} {{\n{body}}}\n", self.name)
            }
        }
    }
}

// =============================================================================
// Code
// =============================================================================

impl Emit for ObjectEntry {
    fn emit(&self) -> String {
        match self {
            ObjectEntry::Prop(key, value) => format!("{}: {}", property_key(key), value.emit()),
            ObjectEntry::Spread(value) => format!("...{}", value.emit()),
        }
    }
}

impl Emit for TsExpr {
    fn emit(&self) -> String {
        match self {
            TsExpr::Ident(name) => name.clone(),
            TsExpr::Call { callee, args } => format!("{}({})", callee.emit(), join(args, ", ")),
            TsExpr::New { class, args } => format!("new {class}({})", join(args, ", ")),
            TsExpr::Member { object, prop } => format!("{}.{prop}", object.emit()),
            TsExpr::Object(entries) if entries.is_empty() => "{}".to_string(),
            TsExpr::Object(entries) => format!("{{ {} }}", join(entries, ", ")),
        }
    }
}

impl Emit for TsParam {
    fn emit(&self) -> String {
        format!("{}: {}", self.name, self.ty.emit())
    }
}

impl Emit for TsStmt {
    fn emit(&self) -> String {
        match self {
            TsStmt::Const { name, init } => format!("{INDENT}const {name} = {};\n", init.emit()),
            TsStmt::Return(value) => format!("{INDENT}return {};\n", value.emit()),
        }
    }
}

impl Emit for TsFunction {
    fn emit(&self) -> String {
        let returns = self
            .return_type
            .as_ref()
            .map(|ty| format!(": {}", ty.emit()))
            .unwrap_or_default();
        let body: String = self.body.iter().map(Emit::emit).collect();
        format!(
            "export const {} = ({}){returns} => {{\n{body}}};\n",
            self.name,
            join(&self.params, ", ")
        )
    }
}

// =============================================================================
// Modules
// =============================================================================

impl Emit for TsImport {
    fn emit(&self) -> String {
        let keyword = if self.type_only { "type " } else { "" };
        let clause = match &self.clause {
            ImportClause::Named(names) => format!("{{ {} }}", names.join(", ")),
            ImportClause::Namespace(alias) => format!("* as {alias}"),
        };
        format!("import {keyword}{clause} from '{}';\n", self.from)
    }
}

impl Emit for TsExport {
    fn emit(&self) -> String {
        match self {
            TsExport::Star { from } => format!("export * from '{from}';\n"),
            TsExport::Named { names, from, type_only } => {
                let keyword = if *type_only { "type " } else { "" };
                format!("export {keyword}{{ {} }} from '{from}';\n", names.join(", "))
            }
        }
    }
}

impl Emit for TsModule {
    fn emit(&self) -> String {
        let mut sections = Vec::new();
        if !self.header.is_empty() {
            sections.push(self.header.iter().map(|line| format!("{line}\n")).collect::<String>());
        }
        if !self.imports.is_empty() {
            sections.push(join(&self.imports, ""));
        }
        sections.extend(self.types.iter().map(Emit::emit));
        sections.extend(self.functions.iter().map(Emit::emit));
        if !self.exports.is_empty() {
            sections.push(join(&self.exports, ""));
        }
        sections.join("\n")
    }
}
