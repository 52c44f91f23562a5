//! IR for the TypeScript files the pipeline writes from scratch
//! (`types/index.ts`, the runtime config helpers, client entry points).
//! Generated files that are edited in place go through the token tree.

/// A type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TsType {
    /// `string`, `number`, `boolean`
    Primitive(TsPrimitive),
    /// `T[]`
    Array(Box<TsType>),
    /// `A | B | C`
    Union(Vec<TsType>),
    /// `ApiResponse<T>`
    Generic { name: String, args: Vec<TsType> },
    /// `'ADMIN'`
    StringLiteral(String),
    /// A named type, or type text carried over verbatim.
    Ref(String),
}

impl TsType {
    /// Named type.
    pub fn reference(name: impl Into<String>) -> Self {
        TsType::Ref(name.into())
    }

    /// Union of string literals, in the given order.
    pub fn string_union<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TsType::Union(values.into_iter().map(|v| TsType::StringLiteral(v.into())).collect())
    }
}

/// Keyword types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsPrimitive {
    /// `string`
    String,
    /// `number`
    Number,
    /// `boolean`
    Boolean,
}

/// Interface member.
#[derive(Debug, Clone, PartialEq)]
pub struct TsProp {
    /// Key, quoted on output when not an identifier.
    pub name: String,
    /// Member type.
    pub ty: TsType,
    /// Emitted with `?`.
    pub optional: bool,
}

impl TsProp {
    /// `name: ty`
    pub fn required(name: &str, ty: TsType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            optional: false,
        }
    }

    /// `name?: ty`
    pub fn optional(name: &str, ty: TsType) -> Self {
        Self {
            optional: true,
            ..Self::required(name, ty)
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TsExpr {
    /// Bare identifier.
    Ident(String),
    /// `callee(args)`
    Call {
        /// Called expression.
        callee: Box<TsExpr>,
        /// Arguments in order.
        args: Vec<TsExpr>,
    },
    /// `new Class(args)`
    New {
        /// Constructed class.
        class: String,
        /// Constructor arguments.
        args: Vec<TsExpr>,
    },
    /// `object.prop`
    Member {
        /// Accessed expression.
        object: Box<TsExpr>,
        /// Property name.
        prop: String,
    },
    /// Object literal.
    Object(Vec<ObjectEntry>),
}

impl TsExpr {
    /// Identifier expression.
    pub fn ident(name: &str) -> Self {
        TsExpr::Ident(name.to_string())
    }

    /// Property access.
    pub fn member(object: TsExpr, prop: &str) -> Self {
        TsExpr::Member {
            object: Box::new(object),
            prop: prop.to_string(),
        }
    }

    /// Function call.
    pub fn call(callee: TsExpr, args: Vec<TsExpr>) -> Self {
        TsExpr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    /// Constructor call.
    pub fn new_instance(class: &str, args: Vec<TsExpr>) -> Self {
        TsExpr::New {
            class: class.to_string(),
            args,
        }
    }
}

/// One entry of an object literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectEntry {
    /// `key: value`
    Prop(String, TsExpr),
    /// `...value`
    Spread(TsExpr),
}

impl ObjectEntry {
    /// `key: value`
    pub fn prop(key: &str, value: TsExpr) -> Self {
        ObjectEntry::Prop(key.to_string(), value)
    }
}

/// Typed function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TsParam {
    /// Parameter name.
    pub name: String,
    /// Annotation.
    pub ty: TsType,
}

impl TsParam {
    /// `name: ty`
    pub fn typed(name: &str, ty: TsType) -> Self {
        Self {
            name: name.to_string(),
            ty,
        }
    }
}

/// Function body statement.
#[derive(Debug, Clone, PartialEq)]
pub enum TsStmt {
    /// `const name = init;`
    Const {
        /// Binding name.
        name: String,
        /// Initializer.
        init: TsExpr,
    },
    /// `return value;`
    Return(TsExpr),
}

/// Exported arrow function: `export const name = (params): R => { body };`
#[derive(Debug, Clone, PartialEq)]
pub struct TsFunction {
    /// Exported name.
    pub name: String,
    /// Parameters in order.
    pub params: Vec<TsParam>,
    /// Annotation, inferred when absent.
    pub return_type: Option<TsType>,
    /// Statements in order.
    pub body: Vec<TsStmt>,
}

// =============================================================================
// Module-Level IR
// =============================================================================

/// What an import binds.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportClause {
    /// `{ A, B }`
    Named(Vec<String>),
    /// `* as ns`
    Namespace(String),
}

/// `import … from '…';`
#[derive(Debug, Clone, PartialEq)]
pub struct TsImport {
    /// Bound names.
    pub clause: ImportClause,
    /// Module specifier.
    pub from: String,
    /// Emitted as `import type`.
    pub type_only: bool,
}

impl TsImport {
    /// `import { names } from 'from';`
    pub fn named<I, S>(names: I, from: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            clause: ImportClause::Named(names.into_iter().map(Into::into).collect()),
            from: from.to_string(),
            type_only: false,
        }
    }

    /// `import * as alias from 'from';`
    pub fn namespace(alias: &str, from: &str) -> Self {
        Self {
            clause: ImportClause::Namespace(alias.to_string()),
            from: from.to_string(),
            type_only: false,
        }
    }

    /// Make this an `import type`.
    pub fn type_only(mut self) -> Self {
        self.type_only = true;
        self
    }
}

/// Re-export from another module.
#[derive(Debug, Clone, PartialEq)]
pub enum TsExport {
    /// `export * from 'from';`
    Star {
        /// Module specifier.
        from: String,
    },
    /// `export { names } from 'from';`
    Named {
        /// Re-exported names.
        names: Vec<String>,
        /// Module specifier.
        from: String,
        /// Emitted as `export type`.
        type_only: bool,
    },
}

/// Body of a type declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
    /// `interface Name { … }`
    Interface {
        /// Members in order.
        properties: Vec<TsProp>,
    },
    /// `type Name = …;`
    TypeAlias {
        /// Aliased type.
        ty: TsType,
    },
}

/// Exported `interface` or `type` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TsTypeDef {
    /// Declared name.
    pub name: String,
    /// Emitted verbatim, defaults included (`T = unknown`).
    pub type_params: Vec<String>,
    /// Alias or interface body.
    pub kind: TypeDefKind,
}

impl TsTypeDef {
    /// `export type name = ty;`
    pub fn alias(name: &str, ty: TsType) -> Self {
        Self {
            name: name.to_string(),
            type_params: Vec::new(),
            kind: TypeDefKind::TypeAlias { ty },
        }
    }

    /// `export interface name { … }`
    pub fn interface(name: &str, properties: Vec<TsProp>) -> Self {
        Self {
            name: name.to_string(),
            type_params: Vec::new(),
            kind: TypeDefKind::Interface { properties },
        }
    }
}

/// A whole file. Sections are emitted in field order, separated by a blank
/// line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsModule {
    /// Leading comment lines, emitted verbatim.
    pub header: Vec<String>,
    /// Import block.
    pub imports: Vec<TsImport>,
    /// Type declarations.
    pub types: Vec<TsTypeDef>,
    /// Exported functions.
    pub functions: Vec<TsFunction>,
    /// Re-exports, last.
    pub exports: Vec<TsExport>,
}
