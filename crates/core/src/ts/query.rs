//! Structural queries and edits over a token tree.

use std::collections::BTreeSet;

use super::lexer::{SyntaxError, Token, TokenKind};
use super::tree::{Group, Node, is_member_access, next_significant, parse_nodes, prev_significant, visit_lists_mut};

/// A static `import … from '…'` or `export … from '…'` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatement {
    /// Index of the `import`/`export` keyword.
    pub start: usize,
    /// One past the last node, including a trailing `;`.
    pub end: usize,
    /// Index of the string literal.
    pub specifier_index: usize,
    /// Index of the `{ … }` named bindings, if any.
    pub bindings_index: Option<usize>,
    /// Decoded specifier.
    pub specifier: String,
    /// `export … from` rather than `import`.
    pub is_export: bool,
    /// `import type` or `export type`.
    pub type_only: bool,
}

/// An `import('…')` expression, optionally followed by `.Member`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicImport {
    /// Index of the `( … )` group after `import`.
    pub paren_index: usize,
    /// Index of the string literal inside the parenthesised group.
    pub specifier_index: usize,
    /// Index of the accessed member name, if any.
    pub member_index: Option<usize>,
    /// Decoded specifier.
    pub specifier: String,
}

/// A specifier occurrence handed to [`for_each_specifier_mut`].
#[derive(Debug)]
pub enum SpecifierSite<'a> {
    /// Specifier of an `import`/`export … from` statement.
    Static {
        /// String literal token.
        token: &'a mut Token,
        /// Named bindings, if any.
        bindings: Option<&'a mut Group>,
        /// `export … from`.
        is_export: bool,
    },
    /// Specifier of an `import('…')` type.
    Dynamic {
        /// String literal token.
        token: &'a mut Token,
        /// Member name after the call, if any.
        member: Option<&'a mut Token>,
    },
}

impl SpecifierSite<'_> {
    /// Decoded specifier text.
    pub fn specifier(&self) -> Option<String> {
        match self {
            Self::Static { token, .. } | Self::Dynamic { token, .. } => token.string_value(),
        }
    }
}

/// Declaration keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// `namespace`
    Namespace,
    /// `enum`
    Enum,
    /// `class`
    Class,
    /// `interface`
    Interface,
    /// `type`
    TypeAlias,
    /// `const`
    Const,
    /// `function`
    Function,
}

impl DeclKind {
    /// Declarations that only exist at the type level.
    pub fn is_type_only(self) -> bool {
        matches!(self, Self::Interface | Self::TypeAlias)
    }
}

/// A top-level declaration such as `export namespace X { … }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// First node, `export` included.
    pub start: usize,
    /// One past the last node.
    pub end: usize,
    /// Declaration keyword.
    pub kind: DeclKind,
    /// Declared name.
    pub name: String,
    /// Preceded by `export`.
    pub exported: bool,
    /// Index of the body `{ … }` group, if the declaration has one.
    pub body: Option<usize>,
}

/// Member of an object type literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Key, unquoted.
    pub name: String,
    /// Declared with `?`.
    pub optional: bool,
    /// Declared type as written, trimmed.
    pub ty: String,
}

/// Member of an `enum` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// Member name.
    pub name: String,
    /// Initializer value when it is a string literal.
    pub value: Option<String>,
}

/// Static module statements at one list level.
pub fn module_statements(nodes: &[Node]) -> Vec<ModuleStatement> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < nodes.len() {
        let is_export = nodes[i].is_ident("export");
        if !(is_export || nodes[i].is_ident("import")) || is_member_access(nodes, i) {
            i += 1;
            continue;
        }
        match scan_module_statement(nodes, i, is_export) {
            Some(stmt) => {
                i = stmt.end;
                out.push(stmt);
            }
            None => i += 1,
        }
    }
    out
}

fn scan_module_statement(nodes: &[Node], start: usize, is_export: bool) -> Option<ModuleStatement> {
    let mut cursor = start + 1;
    let mut bindings_index = None;
    let mut type_only = false;

    for _ in 0..8 {
        let j = next_significant(nodes, cursor)?;
        let node = &nodes[j];

        if let Some(specifier) = node.string_value() {
            let prev = prev_significant(nodes, j)?;
            let side_effect = prev == start && !is_export;
            if !side_effect && !nodes[prev].is_ident("from") {
                return None;
            }
            let end = match next_significant(nodes, j + 1) {
                Some(k) if nodes[k].is_punct(";") => k + 1,
                _ => j + 1,
            };
            return Some(ModuleStatement {
                start,
                end,
                specifier_index: j,
                bindings_index,
                specifier,
                is_export,
                type_only,
            });
        }

        match node {
            Node::Group(group) if group.is_brace() => bindings_index = Some(j),
            Node::Token(token) if token.kind == TokenKind::Ident => {
                if token.text == "import" || token.text == "export" {
                    return None;
                }
                if token.text == "type" && prev_significant(nodes, j) == Some(start) {
                    type_only = true;
                }
            }
            Node::Token(token) if token.is_punct("*") || token.is_punct(",") => {}
            _ => return None,
        }
        cursor = j + 1;
    }
    None
}

/// `import('…')` expressions at one list level.
pub fn dynamic_imports(nodes: &[Node]) -> Vec<DynamicImport> {
    let mut out = Vec::new();
    for i in 0..nodes.len() {
        if !nodes[i].is_ident("import") || is_member_access(nodes, i) {
            continue;
        }
        let Some(paren_index) = next_significant(nodes, i + 1) else {
            continue;
        };
        let Some(group) = nodes[paren_index].as_group().filter(|g| g.is_paren()) else {
            continue;
        };
        let Some(specifier_index) = next_significant(&group.children, 0) else {
            continue;
        };
        let Some(specifier) = group.children[specifier_index].string_value() else {
            continue;
        };

        let member_index = next_significant(nodes, paren_index + 1)
            .filter(|&d| nodes[d].is_punct("."))
            .and_then(|d| next_significant(nodes, d + 1))
            .filter(|&m| nodes[m].ident().is_some());

        out.push(DynamicImport {
            paren_index,
            specifier_index,
            member_index,
            specifier,
        });
    }
    out
}

/// Visit every module specifier in the tree with mutable access to it.
pub fn for_each_specifier_mut(nodes: &mut Vec<Node>, f: &mut impl FnMut(SpecifierSite<'_>)) {
    visit_lists_mut(nodes, &mut |list: &mut Vec<Node>| {
        for stmt in module_statements(list) {
            let (head, tail) = list.split_at_mut(stmt.specifier_index);
            let bindings = stmt.bindings_index.and_then(|b| head[b].as_group_mut());
            if let Some(token) = tail[0].as_token_mut() {
                f(SpecifierSite::Static {
                    token,
                    bindings,
                    is_export: stmt.is_export,
                });
            }
        }

        for dynamic in dynamic_imports(list) {
            let split = dynamic.member_index.unwrap_or(list.len());
            let (head, tail) = list.split_at_mut(split);
            let member = if dynamic.member_index.is_some() {
                tail.first_mut().and_then(Node::as_token_mut)
            } else {
                None
            };
            let Some(group) = head[dynamic.paren_index].as_group_mut() else {
                continue;
            };
            if let Some(token) = group.children[dynamic.specifier_index].as_token_mut() {
                f(SpecifierSite::Dynamic { token, member });
            }
        }
    });
}

/// Split a `{ … }` binding list into its elements (indices into `children`).
fn binding_elements(group: &Group) -> Vec<Vec<usize>> {
    let mut elements = vec![Vec::new()];
    for (i, node) in group.children.iter().enumerate() {
        if node.is_trivia() {
            continue;
        }
        if node.is_punct(",") {
            elements.push(Vec::new());
        } else if let Some(last) = elements.last_mut() {
            last.push(i);
        }
    }
    elements.retain(|e| !e.is_empty());
    elements
}

/// Index of the imported (pre-`as`) name inside one binding element.
fn binding_name_index(group: &Group, element: &[usize]) -> Option<usize> {
    let first = *element.first()?;
    if group.children[first].is_ident("type") && element.len() > 1 {
        let second = element[1];
        if !group.children[second].is_ident("as") {
            return Some(second);
        }
    }
    Some(first)
}

/// Names imported through a `{ … }` binding list.
pub fn binding_names(group: &Group) -> Vec<String> {
    binding_elements(group)
        .iter()
        .filter_map(|element| binding_name_index(group, element))
        .filter_map(|i| group.children[i].ident().map(str::to_string))
        .collect()
}

/// Point the binding for `from` at the exported name `to`, keeping the local
/// name: `{ UserDto }` becomes `{ Booking_UserDto as UserDto }`.
pub fn alias_binding(group: &mut Group, from: &str, to: &str) -> bool {
    let mut changed = false;
    for element in binding_elements(group).into_iter().rev() {
        let Some(name_index) = binding_name_index(group, &element) else {
            continue;
        };
        if !group.children[name_index].is_ident(from) {
            continue;
        }
        let has_alias = element
            .iter()
            .any(|&i| i > name_index && group.children[i].is_ident("as"));
        if has_alias {
            group.children[name_index] = Node::Token(Token::ident(to));
        } else {
            group.children.splice(
                name_index..=name_index,
                [
                    Node::Token(Token::ident(to)),
                    Node::Token(Token::whitespace(" ")),
                    Node::Token(Token::ident("as")),
                    Node::Token(Token::whitespace(" ")),
                    Node::Token(Token::ident(from)),
                ],
            );
        }
        changed = true;
    }
    changed
}

/// Top-level declarations.
pub fn declarations(nodes: &[Node]) -> Vec<Declaration> {
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(start) = next_significant(nodes, cursor) {
        match parse_declaration(nodes, start) {
            Some(decl) => {
                cursor = decl.end;
                out.push(decl);
            }
            None => cursor = start + 1,
        }
    }
    out
}

/// First top-level declaration of `kind` named `name`.
pub fn find_declaration(nodes: &[Node], kind: DeclKind, name: &str) -> Option<Declaration> {
    declarations(nodes)
        .into_iter()
        .find(|d| d.kind == kind && d.name == name)
}

/// Exported top-level names with their declaration kind.
pub fn exported_names(nodes: &[Node]) -> Vec<(String, DeclKind)> {
    declarations(nodes)
        .into_iter()
        .filter(|d| d.exported)
        .map(|d| (d.name, d.kind))
        .collect()
}

fn parse_declaration(nodes: &[Node], start: usize) -> Option<Declaration> {
    if is_member_access(nodes, start) {
        return None;
    }
    let mut cursor = start;
    let exported = nodes[start].is_ident("export");
    if exported {
        cursor = next_significant(nodes, cursor + 1)?;
    }
    while nodes[cursor]
        .ident()
        .is_some_and(|w| matches!(w, "declare" | "abstract" | "default" | "async"))
    {
        cursor = next_significant(nodes, cursor + 1)?;
    }

    let kind = match nodes[cursor].ident()? {
        "namespace" | "module" => DeclKind::Namespace,
        "enum" => DeclKind::Enum,
        "class" => DeclKind::Class,
        "interface" => DeclKind::Interface,
        "type" => DeclKind::TypeAlias,
        "function" => DeclKind::Function,
        "const" => {
            let next = next_significant(nodes, cursor + 1)?;
            if nodes[next].is_ident("enum") {
                cursor = next;
                DeclKind::Enum
            } else {
                DeclKind::Const
            }
        }
        "let" | "var" => DeclKind::Const,
        _ => return None,
    };

    let name_index = next_significant(nodes, cursor + 1)?;
    let name = nodes[name_index].ident()?.to_string();
    if kind == DeclKind::TypeAlias {
        let after = next_significant(nodes, name_index + 1)?;
        if !(nodes[after].is_punct("=") || nodes[after].is_punct("<")) {
            return None;
        }
    }

    let (body, end) = match kind {
        DeclKind::TypeAlias | DeclKind::Const => {
            let terminator = (name_index + 1..nodes.len()).find(|&i| {
                nodes[i].is_punct(";") || (nodes[i].is_ident("export") && i > name_index + 1)
            });
            let end = match terminator {
                Some(i) if nodes[i].is_punct(";") => i + 1,
                Some(i) => i,
                None => nodes.len(),
            };
            let body = (name_index + 1..end).find(|&i| nodes[i].is_brace_group());
            (body, end)
        }
        _ => {
            let body = (name_index + 1..nodes.len())
                .take_while(|&i| !nodes[i].is_punct(";"))
                .find(|&i| nodes[i].is_brace_group())?;
            (Some(body), body + 1)
        }
    };

    Some(Declaration {
        start,
        end,
        kind,
        name,
        exported,
        body,
    })
}

/// Remove `start..end` along with the comments directly attached above it.
pub fn remove_declaration_range(nodes: &mut Vec<Node>, start: usize, end: usize) {
    let mut lead = start;
    while lead > 0 {
        let Some(token) = nodes[lead - 1].as_token() else {
            break;
        };
        let detached = token.kind == TokenKind::Whitespace && token.text.matches('\n').count() > 1;
        if !token.is_trivia() || detached {
            break;
        }
        lead -= 1;
    }
    nodes.drain(lead..end);

    let leading_whitespace = |n: &Node| n.as_token().is_some_and(|t| t.kind == TokenKind::Whitespace);
    if lead > 0 && lead < nodes.len() && leading_whitespace(&nodes[lead - 1]) && leading_whitespace(&nodes[lead]) {
        nodes.remove(lead);
    } else if lead == 0 && nodes.first().is_some_and(leading_whitespace) {
        nodes.remove(0);
    }
}

/// Member signatures of an object type or interface body.
pub fn object_fields(group: &Group) -> Vec<Field> {
    split_members(&group.children)
        .into_iter()
        .filter_map(|member| {
            let nodes = &group.children[member.0..member.1];
            let mut i = next_significant(nodes, 0)?;
            if nodes[i].is_ident("readonly") {
                i = next_significant(nodes, i + 1)?;
            }
            let name = nodes[i]
                .ident()
                .map(str::to_string)
                .or_else(|| nodes[i].string_value())?;
            let mut j = next_significant(nodes, i + 1)?;
            let optional = nodes[j].is_punct("?");
            if optional {
                j = next_significant(nodes, j + 1)?;
            }
            if !nodes[j].is_punct(":") {
                return None;
            }
            let ty = super::tree::print_nodes(&nodes[j + 1..]).trim().to_string();
            Some(Field { name, optional, ty })
        })
        .collect()
}

/// Members of an `enum { … }` body.
pub fn enum_members(group: &Group) -> Vec<EnumMember> {
    split_members(&group.children)
        .into_iter()
        .filter_map(|member| {
            let nodes = &group.children[member.0..member.1];
            let i = next_significant(nodes, 0)?;
            let name = nodes[i]
                .ident()
                .map(str::to_string)
                .or_else(|| nodes[i].string_value())?;
            let value = next_significant(nodes, i + 1)
                .filter(|&eq| nodes[eq].is_punct("="))
                .and_then(|eq| next_significant(nodes, eq + 1))
                .and_then(|v| nodes[v].string_value());
            Some(EnumMember { name, value })
        })
        .collect()
}

/// Ranges of member slices separated by `;` or `,` outside of type arguments.
fn split_members(children: &[Node]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut angle_depth = 0usize;
    for (i, node) in children.iter().enumerate() {
        if node.is_punct("<") {
            angle_depth += 1;
        } else if node.is_punct(">") {
            angle_depth = angle_depth.saturating_sub(1);
        } else if angle_depth == 0 && (node.is_punct(";") || node.is_punct(",")) {
            out.push((start, i));
            start = i + 1;
        }
    }
    out.push((start, children.len()));
    out.retain(|&(s, e)| next_significant(&children[s..e], 0).is_some());
    out
}

/// Rename every free occurrence of an identifier. Member accesses (`a.from`)
/// are left alone.
pub fn rename_ident(nodes: &mut Vec<Node>, from: &str, to: &str) -> usize {
    let mut count = 0;
    visit_lists_mut(nodes, &mut |list: &mut Vec<Node>| {
        for i in 0..list.len() {
            if list[i].is_ident(from) && !is_member_access(list, i) {
                list[i] = Node::Token(Token::ident(to));
                count += 1;
            }
        }
    });
    count
}

/// Replace `object.member` references with a single identifier.
pub fn replace_member_refs(nodes: &mut Vec<Node>, object: &str, member: &str, replacement: &str) -> usize {
    let mut count = 0;
    visit_lists_mut(nodes, &mut |list: &mut Vec<Node>| {
        let mut i = 0;
        while i < list.len() {
            if list[i].is_ident(object) && !is_member_access(list, i) {
                let target = next_significant(list, i + 1)
                    .filter(|&d| list[d].is_punct("."))
                    .and_then(|d| next_significant(list, d + 1))
                    .filter(|&m| list[m].is_ident(member));
                if let Some(m) = target {
                    list.splice(i..=m, [Node::Token(Token::ident(replacement))]);
                    count += 1;
                }
            }
            i += 1;
        }
    });
    count
}

/// Replace string-literal union runs (`'A' | 'B'`) with a named type when
/// `resolve` recognises the value set. Returns the number of replacements.
pub fn replace_literal_unions<F>(nodes: &mut Vec<Node>, resolve: &mut F) -> usize
where
    F: FnMut(&BTreeSet<String>) -> Option<String>,
{
    let mut count = 0;
    replace_unions_in(nodes, resolve, &mut count);
    count
}

fn replace_unions_in<F>(list: &mut Vec<Node>, resolve: &mut F, count: &mut usize)
where
    F: FnMut(&BTreeSet<String>) -> Option<String>,
{
    // `('A' | 'B')[]` loses its parentheses along with the run.
    for i in 0..list.len() {
        let Some(group) = list[i].as_group().filter(|g| g.is_paren()) else {
            continue;
        };
        let Some(values) = whole_union(&group.children) else {
            continue;
        };
        let array_element = next_significant(list, i + 1)
            .is_some_and(|j| list[j].as_group().is_some_and(Group::is_bracket));
        if !array_element {
            continue;
        }
        if let Some(name) = resolve(&values) {
            list[i] = Node::Token(Token::ident(&name));
            *count += 1;
        }
    }

    for node in list.iter_mut() {
        if let Node::Group(group) = node {
            replace_unions_in(&mut group.children, resolve, count);
        }
    }

    let mut i = 0;
    while i < list.len() {
        let Some((end, values)) = union_run(list, i) else {
            i += 1;
            continue;
        };
        if let Some(name) = resolve(&values) {
            list.splice(i..end, [Node::Token(Token::ident(&name))]);
            *count += 1;
            i += 1;
        } else {
            i = end;
        }
    }
}

/// A run of at least two string literals joined by `|`, starting at `start`.
fn union_run(nodes: &[Node], start: usize) -> Option<(usize, BTreeSet<String>)> {
    let first = nodes[start].string_value()?;
    if prev_significant(nodes, start).is_some_and(|p| nodes[p].is_punct("|")) {
        let before = prev_significant(nodes, start).and_then(|p| prev_significant(nodes, p));
        if before.is_some_and(|b| nodes[b].string_value().is_some()) {
            return None;
        }
    }

    let mut values = BTreeSet::from([first]);
    let mut literals = 1;
    let mut end = start + 1;
    loop {
        let Some(bar) = next_significant(nodes, end).filter(|&b| nodes[b].is_punct("|")) else {
            break;
        };
        let Some(next) = next_significant(nodes, bar + 1) else {
            break;
        };
        let Some(value) = nodes[next].string_value() else {
            break;
        };
        values.insert(value);
        literals += 1;
        end = next + 1;
    }
    (literals >= 2).then_some((end, values))
}

/// The value set when `nodes` consists of nothing but one literal union.
fn whole_union(nodes: &[Node]) -> Option<BTreeSet<String>> {
    let mut start = next_significant(nodes, 0)?;
    if nodes[start].is_punct("|") {
        start = next_significant(nodes, start + 1)?;
    }
    let (end, values) = union_run(nodes, start)?;
    next_significant(nodes, end).is_none().then_some(values)
}

/// Value set of a node slice that is exactly one string-literal union, such
/// as the right-hand side of `export type Status = 'A' | 'B';`.
pub fn literal_union_values(nodes: &[Node]) -> Option<BTreeSet<String>> {
    whole_union(nodes)
}

/// Insert `text` after the last top-level import statement, or before the
/// first significant node when there are none.
pub fn insert_after_imports(nodes: &mut Vec<Node>, text: &str) -> Result<(), SyntaxError> {
    let imports_end = module_statements(nodes)
        .iter()
        .filter(|s| !s.is_export)
        .map(|s| s.end)
        .max();
    let mut insert = parse_nodes(text)?;
    match imports_end {
        Some(end) => {
            insert.insert(0, Node::Token(Token::whitespace("\n")));
            nodes.splice(end..end, insert);
        }
        None => {
            let at = next_significant(nodes, 0).unwrap_or(nodes.len());
            insert.push(Node::Token(Token::whitespace("\n\n")));
            nodes.splice(at..at, insert);
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ts::tree::{SourceFile, visit_lists};

    #[test]
    fn test_module_statements() {
        let file = SourceFile::parse(
            "import type { A } from './A';\nimport { request as __request } from '../core/request';\nimport './side';\nexport * from './models/B';\nexport type { C } from \"./C\";\nexport const from = 1;\n",
        )
        .unwrap();
        let stmts = module_statements(&file.nodes);
        let specs: Vec<_> = stmts.iter().map(|s| s.specifier.as_str()).collect();
        assert_eq!(specs, ["./A", "../core/request", "./side", "./models/B", "./C"]);
        assert!(stmts[0].type_only);
        assert!(!stmts[1].type_only);
        assert!(stmts[3].is_export);
        assert!(stmts[4].type_only);
        assert!(stmts[0].bindings_index.is_some());
        assert!(file.nodes[stmts[0].end - 1].is_punct(";"));
    }

    #[test]
    fn test_dynamic_imports_and_specifiers() {
        let file = SourceFile::parse(
            "export type A = { b?: import('../models/B').B; c: Array<import(\"./C\").C> };\nconst m = import.meta;",
        )
        .unwrap();
        let mut specs = Vec::new();
        visit_lists(&file.nodes, &mut |list| {
            specs.extend(dynamic_imports(list).into_iter().map(|d| d.specifier));
        });
        assert_eq!(specs, ["../models/B", "./C"]);
    }

    #[test]
    fn test_for_each_specifier_mut_edits_in_place() {
        let mut file = SourceFile::parse(
            "import { UserDto } from './UserDto';\nexport type X = import('./UserDto').UserDto;\n",
        )
        .unwrap();
        for_each_specifier_mut(&mut file.nodes, &mut |site| match site {
            SpecifierSite::Static { token, bindings, .. } => {
                token.set_string_value("./Booking_UserDto");
                alias_binding(bindings.unwrap(), "UserDto", "Booking_UserDto");
            }
            SpecifierSite::Dynamic { token, member } => {
                token.set_string_value("./Booking_UserDto");
                *member.unwrap() = Token::ident("Booking_UserDto");
            }
        });
        assert_eq!(
            file.print(),
            "import { Booking_UserDto as UserDto } from './Booking_UserDto';\nexport type X = import('./Booking_UserDto').Booking_UserDto;\n"
        );
    }

    #[test]
    fn test_binding_names_and_existing_alias() {
        let mut file = SourceFile::parse("import { type A, B as C, D } from './x';").unwrap();
        let stmts = module_statements(&file.nodes);
        let index = stmts[0].bindings_index.unwrap();
        let group = file.nodes[index].as_group_mut().unwrap();
        assert_eq!(binding_names(group), ["A", "B", "D"]);
        assert!(alias_binding(group, "B", "Svc_B"));
        assert!(!alias_binding(group, "Z", "Svc_Z"));
        assert_eq!(file.print(), "import { type A, Svc_B as C, D } from './x';");
    }

    #[test]
    fn test_declarations() {
        let src = "/* header */\nimport type { X } from './X';\n\n/** doc */\nexport type Dto = {\n    role?: Dto.role;\n};\nexport namespace Dto {\n    export enum role {\n        ADMIN = 'ADMIN',\n    }\n}\nexport class UsersService {\n    public static f(): void {}\n}\nexport const OpenAPI: Config = { BASE: '' };\ntype Local = string;\n";
        let file = SourceFile::parse(src).unwrap();
        let decls = declarations(&file.nodes);
        let summary: Vec<_> = decls.iter().map(|d| (d.kind, d.name.as_str(), d.exported)).collect();
        assert_eq!(
            summary,
            [
                (DeclKind::TypeAlias, "Dto", true),
                (DeclKind::Namespace, "Dto", true),
                (DeclKind::Class, "UsersService", true),
                (DeclKind::Const, "OpenAPI", true),
                (DeclKind::TypeAlias, "Local", false),
            ]
        );
        assert!(decls[0].body.is_some());
        assert_eq!(exported_names(&file.nodes).len(), 4);
    }

    #[test]
    fn test_remove_declaration_takes_attached_comments() {
        let mut file = SourceFile::parse(
            "/* header */\n\nexport type A = string;\n/** ns */\nexport namespace A {\n    export enum x { Y = 'Y' }\n}\n",
        )
        .unwrap();
        let decl = find_declaration(&file.nodes, DeclKind::Namespace, "A").unwrap();
        remove_declaration_range(&mut file.nodes, decl.start, decl.end);
        assert_eq!(file.print(), "/* header */\n\nexport type A = string;\n");
    }

    #[test]
    fn test_object_fields() {
        let file = SourceFile::parse(
            "export type ApiResponseBoolean = {\n    success: boolean;\n    message?: string;\n    data?: boolean;\n    errors?: Array<ApiErrorDetail>;\n    'x-meta'?: Record<string, { a: number; b: string }>;\n};",
        )
        .unwrap();
        let decl = find_declaration(&file.nodes, DeclKind::TypeAlias, "ApiResponseBoolean").unwrap();
        let body = file.nodes[decl.body.unwrap()].as_group().unwrap();
        let fields = object_fields(body);
        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["success", "message", "data", "errors", "x-meta"]);
        assert_eq!(fields[2].ty, "boolean");
        assert!(fields[2].optional);
        assert!(!fields[0].optional);
        assert_eq!(fields[4].ty, "Record<string, { a: number; b: string }>");
    }

    #[test]
    fn test_enum_members() {
        let file = SourceFile::parse("enum role { ADMIN = 'ADMIN', EMPLOYEE = \"EMPLOYEE\", N = 3, }").unwrap();
        let body = file.nodes.iter().find_map(Node::as_group).unwrap();
        let members = enum_members(body);
        assert_eq!(members.len(), 3);
        assert_eq!(members[0].value.as_deref(), Some("ADMIN"));
        assert_eq!(members[1].value.as_deref(), Some("EMPLOYEE"));
        assert_eq!(members[2].value, None);
    }

    #[test]
    fn test_rename_and_member_refs() {
        let mut file =
            SourceFile::parse("export type UserDto = { role?: UserDto.role; other: x.UserDto };").unwrap();
        assert_eq!(replace_member_refs(&mut file.nodes, "UserDto", "role", "CompanyRole"), 1);
        assert_eq!(rename_ident(&mut file.nodes, "UserDto", "Booking_UserDto"), 1);
        assert_eq!(
            file.print(),
            "export type Booking_UserDto = { role?: CompanyRole; other: x.UserDto };"
        );
    }

    #[test]
    fn test_replace_literal_unions() {
        let mut file = SourceFile::parse(
            "export type A = {\n    role?: 'ADMIN' | 'EMPLOYEE';\n    roles?: Array<'EMPLOYEE' | 'ADMIN'>;\n    list: ('ADMIN' | 'EMPLOYEE')[];\n    other: 'X' | 'Y';\n    single: 'ADMIN';\n    nullable: 'ADMIN' | 'EMPLOYEE' | null;\n};",
        )
        .unwrap();
        let known = BTreeSet::from(["ADMIN".to_string(), "EMPLOYEE".to_string()]);
        let count = replace_literal_unions(&mut file.nodes, &mut |values| {
            (values == &known).then(|| "CompanyRole".to_string())
        });
        assert_eq!(count, 4);
        assert_eq!(
            file.print(),
            "export type A = {\n    role?: CompanyRole;\n    roles?: Array<CompanyRole>;\n    list: CompanyRole[];\n    other: 'X' | 'Y';\n    single: 'ADMIN';\n    nullable: CompanyRole | null;\n};"
        );
    }

    #[test]
    fn test_insert_after_imports() {
        let mut file = SourceFile::parse("import type { A } from './A';\nexport type B = A;\n").unwrap();
        insert_after_imports(&mut file.nodes, "import type { Role } from '../../types';").unwrap();
        assert_eq!(
            file.print(),
            "import type { A } from './A';\nimport type { Role } from '../../types';\nexport type B = A;\n"
        );

        let mut bare = SourceFile::parse("/* generated */\nexport type B = string;\n").unwrap();
        insert_after_imports(&mut bare.nodes, "import type { Role } from '../types';").unwrap();
        assert_eq!(
            bare.print(),
            "/* generated */\nimport type { Role } from '../types';\n\nexport type B = string;\n"
        );
    }
}
