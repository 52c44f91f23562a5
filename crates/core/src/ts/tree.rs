//! Balanced token tree over a TypeScript source.
//!
//! Brackets group their contents so that structural transforms never have to
//! count braces themselves. Printing an unmodified tree returns the original
//! text byte-for-byte.

use super::lexer::{SyntaxError, Token, TokenKind, tokenize};

/// Element of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A leaf token, trivia included.
    Token(Token),
    /// A bracketed region.
    Group(Group),
}

/// A bracketed region: `( … )`, `[ … ]` or `{ … }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Opening bracket.
    pub open: Token,
    /// Everything between the brackets.
    pub children: Vec<Node>,
    /// Matching closing bracket.
    pub close: Token,
}

/// A parsed file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceFile {
    /// Top-level nodes.
    pub nodes: Vec<Node>,
}

impl Node {
    /// Whitespace or comment token.
    pub fn is_trivia(&self) -> bool {
        matches!(self, Node::Token(t) if t.is_trivia())
    }

    /// The token, if a leaf.
    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Node::Token(t) => Some(t),
            Node::Group(_) => None,
        }
    }

    /// Mutable token, if a leaf.
    pub fn as_token_mut(&mut self) -> Option<&mut Token> {
        match self {
            Node::Token(t) => Some(t),
            Node::Group(_) => None,
        }
    }

    /// The group, if bracketed.
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Group(g) => Some(g),
            Node::Token(_) => None,
        }
    }

    /// Mutable group, if bracketed.
    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match self {
            Node::Group(g) => Some(g),
            Node::Token(_) => None,
        }
    }

    /// Identifier token spelled `name`.
    pub fn is_ident(&self, name: &str) -> bool {
        self.as_token().is_some_and(|t| t.is_ident(name))
    }

    /// Punctuator token spelled `p`.
    pub fn is_punct(&self, p: &str) -> bool {
        self.as_token().is_some_and(|t| t.is_punct(p))
    }

    /// Identifier text, if this node is an identifier.
    pub fn ident(&self) -> Option<&str> {
        self.as_token()
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text.as_str())
    }

    /// Decoded value of a string literal token.
    pub fn string_value(&self) -> Option<String> {
        self.as_token().and_then(Token::string_value)
    }

    /// `{ … }` group.
    pub fn is_brace_group(&self) -> bool {
        self.as_group().is_some_and(Group::is_brace)
    }

    /// `( … )` group.
    pub fn is_paren_group(&self) -> bool {
        self.as_group().is_some_and(Group::is_paren)
    }

    fn print_into(&self, out: &mut String) {
        match self {
            Node::Token(t) => out.push_str(&t.text),
            Node::Group(g) => g.print_into(out),
        }
    }
}

impl Group {
    /// Opened by `{`.
    pub fn is_brace(&self) -> bool {
        self.open.text == "{"
    }

    /// Opened by `(`.
    pub fn is_paren(&self) -> bool {
        self.open.text == "("
    }

    /// Opened by `[`.
    pub fn is_bracket(&self) -> bool {
        self.open.text == "["
    }

    /// Non-trivia children.
    pub fn significant(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|n| !n.is_trivia())
    }

    /// Source text, brackets included.
    pub fn print(&self) -> String {
        let mut out = String::new();
        self.print_into(&mut out);
        out
    }

    fn print_into(&self, out: &mut String) {
        out.push_str(&self.open.text);
        for child in &self.children {
            child.print_into(out);
        }
        out.push_str(&self.close.text);
    }
}

impl SourceFile {
    /// Tokenize and group `src`.
    pub fn parse(src: &str) -> Result<Self, SyntaxError> {
        Ok(Self {
            nodes: build(tokenize(src)?)?,
        })
    }

    /// Source text; identical to the input when unmodified.
    pub fn print(&self) -> String {
        print_nodes(&self.nodes)
    }
}

/// Concatenated source text of `nodes`.
pub fn print_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        node.print_into(&mut out);
    }
    out
}

/// Parse a snippet into nodes for splicing into another tree.
pub fn parse_nodes(src: &str) -> Result<Vec<Node>, SyntaxError> {
    Ok(SourceFile::parse(src)?.nodes)
}

fn closer_for(open: &str) -> &'static str {
    match open {
        "(" => ")",
        "[" => "]",
        _ => "}",
    }
}

fn build(tokens: Vec<Token>) -> Result<Vec<Node>, SyntaxError> {
    let mut stack: Vec<(Token, Vec<Node>, usize)> = Vec::new();
    let mut current = Vec::new();
    let mut line = 1;

    for token in tokens {
        let newlines = token.text.matches('\n').count();
        if token.kind == TokenKind::Punct && matches!(token.text.as_str(), "(" | "[" | "{") {
            stack.push((token, std::mem::take(&mut current), line));
        } else if token.kind == TokenKind::Punct && matches!(token.text.as_str(), ")" | "]" | "}")
        {
            let Some((open, parent, _)) = stack.pop() else {
                return Err(SyntaxError {
                    line,
                    message: format!("unexpected '{}'", token.text),
                });
            };
            if closer_for(&open.text) != token.text {
                return Err(SyntaxError {
                    line,
                    message: format!("'{}' closed by '{}'", open.text, token.text),
                });
            }
            let children = std::mem::replace(&mut current, parent);
            current.push(Node::Group(Group {
                open,
                children,
                close: token,
            }));
        } else {
            current.push(Node::Token(token));
        }
        line += newlines;
    }

    if let Some((open, _, opened_at)) = stack.last() {
        return Err(SyntaxError {
            line: *opened_at,
            message: format!("unclosed '{}'", open.text),
        });
    }
    Ok(current)
}

/// Index of the first non-trivia node at or after `from`.
pub fn next_significant(nodes: &[Node], from: usize) -> Option<usize> {
    (from..nodes.len()).find(|&i| !nodes[i].is_trivia())
}

/// Index of the last non-trivia node strictly before `before`.
pub fn prev_significant(nodes: &[Node], before: usize) -> Option<usize> {
    (0..before.min(nodes.len())).rev().find(|&i| !nodes[i].is_trivia())
}

/// True when the node at `index` is reached through a member access (`a.b`).
pub fn is_member_access(nodes: &[Node], index: usize) -> bool {
    prev_significant(nodes, index).is_some_and(|p| nodes[p].is_punct(".") || nodes[p].is_punct("?."))
}

/// Call `f` on every node list in the tree: the top level and every group body.
/// Children are visited before their parent list.
pub fn visit_lists_mut(nodes: &mut Vec<Node>, f: &mut impl FnMut(&mut Vec<Node>)) {
    for node in nodes.iter_mut() {
        if let Node::Group(group) = node {
            visit_lists_mut(&mut group.children, f);
        }
    }
    f(nodes);
}

/// Read-only counterpart of [`visit_lists_mut`].
pub fn visit_lists(nodes: &[Node], f: &mut impl FnMut(&[Node])) {
    for node in nodes {
        if let Node::Group(group) = node {
            visit_lists(&group.children, f);
        }
    }
    f(nodes);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_print_round_trip() {
        let src = "export class A {\n    public static f(x: { a: string }): void {\n        g(`${x.a}}`, [1, 2]);\n    }\n}\n";
        let file = SourceFile::parse(src).unwrap();
        assert_eq!(file.print(), src);
    }

    #[test]
    fn test_groups_nest() {
        let file = SourceFile::parse("namespace N { enum E { A = 'a' } }").unwrap();
        let body = file.nodes.iter().find_map(Node::as_group).unwrap();
        assert!(body.is_brace());
        assert!(body.significant().any(Node::is_brace_group));
    }

    #[test]
    fn test_unbalanced_input_is_rejected() {
        assert!(SourceFile::parse("export type A = {").is_err());
        assert!(SourceFile::parse("f(]").is_err());
        assert!(SourceFile::parse("}").is_err());
        let err = SourceFile::parse("a\nb\n{ (\n").unwrap_err();
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_significant_navigation() {
        let file = SourceFile::parse("a . /* c */ b").unwrap();
        let first = next_significant(&file.nodes, 0).unwrap();
        assert!(file.nodes[first].is_ident("a"));
        let last = prev_significant(&file.nodes, file.nodes.len()).unwrap();
        assert!(file.nodes[last].is_ident("b"));
        assert!(is_member_access(&file.nodes, last));
        assert!(!is_member_access(&file.nodes, first));
    }
}
