//! Tokenizer for generated TypeScript sources.
//!
//! The lexer only needs to be precise about the places where a naive scan goes
//! wrong: braces inside string, template and regular-expression literals, and
//! comments. Everything else is classified coarsely.

use thiserror::Error;

/// Lexical class of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Spaces and newlines.
    Whitespace,
    /// `// …`
    LineComment,
    /// `/* … */`
    BlockComment,
    /// Identifiers and keywords, including `$` and `#private` names.
    Ident,
    /// Numeric literal.
    Number,
    /// `'…'` or `"…"`
    Str,
    /// `` `…` `` including any `${…}` substitutions
    Template,
    /// `/…/flags`
    Regex,
    /// Operators and delimiters.
    Punct,
}

/// One lexeme with its exact source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Lexical class.
    pub kind: TokenKind,
    /// Source text, printed back verbatim.
    pub text: String,
}

/// Source the lexer or tree builder cannot handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}")]
pub struct SyntaxError {
    /// 1-based line.
    pub line: usize,
    /// What went wrong.
    pub message: String,
}

/// Multi-character punctuators, longest first. `>>` is deliberately absent so
/// nested generic closers stay separate tokens.
const PUNCTUATORS: &[&str] = &[
    "...", "===", "!==", "**=", "&&=", "||=", "??=", "=>", "==", "!=", "<=", ">=", "&&", "||",
    "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "**",
];

/// Keywords after which a `/` starts a regular expression rather than a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "case",
    "do",
    "else",
    "in",
    "instanceof",
    "new",
    "delete",
    "void",
    "throw",
    "yield",
    "await",
    "of",
];

impl Token {
    /// Token of `kind` with `text`.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Identifier token.
    pub fn ident(name: &str) -> Self {
        Self::new(TokenKind::Ident, name)
    }

    /// Punctuator token.
    pub fn punct(p: &str) -> Self {
        Self::new(TokenKind::Punct, p)
    }

    /// Whitespace token.
    pub fn whitespace(ws: &str) -> Self {
        Self::new(TokenKind::Whitespace, ws)
    }

    /// Build a string literal token with the given quote character.
    pub fn string_literal(value: &str, quote: char) -> Self {
        Self::new(TokenKind::Str, quote_string(value, quote))
    }

    /// Whitespace or comment.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// Identifier spelled `name`.
    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    /// Punctuator spelled `p`.
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    /// Decoded value of a string literal token.
    pub fn string_value(&self) -> Option<String> {
        if self.kind != TokenKind::Str || self.text.len() < 2 {
            return None;
        }
        Some(unescape(&self.text[1..self.text.len() - 1]))
    }

    /// Replace the value of a string literal, keeping its quote style.
    pub fn set_string_value(&mut self, value: &str) {
        let quote = self.text.chars().next().unwrap_or('\'');
        self.text = quote_string(value, quote);
    }
}

fn quote_string(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Split a source file into tokens. Concatenating the token texts reproduces
/// the input exactly.
pub fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

/// Comment-free, whitespace-collapsed rendering of a source, used for hashing.
pub fn normalize(src: &str) -> Result<String, SyntaxError> {
    let mut out = String::with_capacity(src.len());
    let mut pending_space = false;
    for token in tokenize(src)? {
        if token.is_trivia() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push_str(&token.text);
    }
    Ok(out)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    prev: Option<Token>,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            prev: None,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek(0).is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn error(&self, message: &str) -> SyntaxError {
        let end = self.pos.min(self.chars.len());
        SyntaxError {
            line: self.chars[..end].iter().filter(|c| **c == '\n').count() + 1,
            message: message.to_string(),
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, SyntaxError> {
        let Some(c) = self.peek(0) else {
            return Ok(None);
        };
        let start = self.pos;

        let kind = if c.is_whitespace() {
            self.eat_while(char::is_whitespace);
            TokenKind::Whitespace
        } else if c == '/' && self.peek(1) == Some('/') {
            self.eat_while(|c| c != '\n');
            TokenKind::LineComment
        } else if c == '/' && self.peek(1) == Some('*') {
            self.scan_block_comment()?;
            TokenKind::BlockComment
        } else if is_ident_start(c) || (c == '#' && self.peek(1).is_some_and(is_ident_start)) {
            self.pos += 1;
            self.eat_while(is_ident_continue);
            TokenKind::Ident
        } else if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|n| n.is_ascii_digit()))
        {
            self.scan_number();
            TokenKind::Number
        } else if c == '\'' || c == '"' {
            self.scan_string(c)?;
            TokenKind::Str
        } else if c == '`' {
            self.scan_template()?;
            TokenKind::Template
        } else if c == '/' && self.regex_allowed() {
            self.scan_regex()?;
            TokenKind::Regex
        } else {
            self.scan_punct();
            TokenKind::Punct
        };

        let token = Token::new(kind, self.chars[start..self.pos].iter().collect::<String>());
        if !token.is_trivia() {
            self.prev = Some(token.clone());
        }
        Ok(Some(token))
    }

    fn scan_block_comment(&mut self) -> Result<(), SyntaxError> {
        self.pos += 2;
        loop {
            if self.peek(0).is_none() {
                return Err(self.error("unterminated block comment"));
            }
            if self.starts_with("*/") {
                self.pos += 2;
                return Ok(());
            }
            self.pos += 1;
        }
    }

    fn scan_number(&mut self) {
        let mut seen_dot = false;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.pos += 1;
            } else if c == '.' && !seen_dot && self.peek(1).is_some_and(|n| n.is_ascii_digit()) {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<(), SyntaxError> {
        self.pos += 1;
        loop {
            match self.peek(0) {
                None | Some('\n') => return Err(self.error("unterminated string literal")),
                Some('\\') => self.pos += 2,
                Some(c) if c == quote => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn scan_template(&mut self) -> Result<(), SyntaxError> {
        self.pos += 1;
        loop {
            match self.peek(0) {
                None => return Err(self.error("unterminated template literal")),
                Some('\\') => self.pos += 2,
                Some('`') => {
                    self.pos += 1;
                    return Ok(());
                }
                Some('$') if self.peek(1) == Some('{') => {
                    self.pos += 2;
                    self.scan_substitution()?;
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Consume a `${…}` body up to and including its closing brace.
    fn scan_substitution(&mut self) -> Result<(), SyntaxError> {
        let saved_prev = self.prev.take();
        let mut depth = 0usize;
        loop {
            let Some(token) = self.next_token()? else {
                return Err(self.error("unterminated template substitution"));
            };
            if token.is_punct("{") {
                depth += 1;
            } else if token.is_punct("}") {
                if depth == 0 {
                    self.prev = saved_prev;
                    return Ok(());
                }
                depth -= 1;
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        match &self.prev {
            None => true,
            Some(prev) => match prev.kind {
                TokenKind::Ident => REGEX_KEYWORDS.contains(&prev.text.as_str()),
                TokenKind::Punct => !matches!(prev.text.as_str(), ")" | "]" | "}" | "++" | "--"),
                _ => false,
            },
        }
    }

    fn scan_regex(&mut self) -> Result<(), SyntaxError> {
        self.pos += 1;
        let mut in_class = false;
        loop {
            match self.peek(0) {
                None | Some('\n') => {
                    return Err(self.error("unterminated regular expression literal"));
                }
                Some('\\') => self.pos += 2,
                Some('[') => {
                    in_class = true;
                    self.pos += 1;
                }
                Some(']') => {
                    in_class = false;
                    self.pos += 1;
                }
                Some('/') if !in_class => {
                    self.pos += 1;
                    break;
                }
                Some(_) => self.pos += 1,
            }
        }
        self.eat_while(is_ident_continue);
        Ok(())
    }

    fn scan_punct(&mut self) {
        for p in PUNCTUATORS {
            if self.starts_with(p) {
                self.pos += p.chars().count();
                return;
            }
        }
        self.pos += 1;
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn significant(src: &str) -> Vec<(TokenKind, String)> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .filter(|t| !t.is_trivia())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_round_trip_is_exact() {
        let src = "/* generated */\nexport type A = {\n    // note\n    a?: 'x' | \"y\";\n};\n";
        let joined: String = tokenize(src).unwrap().into_iter().map(|t| t.text).collect();
        assert_eq!(joined, src);
    }

    #[test]
    fn test_braces_inside_literals_are_opaque() {
        let tokens = significant("const a = '{'; const b = `x${ {a: 1}.a }}`; // }\n");
        let braces = tokens
            .iter()
            .filter(|(kind, text)| *kind == TokenKind::Punct && (text == "{" || text == "}"))
            .count();
        assert_eq!(braces, 0);
        assert!(tokens.iter().any(|(kind, _)| *kind == TokenKind::Template));
    }

    #[test]
    fn test_regex_versus_division() {
        let tokens = significant("const p = path.replace(/{(.*?)}/g, x); const q = a / b / c;");
        assert!(tokens.contains(&(TokenKind::Regex, "/{(.*?)}/g".to_string())));
        assert_eq!(
            tokens
                .iter()
                .filter(|(kind, text)| *kind == TokenKind::Punct && text == "/")
                .count(),
            2
        );
    }

    #[test]
    fn test_multi_char_punctuators() {
        let tokens = significant("a?.b ?? c || d => e !== f");
        let puncts: Vec<_> = tokens
            .into_iter()
            .filter(|(kind, _)| *kind == TokenKind::Punct)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(puncts, vec!["?.", "??", "||", "=>", "!=="]);
    }

    #[test]
    fn test_private_names_and_numbers() {
        let tokens = significant("this.#isResolved = items[0].length + 1.5;");
        assert!(tokens.contains(&(TokenKind::Ident, "#isResolved".to_string())));
        assert!(tokens.contains(&(TokenKind::Number, "0".to_string())));
        assert!(tokens.contains(&(TokenKind::Ident, "length".to_string())));
        assert!(tokens.contains(&(TokenKind::Number, "1.5".to_string())));
    }

    #[test]
    fn test_string_values() {
        let tokens = tokenize(r"'it\'s' ").unwrap();
        assert_eq!(tokens[0].string_value().as_deref(), Some("it's"));

        let mut token = Token::string_literal("../models/Link", '\'');
        assert_eq!(token.text, "'../models/Link'");
        token.set_string_value("../../common/models/Link");
        assert_eq!(token.text, "'../../common/models/Link'");
    }

    #[test]
    fn test_unterminated_literals_fail() {
        assert!(tokenize("const a = 'open").is_err());
        assert!(tokenize("/* open").is_err());
        assert!(tokenize("const t = `a${b").is_err());
    }

    #[test]
    fn test_normalize_ignores_formatting() {
        let a = normalize("/* v1 */\nexport type Link = {\n    href?: string;\n};\n").unwrap();
        let b = normalize("export type Link = { // link\n  href?: string;\n};").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "export type Link = { href?: string; };");
    }
}
