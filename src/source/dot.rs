//! Reader for the subset of the DOT language that `rqt_graph` and similar
//! tools emit. Statements are flattened: subgraphs contribute their nodes and
//! edges to the top-level graph, default attribute statements are dropped.

use super::SourceError;
use crate::graph::Graph;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Identifier; quoted strings keep their quotes.
    Id(String),
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Equal,
    Comma,
    Semicolon,
    Colon,
    Arrow,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    input: &'a str,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.char_indices().peekable(),
            input,
            line: 1,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let (_, ch) = self.chars.next()?;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn error(&self, message: impl Into<String>) -> SourceError {
        SourceError::Dot {
            line: self.line,
            message: message.into(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, SourceError> {
        let mut tokens = Vec::new();
        let mut at_line_start = true;
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                self.bump();
                at_line_start = true;
                continue;
            }
            if ch.is_whitespace() {
                self.bump();
                continue;
            }
            // '#' lines are C preprocessor output
            if ch == '#' && at_line_start {
                self.skip_line();
                continue;
            }
            at_line_start = false;
            let line = self.line;
            let token = match ch {
                '{' => self.single(Token::OpenBrace),
                '}' => self.single(Token::CloseBrace),
                '[' => self.single(Token::OpenBracket),
                ']' => self.single(Token::CloseBracket),
                '=' => self.single(Token::Equal),
                ',' => self.single(Token::Comma),
                ';' => self.single(Token::Semicolon),
                ':' => self.single(Token::Colon),
                '"' => self.quoted()?,
                '<' => self.html()?,
                '/' => {
                    self.bump();
                    match self.peek() {
                        Some('/') => {
                            self.skip_line();
                            continue;
                        }
                        Some('*') => {
                            self.skip_block_comment()?;
                            continue;
                        }
                        _ => self.bare(Some('/')),
                    }
                }
                '-' => {
                    self.bump();
                    match self.peek() {
                        Some('>') | Some('-') => {
                            self.bump();
                            Token::Arrow
                        }
                        _ => self.bare(Some('-')),
                    }
                }
                _ if is_id_char(ch) => self.bare(None),
                _ => return Err(self.error(format!("unexpected character '{ch}'"))),
            };
            tokens.push((token, line));
        }
        Ok(tokens)
    }

    fn single(&mut self, token: Token) -> Token {
        self.bump();
        token
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), SourceError> {
        self.bump();
        let mut prev = '\0';
        while let Some(ch) = self.bump() {
            if prev == '*' && ch == '/' {
                return Ok(());
            }
            prev = ch;
        }
        Err(self.error("unterminated comment"))
    }

    fn bare(&mut self, prefix: Option<char>) -> Token {
        let mut id = String::new();
        if let Some(ch) = prefix {
            id.push(ch);
        }
        while let Some(&(idx, ch)) = self.chars.peek() {
            if !is_id_char(ch) {
                break;
            }
            let rest = &self.input[idx..];
            if rest.starts_with("->") || rest.starts_with("--") {
                break;
            }
            id.push(ch);
            self.bump();
        }
        Token::Id(id)
    }

    fn quoted(&mut self) -> Result<Token, SourceError> {
        let start = self.line;
        let mut id = String::from('"');
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    if let Some(next) = self.bump() {
                        // line continuation
                        if next != '\n' {
                            id.push('\\');
                            id.push(next);
                        }
                    }
                }
                Some('"') => break,
                Some(ch) => id.push(ch),
                None => {
                    return Err(SourceError::Dot {
                        line: start,
                        message: "unterminated string".to_string(),
                    });
                }
            }
        }
        id.push('"');
        Ok(Token::Id(id))
    }

    fn html(&mut self) -> Result<Token, SourceError> {
        let mut depth = 0usize;
        let mut id = String::new();
        while let Some(ch) = self.bump() {
            id.push(ch);
            match ch {
                '<' => depth += 1,
                '>' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(Token::Id(id));
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unterminated HTML string"))
    }
}

fn is_id_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '.' | '/' | '-')
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    graph: Graph,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, line)| *line)
            .unwrap_or(1)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        self.pos += 1;
        token
    }

    fn error(&self, message: impl Into<String>) -> SourceError {
        error_at(self.line(), message)
    }

    fn expect(&mut self, expected: Token) -> Result<(), SourceError> {
        let line = self.line();
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(error_at(line, format!("expected {expected:?}, found {token:?}"))),
            None => Err(error_at(line, format!("expected {expected:?}, found end of input"))),
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn keyword(&self, word: &str) -> bool {
        matches!(self.peek(), Some(Token::Id(id)) if id.eq_ignore_ascii_case(word))
    }

    fn parse_graph(&mut self) -> Result<(), SourceError> {
        if self.keyword("strict") {
            self.pos += 1;
        }
        if !self.keyword("digraph") && !self.keyword("graph") {
            return Err(self.error("expected `digraph` or `graph`"));
        }
        self.pos += 1;
        if let Some(Token::Id(_)) = self.peek() {
            self.pos += 1;
        }
        self.expect(Token::OpenBrace)?;
        self.parse_statements()?;
        if self.peek().is_some() {
            return Err(self.error("trailing input after graph"));
        }
        Ok(())
    }

    /// Parses statements up to and including the closing brace. Returns the
    /// node ids the statements declare, in first-seen order.
    fn parse_statements(&mut self) -> Result<Vec<String>, SourceError> {
        let mut declared: Vec<String> = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.error("missing closing brace")),
                Some(Token::CloseBrace) => {
                    self.pos += 1;
                    return Ok(declared);
                }
                Some(Token::Semicolon) => {
                    self.pos += 1;
                }
                _ => {
                    for id in self.parse_statement()? {
                        if !declared.contains(&id) {
                            declared.push(id);
                        }
                    }
                }
            }
        }
    }

    /// Parses one statement and returns the node ids it declares. Attribute
    /// statements and `key = value` declare none.
    fn parse_statement(&mut self) -> Result<Vec<String>, SourceError> {
        if self.keyword("graph") || self.keyword("node") || self.keyword("edge") {
            self.pos += 1;
            if self.peek() == Some(&Token::OpenBracket) {
                self.parse_attributes()?;
                return Ok(Vec::new());
            }
            self.pos -= 1;
        }

        let mut chain = vec![self.parse_endpoint()?];
        if self.eat(&Token::Equal) {
            // top-level `key = value`
            self.next_id()?;
            return Ok(Vec::new());
        }
        while self.eat(&Token::Arrow) {
            chain.push(self.parse_endpoint()?);
        }
        let attributes = if self.peek() == Some(&Token::OpenBracket) {
            self.parse_attributes()?
        } else {
            Vec::new()
        };

        if chain.len() == 1 {
            for id in &chain[0] {
                self.graph.ensure_node(id);
            }
        } else {
            let label = attributes
                .iter()
                .find(|(key, _)| key == "label")
                .map(|(_, value)| unquote(value));
            for pair in chain.windows(2) {
                for from in &pair[0] {
                    for to in &pair[1] {
                        self.graph.add_edge(from, to, label.clone());
                    }
                }
            }
        }
        Ok(chain.into_iter().flatten().collect())
    }

    /// A node id (ports dropped) or a subgraph; returns the node ids it names.
    fn parse_endpoint(&mut self) -> Result<Vec<String>, SourceError> {
        if self.keyword("subgraph") || self.peek() == Some(&Token::OpenBrace) {
            return self.parse_subgraph();
        }
        let id = self.next_id()?;
        while self.eat(&Token::Colon) {
            self.next_id()?;
        }
        Ok(vec![id])
    }

    fn parse_subgraph(&mut self) -> Result<Vec<String>, SourceError> {
        if self.keyword("subgraph") {
            self.pos += 1;
            if let Some(Token::Id(_)) = self.peek() {
                self.pos += 1;
            }
        }
        self.expect(Token::OpenBrace)?;
        self.parse_statements()
    }

    fn parse_attributes(&mut self) -> Result<Vec<(String, String)>, SourceError> {
        let mut attributes = Vec::new();
        while self.eat(&Token::OpenBracket) {
            loop {
                if self.eat(&Token::CloseBracket) {
                    break;
                }
                if self.eat(&Token::Comma) || self.eat(&Token::Semicolon) {
                    continue;
                }
                let key = self.next_id()?;
                let value = if self.eat(&Token::Equal) {
                    self.next_id()?
                } else {
                    "true".to_string()
                };
                attributes.push((key, value));
            }
        }
        Ok(attributes)
    }

    fn next_id(&mut self) -> Result<String, SourceError> {
        let line = self.line();
        match self.next() {
            Some(Token::Id(id)) => Ok(id),
            Some(token) => Err(error_at(line, format!("expected identifier, found {token:?}"))),
            None => Err(error_at(line, "expected identifier, found end of input")),
        }
    }
}

fn error_at(line: usize, message: impl Into<String>) -> SourceError {
    SourceError::Dot {
        line,
        message: message.into(),
    }
}

fn unquote(value: &str) -> String {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
        .to_string()
}

/// Parses DOT source into a graph. Quoted node names keep their quotes
/// (`"/node_src"`), bare names are taken verbatim.
pub fn parse_dot(input: &str) -> Result<Graph, SourceError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        graph: Graph::new(),
    };
    parser.parse_graph()?;
    Ok(parser.graph)
}
