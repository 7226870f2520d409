use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::Authorizations;
use crate::error::{GraphError, Result};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Node {
    Label(String),
    Not(Box<Node>),
    And(Vec<Node>),
    Or(Vec<Node>),
}

impl Node {
    fn evaluate(&self, auths: &Authorizations) -> bool {
        match self {
            Node::Label(label) => auths.contains(label),
            Node::Not(inner) => !inner.evaluate(auths),
            Node::And(terms) => terms.iter().all(|t| t.evaluate(auths)),
            Node::Or(terms) => terms.iter().any(|t| t.evaluate(auths)),
        }
    }

    fn collect_labels<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Label(label) => out.push(label),
            Node::Not(inner) => inner.collect_labels(out),
            Node::And(terms) | Node::Or(terms) => {
                for term in terms {
                    term.collect_labels(out);
                }
            }
        }
    }
}

/// Boolean label expression gating read access to an element, property,
/// metadata entry or extended-data cell.
///
/// Grammar: unquoted labels made of `[A-Za-z0-9_-:./]`, double-quoted labels
/// (with `\"` and `\\` escapes), `&`, `|`, prefix `!`, and parentheses. `&` and
/// `|` may not be mixed at one nesting level without parentheses. The empty
/// expression is public and readable by everyone.
///
/// The expression is parsed once at construction; [`Visibility::evaluate`] runs
/// against the caller's authorizations on every call.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Visibility {
    source: Arc<str>,
    root: Option<Arc<Node>>,
}

impl Visibility {
    /// Parses a visibility expression.
    pub fn new(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }
        let root = Parser::new(trimmed)
            .parse()
            .map_err(|reason| GraphError::InvalidVisibility {
                expression: expression.to_owned(),
                reason,
            })?;
        Ok(Self {
            source: Arc::from(trimmed),
            root: Some(Arc::new(root)),
        })
    }

    /// The public visibility.
    pub fn empty() -> Self {
        Self {
            source: Arc::from(""),
            root: None,
        }
    }

    /// Returns `true` for the public visibility.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Source text of the expression.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates the expression against a caller's labels.
    pub fn evaluate(&self, auths: &Authorizations) -> bool {
        match &self.root {
            None => true,
            Some(root) => root.evaluate(auths),
        }
    }

    /// Every label referenced by the expression, in source order.
    pub fn labels(&self) -> Vec<&str> {
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            root.collect_labels(&mut out);
        }
        out
    }

    /// Conjunction of two visibilities.
    pub fn and(&self, other: &Visibility) -> Visibility {
        match (&self.root, &other.root) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some(a), Some(b)) => {
                if self.source == other.source {
                    return self.clone();
                }
                Visibility {
                    source: Arc::from(format!("({})&({})", self.source, other.source)),
                    root: Some(Arc::new(Node::And(vec![
                        a.as_ref().clone(),
                        b.as_ref().clone(),
                    ]))),
                }
            }
        }
    }
}

impl Default for Visibility {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Visibility {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Visibility {}

impl Hash for Visibility {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl PartialOrd for Visibility {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visibility {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source.as_bytes().cmp(other.source.as_bytes())
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl fmt::Debug for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Visibility({:?})", &*self.source)
    }
}

impl TryFrom<String> for Visibility {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self> {
        Visibility::new(&value)
    }
}

impl TryFrom<&str> for Visibility {
    type Error = GraphError;

    fn try_from(value: &str) -> Result<Self> {
        Visibility::new(value)
    }
}

impl From<Visibility> for String {
    fn from(value: Visibility) -> Self {
        value.source.to_string()
    }
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | '/')
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(src: &str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> std::result::Result<Node, String> {
        let node = self.parse_expr()?;
        self.skip_ws();
        if let Some(c) = self.peek() {
            return Err(format!("unexpected '{c}' at offset {}", self.pos));
        }
        Ok(node)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_expr(&mut self) -> std::result::Result<Node, String> {
        let mut terms = vec![self.parse_term()?];
        let mut op: Option<char> = None;
        loop {
            self.skip_ws();
            let c = match self.peek() {
                Some(c @ ('&' | '|')) => c,
                _ => break,
            };
            if let Some(prev) = op {
                if prev != c {
                    return Err(format!(
                        "cannot mix '&' and '|' without parentheses at offset {}",
                        self.pos
                    ));
                }
            }
            op = Some(c);
            self.pos += 1;
            terms.push(self.parse_term()?);
        }
        Ok(match op {
            None => terms.pop().ok_or_else(|| "empty expression".to_string())?,
            Some('&') => Node::And(terms),
            Some(_) => Node::Or(terms),
        })
    }

    fn parse_term(&mut self) -> std::result::Result<Node, String> {
        self.skip_ws();
        match self.peek() {
            None => Err("unexpected end of expression".into()),
            Some('(') => {
                self.pos += 1;
                self.skip_ws();
                if self.peek() == Some(')') {
                    return Err(format!("empty parentheses at offset {}", self.pos));
                }
                let inner = self.parse_expr()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(format!("expected ')' at offset {}", self.pos));
                }
                self.pos += 1;
                Ok(inner)
            }
            Some('!') => {
                self.pos += 1;
                Ok(Node::Not(Box::new(self.parse_term()?)))
            }
            Some('"') => self.parse_quoted(),
            Some(c) if is_label_char(c) => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if is_label_char(c)) {
                    self.pos += 1;
                }
                Ok(Node::Label(self.chars[start..self.pos].iter().collect()))
            }
            Some(c) => Err(format!("unexpected '{c}' at offset {}", self.pos)),
        }
    }

    fn parse_quoted(&mut self) -> std::result::Result<Node, String> {
        let open = self.pos;
        self.pos += 1;
        let mut label = String::new();
        loop {
            match self.peek() {
                None => return Err(format!("unterminated quote starting at offset {open}")),
                Some('"') => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    self.pos += 1;
                    match self.peek() {
                        Some(c @ ('"' | '\\')) => {
                            label.push(c);
                            self.pos += 1;
                        }
                        _ => return Err(format!("invalid escape at offset {}", self.pos)),
                    }
                }
                Some(c) => {
                    label.push(c);
                    self.pos += 1;
                }
            }
        }
        if label.is_empty() {
            return Err(format!("empty quoted label at offset {open}"));
        }
        Ok(Node::Label(label))
    }
}
