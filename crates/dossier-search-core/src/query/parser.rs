//! Boolean query grammar
//!
//! ```text
//! Expr    := OrExpr
//! OrExpr  := AndExpr (OR AndExpr)*
//! AndExpr := NotExpr (AND? NotExpr)*
//! NotExpr := NOT? Atom
//! Atom    := Term | '(' Expr ')'
//! ```
//!
//! Operators are recognised only in upper case. Adjacent atoms without an
//! operator are joined with an implicit AND, which binds tighter than OR and
//! associates to the left: `a b OR c` is `Or(And(a, b), c)`.

use std::fmt;

use super::QueryError;
use super::normalize::fold_case;

// ============================================================================
// EXPRESSION TREE
// ============================================================================

/// Parsed Boolean expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BooleanExpr {
    /// A word or quoted phrase, case-folded
    Term(String),
    And(Box<BooleanExpr>, Box<BooleanExpr>),
    Or(Box<BooleanExpr>, Box<BooleanExpr>),
    Not(Box<BooleanExpr>),
}

impl BooleanExpr {
    pub fn term(text: impl Into<String>) -> Self {
        BooleanExpr::Term(text.into())
    }

    pub fn and(left: BooleanExpr, right: BooleanExpr) -> Self {
        BooleanExpr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: BooleanExpr, right: BooleanExpr) -> Self {
        BooleanExpr::Or(Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(inner: BooleanExpr) -> Self {
        BooleanExpr::Not(Box::new(inner))
    }

    /// Every term in the tree, left to right
    pub fn terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_terms(false, &mut |term, _| out.push(term));
        out
    }

    /// Terms that are not under an odd number of NOTs.
    ///
    /// These are the terms a matching document can contain; negated terms
    /// only exclude.
    pub fn positive_terms(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_terms(false, &mut |term, negated| {
            if !negated {
                out.push(term);
            }
        });
        out
    }

    /// Whether every match must contain at least one positive term.
    ///
    /// False when a negation can satisfy the expression on its own, as in
    /// `NOT a` or `a OR NOT b`.
    pub fn requires_term_match(&self) -> bool {
        match self {
            BooleanExpr::Term(_) => true,
            BooleanExpr::And(l, r) => l.requires_term_match() || r.requires_term_match(),
            BooleanExpr::Or(l, r) => l.requires_term_match() && r.requires_term_match(),
            BooleanExpr::Not(_) => false,
        }
    }

    fn collect_terms<'a>(&'a self, negated: bool, f: &mut impl FnMut(&'a str, bool)) {
        match self {
            BooleanExpr::Term(t) => f(t, negated),
            BooleanExpr::And(l, r) | BooleanExpr::Or(l, r) => {
                l.collect_terms(negated, f);
                r.collect_terms(negated, f);
            }
            BooleanExpr::Not(inner) => inner.collect_terms(!negated, f),
        }
    }

    /// Evaluate with a term predicate
    pub fn evaluate<F>(&self, matches: &F) -> bool
    where
        F: Fn(&str) -> bool,
    {
        match self {
            BooleanExpr::Term(t) => matches(t),
            BooleanExpr::And(l, r) => l.evaluate(matches) && r.evaluate(matches),
            BooleanExpr::Or(l, r) => l.evaluate(matches) || r.evaluate(matches),
            BooleanExpr::Not(inner) => !inner.evaluate(matches),
        }
    }
}

impl fmt::Display for BooleanExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BooleanExpr::Term(t) if t.contains(' ') => write!(f, "\"{}\"", t),
            BooleanExpr::Term(t) => write!(f, "{}", t),
            BooleanExpr::And(l, r) => write!(f, "({} AND {})", l, r),
            BooleanExpr::Or(l, r) => write!(f, "({} OR {})", l, r),
            BooleanExpr::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

// ============================================================================
// TOKENIZER
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    And,
    Or,
    Not,
    LParen,
    RParen,
    Term(String),
}

#[derive(Debug, Clone)]
struct Spanned {
    token: Token,
    /// Character offset into the normalized query
    position: usize,
}

/// Split normalized (case-preserved) text into tokens.
///
/// An unterminated quote runs to the end of the input.
fn tokenize(text: &str) -> Vec<Spanned> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Spanned { token: Token::LParen, position: i });
            i += 1;
        } else if c == ')' {
            tokens.push(Spanned { token: Token::RParen, position: i });
            i += 1;
        } else if c == '"' {
            let start = i;
            i += 1;
            let body_start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            let phrase: String = chars[body_start..i].iter().collect();
            // Skip the closing quote if present
            i = (i + 1).min(chars.len());
            let phrase = phrase.trim();
            if !phrase.is_empty() {
                tokens.push(Spanned {
                    token: Token::Term(fold_case(phrase)),
                    position: start,
                });
            }
        } else {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '(' | ')' | '"')
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let token = match word.as_str() {
                "AND" => Token::And,
                "OR" => Token::Or,
                "NOT" => Token::Not,
                _ => Token::Term(fold_case(&word)),
            };
            tokens.push(Spanned { token, position: start });
        }
    }

    tokens
}

/// True iff the text contains an unquoted, upper-case `AND`, `OR` or `NOT`
pub fn has_boolean_operators(text: &str) -> bool {
    tokenize(text)
        .iter()
        .any(|t| matches!(t.token, Token::And | Token::Or | Token::Not))
}

// ============================================================================
// PARSER
// ============================================================================

/// Parse normalized (case-preserved) text into an expression tree
pub fn parse_expression(text: &str) -> Result<BooleanExpr, QueryError> {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return Err(QueryError::EmptyQuery);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: text.chars().count(),
    };
    let expr = parser.parse_or()?;

    if let Some(extra) = parser.peek() {
        let message = match extra.token {
            Token::RParen => "unmatched closing parenthesis",
            _ => "unexpected token",
        };
        return Err(QueryError::syntax(extra.position, message));
    }

    Ok(expr)
}

/// Implicit-AND chain of words with no operator or grouping syntax.
///
/// Used by the typeahead path, where `OR` or a stray parenthesis is just text.
pub fn parse_plain(text: &str) -> Result<BooleanExpr, QueryError> {
    text.split_whitespace()
        .map(|w| BooleanExpr::term(fold_case(w)))
        .reduce(BooleanExpr::and)
        .ok_or(QueryError::EmptyQuery)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Position reported for errors at end of input
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<BooleanExpr, QueryError> {
        let mut left = self.parse_and()?;
        while matches!(self.peek(), Some(Spanned { token: Token::Or, .. })) {
            self.advance();
            let right = self.parse_and()?;
            left = BooleanExpr::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<BooleanExpr, QueryError> {
        let mut left = self.parse_not()?;
        loop {
            match self.peek().map(|t| &t.token) {
                Some(Token::And) => {
                    self.advance();
                }
                // Implicit AND
                Some(Token::Term(_) | Token::Not | Token::LParen) => {}
                _ => break,
            }
            let right = self.parse_not()?;
            left = BooleanExpr::and(left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<BooleanExpr, QueryError> {
        if matches!(self.peek(), Some(Spanned { token: Token::Not, .. })) {
            self.advance();
            let inner = self.parse_atom()?;
            return Ok(BooleanExpr::not(inner));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<BooleanExpr, QueryError> {
        let Some(next) = self.advance() else {
            return Err(QueryError::syntax(self.end, "expected a term at end of query"));
        };

        match next.token {
            Token::Term(text) => Ok(BooleanExpr::Term(text)),
            Token::LParen => {
                if matches!(self.peek(), Some(Spanned { token: Token::RParen, .. })) {
                    return Err(QueryError::syntax(next.position, "empty parentheses"));
                }
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Spanned { token: Token::RParen, .. }) => Ok(inner),
                    _ => Err(QueryError::syntax(next.position, "unclosed parenthesis")),
                }
            }
            Token::RParen => Err(QueryError::syntax(
                next.position,
                "unmatched closing parenthesis",
            )),
            Token::And | Token::Or | Token::Not => Err(QueryError::syntax(
                next.position,
                "expected a term before operator",
            )),
        }
    }
}
