//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Dap4.
//! The Dap4 project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Constraint Expression Parser
//!
//! Recursive-descent parser over the token stream produced by
//! [`super::lexer::tokenize`]:
//!
//! ```text
//! constraint := (NAME '=' slice ';')* clause (',' clause)*
//! clause     := segtree ('|' filter)?
//! segtree    := segment ('.' segtree | '.'? '{' segtree (',' segtree)* '}')?
//! segment    := NAME slice*
//! filter     := unary (',' unary)*
//! unary      := '!' unary | predicate
//! predicate  := primary relop primary relop primary
//!             | primary (relop | eqop) primary
//! primary    := NAME ('.' NAME)* | STRING | LONG | DOUBLE | BOOLEAN | '(' filter ')'
//! ```
//!
//! A `,` after a filter continues the conjunction only when a predicate
//! follows it; otherwise it separates clauses.

use crate::ce::ast::{
    Clause, Constant, Constraint, DimRedef, Filter, Operator, Primary, Segment, SegmentTree, Slice,
};
use crate::ce::lexer::{tokenize, Token, TokenKind};
use crate::errors::{DapError, Result};

/// Parse a constraint expression. Blank input yields an empty constraint,
/// which selects the whole dataset.
pub fn parse_ce(text: &str) -> Result<Constraint> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Ok(Constraint::default());
    }
    let mut parser = CeParser {
        tokens,
        pos: 0,
        end: text.len(),
    };
    let constraint = parser.constraint()?;
    log::debug!(
        "parsed constraint with {} clause(s) and {} dimension redefinition(s)",
        constraint.clauses.len(),
        constraint.dim_redefs.len()
    );
    Ok(constraint)
}

struct CeParser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
}

impl CeParser {
    fn peek(&self) -> Option<&TokenKind> {
        self.peek_at(self.pos)
    }

    fn peek_at(&self, index: usize) -> Option<&TokenKind> {
        self.tokens.get(index).map(|t| &t.kind)
    }

    fn offset(&self) -> usize {
        self.tokens.get(self.pos).map(|t| t.offset).unwrap_or(self.end)
    }

    fn error(&self, message: impl Into<String>) -> DapError {
        DapError::grammar(message, format!("offset {}", self.offset()))
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<()> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_name(&mut self) -> Result<String> {
        match self.peek() {
            Some(TokenKind::Name(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error("expected a name")),
        }
    }

    fn expect_index(&mut self) -> Result<u64> {
        match self.peek() {
            Some(TokenKind::Long(n)) if *n >= 0 => {
                let n = *n as u64;
                self.pos += 1;
                Ok(n)
            }
            Some(TokenKind::Long(_)) => Err(self.error("slice index must not be negative")),
            _ => Err(self.error("expected an integer")),
        }
    }

    fn constraint(&mut self) -> Result<Constraint> {
        let mut constraint = Constraint::default();
        while self.dim_redef_follows() {
            let name = self.expect_name()?;
            self.expect(TokenKind::Eq, "'='")?;
            let slice = self.slice()?;
            self.expect(TokenKind::Semi, "';'")?;
            constraint.dim_redefs.push(DimRedef { name, slice });
        }
        constraint.clauses.push(self.clause()?);
        while self.eat(&TokenKind::Comma) {
            constraint.clauses.push(self.clause()?);
        }
        if self.peek().is_some() {
            return Err(self.error("unexpected trailing input"));
        }
        Ok(constraint)
    }

    fn dim_redef_follows(&self) -> bool {
        matches!(
            (self.peek_at(self.pos), self.peek_at(self.pos + 1), self.peek_at(self.pos + 2)),
            (Some(TokenKind::Name(_)), Some(TokenKind::Eq), Some(TokenKind::LBracket))
        )
    }

    fn clause(&mut self) -> Result<Clause> {
        let projection = self.segment_tree()?;
        let filter = if self.eat(&TokenKind::Pipe) {
            Some(self.filter()?)
        } else {
            None
        };
        Ok(Clause { projection, filter })
    }

    fn segment_tree(&mut self) -> Result<SegmentTree> {
        let segment = self.segment()?;
        let mut tree = SegmentTree::leaf(segment);
        if self.eat(&TokenKind::Dot) {
            if self.peek() == Some(&TokenKind::LBrace) {
                tree.children = self.forest()?;
            } else {
                tree.children.push(self.segment_tree()?);
            }
        } else if self.peek() == Some(&TokenKind::LBrace) {
            tree.children = self.forest()?;
        }
        Ok(tree)
    }

    fn forest(&mut self) -> Result<Vec<SegmentTree>> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut trees = vec![self.segment_tree()?];
        while self.eat(&TokenKind::Comma) {
            trees.push(self.segment_tree()?);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(trees)
    }

    fn segment(&mut self) -> Result<Segment> {
        let mut segment = Segment::new(self.expect_name()?);
        while self.peek() == Some(&TokenKind::LBracket) {
            segment.slices.push(self.slice()?);
        }
        Ok(segment)
    }

    fn slice(&mut self) -> Result<Slice> {
        self.expect(TokenKind::LBracket, "'['")?;
        if self.eat(&TokenKind::RBracket) {
            return Ok(Slice::Whole);
        }
        if self.eat(&TokenKind::Star) {
            let count = if self.eat(&TokenKind::Semi) {
                Some(self.expect_index()?)
            } else {
                None
            };
            self.expect(TokenKind::RBracket, "']'")?;
            return Ok(Slice::VarLength { count });
        }
        let start = self.expect_index()?;
        if self.eat(&TokenKind::RBracket) {
            return Ok(Slice::Index(start));
        }
        self.expect(TokenKind::Colon, "':' or ']'")?;
        let second = match self.open_bound()? {
            None => {
                return Ok(Slice::Range {
                    start,
                    stride: 1,
                    stop: None,
                })
            }
            Some(second) => second,
        };
        if self.eat(&TokenKind::RBracket) {
            return Ok(Slice::range(start, 1, second));
        }
        self.expect(TokenKind::Colon, "':' or ']'")?;
        let stop = self.open_bound()?;
        if stop.is_some() {
            self.expect(TokenKind::RBracket, "']'")?;
        }
        Ok(Slice::Range {
            start,
            stride: second,
            stop,
        })
    }

    /// After a `:`, either an index or an open end (`]` or `*]`). An open
    /// end consumes the closing bracket.
    fn open_bound(&mut self) -> Result<Option<u64>> {
        if self.eat(&TokenKind::RBracket) {
            return Ok(None);
        }
        if self.eat(&TokenKind::Star) {
            self.expect(TokenKind::RBracket, "']'")?;
            return Ok(None);
        }
        self.expect_index().map(Some)
    }

    fn filter(&mut self) -> Result<Filter> {
        let mut terms = vec![self.unary()?];
        while self.peek() == Some(&TokenKind::Comma) && self.predicate_follows(self.pos + 1) {
            self.pos += 1;
            terms.push(self.unary()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Filter::And(terms)
        })
    }

    fn predicate_follows(&self, index: usize) -> bool {
        match self.peek_at(index) {
            Some(TokenKind::Bang)
            | Some(TokenKind::LParen)
            | Some(TokenKind::Str(_))
            | Some(TokenKind::Long(_))
            | Some(TokenKind::Double(_)) => true,
            Some(TokenKind::Name(_)) => {
                let mut j = index + 1;
                while self.peek_at(j) == Some(&TokenKind::Dot)
                    && matches!(self.peek_at(j + 1), Some(TokenKind::Name(_)))
                {
                    j += 2;
                }
                self.peek_at(j).and_then(operator_of).is_some()
            }
            _ => false,
        }
    }

    fn unary(&mut self) -> Result<Filter> {
        if self.eat(&TokenKind::Bang) {
            return Ok(Filter::Not(Box::new(self.unary()?)));
        }
        self.predicate()
    }

    fn predicate(&mut self) -> Result<Filter> {
        let lhs = self.primary()?;
        let Some(op) = self.peek().and_then(operator_of) else {
            // A parenthesized filter stands on its own.
            return match lhs {
                Primary::Nested(inner) => Ok(*inner),
                _ => Err(self.error("expected a comparison operator")),
            };
        };
        self.pos += 1;
        let mid = self.primary()?;
        if is_relop(op) {
            if let Some(op2) = self.peek().and_then(operator_of).filter(|o| is_relop(*o)) {
                self.pos += 1;
                let rhs = self.primary()?;
                return Ok(Filter::Range {
                    op1: op,
                    op2,
                    lhs,
                    mid,
                    rhs,
                });
            }
        }
        Ok(Filter::Compare { op, lhs, rhs: mid })
    }

    fn primary(&mut self) -> Result<Primary> {
        let Some(token) = self.advance() else {
            return Err(self.error("unexpected end of constraint"));
        };
        match token {
            TokenKind::Name(name) => {
                if name.eq_ignore_ascii_case("true") {
                    return Ok(Primary::Constant(Constant::Boolean(true)));
                }
                if name.eq_ignore_ascii_case("false") {
                    return Ok(Primary::Constant(Constant::Boolean(false)));
                }
                let mut path = name;
                while self.peek() == Some(&TokenKind::Dot)
                    && matches!(self.peek_at(self.pos + 1), Some(TokenKind::Name(_)))
                {
                    self.pos += 1;
                    path.push('.');
                    path.push_str(&self.expect_name()?);
                }
                Ok(Primary::Field(path))
            }
            TokenKind::Str(s) => Ok(Primary::Constant(Constant::String(s))),
            TokenKind::Long(n) => Ok(Primary::Constant(Constant::Long(n))),
            TokenKind::Double(d) => Ok(Primary::Constant(Constant::Double(d))),
            TokenKind::LParen => {
                let inner = self.filter()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(Primary::Nested(Box::new(inner)))
            }
            _ => {
                self.pos -= 1;
                Err(self.error("expected a field name or constant"))
            }
        }
    }
}

fn operator_of(kind: &TokenKind) -> Option<Operator> {
    match kind {
        TokenKind::Lt => Some(Operator::Lt),
        TokenKind::Le => Some(Operator::Le),
        TokenKind::Gt => Some(Operator::Gt),
        TokenKind::Ge => Some(Operator::Ge),
        TokenKind::Eq | TokenKind::EqEq => Some(Operator::Eq),
        TokenKind::Ne => Some(Operator::Ne),
        TokenKind::Match => Some(Operator::Match),
        _ => None,
    }
}

fn is_relop(op: Operator) -> bool {
    matches!(op, Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge)
}
