//! Front end for the ground fragment of the rule language
//!
//! Only ground programs are accepted: variables are reported as errors, since
//! instantiation is the job of an upstream grounder. Errors carry the line,
//! column and the offending fragment of the source.

mod lexer;

use crate::ast::{GroundAtom, Head, Literal, Program, Rule, Term};
use crate::error::ExplainError;
use crate::Result;
use lexer::{LexError, Lexer, Spanned, Token};

const FRAGMENT_LEN: usize = 32;

/// Parses a ground program
pub fn parse_program(source: &str) -> Result<Program> {
    let mut parser = Parser::new(source)?;
    let mut program = Program::default();
    while parser.current() != &Token::Eof {
        program.push(parser.parse_rule()?);
    }
    Ok(program)
}

/// Parses a single ground atom; a trailing `.` is accepted
pub fn parse_atom(source: &str) -> Result<GroundAtom> {
    let mut parser = Parser::new(source)?;
    let atom = parser.parse_atom()?;
    parser.skip_if(&Token::Dot);
    parser.expect(Token::Eof)?;
    Ok(atom)
}

/// Parses an answer-set entry: `atom` is true, `~atom` is false
pub fn parse_answer_literal(source: &str) -> Result<(GroundAtom, bool)> {
    let mut parser = Parser::new(source)?;
    let value = !parser.skip_if(&Token::Tilde);
    let atom = parser.parse_atom()?;
    parser.skip_if(&Token::Dot);
    parser.expect(Token::Eof)?;
    Ok((atom, value))
}

/// Parses a whitespace- or fact-separated listing of answer-set entries
///
/// Accepts both `a b ~c` and `a. b. ~c.`.
pub fn parse_answer_listing(source: &str) -> Result<Vec<(GroundAtom, bool)>> {
    let mut parser = Parser::new(source)?;
    let mut entries = Vec::new();
    while parser.current() != &Token::Eof {
        let value = !parser.skip_if(&Token::Tilde);
        let atom = parser.parse_atom()?;
        parser.skip_if(&Token::Dot);
        entries.push((atom, value));
    }
    Ok(entries)
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Spanned>,
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self> {
        let tokens = Lexer::new(source)
            .tokenize()
            .map_err(|e| lex_error(source, e))?;
        Ok(Self {
            source,
            tokens,
            position: 0,
        })
    }

    fn current(&self) -> &Token {
        &self.spanned().token
    }

    fn spanned(&self) -> &Spanned {
        // tokenize() always ends with Eof, and advance() never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        let next = (self.position + 1).min(self.tokens.len() - 1);
        &self.tokens[next].token
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token != Token::Eof {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.current() == &expected {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}, found {:?}", expected, self.current())))
        }
    }

    fn skip_if(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, message: String) -> ExplainError {
        let spanned = self.spanned();
        ExplainError::Parse {
            line: spanned.line,
            column: spanned.column,
            fragment: fragment_at(self.source, spanned.offset),
            message,
        }
    }

    fn parse_rule(&mut self) -> Result<Rule> {
        let head = if self.current() == &Token::If {
            Head::empty()
        } else {
            self.parse_head()?
        };
        let body = if self.skip_if(&Token::If) {
            self.parse_body()?
        } else {
            Vec::new()
        };
        self.expect(Token::Dot)?;
        Ok(Rule::new(head, body))
    }

    fn parse_head(&mut self) -> Result<Head> {
        let choice_ahead = matches!(self.current(), Token::LBrace)
            || (matches!(self.current(), Token::Integer(_)) && self.peek() == &Token::LBrace);
        if choice_ahead {
            return self.parse_choice();
        }

        let mut atoms = vec![self.parse_atom()?];
        while matches!(self.current(), Token::Semicolon | Token::Pipe) {
            self.advance();
            atoms.push(self.parse_atom()?);
        }
        Ok(Head::disjunction(atoms))
    }

    fn parse_choice(&mut self) -> Result<Head> {
        let lower = self.parse_bound()?;
        self.expect(Token::LBrace)?;
        let mut atoms = Vec::new();
        if self.current() != &Token::RBrace {
            atoms.push(self.parse_atom()?);
            while matches!(self.current(), Token::Semicolon | Token::Comma) {
                self.advance();
                atoms.push(self.parse_atom()?);
            }
        }
        self.expect(Token::RBrace)?;
        let upper = self.parse_bound()?;
        if let (Some(l), Some(u)) = (lower, upper) {
            if l > u {
                return Err(self.error(format!("lower bound {} exceeds upper bound {}", l, u)));
            }
        }
        Ok(Head::choice(atoms, lower, upper))
    }

    fn parse_bound(&mut self) -> Result<Option<usize>> {
        match self.current().clone() {
            Token::Integer(n) => {
                let bound = usize::try_from(n)
                    .map_err(|_| self.error(format!("invalid bound {}", n)))?;
                self.advance();
                Ok(Some(bound))
            }
            _ => Ok(None),
        }
    }

    fn parse_body(&mut self) -> Result<Vec<Literal>> {
        let mut body = vec![self.parse_literal()?];
        while matches!(self.current(), Token::Comma | Token::Semicolon) {
            self.advance();
            body.push(self.parse_literal()?);
        }
        Ok(body)
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        let positive = !self.skip_if(&Token::Not);
        Ok(Literal::new(self.parse_atom()?, positive))
    }

    fn parse_atom(&mut self) -> Result<GroundAtom> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                let args = if self.current() == &Token::LParen {
                    self.parse_arguments()?
                } else {
                    Vec::new()
                };
                Ok(GroundAtom::new(name, args))
            }
            Token::Variable(name) => Err(self.non_ground(&name)),
            other => Err(self.error(format!("expected an atom, found {:?}", other))),
        }
    }

    /// Parses `( t1, ..., tn )`, with a possibly trailing comma
    fn parse_arguments(&mut self) -> Result<Vec<Term>> {
        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        while self.current() != &Token::RParen {
            args.push(self.parse_term()?);
            if !self.skip_if(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(args)
    }

    fn parse_term(&mut self) -> Result<Term> {
        match self.current().clone() {
            Token::Integer(n) => {
                self.advance();
                Ok(Term::Int(n))
            }
            Token::Minus => {
                self.advance();
                match self.advance() {
                    Token::Integer(n) => Ok(Term::Int(-n)),
                    other => Err(self.error(format!("expected an integer after '-', found {:?}", other))),
                }
            }
            Token::StringLit(s) => {
                self.advance();
                Ok(Term::Str(s))
            }
            Token::Identifier(name) => {
                self.advance();
                if self.current() == &Token::LParen {
                    Ok(Term::Function(name, self.parse_arguments()?))
                } else {
                    Ok(Term::Constant(name))
                }
            }
            Token::LParen => {
                self.advance();
                let mut args = Vec::new();
                let mut trailing_comma = false;
                while self.current() != &Token::RParen {
                    args.push(self.parse_term()?);
                    trailing_comma = self.skip_if(&Token::Comma);
                    if !trailing_comma {
                        break;
                    }
                }
                self.expect(Token::RParen)?;
                if args.len() == 1 && !trailing_comma {
                    Ok(args.remove(0))
                } else {
                    Ok(Term::Tuple(args))
                }
            }
            Token::Variable(name) => Err(self.non_ground(&name)),
            other => Err(self.error(format!("expected a term, found {:?}", other))),
        }
    }

    fn non_ground(&self, name: &str) -> ExplainError {
        self.error(format!(
            "variable {} in non-ground rule; programs must be grounded before explanation",
            name
        ))
    }
}

fn fragment_at(source: &str, offset: usize) -> String {
    let rest = source.get(offset..).unwrap_or("");
    let line = rest.lines().next().unwrap_or("");
    line.chars().take(FRAGMENT_LEN).collect()
}

fn lex_error(source: &str, e: LexError) -> ExplainError {
    ExplainError::Parse {
        line: e.line,
        column: e.column,
        fragment: fragment_at(source, e.offset),
        message: e.message,
    }
}
