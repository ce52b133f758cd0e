//! Lexer for the ground rule language.

/// Token types of the rule language
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Lowercase identifier: predicates, constants, functors
    Identifier(String),
    /// Capitalised identifier or `_`
    Variable(String),
    /// Non-negative integer literal
    Integer(i64),
    /// Quoted string, unescaped
    StringLit(String),

    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Pipe,
    Minus,
    Dot,
    /// `:-`
    If,
    /// `not`
    Not,
    /// `~`, marks a false atom in answer-set listings
    Tilde,

    Eof,
}

/// A token with the position of its first character
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Lexing failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

/// Lexer state
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenizes the whole input, ending with [`Token::Eof`]
    pub fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace_and_comments()?;

        let (line, column, offset) = (self.line, self.column, self.position);
        let spanned = |token| Spanned {
            token,
            line,
            column,
            offset,
        };

        let Some(ch) = self.peek_char() else {
            return Ok(spanned(Token::Eof));
        };

        let single = match ch {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '|' => Some(Token::Pipe),
            '-' => Some(Token::Minus),
            '.' => Some(Token::Dot),
            '~' => Some(Token::Tilde),
            _ => None,
        };
        if let Some(token) = single {
            self.advance(1);
            return Ok(spanned(token));
        }

        if self.rest().starts_with(":-") {
            self.advance(2);
            return Ok(spanned(Token::If));
        }
        if ch == '"' {
            return self.lex_string().map(spanned);
        }
        if ch.is_ascii_digit() {
            return self.lex_integer().map(spanned);
        }
        if ch.is_ascii_lowercase() {
            let word = self.take_word();
            let token = if word == "not" {
                Token::Not
            } else {
                Token::Identifier(word)
            };
            return Ok(spanned(token));
        }
        if ch.is_ascii_uppercase() || ch == '_' {
            // `__mus__` style names are reserved constants, not variables
            let word = self.take_word();
            let token = if word.starts_with("__") {
                Token::Identifier(word)
            } else {
                Token::Variable(word)
            };
            return Ok(spanned(token));
        }

        Err(self.error(format!("unexpected character '{}'", ch)))
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self, bytes: usize) {
        let consumed = &self.input[self.position..self.position + bytes];
        for ch in consumed.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position += bytes;
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance(ch.len_utf8());
            } else if self.rest().starts_with("%*") {
                let Some(end) = self.rest()[2..].find("*%") else {
                    return Err(self.error("unterminated block comment".to_string()));
                };
                self.advance(end + 4);
            } else if ch == '%' {
                let len = self.rest().find('\n').unwrap_or(self.rest().len());
                self.advance(len);
            } else {
                break;
            }
        }
        Ok(())
    }

    fn take_word(&mut self) -> String {
        let len = self
            .rest()
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '\''))
            .map(|(i, _)| i)
            .unwrap_or(self.rest().len());
        let word = self.rest()[..len].to_string();
        self.advance(len);
        word
    }

    fn lex_integer(&mut self) -> Result<Token, LexError> {
        let len = self
            .rest()
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest().len());
        let digits = &self.rest()[..len];
        let value = digits
            .parse::<i64>()
            .map_err(|_| self.error(format!("integer out of range: {}", digits)))?;
        self.advance(len);
        Ok(Token::Integer(value))
    }

    fn lex_string(&mut self) -> Result<Token, LexError> {
        let mut value = String::new();
        let mut escaped = false;
        for (i, ch) in self.rest().char_indices().skip(1) {
            if escaped {
                value.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                self.advance(i + 1);
                return Ok(Token::StringLit(value));
            } else {
                value.push(ch);
            }
        }
        Err(self.error("unterminated string".to_string()))
    }

    fn error(&self, message: String) -> LexError {
        LexError {
            message,
            line: self.line,
            column: self.column,
            offset: self.position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_lex_rule() {
        assert_eq!(
            tokens("b :- a, not c."),
            vec![
                Token::Identifier("b".into()),
                Token::If,
                Token::Identifier("a".into()),
                Token::Comma,
                Token::Not,
                Token::Identifier("c".into()),
                Token::Dot,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_choice_with_bounds() {
        assert_eq!(
            tokens("1{a; a'}2."),
            vec![
                Token::Integer(1),
                Token::LBrace,
                Token::Identifier("a".into()),
                Token::Semicolon,
                Token::Identifier("a'".into()),
                Token::RBrace,
                Token::Integer(2),
                Token::Dot,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_comments_are_skipped() {
        assert_eq!(
            tokens("% line\na. %* block\n comment *% b."),
            vec![
                Token::Identifier("a".into()),
                Token::Dot,
                Token::Identifier("b".into()),
                Token::Dot,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_reserved_underscore_names() {
        assert_eq!(
            tokens("__mus__ X _"),
            vec![
                Token::Identifier("__mus__".into()),
                Token::Variable("X".into()),
                Token::Variable("_".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_lex_positions() {
        let spanned = Lexer::new("a.\n  b.").tokenize().unwrap();
        assert_eq!((spanned[2].line, spanned[2].column), (2, 3));
    }

    #[test]
    fn test_lex_errors() {
        assert!(Lexer::new("a :- \"open").tokenize().is_err());
        assert!(Lexer::new("%* never closed").tokenize().is_err());
        assert!(Lexer::new("a # b").tokenize().is_err());
    }
}
