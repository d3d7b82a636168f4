//! SQL Lexer - Tokenizes SQL input text into a stream of positioned tokens

use std::{fmt::Display, iter::Peekable, str::Chars};

use crate::{
    error::{Error, Result},
    sql::{parser::ast::Operator, types::DataType},
};

/// A lexical token together with the 0-based character offset where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize) -> Self {
        Self { kind, position }
    }
}

/// Represents the kind and text of a single lexical token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// SQL reserved keyword
    Keyword(Keyword),
    /// Identifier such as table name or column name, original case preserved
    Ident(String),
    /// Column type name
    Type(DataType),
    /// Numeric literal (integer or decimal, optionally negative)
    Number(String),
    /// String literal with escapes already resolved
    String(String),
    /// Comparison or arithmetic operator
    Operator(Operator),
    /// `*`
    Wildcard,
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Period,
}

impl TokenKind {
    /// Category name used in syntax error messages
    pub fn category(&self) -> &'static str {
        match self {
            TokenKind::Keyword(_) => "KEYWORD",
            TokenKind::Ident(_) => "IDENTIFIER",
            TokenKind::Type(_) => "TYPE",
            TokenKind::Number(_) => "NUMBER",
            TokenKind::String(_) => "STRING",
            TokenKind::Wildcard => "WILDCARD",
            TokenKind::Operator(_)
            | TokenKind::OpenParen
            | TokenKind::CloseParen
            | TokenKind::Comma
            | TokenKind::Semicolon
            | TokenKind::Period => "OPERATOR",
        }
    }

    /// Category plus quoted text, e.g. `KEYWORD 'FROM'`
    pub fn describe(&self) -> String {
        format!("{} '{}'", self.category(), self)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Keyword(keyword) => f.write_str(keyword.to_str()),
            TokenKind::Ident(ident) => f.write_str(ident),
            TokenKind::Type(datatype) => f.write_str(datatype.to_str()),
            TokenKind::Number(n) => f.write_str(n),
            TokenKind::String(v) => f.write_str(v),
            TokenKind::Operator(op) => write!(f, "{}", op),
            TokenKind::Wildcard => f.write_str("*"),
            TokenKind::OpenParen => f.write_str("("),
            TokenKind::CloseParen => f.write_str(")"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Semicolon => f.write_str(";"),
            TokenKind::Period => f.write_str("."),
        }
    }
}

/// SQL reserved keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // Statement keywords
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Create,
    Table,
    Delete,
    Update,
    Set,
    Drop,
    Use,
    Show,
    Database,
    Databases,
    Tables,
    // Logical keywords
    And,
    Or,
    Not,
    // Literal keywords
    Null,
    True,
    False,
    // Reserved, not part of the supported grammar
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Offset,
    Join,
    Left,
    Right,
    Inner,
    Outer,
    On,
    Group,
    Having,
    Distinct,
    As,
    In,
    Like,
    Between,
    Is,
    Exists,
    All,
    Any,
    Some,
}

impl Keyword {
    /// Attempts to parse a string as a keyword (case-insensitive)
    pub fn from_str(ident: &str) -> Option<Keyword> {
        Some(match ident.to_uppercase().as_ref() {
            "SELECT" => Keyword::Select,
            "FROM" => Keyword::From,
            "WHERE" => Keyword::Where,
            "INSERT" => Keyword::Insert,
            "INTO" => Keyword::Into,
            "VALUES" => Keyword::Values,
            "CREATE" => Keyword::Create,
            "TABLE" => Keyword::Table,
            "DELETE" => Keyword::Delete,
            "UPDATE" => Keyword::Update,
            "SET" => Keyword::Set,
            "DROP" => Keyword::Drop,
            "USE" => Keyword::Use,
            "SHOW" => Keyword::Show,
            "DATABASE" => Keyword::Database,
            "DATABASES" => Keyword::Databases,
            "TABLES" => Keyword::Tables,
            "AND" => Keyword::And,
            "OR" => Keyword::Or,
            "NOT" => Keyword::Not,
            "NULL" => Keyword::Null,
            "TRUE" => Keyword::True,
            "FALSE" => Keyword::False,
            "ORDER" => Keyword::Order,
            "BY" => Keyword::By,
            "ASC" => Keyword::Asc,
            "DESC" => Keyword::Desc,
            "LIMIT" => Keyword::Limit,
            "OFFSET" => Keyword::Offset,
            "JOIN" => Keyword::Join,
            "LEFT" => Keyword::Left,
            "RIGHT" => Keyword::Right,
            "INNER" => Keyword::Inner,
            "OUTER" => Keyword::Outer,
            "ON" => Keyword::On,
            "GROUP" => Keyword::Group,
            "HAVING" => Keyword::Having,
            "DISTINCT" => Keyword::Distinct,
            "AS" => Keyword::As,
            "IN" => Keyword::In,
            "LIKE" => Keyword::Like,
            "BETWEEN" => Keyword::Between,
            "IS" => Keyword::Is,
            "EXISTS" => Keyword::Exists,
            "ALL" => Keyword::All,
            "ANY" => Keyword::Any,
            "SOME" => Keyword::Some,
            _ => return None,
        })
    }

    /// Returns the uppercase string representation of the keyword
    pub fn to_str(&self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::Insert => "INSERT",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Create => "CREATE",
            Keyword::Table => "TABLE",
            Keyword::Delete => "DELETE",
            Keyword::Update => "UPDATE",
            Keyword::Set => "SET",
            Keyword::Drop => "DROP",
            Keyword::Use => "USE",
            Keyword::Show => "SHOW",
            Keyword::Database => "DATABASE",
            Keyword::Databases => "DATABASES",
            Keyword::Tables => "TABLES",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::Null => "NULL",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Limit => "LIMIT",
            Keyword::Offset => "OFFSET",
            Keyword::Join => "JOIN",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Inner => "INNER",
            Keyword::Outer => "OUTER",
            Keyword::On => "ON",
            Keyword::Group => "GROUP",
            Keyword::Having => "HAVING",
            Keyword::Distinct => "DISTINCT",
            Keyword::As => "AS",
            Keyword::In => "IN",
            Keyword::Like => "LIKE",
            Keyword::Between => "BETWEEN",
            Keyword::Is => "IS",
            Keyword::Exists => "EXISTS",
            Keyword::All => "ALL",
            Keyword::Any => "ANY",
            Keyword::Some => "SOME",
        }
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Tokenizes the whole input, failing on the first unrecognized character
pub fn tokenize(sql_text: &str) -> Result<Vec<Token>> {
    Lexer::new(sql_text).collect()
}

/// SQL lexical analyzer (lexer/tokenizer)
pub struct Lexer<'a> {
    iter: Peekable<Chars<'a>>,
    /// Character offset of the next unread character
    pos: usize,
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.scan() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => self
                .iter
                .peek()
                .map(|c| Err(Error::syntax("a valid token", format!("unexpected character '{}'", c), self.pos))),
            Err(err) => Some(Err(err)),
        }
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given SQL text
    pub fn new(sql_text: &'a str) -> Self {
        Self {
            iter: sql_text.chars().peekable(),
            pos: 0,
        }
    }

    /// Consumes one character
    fn bump(&mut self) -> Option<char> {
        let c = self.iter.next()?;
        self.pos += 1;
        Some(c)
    }

    /// Looks one character past the next one
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.iter.clone();
        ahead.next();
        ahead.next()
    }

    /// Consumes the next character if it satisfies the predicate
    fn next_if<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<char> {
        self.iter.peek().filter(|&c| predicate(*c))?;
        self.bump()
    }

    /// Consumes consecutive characters while they satisfy the predicate
    fn next_while<F: Fn(char) -> bool>(&mut self, predicate: F) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.next_if(&predicate) {
            value.push(c);
        }
        Some(value).filter(|v| !v.is_empty())
    }

    /// Removes whitespace from the input stream
    fn erase_whitespace(&mut self) {
        self.next_while(|c| c.is_whitespace());
    }

    /// Scans and returns the next token
    fn scan(&mut self) -> Result<Option<Token>> {
        self.erase_whitespace();
        let start = self.pos;
        let next = self.iter.peek().copied();
        let kind = match next {
            Some(q) if q == '\'' || q == '"' => self.scan_string(q)?,
            Some(c) if c.is_ascii_digit() => self.scan_number(),
            Some('-') if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.scan_word(),
            Some(_) => match self.scan_symbol() {
                Some(kind) => kind,
                None => return Ok(None),
            },
            None => return Ok(None),
        };
        Ok(Some(Token::new(kind, start)))
    }

    /// Scans a quoted string literal.
    ///
    /// A doubled quote stands for one quote character; backslash escapes
    /// `\n`, `\t`, `\r` and `\\` are resolved, any other escaped character is
    /// taken literally.
    fn scan_string(&mut self, quote: char) -> Result<TokenKind> {
        let start = self.pos;
        self.bump();
        let mut val = String::new();

        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if self.next_if(|n| n == quote).is_some() {
                        val.push(quote);
                    } else {
                        break;
                    }
                }
                Some('\\') => match self.bump() {
                    Some('n') => val.push('\n'),
                    Some('t') => val.push('\t'),
                    Some('r') => val.push('\r'),
                    Some(c) => val.push(c),
                    None => return Err(Error::syntax("closing quote", "end of input", start)),
                },
                Some(c) => val.push(c),
                None => return Err(Error::syntax("closing quote", "end of input", start)),
            }
        }
        Ok(TokenKind::String(val))
    }

    /// Scans a numeric literal; at most one decimal point is consumed
    fn scan_number(&mut self) -> TokenKind {
        let mut val = String::new();
        if let Some(sign) = self.next_if(|c| c == '-') {
            val.push(sign);
        }
        let mut seen_point = false;
        loop {
            match self.iter.peek().copied() {
                Some(c) if c.is_ascii_digit() => {}
                Some('.') if !seen_point => seen_point = true,
                _ => break,
            }
            if let Some(c) = self.bump() {
                val.push(c);
            }
        }
        TokenKind::Number(val)
    }

    /// Scans a keyword, type name, or identifier
    fn scan_word(&mut self) -> TokenKind {
        let val = self
            .next_while(|c| c.is_ascii_alphanumeric() || c == '_')
            .unwrap_or_default();
        if let Some(keyword) = Keyword::from_str(&val) {
            TokenKind::Keyword(keyword)
        } else if let Some(datatype) = DataType::from_str(&val) {
            TokenKind::Type(datatype)
        } else {
            TokenKind::Ident(val)
        }
    }

    /// Scans an operator or punctuation; two-character operators win
    fn scan_symbol(&mut self) -> Option<TokenKind> {
        let first = *self.iter.peek()?;
        let kind = match (first, self.peek_second()) {
            ('!', Some('=')) => {
                self.bump();
                TokenKind::Operator(Operator::NotEqual)
            }
            ('<', Some('>')) => {
                self.bump();
                TokenKind::Operator(Operator::LessGreater)
            }
            ('<', Some('=')) => {
                self.bump();
                TokenKind::Operator(Operator::LessEqual)
            }
            ('>', Some('=')) => {
                self.bump();
                TokenKind::Operator(Operator::GreaterEqual)
            }
            ('=', _) => TokenKind::Operator(Operator::Equal),
            ('<', _) => TokenKind::Operator(Operator::Less),
            ('>', _) => TokenKind::Operator(Operator::Greater),
            ('+', _) => TokenKind::Operator(Operator::Plus),
            ('-', _) => TokenKind::Operator(Operator::Minus),
            ('/', _) => TokenKind::Operator(Operator::Slash),
            ('%', _) => TokenKind::Operator(Operator::Percent),
            ('*', _) => TokenKind::Wildcard,
            ('(', _) => TokenKind::OpenParen,
            (')', _) => TokenKind::CloseParen,
            (',', _) => TokenKind::Comma,
            (';', _) => TokenKind::Semicolon,
            ('.', _) => TokenKind::Period,
            _ => return None,
        };
        self.bump();
        Some(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::{Keyword, Token, TokenKind, tokenize};
    use crate::{
        error::{Error, Result},
        sql::{parser::ast::Operator, types::DataType},
    };

    fn kinds(sql: &str) -> Result<Vec<TokenKind>> {
        Ok(tokenize(sql)?.into_iter().map(|t| t.kind).collect())
    }

    #[test]
    fn test_lexer_create_table() -> Result<()> {
        let tokens = tokenize("CREATE table Users (id NUMBER, name string)")?;
        assert_eq!(
            tokens,
            vec![
                Token::new(TokenKind::Keyword(Keyword::Create), 0),
                Token::new(TokenKind::Keyword(Keyword::Table), 7),
                Token::new(TokenKind::Ident("Users".to_string()), 13),
                Token::new(TokenKind::OpenParen, 19),
                Token::new(TokenKind::Ident("id".to_string()), 20),
                Token::new(TokenKind::Type(DataType::Number), 23),
                Token::new(TokenKind::Comma, 29),
                Token::new(TokenKind::Ident("name".to_string()), 31),
                Token::new(TokenKind::Type(DataType::String), 36),
                Token::new(TokenKind::CloseParen, 42),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_insert_into() -> Result<()> {
        assert_eq!(
            kinds("insert into tbl values (1, -2, 'it''s', true, NULL, 4.55);")?,
            vec![
                TokenKind::Keyword(Keyword::Insert),
                TokenKind::Keyword(Keyword::Into),
                TokenKind::Ident("tbl".to_string()),
                TokenKind::Keyword(Keyword::Values),
                TokenKind::OpenParen,
                TokenKind::Number("1".to_string()),
                TokenKind::Comma,
                TokenKind::Number("-2".to_string()),
                TokenKind::Comma,
                TokenKind::String("it's".to_string()),
                TokenKind::Comma,
                TokenKind::Keyword(Keyword::True),
                TokenKind::Comma,
                TokenKind::Keyword(Keyword::Null),
                TokenKind::Comma,
                TokenKind::Number("4.55".to_string()),
                TokenKind::CloseParen,
                TokenKind::Semicolon,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_select() -> Result<()> {
        assert_eq!(
            kinds("select * from tbl where a >= 1 and b <> 'x' or c != 2")?,
            vec![
                TokenKind::Keyword(Keyword::Select),
                TokenKind::Wildcard,
                TokenKind::Keyword(Keyword::From),
                TokenKind::Ident("tbl".to_string()),
                TokenKind::Keyword(Keyword::Where),
                TokenKind::Ident("a".to_string()),
                TokenKind::Operator(Operator::GreaterEqual),
                TokenKind::Number("1".to_string()),
                TokenKind::Keyword(Keyword::And),
                TokenKind::Ident("b".to_string()),
                TokenKind::Operator(Operator::LessGreater),
                TokenKind::String("x".to_string()),
                TokenKind::Keyword(Keyword::Or),
                TokenKind::Ident("c".to_string()),
                TokenKind::Operator(Operator::NotEqual),
                TokenKind::Number("2".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_strings() -> Result<()> {
        assert_eq!(
            kinds(r#"'a\nb\t\\c' "say ""hi""" 'x\'y'"#)?,
            vec![
                TokenKind::String("a\nb\t\\c".to_string()),
                TokenKind::String("say \"hi\"".to_string()),
                TokenKind::String("x'y".to_string()),
            ]
        );

        assert_eq!(
            tokenize("select 'abc"),
            Err(Error::syntax("closing quote", "end of input", 7))
        );
        Ok(())
    }

    #[test]
    fn test_lexer_numbers() -> Result<()> {
        assert_eq!(
            kinds("1.2.3 a-1 _x9")?,
            vec![
                TokenKind::Number("1.2".to_string()),
                TokenKind::Period,
                TokenKind::Number("3".to_string()),
                TokenKind::Ident("a".to_string()),
                TokenKind::Number("-1".to_string()),
                TokenKind::Ident("_x9".to_string()),
            ]
        );
        assert_eq!(
            kinds("a - b")?,
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Operator(Operator::Minus),
                TokenKind::Ident("b".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_lexer_unexpected_character() {
        assert_eq!(
            tokenize("select # from t"),
            Err(Error::syntax("a valid token", "unexpected character '#'", 7))
        );
        assert!(tokenize("a ! b").is_err());
    }
}
