use crate::error::{Error, Result};
use crate::sql::parser::ast::{Assignment, Column, Condition, Literal, LogicalOperator, Projection, Statement};
use crate::sql::parser::lexer::{Keyword, Token, TokenKind};

pub mod ast;
pub mod lexer;

/// Parses a single SQL statement
pub fn parse(sql: &str) -> Result<Statement> {
    Parser::new(sql).parse()
}

/// SQL Parser - recursive descent over the token sequence with a single
/// cursor and no backtracking
pub struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    cursor: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            tokens: Vec::new(),
            cursor: 0,
        }
    }

    /// Parses the input SQL statement into an AST
    pub fn parse(&mut self) -> Result<Statement> {
        self.tokens = lexer::tokenize(self.input)?;
        self.cursor = 0;

        let stmt = self.parse_statement()?;
        self.next_if_token(&TokenKind::Semicolon);
        // No tokens allowed after the statement
        if let Some(token) = self.peek() {
            return Err(Error::syntax("end of input", token.kind.describe(), token.position));
        }
        Ok(stmt)
    }

    /// Parses a statement based on the first token
    fn parse_statement(&mut self) -> Result<Statement> {
        let token = match self.peek() {
            Some(token) => token.clone(),
            None => return Err(Error::syntax("SQL statement", "end of input", 0)),
        };
        match token.kind {
            TokenKind::Keyword(Keyword::Select) => self.parse_select(),
            TokenKind::Keyword(Keyword::Insert) => self.parse_insert(),
            TokenKind::Keyword(Keyword::Create) => self.parse_create(),
            TokenKind::Keyword(Keyword::Drop) => self.parse_drop(),
            TokenKind::Keyword(Keyword::Use) => self.parse_use(),
            TokenKind::Keyword(Keyword::Show) => self.parse_show(),
            TokenKind::Keyword(Keyword::Delete) => self.parse_delete(),
            TokenKind::Keyword(Keyword::Update) => self.parse_update(),
            kind => Err(Error::syntax("statement keyword", kind.describe(), token.position)),
        }
    }

    /// SELECT <* | col, ...> FROM <table> [WHERE <cond>]
    fn parse_select(&mut self) -> Result<Statement> {
        self.next_expect_keyword(Keyword::Select)?;

        let columns = if self.next_if_token(&TokenKind::Wildcard).is_some() {
            Projection::All
        } else {
            let mut names = vec![self.next_ident()?];
            while self.next_if_token(&TokenKind::Comma).is_some() {
                names.push(self.next_ident()?);
            }
            Projection::Columns(names)
        };

        self.next_expect_keyword(Keyword::From)?;
        let table_name = self.next_ident()?;

        Ok(Statement::Select {
            columns,
            table_name,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// INSERT INTO <table> VALUES (<lit>, ...)[, (<lit>, ...)]
    fn parse_insert(&mut self) -> Result<Statement> {
        self.next_expect_keyword(Keyword::Insert)?;
        self.next_expect_keyword(Keyword::Into)?;

        let table_name = self.next_ident()?;

        self.next_expect_keyword(Keyword::Values)?;
        let mut values = Vec::new();
        loop {
            self.next_expect(&TokenKind::OpenParen)?;
            let mut row = vec![self.parse_literal()?];
            while self.next_if_token(&TokenKind::Comma).is_some() {
                row.push(self.parse_literal()?);
            }
            self.next_expect(&TokenKind::CloseParen)?;
            values.push(row);
            if self.next_if_token(&TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(Statement::Insert { table_name, values })
    }

    /// CREATE TABLE <table> (<col> <type>, ...) | CREATE DATABASE <name>
    fn parse_create(&mut self) -> Result<Statement> {
        self.next_expect_keyword(Keyword::Create)?;
        let token = self.next("TABLE or DATABASE")?;
        match token.kind {
            TokenKind::Keyword(Keyword::Table) => self.parse_create_table(),
            TokenKind::Keyword(Keyword::Database) => Ok(Statement::CreateDatabase {
                database: self.next_ident()?,
            }),
            kind => Err(Error::syntax("TABLE or DATABASE", kind.describe(), token.position)),
        }
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        let table_name = self.next_ident()?;
        self.next_expect(&TokenKind::OpenParen)?;

        let mut columns = vec![self.parse_column()?];
        while self.next_if_token(&TokenKind::Comma).is_some() {
            columns.push(self.parse_column()?);
        }
        self.next_expect(&TokenKind::CloseParen)?;
        Ok(Statement::CreateTable { table_name, columns })
    }

    /// Parses a `<name> <type>` column definition
    fn parse_column(&mut self) -> Result<Column> {
        let name = self.next_ident()?;
        let token = self.next("TYPE")?;
        match token.kind {
            TokenKind::Type(datatype) => Ok(Column { name, datatype }),
            kind => Err(Error::syntax("TYPE", kind.describe(), token.position)),
        }
    }

    /// DROP TABLE <table> | DROP DATABASE <name>
    fn parse_drop(&mut self) -> Result<Statement> {
        self.next_expect_keyword(Keyword::Drop)?;
        let token = self.next("TABLE or DATABASE")?;
        match token.kind {
            TokenKind::Keyword(Keyword::Table) => Ok(Statement::DropTable {
                table_name: self.next_ident()?,
            }),
            TokenKind::Keyword(Keyword::Database) => Ok(Statement::DropDatabase {
                database: self.next_ident()?,
            }),
            kind => Err(Error::syntax("TABLE or DATABASE", kind.describe(), token.position)),
        }
    }

    /// USE <name>
    fn parse_use(&mut self) -> Result<Statement> {
        self.next_expect_keyword(Keyword::Use)?;
        Ok(Statement::Use {
            database: self.next_ident()?,
        })
    }

    /// SHOW DATABASES | SHOW TABLES
    fn parse_show(&mut self) -> Result<Statement> {
        self.next_expect_keyword(Keyword::Show)?;
        let token = self.next("DATABASES or TABLES")?;
        match token.kind {
            TokenKind::Keyword(Keyword::Databases) => Ok(Statement::ShowDatabases),
            TokenKind::Keyword(Keyword::Tables) => Ok(Statement::ShowTables),
            kind => Err(Error::syntax("DATABASES or TABLES", kind.describe(), token.position)),
        }
    }

    /// DELETE FROM <table> [WHERE <cond>]
    fn parse_delete(&mut self) -> Result<Statement> {
        self.next_expect_keyword(Keyword::Delete)?;
        self.next_expect_keyword(Keyword::From)?;
        let table_name = self.next_ident()?;
        Ok(Statement::Delete {
            table_name,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// UPDATE <table> SET <col> = <lit>, ... [WHERE <cond>]
    fn parse_update(&mut self) -> Result<Statement> {
        self.next_expect_keyword(Keyword::Update)?;
        let table_name = self.next_ident()?;
        self.next_expect_keyword(Keyword::Set)?;

        let mut assignments = Vec::new();
        loop {
            let column = self.next_ident()?;
            self.next_expect(&TokenKind::Operator(ast::Operator::Equal))?;
            let value = self.parse_literal()?;
            assignments.push(Assignment { column, value });
            if self.next_if_token(&TokenKind::Comma).is_none() {
                break;
            }
        }
        Ok(Statement::Update {
            table_name,
            assignments,
            where_clause: self.parse_where_clause()?,
        })
    }

    /// Parses an optional WHERE chain. A chain of one condition stays a
    /// bare simple condition.
    fn parse_where_clause(&mut self) -> Result<Option<Condition>> {
        if self.next_if_token(&TokenKind::Keyword(Keyword::Where)).is_none() {
            return Ok(None);
        }

        let first = self.parse_condition()?;
        let mut rest = Vec::new();
        loop {
            let logical = if self.next_if_token(&TokenKind::Keyword(Keyword::And)).is_some() {
                LogicalOperator::And
            } else if self.next_if_token(&TokenKind::Keyword(Keyword::Or)).is_some() {
                LogicalOperator::Or
            } else {
                break;
            };
            rest.push((logical, self.parse_condition()?));
        }

        if rest.is_empty() {
            return Ok(Some(first));
        }
        Ok(Some(Condition::Compound {
            first: Box::new(first),
            rest,
        }))
    }

    /// Parses `<column> <operator> <literal>`
    fn parse_condition(&mut self) -> Result<Condition> {
        let column = self.next_ident()?;
        let token = self.next("OPERATOR")?;
        let operator = match token.kind {
            TokenKind::Operator(op) => op,
            kind => return Err(Error::syntax("OPERATOR", kind.describe(), token.position)),
        };
        let value = self.parse_literal()?;
        Ok(Condition::Simple { column, operator, value })
    }

    /// Parses a literal: string, number, TRUE, FALSE or NULL
    fn parse_literal(&mut self) -> Result<Literal> {
        let token = self.next("value")?;
        Ok(match token.kind {
            TokenKind::Number(n) => {
                // The lexer yields both 123 and 123.45 as Number
                if n.contains('.') {
                    Literal::Float(n.parse().map_err(|_| Error::syntax("number", n.clone(), token.position))?)
                } else {
                    Literal::Integer(n.parse().map_err(|_| Error::syntax("number", n.clone(), token.position))?)
                }
            }
            TokenKind::String(s) => Literal::String(s),
            TokenKind::Keyword(Keyword::True) => Literal::Boolean(true),
            TokenKind::Keyword(Keyword::False) => Literal::Boolean(false),
            TokenKind::Keyword(Keyword::Null) => Literal::Null,
            kind => return Err(Error::syntax("value", kind.describe(), token.position)),
        })
    }

    /// Peeks at the next token
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    /// Consumes and returns the next token, `expected` names what the caller
    /// wanted in case the input is exhausted
    fn next(&mut self, expected: &str) -> Result<Token> {
        match self.tokens.get(self.cursor) {
            Some(token) => {
                self.cursor += 1;
                Ok(token.clone())
            }
            None => Err(Error::syntax(expected, "end of input", self.input.chars().count())),
        }
    }

    /// Expects and consumes an identifier
    fn next_ident(&mut self) -> Result<String> {
        let token = self.next("IDENTIFIER")?;
        match token.kind {
            TokenKind::Ident(ident) => Ok(ident),
            kind => Err(Error::syntax("IDENTIFIER", kind.describe(), token.position)),
        }
    }

    /// Expects a specific token, returns error if different
    fn next_expect(&mut self, expect: &TokenKind) -> Result<()> {
        let wanted = format!("{} '{}'", expect.category(), expect);
        let token = self.next(&wanted)?;
        if &token.kind != expect {
            return Err(Error::syntax(wanted, token.kind.describe(), token.position));
        }
        Ok(())
    }

    fn next_expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        self.next_expect(&TokenKind::Keyword(keyword))
    }

    /// Consumes next token if it matches the given kind
    fn next_if_token(&mut self, kind: &TokenKind) -> Option<Token> {
        let token = self.peek().filter(|t| &t.kind == kind)?.clone();
        self.cursor += 1;
        Some(token)
    }
}
