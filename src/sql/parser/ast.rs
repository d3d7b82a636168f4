use std::fmt::Display;

use crate::{
    error::{Error, Result},
    sql::types::DataType,
};

/// Abstract Syntax Tree (AST) node definitions for SQL statements
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// SELECT statement
    Select {
        columns: Projection,
        table_name: String,
        where_clause: Option<Condition>,
    },
    /// INSERT statement, one value list per row
    Insert {
        table_name: String,
        values: Vec<Vec<Literal>>,
    },
    /// CREATE TABLE statement
    CreateTable {
        table_name: String,
        columns: Vec<Column>,
    },
    /// DELETE statement
    Delete {
        table_name: String,
        where_clause: Option<Condition>,
    },
    /// UPDATE statement
    Update {
        table_name: String,
        assignments: Vec<Assignment>,
        where_clause: Option<Condition>,
    },
    Use {
        database: String,
    },
    ShowDatabases,
    ShowTables,
    CreateDatabase {
        database: String,
    },
    DropDatabase {
        database: String,
    },
    DropTable {
        table_name: String,
    },
}

/// Statement category, used by the planner and the explain output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Create,
    Delete,
    Update,
    Use,
    ShowDatabases,
    ShowTables,
    CreateDatabase,
    DropDatabase,
    DropTable,
}

impl Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            QueryType::Select => "SELECT",
            QueryType::Insert => "INSERT",
            QueryType::Create => "CREATE",
            QueryType::Delete => "DELETE",
            QueryType::Update => "UPDATE",
            QueryType::Use => "USE",
            QueryType::ShowDatabases => "SHOW_DATABASES",
            QueryType::ShowTables => "SHOW_TABLES",
            QueryType::CreateDatabase => "CREATE_DATABASE",
            QueryType::DropDatabase => "DROP_DATABASE",
            QueryType::DropTable => "DROP_TABLE",
        })
    }
}

impl Statement {
    pub fn query_type(&self) -> QueryType {
        match self {
            Statement::Select { .. } => QueryType::Select,
            Statement::Insert { .. } => QueryType::Insert,
            Statement::CreateTable { .. } => QueryType::Create,
            Statement::Delete { .. } => QueryType::Delete,
            Statement::Update { .. } => QueryType::Update,
            Statement::Use { .. } => QueryType::Use,
            Statement::ShowDatabases => QueryType::ShowDatabases,
            Statement::ShowTables => QueryType::ShowTables,
            Statement::CreateDatabase { .. } => QueryType::CreateDatabase,
            Statement::DropDatabase { .. } => QueryType::DropDatabase,
            Statement::DropTable { .. } => QueryType::DropTable,
        }
    }

    /// The table a statement targets, if any
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Statement::Select { table_name, .. }
            | Statement::Insert { table_name, .. }
            | Statement::CreateTable { table_name, .. }
            | Statement::Delete { table_name, .. }
            | Statement::Update { table_name, .. }
            | Statement::DropTable { table_name } => Some(table_name),
            _ => None,
        }
    }

    /// Structural validation of a statement tree.
    ///
    /// The parser never produces an invalid tree; this guards trees built by
    /// hand and catches non-comparison operators in conditions.
    pub fn validate(&self) -> Result<()> {
        if let Some(table_name) = self.table_name() {
            if table_name.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "{} statement must have a table name",
                    self.query_type()
                )));
            }
        }

        match self {
            Statement::Select { columns, where_clause, .. } => {
                if let Projection::Columns(names) = columns {
                    if names.is_empty() || names.iter().any(|n| n.trim().is_empty()) {
                        return Err(Error::Validation("SELECT must have a column list".into()));
                    }
                }
                where_clause.as_ref().map_or(Ok(()), Condition::validate)
            }
            Statement::Insert { values, .. } => {
                if values.is_empty() || values.iter().any(|row| row.is_empty()) {
                    return Err(Error::Validation("INSERT must have a values list".into()));
                }
                Ok(())
            }
            Statement::CreateTable { columns, .. } => {
                for (i, col) in columns.iter().enumerate() {
                    if col.name.trim().is_empty() {
                        return Err(Error::Validation(format!(
                            "Column {} must have name and type",
                            i + 1
                        )));
                    }
                }
                Ok(())
            }
            Statement::Delete { where_clause, .. } => {
                where_clause.as_ref().map_or(Ok(()), Condition::validate)
            }
            Statement::Update { assignments, where_clause, .. } => {
                for (i, assignment) in assignments.iter().enumerate() {
                    if assignment.column.trim().is_empty() {
                        return Err(Error::Validation(format!(
                            "Update {} must have column and value",
                            i + 1
                        )));
                    }
                }
                where_clause.as_ref().map_or(Ok(()), Condition::validate)
            }
            Statement::Use { database }
            | Statement::CreateDatabase { database }
            | Statement::DropDatabase { database } => {
                if database.trim().is_empty() {
                    return Err(Error::Validation(format!(
                        "{} statement must have a database name",
                        self.query_type()
                    )));
                }
                Ok(())
            }
            Statement::ShowDatabases | Statement::ShowTables | Statement::DropTable { .. } => Ok(()),
        }
    }
}

/// SELECT column list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// `*`, rows are returned unmodified
    All,
    Columns(Vec<String>),
}

/// Column definition for CREATE TABLE statements
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub datatype: DataType,
}

/// `column = literal` in an UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: Literal,
}

/// WHERE condition tree.
///
/// A compound chain is evaluated strictly left to right with no precedence:
/// `a AND b OR c` is `(a AND b) OR c`, and `a OR b AND c` is `(a OR b) AND c`.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Simple {
        column: String,
        operator: Operator,
        value: Literal,
    },
    Compound {
        first: Box<Condition>,
        rest: Vec<(LogicalOperator, Condition)>,
    },
}

impl Condition {
    /// Number of top-level conditions in the chain
    pub fn len(&self) -> usize {
        match self {
            Condition::Simple { .. } => 1,
            Condition::Compound { rest, .. } => 1 + rest.len(),
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Condition::Compound { .. })
    }

    /// Every column referenced anywhere in the tree
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Condition::Simple { column, .. } => vec![column.as_str()],
            Condition::Compound { first, rest } => {
                let mut columns = first.columns();
                for (_, cond) in rest {
                    columns.extend(cond.columns());
                }
                columns
            }
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            Condition::Simple { column, operator, .. } => {
                if column.trim().is_empty() {
                    return Err(Error::Validation(
                        "WHERE condition must have column, operator, and value".into(),
                    ));
                }
                if !operator.is_comparison() {
                    return Err(Error::Validation(format!("Invalid operator: {}", operator)));
                }
                Ok(())
            }
            Condition::Compound { first, rest } => {
                first.validate()?;
                for (_, cond) in rest {
                    cond.validate()?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::Simple { column, operator, value } => {
                write!(f, "{} {} {}", column, operator, value)
            }
            Condition::Compound { first, rest } => {
                write!(f, "{}", first)?;
                for (logical, cond) in rest {
                    write!(f, " {} {}", logical, cond)?;
                }
                Ok(())
            }
        }
    }
}

/// AND / OR connector in a condition chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        })
    }
}

/// Operator symbols. Only the comparison ones are meaningful in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    /// `<>`, same meaning as `!=`
    LessGreater,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Plus,
    Minus,
    Slash,
    Percent,
}

impl Operator {
    pub fn is_comparison(&self) -> bool {
        !matches!(
            self,
            Operator::Plus | Operator::Minus | Operator::Slash | Operator::Percent
        )
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
            Operator::LessGreater => "<>",
            Operator::Less => "<",
            Operator::Greater => ">",
            Operator::LessEqual => "<=",
            Operator::GreaterEqual => ">=",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Slash => "/",
            Operator::Percent => "%",
        })
    }
}

/// Constant values in SQL statements
#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Boolean(true) => write!(f, "TRUE"),
            Literal::Boolean(false) => write!(f, "FALSE"),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::String(s) => write!(f, "{}", s),
        }
    }
}
