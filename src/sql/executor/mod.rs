use std::cmp::Ordering;

use crate::{
    error::{Error, Result},
    sql::{
        engine::Session,
        executor::{
            mutation::{Delete, Insert, Update},
            query::Select,
            schema::{CreateDatabase, CreateTable, DropDatabase, DropTable, ShowDatabases, ShowTables, UseDatabase},
        },
        parser::ast::{Condition, LogicalOperator, Operator, QueryType, Statement},
        schema::{Column, TableSchema},
        types::{Row, Value},
    },
    storage::engine::Backend,
};

mod mutation;
mod query;
mod schema;

/// SQL executor trait
pub trait Executor<B: Backend> {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet>;
}

/// Builds an executor from a parsed statement
impl<B: Backend + 'static> dyn Executor<B> {
    pub fn build(stmt: Statement) -> Box<dyn Executor<B>> {
        match stmt {
            Statement::CreateTable {
                table_name,
                columns,
            } => CreateTable::new(table_name, columns),
            Statement::DropTable { table_name } => DropTable::new(table_name),
            Statement::Insert { table_name, values } => Insert::new(table_name, values),
            Statement::Select {
                columns,
                table_name,
                where_clause,
            } => Select::new(table_name, columns, where_clause),
            Statement::Update {
                table_name,
                assignments,
                where_clause,
            } => Update::new(table_name, assignments, where_clause),
            Statement::Delete {
                table_name,
                where_clause,
            } => Delete::new(table_name, where_clause),
            Statement::CreateDatabase { database } => CreateDatabase::new(database),
            Statement::DropDatabase { database } => DropDatabase::new(database),
            Statement::Use { database } => UseDatabase::new(database),
            Statement::ShowDatabases => ShowDatabases::new(),
            Statement::ShowTables => ShowTables::new(),
        }
    }
}

/// Execution result set
#[derive(Debug, PartialEq)]
pub enum ResultSet {
    CreateTable {
        table_name: String,
        columns: Vec<Column>,
    },
    DropTable {
        table_name: String,
    },
    /// `row` holds the stored row when exactly one was inserted
    Insert {
        table_name: String,
        count: usize,
        row: Option<Row>,
    },
    Scan {
        columns: Vec<String>,
        rows: Vec<Row>,
    },
    Update {
        table_name: String,
        count: usize,
    },
    Delete {
        table_name: String,
        count: usize,
        /// Set when the statement had no WHERE clause
        truncated: bool,
    },
    CreateDatabase {
        name: String,
    },
    DropDatabase {
        name: String,
    },
    UseDatabase {
        name: String,
    },
    ShowDatabases {
        databases: Vec<String>,
    },
    ShowTables {
        database: String,
        tables: Vec<String>,
    },
}

/// Human-readable description of how a statement would execute.
///
/// Derived from the statement alone, storage is never consulted.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub operation: QueryType,
    pub table: Option<String>,
    pub steps: Vec<ExplainStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplainStep {
    /// 1-based
    pub step: usize,
    pub action: &'static str,
    pub description: String,
}

impl Explanation {
    fn new(operation: QueryType, table: Option<&str>) -> Self {
        Self {
            operation,
            table: table.map(str::to_string),
            steps: Vec::new(),
        }
    }

    fn step(&mut self, action: &'static str, description: String) {
        self.steps.push(ExplainStep {
            step: self.steps.len() + 1,
            action,
            description,
        });
    }
}

/// Explains a statement step by step
pub fn explain(stmt: &Statement) -> Explanation {
    let mut explanation = Explanation::new(stmt.query_type(), stmt.table_name());
    match stmt {
        Statement::CreateTable { .. } => schema::explain_create(stmt, &mut explanation),
        Statement::Insert { .. } | Statement::Update { .. } | Statement::Delete { .. } => {
            mutation::explain(stmt, &mut explanation)
        }
        Statement::Select { .. } => query::explain(stmt, &mut explanation),
        _ => schema::explain_admin(stmt, &mut explanation),
    }
    explanation
}

/// Checks that every column referenced by a condition exists
fn check_columns(cond: &Condition, schema: &TableSchema) -> Result<()> {
    for column in cond.columns() {
        schema.get_col_index(column)?;
    }
    Ok(())
}

/// Evaluates a condition chain against a row.
///
/// Every condition in the chain is evaluated and folded left to right, with
/// no operator precedence and no short-circuiting.
pub(crate) fn evaluate(cond: &Condition, schema: &TableSchema, row: &Row) -> Result<bool> {
    match cond {
        Condition::Simple {
            column,
            operator,
            value,
        } => {
            let index = schema.get_col_index(column)?;
            let left = row.get(index).unwrap_or(&Value::Null);
            compare(*operator, left, &Value::from_literal(value))
        }
        Condition::Compound { first, rest } => {
            let mut result = evaluate(first, schema, row)?;
            for (logical, cond) in rest {
                let next = evaluate(cond, schema, row)?;
                result = match logical {
                    LogicalOperator::And => result && next,
                    LogicalOperator::Or => result || next,
                };
            }
            Ok(result)
        }
    }
}

fn compare(operator: Operator, left: &Value, right: &Value) -> Result<bool> {
    let ord = left.partial_cmp(right);
    Ok(match operator {
        Operator::Equal => ord == Some(Ordering::Equal),
        Operator::NotEqual | Operator::LessGreater => ord != Some(Ordering::Equal),
        Operator::Less => ord == Some(Ordering::Less),
        Operator::Greater => ord == Some(Ordering::Greater),
        Operator::LessEqual => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
        Operator::GreaterEqual => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        op => return Err(Error::Operator(op.to_string())),
    })
}
