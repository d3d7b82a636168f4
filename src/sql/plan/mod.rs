use std::fmt::Display;

use crate::storage::TableStats;

use super::parser::ast::QueryType;

mod planner;

pub use planner::Planner;

/// Rough cost bucket of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

impl Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Complexity::Simple => "SIMPLE",
            Complexity::Moderate => "MODERATE",
            Complexity::Complex => "COMPLEX",
        })
    }
}

/// Static analysis of a statement against the current table statistics.
///
/// When the target table is missing (anything but CREATE), the analysis
/// carries a single warning and no cost figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub query_type: QueryType,
    pub table: Option<String>,
    pub complexity: Complexity,
    pub estimated_cost: Option<u64>,
    pub estimated_rows: Option<usize>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub table_stats: Option<TableStats>,
    /// Target columns of an UPDATE
    pub updated_columns: Vec<String>,
    /// Column count of a CREATE TABLE
    pub column_count: Option<usize>,
}

impl Analysis {
    fn new(query_type: QueryType, table: Option<&str>) -> Self {
        Self {
            query_type,
            table: table.map(str::to_string),
            complexity: Complexity::Simple,
            estimated_cost: None,
            estimated_rows: None,
            warnings: Vec::new(),
            recommendations: Vec::new(),
            table_stats: None,
            updated_columns: Vec::new(),
            column_count: None,
        }
    }
}

/// Kind of work one plan step performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    TableScan,
    Filter,
    Project,
    ValidateSchema,
    BuildRow,
    Write,
    Update,
    Delete,
    Truncate,
    CreateFile,
    WriteSchema,
}

impl Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operation::TableScan => "TABLE_SCAN",
            Operation::Filter => "FILTER",
            Operation::Project => "PROJECT",
            Operation::ValidateSchema => "VALIDATE_SCHEMA",
            Operation::BuildRow => "BUILD_ROW",
            Operation::Write => "WRITE",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
            Operation::Truncate => "TRUNCATE",
            Operation::CreateFile => "CREATE_FILE",
            Operation::WriteSchema => "WRITE_SCHEMA",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanStep {
    /// 1-based position in the plan
    pub order: usize,
    pub operation: Operation,
    pub description: String,
    pub table: Option<String>,
    pub columns: Vec<String>,
}

/// Ordered list of abstract steps for a statement
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub query_type: QueryType,
    pub steps: Vec<PlanStep>,
    /// Abstract time units, not milliseconds
    pub estimated_time: u64,
}

impl ExecutionPlan {
    fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            steps: Vec::new(),
            estimated_time: 0,
        }
    }

    fn push(&mut self, operation: Operation, description: String, table: Option<&str>) {
        self.push_with_columns(operation, description, table, Vec::new());
    }

    fn push_with_columns(
        &mut self,
        operation: Operation,
        description: String,
        table: Option<&str>,
        columns: Vec<String>,
    ) {
        self.steps.push(PlanStep {
            order: self.steps.len() + 1,
            operation,
            description,
            table: table.map(str::to_string),
            columns,
        });
    }
}
