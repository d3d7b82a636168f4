use std::collections::HashSet;

use crate::{
    error::Result,
    sql::{
        parser::ast::{self, Projection, Statement},
        plan::{Analysis, Complexity, ExecutionPlan, Operation},
    },
    storage::{StorageManager, engine::Backend},
};

const LARGE_TABLE_ROWS: usize = 10_000;
const WIDE_TABLE_COLUMNS: usize = 20;

/// Query planner - analyzes statements and derives execution plans.
///
/// Never mutates storage; the same statement against the same storage state
/// always yields the same analysis and plan.
pub struct Planner<'a, B: Backend> {
    storage: &'a StorageManager<B>,
    database: &'a str,
}

impl<'a, B: Backend> Planner<'a, B> {
    pub fn new(storage: &'a StorageManager<B>, database: &'a str) -> Self {
        Self { storage, database }
    }

    /// Estimates cost, complexity and expected row count of a statement
    pub fn analyze(&self, stmt: &Statement) -> Result<Analysis> {
        let mut analysis = Analysis::new(stmt.query_type(), stmt.table_name());
        let Some(table_name) = stmt.table_name() else {
            return Ok(analysis);
        };

        let exists = self.storage.table_exists(self.database, table_name)?;
        if let Statement::CreateTable { columns, .. } = stmt {
            if exists {
                analysis
                    .warnings
                    .push(format!("Table '{}' already exists", table_name));
                return Ok(analysis);
            }
            analyze_create(&mut analysis, columns);
            return Ok(analysis);
        }
        if !exists {
            analysis
                .warnings
                .push(format!("Table '{}' does not exist", table_name));
            return Ok(analysis);
        }

        let stats = self.storage.get_table_stats(self.database, table_name)?;
        let rows = stats.row_count;
        match stmt {
            Statement::Select {
                columns,
                where_clause,
                ..
            } => {
                let mut cost = rows as u64;
                if matches!(columns, Projection::All) {
                    analysis
                        .recommendations
                        .push("Consider selecting only needed columns instead of *".into());
                }
                match where_clause {
                    Some(cond) => {
                        let (complexity, extra) = select_filter_complexity(cond);
                        analysis.complexity = complexity;
                        cost += extra;
                        analysis.estimated_rows = Some(filtered_rows(rows));
                    }
                    None => {
                        analysis.complexity = Complexity::Simple;
                        analysis.recommendations.push(
                            "Full table scan - consider adding WHERE clause if filtering is needed"
                                .into(),
                        );
                        analysis.estimated_rows = Some(rows);
                    }
                }
                analysis.estimated_cost = Some(cost);
            }
            Statement::Insert { values, .. } => {
                analysis.complexity = Complexity::Simple;
                analysis.estimated_cost = Some(50);
                analysis.estimated_rows = Some(values.len());
                let expected = stats.column_count;
                if let Some(row) = values.iter().find(|row| row.len() != expected) {
                    analysis.warnings.push(format!(
                        "Column count mismatch: expected {}, got {}",
                        expected,
                        row.len()
                    ));
                }
                if rows > LARGE_TABLE_ROWS {
                    analysis
                        .recommendations
                        .push("Large table - consider batch inserts for better performance".into());
                }
            }
            Statement::Update {
                assignments,
                where_clause,
                ..
            } => {
                let mut cost = rows as u64 + 50;
                analysis.updated_columns = assignments.iter().map(|a| a.column.clone()).collect();
                match where_clause {
                    Some(cond) => {
                        let (complexity, extra) = filter_complexity(cond);
                        analysis.complexity = complexity;
                        cost += extra;
                        analysis.estimated_rows = Some(filtered_rows(rows));
                    }
                    None => {
                        analysis.complexity = Complexity::Moderate;
                        analysis
                            .warnings
                            .push("UPDATE without WHERE will modify all rows".into());
                        analysis.estimated_rows = Some(rows);
                    }
                }
                analysis.estimated_cost = Some(cost);
            }
            Statement::Delete { where_clause, .. } => {
                let mut cost = rows as u64 + 30;
                match where_clause {
                    Some(cond) => {
                        let (complexity, extra) = filter_complexity(cond);
                        analysis.complexity = complexity;
                        cost += extra;
                        analysis.estimated_rows = Some(filtered_rows(rows));
                    }
                    None => {
                        analysis.complexity = Complexity::Simple;
                        analysis
                            .warnings
                            .push("DELETE without WHERE will remove all rows (TRUNCATE)".into());
                        analysis
                            .recommendations
                            .push("Consider using TRUNCATE for better performance".into());
                        analysis.estimated_rows = Some(rows);
                    }
                }
                analysis.estimated_cost = Some(cost);
            }
            Statement::DropTable { .. } => {
                analysis.complexity = Complexity::Simple;
                analysis.estimated_cost = Some(10);
                analysis.estimated_rows = Some(rows);
            }
            _ => {}
        }
        analysis.table_stats = Some(stats);
        Ok(analysis)
    }

    /// Derives the ordered step list for a statement
    pub fn plan(&self, stmt: &Statement) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new(stmt.query_type());
        match stmt {
            Statement::Select {
                columns,
                table_name,
                where_clause,
            } => {
                let table = Some(table_name.as_str());
                plan.push(
                    Operation::TableScan,
                    format!("Scan table '{}'", table_name),
                    table,
                );
                if let Some(cond) = where_clause {
                    let description = if cond.is_compound() {
                        "Apply compound WHERE conditions".to_string()
                    } else {
                        format!("Filter: {}", cond)
                    };
                    plan.push(Operation::Filter, description, table);
                }
                if let Projection::Columns(names) = columns {
                    plan.push_with_columns(
                        Operation::Project,
                        format!("Select columns: {}", names.join(", ")),
                        table,
                        names.clone(),
                    );
                }
                plan.estimated_time = plan.steps.len() as u64 * 10;
            }
            Statement::Insert { table_name, .. } => {
                let table = Some(table_name.as_str());
                plan.push(
                    Operation::ValidateSchema,
                    "Validate column count and types".into(),
                    table,
                );
                plan.push(Operation::BuildRow, "Construct row object".into(), table);
                plan.push(
                    Operation::Write,
                    format!("Insert into '{}'", table_name),
                    table,
                );
                plan.estimated_time = 30;
            }
            Statement::Update {
                table_name,
                assignments,
                where_clause,
            } => {
                let table = Some(table_name.as_str());
                let columns: Vec<String> = assignments.iter().map(|a| a.column.clone()).collect();
                plan.push(
                    Operation::TableScan,
                    format!("Scan table '{}'", table_name),
                    table,
                );
                if where_clause.is_some() {
                    plan.push(Operation::Filter, "Filter rows matching WHERE".into(), table);
                }
                plan.push_with_columns(
                    Operation::Update,
                    format!("Update columns: {}", columns.join(", ")),
                    table,
                    columns,
                );
                plan.push(Operation::Write, "Write updated table to disk".into(), table);
                plan.estimated_time = plan.steps.len() as u64 * 15;
            }
            Statement::Delete {
                table_name,
                where_clause,
            } => {
                let table = Some(table_name.as_str());
                match where_clause {
                    None => {
                        plan.push(
                            Operation::Truncate,
                            format!("Truncate table '{}'", table_name),
                            table,
                        );
                        plan.estimated_time = 20;
                    }
                    Some(_) => {
                        plan.push(
                            Operation::TableScan,
                            format!("Scan table '{}'", table_name),
                            table,
                        );
                        plan.push(Operation::Filter, "Filter rows matching WHERE".into(), table);
                        plan.push(Operation::Delete, "Remove matching rows".into(), table);
                        plan.push(Operation::Write, "Write updated table to disk".into(), table);
                        plan.estimated_time = plan.steps.len() as u64 * 12;
                    }
                }
            }
            Statement::CreateTable {
                table_name,
                columns,
            } => {
                let table = Some(table_name.as_str());
                plan.push(
                    Operation::ValidateSchema,
                    format!("Validate {} column definitions", columns.len()),
                    table,
                );
                plan.push(
                    Operation::CreateFile,
                    format!("Create table file for '{}'", table_name),
                    table,
                );
                plan.push(Operation::WriteSchema, "Write schema metadata".into(), table);
                plan.estimated_time = 50;
            }
            _ => {}
        }
        plan
    }
}

fn analyze_create(analysis: &mut Analysis, columns: &[ast::Column]) {
    analysis.complexity = Complexity::Simple;
    analysis.estimated_cost = Some(100);
    analysis.column_count = Some(columns.len());
    if columns.len() > WIDE_TABLE_COLUMNS {
        analysis
            .recommendations
            .push("Large number of columns - consider normalizing the schema".into());
    }

    // names collide ignoring case, reported lower-cased
    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = Vec::new();
    for col in columns {
        let name = col.name.to_lowercase();
        if !seen.insert(name.clone()) && !duplicates.contains(&name) {
            duplicates.push(name);
        }
    }
    if !duplicates.is_empty() {
        analysis
            .warnings
            .push(format!("Duplicate column names: {}", duplicates.join(", ")));
    }
}

// A compound filter costs 10 per condition; a simple one costs nothing extra
fn filter_complexity(cond: &ast::Condition) -> (Complexity, u64) {
    if cond.is_compound() {
        (Complexity::Complex, 10 * cond.len() as u64)
    } else {
        (Complexity::Moderate, 0)
    }
}

// SELECT also charges a flat 10 for a simple filter
fn select_filter_complexity(cond: &ast::Condition) -> (Complexity, u64) {
    match filter_complexity(cond) {
        (Complexity::Moderate, _) => (Complexity::Moderate, 10),
        other => other,
    }
}

// floor(rows * 0.3)
fn filtered_rows(rows: usize) -> usize {
    rows * 3 / 10
}
