use crate::{
    error::{Error, Result},
    sql::{
        engine::Session,
        executor::{Executor, Explanation, ResultSet, check_columns, evaluate},
        parser::ast::{Condition, Projection, Statement},
        types::Value,
    },
    storage::engine::Backend,
};

/// SELECT executor: scan, optional filter, optional projection
pub struct Select {
    table_name: String,
    columns: Projection,
    where_clause: Option<Condition>,
}

impl Select {
    pub fn new(table_name: String, columns: Projection, where_clause: Option<Condition>) -> Box<Self> {
        Box::new(Self {
            table_name,
            columns,
            where_clause,
        })
    }
}

impl<B: Backend> Executor<B> for Select {
    fn execute(self: Box<Self>, session: &mut Session<B>) -> Result<ResultSet> {
        let db = session.current_database();
        let storage = session.storage();
        if !storage.table_exists(db, &self.table_name)? {
            return Err(Error::NotFound(format!(
                "Table '{}' does not exist",
                self.table_name
            )));
        }
        let table = storage.get_table(db, &self.table_name)?;
        let schema = &table.schema;

        // unknown columns fail even when no row would reach them
        if let Some(cond) = &self.where_clause {
            check_columns(cond, schema)?;
        }
        let projection = match &self.columns {
            Projection::All => None,
            Projection::Columns(names) => Some(
                names
                    .iter()
                    .map(|name| schema.get_col_index(name))
                    .collect::<Result<Vec<_>>>()?,
            ),
        };

        let mut rows = Vec::new();
        for row in &table.rows {
            if let Some(cond) = &self.where_clause {
                if !evaluate(cond, schema, row)? {
                    continue;
                }
            }
            rows.push(match &projection {
                None => row.clone(),
                Some(indexes) => indexes
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or(Value::Null))
                    .collect(),
            });
        }

        let columns = match self.columns {
            Projection::All => schema.column_names(),
            Projection::Columns(names) => names,
        };
        Ok(ResultSet::Scan { columns, rows })
    }
}

pub(super) fn explain(stmt: &Statement, explanation: &mut Explanation) {
    let Statement::Select {
        columns,
        table_name,
        where_clause,
    } = stmt
    else {
        return;
    };

    explanation.step(
        "TABLE_SCAN",
        format!("Scan all rows from table '{}'", table_name),
    );
    match where_clause {
        Some(cond) if cond.is_compound() => explanation.step(
            "FILTER_COMPOUND",
            format!("Apply compound WHERE conditions ({} conditions)", cond.len()),
        ),
        Some(cond) => explanation.step("FILTER", format!("Filter rows where {}", cond)),
        None => {}
    }
    if let Projection::Columns(names) = columns {
        explanation.step("PROJECT", format!("Select columns: {}", names.join(", ")));
    }
}
