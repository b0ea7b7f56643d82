//! Compilation of [`Filter`]s into SQL clauses over a JSONB document column.

use super::{Error, Filter, Op, OpError, Value};

const EMPTY_CLAUSE: &str = "TRUE";

/// A bind parameter of a compiled clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Bound with its native SQL type
    Scalar(Value),
    /// Bound as a JSONB value
    Json(serde_json::Value),
}

pub struct CompiledClause {
    pub clause: String,
    pub values: Vec<Param>,
}

impl CompiledClause {
    pub fn new(clause: String, values: Vec<Param>) -> Self {
        Self { clause, values }
    }

    pub fn into_parts(self) -> (String, Vec<Param>) {
        (self.clause, self.values)
    }
}

pub trait CompileClause {
    fn compile_clause(&mut self, field: &str, op: &Op) -> Result<CompiledClause, Error>;
}

/// Maps expressions on fields of a JSONB column into SQL predicates.
///
/// Equality and membership compare JSONB values, so a text never equals a number.
/// Ordering only applies to numeric fields: documents holding anything else under the
/// field do not match, the cast is never attempted on them.
///
/// Bind placeholders are numbered sequentially starting from the value provided at
/// construction, so that the caller can reserve the first ones for its own parameters.
pub struct JsonbClauseCompiler {
    column: &'static str,
    next_placeholder: usize,
}

impl JsonbClauseCompiler {
    pub fn new(column: &'static str, first_placeholder: usize) -> Self {
        Self {
            column,
            next_placeholder: first_placeholder,
        }
    }

    fn placeholder(&mut self) -> String {
        let p = format!("${}", self.next_placeholder);
        self.next_placeholder += 1;
        p
    }

    /// JSONB accessor of `field`, required to be a valid identifier
    /// (see [`super::validate_field`]).
    fn element(&self, field: &str) -> String {
        format!("({}->'{}')", self.column, field)
    }

    fn json_type(&self, field: &str) -> String {
        format!("COALESCE(jsonb_typeof({}->'{}'), 'null')", self.column, field)
    }

    fn json_param(&mut self, field: &str, v: &Value) -> Result<(String, Param), Error> {
        let json = v.to_json().ok_or_else(|| Error::OpError {
            field: field.to_owned(),
            err: OpError::UnsupportedOperation,
        })?;
        Ok((format!("{}::jsonb", self.placeholder()), Param::Json(json)))
    }

    /// Wraps a numeric predicate so that it is only evaluated on numbers.
    fn numeric(&self, field: &str, predicate: String) -> String {
        format!(
            "CASE WHEN {} = 'number' THEN {predicate} ELSE FALSE END",
            self.json_type(field)
        )
    }

    fn ordering(&mut self, field: &str, symbol: &str, v: &Value) -> CompiledClause {
        let col = format!("({}->>'{}')::numeric", self.column, field);
        let predicate = format!("{col} {symbol} {}", self.placeholder());
        CompiledClause::new(self.numeric(field, predicate), vec![Param::Scalar(v.clone())])
    }
}

impl CompileClause for JsonbClauseCompiler {
    fn compile_clause(&mut self, field: &str, op: &Op) -> Result<CompiledClause, Error> {
        super::validate_field(field)?;

        let compiled = match op {
            Op::Eq(v) => {
                let (p, param) = self.json_param(field, v)?;
                CompiledClause::new(format!("{} = {p}", self.element(field)), vec![param])
            }
            Op::Neq(v) => {
                let (p, param) = self.json_param(field, v)?;
                CompiledClause::new(
                    format!(
                        "{} IN ('number', 'string', 'boolean') AND {} <> {p}",
                        self.json_type(field),
                        self.element(field)
                    ),
                    vec![param],
                )
            }
            Op::Lt(v) => self.ordering(field, "<", v),
            Op::Leq(v) => self.ordering(field, "<=", v),
            Op::Gt(v) => self.ordering(field, ">", v),
            Op::Geq(v) => self.ordering(field, ">=", v),
            Op::Between(range) => {
                let col = format!("({}->>'{}')::numeric", self.column, field);
                let min = self.placeholder();
                let max = self.placeholder();
                CompiledClause::new(
                    self.numeric(field, format!("{col} BETWEEN {min} AND {max}")),
                    vec![
                        Param::Scalar(range.min.clone()),
                        Param::Scalar(range.max.clone()),
                    ],
                )
            }
            Op::In(items) => {
                if items.is_empty() {
                    return Err(Error::OpError {
                        field: field.to_owned(),
                        err: OpError::EmptySet,
                    });
                }
                let mut placeholders = Vec::with_capacity(items.len());
                let mut params = Vec::with_capacity(items.len());
                for v in items {
                    let (p, param) = self.json_param(field, v)?;
                    placeholders.push(p);
                    params.push(param);
                }
                CompiledClause::new(
                    format!("{} IN ({})", self.element(field), placeholders.join(", ")),
                    params,
                )
            }
            Op::Ex => CompiledClause::new(format!("{} <> 'null'", self.json_type(field)), Vec::new()),
            Op::Nex => CompiledClause::new(format!("{} = 'null'", self.json_type(field)), Vec::new()),
        };

        Ok(compiled)
    }
}

#[derive(Debug)]
pub struct CompilerResult {
    pub clauses: Vec<String>,
    pub values: Vec<Param>,
}

impl CompilerResult {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Joins all clauses in a single conjunction.
    pub fn conjunction(&self) -> String {
        if self.is_unfiltered() {
            return EMPTY_CLAUSE.to_owned();
        }
        self.clauses
            .iter()
            .map(|c| format!("({c})"))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

pub struct ClausesCompiler {
    result: CompilerResult,
    error: Option<Error>,
}

impl Default for ClausesCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ClausesCompiler {
    pub fn new() -> Self {
        Self {
            result: CompilerResult::new(),
            error: None,
        }
    }

    pub fn expr<F>(mut self, field: &str, op: &Op, mapper: &mut F) -> Self
    where
        F: CompileClause,
    {
        if self.error.is_some() {
            return self;
        }

        match mapper.compile_clause(field, op) {
            Ok(compiled) => {
                let (clause, mut values) = compiled.into_parts();
                self.result.clauses.push(clause);
                self.result.values.append(&mut values);
            }
            Err(err) => self.error = Some(err),
        }

        self
    }

    pub fn filter<F>(mut self, filter: &Filter, mapper: &mut F) -> Self
    where
        F: CompileClause,
    {
        for expr in filter.exprs() {
            self = self.expr(expr.field(), expr.op(), mapper);
        }
        self
    }

    pub fn compile(self) -> Result<CompilerResult, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self.result)
    }
}
