//! Projection and limit nodes that run inline inside a scan.

use rowstore_core::error::DbError;
use rowstore_core::schema::TupleSchema;
use rowstore_core::tuple::TupleRef;
use rowstore_core::types::{Value, ValueType};

use super::PlanObject;
use crate::expression::{Expression, ExpressionLoader};

/// One column of a projection's output schema.
#[derive(Debug)]
pub struct OutputColumn {
    pub name: String,
    pub expression: Box<dyn Expression>,
    /// Declared type, when the plan states one
    pub value_type: Option<ValueType>,
    pub size: Option<usize>,
}

/// Inline projection: output columns in output order.
#[derive(Debug)]
pub struct ProjectionInline {
    columns: Vec<OutputColumn>,
    /// Set when every output column is a plain column reference
    column_indices: Option<Vec<usize>>,
}

impl ProjectionInline {
    pub fn new(columns: Vec<OutputColumn>) -> Self {
        let column_indices = columns
            .iter()
            .map(|c| c.expression.column_index())
            .collect::<Option<Vec<usize>>>();
        Self {
            columns,
            column_indices,
        }
    }

    /// Reads `OUTPUT_SCHEMA`.
    pub fn load(plan: PlanObject<'_>, loader: &dyn ExpressionLoader) -> Result<Self, DbError> {
        let plan = plan.relabel("ProjectionPlanNode");
        let mut columns = Vec::new();
        for entry in plan.require_array("OUTPUT_SCHEMA")? {
            let column = PlanObject::from_value(plan.node(), entry)?;
            let value_type = match column.optional_str("VALUE_TYPE")? {
                Some(name) => Some(ValueType::from_name(name).ok_or_else(|| {
                    DbError::MalformedPlan(format!("{}: unknown VALUE_TYPE {}", plan.node(), name))
                })?),
                None => None,
            };
            let size = column
                .optional_i64("VALUE_SIZE")?
                .and_then(|s| usize::try_from(s).ok());
            columns.push(OutputColumn {
                name: column.require_str("COLUMN_NAME")?.to_string(),
                expression: loader.load(column.require_object("EXPRESSION")?)?,
                value_type,
                size,
            });
        }
        Ok(Self::new(columns))
    }

    pub fn columns(&self) -> &[OutputColumn] {
        &self.columns
    }

    /// Input column of each output column, when the projection only reorders
    /// or drops columns.
    pub fn column_indices(&self) -> Option<&[usize]> {
        self.column_indices.as_deref()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Schema of projected rows read from `input`. Every output column is
    /// nullable.
    pub fn output_schema(&self, input: &TupleSchema) -> Result<TupleSchema, DbError> {
        let mut types = Vec::with_capacity(self.columns.len());
        let mut sizes = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            let inferred = column.expression.output_type(input);
            let value_type = column
                .value_type
                .or(inferred.map(|(t, _)| t))
                .ok_or_else(|| {
                    DbError::Initialization(format!(
                        "cannot infer the type of output column '{}'",
                        column.name
                    ))
                })?;
            let size = match value_type.fixed_width() {
                Some(width) => width,
                None => column
                    .size
                    .or(inferred.map(|(_, s)| s))
                    .unwrap_or(rowstore_core::types::MAX_VARIABLE_LENGTH)
                    .max(1),
            };
            types.push(value_type);
            sizes.push(size);
        }
        TupleSchema::build(&types, &sizes, &vec![true; types.len()])
    }

    /// Materializes the output row.
    pub fn project(&self, tuple: &TupleRef<'_>, params: &[Value]) -> Result<Vec<Value>, DbError> {
        match &self.column_indices {
            Some(indices) => Ok(tuple.project(indices)),
            None => self
                .columns
                .iter()
                .map(|c| c.expression.eval(Some(tuple), params))
                .collect(),
        }
    }
}

/// Inline limit and offset, either literal or bound to parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitInline {
    /// -1 for no limit
    pub limit: i64,
    pub offset: i64,
    pub limit_param: Option<usize>,
    pub offset_param: Option<usize>,
}

impl Default for LimitInline {
    fn default() -> Self {
        Self {
            limit: -1,
            offset: 0,
            limit_param: None,
            offset_param: None,
        }
    }
}

impl LimitInline {
    pub fn load(plan: PlanObject<'_>) -> Result<Self, DbError> {
        let plan = plan.relabel("LimitPlanNode");
        // -1 marks an absent parameter index.
        let param = |key: &str| -> Result<Option<usize>, DbError> {
            Ok(plan
                .optional_i64(key)?
                .and_then(|idx| usize::try_from(idx).ok()))
        };
        Ok(Self {
            limit: plan.optional_i64("LIMIT")?.unwrap_or(-1),
            offset: plan.optional_i64("OFFSET")?.unwrap_or(0),
            limit_param: param("LIMIT_PARAM_IDX")?,
            offset_param: param("OFFSET_PARAM_IDX")?,
        })
    }

    /// Resolves `(limit, offset)` against the statement parameters.
    ///
    /// # Returns
    /// `Result<(Option<usize>, usize), DbError>`; a `None` limit means
    /// unbounded.
    pub fn resolve(&self, params: &[Value]) -> Result<(Option<usize>, usize), DbError> {
        let read = |idx: Option<usize>, literal: i64, what: &str| -> Result<i64, DbError> {
            match idx {
                Some(idx) => params
                    .get(idx)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        DbError::Expression(format!("{} parameter {} is not an integer", what, idx))
                    }),
                None => Ok(literal),
            }
        };
        let limit = read(self.limit_param, self.limit, "limit")?;
        let offset = read(self.offset_param, self.offset, "offset")?;
        if offset < 0 {
            return Err(DbError::Expression(format!("negative offset {}", offset)));
        }
        let limit = if limit < 0 { None } else { Some(limit as usize) };
        Ok((limit, offset as usize))
    }
}
