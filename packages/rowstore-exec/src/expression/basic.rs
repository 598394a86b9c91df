//! Column, constant, parameter, comparison and conjunction expressions.

use std::cmp::Ordering;

use rowstore_core::error::DbError;
use rowstore_core::schema::TupleSchema;
use rowstore_core::tuple::TupleRef;
use rowstore_core::types::{Value, ValueType, MAX_VARIABLE_LENGTH};

use super::{Expression, ExpressionLoader};
use crate::plan::PlanObject;

/// Result type of comparisons and conjunctions.
fn boolean_type() -> (ValueType, usize) {
    (ValueType::TinyInt, 1)
}

fn natural_size(value_type: ValueType) -> usize {
    value_type.fixed_width().unwrap_or(MAX_VARIABLE_LENGTH)
}

/// Reads one column of the input row.
#[derive(Debug, Clone)]
pub struct TupleValueExpression {
    column: usize,
}

impl TupleValueExpression {
    pub fn new(column: usize) -> Self {
        Self { column }
    }
}

impl Expression for TupleValueExpression {
    fn eval(&self, tuple: Option<&TupleRef<'_>>, _params: &[Value]) -> Result<Value, DbError> {
        let tuple = tuple.ok_or_else(|| {
            DbError::Expression(format!("column {} read without an input row", self.column))
        })?;
        if self.column >= tuple.column_count() {
            return Err(DbError::Expression(format!(
                "column {} out of range ({} columns)",
                self.column,
                tuple.column_count()
            )));
        }
        Ok(tuple.get_value(self.column))
    }

    fn column_index(&self) -> Option<usize> {
        Some(self.column)
    }

    fn output_type(&self, input: &TupleSchema) -> Option<(ValueType, usize)> {
        input
            .get_column_info(self.column)
            .map(|c| (c.value_type, c.declared_size))
    }
}

#[derive(Debug, Clone)]
pub struct ConstantValueExpression {
    value: Value,
}

impl ConstantValueExpression {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Expression for ConstantValueExpression {
    fn eval(&self, _tuple: Option<&TupleRef<'_>>, _params: &[Value]) -> Result<Value, DbError> {
        Ok(self.value.clone())
    }

    fn output_type(&self, _input: &TupleSchema) -> Option<(ValueType, usize)> {
        let value_type = self.value.value_type();
        let size = match self.value.object() {
            Some(object) => object.len().max(1),
            None => natural_size(value_type),
        };
        Some((value_type, size))
    }
}

/// Statement parameter, optionally converted to a declared type.
#[derive(Debug, Clone)]
pub struct ParameterValueExpression {
    index: usize,
    value_type: Option<ValueType>,
}

impl ParameterValueExpression {
    pub fn new(index: usize, value_type: Option<ValueType>) -> Self {
        Self { index, value_type }
    }
}

impl Expression for ParameterValueExpression {
    fn eval(&self, _tuple: Option<&TupleRef<'_>>, params: &[Value]) -> Result<Value, DbError> {
        let value = params.get(self.index).ok_or_else(|| {
            DbError::Expression(format!(
                "parameter {} not bound ({} supplied)",
                self.index,
                params.len()
            ))
        })?;
        match self.value_type {
            Some(value_type) => value.coerce_to(value_type),
            None => Ok(value.clone()),
        }
    }

    fn output_type(&self, _input: &TupleSchema) -> Option<(ValueType, usize)> {
        self.value_type.map(|t| (t, natural_size(t)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl ComparisonOp {
    pub fn from_expression_type(name: &str) -> Option<Self> {
        Some(match name {
            "COMPARE_EQUAL" => ComparisonOp::Equal,
            "COMPARE_NOTEQUAL" => ComparisonOp::NotEqual,
            "COMPARE_LESSTHAN" => ComparisonOp::LessThan,
            "COMPARE_LESSTHANOREQUALTO" => ComparisonOp::LessThanOrEqual,
            "COMPARE_GREATERTHAN" => ComparisonOp::GreaterThan,
            "COMPARE_GREATERTHANOREQUALTO" => ComparisonOp::GreaterThanOrEqual,
            _ => return None,
        })
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessThanOrEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

/// SQL comparison; NULL on either side yields NULL.
#[derive(Debug)]
pub struct ComparisonExpression {
    op: ComparisonOp,
    left: Box<dyn Expression>,
    right: Box<dyn Expression>,
}

impl ComparisonExpression {
    pub fn new(op: ComparisonOp, left: Box<dyn Expression>, right: Box<dyn Expression>) -> Self {
        Self { op, left, right }
    }
}

impl Expression for ComparisonExpression {
    fn eval(&self, tuple: Option<&TupleRef<'_>>, params: &[Value]) -> Result<Value, DbError> {
        let left = self.left.eval(tuple, params)?;
        let right = self.right.eval(tuple, params)?;
        Ok(match left.compare_sql(&right)? {
            Some(ordering) => Value::boolean(self.op.holds(ordering)),
            None => Value::Null(ValueType::TinyInt),
        })
    }

    fn output_type(&self, _input: &TupleSchema) -> Option<(ValueType, usize)> {
        Some(boolean_type())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConjunctionOp {
    And,
    Or,
}

/// Three-valued AND / OR.
#[derive(Debug)]
pub struct ConjunctionExpression {
    op: ConjunctionOp,
    left: Box<dyn Expression>,
    right: Box<dyn Expression>,
}

impl ConjunctionExpression {
    pub fn new(op: ConjunctionOp, left: Box<dyn Expression>, right: Box<dyn Expression>) -> Self {
        Self { op, left, right }
    }
}

impl Expression for ConjunctionExpression {
    fn eval(&self, tuple: Option<&TupleRef<'_>>, params: &[Value]) -> Result<Value, DbError> {
        // Decisive value: false for AND, true for OR.
        let decisive = self.op == ConjunctionOp::Or;
        let left = self.left.eval(tuple, params)?;
        if !left.is_null() && left.is_true() == decisive {
            return Ok(Value::boolean(decisive));
        }
        let right = self.right.eval(tuple, params)?;
        if !right.is_null() && right.is_true() == decisive {
            return Ok(Value::boolean(decisive));
        }
        if left.is_null() || right.is_null() {
            return Ok(Value::Null(ValueType::TinyInt));
        }
        Ok(Value::boolean(!decisive))
    }

    fn output_type(&self, _input: &TupleSchema) -> Option<(ValueType, usize)> {
        Some(boolean_type())
    }
}

/// Loader for the expression types executors need.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicExpressionLoader;

impl BasicExpressionLoader {
    pub fn new() -> Self {
        Self
    }

    fn value_type(description: &PlanObject<'_>) -> Result<ValueType, DbError> {
        let name = description.require_str("VALUE_TYPE")?;
        ValueType::from_name(name).ok_or_else(|| {
            DbError::MalformedPlan(format!("{}: unknown VALUE_TYPE {}", description.node(), name))
        })
    }

    fn constant(description: &PlanObject<'_>) -> Result<Value, DbError> {
        let value_type = Self::value_type(description)?;
        let is_null = description
            .get("ISNULL")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if is_null {
            return Ok(Value::Null(value_type));
        }
        match value_type {
            ValueType::Double => {
                let raw = description.require("VALUE")?;
                raw.as_f64()
                    .or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
                    .map(Value::Double)
                    .ok_or_else(|| {
                        DbError::MalformedPlan(format!(
                            "{}: VALUE is not a number",
                            description.node()
                        ))
                    })
            }
            ValueType::Varchar => Ok(Value::varchar(description.require_str("VALUE")?)),
            ValueType::Varbinary => {
                let bytes = hex::decode(description.require_str("VALUE")?).map_err(|e| {
                    DbError::MalformedPlan(format!("{}: VALUE is not hex: {}", description.node(), e))
                })?;
                Ok(Value::varbinary(&bytes))
            }
            integral => Value::BigInt(description.require_i64("VALUE")?).coerce_to(integral),
        }
    }

    fn children(
        &self,
        description: &PlanObject<'_>,
    ) -> Result<(Box<dyn Expression>, Box<dyn Expression>), DbError> {
        let left = self.load(description.require_object("LEFT")?)?;
        let right = self.load(description.require_object("RIGHT")?)?;
        Ok((left, right))
    }
}

impl ExpressionLoader for BasicExpressionLoader {
    fn load(&self, description: PlanObject<'_>) -> Result<Box<dyn Expression>, DbError> {
        let description = description.relabel("Expression");
        let expression_type = description.require_str("TYPE")?;
        let expression: Box<dyn Expression> = match expression_type {
            "VALUE_TUPLE" => Box::new(TupleValueExpression::new(
                description.require_index("COLUMN_IDX")?,
            )),
            "VALUE_CONSTANT" => Box::new(ConstantValueExpression::new(Self::constant(&description)?)),
            "VALUE_PARAMETER" => {
                let value_type = if description.contains("VALUE_TYPE") {
                    Some(Self::value_type(&description)?)
                } else {
                    None
                };
                Box::new(ParameterValueExpression::new(
                    description.require_index("PARAM_IDX")?,
                    value_type,
                ))
            }
            "CONJUNCTION_AND" | "CONJUNCTION_OR" => {
                let op = if expression_type == "CONJUNCTION_AND" {
                    ConjunctionOp::And
                } else {
                    ConjunctionOp::Or
                };
                let (left, right) = self.children(&description)?;
                Box::new(ConjunctionExpression::new(op, left, right))
            }
            other => match ComparisonOp::from_expression_type(other) {
                Some(op) => {
                    let (left, right) = self.children(&description)?;
                    Box::new(ComparisonExpression::new(op, left, right))
                }
                None => {
                    return Err(DbError::MalformedPlan(format!(
                        "unsupported expression type {}",
                        other
                    )))
                }
            },
        };
        tracing::trace!("Loaded {} expression", expression_type);
        Ok(expression)
    }
}
