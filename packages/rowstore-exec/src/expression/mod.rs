//! Expression evaluation consumed by executors.
//!
//! Executors only see [`Expression`] trait objects and build them through an
//! [`ExpressionLoader`]. [`BasicExpressionLoader`] covers column references,
//! constants, parameters, comparisons and conjunctions.

mod basic;

pub use basic::{
    BasicExpressionLoader, ComparisonExpression, ComparisonOp, ConjunctionExpression,
    ConjunctionOp, ConstantValueExpression, ParameterValueExpression, TupleValueExpression,
};

use std::fmt;

use rowstore_core::error::DbError;
use rowstore_core::schema::TupleSchema;
use rowstore_core::tuple::TupleRef;
use rowstore_core::types::{Value, ValueType};

use crate::plan::PlanObject;

/// Evaluable expression tree.
pub trait Expression: fmt::Debug {
    /// Evaluates against an optional input row and the statement parameters.
    fn eval(&self, tuple: Option<&TupleRef<'_>>, params: &[Value]) -> Result<Value, DbError>;

    /// Column read by a plain column reference.
    fn column_index(&self) -> Option<usize> {
        None
    }

    /// Result type and declared size when rows of `input` are evaluated.
    fn output_type(&self, input: &TupleSchema) -> Option<(ValueType, usize)>;
}

/// Builds expressions from their plan descriptions.
pub trait ExpressionLoader {
    fn load(&self, description: PlanObject<'_>) -> Result<Box<dyn Expression>, DbError>;
}
