//! Distinct plan node description.

use serde_json::Value as JsonValue;

use rowstore_core::error::DbError;

use super::PlanObject;
use crate::expression::{Expression, ExpressionLoader};

/// Distinct node: the expressions whose combined value must be unique.
#[derive(Debug)]
pub struct DistinctPlanNode {
    pub id: i64,
    pub expressions: Vec<Box<dyn Expression>>,
}

impl DistinctPlanNode {
    /// Reads `DISTINCT_EXPRESSION_CNT`, then `DISTINCT_EXPRESSION0` through
    /// `DISTINCT_EXPRESSION{n-1}`.
    pub fn load(json: &JsonValue, loader: &dyn ExpressionLoader) -> Result<Self, DbError> {
        let plan = PlanObject::from_value("DistinctPlanNode", json)?;
        let count = plan.require_index("DISTINCT_EXPRESSION_CNT")?;
        let mut expressions = Vec::with_capacity(count);
        for i in 0..count {
            let key = format!("DISTINCT_EXPRESSION{}", i);
            expressions.push(loader.load(plan.require_object(&key)?)?);
        }
        Ok(Self {
            id: plan.optional_i64("ID")?.unwrap_or(0),
            expressions,
        })
    }
}
