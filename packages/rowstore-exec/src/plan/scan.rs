//! Sequential and index scan plan nodes.

use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::trace;

use rowstore_core::error::DbError;
use rowstore_core::index::LookupType;

use super::inline::{LimitInline, ProjectionInline};
use super::{PlanNodeType, PlanObject};
use crate::expression::{Expression, ExpressionLoader};

/// Output order of an index scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
    /// Planner placeholder when order does not matter; scans ascending
    Invalid,
}

/// Index-specific part of an index scan node.
#[derive(Debug)]
pub struct IndexScanSpec {
    pub index_name: String,
    pub lookup_type: LookupType,
    pub search_keys: Vec<Box<dyn Expression>>,
    pub sort_direction: SortDirection,
}

impl IndexScanSpec {
    fn load(plan: PlanObject<'_>, loader: &dyn ExpressionLoader) -> Result<Self, DbError> {
        let lookup_type = match plan.optional_str("LOOKUP_TYPE")? {
            Some(name) => LookupType::from_name(name).ok_or_else(|| {
                DbError::MalformedPlan(format!("{}: unknown LOOKUP_TYPE {}", plan.node(), name))
            })?,
            None => LookupType::Eq,
        };
        let search_keys = plan
            .optional_array("SEARCHKEY_EXPRESSIONS")?
            .iter()
            .map(|v| loader.load(PlanObject::from_value(plan.node(), v)?))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            index_name: plan.require_str("TARGET_INDEX_NAME")?.to_string(),
            lookup_type,
            search_keys,
            sort_direction: plan.optional_parsed("SORT_DIRECTION")?.unwrap_or_default(),
        })
    }

    pub fn is_descending(&self) -> bool {
        self.sort_direction == SortDirection::Desc
    }
}

/// A scan over one table with its inline projection and limit.
#[derive(Debug)]
pub struct ScanPlanNode {
    pub id: i64,
    pub node_type: PlanNodeType,
    pub target_table_name: String,
    pub predicate: Option<Box<dyn Expression>>,
    pub projection: Option<ProjectionInline>,
    pub limit: Option<LimitInline>,
    /// Present exactly for index scans
    pub index: Option<IndexScanSpec>,
}

impl ScanPlanNode {
    /// Loads a `SEQSCAN` or `INDEXSCAN` node.
    ///
    /// # Arguments
    /// * `json` - The node description
    /// * `loader` - Builds the predicate, projection and search-key expressions
    ///
    /// # Returns
    /// `Result<ScanPlanNode, DbError>`; a missing required key fails with
    /// `MissingPlanField` naming it.
    pub fn load(json: &JsonValue, loader: &dyn ExpressionLoader) -> Result<Self, DbError> {
        let raw = PlanObject::from_value("ScanPlanNode", json)?;
        let node_type: PlanNodeType = raw.require_parsed("PLAN_NODE_TYPE")?;
        let plan = match node_type {
            PlanNodeType::SeqScan => raw.relabel("SeqScanPlanNode"),
            PlanNodeType::IndexScan => raw.relabel("IndexScanPlanNode"),
            other => {
                return Err(DbError::MalformedPlan(format!(
                    "expected a scan node, got {:?}",
                    other
                )))
            }
        };

        let target_table_name = plan.require_str("TARGET_TABLE_NAME")?.to_string();
        let predicate = match plan.optional_object("PREDICATE")? {
            Some(p) => Some(loader.load(p)?),
            None => None,
        };

        let mut projection = None;
        let mut limit = None;
        for inline in plan.optional_array("INLINE_NODES")? {
            let inline = PlanObject::from_value(plan.node(), inline)?;
            match inline.require_parsed::<PlanNodeType>("PLAN_NODE_TYPE")? {
                PlanNodeType::Projection => projection = Some(ProjectionInline::load(inline, loader)?),
                PlanNodeType::Limit => limit = Some(LimitInline::load(inline)?),
                other => {
                    return Err(DbError::MalformedPlan(format!(
                        "{}: {:?} cannot be inlined into a scan",
                        plan.node(),
                        other
                    )))
                }
            }
        }

        let index = match node_type {
            PlanNodeType::IndexScan => Some(IndexScanSpec::load(plan, loader)?),
            _ => None,
        };

        let node = Self {
            id: plan.optional_i64("ID")?.unwrap_or(0),
            node_type,
            target_table_name,
            predicate,
            projection,
            limit,
            index,
        };
        trace!(
            "Loaded {:?} node {} over '{}'",
            node.node_type,
            node.id,
            node.target_table_name
        );
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::BasicExpressionLoader;
    use serde_json::json;

    #[test]
    fn test_seq_scan_with_inline_nodes() {
        let plan = json!({
            "PLAN_NODE_TYPE": "SEQSCAN",
            "ID": 7,
            "TARGET_TABLE_NAME": "orders",
            "PREDICATE": {
                "TYPE": "COMPARE_GREATERTHAN",
                "LEFT": {"TYPE": "VALUE_TUPLE", "COLUMN_IDX": 0},
                "RIGHT": {"TYPE": "VALUE_CONSTANT", "VALUE_TYPE": "INTEGER", "VALUE": 3}
            },
            "INLINE_NODES": [
                {"PLAN_NODE_TYPE": "LIMIT", "LIMIT": 4, "OFFSET": 1},
                {"PLAN_NODE_TYPE": "PROJECTION", "OUTPUT_SCHEMA": [
                    {"COLUMN_NAME": "id", "EXPRESSION": {"TYPE": "VALUE_TUPLE", "COLUMN_IDX": 0}}
                ]}
            ]
        });
        let node = ScanPlanNode::load(&plan, &BasicExpressionLoader).unwrap();
        assert_eq!(node.id, 7);
        assert_eq!(node.node_type, PlanNodeType::SeqScan);
        assert_eq!(node.target_table_name, "orders");
        assert!(node.predicate.is_some());
        assert_eq!(node.limit.map(|l| (l.limit, l.offset)), Some((4, 1)));
        assert_eq!(node.projection.unwrap().column_indices(), Some(&[0][..]));
        assert!(node.index.is_none());
    }

    #[test]
    fn test_missing_target_table_names_the_key() {
        let plan = json!({"PLAN_NODE_TYPE": "SEQSCAN", "ID": 1});
        let err = ScanPlanNode::load(&plan, &BasicExpressionLoader).unwrap_err();
        assert_eq!(err.to_string(), "SeqScanPlanNode: can't find TARGET_TABLE_NAME value");

        let plan = json!({"TARGET_TABLE_NAME": "t"});
        let err = ScanPlanNode::load(&plan, &BasicExpressionLoader).unwrap_err();
        assert_eq!(err.to_string(), "ScanPlanNode: can't find PLAN_NODE_TYPE value");
    }

    #[test]
    fn test_index_scan_fields() {
        let plan = json!({
            "PLAN_NODE_TYPE": "INDEXSCAN",
            "TARGET_TABLE_NAME": "t",
            "TARGET_INDEX_NAME": "pk",
            "LOOKUP_TYPE": "GTE",
            "SORT_DIRECTION": "DESC",
            "SEARCHKEY_EXPRESSIONS": [{"TYPE": "VALUE_PARAMETER", "PARAM_IDX": 0}]
        });
        let node = ScanPlanNode::load(&plan, &BasicExpressionLoader).unwrap();
        let index = node.index.unwrap();
        assert_eq!(index.index_name, "pk");
        assert_eq!(index.lookup_type, LookupType::Gte);
        assert_eq!(index.search_keys.len(), 1);
        assert!(index.is_descending());

        let plan = json!({"PLAN_NODE_TYPE": "INDEXSCAN", "TARGET_TABLE_NAME": "t"});
        let err = ScanPlanNode::load(&plan, &BasicExpressionLoader).unwrap_err();
        assert_eq!(err.to_string(), "IndexScanPlanNode: can't find TARGET_INDEX_NAME value");
    }

    #[test]
    fn test_rejects_non_scan_nodes() {
        let plan = json!({"PLAN_NODE_TYPE": "DISTINCT", "TARGET_TABLE_NAME": "t"});
        assert!(matches!(
            ScanPlanNode::load(&plan, &BasicExpressionLoader),
            Err(DbError::MalformedPlan(_))
        ));
        let plan = json!({
            "PLAN_NODE_TYPE": "SEQSCAN",
            "TARGET_TABLE_NAME": "t",
            "INLINE_NODES": [{"PLAN_NODE_TYPE": "DISTINCT"}]
        });
        assert!(matches!(
            ScanPlanNode::load(&plan, &BasicExpressionLoader),
            Err(DbError::MalformedPlan(_))
        ));
    }
}
