//! Plan nodes loaded from structured plan descriptions.

mod description;
mod distinct;
mod inline;
mod scan;

pub use description::PlanObject;
pub use distinct::DistinctPlanNode;
pub use inline::{LimitInline, OutputColumn, ProjectionInline};
pub use scan::{IndexScanSpec, ScanPlanNode, SortDirection};

use serde::Deserialize;

/// Value of a node's `PLAN_NODE_TYPE` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanNodeType {
    SeqScan,
    IndexScan,
    Projection,
    Limit,
    Distinct,
}

impl PlanNodeType {
    pub fn is_scan(self) -> bool {
        matches!(self, PlanNodeType::SeqScan | PlanNodeType::IndexScan)
    }
}
