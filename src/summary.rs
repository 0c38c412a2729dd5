//! Flattens an annotated tree into one row per population, ready for
//! tabular export or hierarchical renderers (parent links + counts).

use serde::Serialize;

use crate::keeney::CvQuality;
use crate::population_tree::NodeId;
use crate::propagate::AnnotatedTree;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub step_efficiency: f64,
    pub branch_fraction: f64,
    /// `step_efficiency × branch_fraction × 100`; the root is 100 by
    /// definition.
    pub percent_of_parent: f64,
    pub expected_count: f64,
    pub cv_percent: Option<f64>,
    pub quality: Option<CvQuality>,
}

/// One row per node, in pre-order. Read-only over the annotated tree.
pub fn summarize(annotated: &AnnotatedTree) -> Vec<SummaryRow> {
    annotated
        .nodes()
        .iter()
        .map(|node| SummaryRow {
            id: node.id.clone(),
            name: node.name.clone(),
            parent: node.parent.clone(),
            step_efficiency: node.step_efficiency,
            branch_fraction: node.branch_fraction,
            percent_of_parent: if node.parent.is_none() {
                100.0
            } else {
                node.step_efficiency * node.branch_fraction * 100.0
            },
            expected_count: node.expected_count,
            cv_percent: node.cv_percent,
            quality: node.quality,
        })
        .collect()
}
