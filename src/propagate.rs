//! Forward propagation: project an initial cell count through the whole
//! population hierarchy and annotate every node with its expected count,
//! CV and quality tier.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::CalcError;
use crate::keeney::{cv_percent, CvQuality};
use crate::population_tree::{NodeId, PopulationTree};

/// A population with its projected count and counting statistics for one
/// calculation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedNode {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub step_efficiency: f64,
    pub branch_fraction: f64,
    /// Expectation value; fractional cells are kept, not rounded.
    pub expected_count: f64,
    /// `None` when the expected count reached zero and CV is unmeasurable.
    pub cv_percent: Option<f64>,
    pub quality: Option<CvQuality>,
}

/// Result of one forward run, nodes in pre-order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedTree {
    nodes: Vec<AnnotatedNode>,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

impl AnnotatedTree {
    pub fn nodes(&self) -> &[AnnotatedNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&AnnotatedNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn root(&self) -> &AnnotatedNode {
        &self.nodes[0]
    }
}

/// Projects `initial_count` cells through the tree. The root receives the
/// initial count; every other node receives
/// `parent × step_efficiency × branch_fraction`.
///
/// Pure and deterministic: identical inputs give bit-identical outputs, and
/// the input tree is never mutated.
pub fn propagate(tree: &PopulationTree, initial_count: f64) -> Result<AnnotatedTree, CalcError> {
    if !initial_count.is_finite() || initial_count <= 0.0 {
        return Err(CalcError::InvalidInput {
            value: initial_count,
        });
    }

    let mut nodes: Vec<AnnotatedNode> = Vec::with_capacity(tree.len());
    let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(tree.len());

    for def in tree.preorder() {
        let expected_count = match &def.parent {
            None => initial_count,
            Some(parent_id) => {
                // preorder guarantees the parent was already annotated
                let parent = &nodes[index[parent_id]];
                parent.expected_count * def.step_efficiency * def.branch_fraction
            }
        };

        // A count that underflowed to zero has no CV; record it as
        // unmeasurable and keep annotating the rest of the tree.
        let cv = cv_percent(expected_count).ok();
        let quality = cv.map(CvQuality::from_cv_percent);

        index.insert(def.id.clone(), nodes.len());
        nodes.push(AnnotatedNode {
            id: def.id.clone(),
            name: def.name.clone(),
            parent: def.parent.clone(),
            step_efficiency: def.step_efficiency,
            branch_fraction: def.branch_fraction,
            expected_count,
            cv_percent: cv,
            quality,
        });
    }

    Ok(AnnotatedTree { nodes, index })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population_tree::PopulationDef;

    fn example_tree() -> PopulationTree {
        PopulationTree::new(vec![
            PopulationDef::root("root", "Pre-Stain / Initial PBMCs"),
            PopulationDef::child("a", "Child A", "root", 0.8, 0.5),
            PopulationDef::child("b", "Child B", "root", 0.9, 0.25),
            PopulationDef::child("a1", "Grandchild A1", "a", 1.0, 0.1),
        ])
        .unwrap()
    }

    #[test]
    fn test_expected_counts_follow_parent_products() {
        let tree = example_tree();
        let annotated = propagate(&tree, 1_000_000.0).unwrap();

        assert_eq!(annotated.root().expected_count, 1_000_000.0);
        let a = annotated.get("a").unwrap();
        assert_eq!(a.expected_count, 400_000.0);
        let b = annotated.get("b").unwrap();
        assert_eq!(b.expected_count, 225_000.0);
        let a1 = annotated.get("a1").unwrap();
        assert_eq!(a1.expected_count, 40_000.0);

        // transitively, the full root-to-node product
        for node in annotated.nodes() {
            if let Some(parent_id) = &node.parent {
                let parent = annotated.get(parent_id).unwrap();
                assert_eq!(
                    node.expected_count,
                    parent.expected_count * node.step_efficiency * node.branch_fraction
                );
            }
        }
    }

    #[test]
    fn test_example_cv_and_quality() {
        let tree = example_tree();
        let annotated = propagate(&tree, 1_000_000.0).unwrap();
        let a = annotated.get("a").unwrap();
        let cv = a.cv_percent.unwrap();
        assert!((cv - 0.158).abs() < 1e-3);
        assert_eq!(a.quality, Some(CvQuality::Excellent));
    }

    #[test]
    fn test_nodes_are_in_preorder() {
        let tree = example_tree();
        let annotated = propagate(&tree, 1_000.0).unwrap();
        let order: Vec<&str> = annotated.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, ["root", "a", "a1", "b"]);
    }

    #[test]
    fn test_invalid_initial_count_rejected() {
        let tree = example_tree();
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = propagate(&tree, bad).unwrap_err();
            assert!(
                matches!(err, CalcError::InvalidInput { .. }),
                "initial count {bad}"
            );
        }
    }

    #[test]
    fn test_deterministic_across_runs() {
        let tree = example_tree();
        let first = propagate(&tree, 123_456.789).unwrap();
        let second = propagate(&tree, 123_456.789).unwrap();
        for (a, b) in first.nodes().iter().zip(second.nodes()) {
            assert_eq!(a.expected_count.to_bits(), b.expected_count.to_bits());
            assert_eq!(
                a.cv_percent.map(f64::to_bits),
                b.cv_percent.map(f64::to_bits)
            );
        }
    }

    #[test]
    fn test_underflowed_count_is_unmeasurable_but_siblings_survive() {
        let tree = PopulationTree::new(vec![
            PopulationDef::root("root", "Root"),
            PopulationDef::child("vanishing", "Vanishing", "root", 1e-300, 1e-300),
            PopulationDef::child("fine", "Fine", "root", 0.5, 1.0),
        ])
        .unwrap();
        let annotated = propagate(&tree, 1e-10).unwrap();

        let vanishing = annotated.get("vanishing").unwrap();
        assert_eq!(vanishing.expected_count, 0.0);
        assert_eq!(vanishing.cv_percent, None);
        assert_eq!(vanishing.quality, None);

        let fine = annotated.get("fine").unwrap();
        assert!(fine.cv_percent.is_some());
        assert_eq!(fine.quality, Some(CvQuality::VeryPoor));
    }
}
