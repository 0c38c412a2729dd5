//! Hierarchical population model for a flow cytometry gating/processing tree.
//!
//! Nodes live in a flat arena (`Vec`), with parent/child links kept as
//! indices. The tree is validated once at construction and immutable
//! afterwards, so a single definition can back any number of forward or
//! reverse calculation runs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{CalcError, TreeViolation};

pub type NodeId = String;

fn default_fraction() -> f64 {
    1.0
}

/// One population as supplied by the caller: either the starting material
/// (no parent) or a sub-population derived from its parent by a processing
/// step and a gating split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationDef {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub parent: Option<NodeId>,
    /// Fraction of cells entering this step that survive it, in (0, 1].
    #[serde(default = "default_fraction")]
    pub step_efficiency: f64,
    /// Fraction of the parent's surviving cells gated into this
    /// sub-population, in (0, 1]. Siblings need not sum to 1.
    #[serde(default = "default_fraction")]
    pub branch_fraction: f64,
}

impl PopulationDef {
    pub fn root(id: &str, name: &str) -> Self {
        PopulationDef {
            id: id.to_string(),
            name: name.to_string(),
            parent: None,
            step_efficiency: 1.0,
            branch_fraction: 1.0,
        }
    }

    pub fn child(
        id: &str,
        name: &str,
        parent: &str,
        step_efficiency: f64,
        branch_fraction: f64,
    ) -> Self {
        PopulationDef {
            id: id.to_string(),
            name: name.to_string(),
            parent: Some(parent.to_string()),
            step_efficiency,
            branch_fraction,
        }
    }
}

/// A validated, immutable population hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationTree {
    defs: Vec<PopulationDef>,
    index: HashMap<NodeId, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    root: usize,
}

impl PopulationTree {
    /// Builds a tree from definitions, checking every structural invariant.
    /// All violations are collected and reported together so the caller can
    /// fix the definition in one pass.
    pub fn new(defs: Vec<PopulationDef>) -> Result<Self, CalcError> {
        let mut violations = Vec::new();

        let mut index: HashMap<NodeId, usize> = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if index.insert(def.id.clone(), i).is_some() {
                violations.push(TreeViolation::DuplicateId { id: def.id.clone() });
            }
        }

        for def in &defs {
            for (field, value) in [
                ("step_efficiency", def.step_efficiency),
                ("branch_fraction", def.branch_fraction),
            ] {
                // Also rejects NaN, which fails every comparison.
                if !(value > 0.0 && value <= 1.0) {
                    violations.push(TreeViolation::OutOfRange {
                        id: def.id.clone(),
                        field,
                        value,
                    });
                }
            }
        }

        let mut parents: Vec<Option<usize>> = Vec::with_capacity(defs.len());
        for def in &defs {
            match &def.parent {
                None => parents.push(None),
                Some(parent_id) => match index.get(parent_id) {
                    Some(&pi) => parents.push(Some(pi)),
                    None => {
                        violations.push(TreeViolation::DanglingParent {
                            id: def.id.clone(),
                            parent: parent_id.clone(),
                        });
                        parents.push(None);
                    }
                },
            }
        }

        let roots: Vec<usize> = defs
            .iter()
            .enumerate()
            .filter(|(_, def)| def.parent.is_none())
            .map(|(i, _)| i)
            .collect();
        match roots.len() {
            0 => violations.push(TreeViolation::NoRoot),
            1 => {}
            _ => violations.push(TreeViolation::MultipleRoots {
                ids: roots.iter().map(|&i| defs[i].id.clone()).collect(),
            }),
        }

        Self::find_cycles(&defs, &parents, &mut violations);

        if !violations.is_empty() {
            return Err(CalcError::InvalidTree(violations));
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); defs.len()];
        for (i, parent) in parents.iter().enumerate() {
            if let Some(pi) = *parent {
                children[pi].push(i); // insertion order is display order
            }
        }

        let root = roots[0];
        Ok(PopulationTree {
            defs,
            index,
            parents,
            children,
            root,
        })
    }

    // Follows parent links from every node, three-state marking: a node
    // revisited while still on the current walk closes a cycle.
    fn find_cycles(
        defs: &[PopulationDef],
        parents: &[Option<usize>],
        violations: &mut Vec<TreeViolation>,
    ) {
        const UNSEEN: u8 = 0;
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;
        let mut state = vec![UNSEEN; defs.len()];
        for start in 0..defs.len() {
            if state[start] != UNSEEN {
                continue;
            }
            let mut path = Vec::new();
            let mut cur = start;
            loop {
                if state[cur] == ON_PATH {
                    violations.push(TreeViolation::Cycle {
                        id: defs[cur].id.clone(),
                    });
                    break;
                }
                if state[cur] == DONE {
                    break;
                }
                state[cur] = ON_PATH;
                path.push(cur);
                match parents[cur] {
                    Some(next) => cur = next,
                    None => break,
                }
            }
            for i in path {
                state[i] = DONE;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn root(&self) -> &PopulationDef {
        &self.defs[self.root]
    }

    pub fn get(&self, id: &str) -> Option<&PopulationDef> {
        self.index.get(id).map(|&i| &self.defs[i])
    }

    pub fn parent_of(&self, id: &str) -> Option<&PopulationDef> {
        let i = *self.index.get(id)?;
        self.parents[i].map(|pi| &self.defs[pi])
    }

    pub fn children_of(&self, id: &str) -> Vec<&PopulationDef> {
        match self.index.get(id) {
            Some(&i) => self.children[i].iter().map(|&ci| &self.defs[ci]).collect(),
            None => Vec::new(),
        }
    }

    /// Definitions in input order, suitable for serialization round-trips.
    pub fn defs(&self) -> &[PopulationDef] {
        &self.defs
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.defs.iter().map(|def| def.id.as_str())
    }

    /// Deterministic parent-before-children traversal. Propagation relies on
    /// a parent's computed count being available before its children.
    pub fn preorder(&self) -> Vec<&PopulationDef> {
        let mut out = Vec::with_capacity(self.defs.len());
        let mut stack = vec![self.root];
        while let Some(i) = stack.pop() {
            out.push(&self.defs[i]);
            // reversed so the first child is visited first
            for &ci in self.children[i].iter().rev() {
                stack.push(ci);
            }
        }
        out
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let defs: Vec<PopulationDef> = serde_json::from_reader(reader)?;
        Ok(Self::new(defs)?)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &self.defs)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_defs() -> Vec<PopulationDef> {
        vec![
            PopulationDef::root("pre_stain", "Pre-Stain / Initial PBMCs"),
            PopulationDef::child("viable", "Single, Viable Cells", "pre_stain", 0.8, 1.0),
            PopulationDef::child("t_cell", "T cell", "viable", 1.0, 0.7),
            PopulationDef::child("b_cell", "B cell", "viable", 1.0, 0.15),
        ]
    }

    #[test]
    fn test_valid_tree_builds() {
        let tree = PopulationTree::new(small_defs()).unwrap();
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.root().id, "pre_stain");
        assert_eq!(tree.parent_of("t_cell").unwrap().id, "viable");
        let children: Vec<&str> = tree
            .children_of("viable")
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(children, ["t_cell", "b_cell"]);
    }

    #[test]
    fn test_preorder_visits_parents_first() {
        let tree = PopulationTree::new(small_defs()).unwrap();
        let order: Vec<&str> = tree.preorder().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(order, ["pre_stain", "viable", "t_cell", "b_cell"]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut defs = small_defs();
        defs.push(PopulationDef::child("t_cell", "T cell again", "viable", 1.0, 0.1));
        let err = PopulationTree::new(defs).unwrap_err();
        match err {
            CalcError::InvalidTree(violations) => {
                assert!(violations.contains(&TreeViolation::DuplicateId {
                    id: "t_cell".to_string()
                }));
            }
            other => panic!("expected InvalidTree, got {other:?}"),
        }
    }

    #[test]
    fn test_dangling_parent_rejected() {
        let mut defs = small_defs();
        defs.push(PopulationDef::child("nk", "NK cell", "no_such_node", 1.0, 0.1));
        let err = PopulationTree::new(defs).unwrap_err();
        match err {
            CalcError::InvalidTree(violations) => {
                assert!(violations.contains(&TreeViolation::DanglingParent {
                    id: "nk".to_string(),
                    parent: "no_such_node".to_string(),
                }));
            }
            other => panic!("expected InvalidTree, got {other:?}"),
        }
    }

    #[test]
    fn test_self_referential_parent_rejected() {
        let mut defs = small_defs();
        defs.push(PopulationDef::child("loop", "Loop", "loop", 1.0, 0.5));
        let err = PopulationTree::new(defs).unwrap_err();
        match err {
            CalcError::InvalidTree(violations) => {
                assert!(violations.contains(&TreeViolation::Cycle {
                    id: "loop".to_string()
                }));
            }
            other => panic!("expected InvalidTree, got {other:?}"),
        }
    }

    #[test]
    fn test_two_node_cycle_rejected() {
        let mut defs = small_defs();
        defs.push(PopulationDef::child("a", "A", "b", 1.0, 0.5));
        defs.push(PopulationDef::child("b", "B", "a", 1.0, 0.5));
        let err = PopulationTree::new(defs).unwrap_err();
        match err {
            CalcError::InvalidTree(violations) => {
                assert!(violations
                    .iter()
                    .any(|v| matches!(v, TreeViolation::Cycle { .. })));
            }
            other => panic!("expected InvalidTree, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_roots_rejected() {
        let mut defs = small_defs();
        defs.push(PopulationDef::root("second_root", "Another root"));
        let err = PopulationTree::new(defs).unwrap_err();
        match err {
            CalcError::InvalidTree(violations) => {
                assert!(violations.contains(&TreeViolation::MultipleRoots {
                    ids: vec!["pre_stain".to_string(), "second_root".to_string()],
                }));
            }
            other => panic!("expected InvalidTree, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_fractions_rejected() {
        for bad in [0.0, -0.1, 1.0001, f64::NAN] {
            let mut defs = small_defs();
            defs.push(PopulationDef::child("bad", "Bad", "viable", bad, 0.5));
            let err = PopulationTree::new(defs).unwrap_err();
            match err {
                CalcError::InvalidTree(violations) => {
                    assert!(
                        violations.iter().any(|v| matches!(
                            v,
                            TreeViolation::OutOfRange {
                                field: "step_efficiency",
                                ..
                            }
                        )),
                        "value {bad} should be out of range"
                    );
                }
                other => panic!("expected InvalidTree, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_json_file_roundtrip() -> Result<()> {
        let tree = PopulationTree::new(small_defs())?;
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("panel.json");
        tree.to_json_file(&path)?;
        let restored = PopulationTree::from_json_file(&path)?;
        assert_eq!(restored.defs(), tree.defs());
        Ok(())
    }

    #[test]
    fn test_serde_defaults_for_omitted_fractions() {
        let json = r#"[{"id": "root", "name": "Root"},
                       {"id": "kid", "name": "Kid", "parent": "root",
                        "step_efficiency": 0.5}]"#;
        let defs: Vec<PopulationDef> = serde_json::from_str(json).unwrap();
        let tree = PopulationTree::new(defs).unwrap();
        assert_eq!(tree.get("kid").unwrap().branch_fraction, 1.0);
        assert_eq!(tree.root().step_efficiency, 1.0);
    }
}
