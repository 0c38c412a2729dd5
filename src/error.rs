use itertools::Itertools;
use std::error::Error;
use std::fmt;

use crate::population_tree::NodeId;

/// A single structural problem found while validating a population tree.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeViolation {
    DuplicateId {
        id: NodeId,
    },
    DanglingParent {
        id: NodeId,
        parent: NodeId,
    },
    Cycle {
        id: NodeId,
    },
    NoRoot,
    MultipleRoots {
        ids: Vec<NodeId>,
    },
    OutOfRange {
        id: NodeId,
        field: &'static str,
        value: f64,
    },
}

impl fmt::Display for TreeViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TreeViolation::DuplicateId { id } => write!(f, "duplicate population id '{id}'"),
            TreeViolation::DanglingParent { id, parent } => {
                write!(f, "population '{id}' references unknown parent '{parent}'")
            }
            TreeViolation::Cycle { id } => {
                write!(f, "population '{id}' is part of a parent cycle")
            }
            TreeViolation::NoRoot => write!(f, "no root population (every node has a parent)"),
            TreeViolation::MultipleRoots { ids } => {
                write!(
                    f,
                    "multiple root populations: {}",
                    ids.iter().map(|id| format!("'{id}'")).join(", ")
                )
            }
            TreeViolation::OutOfRange { id, field, value } => {
                write!(f, "population '{id}': {field} {value} is outside (0, 1]")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalcError {
    /// The tree definition itself is broken; nothing can be calculated
    /// until the caller fixes it.
    InvalidTree(Vec<TreeViolation>),
    /// A non-positive or non-finite cell quantity was supplied.
    InvalidInput { value: f64 },
    /// CV is undefined for a zero or negative expected count.
    UndefinedCv { count: f64 },
    /// A non-positive target CV was requested.
    InvalidTarget { target_cv_percent: f64 },
    NodeNotFound { id: NodeId },
    /// The cumulative survival fraction to the target collapsed to zero
    /// or an ancestor carried an out-of-range factor.
    DegenerateTree { id: NodeId, detail: String },
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CalcError::InvalidTree(violations) => {
                write!(
                    f,
                    "invalid population tree: {}",
                    violations.iter().map(|v| v.to_string()).join("; ")
                )
            }
            CalcError::InvalidInput { value } => {
                write!(f, "expected a positive, finite cell count, got {value}")
            }
            CalcError::UndefinedCv { count } => {
                write!(f, "CV is undefined for an expected count of {count}")
            }
            CalcError::InvalidTarget { target_cv_percent } => {
                write!(f, "target CV must be positive, got {target_cv_percent}%")
            }
            CalcError::NodeNotFound { id } => write!(f, "no population with id '{id}'"),
            CalcError::DegenerateTree { id, detail } => {
                write!(f, "degenerate survival path at '{id}': {detail}")
            }
        }
    }
}

impl Error for CalcError {}
