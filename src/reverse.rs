//! Reverse solver: given a target population and a desired CV, back-calculate
//! the starting cell count that makes the target statistically reliable.

use serde::Serialize;

use crate::error::CalcError;
use crate::keeney::required_count_for_cv;
use crate::population_tree::{NodeId, PopulationTree};
use crate::propagate::{propagate, AnnotatedTree};

/// Required cells at one step on the root-to-target path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRequirement {
    pub id: NodeId,
    /// Cumulative survival fraction from the root down to this node.
    pub fraction_of_initial: f64,
    pub required_count: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReverseSolution {
    pub required_initial_count: f64,
    /// Events needed at the target itself, `(100 / CV)²`.
    pub required_target_count: f64,
    /// Survival fraction from root to target.
    pub cumulative_fraction: f64,
    /// Root-to-target path with the required count at every step.
    pub steps: Vec<StepRequirement>,
    /// Forward propagation re-run with the solved initial count, so the
    /// returned tree reproduces the requested target CV.
    pub annotated: AnnotatedTree,
}

/// Solves for the minimum starting cell count that achieves
/// `target_cv_percent` at `target_id`, then re-runs forward propagation with
/// that count.
pub fn solve_reverse(
    tree: &PopulationTree,
    target_id: &str,
    target_cv_percent: f64,
) -> Result<ReverseSolution, CalcError> {
    let target = tree.get(target_id).ok_or_else(|| CalcError::NodeNotFound {
        id: target_id.to_string(),
    })?;
    let required_target_count = required_count_for_cv(target_cv_percent)?;

    // Collect the target-to-root chain, then flip it so the cumulative
    // product runs root-first.
    let mut chain = vec![target];
    let mut cur = target;
    while let Some(parent_id) = &cur.parent {
        // construction already resolved parents; re-check anyway since the
        // path product is the one numerically fragile spot
        let parent = tree
            .get(parent_id)
            .ok_or_else(|| CalcError::DegenerateTree {
                id: cur.id.clone(),
                detail: format!("unresolved parent '{parent_id}'"),
            })?;
        chain.push(parent);
        cur = parent;
    }
    chain.reverse();

    let mut cumulative = 1.0_f64;
    let mut steps = Vec::with_capacity(chain.len());
    for def in &chain {
        if def.parent.is_some() {
            for (field, value) in [
                ("step_efficiency", def.step_efficiency),
                ("branch_fraction", def.branch_fraction),
            ] {
                if !(value > 0.0 && value <= 1.0) {
                    return Err(CalcError::DegenerateTree {
                        id: def.id.clone(),
                        detail: format!("{field} {value} is outside (0, 1]"),
                    });
                }
            }
            cumulative *= def.step_efficiency * def.branch_fraction;
        }
        if !cumulative.is_finite() || cumulative <= 0.0 {
            return Err(CalcError::DegenerateTree {
                id: def.id.clone(),
                detail: format!("cumulative survival fraction reached {cumulative}"),
            });
        }
        steps.push((def.id.clone(), cumulative));
    }

    let required_initial_count = required_target_count / cumulative;
    let steps = steps
        .into_iter()
        .map(|(id, fraction_of_initial)| StepRequirement {
            id,
            fraction_of_initial,
            required_count: required_initial_count * fraction_of_initial,
        })
        .collect();

    let annotated = propagate(tree, required_initial_count)?;

    Ok(ReverseSolution {
        required_initial_count,
        required_target_count,
        cumulative_fraction: cumulative,
        steps,
        annotated,
    })
}
