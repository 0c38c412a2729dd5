use lazy_static::lazy_static;
use population_tree::PopulationTree;

pub mod error;
pub mod keeney;
pub mod pbmc_panel;
pub mod population_tree;
pub mod propagate;
pub mod reverse;
pub mod summary;

pub use error::{CalcError, TreeViolation};
pub use keeney::CvQuality;
pub use propagate::{propagate, AnnotatedNode, AnnotatedTree};
pub use reverse::{solve_reverse, ReverseSolution};
pub use summary::{summarize, SummaryRow};

lazy_static! {
    // Built-in PBMC panel: processing chain plus gating hierarchy
    pub static ref PBMC_PANEL: PopulationTree =
        PopulationTree::new(pbmc_panel::pbmc_panel()).expect("built-in PBMC panel is valid");
}
