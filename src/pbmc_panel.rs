//! Built-in 25-marker PBMC spectral flow panel: the sample-processing chain
//! (Pre-Stain through Single, Viable Cells) followed by the Leukocytes
//! gating hierarchy with typical healthy-donor branch fractions.

use crate::population_tree::PopulationDef;

/// Typical fraction of cells surviving staining and permeabilization.
pub const DEFAULT_POST_STAIN: f64 = 0.35;
/// Typical fraction of stained cells acquired by the instrument.
pub const DEFAULT_EVENTS_ACQUIRED: f64 = 0.95;
/// Typical fraction of acquired events that are single, viable cells.
pub const DEFAULT_VIABLE_CELLS: f64 = 0.80;

/// Typical starting material from a healthy donor, cells per ml.
pub const DEFAULT_STARTING_CELLS: f64 = 2_500_000.0;
pub const MIN_STARTING_CELLS: f64 = 1_000_000.0;

/// The default panel as a definition list; feed it to
/// [`crate::population_tree::PopulationTree::new`] or use the prebuilt
/// [`crate::PBMC_PANEL`] static.
pub fn pbmc_panel() -> Vec<PopulationDef> {
    let mut defs = vec![
        PopulationDef::root("pre_stain", "Pre-Stain / Initial PBMCs"),
        PopulationDef::child("post_stain", "Post-Stain", "pre_stain", DEFAULT_POST_STAIN, 1.0),
        PopulationDef::child(
            "events_acquired",
            "Events Acquired",
            "post_stain",
            DEFAULT_EVENTS_ACQUIRED,
            1.0,
        ),
        PopulationDef::child(
            "viable_cells",
            "Single, Viable Cells",
            "events_acquired",
            DEFAULT_VIABLE_CELLS,
            1.0,
        ),
    ];

    // Gating hierarchy: (id, name, parent, fraction of parent)
    let gates: [(&str, &str, &str, f64); 44] = [
        ("leukocytes", "Leukocytes", "viable_cells", 1.0),
        ("non_granulocytes", "non-Granulocytes", "leukocytes", 0.75),
        ("basophil", "Basophil", "leukocytes", 0.25),
        ("t_cell", "T cell", "non_granulocytes", 0.7),
        ("b_cell", "B cell", "non_granulocytes", 0.15),
        ("non_t_non_b", "non-T non-B", "non_granulocytes", 0.15),
        ("gd_t_cell", "Gamma Delta T cell", "t_cell", 0.05),
        ("nkt_cell", "Natural Killer T cell", "t_cell", 0.03),
        (
            "non_gd_non_nkt",
            "non-Gamma Delta non-Natural Killer T cell",
            "t_cell",
            0.92,
        ),
        ("other_t", "Other T cell", "non_gd_non_nkt", 0.03),
        ("cd4_t_cell", "CD4 T cell", "non_gd_non_nkt", 0.65),
        ("cd8_t_cell", "CD8 T cell", "non_gd_non_nkt", 0.25),
        ("dp_t_cell", "Double Positive T cell", "non_gd_non_nkt", 0.02),
        ("dn_t_cell", "Double Negative T cell", "non_gd_non_nkt", 0.05),
        ("treg", "Treg", "cd4_t_cell", 0.08),
        ("cd4_non_treg", "CD4+ non-Treg", "cd4_t_cell", 0.92),
        ("cd4_t_naive", "CD4 T Naive", "cd4_non_treg", 0.35),
        ("cd4_t_cm", "CD4 T Central Memory", "cd4_non_treg", 0.35),
        ("cd4_t_em", "CD4 T Effector Memory", "cd4_non_treg", 0.25),
        ("cd4_temra", "CD4 TEMRA", "cd4_non_treg", 0.05),
        ("cd8_t_naive", "CD8 T Naive", "cd8_t_cell", 0.40),
        ("cd8_t_cm", "CD8 T Central Memory", "cd8_t_cell", 0.20),
        ("cd8_t_em", "CD8 T Effector Memory", "cd8_t_cell", 0.30),
        ("cd8_temra", "CD8 TEMRA", "cd8_t_cell", 0.10),
        ("naive_b", "Naive B cell", "b_cell", 0.60),
        ("memory_b", "Memory B cell", "b_cell", 0.30),
        ("mz_b", "Marginal Zone-like B cell", "b_cell", 0.08),
        ("plasmablast", "Plasmablast", "b_cell", 0.02),
        ("nk", "Natural Killer", "non_t_non_b", 0.70),
        ("non_nk", "non-Natural Killer", "non_t_non_b", 0.30),
        ("cytolytic_nk", "Cytolytic Natural Killer", "nk", 0.50),
        ("cytokine_nk", "Cytokine-producing Natural Killer", "nk", 0.30),
        ("non_cytolytic_nk", "Non-cytolytic Natural Killer", "nk", 0.20),
        ("monocyte", "Monocyte", "non_nk", 0.80),
        ("non_monocyte", "non-Monocyte", "non_nk", 0.20),
        ("classical_mono", "Classical monocyte", "monocyte", 0.80),
        ("non_classical_mono", "Non-classical monocyte", "monocyte", 0.12),
        ("intermediate_mono", "Intermediate monocyte", "monocyte", 0.08),
        ("dendritic", "Dendritic Cell", "non_monocyte", 1.0),
        ("pdc", "Plasmacytoid dendritic cell", "dendritic", 0.30),
        ("tdc", "Transitional dendritic cell", "dendritic", 0.20),
        ("cdc", "Conventional dendritic cell", "dendritic", 0.50),
        ("cdc1", "Type 1 conventional dendritic cell", "cdc", 0.50),
        ("cdc2", "Type 2 conventional dendritic cell", "cdc", 0.50),
    ];

    defs.extend(
        gates
            .iter()
            .map(|&(id, name, parent, fraction)| PopulationDef::child(id, name, parent, 1.0, fraction)),
    );
    defs
}
