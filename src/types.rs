/// One aligned sequence reported under a MotEvo site header.
///
/// All records produced from the same header share `motif`, `reference_promoter`,
/// `reference_binding_strand`, `motif_coordinates` and `posterior`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    pub motif: String,
    pub reference_promoter: String,
    /// `+` or `-`
    pub reference_binding_strand: String,
    /// 1-based `start-end` interval exactly as written by MotEvo
    pub motif_coordinates: String,
    pub posterior: f64,
    pub aligned_promoter: String,
    pub score: f64,
    pub binding_sequence: String,
}

/// One row of a MotEvo priors file.
///
/// A complete priors file yields three of these, labelled with the motif name,
/// `background` and `UFEwm`, in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorRecord {
    pub motif: String,
    pub final_prior: f64,
    pub nr_of_sites: f64,
    pub density: f64,
}

/// Column names of the DataFrame built from site records
pub const SITE_COLUMNS: [&str; 8] = [
    "motif",
    "reference_promoter",
    "reference_binding_strand",
    "motif_coordinates",
    "posterior",
    "aligned_promoter",
    "score",
    "binding_sequence",
];

/// Column names of the DataFrame built from prior records
pub const PRIOR_COLUMNS: [&str; 4] = ["motif", "final_prior", "nr_of_sites", "density"];
