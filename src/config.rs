use crate::error::{MotevoError, Result};
use crate::pwm::{count_wm_positions, wm_name};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// MotEvo run mode (`Mode` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Predict binding sites (`TFBS`)
    #[default]
    Tfbs,
    /// Refine the weight matrix (`WMREF`)
    Wmref,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Tfbs => write!(f, "TFBS"),
            Mode::Wmref => write!(f, "WMREF"),
        }
    }
}

impl FromStr for Mode {
    type Err = MotevoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TFBS" => Ok(Mode::Tfbs),
            "WMREF" => Ok(Mode::Wmref),
            _ => Err(MotevoError::invalid_parameter(
                "mode",
                s,
                "expected TFBS or WMREF",
            )),
        }
    }
}

/// Length of the UFE weight matrix (`UFEwmlen` parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UfeLength {
    /// Use the number of positions of the motif weight matrix
    Auto,
    Positions(usize),
}

impl FromStr for UfeLength {
    type Err = MotevoError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(UfeLength::Auto);
        }
        s.parse::<usize>()
            .map(UfeLength::Positions)
            .map_err(|_| {
                MotevoError::invalid_parameter("ufe_wm_len", s, "expected `auto` or a length")
            })
    }
}

/// How often the MotEvo invocation is attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retry {
    /// A single attempt, whatever its outcome
    #[default]
    Once,
    /// Re-run until the tool exits with 0 and both output files exist
    UntilSuccess,
}

/// Background nucleotide frequencies (`bg A/C/G/T` parameters)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundFrequencies {
    pub a: f64,
    pub c: f64,
    pub g: f64,
    pub t: f64,
}

impl Default for BackgroundFrequencies {
    fn default() -> Self {
        BackgroundFrequencies {
            a: 0.25,
            c: 0.25,
            g: 0.25,
            t: 0.25,
        }
    }
}

impl BackgroundFrequencies {
    pub fn new(a: f64, c: f64, g: f64, t: f64) -> Self {
        BackgroundFrequencies { a, c, g, t }
    }

    /// Frequencies in A, C, G, T order
    pub fn as_array(&self) -> [f64; 4] {
        [self.a, self.c, self.g, self.t]
    }

    /// Checks that every frequency is a probability and that they sum to one
    pub fn validate(&self) -> Result<()> {
        for (base, value) in ["A", "C", "G", "T"].iter().zip(self.as_array()) {
            if !(0.0..=1.0).contains(&value) {
                return Err(MotevoError::invalid_parameter(
                    format!("bg {}", base),
                    value,
                    "must be between 0 and 1",
                ));
            }
        }

        let total: f64 = self.as_array().iter().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(MotevoError::invalid_parameter(
                "bg",
                total,
                "frequencies must sum to 1",
            ));
        }

        Ok(())
    }
}

/// Parameters of a MotEvo run.
///
/// Every field maps onto one line of the parameter file handed to `motevo`.
/// `None` leaves the line out so that MotEvo falls back to its own default.
#[derive(Debug, Clone, PartialEq)]
pub struct MotevoConfig {
    /// Phylogenetic tree in Newick format (`TREE`)
    pub tree: String,
    /// Reference species identifier (`refspecies`)
    pub ref_species: String,
    /// `Mode`
    pub mode: Mode,
    /// Estimate the priors with EM (`EMprior`)
    pub em_prior: bool,
    /// EM convergence threshold on the priors (`priordiff`)
    pub prior_diff: Option<f64>,
    /// Prior of the UFE weight matrix (`UFEwmprior`)
    pub ufe_wm_prior: Option<f64>,
    /// UFE model file, usually produced by [`crate::run::run_ufe`] (`UFEwmfile`)
    pub ufe_wm_file: Option<PathBuf>,
    /// `UFEwmlen`
    pub ufe_wm_len: Option<UfeLength>,
    /// Print UFE sites (`UFEprint`)
    pub ufe_print: Option<bool>,
    /// Order of the background Markov model (`markovorderBG`)
    pub markov_order_bg: Option<u32>,
    /// Prior of the background model (`bgprior`)
    pub background_prior: Option<f64>,
    /// `bg A`, `bg C`, `bg G`, `bg T`
    pub background: BackgroundFrequencies,
    /// `restrictparses`
    pub restrict_parses: Option<bool>,
    /// Sites output name, defaults to `sites_<wm file name>` (`sitefile`)
    pub sites_file: Option<String>,
    /// Priors output name, defaults to `priors_<wm file name>` (`priorfile`)
    pub priors_file: Option<String>,
    /// Print the aligned sequences of every site (`printsiteals`)
    pub print_site_als: bool,
    /// Minimum posterior of reported sites (`minposterior`)
    pub min_posterior: Option<f64>,
    /// Minimum posterior used for weight matrix refinement (`minposteriorWM`)
    pub min_posterior_wm: Option<f64>,
    pub retry: Retry,
    /// Program invoked as MotEvo
    pub executable: PathBuf,
}

impl Default for MotevoConfig {
    fn default() -> Self {
        MotevoConfig {
            tree: String::new(),
            ref_species: String::new(),
            mode: Mode::default(),
            em_prior: true,
            prior_diff: None,
            ufe_wm_prior: None,
            ufe_wm_file: None,
            ufe_wm_len: None,
            ufe_print: None,
            markov_order_bg: None,
            background_prior: None,
            background: BackgroundFrequencies::default(),
            restrict_parses: None,
            sites_file: None,
            priors_file: None,
            print_site_als: true,
            min_posterior: None,
            min_posterior_wm: None,
            retry: Retry::default(),
            executable: PathBuf::from(crate::run::MOTEVO),
        }
    }
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

fn check_probability(name: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(p) if !(0.0..=1.0).contains(&p) => Err(MotevoError::invalid_parameter(
            name,
            p,
            "must be between 0 and 1",
        )),
        _ => Ok(()),
    }
}

impl MotevoConfig {
    pub fn new(tree: impl Into<String>, ref_species: impl Into<String>) -> Self {
        MotevoConfig {
            tree: tree.into(),
            ref_species: ref_species.into(),
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_em_prior(mut self, em_prior: bool) -> Self {
        self.em_prior = em_prior;
        self
    }

    /// Sets the UFE model file, its prior and its length
    pub fn with_ufe_model(
        mut self,
        file: impl Into<PathBuf>,
        prior: f64,
        len: UfeLength,
    ) -> Self {
        self.ufe_wm_file = Some(file.into());
        self.ufe_wm_prior = Some(prior);
        self.ufe_wm_len = Some(len);
        self
    }

    pub fn with_background(mut self, background: BackgroundFrequencies) -> Self {
        self.background = background;
        self
    }

    pub fn with_background_prior(mut self, prior: f64) -> Self {
        self.background_prior = Some(prior);
        self
    }

    /// Overrides the names of the sites and priors files
    pub fn with_output_names(
        mut self,
        sites_file: impl Into<String>,
        priors_file: impl Into<String>,
    ) -> Self {
        self.sites_file = Some(sites_file.into());
        self.priors_file = Some(priors_file.into());
        self
    }

    pub fn with_min_posterior(mut self, min_posterior: f64) -> Self {
        self.min_posterior = Some(min_posterior);
        self
    }

    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.tree.trim().is_empty() {
            return Err(MotevoError::invalid_parameter("tree", "", "a tree is required"));
        }
        if self.ref_species.trim().is_empty() {
            return Err(MotevoError::invalid_parameter(
                "ref_species",
                "",
                "a reference species is required",
            ));
        }
        self.background.validate()?;
        check_probability("background_prior", self.background_prior)?;
        check_probability("min_posterior", self.min_posterior)?;
        check_probability("min_posterior_wm", self.min_posterior_wm)?;
        Ok(())
    }

    /// Name of the sites file MotEvo writes for the given weight matrix
    pub fn sites_file_name(&self, wm_path: &Path) -> String {
        self.sites_file
            .clone()
            .unwrap_or_else(|| format!("sites_{}", wm_name(wm_path)))
    }

    /// Name of the priors file MotEvo writes for the given weight matrix
    pub fn priors_file_name(&self, wm_path: &Path) -> String {
        self.priors_file
            .clone()
            .unwrap_or_else(|| format!("priors_{}", wm_name(wm_path)))
    }

    /// Renders the MotEvo parameter file for a run on `wm_path`.
    ///
    /// `UfeLength::Auto` is resolved by counting the positions of `wm_path`.
    ///
    /// # Errors
    /// * `MotevoError::Io` - If the weight matrix cannot be read to resolve `auto`
    pub fn render_params(&self, wm_path: &Path) -> Result<String> {
        let mut params = String::new();
        let mut line = |key: &str, value: &dyn fmt::Display| {
            params.push_str(&format!("{} {}\n", key, value));
        };

        line("refspecies", &self.ref_species);
        line("TREE", &self.tree);
        line("Mode", &self.mode);
        line("EMprior", &flag(self.em_prior));
        if let Some(prior_diff) = self.prior_diff {
            line("priordiff", &prior_diff);
        }
        if let Some(prior) = self.ufe_wm_prior {
            line("UFEwmprior", &prior);
        }
        if let Some(file) = &self.ufe_wm_file {
            let file = std::path::absolute(file)?;
            line("UFEwmfile", &file.display());
        }
        match self.ufe_wm_len {
            Some(UfeLength::Auto) => line("UFEwmlen", &count_wm_positions(wm_path)?),
            Some(UfeLength::Positions(len)) => line("UFEwmlen", &len),
            None => {}
        }
        if let Some(print) = self.ufe_print {
            line("UFEprint", &flag(print));
        }
        if let Some(order) = self.markov_order_bg {
            line("markovorderBG", &order);
        }
        if let Some(prior) = self.background_prior {
            line("bgprior", &prior);
        }
        line("bg A", &self.background.a);
        line("bg C", &self.background.c);
        line("bg G", &self.background.g);
        line("bg T", &self.background.t);
        if let Some(restrict) = self.restrict_parses {
            line("restrictparses", &flag(restrict));
        }
        line("sitefile", &self.sites_file_name(wm_path));
        line("priorfile", &self.priors_file_name(wm_path));
        line("printsiteals", &flag(self.print_site_als));
        if let Some(min) = self.min_posterior {
            line("minposterior", &min);
        }
        if let Some(min) = self.min_posterior_wm {
            line("minposteriorWM", &min);
        }

        Ok(params)
    }
}
