use crate::config::{BackgroundFrequencies, MotevoConfig, Retry};
use crate::error::{MotevoError, Result};
use crate::pwm::wm_name;
use std::ffi::{OsStr, OsString};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, error, info, warn};

/// Default MotEvo program name
pub const MOTEVO: &str = "motevo";

/// Default UFE model estimation program name
pub const RUN_UFE: &str = "runUFE";

/// Default name of the UFE model written by [`run_ufe`]
pub const DEFAULT_UFE_MODEL: &str = "UFE_model";

/// Files produced by a MotEvo run, all inside the working directory.
///
/// The paths are returned whether or not the run succeeded; check
/// `succeeded` or the existence of the files before parsing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotevoOutput {
    pub sites: PathBuf,
    pub priors: PathBuf,
    /// Combined stdout and stderr of the last attempt
    pub report: PathBuf,
    pub attempts: usize,
    pub succeeded: bool,
}

/// Runs `program` with `args` and waits for it, capturing its output.
///
/// The process inherits no stdin. When `working_directory` is given the
/// program runs there; the working directory of the current process is
/// never changed.
pub fn shell_call<I, S>(
    program: impl AsRef<OsStr>,
    args: I,
    working_directory: Option<&Path>,
) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    if let Some(dir) = working_directory {
        command.current_dir(dir);
    }
    Ok(command.output()?)
}

/// Probes `program` without arguments and expects `installed_code` back
fn ensure_installed(program: &Path, installed_code: i32) -> Result<()> {
    let name = program.display().to_string();
    let output = shell_call(program, std::iter::empty::<&str>(), None)
        .map_err(|e| MotevoError::missing_executable(&name, e.to_string()))?;

    match output.status.code() {
        Some(code) if code == installed_code => Ok(()),
        code => Err(MotevoError::missing_executable(
            name,
            format!(
                "installation check exited with {}, expected {}",
                code.map_or_else(|| "a signal".to_string(), |c| c.to_string()),
                installed_code
            ),
        )),
    }
}

/// Ensures MotEvo is installed: it exits with 0 when run without arguments
pub fn ensure_motevo_installed(program: impl AsRef<Path>) -> Result<()> {
    ensure_installed(program.as_ref(), 0)
}

/// Ensures runUFE is installed: it exits with 1 when run without arguments
pub fn ensure_runufe_installed(program: impl AsRef<Path>) -> Result<()> {
    ensure_installed(program.as_ref(), 1)
}

fn report_missing(path: &Path) {
    if !path.exists() {
        error!(path = %path.display(), "path doesn't exist");
    }
}

fn remove_stale(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale output");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Absolute paths of everything one MotEvo invocation touches
struct Invocation<'a> {
    executable: &'a Path,
    working_directory: PathBuf,
    sequences: PathBuf,
    params: PathBuf,
    wm: PathBuf,
    report: PathBuf,
    sites: PathBuf,
    priors: PathBuf,
}

impl Invocation<'_> {
    /// Runs MotEvo once, from scratch. Returns whether the attempt succeeded.
    fn attempt(&self) -> Result<bool> {
        for stale in [&self.sites, &self.priors, &self.report] {
            remove_stale(stale)?;
        }

        let report = File::create(&self.report)?;
        let status = Command::new(self.executable)
            .arg(&self.sequences)
            .arg(&self.params)
            .arg(&self.wm)
            .current_dir(&self.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::from(report.try_clone()?))
            .stderr(Stdio::from(report))
            .status()?;

        if !status.success() {
            error!(
                status = %status,
                report = %self.report.display(),
                "MotEvo returned a non-zero exit code"
            );
            return Ok(false);
        }

        for output in [&self.sites, &self.priors] {
            if !output.exists() {
                error!(path = %output.display(), "MotEvo did not write an expected output file");
                return Ok(false);
            }
        }

        Ok(true)
    }
}

/// Runs MotEvo on an alignment file with a single weight matrix.
///
/// Writes `params_<wm file name>` into `working_directory`, deletes any earlier
/// sites, priors and report files of the same names, and invokes
/// `motevo <sequences> <params> <wm>` from inside `working_directory`. The
/// combined output of MotEvo lands in `report_<wm file name>`.
///
/// A run succeeds when MotEvo exits with 0 and both the sites and the priors
/// file exist afterwards. Failures are logged and reported through
/// [`MotevoOutput::succeeded`]; with [`Retry::UntilSuccess`] the invocation is
/// repeated until it succeeds.
///
/// # Errors
/// * `MotevoError::InvalidParameter` - If the configuration is invalid
/// * `MotevoError::MissingExecutable` - If MotEvo cannot be started
/// * `MotevoError::Io` - If files cannot be written or MotEvo cannot be spawned
pub fn run_motevo(
    sequences: impl AsRef<Path>,
    wm_path: impl AsRef<Path>,
    working_directory: impl AsRef<Path>,
    config: &MotevoConfig,
) -> Result<MotevoOutput> {
    config.validate()?;
    ensure_motevo_installed(&config.executable)?;

    let (sequences, wm_path) = (sequences.as_ref(), wm_path.as_ref());
    report_missing(sequences);
    report_missing(wm_path);

    let working_directory = std::path::absolute(working_directory.as_ref())?;
    fs::create_dir_all(&working_directory)?;

    let name = wm_name(wm_path);
    let invocation = Invocation {
        executable: &config.executable,
        sequences: std::path::absolute(sequences)?,
        params: working_directory.join(format!("params_{}", name)),
        wm: std::path::absolute(wm_path)?,
        report: working_directory.join(format!("report_{}", name)),
        sites: working_directory.join(config.sites_file_name(wm_path)),
        priors: working_directory.join(config.priors_file_name(wm_path)),
        working_directory,
    };

    fs::write(&invocation.params, config.render_params(wm_path)?)?;
    info!(
        wm = %name,
        dir = %invocation.working_directory.display(),
        "running MotEvo"
    );

    let mut attempts = 0;
    let succeeded = loop {
        attempts += 1;
        let succeeded = invocation.attempt()?;
        if succeeded || config.retry == Retry::Once {
            break succeeded;
        }
        warn!(attempt = attempts, wm = %name, "MotEvo run failed, retrying");
    };

    if succeeded {
        info!(wm = %name, attempts, "MotEvo finished");
    }

    Ok(MotevoOutput {
        sites: invocation.sites,
        priors: invocation.priors,
        report: invocation.report,
        attempts,
        succeeded,
    })
}

/// Estimates a UFE background model with the `runUFE` program on `PATH`.
///
/// See [`run_ufe_with`].
pub fn run_ufe(
    tree_path: impl AsRef<Path>,
    background: &BackgroundFrequencies,
    output_path: impl AsRef<Path>,
) -> Result<PathBuf> {
    run_ufe_with(RUN_UFE, tree_path, background, output_path)
}

/// Estimates a UFE background model.
///
/// Invokes `<program> <tree_path> <A> <C> <G> <T>` and writes its standard output
/// verbatim to `output_path`, whose absolute path is returned. `runUFE` signals
/// that it is installed by exiting with 1 when called without arguments.
///
/// # Errors
/// * `MotevoError::InvalidParameter` - If the background frequencies are invalid
/// * `MotevoError::MissingExecutable` - If the program cannot be started
/// * `MotevoError::Io` - If the program cannot be run or the model cannot be written
pub fn run_ufe_with(
    program: impl AsRef<Path>,
    tree_path: impl AsRef<Path>,
    background: &BackgroundFrequencies,
    output_path: impl AsRef<Path>,
) -> Result<PathBuf> {
    let (program, tree_path) = (program.as_ref(), tree_path.as_ref());
    background.validate()?;
    ensure_runufe_installed(program)?;
    report_missing(tree_path);

    let mut args = vec![tree_path.as_os_str().to_os_string()];
    args.extend(background.as_array().iter().map(|f| OsString::from(f.to_string())));

    let output = shell_call(program, &args, None)?;
    if !output.status.success() {
        warn!(
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "runUFE returned a non-zero exit code"
        );
    }

    let output_path = std::path::absolute(output_path.as_ref())?;
    fs::write(&output_path, &output.stdout)?;
    info!(path = %output_path.display(), "wrote UFE model");

    Ok(output_path)
}
