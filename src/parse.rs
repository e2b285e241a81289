use crate::error::{MotevoError, Result};
use crate::types::*;
use polars::prelude::*;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::{debug, error};

/// Site headers start with the motif start coordinate
fn is_header(line: &str) -> bool {
    line.starts_with(|c: char| c.is_ascii_digit())
}

fn report_missing(path: &Path) {
    if !path.exists() {
        error!(path = %path.display(), "path doesn't exist");
    }
}

fn parse_float(path: &Path, line: usize, field: &'static str, value: &str) -> Result<f64> {
    value.parse::<f64>().map_err(|_| MotevoError::InvalidNumber {
        path: path.to_path_buf(),
        line,
        field,
        value: value.to_string(),
    })
}

/// Fields of a site header line, shared by every sequence line below it
struct SiteHeader {
    motif_coordinates: String,
    reference_binding_strand: String,
    posterior: f64,
    motif: String,
    reference_promoter: String,
}

impl SiteHeader {
    fn parse(path: &Path, line_number: usize, line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            return Err(MotevoError::InvalidFileFormat(format!(
                "site header at line {} of {} has {} fields, expected 5",
                line_number,
                path.display(),
                fields.len()
            )));
        }

        Ok(SiteHeader {
            motif_coordinates: fields[0].to_string(),
            reference_binding_strand: fields[1].to_string(),
            posterior: parse_float(path, line_number, "posterior", fields[2])?,
            motif: fields[3].to_string(),
            reference_promoter: fields[4].to_string(),
        })
    }

    /// Builds the record for one `binding_sequence score aligned_promoter` line
    fn record(&self, path: &Path, line_number: usize, fields: &[&str]) -> Result<SiteRecord> {
        Ok(SiteRecord {
            motif: self.motif.clone(),
            reference_promoter: self.reference_promoter.clone(),
            reference_binding_strand: self.reference_binding_strand.clone(),
            motif_coordinates: self.motif_coordinates.clone(),
            posterior: self.posterior,
            aligned_promoter: fields[2].to_string(),
            score: parse_float(path, line_number, "score", fields[1])?,
            binding_sequence: fields[0].to_string(),
        })
    }
}

/// Reads a MotEvo sites file into site records, in file order.
///
/// The file is a sequence of groups: a header line starting with the motif
/// coordinates (`471-491 - 0.546355 REST promoter`), followed by one line per
/// aligned sequence (`AGCGCTGTCC 20.3009 promoter`). Every sequence line becomes
/// one [`SiteRecord`] carrying its header's fields.
///
/// # Truncation
/// When a line shows up where a header was expected and it is not one (it does
/// not start with a digit and is not a three-field sequence line), the problem
/// is logged and the records read so far are returned. Callers that need to
/// detect this must compare against the file themselves.
///
/// # Errors
/// * `MotevoError::Io` - If the file cannot be opened or read
/// * `MotevoError::InvalidNumber` - If a posterior or score is not a number
/// * `MotevoError::InvalidFileFormat` - If a header has fewer than five fields
pub fn read_site_records(path: impl AsRef<Path>) -> Result<Vec<SiteRecord>> {
    let path = path.as_ref();
    report_missing(path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines().enumerate().peekable();
    let mut records = Vec::new();

    'groups: while let Some((idx, line)) = lines.next() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        if !is_header(&line) {
            error!(path = %path.display(), line = idx + 1, "missing site header, stopping");
            break;
        }

        let header = SiteHeader::parse(path, idx + 1, &line)?;

        while let Some((next_idx, Ok(next))) = lines.peek() {
            if is_header(next) {
                break;
            }
            let line_number = next_idx + 1;
            let next = next.clone();
            let fields: Vec<&str> = next.split_whitespace().collect();

            if fields.is_empty() {
                lines.next();
                continue;
            }
            if fields.len() != 3 {
                error!(
                    path = %path.display(),
                    line = line_number,
                    "missing sequence line, stopping"
                );
                break 'groups;
            }

            lines.next();
            records.push(header.record(path, line_number, &fields)?);
        }
    }

    debug!(path = %path.display(), records = records.len(), "parsed sites");
    Ok(records)
}

/// Reads a MotEvo sites file into a DataFrame.
///
/// Columns follow [`SITE_COLUMNS`]. See [`read_site_records`] for the file
/// format and the truncation behaviour.
pub fn parse_sites(path: impl AsRef<Path>) -> Result<DataFrame> {
    sites_to_dataframe(&read_site_records(path)?)
}

fn parse_prior_line(line: &str) -> Option<PriorRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }

    Some(PriorRecord {
        motif: fields[0].to_string(),
        final_prior: fields[1].parse().ok()?,
        nr_of_sites: fields[2].parse().ok()?,
        density: fields[3].parse().ok()?,
    })
}

/// Reads the three rows of a MotEvo priors file.
///
/// The first line is a header and is skipped. The next three lines hold the
/// motif, `background` and `UFEwm` rows as `label final_prior nr_of_sites density`.
///
/// Returns `Ok(None)` when fewer than three usable rows are present, including
/// rows that are not valid UTF-8; a priors file is never returned partially.
/// The failure is logged.
///
/// # Errors
/// * `MotevoError::Io` - If the file cannot be opened or read
pub fn read_prior_records(path: impl AsRef<Path>) -> Result<Option<Vec<PriorRecord>>> {
    let path = path.as_ref();
    report_missing(path);

    let file = File::open(path)?;
    let mut lines = BufReader::new(file).lines();

    // header
    lines.next().transpose()?;

    let mut records = Vec::with_capacity(3);
    for row in 0..3 {
        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
                error!(path = %path.display(), line = row + 2, "undecodable priors line");
                return Ok(None);
            }
            Some(Err(e)) => return Err(e.into()),
            None => {
                error!(path = %path.display(), rows = row, "not enough lines in priors file");
                return Ok(None);
            }
        };
        match parse_prior_line(&line) {
            Some(record) => records.push(record),
            None => {
                error!(path = %path.display(), line = row + 2, "malformed priors line");
                return Ok(None);
            }
        }
    }

    Ok(Some(records))
}

/// Reads a MotEvo priors file into a DataFrame with columns [`PRIOR_COLUMNS`].
///
/// `Ok(None)` means the file did not hold three valid rows; see
/// [`read_prior_records`].
pub fn parse_priors(path: impl AsRef<Path>) -> Result<Option<DataFrame>> {
    read_prior_records(path)?
        .map(|records| priors_to_dataframe(&records))
        .transpose()
}

fn string_column(
    name: &str,
    records: &[SiteRecord],
    field: impl Fn(&SiteRecord) -> &str,
) -> Column {
    Column::new(
        name.into(),
        records
            .iter()
            .map(|r| field(r).to_string())
            .collect::<Vec<String>>(),
    )
}

/// Converts site records into a DataFrame, one row per record
pub fn sites_to_dataframe(records: &[SiteRecord]) -> Result<DataFrame> {
    DataFrame::new(vec![
        string_column("motif", records, |r| r.motif.as_str()),
        string_column("reference_promoter", records, |r| {
            r.reference_promoter.as_str()
        }),
        string_column("reference_binding_strand", records, |r| {
            r.reference_binding_strand.as_str()
        }),
        string_column("motif_coordinates", records, |r| {
            r.motif_coordinates.as_str()
        }),
        Column::new(
            "posterior".into(),
            records.iter().map(|r| r.posterior).collect::<Vec<f64>>(),
        ),
        string_column("aligned_promoter", records, |r| r.aligned_promoter.as_str()),
        Column::new(
            "score".into(),
            records.iter().map(|r| r.score).collect::<Vec<f64>>(),
        ),
        string_column("binding_sequence", records, |r| r.binding_sequence.as_str()),
    ])
    .map_err(|e| MotevoError::DataError(e.to_string()))
}

/// Converts prior records into a DataFrame, one row per record
pub fn priors_to_dataframe(records: &[PriorRecord]) -> Result<DataFrame> {
    DataFrame::new(vec![
        Column::new(
            "motif".into(),
            records.iter().map(|r| r.motif.clone()).collect::<Vec<String>>(),
        ),
        Column::new(
            "final_prior".into(),
            records.iter().map(|r| r.final_prior).collect::<Vec<f64>>(),
        ),
        Column::new(
            "nr_of_sites".into(),
            records.iter().map(|r| r.nr_of_sites).collect::<Vec<f64>>(),
        ),
        Column::new(
            "density".into(),
            records.iter().map(|r| r.density).collect::<Vec<f64>>(),
        ),
    ])
    .map_err(|e| MotevoError::DataError(e.to_string()))
}
