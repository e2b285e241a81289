use crate::error::{MotevoError, Result};
use crate::types::SiteRecord;
use plotters::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 500;

/// Counts site posteriors in `bins` equal-width bins over [0, 1].
///
/// Records sharing a site header repeat the same posterior, so each site
/// (motif, reference promoter, strand and coordinates) is counted once.
/// A posterior of exactly 1 falls into the last bin.
///
/// # Errors
/// * `MotevoError::InvalidParameter` - If `bins` is zero
pub fn posterior_histogram(records: &[SiteRecord], bins: usize) -> Result<Vec<usize>> {
    if bins == 0 {
        return Err(MotevoError::invalid_parameter(
            "bins",
            bins,
            "at least one bin is required",
        ));
    }

    let mut seen = HashSet::new();
    let mut counts = vec![0; bins];
    for record in records {
        let site = (
            record.motif.as_str(),
            record.reference_promoter.as_str(),
            record.reference_binding_strand.as_str(),
            record.motif_coordinates.as_str(),
        );
        if !seen.insert(site) {
            continue;
        }
        if !(0.0..=1.0).contains(&record.posterior) {
            debug!(posterior = record.posterior, "posterior outside [0, 1], skipped");
            continue;
        }
        let bin = ((record.posterior * bins as f64) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    Ok(counts)
}

fn plot_error<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> MotevoError {
    MotevoError::Plot(e.to_string())
}

/// Draws a histogram of site posteriors as an SVG file.
///
/// See [`posterior_histogram`] for how sites are counted.
///
/// # Errors
/// * `MotevoError::InvalidParameter` - If `bins` is zero
/// * `MotevoError::Plot` - If the chart cannot be drawn or written
pub fn plot_posteriors(
    records: &[SiteRecord],
    path: impl AsRef<Path>,
    bins: usize,
) -> Result<()> {
    let counts = posterior_histogram(records, bins)?;
    let y_max = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let width = 1.0 / bins as f64;

    let root = SVGBackend::new(path.as_ref(), (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Site posteriors", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..1f64, 0f64..y_max * 1.05)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("posterior")
        .y_desc("sites")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &count)| {
            let x0 = i as f64 * width;
            Rectangle::new(
                [(x0, 0.0), (x0 + width, count as f64)],
                BLUE.mix(0.6).filled(),
            )
        }))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}
