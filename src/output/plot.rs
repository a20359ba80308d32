//! Observed-vs-null histogram artifact for the distinguishability test.

use std::path::Path;

use plotters::prelude::*;

use crate::error::{Error, Result};

const BINS: usize = 40;

fn plot_error<E: std::fmt::Display>(err: E) -> Error {
    Error::Plot(err.to_string())
}

/// Render the bootstrap null distribution as a histogram with vertical
/// markers for the observed statistic and the decision threshold.
///
/// The image answers the one question the JSON report cannot: how far into
/// (or past) the null's tail the observed MMD landed.
pub fn render_null_histogram(
    path: &Path,
    null_stats: &[f64],
    observed: f64,
    threshold: f64,
) -> Result<()> {
    if null_stats.is_empty() {
        return Err(Error::Plot("empty null distribution".to_string()));
    }

    let mut lo = observed.min(threshold);
    let mut hi = observed.max(threshold);
    for &stat in null_stats {
        lo = lo.min(stat);
        hi = hi.max(stat);
    }
    let span = hi - lo;
    let (lo, hi) = if span > 0.0 {
        (lo - span * 0.05, hi + span * 0.05)
    } else {
        (lo - 0.5, hi + 0.5)
    };

    let bin_width = (hi - lo) / BINS as f64;
    let mut counts = [0usize; BINS];
    for &stat in null_stats {
        let bin = (((stat - lo) / bin_width) as usize).min(BINS - 1);
        counts[bin] += 1;
    }
    let y_max = counts.iter().copied().max().unwrap_or(1) as f64 * 1.05;

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("MMD null distribution", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(lo..hi, 0.0..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("MMD")
        .y_desc("resamples")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(bin, &count)| {
            let x0 = lo + bin as f64 * bin_width;
            let x1 = x0 + bin_width;
            Rectangle::new([(x0, 0.0), (x1, count as f64)], BLUE.mix(0.4).filled())
        }))
        .map_err(plot_error)?
        .label("null resamples")
        .legend(|(x, y)| Rectangle::new([(x, y - 4), (x + 10, y + 4)], BLUE.mix(0.4).filled()));

    chart
        .draw_series(LineSeries::new(
            [(observed, 0.0), (observed, y_max)],
            RED.stroke_width(2),
        ))
        .map_err(plot_error)?
        .label("observed")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], RED.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(
            [(threshold, 0.0), (threshold, y_max)],
            BLACK.stroke_width(1),
        ))
        .map_err(plot_error)?
        .label("threshold")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], BLACK.stroke_width(1)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn renders_a_png_artifact() {
        let mut rng = StdRng::seed_from_u64(42);
        let null: Vec<f64> = (0..500).map(|_| rng.random::<f64>() * 0.02).collect();

        let mut path = std::env::temp_dir();
        path.push(format!("leakprobe-null-{}.png", std::process::id()));

        render_null_histogram(&path, &null, 0.035, 0.019).unwrap();
        let metadata = std::fs::metadata(&path).unwrap();
        assert!(metadata.len() > 0, "plot file should not be empty");

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_null_is_rejected() {
        let mut path = std::env::temp_dir();
        path.push("leakprobe-null-empty.png");
        let err = render_null_histogram(&path, &[], 0.1, 0.1).unwrap_err();
        assert!(matches!(err, Error::Plot(_)));
    }

    #[test]
    fn degenerate_span_still_renders() {
        let null = vec![0.01; 100];
        let mut path = std::env::temp_dir();
        path.push(format!("leakprobe-null-flat-{}.png", std::process::id()));

        render_null_histogram(&path, &null, 0.01, 0.01).unwrap();
        assert!(path.exists());

        let _ = std::fs::remove_file(&path);
    }
}
