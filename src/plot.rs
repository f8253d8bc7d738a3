//! Feature-vs-label scatter plots, rendered to SVG with plotters.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use plotters::prelude::*;
use polars::prelude::{DataFrame, DataType, Series};

use crate::error::{HeartAppError, Result};

const PLOT_SIZE: (u32, u32) = (640, 480);

pub fn plot_file_name(feature: &str, target: &str) -> String {
    format!("{}_vs_{}.svg", feature, target)
}

/// `(feature, label)` pairs for every row where both are present.
pub fn scatter_points(df: &DataFrame, feature: &str, target: &str) -> Result<Vec<(f64, f64)>> {
    let xs = named_column(df, feature)?.cast(&DataType::Float64)?;
    let ys = named_column(df, target)?.cast(&DataType::Float64)?;

    let points = xs
        .f64()?
        .into_iter()
        .zip(ys.f64()?.into_iter())
        .filter_map(|(x, y)| Some((x?, y?)))
        .collect();
    Ok(points)
}

fn named_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name).map_err(|_| HeartAppError::MissingColumn {
        column: name.to_string(),
    })
}

/// Horizontal axis range with a 5% margin on both sides.
fn x_range(points: &[(f64, f64)]) -> (f64, f64) {
    let min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - pad, max + pad)
}

fn draw_scatter(
    points: &[(f64, f64)],
    feature: &str,
    target: &str,
    path: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_min, x_max) = x_range(points);
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{} vs {}", feature, target), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max, -0.25f64..1.25f64)?;

    chart
        .configure_mesh()
        .x_desc(feature)
        .y_desc(target)
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.mix(0.5).filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Renders one feature against the label into `dir`.
pub fn plot_feature_vs_label(
    df: &DataFrame,
    feature: &str,
    target: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let points = scatter_points(df, feature, target)?;
    let path = dir.join(plot_file_name(feature, target));

    draw_scatter(&points, feature, target, &path).map_err(|e| HeartAppError::Plot {
        path: path.clone(),
        message: e.to_string(),
    })?;

    debug!("wrote {} points to {}", points.len(), path.display());
    Ok(path)
}

/// One scatter plot per feature column, in `features` order.
pub fn plot_all_features<S: AsRef<str>>(
    df: &DataFrame,
    features: &[S],
    target: &str,
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for feature in features {
        written.push(plot_feature_vs_label(df, feature.as_ref(), target, dir)?);
    }
    info!("wrote {} plots to {}", written.len(), dir.display());
    Ok(written)
}
