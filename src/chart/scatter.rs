//! Scatter plot with a least-squares regression line, drawn with imageproc.

use super::{ChartRenderError, ChartRenderer, ChartSpec};
use crate::config::ChartConfig;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::path::Path;
use tracing::debug;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS_COLOR: Rgb<u8> = Rgb([40, 40, 40]);
const GRID_COLOR: Rgb<u8> = Rgb([225, 225, 225]);
const POINT_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
const REGRESSION_COLOR: Rgb<u8> = Rgb([214, 39, 40]);

const TICKS: u32 = 5;

/// Renders PNG scatter plots.
#[derive(Debug, Clone)]
pub struct ScatterPlotRenderer {
    width: u32,
    height: u32,
    point_radius: i32,
}

impl From<&ChartConfig> for ScatterPlotRenderer {
    fn from(config: &ChartConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            point_radius: config.point_radius,
        }
    }
}

impl Default for ScatterPlotRenderer {
    fn default() -> Self {
        Self::from(&ChartConfig::default())
    }
}

/// Pixel rectangle that holds the plotted data.
#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

/// Data range mapped onto a plot area.
#[derive(Debug, Clone, Copy)]
struct Projection {
    area: PlotArea,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Projection {
    fn to_pixel(&self, x: f64, y: f64) -> (f32, f32) {
        let fx = (x - self.x_range.0) / (self.x_range.1 - self.x_range.0);
        let fy = (y - self.y_range.0) / (self.y_range.1 - self.y_range.0);
        let px = self.area.left + fx as f32 * (self.area.right - self.area.left);
        let py = self.area.bottom - fy as f32 * (self.area.bottom - self.area.top);
        (
            px.clamp(self.area.left, self.area.right),
            py.clamp(self.area.top, self.area.bottom),
        )
    }
}

impl ScatterPlotRenderer {
    fn plot_area(&self) -> PlotArea {
        let margin = (self.width.min(self.height) as f32 * 0.1).max(10.0);
        PlotArea {
            left: margin,
            right: self.width as f32 - margin / 2.0,
            top: margin / 2.0,
            bottom: self.height as f32 - margin,
        }
    }

    fn draw_frame(&self, img: &mut RgbImage, area: PlotArea) {
        for i in 0..=TICKS {
            let t = i as f32 / TICKS as f32;
            let gx = area.left + t * (area.right - area.left);
            let gy = area.bottom - t * (area.bottom - area.top);

            draw_line_segment_mut(img, (gx, area.top), (gx, area.bottom), GRID_COLOR);
            draw_line_segment_mut(img, (area.left, gy), (area.right, gy), GRID_COLOR);

            // tick marks
            draw_line_segment_mut(img, (gx, area.bottom), (gx, area.bottom + 6.0), AXIS_COLOR);
            draw_line_segment_mut(img, (area.left - 6.0, gy), (area.left, gy), AXIS_COLOR);
        }

        draw_line_segment_mut(img, (area.left, area.bottom), (area.right, area.bottom), AXIS_COLOR);
        draw_line_segment_mut(img, (area.left, area.top), (area.left, area.bottom), AXIS_COLOR);
    }
}

impl ChartRenderer for ScatterPlotRenderer {
    fn render(&self, spec: &ChartSpec<'_>, path: &Path) -> Result<(), ChartRenderError> {
        let fail = |detail: String| ChartRenderError {
            path: path.to_path_buf(),
            detail,
        };

        let n = spec.x.len().min(spec.y.len());
        if n == 0 {
            return Err(fail("no data points to plot".to_string()));
        }
        let (xs, ys) = (&spec.x[..n], &spec.y[..n]);

        let projection = Projection {
            area: self.plot_area(),
            x_range: padded_range(xs),
            y_range: padded_range(ys),
        };

        let mut img = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        self.draw_frame(&mut img, projection.area);

        for (&x, &y) in xs.iter().zip(ys) {
            let (px, py) = projection.to_pixel(x, y);
            draw_filled_circle_mut(
                &mut img,
                (px.round() as i32, py.round() as i32),
                self.point_radius,
                POINT_COLOR,
            );
        }

        if let Some((slope, intercept)) = least_squares(xs, ys) {
            let (x0, x1) = min_max(xs);
            let start = projection.to_pixel(x0, slope * x0 + intercept);
            let end = projection.to_pixel(x1, slope * x1 + intercept);
            for offset in [-1.0, 0.0, 1.0] {
                draw_line_segment_mut(
                    &mut img,
                    (start.0, start.1 + offset),
                    (end.0, end.1 + offset),
                    REGRESSION_COLOR,
                );
            }
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }

        debug!(
            "Rendering {} vs {} ({} points) to {}",
            spec.x_label,
            spec.y_label,
            n,
            path.display()
        );
        img.save(path).map_err(|e| fail(e.to_string()))
    }
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Data range with 5% padding; a degenerate range is widened to ±1.
fn padded_range(values: &[f64]) -> (f64, f64) {
    let (lo, hi) = min_max(values);
    if !(hi > lo) {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad, hi + pad)
}

/// Slope and intercept of the ordinary least-squares fit of y on x.
fn least_squares(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let (sxy, sxx) = x.iter().zip(y).fold((0.0, 0.0), |(sxy, sxx), (a, b)| {
        (sxy + (a - mean_x) * (b - mean_y), sxx + (a - mean_x).powi(2))
    });

    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}
