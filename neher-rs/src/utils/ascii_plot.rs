use crate::prelude::Real;
use std::iter;

/// ASCII plot of a sequence of positive values.
///
/// Draw each point as a column filled with '*'s up to the maximum height.
/// Sequences wider than `width` are downsampled by taking every n-th point.
pub fn render_vbars(values: &[Real], height: usize, width: usize) -> String {
    if values.is_empty() || height == 0 {
        return String::new();
    }
    let stride = (values.len() + width.max(1) - 1) / width.max(1);
    let points: Vec<Real> = values.iter().copied().step_by(stride.max(1)).collect();
    let max = points.iter().copied().fold(Real::NEG_INFINITY, Real::max);
    let step = max / height as Real;

    let mut out = String::with_capacity((points.len() + 1) * (height + 1));
    for i in 0..height + 1 {
        let h = (height - i) as Real * step;
        out.extend(points.iter().map(|&x| if x >= h { '*' } else { ' ' }));
        out.push('\n');
    }
    out
}

/// ASCII plot of a sequence of positive values horizontally.
///
/// Draw each value as a row filled with '='s up to the maximum width.
pub fn render_hbars(values: &[Real], width: usize) -> String {
    if values.is_empty() {
        return String::new();
    }
    let max = values.iter().copied().fold(Real::NEG_INFINITY, Real::max);
    let step = max / width as Real;

    let mut out = String::new();
    for &x in values {
        let n = if step > 0.0 { (x / step) as usize } else { 0 };
        out.push('|');
        out.extend(iter::repeat('=').take(n));
        out.push('\n');
    }
    out
}
