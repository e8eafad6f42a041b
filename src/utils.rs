//! Utility functions

use ndarray::Array1;

/// Format byte size in human-readable form
pub fn format_bytes(bytes: usize) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];

    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

/// Cell-centred coordinates of `length` cells spanning `[min, max]`
pub fn linear_coordinates(min: f64, max: f64, length: usize) -> Array1<f64> {
    if length == 0 {
        return Array1::zeros(0);
    }
    let dx = (max - min) / length as f64;
    Array1::from_shape_fn(length, |i| min + (i as f64 + 0.5) * dx)
}

/// Logarithmically spaced coordinates of `length` points from `min` to `max`
///
/// Both bounds must be positive; otherwise the result is NaN.
pub fn log_coordinates(min: f64, max: f64, length: usize) -> Array1<f64> {
    Array1::logspace(10.0, min.log10(), max.log10(), length)
}

/// Default name of an anonymous axis
pub fn anonymous_axis_name(prefix: &str, index: usize) -> String {
    format!("{}{}", prefix, index)
}

/// Default label of an anonymous axis
pub fn anonymous_axis_label(prefix: &str, index: usize) -> String {
    format!("{}_{{{}}}", prefix, index)
}
