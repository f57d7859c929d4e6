//! Evaluation grids over the modeled duration domain.

use crate::error::ModelError;

/// Generate `steps` evenly spaced points between `start` and `end` (inclusive).
pub fn lin_space(start: f64, end: f64, steps: usize) -> Result<Vec<f64>, ModelError> {
    if !(start.is_finite() && end.is_finite() && end > start) {
        return Err(ModelError::InvalidConfig(format!(
            "invalid grid range: start={start}, end={end} (must be finite and end>start)"
        )));
    }
    if steps < 2 {
        return Err(ModelError::InvalidConfig("grid steps must be >= 2".to_string()));
    }

    let step = (end - start) / (steps as f64 - 1.0);
    let mut out = Vec::with_capacity(steps);
    for i in 0..steps {
        out.push(start + step * i as f64);
    }
    // Pin the last point so it is exactly `end`.
    if let Some(last) = out.last_mut() {
        *last = end;
    }
    Ok(out)
}
