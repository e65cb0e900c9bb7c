use rayon::prelude::*;

const CHARS: [char; 10] = [' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Mean of `values[start..end]`, skipping non-finite entries.
fn bucket_mean(values: &[f64], start: usize, end: usize) -> Option<f64> {
    let (sum, count) = values[start..end]
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Bucket boundaries splitting `len` samples into `cols` columns.
fn bucket(len: usize, cols: usize, c: usize) -> (usize, usize) {
    let start = c * len / cols;
    let end = ((c + 1) * len / cols).max(start + 1).min(len);
    (start, end)
}

/// Renders free energy over time as a character density field.
///
/// One row per level, one column per time bucket; darker characters mean
/// more free energy relative to the largest bucket in the whole field.
#[must_use]
pub fn compute_vfe_field(rows: &[&[f64]], cols: usize) -> Vec<String> {
    if rows.is_empty() || cols == 0 {
        return Vec::new();
    }

    // Log scale keeps transients from flattening the rest of the run
    let buckets: Vec<Vec<Option<f64>>> = rows
        .par_iter()
        .map(|values| {
            (0..cols)
                .map(|c| {
                    if values.is_empty() {
                        return None;
                    }
                    let (start, end) = bucket(values.len(), cols, c);
                    bucket_mean(values, start, end).map(f64::ln_1p)
                })
                .collect()
        })
        .collect();

    let peak = buckets
        .iter()
        .flatten()
        .flatten()
        .fold(0.0_f64, |peak, &v| peak.max(v));

    buckets
        .par_iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Some(v) if peak > 0.0 => {
                        let idx = (v / peak * (CHARS.len() - 1) as f64).round() as usize;
                        CHARS[idx.min(CHARS.len() - 1)]
                    }
                    _ => CHARS[0],
                })
                .collect()
        })
        .collect()
}

/// Reduces `values` to at most `max_points` chart points `(time, mean)`.
#[must_use]
pub fn downsample(values: &[f64], dt: f64, max_points: usize) -> Vec<(f64, f64)> {
    if values.is_empty() || max_points == 0 {
        return Vec::new();
    }
    let stride = values.len().div_ceil(max_points);
    values
        .par_chunks(stride)
        .enumerate()
        .filter_map(|(k, chunk)| {
            bucket_mean(chunk, 0, chunk.len()).map(|mean| ((k * stride) as f64 * dt, mean))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_keeps_short_series() {
        let points = downsample(&[1.0, 2.0, 3.0], 0.5, 10);
        assert_eq!(points, vec![(0.0, 1.0), (0.5, 2.0), (1.0, 3.0)]);
    }

    #[test]
    fn test_downsample_averages_chunks() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let points = downsample(&values, 1.0, 10);
        assert_eq!(points.len(), 10);
        assert!((points[0].1 - 4.5).abs() < 1e-12);
        assert!((points[9].0 - 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_field_marks_peak_darkest() {
        let quiet = [0.0; 8];
        let loud = [0.0, 0.0, 0.0, 0.0, 9.0, 9.0, 9.0, 9.0];
        let field = compute_vfe_field(&[&quiet, &loud], 2);
        assert_eq!(field, vec!["  ".to_string(), " @".to_string()]);
    }
}
