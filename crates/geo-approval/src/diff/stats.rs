//! Pixel difference statistics.

use log::warn;

use super::schema::Stats;
use crate::dataset::{element_count, ravel_index, unravel_index, Variable};

/// Statistics of `|received - approved|` over two same-length arrays
///
/// Positions where either side is missing are ignored by the aggregates.
/// `nan_delta` is the count of missing values in `received` minus the count
/// in `approved`. Empty input yields empty stats.
pub fn diff_stats(approved: &[f64], received: &[f64]) -> Stats {
    let len = approved.len().min(received.len());
    if len == 0 {
        return Stats::default();
    }
    let approved = &approved[..len];
    let received = &received[..len];

    let mut diffs: Vec<f64> = approved
        .iter()
        .zip(received)
        .map(|(a, r)| (r - a).abs())
        .filter(|d| !d.is_nan())
        .collect();
    let nan_delta = count_nan(received) as i64 - count_nan(approved) as i64;

    if diffs.is_empty() {
        return Stats {
            nan_delta,
            ..Stats::default()
        };
    }

    diffs.sort_by(f64::total_cmp);
    let n = diffs.len();
    let median = if n % 2 == 1 {
        diffs[n / 2]
    } else {
        (diffs[n / 2 - 1] + diffs[n / 2]) / 2.0
    };

    Stats {
        min: diffs[0],
        max: diffs[n - 1],
        mean: diffs.iter().sum::<f64>() / n as f64,
        median,
        nan_delta,
    }
}

/// Statistics for one common variable
///
/// Equal shapes compare element by element. When only the axis lengths
/// differ the overlapping index region is compared, while `nan_delta` still
/// counts missing values over both whole arrays. Returns `None` for text
/// variables and for differing ranks.
pub fn variable_stats(name: &str, approved: &Variable, received: &Variable) -> Option<Stats> {
    let (approved_values, received_values) =
        match (approved.numeric_values(), received.numeric_values()) {
            (Some(a), Some(r)) => (a, r),
            _ => return None,
        };

    if approved.shape == received.shape {
        return Some(diff_stats(approved_values, received_values));
    }
    if approved.shape.len() != received.shape.len() {
        warn!(
            "Skipping statistics for '{}': approved rank {} vs received rank {}",
            name,
            approved.shape.len(),
            received.shape.len()
        );
        return None;
    }

    let overlap: Vec<usize> = approved
        .shape
        .iter()
        .zip(&received.shape)
        .map(|(a, r)| *a.min(r))
        .collect();
    warn!(
        "Shapes of '{}' differ ({:?} vs {:?}), statistics cover the overlap {:?}",
        name, approved.shape, received.shape, overlap
    );
    let (a, r): (Vec<f64>, Vec<f64>) = (0..element_count(&overlap))
        .map(|flat| {
            let index = unravel_index(flat, &overlap);
            (
                approved_values[ravel_index(&index, &approved.shape)],
                received_values[ravel_index(&index, &received.shape)],
            )
        })
        .unzip();
    Some(Stats {
        nan_delta: received.nan_count() as i64 - approved.nan_count() as i64,
        ..diff_stats(&a, &r)
    })
}

fn count_nan(values: &[f64]) -> usize {
    values.iter().filter(|v| v.is_nan()).count()
}
