use crate::error::PipelineError;
use crate::types::{BinnedCell, JoinedCell};

/// One natural-breaks class: a sorted slice of the input values. Membership
/// is tested against the value set, not the numeric extent, because sparse
/// inputs can give two classes the same (min, max).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    values: Vec<u32>,
}

impl Class {
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn min(&self) -> u32 {
        self.values[0]
    }

    pub fn max(&self) -> u32 {
        self.values[self.values.len() - 1]
    }

    pub fn contains(&self, value: u32) -> bool {
        self.values.binary_search(&value).is_ok()
    }
}

/// Partitions `values` into exactly `k` contiguous ordered classes minimizing
/// the total within-class sum of squared deviations (ckmeans natural breaks).
///
/// Deterministic: the DP keeps the smallest split index on cost ties.
pub fn ckmeans(values: &[u32], k: usize) -> Result<Vec<Class>, PipelineError> {
    if k == 0 || values.len() < k {
        return Err(PipelineError::InsufficientData {
            values: values.len(),
            classes: k,
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let n = sorted.len();

    // Prefix sums give each candidate class's sum of squared deviations in O(1).
    let mut sum = vec![0.0_f64; n + 1];
    let mut sum_sq = vec![0.0_f64; n + 1];
    for (i, &v) in sorted.iter().enumerate() {
        let v = v as f64;
        sum[i + 1] = sum[i] + v;
        sum_sq[i + 1] = sum_sq[i] + v * v;
    }
    let ssq = |lo: usize, hi: usize| -> f64 {
        let len = (hi - lo) as f64;
        let s = sum[hi] - sum[lo];
        sum_sq[hi] - sum_sq[lo] - s * s / len
    };

    // cost[j][i]: best cost of the first i sorted values split into j+1 classes.
    let mut cost = vec![vec![f64::INFINITY; n + 1]; k];
    let mut split = vec![vec![0_usize; n + 1]; k];
    for i in 1..=n {
        cost[0][i] = ssq(0, i);
    }
    for j in 1..k {
        for i in (j + 1)..=n {
            for m in j..i {
                let candidate = cost[j - 1][m] + ssq(m, i);
                if candidate < cost[j][i] {
                    cost[j][i] = candidate;
                    split[j][i] = m;
                }
            }
        }
    }

    let mut bounds = vec![0_usize; k + 1];
    bounds[k] = n;
    for j in (1..k).rev() {
        bounds[j] = split[j][bounds[j + 1]];
    }

    Ok((0..k)
        .map(|j| Class {
            values: sorted[bounds[j]..bounds[j + 1]].to_vec(),
        })
        .collect())
}

/// Annotates each cell with its class index and the class (min, max) extent,
/// rebuilding the records rather than mutating in place. The joined payloads
/// are dropped here.
///
/// When the classifier was forced to split a run of equal values over two
/// classes, the highest class index containing the value wins.
pub fn assign_bins(cells: Vec<JoinedCell>, classes: &[Class]) -> Vec<BinnedCell> {
    cells
        .into_iter()
        .map(|cell| {
            let count = cell.count();
            let bin = classes
                .iter()
                .rposition(|class| class.contains(count))
                .expect("every cell count is a member of some class");
            let class = &classes[bin];
            BinnedCell {
                polygon: cell.polygon,
                count,
                bin,
                bin_val: (class.min(), class.max()),
            }
        })
        .collect()
}
