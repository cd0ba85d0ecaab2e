//! Initial emission means from k-means clustering.

use linfa::{DatasetBase, traits::Fit as _};
use linfa_clustering::KMeans;
use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use rand_xoshiro::{Xoshiro256Plus, rand_core::SeedableRng as _};

use crate::HmmError;

/// Clusters the rows of `obs` into `k` groups and returns the centroids.
///
/// Centroids are seeded with k-means++ and refined with at most `n_iter`
/// Lloyd iterations. The same `seed` always gives the same centroids.
///
/// k-means++ needs at least `k` distinct rows to pick distinct seeds.
pub(crate) fn kmeans(
    obs: &DMatrix<f64>,
    k: usize,
    n_iter: usize,
    seed: u64,
) -> Result<Vec<DVector<f64>>, HmmError> {
    let distinct = count_distinct_rows(obs);
    if distinct < k {
        return Err(HmmError::TooFewDistinctObservations {
            distinct,
            n_states: k,
        });
    }

    let data = Array2::from_shape_fn(obs.shape(), |(t, j)| obs[(t, j)]);
    let dataset = DatasetBase::from(data);
    let model = KMeans::params_with_rng(k, Xoshiro256Plus::seed_from_u64(seed))
        .max_n_iterations(u64::try_from(n_iter.max(1)).unwrap_or(u64::MAX))
        .fit(&dataset)
        .map_err(|err| HmmError::Clustering {
            reason: err.to_string(),
        })?;

    let centroids = model
        .centroids()
        .rows()
        .into_iter()
        .map(|row| DVector::from_iterator(row.len(), row.iter().copied()))
        .collect();
    Ok(centroids)
}

fn count_distinct_rows(obs: &DMatrix<f64>) -> usize {
    let mut rows = obs
        .row_iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    rows.sort_unstable();
    rows.dedup();
    rows.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separates_distinct_clusters() {
        let obs = DMatrix::from_row_slice(
            6,
            2,
            &[0.0, 0.0, 0.1, 0.0, 0.0, 0.1, 10.0, 10.0, 10.1, 10.0, 10.0, 10.1],
        );
        let centroids = kmeans(&obs, 2, 20, 3).unwrap();
        assert_eq!(centroids.len(), 2);
        assert!(centroids.iter().all(|c| c.len() == 2));
        let mut firsts = centroids.iter().map(|c| c[0]).collect::<Vec<_>>();
        firsts.sort_by(f64::total_cmp);
        assert!(firsts[0] < 1.0);
        assert!(firsts[1] > 9.0);
    }

    #[test]
    fn test_same_seed_gives_same_centroids() {
        let obs = DMatrix::from_fn(40, 3, |t, j| ((t * 13 + j * 7) % 11) as f64);
        let a = kmeans(&obs, 4, 30, 17).unwrap();
        let b = kmeans(&obs, 4, 30, 17).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identical_rows_are_rejected() {
        let obs = DMatrix::from_element(5, 3, 1.0);
        assert_eq!(
            kmeans(&obs, 3, 10, 0).unwrap_err(),
            HmmError::TooFewDistinctObservations {
                distinct: 1,
                n_states: 3
            }
        );
        assert_eq!(kmeans(&obs, 1, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_count_distinct_rows() {
        let obs = DMatrix::from_row_slice(4, 2, &[1.0, 2.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0]);
        assert_eq!(count_distinct_rows(&obs), 2);
    }
}
