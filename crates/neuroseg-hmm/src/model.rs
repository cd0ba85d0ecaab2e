use std::f64::consts::TAU;

use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

use crate::{
    HmmError,
    logspace::{log_add_exp, log_sum_exp, safe_ln},
};

const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// A hidden Markov model with full-covariance Gaussian emissions.
///
/// Parameters are stored in probability space; every algorithm works in log
/// space internally.
#[derive(Debug, Clone)]
pub struct GaussianHmm {
    start_prob: DVector<f64>,
    trans_prob: DMatrix<f64>,
    means: Vec<DVector<f64>>,
    covars: Vec<DMatrix<f64>>,
}

/// Per-sequence quantities computed by the forward-backward pass.
#[derive(Debug, Clone)]
pub(crate) struct Posteriors {
    pub(crate) log_likelihood: f64,
    /// `gamma[(t, k)]`: probability of being in state `k` at bin `t`.
    pub(crate) gamma: DMatrix<f64>,
    /// Expected number of `i -> j` transitions summed over the sequence.
    pub(crate) xi_sum: DMatrix<f64>,
}

impl GaussianHmm {
    /// Creates a model after validating shapes and probability constraints.
    ///
    /// # Errors
    ///
    /// Returns [`HmmError::NoStates`] for an empty state set and
    /// [`HmmError::InvalidParameters`] when dimensions disagree or a
    /// probability vector does not sum to one.
    pub fn new(
        start_prob: DVector<f64>,
        trans_prob: DMatrix<f64>,
        means: Vec<DVector<f64>>,
        covars: Vec<DMatrix<f64>>,
    ) -> Result<Self, HmmError> {
        let n_states = start_prob.len();
        if n_states == 0 {
            return Err(HmmError::NoStates);
        }
        let invalid = |reason: String| HmmError::InvalidParameters { reason };
        if trans_prob.shape() != (n_states, n_states) {
            return Err(invalid(format!(
                "transition matrix is {:?}, expected {n_states}x{n_states}",
                trans_prob.shape()
            )));
        }
        if means.len() != n_states || covars.len() != n_states {
            return Err(invalid(format!(
                "{} means and {} covariances for {n_states} states",
                means.len(),
                covars.len()
            )));
        }
        let n_features = means[0].len();
        if n_features == 0 {
            return Err(invalid("means have no features".to_owned()));
        }
        for (state, (mean, covar)) in means.iter().zip(&covars).enumerate() {
            if mean.len() != n_features || covar.shape() != (n_features, n_features) {
                return Err(invalid(format!(
                    "state {state} emission does not have {n_features} features"
                )));
            }
        }
        if start_prob.iter().any(|p| *p < 0.0)
            || (start_prob.sum() - 1.0).abs() > PROBABILITY_TOLERANCE
        {
            return Err(invalid(format!(
                "start probabilities sum to {}",
                start_prob.sum()
            )));
        }
        for (state, row) in trans_prob.row_iter().enumerate() {
            if row.iter().any(|p| *p < 0.0) || (row.sum() - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(invalid(format!(
                    "transition row {state} sums to {}",
                    row.sum()
                )));
            }
        }

        Ok(Self {
            start_prob,
            trans_prob,
            means,
            covars,
        })
    }

    #[must_use]
    pub fn n_states(&self) -> usize {
        self.start_prob.len()
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.means[0].len()
    }

    #[must_use]
    pub fn start_prob(&self) -> &DVector<f64> {
        &self.start_prob
    }

    #[must_use]
    pub fn trans_prob(&self) -> &DMatrix<f64> {
        &self.trans_prob
    }

    #[must_use]
    pub fn means(&self) -> &[DVector<f64>] {
        &self.means
    }

    #[must_use]
    pub fn covars(&self) -> &[DMatrix<f64>] {
        &self.covars
    }

    /// Total log-likelihood of `obs` under the model (forward algorithm).
    pub fn score(&self, obs: &DMatrix<f64>) -> Result<f64, HmmError> {
        let log_emissions = self.log_emissions(obs)?;
        let log_alpha = self.forward(&log_emissions);
        let last = log_alpha.nrows() - 1;
        Ok(log_sum_exp(log_alpha.row(last).iter().copied()))
    }

    /// Decodes the single most probable state sequence (Viterbi).
    ///
    /// Returns one label per observation row and the log-probability of the
    /// decoded path. Ties are broken toward the lower state index.
    pub fn decode(&self, obs: &DMatrix<f64>) -> Result<(Vec<usize>, f64), HmmError> {
        let log_emissions = self.log_emissions(obs)?;
        let log_trans = self.trans_prob.map(safe_ln);
        let (n_samples, n_states) = log_emissions.shape();

        let mut delta = DMatrix::from_element(n_samples, n_states, f64::NEG_INFINITY);
        let mut backpointer = vec![0_usize; n_samples * n_states];
        for k in 0..n_states {
            delta[(0, k)] = safe_ln(self.start_prob[k]) + log_emissions[(0, k)];
        }
        for t in 1..n_samples {
            for j in 0..n_states {
                let (best_i, best) =
                    argmax((0..n_states).map(|i| delta[(t - 1, i)] + log_trans[(i, j)]));
                delta[(t, j)] = best + log_emissions[(t, j)];
                backpointer[t * n_states + j] = best_i;
            }
        }

        let (mut state, log_prob) = argmax(delta.row(n_samples - 1).iter().copied());
        let mut path = vec![0; n_samples];
        path[n_samples - 1] = state;
        for t in (1..n_samples).rev() {
            state = backpointer[t * n_states + state];
            path[t - 1] = state;
        }
        Ok((path, log_prob))
    }

    /// Log-density of every observation under every state, shape `T x K`.
    pub(crate) fn log_emissions(&self, obs: &DMatrix<f64>) -> Result<DMatrix<f64>, HmmError> {
        check_observations(obs, self.n_features())?;
        let (n_samples, n_features) = obs.shape();
        #[expect(clippy::cast_precision_loss)]
        let log_norm = n_features as f64 * TAU.ln();

        let mut out = DMatrix::zeros(n_samples, self.n_states());
        for (state, (mean, covar)) in self.means.iter().zip(&self.covars).enumerate() {
            let cholesky = Cholesky::<f64, Dyn>::new(covar.clone())
                .ok_or(HmmError::SingularCovariance { state })?;
            let lower = cholesky.l();
            let log_det = 2.0 * lower.diagonal().iter().map(|d| d.ln()).sum::<f64>();
            if !log_det.is_finite() {
                return Err(HmmError::SingularCovariance { state });
            }

            // Columns are centered observations
            let mut centered = obs.transpose();
            for mut column in centered.column_iter_mut() {
                column -= mean;
            }
            let whitened = lower
                .solve_lower_triangular(&centered)
                .ok_or(HmmError::SingularCovariance { state })?;
            for (t, column) in whitened.column_iter().enumerate() {
                out[(t, state)] = -0.5 * (log_norm + log_det + column.norm_squared());
            }
        }
        Ok(out)
    }

    /// Forward pass in log space, shape `T x K`.
    fn forward(&self, log_emissions: &DMatrix<f64>) -> DMatrix<f64> {
        let log_trans = self.trans_prob.map(safe_ln);
        let (n_samples, n_states) = log_emissions.shape();
        let mut log_alpha = DMatrix::from_element(n_samples, n_states, f64::NEG_INFINITY);
        for k in 0..n_states {
            log_alpha[(0, k)] = safe_ln(self.start_prob[k]) + log_emissions[(0, k)];
        }
        for t in 1..n_samples {
            for j in 0..n_states {
                let acc = (0..n_states).fold(f64::NEG_INFINITY, |acc, i| {
                    log_add_exp(acc, log_alpha[(t - 1, i)] + log_trans[(i, j)])
                });
                log_alpha[(t, j)] = acc + log_emissions[(t, j)];
            }
        }
        log_alpha
    }

    /// Backward pass in log space, shape `T x K`.
    fn backward(&self, log_emissions: &DMatrix<f64>) -> DMatrix<f64> {
        let log_trans = self.trans_prob.map(safe_ln);
        let (n_samples, n_states) = log_emissions.shape();
        let mut log_beta = DMatrix::zeros(n_samples, n_states);
        for t in (0..n_samples - 1).rev() {
            for i in 0..n_states {
                log_beta[(t, i)] = log_sum_exp((0..n_states).map(|j| {
                    log_trans[(i, j)] + log_emissions[(t + 1, j)] + log_beta[(t + 1, j)]
                }));
            }
        }
        log_beta
    }

    /// Runs forward-backward and collects the sufficient statistics for EM.
    pub(crate) fn posteriors(&self, obs: &DMatrix<f64>) -> Result<Posteriors, HmmError> {
        let log_emissions = self.log_emissions(obs)?;
        let log_alpha = self.forward(&log_emissions);
        let log_beta = self.backward(&log_emissions);
        let log_trans = self.trans_prob.map(safe_ln);
        let (n_samples, n_states) = log_emissions.shape();

        let log_likelihood = log_sum_exp(log_alpha.row(n_samples - 1).iter().copied());
        if !log_likelihood.is_finite() {
            return Err(HmmError::InvalidParameters {
                reason: "observations have zero likelihood under the model".to_owned(),
            });
        }

        let gamma = DMatrix::from_fn(n_samples, n_states, |t, k| {
            (log_alpha[(t, k)] + log_beta[(t, k)] - log_likelihood).exp()
        });
        let mut xi_sum = DMatrix::zeros(n_states, n_states);
        for t in 0..n_samples - 1 {
            for i in 0..n_states {
                for j in 0..n_states {
                    xi_sum[(i, j)] += (log_alpha[(t, i)]
                        + log_trans[(i, j)]
                        + log_emissions[(t + 1, j)]
                        + log_beta[(t + 1, j)]
                        - log_likelihood)
                        .exp();
                }
            }
        }

        Ok(Posteriors {
            log_likelihood,
            gamma,
            xi_sum,
        })
    }
}

/// Checks that `obs` is non-empty, has `n_features` columns and only finite values.
pub(crate) fn check_observations(obs: &DMatrix<f64>, n_features: usize) -> Result<(), HmmError> {
    if obs.nrows() == 0 {
        return Err(HmmError::EmptyObservations);
    }
    if obs.ncols() != n_features {
        return Err(HmmError::FeatureMismatch {
            expected: n_features,
            actual: obs.ncols(),
        });
    }
    if let Some(row) = obs
        .row_iter()
        .position(|row| row.iter().any(|v| !v.is_finite()))
    {
        return Err(HmmError::NonFiniteObservation { row });
    }
    Ok(())
}

/// Index and value of the first maximum.
fn argmax<I>(values: I) -> (usize, f64)
where
    I: IntoIterator<Item = f64>,
{
    values
        .into_iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 { (i, v) } else { best }
        })
}
