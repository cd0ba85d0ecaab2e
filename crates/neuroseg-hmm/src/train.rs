use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::{
    GaussianHmm, HmmError,
    init::kmeans,
    model::{Posteriors, check_observations},
};

/// Responsibility below which a state is considered unused.
const MIN_STATE_OCCUPANCY: f64 = 1e-8;

/// Training parameters for [`HmmTrainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmmConfig {
    /// Number of hidden states.
    pub n_states: usize,
    /// Maximum number of EM iterations.
    pub max_iter: usize,
    /// Convergence threshold on the log-likelihood gain between iterations.
    pub tolerance: f64,
    /// Value added to the diagonal of every covariance matrix.
    pub min_covar: f64,
    /// Seed for the k-means initialization.
    pub seed: u64,
    /// Lloyd iterations used to initialize the state means.
    pub kmeans_iter: usize,
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self {
            n_states: 6,
            max_iter: 100,
            tolerance: 1e-2,
            min_covar: 1e-3,
            seed: 0,
            kmeans_iter: 50,
        }
    }
}

/// Outcome of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    /// Number of EM iterations evaluated.
    pub iterations: usize,
    /// Log-likelihood of the returned model.
    pub log_likelihood: f64,
    /// Whether the log-likelihood gain fell below the tolerance.
    pub converged: bool,
    /// Log-likelihood after each iteration.
    pub history: Vec<f64>,
}

/// Baum-Welch trainer for [`GaussianHmm`].
#[derive(Debug, Clone)]
pub struct HmmTrainer {
    config: HmmConfig,
}

impl HmmTrainer {
    #[must_use]
    pub fn new(config: HmmConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &HmmConfig {
        &self.config
    }

    /// Fits a model to `obs` (rows are time bins, columns are features).
    ///
    /// Iterates expectation-maximization until the log-likelihood gain drops
    /// below the tolerance or the iteration cap is reached. When the cap is
    /// reached first a warning is logged and the best model seen so far is
    /// returned with `converged == false`.
    ///
    /// # Errors
    ///
    /// Fails on empty or non-finite input, fewer observations than states, a
    /// state whose covariance becomes singular, or a state that receives no
    /// responsibility.
    pub fn fit(&self, obs: &DMatrix<f64>) -> Result<(GaussianHmm, FitReport), HmmError> {
        let n_states = self.config.n_states;
        if n_states == 0 {
            return Err(HmmError::NoStates);
        }
        check_observations(obs, obs.ncols())?;
        if obs.ncols() == 0 {
            return Err(HmmError::FeatureMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if obs.nrows() < n_states {
            return Err(HmmError::TooFewObservations {
                n_samples: obs.nrows(),
                n_states,
            });
        }

        let mut model = self.initial_model(obs)?;
        let mut history = Vec::with_capacity(self.config.max_iter);
        let mut best: Option<(GaussianHmm, f64)> = None;
        let mut converged = false;

        for iteration in 1..=self.config.max_iter {
            let posteriors = model.posteriors(obs)?;
            let log_likelihood = posteriors.log_likelihood;
            tracing::debug!(iteration, log_likelihood, "EM iteration");

            let gain = history.last().map(|prev| log_likelihood - prev);
            history.push(log_likelihood);
            if best.as_ref().is_none_or(|(_, ll)| log_likelihood > *ll) {
                best = Some((model.clone(), log_likelihood));
            }
            if gain.is_some_and(|gain| gain.abs() < self.config.tolerance) {
                converged = true;
                break;
            }
            if iteration < self.config.max_iter {
                model = self.maximize(obs, &model, &posteriors)?;
            }
        }

        let Some((model, log_likelihood)) = best else {
            return Err(HmmError::InvalidParameters {
                reason: "max_iter must be at least 1".to_owned(),
            });
        };
        if !converged {
            tracing::warn!(
                max_iter = self.config.max_iter,
                log_likelihood,
                "HMM training did not converge; using best model found"
            );
        }
        let report = FitReport {
            iterations: history.len(),
            log_likelihood,
            converged,
            history,
        };
        Ok((model, report))
    }

    /// k-means means, global covariance, uniform start and transition probabilities.
    #[expect(clippy::cast_precision_loss)]
    fn initial_model(&self, obs: &DMatrix<f64>) -> Result<GaussianHmm, HmmError> {
        let n_states = self.config.n_states;
        let means = kmeans(obs, n_states, self.config.kmeans_iter, self.config.seed)?;

        let weights = DVector::from_element(obs.nrows(), 1.0 / obs.nrows() as f64);
        let global_mean = obs.row_mean().transpose();
        let global_covar = self.weighted_covariance(obs, &global_mean, &weights);

        GaussianHmm::new(
            DVector::from_element(n_states, 1.0 / n_states as f64),
            DMatrix::from_element(n_states, n_states, 1.0 / n_states as f64),
            means,
            vec![global_covar; n_states],
        )
    }

    /// M-step: re-estimates every parameter from the posteriors.
    fn maximize(
        &self,
        obs: &DMatrix<f64>,
        model: &GaussianHmm,
        posteriors: &Posteriors,
    ) -> Result<GaussianHmm, HmmError> {
        let n_states = model.n_states();
        let gamma = &posteriors.gamma;

        let start_prob = gamma.row(0).transpose();
        let start_prob = &start_prob / start_prob.sum();

        let mut trans_prob = posteriors.xi_sum.clone();
        for (i, mut row) in trans_prob.row_iter_mut().enumerate() {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            } else {
                // State only visited in the last bin; keep its previous transitions
                row.copy_from(&model.trans_prob().row(i));
            }
        }

        let mut means = Vec::with_capacity(n_states);
        let mut covars = Vec::with_capacity(n_states);
        for state in 0..n_states {
            let weights = gamma.column(state).into_owned();
            let occupancy = weights.sum();
            if occupancy < MIN_STATE_OCCUPANCY {
                return Err(HmmError::DegenerateState { state });
            }
            let weights = weights / occupancy;
            let mean = obs.transpose() * &weights;
            covars.push(self.weighted_covariance(obs, &mean, &weights));
            means.push(mean);
        }

        GaussianHmm::new(start_prob, trans_prob, means, covars)
    }

    /// `sum_t w_t (x_t - mean)(x_t - mean)^T + min_covar * I` for normalized weights.
    fn weighted_covariance(
        &self,
        obs: &DMatrix<f64>,
        mean: &DVector<f64>,
        weights: &DVector<f64>,
    ) -> DMatrix<f64> {
        let mut centered = obs.clone();
        for mut row in centered.row_iter_mut() {
            row -= &mean.transpose();
        }
        let mut weighted = centered.clone();
        for (mut row, w) in weighted.row_iter_mut().zip(weights.iter()) {
            row *= *w;
        }
        let n_features = obs.ncols();
        let mut covar = weighted.transpose() * centered;
        // Symmetrize against rounding before the Cholesky factorization
        covar = (&covar + covar.transpose()) * 0.5;
        covar + DMatrix::identity(n_features, n_features) * self.config.min_covar
    }
}
