//! Online value estimator backing every agent's bid.
//!
//! A single-hidden-layer network over log-compressed inputs:
//!
//! ```text
//! x_i = ln(1 + f_i)
//! h_j = tanh(b_j + Σ_i W_ji · x_i)
//! q   = c + Σ_j v_j · h_j
//! ```
//!
//! The hidden layer is bounded, so the output stays finite for any finite
//! non-negative input as long as the parameters are finite. Parameters are
//! checked after every update and [`EstimatorError::Diverged`] is returned
//! if any of them went non-finite.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Errors from estimator calls.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimatorError {
    /// The feature vector has the wrong number of components.
    #[error("state vector has {actual} components, expected {expected}")]
    Shape {
        /// Components the estimator was built for.
        expected: usize,
        /// Components that were supplied.
        actual: usize,
    },
    /// A feature or training target is negative or non-finite.
    #[error("invalid estimator input: {0}")]
    InvalidInput(String),
    /// Parameters became non-finite after an update.
    #[error("estimator parameters diverged")]
    Diverged,
}

/// Hyper-parameters for a [`BidEstimator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Width of the hidden layer.
    pub hidden_units: usize,
    /// Step size for each gradient update.
    pub learning_rate: f64,
    /// Bound on the absolute prediction error used for the gradient.
    pub error_clip: f64,
    /// Initial weights are drawn uniformly from `[-init_scale, init_scale]`.
    pub init_scale: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            hidden_units: 8,
            learning_rate: 0.02,
            error_clip: 1.0,
            init_scale: 0.1,
        }
    }
}

impl EstimatorConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.hidden_units == 0 {
            return Err("estimator hidden_units must be positive".to_string());
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err("estimator learning_rate must be a positive number".to_string());
        }
        if !(self.error_clip.is_finite() && self.error_clip > 0.0) {
            return Err("estimator error_clip must be a positive number".to_string());
        }
        if !(self.init_scale.is_finite() && self.init_scale >= 0.0) {
            return Err("estimator init_scale must be non-negative".to_string());
        }
        Ok(())
    }
}

/// Small function approximator mapping a state vector to a scalar value.
#[derive(Debug, Clone)]
pub struct BidEstimator {
    config: EstimatorConfig,
    inputs: usize,
    seed: u64,
    /// Hidden weights, row-major `[hidden_units][inputs]`.
    hidden_weights: Vec<f64>,
    hidden_bias: Vec<f64>,
    output_weights: Vec<f64>,
    output_bias: f64,
    updates: u64,
}

impl BidEstimator {
    /// Creates an estimator for `inputs` features, initialised from `seed`.
    ///
    /// An estimator always has at least one input.
    #[must_use]
    pub fn new(inputs: usize, config: EstimatorConfig, seed: u64) -> Self {
        let inputs = inputs.max(1);
        let mut estimator = Self {
            hidden_weights: Vec::new(),
            hidden_bias: Vec::new(),
            output_weights: Vec::new(),
            output_bias: 0.0,
            config,
            inputs,
            seed,
            updates: 0,
        };
        estimator.reset();
        estimator
    }

    /// Number of features this estimator expects.
    #[must_use]
    pub const fn input_dim(&self) -> usize {
        self.inputs
    }

    /// Number of successful updates since the last reset.
    #[must_use]
    pub const fn updates(&self) -> u64 {
        self.updates
    }

    /// Restores the initial parameters derived from the construction seed.
    pub fn reset(&mut self) {
        let hidden = self.config.hidden_units;
        let scale = self.config.init_scale;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut draw = move || {
            if scale > 0.0 {
                rng.gen_range(-scale..=scale)
            } else {
                0.0
            }
        };

        self.hidden_weights = (0..hidden * self.inputs).map(|_| draw()).collect();
        self.hidden_bias = (0..hidden).map(|_| draw()).collect();
        self.output_weights = (0..hidden).map(|_| draw()).collect();
        self.output_bias = 0.0;
        self.updates = 0;
    }

    /// Returns true if every parameter is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.output_bias.is_finite()
            && self
                .hidden_weights
                .iter()
                .chain(&self.hidden_bias)
                .chain(&self.output_weights)
                .all(|w| w.is_finite())
    }

    /// Estimates the value of a state.
    pub fn estimate(&self, features: &[f64]) -> Result<f64, EstimatorError> {
        let inputs = self.prepare(features)?;
        let hidden = self.hidden_activations(&inputs);
        Ok(self.output(&hidden))
    }

    /// Performs one gradient step toward `actual_bid + reward`.
    ///
    /// Returns the clipped prediction error that drove the step. Callers are
    /// expected to bound `reward` beforehand.
    pub fn update(
        &mut self,
        features: &[f64],
        actual_bid: f64,
        reward: f64,
    ) -> Result<f64, EstimatorError> {
        let inputs = self.prepare(features)?;
        let target = actual_bid + reward;
        if !target.is_finite() {
            return Err(EstimatorError::InvalidInput(format!(
                "non-finite target (bid {actual_bid}, reward {reward})"
            )));
        }

        let hidden = self.hidden_activations(&inputs);
        let prediction = self.output(&hidden);
        let clip = self.config.error_clip;
        let error = (prediction - target).clamp(-clip, clip);
        let step = self.config.learning_rate * error;

        for (j, h) in hidden.iter().enumerate() {
            // Back-propagate through tanh using the pre-update output weight.
            let delta = step * self.output_weights[j] * (1.0 - h * h);
            let row = &mut self.hidden_weights[j * self.inputs..(j + 1) * self.inputs];
            for (w, x) in row.iter_mut().zip(&inputs) {
                *w -= delta * x;
            }
            self.hidden_bias[j] -= delta;
            self.output_weights[j] -= step * h;
        }
        self.output_bias -= step;

        if !self.is_finite() {
            return Err(EstimatorError::Diverged);
        }
        self.updates += 1;
        Ok(error)
    }

    fn prepare(&self, features: &[f64]) -> Result<Vec<f64>, EstimatorError> {
        if features.len() != self.inputs {
            return Err(EstimatorError::Shape {
                expected: self.inputs,
                actual: features.len(),
            });
        }
        features
            .iter()
            .map(|&f| {
                if f.is_finite() && f >= 0.0 {
                    Ok(f.ln_1p())
                } else {
                    Err(EstimatorError::InvalidInput(format!(
                        "feature {f} must be finite and non-negative"
                    )))
                }
            })
            .collect()
    }

    fn hidden_activations(&self, inputs: &[f64]) -> Vec<f64> {
        self.hidden_weights
            .chunks(self.inputs)
            .zip(&self.hidden_bias)
            .map(|(row, bias)| {
                let z: f64 = row.iter().zip(inputs).map(|(w, x)| w * x).sum();
                (z + bias).tanh()
            })
            .collect()
    }

    fn output(&self, hidden: &[f64]) -> f64 {
        self.output_bias
            + self
                .output_weights
                .iter()
                .zip(hidden)
                .map(|(v, h)| v * h)
                .sum::<f64>()
    }

    #[cfg(test)]
    pub(crate) fn poison(&mut self) {
        self.output_bias = f64::NAN;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn estimator() -> BidEstimator {
        BidEstimator::new(2, EstimatorConfig::default(), 7)
    }

    #[test]
    fn same_seed_gives_same_estimates() {
        let a = estimator();
        let b = estimator();
        assert_eq!(
            a.estimate(&[100.0, 10.0]).unwrap(),
            b.estimate(&[100.0, 10.0]).unwrap()
        );
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let est = estimator();
        let err = est.estimate(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            EstimatorError::Shape {
                expected: 2,
                actual: 3
            }
        );

        let mut est = estimator();
        assert!(matches!(
            est.update(&[1.0], 0.0, 1.0),
            Err(EstimatorError::Shape { .. })
        ));
        assert_eq!(est.updates(), 0);
    }

    #[test]
    fn zero_inputs_still_reports_shape_errors() {
        let mut est = BidEstimator::new(0, EstimatorConfig::default(), 7);
        assert_eq!(est.input_dim(), 1);
        assert_eq!(
            est.estimate(&[]).unwrap_err(),
            EstimatorError::Shape {
                expected: 1,
                actual: 0
            }
        );
        assert!(matches!(
            est.update(&[], 0.0, 0.0),
            Err(EstimatorError::Shape { .. })
        ));
        assert!(est.estimate(&[3.0]).unwrap().is_finite());
    }

    #[test]
    fn negative_feature_is_rejected() {
        let est = estimator();
        assert!(matches!(
            est.estimate(&[-1.0, 2.0]),
            Err(EstimatorError::InvalidInput(_))
        ));
    }

    #[test]
    fn non_finite_target_leaves_weights_untouched() {
        let mut est = estimator();
        let before = est.estimate(&[50.0, 3.0]).unwrap();
        assert!(est.update(&[50.0, 3.0], f64::NAN, 1.0).is_err());
        assert_eq!(est.estimate(&[50.0, 3.0]).unwrap(), before);
    }

    #[test]
    fn update_moves_estimate_toward_target() {
        let mut est = estimator();
        let state = [100.0, 10.0];
        let before = est.estimate(&state).unwrap();
        for _ in 0..50 {
            est.update(&state, 0.3, 0.2).unwrap();
        }
        let after = est.estimate(&state).unwrap();
        assert!((after - 0.5).abs() < (before - 0.5).abs());
        assert_eq!(est.updates(), 50);
    }

    #[test]
    fn large_rewards_stay_finite() {
        let mut est = estimator();
        for i in 0..200 {
            let reward = if i % 2 == 0 { 1000.0 } else { -1000.0 };
            est.update(&[1_000.0, 1.0], 0.0, reward).unwrap();
        }
        assert!(est.is_finite());
        assert!(est.estimate(&[1_000.0, 1.0]).unwrap().is_finite());
    }

    #[test]
    fn poisoned_parameters_report_divergence_and_reset_restores() {
        let mut est = estimator();
        let initial = est.estimate(&[10.0, 1.0]).unwrap();
        est.poison();
        assert_eq!(est.update(&[10.0, 1.0], 0.0, 0.0), Err(EstimatorError::Diverged));
        est.reset();
        assert!(est.is_finite());
        assert_eq!(est.estimate(&[10.0, 1.0]).unwrap(), initial);
    }

    #[test]
    fn config_validation() {
        assert!(EstimatorConfig::default().validate().is_ok());
        let bad = EstimatorConfig {
            hidden_units: 0,
            ..EstimatorConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = EstimatorConfig {
            learning_rate: f64::NAN,
            ..EstimatorConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    proptest! {
        #[test]
        fn estimate_is_finite_for_valid_states(
            seed in any::<u64>(),
            price in 0.0f64..1.0e9,
            remaining in 0.0f64..1.0e6,
        ) {
            let est = BidEstimator::new(2, EstimatorConfig::default(), seed);
            let value = est.estimate(&[price, remaining]).unwrap();
            prop_assert!(value.is_finite());
        }

        #[test]
        fn estimate_stays_finite_after_bounded_updates(
            seed in any::<u64>(),
            rewards in prop::collection::vec(-1000.0f64..1000.0, 1..40),
            price in 0.0f64..1.0e4,
        ) {
            let mut est = BidEstimator::new(2, EstimatorConfig::default(), seed);
            for reward in rewards {
                est.update(&[price, 5.0], 0.1, reward).unwrap();
            }
            prop_assert!(est.estimate(&[price, 5.0]).unwrap().is_finite());
        }
    }
}
