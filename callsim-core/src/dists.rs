//! Distributions for arrival patterns and service times
//!
//! Arrivals follow a Poisson process. Service times are described by a
//! [`ServiceTimeSpec`], a family tag plus mean and shape parameters, which is
//! resolved once per run into a [`ServiceTimeSampler`].
//!
//! None of the types here own a random number generator: the caller passes in
//! the generator that belongs to the current run, so replications never share
//! random state.
//!
//! All values are in minutes.

use crate::error::{DistributionError, SimError};
use crate::SimTime;
use rand::Rng;
use rand_distr::{Distribution, Exp, Gamma, LogNormal, Normal, Uniform};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Lower bound applied to normal samples and to the low end of uniform ranges.
pub const MIN_SERVICE_TIME_MINUTES: f64 = 0.1;

/// Default coefficient of variation for lognormal and gamma service times.
pub const DEFAULT_CV: f64 = 0.5;

/// Default uniform half-range, as a fraction of the mean.
pub const DEFAULT_RANGE_FACTOR: f64 = 0.5;

/// Default normal standard deviation, as a fraction of the mean.
pub const DEFAULT_STD_DEV_FACTOR: f64 = 0.2;

// =============================================================================
// Arrivals
// =============================================================================

/// Poisson arrival pattern
///
/// Inter-arrival gaps are exponentially distributed with the given rate
/// (arrivals per minute).
#[derive(Debug, Clone)]
pub struct PoissonArrivals {
    rate: f64,
    exp_dist: Exp<f64>,
}

impl PoissonArrivals {
    /// Create a new Poisson arrival pattern
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless `rate` is positive and finite.
    pub fn new(rate: f64) -> Result<Self, SimError> {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(SimError::configuration(format!(
                "arrival rate must be positive, got {rate}"
            )));
        }
        let exp_dist = Exp::new(rate)
            .map_err(|e| SimError::configuration(format!("arrival rate {rate}: {e}")))?;
        Ok(Self { rate, exp_dist })
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Draw the gap until the next arrival.
    pub fn next_arrival_time<R: Rng + ?Sized>(&self, rng: &mut R) -> SimTime {
        SimTime::from_minutes(self.exp_dist.sample(rng))
    }
}

// =============================================================================
// Service time specification
// =============================================================================

/// Family of the service time distribution.
///
/// Parsing never fails: an unrecognised name becomes [`ServiceDistribution::Unknown`],
/// which samples like an exponential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceDistribution {
    #[default]
    Exponential,
    Normal,
    Lognormal,
    Uniform,
    Gamma,
    Deterministic,
    #[serde(other)]
    Unknown,
}

impl ServiceDistribution {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceDistribution::Exponential => "exponential",
            ServiceDistribution::Normal => "normal",
            ServiceDistribution::Lognormal => "lognormal",
            ServiceDistribution::Uniform => "uniform",
            ServiceDistribution::Gamma => "gamma",
            ServiceDistribution::Deterministic => "deterministic",
            ServiceDistribution::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ServiceDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceDistribution {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "exponential" => ServiceDistribution::Exponential,
            "normal" => ServiceDistribution::Normal,
            "lognormal" => ServiceDistribution::Lognormal,
            "uniform" => ServiceDistribution::Uniform,
            "gamma" => ServiceDistribution::Gamma,
            "deterministic" => ServiceDistribution::Deterministic,
            _ => ServiceDistribution::Unknown,
        })
    }
}

/// Service time distribution family plus its parameters (minutes).
///
/// Shape parameters are optional; when a family needs one that is missing,
/// `std_dev` defaults to 20% of the mean and `cv`/`range_factor` to 0.5.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTimeSpec {
    #[serde(default)]
    pub distribution: ServiceDistribution,
    pub mean: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_factor: Option<f64>,
}

impl Default for ServiceTimeSpec {
    fn default() -> Self {
        Self::exponential(5.0)
    }
}

impl ServiceTimeSpec {
    fn with_family(distribution: ServiceDistribution, mean: f64) -> Self {
        Self {
            distribution,
            mean,
            std_dev: None,
            cv: None,
            range_factor: None,
        }
    }

    pub fn exponential(mean: f64) -> Self {
        Self::with_family(ServiceDistribution::Exponential, mean)
    }

    pub fn normal(mean: f64, std_dev: f64) -> Self {
        Self {
            std_dev: Some(std_dev),
            ..Self::with_family(ServiceDistribution::Normal, mean)
        }
    }

    pub fn lognormal(mean: f64, cv: f64) -> Self {
        Self {
            cv: Some(cv),
            ..Self::with_family(ServiceDistribution::Lognormal, mean)
        }
    }

    pub fn uniform(mean: f64, range_factor: f64) -> Self {
        Self {
            range_factor: Some(range_factor),
            ..Self::with_family(ServiceDistribution::Uniform, mean)
        }
    }

    pub fn gamma(mean: f64, cv: f64) -> Self {
        Self {
            cv: Some(cv),
            ..Self::with_family(ServiceDistribution::Gamma, mean)
        }
    }

    pub fn deterministic(mean: f64) -> Self {
        Self::with_family(ServiceDistribution::Deterministic, mean)
    }

    pub fn std_dev_or_default(&self) -> f64 {
        self.std_dev.unwrap_or(self.mean * DEFAULT_STD_DEV_FACTOR)
    }

    pub fn cv_or_default(&self) -> f64 {
        self.cv.unwrap_or(DEFAULT_CV)
    }

    pub fn range_factor_or_default(&self) -> f64 {
        self.range_factor.unwrap_or(DEFAULT_RANGE_FACTOR)
    }

    /// Checks the one invariant the exponential fallback itself depends on.
    pub fn validate_mean(&self) -> Result<(), DistributionError> {
        if self.mean.is_finite() && self.mean > 0.0 {
            Ok(())
        } else {
            Err(DistributionError::InvalidMean(self.mean))
        }
    }

    /// Resolve the spec into a samplable law without any fallback.
    fn resolve(&self) -> Result<ServiceLaw, DistributionError> {
        self.validate_mean()?;
        let mean = self.mean;
        let family = self.distribution.as_str();

        match self.distribution {
            ServiceDistribution::Exponential | ServiceDistribution::Unknown => exponential_law(mean),
            ServiceDistribution::Normal => {
                let std_dev = self.std_dev_or_default();
                require_positive(family, "std_dev", std_dev)?;
                Normal::new(mean, std_dev)
                    .map(ServiceLaw::Normal)
                    .map_err(|_| invalid(family, "std_dev", "positive and finite", std_dev))
            }
            ServiceDistribution::Lognormal => {
                let cv = self.cv_or_default();
                require_positive(family, "cv", cv)?;
                let variance = (cv * mean).powi(2);
                let mu = (mean.powi(2) / (variance + mean.powi(2)).sqrt()).ln();
                let sigma = (1.0 + variance / mean.powi(2)).ln().sqrt();
                LogNormal::new(mu, sigma)
                    .map(ServiceLaw::LogNormal)
                    .map_err(|_| invalid(family, "cv", "small enough for a finite sigma", cv))
            }
            ServiceDistribution::Uniform => {
                let range_factor = self.range_factor_or_default();
                if !(range_factor > 0.0 && range_factor < 1.0) {
                    return Err(invalid(family, "range_factor", "in (0, 1)", range_factor));
                }
                let half_range = mean * range_factor;
                let low = MIN_SERVICE_TIME_MINUTES.max(mean - half_range);
                let high = mean + half_range;
                if !(low < high) {
                    return Err(invalid(
                        family,
                        "range_factor",
                        "wide enough to clear the 0.1 minute floor",
                        range_factor,
                    ));
                }
                Ok(ServiceLaw::Uniform(Uniform::new(low, high)))
            }
            ServiceDistribution::Gamma => {
                let cv = self.cv_or_default();
                require_positive(family, "cv", cv)?;
                let shape = 1.0 / cv.powi(2);
                let rate = shape / mean;
                Gamma::new(shape, 1.0 / rate)
                    .map(ServiceLaw::Gamma)
                    .map_err(|_| invalid(family, "cv", "large enough for a finite shape", cv))
            }
            ServiceDistribution::Deterministic => Ok(ServiceLaw::Deterministic(mean)),
        }
    }
}

fn invalid(
    family: &'static str,
    parameter: &'static str,
    constraint: &'static str,
    value: f64,
) -> DistributionError {
    DistributionError::InvalidParameter {
        family,
        parameter,
        constraint,
        value,
    }
}

fn require_positive(
    family: &'static str,
    parameter: &'static str,
    value: f64,
) -> Result<(), DistributionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(family, parameter, "positive", value))
    }
}

fn exponential_law(mean: f64) -> Result<ServiceLaw, DistributionError> {
    Exp::new(1.0 / mean)
        .map(ServiceLaw::Exponential)
        .map_err(|_| DistributionError::InvalidMean(mean))
}

#[derive(Debug, Clone)]
enum ServiceLaw {
    Exponential(Exp<f64>),
    Normal(Normal<f64>),
    LogNormal(LogNormal<f64>),
    Uniform(Uniform<f64>),
    Gamma(Gamma<f64>),
    Deterministic(f64),
}

// =============================================================================
// Sampler
// =============================================================================

/// A [`ServiceTimeSpec`] resolved for sampling.
///
/// Invalid shape parameters do not abort the run: the sampler logs a warning
/// and draws from an exponential law with the same mean instead.
#[derive(Debug, Clone)]
pub struct ServiceTimeSampler {
    spec: ServiceTimeSpec,
    law: ServiceLaw,
    fallback: Option<DistributionError>,
}

impl ServiceTimeSampler {
    /// Build a sampler, degrading to exponential on invalid shape parameters.
    ///
    /// # Errors
    ///
    /// Fails only when the mean itself is unusable, since then there is no
    /// exponential law to fall back to.
    pub fn new(spec: ServiceTimeSpec) -> Result<Self, DistributionError> {
        spec.validate_mean()?;

        if spec.distribution == ServiceDistribution::Unknown {
            warn!(mean = spec.mean, "Unknown service distribution, sampling exponential");
        }

        match spec.resolve() {
            Ok(law) => Ok(Self {
                spec,
                law,
                fallback: None,
            }),
            Err(error) => {
                warn!(
                    distribution = %spec.distribution,
                    mean = spec.mean,
                    %error,
                    "Distribution parameter error, falling back to exponential"
                );
                Ok(Self {
                    law: exponential_law(spec.mean)?,
                    spec,
                    fallback: Some(error),
                })
            }
        }
    }

    pub fn spec(&self) -> &ServiceTimeSpec {
        &self.spec
    }

    pub fn mean(&self) -> f64 {
        self.spec.mean
    }

    /// The error that forced the exponential fallback, if any.
    pub fn fallback_reason(&self) -> Option<&DistributionError> {
        self.fallback.as_ref()
    }

    /// Draw one service time in minutes. Always finite and non-negative.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let minutes = match &self.law {
            ServiceLaw::Exponential(d) => d.sample(rng),
            ServiceLaw::Normal(d) => d.sample(rng).max(MIN_SERVICE_TIME_MINUTES),
            ServiceLaw::LogNormal(d) => d.sample(rng),
            ServiceLaw::Uniform(d) => d.sample(rng),
            ServiceLaw::Gamma(d) => d.sample(rng),
            ServiceLaw::Deterministic(mean) => *mean,
        };
        if minutes.is_finite() {
            minutes.max(0.0)
        } else {
            self.spec.mean
        }
    }

    /// Draw one service time as a simulation delay.
    pub fn sample_time<R: Rng + ?Sized>(&self, rng: &mut R) -> SimTime {
        SimTime::from_minutes(self.sample(rng))
    }
}
