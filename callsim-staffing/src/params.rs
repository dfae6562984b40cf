//! Parameter sets for single runs and staffing searches
//!
//! Every struct deserializes with `#[serde(default)]`, so a JSON object only
//! needs the fields that differ from the defaults below. Times are minutes
//! except the SLA threshold, which is given in seconds.
//!
//! | field | default |
//! |---|---|
//! | `arrival_rate` | 1.67 per minute |
//! | `service` | exponential, mean 5 |
//! | `horizon_minutes` | 1000 |
//! | `sla_target_pct` / `sla_threshold_seconds` | 80 / 20 |
//! | `abandonment_minutes` | 10 |
//! | `num_servers` | 12 |
//! | `min_agents` / `max_agents` | 1 / 50 |
//! | `num_replications` | 3 |
//! | `max_abandonment_rate` | 15 |

use crate::validation::{
    validate_finite, validate_non_negative, validate_positive, validate_range, Validate,
    ValidationError, ValidationResult,
};
use callsim_components::{CallCenterConfig, DEFAULT_RETRIAL_DELAY_MINUTES};
use callsim_core::ServiceTimeSpec;
use callsim_metrics::RunContext;
use serde::{Deserialize, Serialize};

/// What the call center faces: traffic, service, service level and customer
/// behaviour. Shared by single runs and the optimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workload {
    /// Customers per minute.
    pub arrival_rate: f64,
    pub service: ServiceTimeSpec,
    pub horizon_minutes: f64,
    pub sla_target_pct: f64,
    pub sla_threshold_seconds: f64,
    pub abandonment_minutes: Option<f64>,
    pub patience_minutes: Option<f64>,
    pub retrial_rate_pct: Option<f64>,
    pub retrial_delay_minutes: Option<f64>,
    pub max_capacity: Option<usize>,
}

impl Default for Workload {
    fn default() -> Self {
        Self {
            arrival_rate: 1.67,
            service: ServiceTimeSpec::exponential(5.0),
            horizon_minutes: 1000.0,
            sla_target_pct: 80.0,
            sla_threshold_seconds: 20.0,
            abandonment_minutes: Some(10.0),
            patience_minutes: None,
            retrial_rate_pct: None,
            retrial_delay_minutes: None,
            max_capacity: None,
        }
    }
}

impl Workload {
    /// Offered load in Erlangs.
    pub fn traffic_intensity(&self) -> f64 {
        self.arrival_rate * self.service.mean
    }

    /// Smallest server count that is not overloaded on average.
    pub fn theoretical_floor(&self) -> usize {
        (self.traffic_intensity().max(0.0) as usize).saturating_add(1)
    }

    pub fn call_center_config(&self, num_servers: usize) -> CallCenterConfig {
        CallCenterConfig {
            arrival_rate: self.arrival_rate,
            service: self.service.clone(),
            num_servers,
            abandonment_minutes: self.abandonment_minutes,
            patience_minutes: self.patience_minutes,
            retrial_rate_pct: self.retrial_rate_pct,
            retrial_delay_minutes: self
                .retrial_delay_minutes
                .unwrap_or(DEFAULT_RETRIAL_DELAY_MINUTES),
            max_capacity: self.max_capacity,
        }
    }

    pub fn run_context(&self, num_servers: usize) -> RunContext {
        RunContext {
            num_servers,
            horizon_minutes: self.horizon_minutes,
            sla_threshold_seconds: self.sla_threshold_seconds,
            sla_target_pct: self.sla_target_pct,
            offered_load: self.traffic_intensity(),
        }
    }
}

impl Validate for Workload {
    fn validate(&self) -> ValidationResult<()> {
        validate_finite("arrival_rate", self.arrival_rate)?;
        validate_positive("arrival_rate", self.arrival_rate)?;
        validate_finite("service.mean", self.service.mean)?;
        validate_positive("service.mean", self.service.mean)?;
        validate_finite("horizon_minutes", self.horizon_minutes)?;
        validate_positive("horizon_minutes", self.horizon_minutes)?;
        validate_range("sla_target_pct", self.sla_target_pct, 0.0, 100.0)?;
        validate_finite("sla_threshold_seconds", self.sla_threshold_seconds)?;
        validate_non_negative("sla_threshold_seconds", self.sla_threshold_seconds)?;
        if let Some(rate) = self.retrial_rate_pct {
            validate_range("retrial_rate_pct", rate, 0.0, 100.0)?;
        }
        if let Some(delay) = self.retrial_delay_minutes {
            validate_finite("retrial_delay_minutes", delay)?;
            validate_non_negative("retrial_delay_minutes", delay)?;
        }
        if let Some(max) = self.max_capacity {
            validate_positive("max_capacity", max)?;
        }
        // Timeouts <= 0 just disable the race; only NaN is malformed.
        for (field, value) in [
            ("abandonment_minutes", self.abandonment_minutes),
            ("patience_minutes", self.patience_minutes),
        ] {
            if value.is_some_and(f64::is_nan) {
                return Err(ValidationError::ConstraintViolation {
                    field: field.to_string(),
                    constraint: "a number".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Parameters of [`crate::run_simulation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    #[serde(flatten)]
    pub workload: Workload,
    pub num_servers: usize,
    /// Fixed seed for a reproducible run; entropy when absent.
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            workload: Workload::default(),
            num_servers: 12,
            seed: None,
        }
    }
}

impl Validate for SimulationParams {
    fn validate(&self) -> ValidationResult<()> {
        self.workload.validate()?;
        validate_positive("num_servers", self.num_servers)
    }
}

/// Parameters of [`crate::find_minimum_agents`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerParams {
    #[serde(flatten)]
    pub workload: Workload,
    /// Ceiling on the averaged abandonment rate, in percent.
    pub max_abandonment_rate: Option<f64>,
    pub min_agents: usize,
    pub max_agents: usize,
    pub num_replications: usize,
    /// Start the sweep at the theoretical floor instead of `min_agents`.
    pub skip_to_floor: bool,
    /// Base seed; replication `i` uses `seed + i`.
    pub seed: Option<u64>,
}

impl Default for OptimizerParams {
    fn default() -> Self {
        Self {
            workload: Workload::default(),
            max_abandonment_rate: Some(15.0),
            min_agents: 1,
            max_agents: 50,
            num_replications: 3,
            skip_to_floor: true,
            seed: Some(42),
        }
    }
}

impl Validate for OptimizerParams {
    fn validate(&self) -> ValidationResult<()> {
        self.workload.validate()?;
        validate_positive("min_agents", self.min_agents)?;
        validate_positive("num_replications", self.num_replications)?;
        if self.min_agents > self.max_agents {
            return Err(ValidationError::Inconsistent(format!(
                "min_agents ({}) exceeds max_agents ({})",
                self.min_agents, self.max_agents
            )));
        }
        if let Some(ceiling) = self.max_abandonment_rate {
            validate_range("max_abandonment_rate", ceiling, 0.0, 100.0)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsim_core::ServiceDistribution;

    #[test]
    fn test_defaults() {
        let params = OptimizerParams::default();
        assert_eq!(params.workload.arrival_rate, 1.67);
        assert_eq!(params.workload.service.mean, 5.0);
        assert_eq!(params.workload.horizon_minutes, 1000.0);
        assert_eq!(params.workload.abandonment_minutes, Some(10.0));
        assert_eq!(params.max_abandonment_rate, Some(15.0));
        assert_eq!((params.min_agents, params.max_agents), (1, 50));
        assert_eq!(params.num_replications, 3);
        assert!(params.validate().is_ok());
        assert_eq!(SimulationParams::default().num_servers, 12);
    }

    #[test]
    fn test_deserialize_partial_object() {
        let params: SimulationParams = serde_json::from_str(
            r#"{
                "arrival_rate": 2.5,
                "num_servers": 15,
                "service": {"distribution": "gamma", "mean": 4.0, "cv": 0.7},
                "abandonment_minutes": null,
                "seed": 7
            }"#,
        )
        .unwrap();
        assert_eq!(params.workload.arrival_rate, 2.5);
        assert_eq!(params.num_servers, 15);
        assert_eq!(params.workload.service.distribution, ServiceDistribution::Gamma);
        assert_eq!(params.workload.service.cv, Some(0.7));
        assert_eq!(params.workload.abandonment_minutes, None);
        assert_eq!(params.workload.sla_threshold_seconds, 20.0);
        assert_eq!(params.seed, Some(7));
    }

    #[test]
    fn test_empty_object_gives_defaults() {
        let params: OptimizerParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params, OptimizerParams::default());
    }

    #[test]
    fn test_traffic_intensity_and_floor() {
        let workload = Workload::default();
        assert!((workload.traffic_intensity() - 8.35).abs() < 1e-9);
        assert_eq!(workload.theoretical_floor(), 9);

        let exact = Workload {
            arrival_rate: 2.0,
            ..Workload::default()
        };
        assert_eq!(exact.theoretical_floor(), 11);

        let flood = Workload {
            arrival_rate: 1e20,
            ..Workload::default()
        };
        assert!(flood.validate().is_ok());
        assert_eq!(flood.theoretical_floor(), usize::MAX);
    }

    #[test]
    fn test_rejects_malformed_input() {
        let bad_rate = SimulationParams {
            workload: Workload {
                arrival_rate: 0.0,
                ..Workload::default()
            },
            ..SimulationParams::default()
        };
        assert!(bad_rate.validate().is_err());

        let bad_mean = SimulationParams {
            workload: Workload {
                service: ServiceTimeSpec::exponential(-1.0),
                ..Workload::default()
            },
            ..SimulationParams::default()
        };
        assert!(bad_mean.validate().is_err());

        let no_servers = SimulationParams {
            num_servers: 0,
            ..SimulationParams::default()
        };
        assert!(no_servers.validate().is_err());

        let bad_retrial = SimulationParams {
            workload: Workload {
                retrial_rate_pct: Some(150.0),
                ..Workload::default()
            },
            ..SimulationParams::default()
        };
        assert!(bad_retrial.validate().is_err());

        let inverted = OptimizerParams {
            min_agents: 10,
            max_agents: 5,
            ..OptimizerParams::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ValidationError::Inconsistent(_))
        ));

        let no_replications = OptimizerParams {
            num_replications: 0,
            ..OptimizerParams::default()
        };
        assert!(no_replications.validate().is_err());
    }

    #[test]
    fn test_call_center_config_uses_default_retrial_delay() {
        let config = Workload::default().call_center_config(4);
        assert_eq!(config.num_servers, 4);
        assert_eq!(config.retrial_delay_minutes, DEFAULT_RETRIAL_DELAY_MINUTES);
        assert_eq!(config.abandonment_minutes, Some(10.0));
    }
}
