#![deny(warnings)]

//! Core domain types and invariants for the pilot ROI engine.
//!
//! This crate defines the serializable inputs, policy configuration, and
//! result types shared across the workspace, with validation helpers that
//! guarantee the numeric ranges the simulator relies on.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of months the cashflow simulator always runs, independent of the
/// headline horizon. Chosen to sit well beyond the longest horizon (36) so
/// payback can be detected even when it falls outside the headline window.
pub const SIMULATION_MONTHS: u32 = 60;

/// Deployment strategy selected by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanChoice {
    /// Every unit targets the free segment.
    GrowthOnly,
    /// Units are split between segments at the configured ratio.
    GrowthAndRetention,
}

/// Baseline free→paid monthly conversion rate, with the default made
/// explicit in the type rather than inferred from an absent field.
///
/// On the wire this is an optional number: absent or null means
/// `UseDefault`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum BaselineConversion {
    /// Caller-observed monthly conversion rate in [0, 1).
    Provided(f64),
    /// Fall back to `RoiConfig::default_baseline_conversion_rate`.
    #[default]
    UseDefault,
}

impl From<Option<f64>> for BaselineConversion {
    fn from(rate: Option<f64>) -> Self {
        match rate {
            Some(r) => BaselineConversion::Provided(r),
            None => BaselineConversion::UseDefault,
        }
    }
}

impl From<BaselineConversion> for Option<f64> {
    fn from(value: BaselineConversion) -> Self {
        match value {
            BaselineConversion::Provided(r) => Some(r),
            BaselineConversion::UseDefault => None,
        }
    }
}

impl BaselineConversion {
    /// Resolve against the configured default.
    pub fn resolve(self, config: &RoiConfig) -> f64 {
        match self {
            BaselineConversion::Provided(rate) => rate,
            BaselineConversion::UseDefault => config.default_baseline_conversion_rate,
        }
    }
}

/// Caller-supplied business inputs, immutable for the duration of a call.
///
/// The caller guarantees `free_subscribers` was derived upstream as
/// `max(0, total_subscribers - paid_subscribers)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoiInputs {
    /// Total marketing units available to allocate.
    pub total_units: u32,
    /// Current paid subscriber pool.
    pub paid_subscribers: u32,
    /// Current free subscriber pool.
    pub free_subscribers: u32,
    /// Average monthly revenue per paid subscriber, already normalized to a
    /// monthly equivalent if the underlying plan is annual.
    pub monthly_revenue_per_paid_user: Decimal,
    /// Expected tenure of a paid subscriber in months; baseline monthly
    /// churn is its reciprocal. Must be >= 1 so churn stays in (0, 1].
    pub avg_paid_lifetime_months: f64,
    /// Selected deployment strategy.
    pub plan_choice: PlanChoice,
    /// Observed monthly conversion rate, or the configured default.
    #[serde(default)]
    pub baseline_monthly_conversion: BaselineConversion,
}

/// Tunable policy constants, conceptually a versioned policy object.
///
/// A config is passed explicitly per call (or defaulted) and never mutated
/// by the engine; concurrent callers cannot observe each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    /// Gross margin retained on subscription revenue, in (0, 1].
    pub gross_margin_fraction: f64,
    /// Fraction of revenue kept by the platform rather than the creator,
    /// in [0, 1).
    pub platform_revenue_share_fraction: f64,
    /// Production-and-delivery cost of one unit in USD, > 0.
    pub cost_per_unit_usd: Decimal,
    /// Maximum relative lift applied to the baseline conversion rate at
    /// rollout, >= 0.
    pub conversion_uplift_alpha: f64,
    /// Maximum relative reduction applied to the baseline churn rate at
    /// rollout, in [0, 1).
    pub churn_reduction_beta: f64,
    /// Target share of units sent to the paid segment under the mixed
    /// plan, in [0, 1].
    pub paid_allocation_fraction: f64,
    /// Time constant in months of the exponential decay applied to both
    /// uplift and reduction effects, > 0.
    pub effect_decay_tau_months: f64,
    /// Window over which headline totals are summed, within
    /// [1, SIMULATION_MONTHS].
    pub horizon_months: u32,
    /// Conversion rate assumed when the caller did not provide one,
    /// in [0, 1).
    pub default_baseline_conversion_rate: f64,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            gross_margin_fraction: 0.8,
            platform_revenue_share_fraction: 0.10,
            cost_per_unit_usd: Decimal::new(10, 0),
            conversion_uplift_alpha: 0.8,
            churn_reduction_beta: 0.08,
            paid_allocation_fraction: 0.15,
            effect_decay_tau_months: 6.0,
            horizon_months: 12,
            default_baseline_conversion_rate: 0.02,
        }
    }
}

/// Unit split actually deployed after guardrail clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Units sent to the free segment.
    pub free: u32,
    /// Units sent to the paid segment.
    pub paid: u32,
}

impl Allocation {
    /// Total units actually deployed. May be below the requested pool when
    /// clamping reduced a segment.
    pub fn total(&self) -> u32 {
        self.free + self.paid
    }
}

/// Growth-track headline figures over the aggregation horizon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthSummary {
    /// Expected incremental free→paid conversions. Fractional users are
    /// meaningful as expected values and never rounded mid-computation.
    pub new_paid_users_in_horizon: f64,
    /// Gross incremental subscription revenue, before margin and platform
    /// share.
    pub revenue_in_horizon: f64,
    /// Net incremental profit from conversions.
    pub profit_in_horizon: f64,
    /// Whether the growth track alone recovers the pilot cost within the
    /// horizon. A standalone flag, not the authoritative total figure.
    pub is_profitable: bool,
}

/// Retention-track headline figures over the aggregation horizon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetentionSummary {
    /// Expected additional paid-user-months from reduced churn.
    pub extra_paid_user_months_in_horizon: f64,
    /// Net incremental profit from retained users.
    pub profit_in_horizon: f64,
}

/// Combined headline figures over the aggregation horizon.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TotalSummary {
    /// Profit from both tracks minus the upfront pilot cost.
    pub net_gain_in_horizon: f64,
    /// Net gain divided by pilot cost; defined as 0 when the pilot is
    /// free.
    pub roi_multiple: f64,
    /// First month with a non-negative cumulative net position, if reached
    /// within the simulation window.
    pub payback_months: Option<u32>,
}

/// One simulated month of incremental cashflow.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyFlow {
    /// 1-based month index since rollout.
    pub month: u32,
    /// Profit from incremental conversions this month.
    pub growth_profit: f64,
    /// Profit from incremental surviving paid users this month.
    pub retention_profit: f64,
    /// Sum of both tracks.
    pub total_profit: f64,
    /// Running profit sum minus the one-time pilot cost.
    pub cumulative_net_gain: f64,
}

/// Complete projection, constructed fresh per call and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiResult {
    /// Horizon the headline figures were aggregated over. Records the
    /// escalated horizon when adaptive evaluation changed it.
    pub horizon_months: u32,
    /// Unit split after guardrails.
    pub allocation: Allocation,
    /// `(free + paid) × cost_per_unit_usd`, exact.
    pub pilot_cost_usd: Decimal,
    /// Growth-track headline figures.
    pub growth: GrowthSummary,
    /// Retention-track headline figures.
    pub retention: RetentionSummary,
    /// Combined headline figures.
    pub total: TotalSummary,
    /// Full simulated window, one record per month, fully materialized and
    /// recomputable deterministically from the same inputs.
    pub monthly_flows: Vec<MonthlyFlow>,
}

/// Input validation failures. Negative counts are unrepresentable by type,
/// so only the real-valued fields need runtime checks.
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    /// A lifetime below one month would push monthly churn above 1.
    #[error("average paid lifetime must be at least 1 month, got {0}")]
    LifetimeTooShort(f64),
    /// Conversion rates are monthly probabilities.
    #[error("baseline conversion rate must be within [0, 1), got {0}")]
    ConversionOutOfRange(f64),
    /// Monetary inputs must be non-negative.
    #[error("monthly revenue per paid user must be >= 0")]
    NegativeRevenue,
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
}

/// Configuration validation failures, surfaced at call entry rather than
/// deferred into the simulation loop.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Margin of zero would make every projection identically zero.
    #[error("gross margin fraction must be within (0, 1], got {0}")]
    MarginOutOfRange(f64),
    /// The platform cannot retain the full revenue.
    #[error("platform revenue share must be within [0, 1), got {0}")]
    ShareOutOfRange(f64),
    /// Units are physical goods with a real production cost.
    #[error("cost per unit must be > 0")]
    NonPositiveUnitCost,
    /// Uplift is a relative lift factor.
    #[error("conversion uplift alpha must be >= 0, got {0}")]
    NegativeUplift(f64),
    /// A reduction of 1 would eliminate churn entirely.
    #[error("churn reduction beta must be within [0, 1), got {0}")]
    ReductionOutOfRange(f64),
    /// The paid share of the unit pool is a proportion.
    #[error("paid allocation fraction must be within [0, 1], got {0}")]
    AllocationFractionOutOfRange(f64),
    /// Decay with a non-positive time constant is undefined.
    #[error("effect decay tau must be > 0 months, got {0}")]
    NonPositiveDecayTau(f64),
    /// Aggregation cannot reach past the simulated window.
    #[error("horizon must be within [1, {SIMULATION_MONTHS}] months, got {0}")]
    HorizonOutOfRange(u32),
    /// The fallback conversion rate is a probability like any provided one.
    #[error("default baseline conversion rate must be within [0, 1), got {0}")]
    ConversionDefaultOutOfRange(f64),
    /// Numeric field must be finite.
    #[error("non-finite numeric value encountered")]
    NonFinite,
}

/// Validate caller inputs. Fails fast; the engine never silently clamps or
/// substitutes, except for the designed `BaselineConversion` default.
pub fn validate_inputs(inputs: &RoiInputs) -> Result<(), InputError> {
    if !inputs.avg_paid_lifetime_months.is_finite() {
        return Err(InputError::NonFinite);
    }
    if inputs.avg_paid_lifetime_months < 1.0 {
        return Err(InputError::LifetimeTooShort(
            inputs.avg_paid_lifetime_months,
        ));
    }
    if inputs.monthly_revenue_per_paid_user < Decimal::ZERO {
        return Err(InputError::NegativeRevenue);
    }
    if let BaselineConversion::Provided(rate) = inputs.baseline_monthly_conversion {
        if !rate.is_finite() {
            return Err(InputError::NonFinite);
        }
        if !(0.0..1.0).contains(&rate) {
            return Err(InputError::ConversionOutOfRange(rate));
        }
    }
    Ok(())
}

/// Validate a policy configuration.
pub fn validate_config(config: &RoiConfig) -> Result<(), ConfigError> {
    if !(config.gross_margin_fraction.is_finite()
        && config.platform_revenue_share_fraction.is_finite()
        && config.conversion_uplift_alpha.is_finite()
        && config.churn_reduction_beta.is_finite()
        && config.paid_allocation_fraction.is_finite()
        && config.effect_decay_tau_months.is_finite()
        && config.default_baseline_conversion_rate.is_finite())
    {
        return Err(ConfigError::NonFinite);
    }
    if !(config.gross_margin_fraction > 0.0 && config.gross_margin_fraction <= 1.0) {
        return Err(ConfigError::MarginOutOfRange(config.gross_margin_fraction));
    }
    if !(0.0..1.0).contains(&config.platform_revenue_share_fraction) {
        return Err(ConfigError::ShareOutOfRange(
            config.platform_revenue_share_fraction,
        ));
    }
    if config.cost_per_unit_usd <= Decimal::ZERO {
        return Err(ConfigError::NonPositiveUnitCost);
    }
    if config.conversion_uplift_alpha < 0.0 {
        return Err(ConfigError::NegativeUplift(config.conversion_uplift_alpha));
    }
    if !(0.0..1.0).contains(&config.churn_reduction_beta) {
        return Err(ConfigError::ReductionOutOfRange(config.churn_reduction_beta));
    }
    if !(0.0..=1.0).contains(&config.paid_allocation_fraction) {
        return Err(ConfigError::AllocationFractionOutOfRange(
            config.paid_allocation_fraction,
        ));
    }
    if config.effect_decay_tau_months <= 0.0 {
        return Err(ConfigError::NonPositiveDecayTau(
            config.effect_decay_tau_months,
        ));
    }
    if config.horizon_months == 0 || config.horizon_months > SIMULATION_MONTHS {
        return Err(ConfigError::HorizonOutOfRange(config.horizon_months));
    }
    if !(0.0..1.0).contains(&config.default_baseline_conversion_rate) {
        return Err(ConfigError::ConversionDefaultOutOfRange(
            config.default_baseline_conversion_rate,
        ));
    }
    Ok(())
}
