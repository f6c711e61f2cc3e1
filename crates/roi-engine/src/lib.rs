#![deny(warnings)]

//! Pilot ROI engine: unit allocation, pilot sizing, and horizon-adaptive
//! evaluation built on the monthly cashflow simulator.
//!
//! Every operation is pure and deterministic: a call receives its inputs
//! and a config snapshot, returns a freshly constructed result, and keeps
//! no state between invocations.

pub mod schedule;
pub mod simulate;

use roi_core::{
    validate_config, validate_inputs, Allocation, ConfigError, InputError, PlanChoice, RoiConfig,
    RoiInputs, RoiResult,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

pub use simulate::{aggregate, simulate, Simulation};

/// Smallest pilot the operation supports.
pub const PILOT_MIN_UNITS: u32 = 1500;
/// Largest pilot the operation supports; bigger deployments leave the
/// pilot program entirely.
pub const PILOT_MAX_UNITS: u32 = 3000;

/// Errors produced by the engine, distinguishing bad inputs from bad
/// configuration so the form layer can map them to user-facing messages.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// Caller-supplied inputs failed validation.
    #[error(transparent)]
    Input(#[from] InputError),
    /// Policy configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Numeric conversion to floating point failed.
    #[error("non-finite numeric conversion")]
    NonFinite,
}

/// Split the unit pool between segments per plan policy and pool
/// guardrails.
///
/// Clamping never redistributes: units freed by one segment's cap are not
/// shifted to the other, so the deployed total may fall below
/// `total_units` when pools are small. Shifting would silently violate
/// the configured target ratio.
///
/// Example:
/// let alloc = allocate(&inputs, &RoiConfig::default());
/// assert!(alloc.free <= inputs.free_subscribers);
pub fn allocate(inputs: &RoiInputs, config: &RoiConfig) -> Allocation {
    let paid_target = match inputs.plan_choice {
        PlanChoice::GrowthOnly => 0,
        PlanChoice::GrowthAndRetention => {
            (f64::from(inputs.total_units) * config.paid_allocation_fraction).round() as u32
        }
    };
    let paid = paid_target.min(inputs.paid_subscribers).min(inputs.total_units);
    let free = (inputs.total_units - paid).min(inputs.free_subscribers);
    Allocation { free, paid }
}

/// Recommend a total pilot size from observed monthly recurring revenue.
///
/// The raw recommendation spends 10% of MRR at a fixed reference unit
/// cost of $2, then clamps to the supported band. The reference cost is
/// deliberately decoupled from `RoiConfig::cost_per_unit_usd` so sizing
/// bands stay stable when pricing changes. Monotone non-decreasing in
/// MRR.
///
/// Example:
/// let units = recommend_size(&inputs).unwrap();
/// assert!((PILOT_MIN_UNITS..=PILOT_MAX_UNITS).contains(&units));
pub fn recommend_size(inputs: &RoiInputs) -> Result<u32, EngineError> {
    validate_inputs(inputs)?;
    let mrr = Decimal::from(inputs.paid_subscribers) * inputs.monthly_revenue_per_paid_user;
    let budget = mrr * Decimal::new(10, 2);
    let raw = (budget / Decimal::new(2, 0))
        .to_f64()
        .ok_or(EngineError::NonFinite)?;
    Ok(raw
        .round()
        .clamp(f64::from(PILOT_MIN_UNITS), f64::from(PILOT_MAX_UNITS)) as u32)
}

/// Full evaluation at the config's horizon: validate, allocate, simulate
/// the whole window, aggregate headline figures.
pub fn allocate_and_simulate(
    inputs: &RoiInputs,
    config: &RoiConfig,
) -> Result<RoiResult, EngineError> {
    validate_inputs(inputs)?;
    validate_config(config)?;
    let allocation = allocate(inputs, config);
    let sim = simulate(inputs, allocation, config)?;
    Ok(aggregate(&sim, config.horizon_months))
}

/// Evaluate at a 12-month horizon first; if the headline net gain is
/// negative, escalate once to 24 months (when payback arrives by then) or
/// 36 months, and return that aggregation.
///
/// Avoids presenting a falsely discouraging 12-month snapshot for
/// propositions that are profitable on a longer timescale, without always
/// showing the most favorable window. Never escalates twice.
pub fn evaluate_with_adaptive_horizon(
    inputs: &RoiInputs,
    config: &RoiConfig,
) -> Result<RoiResult, EngineError> {
    validate_inputs(inputs)?;
    validate_config(config)?;
    let allocation = allocate(inputs, config);
    let sim = simulate(inputs, allocation, config)?;
    let first = aggregate(&sim, 12);
    if first.total.net_gain_in_horizon >= 0.0 {
        return Ok(first);
    }
    let horizon = match first.total.payback_months {
        Some(month) if month <= 24 => 24,
        _ => 36,
    };
    debug!(horizon, "12-month net gain negative, escalating horizon");
    Ok(aggregate(&sim, horizon))
}
