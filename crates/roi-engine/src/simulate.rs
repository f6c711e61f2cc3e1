//! Monthly cashflow simulator: time-decaying conversion uplift and churn
//! reduction over a fixed 60-month window, with payback detection and
//! horizon aggregation.

use roi_core::{
    validate_config, validate_inputs, Allocation, GrowthSummary, MonthlyFlow, RetentionSummary,
    RoiConfig, RoiInputs, RoiResult, TotalSummary, SIMULATION_MONTHS,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use crate::EngineError;

/// Raw output of the monthly loop, kept alongside the per-month user
/// increments the horizon aggregation needs.
#[derive(Clone, Debug)]
pub struct Simulation {
    allocation: Allocation,
    pilot_cost_usd: Decimal,
    pilot_cost: f64,
    arppu: f64,
    flows: Vec<MonthlyFlow>,
    monthly_new_paid: Vec<f64>,
    monthly_extra_user_months: Vec<f64>,
    payback_month: Option<u32>,
}

impl Simulation {
    /// The full simulated window.
    pub fn flows(&self) -> &[MonthlyFlow] {
        &self.flows
    }

    /// First month with a non-negative cumulative net position, if any.
    pub fn payback_month(&self) -> Option<u32> {
        self.payback_month
    }
}

/// Run the month-by-month cashflow model for a given unit split.
///
/// Both effects start at their configured maxima and fade as
/// `exp(-t / tau)`, modeling novelty decay of a physical touchpoint. The
/// growth track treats the free pool as a constant, non-depleting target
/// population; the retention track compounds a baseline and a treatment
/// survival curve and prices the gap. All intermediate quantities stay
/// real-valued; nothing is rounded inside the loop.
pub fn simulate(
    inputs: &RoiInputs,
    allocation: Allocation,
    config: &RoiConfig,
) -> Result<Simulation, EngineError> {
    validate_inputs(inputs)?;
    validate_config(config)?;

    let p0 = inputs.baseline_monthly_conversion.resolve(config);
    let baseline_churn = 1.0 / inputs.avg_paid_lifetime_months;
    let arppu = inputs
        .monthly_revenue_per_paid_user
        .to_f64()
        .ok_or(EngineError::NonFinite)?;
    // Net profit accruing per additional paid-user-month.
    let profit_per_user_month =
        arppu * (1.0 - config.platform_revenue_share_fraction) * config.gross_margin_fraction;

    let pilot_cost_usd = Decimal::from(allocation.total()) * config.cost_per_unit_usd;
    let pilot_cost = pilot_cost_usd.to_f64().ok_or(EngineError::NonFinite)?;

    let free_pool = f64::from(allocation.free);
    let paid_pool = f64::from(allocation.paid);

    let months = SIMULATION_MONTHS as usize;
    let mut flows = Vec::with_capacity(months);
    let mut monthly_new_paid = Vec::with_capacity(months);
    let mut monthly_extra_user_months = Vec::with_capacity(months);
    let mut baseline_survival = 1.0_f64;
    let mut treatment_survival = 1.0_f64;
    // The one-time cost is borne at month 0.
    let mut cumulative_net_gain = -pilot_cost;
    let mut payback_month = None;

    for month in 1..=SIMULATION_MONTHS {
        let decay = (-f64::from(month) / config.effect_decay_tau_months).exp();

        let effective_conversion = p0 * (1.0 + config.conversion_uplift_alpha * decay);
        let new_paid = free_pool * (effective_conversion - p0);
        let growth_profit = new_paid * profit_per_user_month;

        // Churn itself decays back toward baseline, so the treatment curve
        // compounds a time-varying rate.
        let effective_churn = baseline_churn * (1.0 - config.churn_reduction_beta * decay);
        baseline_survival *= 1.0 - baseline_churn;
        treatment_survival *= 1.0 - effective_churn;
        let extra_user_months = paid_pool * (treatment_survival - baseline_survival).max(0.0);
        let retention_profit = extra_user_months * profit_per_user_month;

        let total_profit = growth_profit + retention_profit;
        cumulative_net_gain += total_profit;
        if payback_month.is_none() && cumulative_net_gain >= 0.0 {
            payback_month = Some(month);
        }

        monthly_new_paid.push(new_paid);
        monthly_extra_user_months.push(extra_user_months);
        flows.push(MonthlyFlow {
            month,
            growth_profit,
            retention_profit,
            total_profit,
            cumulative_net_gain,
        });
    }

    debug!(
        free = allocation.free,
        paid = allocation.paid,
        months = SIMULATION_MONTHS,
        payback = ?payback_month,
        "simulated full window"
    );

    Ok(Simulation {
        allocation,
        pilot_cost_usd,
        pilot_cost,
        arppu,
        flows,
        monthly_new_paid,
        monthly_extra_user_months,
        payback_month,
    })
}

/// Sum headline figures over the first `horizon_months` of a simulation.
///
/// The horizon only affects the headline sums; the payback month and the
/// monthly flows always come from the full simulated window. Entry points
/// validate the horizon; out-of-window values are clamped to keep the
/// slice in bounds.
pub fn aggregate(sim: &Simulation, horizon_months: u32) -> RoiResult {
    let horizon = horizon_months.min(SIMULATION_MONTHS) as usize;

    let growth_profit: f64 = sim.flows[..horizon].iter().map(|f| f.growth_profit).sum();
    let retention_profit: f64 = sim.flows[..horizon]
        .iter()
        .map(|f| f.retention_profit)
        .sum();
    let new_paid_users: f64 = sim.monthly_new_paid[..horizon].iter().sum();
    let extra_user_months: f64 = sim.monthly_extra_user_months[..horizon].iter().sum();

    let net_gain = growth_profit + retention_profit - sim.pilot_cost;
    let roi_multiple = if sim.pilot_cost > 0.0 {
        net_gain / sim.pilot_cost
    } else {
        0.0
    };

    RoiResult {
        horizon_months: horizon as u32,
        allocation: sim.allocation,
        pilot_cost_usd: sim.pilot_cost_usd,
        growth: GrowthSummary {
            new_paid_users_in_horizon: new_paid_users,
            // Gross revenue: no margin, no platform share.
            revenue_in_horizon: new_paid_users * sim.arppu,
            profit_in_horizon: growth_profit,
            is_profitable: growth_profit >= sim.pilot_cost,
        },
        retention: RetentionSummary {
            extra_paid_user_months_in_horizon: extra_user_months,
            profit_in_horizon: retention_profit,
        },
        total: TotalSummary {
            net_gain_in_horizon: net_gain,
            roi_multiple,
            payback_months: sim.payback_month,
        },
        monthly_flows: sim.flows.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocate;
    use roi_core::{BaselineConversion, PlanChoice};

    const EPS: f64 = 1e-9;

    fn scenario_inputs() -> RoiInputs {
        RoiInputs {
            total_units: 1500,
            paid_subscribers: 800,
            free_subscribers: 10_000,
            monthly_revenue_per_paid_user: Decimal::new(29, 0),
            avg_paid_lifetime_months: 7.0,
            plan_choice: PlanChoice::GrowthOnly,
            baseline_monthly_conversion: BaselineConversion::UseDefault,
        }
    }

    fn mixed_inputs() -> RoiInputs {
        RoiInputs {
            total_units: 1000,
            paid_subscribers: 10_000,
            free_subscribers: 100_000,
            monthly_revenue_per_paid_user: Decimal::new(29, 0),
            avg_paid_lifetime_months: 7.0,
            plan_choice: PlanChoice::GrowthAndRetention,
            baseline_monthly_conversion: BaselineConversion::UseDefault,
        }
    }

    fn run(inputs: &RoiInputs, config: &RoiConfig) -> Simulation {
        let allocation = allocate(inputs, config);
        simulate(inputs, allocation, config).unwrap()
    }

    #[test]
    fn concrete_growth_only_scenario() {
        let inputs = scenario_inputs();
        let config = RoiConfig {
            cost_per_unit_usd: Decimal::new(20, 0),
            ..RoiConfig::default()
        };
        let sim = run(&inputs, &config);
        let result = aggregate(&sim, 12);

        assert_eq!(result.allocation, Allocation { free: 1500, paid: 0 });
        assert_eq!(result.pilot_cost_usd, Decimal::new(30_000, 0));

        // Month 1: 1500 × p0 × alpha × e^(-1/6) converts priced at
        // K = 29 × 0.9 × 0.8 = 20.88 per user-month.
        let expected_k = 20.88;
        let expected_month1 = 1500.0 * 0.02 * 0.8 * (-1.0_f64 / 6.0).exp() * expected_k;
        assert!((sim.flows()[0].growth_profit - expected_month1).abs() < 1e-6);
        assert!((sim.flows()[0].growth_profit - 424.188_921_977).abs() < 1e-6);

        // Retention track is inert without paid units.
        assert!(result.retention.profit_in_horizon.abs() < EPS);
        assert!(result.retention.extra_paid_user_months_in_horizon.abs() < EPS);
        assert!(sim.flows().iter().all(|f| f.retention_profit == 0.0));

        // Headline figures are internally consistent.
        assert!(
            (result.total.net_gain_in_horizon
                - (result.growth.profit_in_horizon - 30_000.0))
                .abs()
                < EPS
        );
        assert_eq!(
            result.growth.is_profitable,
            result.growth.profit_in_horizon >= 30_000.0
        );
    }

    #[test]
    fn determinism_bit_identical_results() {
        let inputs = mixed_inputs();
        let config = RoiConfig::default();
        let a = aggregate(&run(&inputs, &config), 12);
        let b = aggregate(&run(&inputs, &config), 12);
        assert_eq!(a, b);
    }

    #[test]
    fn zero_units_zero_cost_zero_roi() {
        let mut inputs = scenario_inputs();
        inputs.total_units = 0;
        let sim = run(&inputs, &RoiConfig::default());
        let result = aggregate(&sim, 12);
        assert_eq!(result.pilot_cost_usd, Decimal::ZERO);
        assert_eq!(result.total.roi_multiple, 0.0);
        assert!(result.total.roi_multiple.is_finite());
        assert!(result.total.net_gain_in_horizon.abs() < EPS);
    }

    #[test]
    fn zero_paid_pool_under_mixed_plan_is_degenerate_not_an_error() {
        let mut inputs = mixed_inputs();
        inputs.paid_subscribers = 0;
        let sim = run(&inputs, &RoiConfig::default());
        let result = aggregate(&sim, 12);
        assert_eq!(result.allocation.paid, 0);
        assert!(result.retention.profit_in_horizon.abs() < EPS);
    }

    #[test]
    fn payback_is_the_first_crossing() {
        let inputs = mixed_inputs();
        let sim = run(&inputs, &RoiConfig::default());
        match sim.payback_month() {
            Some(month) => {
                let idx = (month - 1) as usize;
                assert!(sim.flows()[idx].cumulative_net_gain >= 0.0);
                for flow in &sim.flows()[..idx] {
                    assert!(flow.cumulative_net_gain < 0.0);
                }
            }
            None => {
                assert!(sim.flows().iter().all(|f| f.cumulative_net_gain < 0.0));
            }
        }
    }

    #[test]
    fn flows_cover_the_full_window_in_order() {
        let sim = run(&mixed_inputs(), &RoiConfig::default());
        assert_eq!(sim.flows().len(), SIMULATION_MONTHS as usize);
        for (i, flow) in sim.flows().iter().enumerate() {
            assert_eq!(flow.month, i as u32 + 1);
            assert!(
                (flow.total_profit - (flow.growth_profit + flow.retention_profit)).abs() < EPS
            );
        }
    }

    #[test]
    fn fast_decay_kills_late_effects() {
        let config = RoiConfig {
            effect_decay_tau_months: 0.01,
            ..RoiConfig::default()
        };
        let sim = run(&mixed_inputs(), &config);
        let last = sim.flows().last().unwrap();
        assert!(last.growth_profit.abs() < EPS);
        assert!(last.retention_profit.abs() < EPS);
    }

    #[test]
    fn slow_decay_approaches_configured_maxima() {
        let config = RoiConfig {
            effect_decay_tau_months: 1e9,
            ..RoiConfig::default()
        };
        let inputs = scenario_inputs();
        let sim = run(&inputs, &config);
        // With decay ~1 the month-1 increment is free × p0 × alpha.
        let expected = 1500.0 * 0.02 * 0.8;
        assert!((sim.monthly_new_paid[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn retention_gap_is_never_negative() {
        let sim = run(&mixed_inputs(), &RoiConfig::default());
        assert!(sim
            .monthly_extra_user_months
            .iter()
            .all(|m| *m >= 0.0 && m.is_finite()));
    }

    #[test]
    fn horizon_bounds_only_affect_headline_sums() {
        let inputs = mixed_inputs();
        let sim = run(&inputs, &RoiConfig::default());
        let h12 = aggregate(&sim, 12);
        let h24 = aggregate(&sim, 24);
        assert!(h24.growth.profit_in_horizon > h12.growth.profit_in_horizon);
        assert_eq!(h12.total.payback_months, h24.total.payback_months);
        assert_eq!(h12.monthly_flows, h24.monthly_flows);
        assert_eq!(h12.pilot_cost_usd, h24.pilot_cost_usd);
    }

    #[test]
    fn gross_revenue_ignores_margin_and_share() {
        let inputs = scenario_inputs();
        let sim = run(&inputs, &RoiConfig::default());
        let result = aggregate(&sim, 12);
        let expected = result.growth.new_paid_users_in_horizon * 29.0;
        assert!((result.growth.revenue_in_horizon - expected).abs() < EPS);
        // Gross revenue strictly exceeds netted profit at these margins.
        assert!(result.growth.revenue_in_horizon > result.growth.profit_in_horizon);
    }

    #[test]
    fn result_survives_a_serde_roundtrip() {
        let sim = run(&mixed_inputs(), &RoiConfig::default());
        let result = aggregate(&sim, 12);
        let s = serde_json::to_string(&result).unwrap();
        let back: RoiResult = serde_json::from_str(&s).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn simulate_rechecks_inputs_when_called_directly() {
        let mut inputs = scenario_inputs();
        inputs.avg_paid_lifetime_months = 0.2;
        let err = simulate(
            &inputs,
            Allocation { free: 100, paid: 0 },
            &RoiConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Input(_)));
    }
}
