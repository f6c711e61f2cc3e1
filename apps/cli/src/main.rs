#![deny(warnings)]

//! Headless CLI for evaluating a pilot scenario and printing headline
//! KPIs.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use roi_core::{BaselineConversion, PlanChoice, RoiConfig, RoiInputs};
use roi_engine::schedule::deployment_schedule;
use roi_engine::{allocate_and_simulate, evaluate_with_adaptive_horizon, recommend_size};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// A scenario file: business inputs plus optional policy overrides and an
/// optional rollout kickoff date for the schedule section.
#[derive(Debug, Deserialize)]
struct Scenario {
    inputs: RoiInputs,
    #[serde(default)]
    config: RoiConfig,
    #[serde(default)]
    rollout_start: Option<NaiveDate>,
}

struct Args {
    scenario: Option<String>,
    adaptive: bool,
    json: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        scenario: None,
        adaptive: false,
        json: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--adaptive" => args.adaptive = true,
            "--json" => args.json = true,
            _ => {}
        }
    }
    args
}

fn sample_scenario() -> Scenario {
    Scenario {
        inputs: RoiInputs {
            total_units: 1500,
            paid_subscribers: 800,
            free_subscribers: 10_000,
            monthly_revenue_per_paid_user: Decimal::new(29, 0),
            avg_paid_lifetime_months: 7.0,
            plan_choice: PlanChoice::GrowthOnly,
            baseline_monthly_conversion: BaselineConversion::UseDefault,
        },
        config: RoiConfig::default(),
        rollout_start: None,
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(
        git_sha = env!("GIT_SHA"),
        scenario = ?args.scenario,
        adaptive = args.adaptive,
        "starting CLI"
    );

    let scenario: Scenario = match &args.scenario {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading scenario file {path}"))?;
            serde_yaml::from_str(&text).with_context(|| format!("parsing scenario {path}"))?
        }
        None => sample_scenario(),
    };

    let recommended = recommend_size(&scenario.inputs)?;
    let result = if args.adaptive {
        evaluate_with_adaptive_horizon(&scenario.inputs, &scenario.config)?
    } else {
        allocate_and_simulate(&scenario.inputs, &scenario.config)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let payback = match result.total.payback_months {
        Some(month) => format!("month {month}"),
        None => "not reached".to_string(),
    };
    println!("Recommended pilot size: {} units", recommended);
    println!(
        "Allocation | free: {} | paid: {} | pilot cost: ${}",
        result.allocation.free, result.allocation.paid, result.pilot_cost_usd
    );
    println!(
        "Horizon {}m | net gain: ${:.2} | ROI: {:.2}x | payback: {}",
        result.horizon_months,
        result.total.net_gain_in_horizon,
        result.total.roi_multiple,
        payback
    );
    println!(
        "Growth | new paid: {:.1} | gross revenue: ${:.2} | profit: ${:.2} | standalone profitable: {}",
        result.growth.new_paid_users_in_horizon,
        result.growth.revenue_in_horizon,
        result.growth.profit_in_horizon,
        result.growth.is_profitable
    );
    println!(
        "Retention | extra user-months: {:.1} | profit: ${:.2}",
        result.retention.extra_paid_user_months_in_horizon,
        result.retention.profit_in_horizon
    );

    if let Some(start) = scenario.rollout_start {
        println!("Schedule:");
        for milestone in deployment_schedule(start) {
            println!("  {} | {}", milestone.date, milestone.name);
        }
    }

    Ok(())
}
