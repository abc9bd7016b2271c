use super::{stepper::DRIFT_TOLERANCE, SimulationTimeSeries, Stepper, Timestep};
use crate::{
    epidemic::{
        CompartmentState, ContainmentLookup, ContainmentSchedule, DemographicTable, EpidemicSeed,
        HealthcareLoad,
    },
    error::{check, Result, ValidationError},
    params::EpidemicParameters,
    prelude::{Real, Time},
};
use getset::{CopyGetters, Getters};
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Largest distance to a whole number tolerated when dividing the horizon by
/// the step.
const STEP_ALIGNMENT: Real = 1e-9;

/// Largest number of integration steps a single run may take.
pub const MAX_STEPS: usize = 10_000_000;

/// Time grid of a run.
///
/// The horizon and the report interval must both be whole multiples of `dt`,
/// so snapshots land exactly on the reported times.
#[derive(CopyGetters, Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct SimulationConfig {
    /// Simulated days after day 0.
    horizon_days: Time,

    /// Integration step, in days.
    dt: Time,

    /// Days between two recorded snapshots.
    report_interval: Time,

    /// Relative conservation drift tolerated before rescaling a bucket.
    drift_tolerance: Real,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            horizon_days: 365.0,
            dt: 1.0,
            report_interval: 1.0,
            drift_tolerance: DRIFT_TOLERANCE,
        }
    }
}

/// Validated step counts derived from a [`SimulationConfig`].
#[derive(Debug, Clone, Copy)]
struct Plan {
    dt: Timestep,
    steps: usize,
    steps_per_report: usize,
}

impl SimulationConfig {
    /// Run for `horizon_days`, stepping and reporting every `dt`.
    pub fn new(horizon_days: Time, dt: Time) -> Self {
        SimulationConfig {
            horizon_days,
            dt,
            report_interval: dt,
            ..Default::default()
        }
    }

    pub fn with_report_interval(mut self, days: Time) -> Self {
        self.report_interval = days;
        self
    }

    pub fn with_drift_tolerance(mut self, tolerance: Real) -> Self {
        self.drift_tolerance = tolerance;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.plan().map(|_| ())
    }

    fn plan(&self) -> Result<Plan> {
        let dt = Timestep::new(self.dt)?;
        check::non_negative("horizon_days", self.horizon_days)?;
        check::positive("report_interval", self.report_interval)?;
        check::non_negative("drift_tolerance", self.drift_tolerance)?;

        let steps = whole_steps("horizon_days", self.horizon_days, dt)?;
        let steps_per_report = whole_steps("report_interval", self.report_interval, dt)?;
        if steps_per_report == 0 {
            return Err(ValidationError::Inconsistent {
                field: "report_interval".into(),
                reason: "must not be shorter than dt".into(),
            });
        }
        if steps % steps_per_report != 0 {
            return Err(ValidationError::Inconsistent {
                field: "report_interval".into(),
                reason: format!(
                    "horizon of {} days is not a multiple of {} days",
                    self.horizon_days, self.report_interval
                ),
            });
        }
        Ok(Plan {
            dt,
            steps,
            steps_per_report,
        })
    }
}

/// Number of `dt` steps in `days`, rejecting non-integral ratios.
fn whole_steps(field: &str, days: Time, dt: Timestep) -> Result<usize> {
    let ratio = days / dt.days();
    let rounded = ratio.round();
    if rounded > MAX_STEPS as Real {
        return Err(ValidationError::OutOfRange {
            field: field.into(),
            value: days,
            min: 0.0,
            max: MAX_STEPS as Real * dt.days(),
        });
    }
    if (ratio - rounded).abs() > STEP_ALIGNMENT * rounded.max(1.0) {
        return Err(ValidationError::Inconsistent {
            field: field.into(),
            reason: format!("{} is not a whole multiple of dt = {}", days, dt.days()),
        });
    }
    Ok(rounded as usize)
}

/// Every input of one run, owned, so scenarios can be swept in parallel.
#[derive(Getters, Debug, Clone, PartialEq)]
#[getset(get = "pub")]
pub struct Scenario {
    name: String,
    demographics: DemographicTable,
    seed: EpidemicSeed,
    containment: Option<ContainmentSchedule>,
    parameters: EpidemicParameters,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        demographics: DemographicTable,
        seed: EpidemicSeed,
        parameters: EpidemicParameters,
    ) -> Self {
        Scenario {
            name: name.into(),
            demographics,
            seed,
            containment: None,
            parameters,
        }
    }

    pub fn with_containment(mut self, containment: ContainmentSchedule) -> Self {
        self.containment = Some(containment);
        self
    }
}

/// Result of one scenario of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    Completed(SimulationTimeSeries),
    Invalid(ValidationError),
    Cancelled,
}

impl SweepOutcome {
    pub fn completed(&self) -> Option<&SimulationTimeSeries> {
        match self {
            SweepOutcome::Completed(series) => Some(series),
            _ => None,
        }
    }
}

/// Simulate from day 0 to `horizon_days`, stepping and reporting every `dt`.
///
/// All inputs are validated before the first step; an invalid input never
/// yields a partial series.
pub fn run<C>(
    demographics: &DemographicTable,
    seed: &EpidemicSeed,
    containment: &C,
    parameters: &EpidemicParameters,
    horizon_days: Time,
    dt: Time,
) -> Result<SimulationTimeSeries>
where
    C: ContainmentLookup + ?Sized,
{
    let config = SimulationConfig::new(horizon_days, dt);
    run_with_config(demographics, seed, containment, parameters, &config)
}

/// Like [`run`], with the full time grid taken from `config`.
pub fn run_with_config<C>(
    demographics: &DemographicTable,
    seed: &EpidemicSeed,
    containment: &C,
    parameters: &EpidemicParameters,
    config: &SimulationConfig,
) -> Result<SimulationTimeSeries>
where
    C: ContainmentLookup + ?Sized,
{
    let plan = config.plan()?;
    let stepper = Stepper::new(demographics, seed, parameters)
        .with_drift_tolerance(config.drift_tolerance)?;

    info!(
        "simulating {} ({} people) for {} days, dt={}",
        demographics.country(),
        demographics.population_served(),
        config.horizon_days,
        plan.dt.days(),
    );

    let mut state = CompartmentState::initial(demographics, seed);
    let mut series = SimulationTimeSeries::with_capacity(plan.steps / plan.steps_per_report + 1);
    let load = HealthcareLoad::measure(&state, demographics);
    series.record(state.clone(), load);

    for k in 1..=plan.steps {
        let multiplier = containment.multiplier_at(state.time());
        // exact on whole-day grids, unlike accumulating dt
        let next_time = config.horizon_days * k as Real / plan.steps as Real;
        let outcome = stepper.advance(&state, multiplier, plan.dt, next_time);
        for warning in outcome.drift {
            series.push_drift(warning);
        }
        state = outcome.state;

        if k % plan.steps_per_report == 0 {
            let load = HealthcareLoad::measure(&state, demographics);
            if load.hospital_overflow() || load.icu_overflow() {
                debug!(
                    "t={}: hospital unmet {:.1}, icu unmet {:.1}",
                    next_time,
                    load.hospital_unmet(),
                    load.icu_unmet()
                );
            }
            debug!("{}", state);
            series.record(state.clone(), load);
        }
    }

    info!(
        "done: {:.0} infected, {:.0} deceased, {} diagnostics",
        state.total_cumulative_infected(),
        state.total_deceased(),
        series.diagnostics().len()
    );
    Ok(series)
}

pub fn run_scenario(scenario: &Scenario, config: &SimulationConfig) -> Result<SimulationTimeSeries> {
    run_with_config(
        &scenario.demographics,
        &scenario.seed,
        &scenario.containment,
        &scenario.parameters,
        config,
    )
}

/// Run independent scenarios in parallel. Outcomes follow the order of
/// `scenarios`.
///
/// Raising `cancel` stops scenarios that have not started yet; runs already
/// in progress complete.
pub fn run_sweep(
    scenarios: &[Scenario],
    config: &SimulationConfig,
    cancel: Option<&AtomicBool>,
) -> Vec<SweepOutcome> {
    scenarios
        .par_iter()
        .map(|scenario| {
            if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                debug!("scenario {} cancelled", scenario.name);
                return SweepOutcome::Cancelled;
            }
            match run_scenario(scenario, config) {
                Ok(series) => SweepOutcome::Completed(series),
                Err(err) => SweepOutcome::Invalid(err),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        epidemic::Compartment,
        sim::Diagnostic,
        params::{EpidemiologyParams, SeverityTable},
        prelude::AgeGroup,
        testing::{small_table, switzerland, switzerland_containment, switzerland_seed},
    };
    use assert_approx_eq::assert_approx_eq;

    fn assert_conserved(series: &SimulationTimeSeries, demo: &DemographicTable) {
        for snapshot in series.iter() {
            for age in AgeGroup::ALL.iter().copied() {
                let expected = demo.population(age);
                assert_approx_eq!(snapshot.state().bucket_total(age), expected, 1e-6 * expected);
            }
        }
    }

    fn assert_non_decreasing(curve: &[Real], slack: Real) {
        for pair in curve.windows(2) {
            assert!(pair[1] >= pair[0] - slack, "{} < {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn switzerland_ten_days() {
        let demo = switzerland();
        let seed = switzerland_seed();
        let containment = switzerland_containment();
        let params = EpidemicParameters::default();

        let series = run(&demo, &seed, &containment, &params, 10.0, 1.0).unwrap();
        assert_eq!(series.len(), 11);
        assert_eq!(series.times(), (0..=10).map(|t| t as Real).collect::<Vec<_>>());
        assert!(series.drift_warnings().next().is_none());

        let infected = series.cumulative_infected_curve();
        assert_non_decreasing(&infected, 1e-6);
        assert!(infected[10] > infected[0]);

        let last = series.final_state().unwrap();
        assert_eq!(last.time(), 10.0);
        assert_approx_eq!(last.population(), 8_600_000.0, 1e-3);
        assert_conserved(&series, &demo);
    }

    #[test]
    fn conservation_and_monotone_resolutions_over_a_year() {
        let demo = switzerland();
        let seed = switzerland_seed();
        let params = EpidemicParameters::default();
        let config = SimulationConfig::new(365.0, 0.5).with_report_interval(1.0);

        let series =
            run_with_config(&demo, &seed, &switzerland_containment(), &params, &config).unwrap();
        assert_eq!(series.len(), 366);
        assert_conserved(&series, &demo);
        assert_non_decreasing(&series.resolved_curve(), 0.0);
        assert_non_decreasing(&series.curve(Compartment::Deceased), 0.0);
        for snapshot in series.iter() {
            assert!(snapshot.state().counts().iter().all(|&x| x >= 0.0));
        }
    }

    #[test]
    fn constant_unit_schedule_matches_no_containment() {
        let demo = switzerland();
        let seed = switzerland_seed();
        let params = EpidemicParameters::default();
        let unit = ContainmentSchedule::constant(1.0).unwrap();

        let with_unit = run(&demo, &seed, &unit, &params, 60.0, 1.0).unwrap();
        let without = run(&demo, &seed, &(), &params, 60.0, 1.0).unwrap();
        assert_eq!(with_unit, without);
    }

    #[test]
    fn containment_slows_the_epidemic() {
        let demo = switzerland();
        let seed = switzerland_seed();
        let params = EpidemicParameters::default();
        let lockdown = ContainmentSchedule::new(vec![(0.0, 1.0), (10.0, 0.3)]).unwrap();

        let free = run(&demo, &seed, &(), &params, 60.0, 1.0).unwrap();
        let contained = run(&demo, &seed, &lockdown, &params, 60.0, 1.0).unwrap();
        let free = free.cumulative_infected_curve();
        let contained = contained.cumulative_infected_curve();
        // identical until the event takes effect
        assert_eq!(free[..=10], contained[..=10]);
        assert!(contained[60] < free[60]);
    }

    #[test]
    fn no_seed_no_imports_stays_susceptible() {
        let demo = switzerland();
        let params = EpidemicParameters::default();
        let series = run(&demo, &EpidemicSeed::none(), &(), &params, 100.0, 1.0).unwrap();

        let initial = CompartmentState::susceptible_population(&demo);
        for snapshot in series.iter() {
            assert_eq!(snapshot.state().counts(), initial.counts());
        }
        assert!(series.diagnostics().is_empty());
    }

    #[test]
    fn sub_day_steps_report_on_whole_days() {
        let demo = switzerland();
        let seed = switzerland_seed();
        let params = EpidemicParameters::default();
        let config = SimulationConfig::new(30.0, 0.1).with_report_interval(1.0);

        let series = run_with_config(&demo, &seed, &(), &params, &config).unwrap();
        assert_eq!(series.len(), 31);
        assert_eq!(series.get(30).unwrap().time(), 30.0);

        // a finer grid grows a bit faster than the daily one, same order
        let daily = run(&demo, &seed, &(), &params, 30.0, 1.0).unwrap();
        let fine = series.final_state().unwrap().total_cumulative_infected();
        let coarse = daily.final_state().unwrap().total_cumulative_infected();
        assert!(fine > 0.4 * coarse && fine < 2.5 * coarse);
    }

    #[test]
    fn runs_are_reproducible() {
        let demo = switzerland();
        let seed = switzerland_seed();
        let params = EpidemicParameters::default();
        let containment = switzerland_containment();
        let a = run(&demo, &seed, &containment, &params, 50.0, 0.25).unwrap();
        let b = run(&demo, &seed, &containment, &params, 50.0, 0.25).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn overflow_is_flagged_with_unmet_demand() {
        let demo = small_table();
        let seed = EpidemicSeed::new(300.0, 1.0).unwrap();
        let params = EpidemicParameters::new(
            EpidemiologyParams::default().with_r0(4.0),
            SeverityTable::default().with_severe(100.0).with_confirmed(100.0),
        )
        .unwrap();

        let series = run(&demo, &seed, &(), &params, 60.0, 1.0).unwrap();
        assert!(series.overflow_count() > 0);
        for diagnostic in series.diagnostics() {
            if let Diagnostic::HospitalOverflow {
                time,
                demand,
                capacity,
                unmet,
            } = *diagnostic
            {
                let snapshot = series.at(time).unwrap();
                assert_eq!(demand, snapshot.load().hospitalized());
                assert_eq!(capacity, demo.hospital_beds() as Real);
                assert_approx_eq!(unmet, demand - capacity);
            }
        }
    }

    #[test]
    fn invalid_grids_are_rejected_before_running() {
        let demo = switzerland();
        let seed = switzerland_seed();
        let params = EpidemicParameters::default();

        let err = run(&demo, &seed, &(), &params, 10.0, 0.0).unwrap_err();
        assert_eq!(err.field(), "dt");
        let err = run(&demo, &seed, &(), &params, 10.0, 3.0).unwrap_err();
        assert_eq!(err.field(), "horizon_days");
        let err = run(&demo, &seed, &(), &params, -1.0, 1.0).unwrap_err();
        assert_eq!(err.field(), "horizon_days");

        let config = SimulationConfig::new(10.0, 1.0).with_report_interval(4.0);
        assert_eq!(config.validate().unwrap_err().field(), "report_interval");
        let config = SimulationConfig::new(10.0, 1.0).with_report_interval(0.5);
        assert!(config.validate().is_err());
        assert!(SimulationConfig::new(10.0, 0.1).validate().is_ok());
    }

    #[test]
    fn oversized_grids_are_rejected() {
        let demo = small_table();
        let params = EpidemicParameters::default();
        let err = run(&demo, &EpidemicSeed::none(), &(), &params, 1e15, 1.0).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert_eq!(err.field(), "horizon_days");

        let config = SimulationConfig::new(365.0, 1e-9);
        assert_eq!(config.validate().unwrap_err().field(), "horizon_days");
        assert!(SimulationConfig::new(365.0, 0.001).validate().is_ok());
    }

    #[test]
    fn zero_horizon_yields_initial_state_only() {
        let demo = switzerland();
        let seed = switzerland_seed();
        let params = EpidemicParameters::default();
        let series = run(&demo, &seed, &(), &params, 0.0, 1.0).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(
            series.final_state().unwrap(),
            &CompartmentState::initial(&demo, &seed)
        );
    }

    #[test]
    fn sweep_keeps_order_and_honours_cancellation() {
        let config = SimulationConfig::new(20.0, 1.0);
        let base = Scenario::new(
            "baseline",
            switzerland(),
            switzerland_seed(),
            EpidemicParameters::default(),
        );
        let contained = base
            .clone()
            .with_containment(ContainmentSchedule::constant(0.5).unwrap());
        let scenarios = vec![base.clone(), contained.clone(), base];

        let outcomes = run_sweep(&scenarios, &config, None);
        assert_eq!(outcomes.len(), 3);
        let a = outcomes[0].completed().unwrap();
        let b = outcomes[1].completed().unwrap();
        assert_eq!(Some(a), outcomes[2].completed());
        assert_eq!(b, &run_scenario(&contained, &config).unwrap());
        assert!(
            b.final_state().unwrap().total_cumulative_infected()
                < a.final_state().unwrap().total_cumulative_infected()
        );

        let cancel = AtomicBool::new(true);
        let outcomes = run_sweep(&scenarios, &config, Some(&cancel));
        assert!(outcomes.iter().all(|o| *o == SweepOutcome::Cancelled));

        let bad = SimulationConfig::new(20.0, -1.0);
        let outcomes = run_sweep(&scenarios, &bad, None);
        assert!(matches!(outcomes[0], SweepOutcome::Invalid(_)));
    }
}
