use crate::{
    epidemic::{Compartment, CompartmentState, DemographicTable, EpidemicSeed, HealthcareLoad},
    error::{check, NumericDriftWarning, Result},
    params::EpidemicParameters,
    prelude::{AgeGroup, Real, Time},
};
use log::warn;
use ndarray::Axis;

/// Default relative conservation drift tolerated before a bucket is rescaled.
pub const DRIFT_TOLERANCE: Real = 1e-6;

/// A validated, strictly positive integration step, in days.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Timestep(Real);

impl Timestep {
    /// One day.
    pub const DAY: Timestep = Timestep(1.0);

    pub fn new(dt: Real) -> Result<Self> {
        Ok(Timestep(check::positive("dt", dt)?))
    }

    pub fn days(self) -> Real {
        self.0
    }
}

/// Result of advancing a state by one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// State at `t + dt`.
    pub state: CompartmentState,

    /// Healthcare load of the state the step started from. Its overflow is
    /// what penalized the Hospitalized and Critical exits during the step.
    pub load: HealthcareLoad,

    /// Buckets whose conservation drift exceeded the tolerance and were
    /// rescaled.
    pub drift: Vec<NumericDriftWarning>,
}

/// Explicit Euler integrator for the age-stratified compartment model.
///
/// The stepper only borrows its immutable inputs and keeps no state between
/// calls, so any number of steppers may run concurrently on shared inputs.
#[derive(Debug, Clone, Copy)]
pub struct Stepper<'a> {
    demographics: &'a DemographicTable,
    seed: &'a EpidemicSeed,
    params: &'a EpidemicParameters,
    drift_tolerance: Real,
}

impl<'a> Stepper<'a> {
    pub fn new(
        demographics: &'a DemographicTable,
        seed: &'a EpidemicSeed,
        params: &'a EpidemicParameters,
    ) -> Self {
        Stepper {
            demographics,
            seed,
            params,
            drift_tolerance: DRIFT_TOLERANCE,
        }
    }

    pub fn with_drift_tolerance(mut self, tolerance: Real) -> Result<Self> {
        self.drift_tolerance = check::non_negative("drift_tolerance", tolerance)?;
        Ok(self)
    }

    pub fn drift_tolerance(&self) -> Real {
        self.drift_tolerance
    }

    /// Advance `state` by `dt` under the given containment multiplier.
    pub fn step(&self, state: &CompartmentState, multiplier: Real, dt: Timestep) -> StepOutcome {
        self.advance(state, multiplier, dt, state.time() + dt.days())
    }

    /// Like [`Stepper::step`], but stamps the new state with `next_time`.
    /// The driver uses it to keep times free of accumulated rounding.
    pub(crate) fn advance(
        &self,
        state: &CompartmentState,
        multiplier: Real,
        dt: Timestep,
        next_time: Time,
    ) -> StepOutcome {
        use Compartment as K;

        let dt = dt.days();
        let params = self.params;
        let old = state.counts();
        let mut counts = old.clone();

        let load = HealthcareLoad::measure(state, self.demographics);
        let hospital_unmet = load.hospital_unmet_share();
        let icu_unmet = load.icu_unmet_share();

        let served = self.demographics.population_served() as Real;
        let beta = params.transmission_rate(state.time()) * multiplier;
        let force = beta * state.total_infectious() / served;

        for age in AgeGroup::ALL.iter().copied() {
            let j = age.index();
            let prev = |c: usize| old[[c, j]];
            let mut left = [0.0; Compartment::CARDINALITY];
            for (c, value) in left.iter_mut().enumerate() {
                *value = prev(c);
            }

            // S -> E: local transmission plus imports
            let infections = (force * params.transmission_weight()[age] * prev(K::S)
                + self.seed.imports_for(age, self.demographics))
                * dt;
            let s_e = drain(&mut left[K::S], infections);

            // E -> I
            let e_i = drain(&mut left[K::E], prev(K::E) * params.latency_rate() * dt);

            // I -> H | R
            let exits = prev(K::I) * params.infectious_rate() * dt;
            let hospitalized = params.hospitalized_fraction()[age];
            let i_h = drain(&mut left[K::I], exits * hospitalized);
            let i_r = drain(&mut left[K::I], exits * (1.0 - hospitalized));

            // H -> C | R
            let exits = prev(K::H) * params.hospital_rate() * dt;
            let critical = params.effective_critical_fraction(age, hospital_unmet);
            let h_c = drain(&mut left[K::H], exits * critical);
            let h_r = drain(&mut left[K::H], exits * (1.0 - critical));

            // C -> D | R
            let exits = prev(K::C) * params.icu_rate() * dt;
            let fatal = params.effective_fatal_fraction(age, icu_unmet);
            let c_d = drain(&mut left[K::C], exits * fatal);
            let c_r = drain(&mut left[K::C], exits * (1.0 - fatal));

            counts[[K::S, j]] = left[K::S];
            counts[[K::E, j]] = left[K::E] + s_e;
            counts[[K::I, j]] = left[K::I] + e_i;
            counts[[K::H, j]] = left[K::H] + i_h;
            counts[[K::C, j]] = left[K::C] + h_c;
            counts[[K::R, j]] = left[K::R] + i_r + h_r + c_r;
            counts[[K::D, j]] = left[K::D] + c_d;
        }

        let mut drift = vec![];
        for (j, mut column) in counts.axis_iter_mut(Axis(1)).enumerate() {
            let age = AgeGroup::ALL[j];
            let expected = self.demographics.population(age);
            let observed = column.sum();
            let relative = (observed - expected).abs() / expected.max(1.0);
            if relative > self.drift_tolerance {
                warn!(
                    "conservation drift at t={:.3} in {}: expected {}, observed {} ({:.2e})",
                    next_time, age, expected, observed, relative
                );
                if observed > 0.0 {
                    column.mapv_inplace(|x| x * expected / observed);
                }
                drift.push(NumericDriftWarning {
                    time: next_time,
                    age,
                    expected,
                    observed,
                    relative,
                });
            }
        }

        StepOutcome {
            state: CompartmentState::from_parts(next_time, counts),
            load,
            drift,
        }
    }
}

/// Remove up to `amount` from `available` and return what was actually taken.
/// Keeps every compartment non-negative no matter how large the step is.
#[inline]
fn drain(available: &mut Real, amount: Real) -> Real {
    let taken = amount.max(0.0).min(*available);
    *available -= taken;
    taken
}
