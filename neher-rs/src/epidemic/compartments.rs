use crate::{
    epidemic::{DemographicTable, EpidemicSeed},
    error::{check, Result, ValidationError},
    prelude::{AgeGroup, PerAge, Real, Time},
};
use ndarray::{Array2, ArrayView1, Axis};
use paste::paste;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Disease-progression stages of the age-stratified model.
///
/// Every individual of a bucket is in exactly one stage. Recovered and
/// Deceased are absorbing.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infectious,
    Hospitalized,
    Critical,
    Recovered,
    Deceased,
}

impl Compartment {
    /// Maximum number of epidemiological states
    pub const CARDINALITY: usize = 7;

    pub const S: usize = 0;
    pub const E: usize = 1;
    pub const I: usize = 2;
    pub const H: usize = 3;
    pub const C: usize = 4;
    pub const R: usize = 5;
    pub const D: usize = 6;

    pub const ALL: [Compartment; 7] = [
        Compartment::Susceptible,
        Compartment::Exposed,
        Compartment::Infectious,
        Compartment::Hospitalized,
        Compartment::Critical,
        Compartment::Recovered,
        Compartment::Deceased,
    ];

    /// Row of the compartment in a [`CompartmentState`].
    pub fn index(self) -> usize {
        match self {
            Self::Susceptible => Self::S,
            Self::Exposed => Self::E,
            Self::Infectious => Self::I,
            Self::Hospitalized => Self::H,
            Self::Critical => Self::C,
            Self::Recovered => Self::R,
            Self::Deceased => Self::D,
        }
    }

    /// Short code used in logs and the `scenario` summary.
    pub fn code(self) -> &'static str {
        match self {
            Self::Susceptible => "S",
            Self::Exposed => "E",
            Self::Infectious => "I",
            Self::Hospitalized => "H",
            Self::Critical => "C",
            Self::Recovered => "R",
            Self::Deceased => "D",
        }
    }
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Per-age-bucket counts across all disease stages at a given simulated time.
///
/// Counts are stored as a (compartment x age group) matrix. States are
/// values: the stepper builds a new one from the previous, nothing mutates a
/// state once it has been recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompartmentState {
    time: Time,
    counts: Array2<Real>,
}

macro_rules! compartment_accessors {
    ($($name:ident => $variant:ident),* $(,)?) => {
        paste! {
            $(
                #[doc = "Per-age counts in the `" $variant "` stage."]
                pub fn $name(&self) -> ArrayView1<'_, Real> {
                    self.compartment(Compartment::$variant)
                }

                #[doc = "Total count in the `" $variant "` stage, summed over age buckets."]
                pub fn [<total_ $name>](&self) -> Real {
                    self.total(Compartment::$variant)
                }
            )*
        }
    };
}

impl CompartmentState {
    /// Entirely susceptible population, following the demographic table.
    pub fn susceptible_population(demographics: &DemographicTable) -> Self {
        let mut counts = Array2::zeros((Compartment::CARDINALITY, AgeGroup::COUNT));
        for age in AgeGroup::ALL.iter().copied() {
            counts[[Compartment::S, age.index()]] = demographics.population(age);
        }
        CompartmentState { time: 0.0, counts }
    }

    /// Initial condition at day 0: the demographic table with the seeded
    /// cases moved from Susceptible to Exposed and Infectious.
    pub fn initial(demographics: &DemographicTable, seed: &EpidemicSeed) -> Self {
        let mut state = Self::susceptible_population(demographics);
        let seeded = seed.initial_cases(demographics);
        let exposed_share = seed.exposed_share();

        for age in AgeGroup::ALL.iter().copied() {
            let j = age.index();
            let cases = seeded[age].min(state.counts[[Compartment::S, j]]);
            state.counts[[Compartment::S, j]] -= cases;
            state.counts[[Compartment::E, j]] += cases * exposed_share;
            state.counts[[Compartment::I, j]] += cases * (1.0 - exposed_share);
        }
        state
    }

    /// Build a state from raw counts (rows follow [`Compartment::ALL`],
    /// columns follow [`AgeGroup::ALL`]).
    pub fn from_counts(time: Time, counts: Array2<Real>) -> Result<Self> {
        check::finite("time", time)?;
        let (rows, cols) = counts.dim();
        if rows != Compartment::CARDINALITY {
            return Err(ValidationError::WrongLength {
                field: "counts.compartments".into(),
                expected: Compartment::CARDINALITY,
                got: rows,
            });
        }
        if cols != AgeGroup::COUNT {
            return Err(ValidationError::WrongLength {
                field: "counts.age_groups".into(),
                expected: AgeGroup::COUNT,
                got: cols,
            });
        }
        for ((i, j), &value) in counts.indexed_iter() {
            let field = format!("counts[{}][{}]", Compartment::ALL[i], AgeGroup::ALL[j]);
            check::non_negative(&field, value)?;
        }
        Ok(CompartmentState { time, counts })
    }

    /// Used by the stepper, which guarantees shape and non-negativity.
    pub(crate) fn from_parts(time: Time, counts: Array2<Real>) -> Self {
        debug_assert_eq!(counts.dim(), (Compartment::CARDINALITY, AgeGroup::COUNT));
        CompartmentState { time, counts }
    }

    /// Simulated time of the state, in days.
    pub fn time(&self) -> Time {
        self.time
    }

    /// Raw (compartment x age group) matrix.
    pub fn counts(&self) -> &Array2<Real> {
        &self.counts
    }

    pub fn get(&self, compartment: Compartment, age: AgeGroup) -> Real {
        self.counts[[compartment.index(), age.index()]]
    }

    /// Per-age counts of a single compartment.
    pub fn compartment(&self, compartment: Compartment) -> ArrayView1<'_, Real> {
        self.counts.row(compartment.index())
    }

    /// Count of a compartment summed over all age buckets.
    pub fn total(&self, compartment: Compartment) -> Real {
        self.compartment(compartment).sum()
    }

    /// Per-compartment totals, in [`Compartment::ALL`] order.
    pub fn totals(&self) -> [Real; 7] {
        Compartment::ALL.map(|c| self.total(c))
    }

    /// Sum over all stages for one age bucket.
    pub fn bucket_total(&self, age: AgeGroup) -> Real {
        self.counts.column(age.index()).sum()
    }

    /// Sum over all stages for every age bucket.
    pub fn bucket_totals(&self) -> PerAge<Real> {
        let sums = self.counts.sum_axis(Axis(0));
        PerAge::from_fn(|age| sums[age.index()])
    }

    /// Sum over all stages and buckets.
    pub fn population(&self) -> Real {
        self.counts.sum()
    }

    /// Individuals ever infected in the bucket. Susceptibles only flow out,
    /// so this never decreases along a trajectory.
    pub fn cumulative_infected(&self, age: AgeGroup) -> Real {
        self.bucket_total(age) - self.get(Compartment::Susceptible, age)
    }

    /// Cumulative infections summed over every bucket.
    pub fn total_cumulative_infected(&self) -> Real {
        self.population() - self.total(Compartment::Susceptible)
    }

    /// Cumulative Recovered + Deceased over every bucket.
    pub fn total_resolved(&self) -> Real {
        self.total(Compartment::Recovered) + self.total(Compartment::Deceased)
    }

    compartment_accessors! {
        susceptible => Susceptible,
        exposed => Exposed,
        infectious => Infectious,
        hospitalized => Hospitalized,
        critical => Critical,
        recovered => Recovered,
        deceased => Deceased,
    }
}

impl fmt::Display for CompartmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:.2}", self.time)?;
        for c in Compartment::ALL.iter() {
            write!(f, " {}={:.1}", c, self.total(*c))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epidemic::SeedPolicy;
    use assert_approx_eq::assert_approx_eq;

    fn table() -> DemographicTable {
        DemographicTable::builder()
            .population_served(900)
            .hospital_beds(10)
            .icu_beds(2)
            .population_by_decade(&[100; 9])
            .build()
            .unwrap()
    }

    #[test]
    fn initial_state_seeds_proportionally() {
        let demo = table();
        let seed = EpidemicSeed::new(90.0, 0.0).unwrap();
        let state = CompartmentState::initial(&demo, &seed);

        for age in AgeGroup::ALL.iter().copied() {
            assert_approx_eq!(state.get(Compartment::Susceptible, age), 90.0);
            assert_approx_eq!(state.get(Compartment::Exposed, age), 7.0);
            assert_approx_eq!(state.get(Compartment::Infectious, age), 3.0);
            assert_approx_eq!(state.bucket_total(age), 100.0);
        }
        assert_approx_eq!(state.total_cumulative_infected(), 90.0);
    }

    #[test]
    fn seed_is_clamped_to_bucket_population() {
        let demo = table();
        let mut per_age = [0.0; 9];
        per_age[0] = 500.0;
        let seed = EpidemicSeed::new(500.0, 0.0)
            .unwrap()
            .with_seed_policy(SeedPolicy::PerAge(per_age))
            .unwrap();
        let state = CompartmentState::initial(&demo, &seed);
        assert_eq!(state.get(Compartment::Susceptible, AgeGroup::Age0To9), 0.0);
        assert_approx_eq!(state.bucket_total(AgeGroup::Age0To9), 100.0);
    }

    #[test]
    fn accessors_match_generic_lookup() {
        let state = CompartmentState::initial(&table(), &EpidemicSeed::new(9.0, 0.0).unwrap());
        assert_eq!(state.total_exposed(), state.total(Compartment::Exposed));
        assert_eq!(state.infectious().len(), 9);
        assert_approx_eq!(state.population(), 900.0);
        assert_eq!(state.totals()[Compartment::S], state.total_susceptible());
    }

    #[test]
    fn from_counts_rejects_bad_input() {
        let bad_shape = Array2::zeros((6, 9));
        assert!(CompartmentState::from_counts(0.0, bad_shape).is_err());

        let mut negative = Array2::zeros((7, 9));
        negative[[2, 3]] = -1.0;
        let err = CompartmentState::from_counts(0.0, negative).unwrap_err();
        assert_eq!(err.field(), "counts[I][30-39]");
    }
}
