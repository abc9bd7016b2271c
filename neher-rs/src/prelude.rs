use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Index, IndexMut},
};

pub use crate::epidemic::*;
pub use crate::error::{Error, NumericDriftWarning, ValidationError};
pub use crate::params::{EpidemicParameters, EpidemiologyParams, OverflowPolicy, SeverityTable};
pub use crate::sim::{
    run, run_scenario, run_sweep, run_with_config, Diagnostic, Scenario, SimulationConfig, SimulationTimeSeries,
    Snapshot, Stepper, SweepOutcome, Timestep,
};

/// Basic representation of time. This crate measures time in days, counted
/// from the start of the simulation. Fractional days are allowed since the
/// integrator may sub-step.
pub type Time = Real;

/// Base Real type used by this crate. Uses an alias to easily change precision
/// if necessary.
pub type Real = f64;

/// An age distribution array in bins of 10 years.
pub type AgeDistribution10 = [Real; 9];

/// Count population in each bin of 10 years.
pub type AgeCount10 = [u64; 9];

/// The nine fixed age buckets used to stratify every per-age quantity.
///
/// The declaration order is significant: it is the column order of every
/// per-age array in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "0-9")]
    Age0To9,
    #[serde(rename = "10-19")]
    Age10To19,
    #[serde(rename = "20-29")]
    Age20To29,
    #[serde(rename = "30-39")]
    Age30To39,
    #[serde(rename = "40-49")]
    Age40To49,
    #[serde(rename = "50-59")]
    Age50To59,
    #[serde(rename = "60-69")]
    Age60To69,
    #[serde(rename = "70-79")]
    Age70To79,
    #[serde(rename = "80+")]
    Age80Plus,
}

impl AgeGroup {
    /// Number of age buckets.
    pub const COUNT: usize = 9;

    /// All buckets, in column order.
    pub const ALL: [AgeGroup; 9] = [
        AgeGroup::Age0To9,
        AgeGroup::Age10To19,
        AgeGroup::Age20To29,
        AgeGroup::Age30To39,
        AgeGroup::Age40To49,
        AgeGroup::Age50To59,
        AgeGroup::Age60To69,
        AgeGroup::Age70To79,
        AgeGroup::Age80Plus,
    ];

    /// Column index of the bucket.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Bucket at the given column index, if any.
    pub fn from_index(i: usize) -> Option<AgeGroup> {
        Self::ALL.get(i).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Age0To9 => "0-9",
            AgeGroup::Age10To19 => "10-19",
            AgeGroup::Age20To29 => "20-29",
            AgeGroup::Age30To39 => "30-39",
            AgeGroup::Age40To49 => "40-49",
            AgeGroup::Age50To59 => "50-59",
            AgeGroup::Age60To69 => "60-69",
            AgeGroup::Age70To79 => "70-79",
            AgeGroup::Age80Plus => "80+",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A value for each age bucket, indexable by [`AgeGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PerAge<T>(pub [T; 9]);

impl<T: Copy> PerAge<T> {
    /// Build from a function of the age bucket.
    pub fn from_fn(f: impl Fn(AgeGroup) -> T) -> Self {
        PerAge(AgeGroup::ALL.map(f))
    }

    pub fn iter(&self) -> impl Iterator<Item = (AgeGroup, T)> + '_ {
        AgeGroup::ALL.iter().map(move |&age| (age, self[age]))
    }

    pub fn as_array(&self) -> &[T; 9] {
        &self.0
    }
}

impl PerAge<Real> {
    pub fn sum(&self) -> Real {
        self.0.iter().sum()
    }
}

impl<T> Index<AgeGroup> for PerAge<T> {
    type Output = T;

    fn index(&self, age: AgeGroup) -> &T {
        &self.0[age.index()]
    }
}

impl<T> IndexMut<AgeGroup> for PerAge<T> {
    fn index_mut(&mut self, age: AgeGroup) -> &mut T {
        &mut self.0[age.index()]
    }
}

impl<T> From<[T; 9]> for PerAge<T> {
    fn from(data: [T; 9]) -> Self {
        PerAge(data)
    }
}

/// Simple trait to simplify the use of age-dependent values/parameters.
pub trait ForAge<T> {
    /// Return the content of parameter for the given age bucket.
    fn for_age(&self, age: AgeGroup) -> T;
}

impl ForAge<Real> for Real {
    fn for_age(&self, _age: AgeGroup) -> Real {
        *self
    }
}

impl<T> ForAge<T> for [T; 9]
where
    T: Copy,
{
    fn for_age(&self, age: AgeGroup) -> T {
        self[age.index()]
    }
}

impl<T: Copy> ForAge<T> for PerAge<T> {
    fn for_age(&self, age: AgeGroup) -> T {
        self[age]
    }
}

/// A simple enumeration that may contain a scalar param or an AgeDistribution10
/// value
#[derive(Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgeParam {
    Scalar(Real),
    Distribution(AgeDistribution10),
}

impl AgeParam {
    /// Apply f to every component, keeping the scalar/distribution shape.
    pub fn map(&self, f: impl Fn(Real) -> Real) -> AgeParam {
        match self {
            &AgeParam::Scalar(v) => AgeParam::Scalar(f(v)),
            &AgeParam::Distribution(ages) => AgeParam::Distribution(ages.map(f)),
        }
    }

    /// Expand into one value per age bucket.
    pub fn per_age(&self) -> PerAge<Real> {
        PerAge::from_fn(|age| self.for_age(age))
    }
}

impl Default for AgeParam {
    fn default() -> Self {
        AgeParam::Scalar(0.)
    }
}

impl From<Real> for AgeParam {
    fn from(value: Real) -> Self {
        AgeParam::Scalar(value)
    }
}

impl From<AgeDistribution10> for AgeParam {
    fn from(value: AgeDistribution10) -> Self {
        AgeParam::Distribution(value)
    }
}

impl ForAge<Real> for AgeParam {
    fn for_age(&self, age: AgeGroup) -> Real {
        match self {
            &AgeParam::Scalar(v) => v,
            &AgeParam::Distribution(ages) => ages.for_age(age),
        }
    }
}
