use crate::{
    error::{check, Result, ValidationError},
    prelude::{Real, Time},
};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

/// Anything that can tell the containment multiplier in effect at a given
/// simulated time.
///
/// The stepper only ever talks to this trait, so the storage behind a schedule
/// (daily factors, sparse breakpoints, ...) can change freely.
pub trait ContainmentLookup {
    /// Multiplier applied to the baseline transmission rate at time t.
    fn multiplier_at(&self, t: Time) -> Real;
}

/// No containment: transmission stays at baseline.
impl ContainmentLookup for () {
    fn multiplier_at(&self, _t: Time) -> Real {
        1.0
    }
}

impl<L: ContainmentLookup> ContainmentLookup for Option<L> {
    fn multiplier_at(&self, t: Time) -> Real {
        match self {
            Some(lookup) => lookup.multiplier_at(t),
            None => 1.0,
        }
    }
}

impl<L: ContainmentLookup + ?Sized> ContainmentLookup for &L {
    fn multiplier_at(&self, t: Time) -> Real {
        (**self).multiplier_at(t)
    }
}

/// Accepted range of containment multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, CopyGetters)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct MultiplierBounds {
    min: Real,
    max: Real,
}

impl MultiplierBounds {
    pub fn new(min: Real, max: Real) -> Result<Self> {
        check::non_negative("containment.bounds.min", min)?;
        check::finite("containment.bounds.max", max)?;
        if max < min {
            return Err(ValidationError::Inconsistent {
                field: "containment.bounds".into(),
                reason: format!("max {} is below min {}", max, min),
            });
        }
        Ok(MultiplierBounds { min, max })
    }

    fn check(&self, field: &str, value: Real) -> Result<Real> {
        check::in_range(field, value, self.min, self.max)
    }
}

impl Default for MultiplierBounds {
    fn default() -> Self {
        MultiplierBounds { min: 0.0, max: 3.0 }
    }
}

/// Piecewise-constant, time-indexed multipliers on baseline transmission.
///
/// Each multiplier holds from its offset until the next entry (or forever
/// after the last one). Times before the first entry use the first
/// multiplier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainmentSchedule {
    times: Vec<Time>,
    factors: Vec<Real>,
    bounds: MultiplierBounds,
}

impl ContainmentSchedule {
    /// Schedule from explicit (offset, multiplier) breakpoints using the
    /// default multiplier bounds.
    pub fn new(entries: impl IntoIterator<Item = (Time, Real)>) -> Result<Self> {
        Self::with_bounds(entries, MultiplierBounds::default())
    }

    pub fn with_bounds(
        entries: impl IntoIterator<Item = (Time, Real)>,
        bounds: MultiplierBounds,
    ) -> Result<Self> {
        let mut times: Vec<Time> = vec![];
        let mut factors: Vec<Real> = vec![];

        for (i, (t, m)) in entries.into_iter().enumerate() {
            check::finite(&format!("containment.times[{}]", i), t)?;
            bounds.check(&format!("containment.factors[{}]", i), m)?;
            if let Some(&previous) = times.last() {
                if t <= previous {
                    return Err(ValidationError::NonIncreasing {
                        field: format!("containment.times[{}]", i),
                        previous,
                        next: t,
                    });
                }
            }
            times.push(t);
            factors.push(m);
        }

        if times.is_empty() {
            return Err(ValidationError::Empty {
                field: "containment.factors".into(),
            });
        }
        Ok(ContainmentSchedule {
            times,
            factors,
            bounds,
        })
    }

    /// One multiplier per day, starting at day 0.
    pub fn from_factors(factors: &[Real]) -> Result<Self> {
        Self::new(
            factors
                .iter()
                .enumerate()
                .map(|(day, &m)| (day as Time, m)),
        )
    }

    /// The same multiplier at all times.
    pub fn constant(multiplier: Real) -> Result<Self> {
        Self::new(vec![(0.0, multiplier)])
    }

    /// Insert a sudden change of multiplier at time t, or replace the
    /// multiplier of an existing breakpoint at t. The new multiplier holds
    /// until the next existing breakpoint.
    pub fn add_sharp_event(&mut self, t: Time, multiplier: Real) -> Result<&mut Self> {
        check::finite("containment.event.time", t)?;
        self.bounds.check("containment.event.factor", multiplier)?;

        let pos = self.times.partition_point(|&x| x < t);
        if self.times.get(pos) == Some(&t) {
            self.factors[pos] = multiplier;
        } else {
            self.times.insert(pos, t);
            self.factors.insert(pos, multiplier);
        }
        Ok(self)
    }

    /// Number of breakpoints.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Breakpoints, in increasing time order.
    pub fn entries(&self) -> impl Iterator<Item = (Time, Real)> + '_ {
        self.times.iter().copied().zip(self.factors.iter().copied())
    }

    pub fn bounds(&self) -> MultiplierBounds {
        self.bounds
    }
}

impl ContainmentLookup for ContainmentSchedule {
    fn multiplier_at(&self, t: Time) -> Real {
        // index of the first entry strictly after t
        let after = self.times.partition_point(|&x| x <= t);
        self.factors[after.saturating_sub(1)]
    }
}
