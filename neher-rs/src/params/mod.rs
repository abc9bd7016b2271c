//! This module declares parameters for the neher crate.
//!
//! Users describe the disease with two serde-friendly tables: the
//! population-wide [`EpidemiologyParams`] and the age-stratified
//! [`SeverityTable`]. Both are validated and folded into an immutable
//! [`EpidemicParameters`], which precomputes every per-age rate used by the
//! stepper.
mod constants;
mod epidemiology;
mod severity;

pub use constants::*;
pub use epidemiology::*;
pub use severity::*;

use crate::{
    error::{check, Result, ValidationError},
    prelude::{AgeGroup, PerAge, Real, Time},
};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

/// Penalties applied to patients that exceed healthcare capacity.
///
/// A severity of 1.0 disables the corresponding penalty. Unmet demand is
/// reported either way.
#[derive(CopyGetters, Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct OverflowPolicy {
    /// Multiplier on the fatality fraction of critical patients without an
    /// ICU bed.
    icu_overflow_severity: Real,

    /// Multiplier on the critical fraction of hospitalized patients without a
    /// bed.
    hospital_overflow_severity: Real,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy {
            icu_overflow_severity: OVERFLOW_SEVERITY,
            hospital_overflow_severity: HOSPITAL_OVERFLOW_SEVERITY,
        }
    }
}

impl OverflowPolicy {
    pub fn new(icu_overflow_severity: Real, hospital_overflow_severity: Real) -> Result<Self> {
        let policy = OverflowPolicy {
            icu_overflow_severity,
            hospital_overflow_severity,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// No penalty at all.
    pub fn disabled() -> Self {
        OverflowPolicy {
            icu_overflow_severity: 1.0,
            hospital_overflow_severity: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        at_least_one("icu_overflow_severity", self.icu_overflow_severity)?;
        at_least_one("hospital_overflow_severity", self.hospital_overflow_severity)?;
        Ok(())
    }
}

fn at_least_one(field: &str, value: Real) -> Result<Real> {
    check::finite(field, value)?;
    if value < 1.0 {
        return Err(ValidationError::OutOfRange {
            field: field.into(),
            value,
            min: 1.0,
            max: Real::INFINITY,
        });
    }
    Ok(value)
}

/// Validated rate constants consumed by the stepper.
///
/// Rates are per day. Stage exits are split between two destinations by the
/// per-age fractions; for instance Infectious individuals leave at
/// `infectious_rate` and a `hospitalized_fraction` of them go to Hospitalized,
/// the rest to Recovered.
#[derive(Getters, CopyGetters, Debug, PartialEq, Clone, Serialize)]
pub struct EpidemicParameters {
    #[getset(get_copy = "pub")]
    epidemiology: EpidemiologyParams,

    #[getset(get_copy = "pub")]
    severity: SeverityTable,

    #[getset(get_copy = "pub")]
    overflow: OverflowPolicy,

    /// Exposed -> Infectious, 1 / incubation_time.
    #[getset(get_copy = "pub")]
    latency_rate: Real,

    /// Infectious -> (Hospitalized | Recovered), 1 / infectious_period.
    #[getset(get_copy = "pub")]
    infectious_rate: Real,

    /// Hospitalized -> (Critical | Recovered), 1 / length_hospital_stay.
    #[getset(get_copy = "pub")]
    hospital_rate: Real,

    /// Critical -> (Deceased | Recovered), 1 / length_icu_stay.
    #[getset(get_copy = "pub")]
    icu_rate: Real,

    #[getset(get = "pub")]
    hospitalized_fraction: PerAge<Real>,

    #[getset(get = "pub")]
    critical_fraction: PerAge<Real>,

    #[getset(get = "pub")]
    fatal_fraction: PerAge<Real>,

    #[getset(get = "pub")]
    transmission_weight: PerAge<Real>,
}

impl EpidemicParameters {
    /// Validate the input tables and precompute per-age rates. The ICU
    /// overflow penalty follows `epidemiology.overflow_severity`.
    pub fn new(epidemiology: EpidemiologyParams, severity: SeverityTable) -> Result<Self> {
        let overflow = OverflowPolicy::new(
            epidemiology.overflow_severity(),
            HOSPITAL_OVERFLOW_SEVERITY,
        )?;
        Self::with_overflow(epidemiology, severity, overflow)
    }

    pub fn with_overflow(
        epidemiology: EpidemiologyParams,
        severity: SeverityTable,
        overflow: OverflowPolicy,
    ) -> Result<Self> {
        epidemiology.validate()?;
        severity.validate()?;
        overflow.validate()?;

        Ok(Self::derive(epidemiology, severity, overflow))
    }

    fn derive(
        epidemiology: EpidemiologyParams,
        severity: SeverityTable,
        overflow: OverflowPolicy,
    ) -> Self {
        EpidemicParameters {
            latency_rate: 1.0 / epidemiology.incubation_time(),
            infectious_rate: 1.0 / epidemiology.infectious_period(),
            hospital_rate: 1.0 / epidemiology.length_hospital_stay(),
            icu_rate: 1.0 / epidemiology.length_icu_stay(),
            hospitalized_fraction: PerAge::from_fn(|age| severity.hospitalized_fraction(age)),
            critical_fraction: PerAge::from_fn(|age| severity.critical_fraction(age)),
            fatal_fraction: PerAge::from_fn(|age| severity.fatal_fraction(age)),
            transmission_weight: PerAge::from_fn(|age| severity.transmission_weight(age)),
            epidemiology,
            severity,
            overflow,
        }
    }

    /// Transmission rate at time t before containment, β(t).
    pub fn transmission_rate(&self, t: Time) -> Real {
        self.epidemiology.beta(t)
    }

    /// Baseline transmission rate, r0 / infectious_period.
    pub fn beta_baseline(&self) -> Real {
        self.epidemiology.beta_baseline()
    }

    /// Critical fraction of hospitalized patients of the bucket, given the
    /// share of hospitalized patients that could not be admitted.
    pub fn effective_critical_fraction(&self, age: AgeGroup, unmet_share: Real) -> Real {
        penalized(
            self.critical_fraction[age],
            self.overflow.hospital_overflow_severity,
            unmet_share,
        )
    }

    /// Fatality fraction of critical patients of the bucket, given the share
    /// of critical patients without an ICU bed.
    pub fn effective_fatal_fraction(&self, age: AgeGroup, unmet_share: Real) -> Real {
        penalized(
            self.fatal_fraction[age],
            self.overflow.icu_overflow_severity,
            unmet_share,
        )
    }
}

impl Default for EpidemicParameters {
    fn default() -> Self {
        Self::derive(
            EpidemiologyParams::default(),
            SeverityTable::default(),
            OverflowPolicy::default(),
        )
    }
}

/// Blend of the admitted fraction and the penalized fraction (capped at 1)
/// weighted by the unmet share.
fn penalized(fraction: Real, severity: Real, unmet_share: Real) -> Real {
    let worse = (fraction * severity).min(1.0);
    fraction * (1.0 - unmet_share) + worse * unmet_share
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn derives_rates_from_durations() {
        let params = EpidemicParameters::new(
            EpidemiologyParams::default()
                .with_incubation_time(4.0)
                .with_infectious_period(2.0)
                .with_r0(3.0),
            SeverityTable::default(),
        )
        .unwrap();
        assert_approx_eq!(params.latency_rate(), 0.25);
        assert_approx_eq!(params.infectious_rate(), 0.5);
        assert_approx_eq!(params.beta_baseline(), 1.5);
        assert_approx_eq!(params.transmission_rate(42.0), 1.5);
        assert_eq!(params.overflow().icu_overflow_severity(), OVERFLOW_SEVERITY);
    }

    #[test]
    fn default_matches_validated_construction() {
        let built =
            EpidemicParameters::new(EpidemiologyParams::default(), SeverityTable::default())
                .unwrap();
        assert_eq!(built, EpidemicParameters::default());
    }

    #[test]
    fn rejects_invalid_inputs() {
        let err = EpidemicParameters::new(
            EpidemiologyParams::default().with_infectious_period(0.0),
            SeverityTable::default(),
        )
        .unwrap_err();
        assert_eq!(err.field(), "infectious_period");

        let err = OverflowPolicy::new(2.0, 0.5).unwrap_err();
        assert_eq!(err.field(), "hospital_overflow_severity");
    }

    #[test]
    fn overflow_penalty_shifts_fractions() {
        let params = EpidemicParameters::default();
        let age = AgeGroup::Age80Plus;
        let fatal = params.fatal_fraction()[age];
        assert_approx_eq!(params.effective_fatal_fraction(age, 0.0), fatal);
        assert_approx_eq!(params.effective_fatal_fraction(age, 1.0), 1.0);
        assert_approx_eq!(params.effective_fatal_fraction(age, 0.5), 0.5 * fatal + 0.5);

        // hospital penalty is disabled by default
        let critical = params.critical_fraction()[age];
        assert_approx_eq!(params.effective_critical_fraction(age, 1.0), critical);
    }
}
