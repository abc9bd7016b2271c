use super::constants::*;
use crate::{
    error::{check, Result, ValidationError},
    prelude::{Real, Time},
};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Population-wide epidemiology: reproduction number, stage durations and
/// seasonality.
///
/// Durations are average stay lengths in days; the matching transition rates
/// are their inverses.
#[derive(CopyGetters, Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct EpidemiologyParams {
    /// Basic reproduction number.
    r0: Real,

    /// Average latency (Exposed -> Infectious).
    incubation_time: Real,

    /// Average time spent Infectious.
    infectious_period: Real,

    /// Average stay in the Hospitalized stage.
    length_hospital_stay: Real,

    /// Average stay in the Critical stage.
    #[serde(alias = "length_ICU_stay")]
    length_icu_stay: Real,

    /// Amplitude of the yearly transmission cycle, in [0, 1).
    seasonal_forcing: Real,

    /// Month (0 = January) of peak transmission.
    peak_month: u32,

    /// Day of the year at which the simulation starts, used to phase the
    /// seasonal cycle.
    start_day_of_year: Time,

    /// Fatality multiplier for critical patients without an ICU bed.
    overflow_severity: Real,
}

impl Default for EpidemiologyParams {
    fn default() -> Self {
        EpidemiologyParams {
            r0: R0,
            incubation_time: INCUBATION_TIME,
            infectious_period: INFECTIOUS_PERIOD,
            length_hospital_stay: LENGTH_HOSPITAL_STAY,
            length_icu_stay: LENGTH_ICU_STAY,
            seasonal_forcing: SEASONAL_FORCING,
            peak_month: PEAK_MONTH,
            start_day_of_year: 0.0,
            overflow_severity: OVERFLOW_SEVERITY,
        }
    }
}

macro_rules! setter {
    ($($name:ident),* $(,)?) => {
        paste::paste! {
            $(
                pub fn [<with_ $name>](mut self, value: Real) -> Self {
                    self.$name = value;
                    self
                }
            )*
        }
    };
}

impl EpidemiologyParams {
    setter!(
        r0,
        incubation_time,
        infectious_period,
        length_hospital_stay,
        length_icu_stay,
        seasonal_forcing,
        start_day_of_year,
        overflow_severity,
    );

    pub fn with_peak_month(mut self, month: u32) -> Self {
        self.peak_month = month;
        self
    }

    /// Reject non-positive rates and out-of-range seasonality.
    pub fn validate(&self) -> Result<()> {
        check::positive("r0", self.r0)?;
        check::positive("incubation_time", self.incubation_time)?;
        check::positive("infectious_period", self.infectious_period)?;
        check::positive("length_hospital_stay", self.length_hospital_stay)?;
        check::positive("length_icu_stay", self.length_icu_stay)?;
        check::finite("start_day_of_year", self.start_day_of_year)?;
        check::finite("overflow_severity", self.overflow_severity)?;
        if self.overflow_severity < 1.0 {
            return Err(ValidationError::OutOfRange {
                field: "overflow_severity".into(),
                value: self.overflow_severity,
                min: 1.0,
                max: Real::INFINITY,
            });
        }
        check::non_negative("seasonal_forcing", self.seasonal_forcing)?;
        if self.seasonal_forcing >= 1.0 {
            return Err(ValidationError::OutOfRange {
                field: "seasonal_forcing".into(),
                value: self.seasonal_forcing,
                min: 0.0,
                max: 1.0,
            });
        }
        check::in_range("peak_month", self.peak_month as Real, 0.0, 11.0)?;
        Ok(())
    }

    /// Baseline transmission rate, r0 / infectious_period.
    pub fn beta_baseline(&self) -> Real {
        self.r0 / self.infectious_period
    }

    /// Day of the year with maximal transmission.
    pub fn peak_day(&self) -> Real {
        30.0 * self.peak_month as Real + 14.75
    }

    /// Seasonally forced transmission rate at simulated time t.
    pub fn beta(&self, t: Time) -> Real {
        if self.seasonal_forcing == 0.0 {
            return self.beta_baseline();
        }
        let phase = 2.0 * PI * (t + self.start_day_of_year - self.peak_day()) / DAYS_PER_YEAR;
        self.beta_baseline() * (1.0 + self.seasonal_forcing * phase.cos())
    }
}
