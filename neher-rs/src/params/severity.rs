use super::constants::*;
use crate::{
    error::{check, Result},
    prelude::{AgeGroup, AgeParam, ForAge, Real},
};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

/// Age-stratified clinical severity, in percent.
///
/// Each entry may be a scalar applied to every bucket or a list of nine
/// values in age-bucket order.
#[derive(CopyGetters, Debug, PartialEq, Copy, Clone, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
#[serde(default)]
pub struct SeverityTable {
    /// Share of infectious individuals isolated from the rest of the
    /// population.
    isolated: AgeParam,

    /// Share of infections that are confirmed cases.
    confirmed: AgeParam,

    /// Share of confirmed cases that need hospitalization.
    severe: AgeParam,

    /// Share of hospitalized patients that become critical.
    critical: AgeParam,

    /// Share of critical patients that die.
    fatal: AgeParam,

    /// Relative contact rate of the bucket (not a percentage).
    contact_weight: AgeParam,
}

impl Default for SeverityTable {
    fn default() -> Self {
        SeverityTable {
            isolated: ISOLATED_DISTRIBUTION.into(),
            confirmed: CONFIRMED_DISTRIBUTION.into(),
            severe: SEVERE_DISTRIBUTION.into(),
            critical: CRITICAL_DISTRIBUTION.into(),
            fatal: FATAL_DISTRIBUTION.into(),
            contact_weight: CONTACT_WEIGHT.into(),
        }
    }
}

impl SeverityTable {
    pub fn with_isolated(mut self, value: impl Into<AgeParam>) -> Self {
        self.isolated = value.into();
        self
    }

    pub fn with_confirmed(mut self, value: impl Into<AgeParam>) -> Self {
        self.confirmed = value.into();
        self
    }

    pub fn with_severe(mut self, value: impl Into<AgeParam>) -> Self {
        self.severe = value.into();
        self
    }

    pub fn with_critical(mut self, value: impl Into<AgeParam>) -> Self {
        self.critical = value.into();
        self
    }

    pub fn with_fatal(mut self, value: impl Into<AgeParam>) -> Self {
        self.fatal = value.into();
        self
    }

    pub fn with_contact_weight(mut self, value: impl Into<AgeParam>) -> Self {
        self.contact_weight = value.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        for age in AgeGroup::ALL.iter().copied() {
            let percent = |name: &str, p: &AgeParam| {
                check::in_range(&format!("{}[{}]", name, age), p.for_age(age), 0.0, 100.0)
            };
            percent("isolated", &self.isolated)?;
            percent("confirmed", &self.confirmed)?;
            percent("severe", &self.severe)?;
            percent("critical", &self.critical)?;
            percent("fatal", &self.fatal)?;
            check::non_negative(
                &format!("contact_weight[{}]", age),
                self.contact_weight.for_age(age),
            )?;
        }
        Ok(())
    }

    /// Fraction of infectious individuals that end up hospitalized.
    pub fn hospitalized_fraction(&self, age: AgeGroup) -> Real {
        self.severe.for_age(age) / 100.0 * self.confirmed.for_age(age) / 100.0
    }

    /// Fraction of hospitalized patients that become critical.
    pub fn critical_fraction(&self, age: AgeGroup) -> Real {
        self.critical.for_age(age) / 100.0
    }

    /// Fraction of critical patients that die.
    pub fn fatal_fraction(&self, age: AgeGroup) -> Real {
        self.fatal.for_age(age) / 100.0
    }

    /// Relative susceptibility of the bucket to the shared force of infection.
    pub fn transmission_weight(&self, age: AgeGroup) -> Real {
        (1.0 - self.isolated.for_age(age) / 100.0) * self.contact_weight.for_age(age)
    }
}
