use crate::{
    epidemic::{CompartmentState, DemographicTable},
    prelude::Real,
};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

/// Healthcare demand of a state measured against the available capacity.
///
/// Demand above capacity is reported as unmet. It never removes anyone from
/// the compartments: unmet patients stay Hospitalized/Critical and only their
/// progression rates may be penalized by the overflow policy.
#[derive(CopyGetters, Debug, PartialEq, Copy, Clone, Default, Serialize, Deserialize)]
#[getset(get_copy = "pub")]
pub struct HealthcareLoad {
    hospitalized: Real,
    critical: Real,
    hospital_beds: Real,
    icu_beds: Real,
}

impl HealthcareLoad {
    pub fn new(hospitalized: Real, critical: Real, hospital_beds: Real, icu_beds: Real) -> Self {
        HealthcareLoad {
            hospitalized,
            critical,
            hospital_beds,
            icu_beds,
        }
    }

    /// Total Hospitalized and Critical demand of the state.
    pub fn measure(state: &CompartmentState, demographics: &DemographicTable) -> Self {
        Self::new(
            state.total_hospitalized(),
            state.total_critical(),
            demographics.hospital_beds() as Real,
            demographics.icu_beds() as Real,
        )
    }

    /// Hospitalized patients without a bed.
    pub fn hospital_unmet(&self) -> Real {
        (self.hospitalized - self.hospital_beds).max(0.0)
    }

    /// Critical patients without an ICU bed.
    pub fn icu_unmet(&self) -> Real {
        (self.critical - self.icu_beds).max(0.0)
    }

    pub fn hospital_overflow(&self) -> bool {
        self.hospital_unmet() > 0.0
    }

    pub fn icu_overflow(&self) -> bool {
        self.icu_unmet() > 0.0
    }

    /// Fraction of Hospitalized patients that could not be admitted.
    pub fn hospital_unmet_share(&self) -> Real {
        share(self.hospital_unmet(), self.hospitalized)
    }

    /// Fraction of Critical patients that could not be admitted to an ICU.
    pub fn icu_unmet_share(&self) -> Real {
        share(self.icu_unmet(), self.critical)
    }
}

fn share(unmet: Real, demand: Real) -> Real {
    if demand > 0.0 {
        (unmet / demand).min(1.0)
    } else {
        0.0
    }
}
