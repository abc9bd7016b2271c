use crate::prelude::{AgeDistribution10, Real};

///////////////////////////////////////////////////////////////////////////////
// Default param for COVID-19
///////////////////////////////////////////////////////////////////////////////

pub const R0: Real = 2.7;
pub const INCUBATION_TIME: Real = 5.0;
pub const INFECTIOUS_PERIOD: Real = 3.0;
pub const LENGTH_HOSPITAL_STAY: Real = 4.0;
pub const LENGTH_ICU_STAY: Real = 14.0;
pub const SEASONAL_FORCING: Real = 0.0;
pub const PEAK_MONTH: u32 = 0;
pub const OVERFLOW_SEVERITY: Real = 2.0;
pub const HOSPITAL_OVERFLOW_SEVERITY: Real = 1.0;
pub const DAYS_PER_YEAR: Real = 365.0;

// Distributions, in percent
pub const ISOLATED_DISTRIBUTION: AgeDistribution10 = [0.0; 9];
pub const CONFIRMED_DISTRIBUTION: AgeDistribution10 =
    [5., 5., 10., 15., 20., 25., 30., 40., 50.];
pub const SEVERE_DISTRIBUTION: AgeDistribution10 = [1., 3., 3., 3., 6., 10., 25., 35., 50.];
pub const CRITICAL_DISTRIBUTION: AgeDistribution10 =
    [5., 10., 10., 15., 20., 25., 35., 45., 55.];
pub const FATAL_DISTRIBUTION: AgeDistribution10 = [30., 30., 30., 30., 30., 40., 40., 50., 50.];
pub const CONTACT_WEIGHT: Real = 1.0;
