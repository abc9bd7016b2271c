//! Shared fixtures for unit tests.
use crate::{
    epidemic::{ContainmentSchedule, DemographicTable, EpidemicSeed},
    prelude::Real,
};

/// Switzerland, split in decades, with its hospital and ICU capacity.
pub(crate) fn switzerland() -> DemographicTable {
    DemographicTable::builder()
        .country("Switzerland")
        .case_region("CHE")
        .population_served(8_600_000)
        .hospital_beds(30_799)
        .icu_beds(1_400)
        .population_by_decade(&[
            866_000, 848_000, 1_048_000, 1_177_000, 1_181_000, 1_309_000, 968_000, 727_000,
            476_000,
        ])
        .build()
        .unwrap()
}

pub(crate) fn switzerland_seed() -> EpidemicSeed {
    EpidemicSeed::new(1148.0, 4.0).unwrap()
}

/// 1.0 on day 0, 0.9 on day 1 and 0.8 afterwards.
pub(crate) fn switzerland_containment() -> ContainmentSchedule {
    let mut factors: Vec<Real> = vec![1.0, 0.9];
    factors.extend([0.8; 8].iter());
    ContainmentSchedule::from_factors(&factors).unwrap()
}

/// 100 people in each bucket, 10 hospital beds and 30 ICU beds.
pub(crate) fn small_table() -> DemographicTable {
    DemographicTable::builder()
        .country("Testland")
        .population_served(900)
        .hospital_beds(10)
        .icu_beds(30)
        .population_by_decade(&[100; 9])
        .build()
        .unwrap()
}
