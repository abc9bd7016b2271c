use crate::{
    epidemic::DemographicTable,
    error::{check, Result},
    prelude::{AgeDistribution10, AgeGroup, PerAge, Real},
};
use getset::CopyGetters;
use serde::{Deserialize, Serialize};

/// Share of seeded cases placed in Exposed; the rest start Infectious.
pub const SEED_EXPOSED_SHARE: Real = 0.7;

/// How `suspectedCasesToday` is spread over age buckets at day 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Proportional to each bucket's share of the population served.
    Proportional,
    /// Every case in the 60-69 bucket.
    MiddleBucket,
    /// Explicit per-age seed. The totals need not match `suspectedCasesToday`.
    PerAge(AgeDistribution10),
}

impl Default for SeedPolicy {
    fn default() -> Self {
        SeedPolicy::Proportional
    }
}

/// How `importsPerDay` is spread over age buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPolicy {
    /// Proportional to each bucket's share of the population served.
    Proportional,
    /// Same number of imports in every bucket.
    Uniform,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        ImportPolicy::Proportional
    }
}

/// Infectivity seed: cases present at day 0 and exogenous daily imports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct EpidemicSeed {
    suspected_cases_today: Real,
    imports_per_day: Real,
    seed_policy: SeedPolicy,
    import_policy: ImportPolicy,
    exposed_share: Real,
}

impl EpidemicSeed {
    pub fn new(suspected_cases_today: Real, imports_per_day: Real) -> Result<Self> {
        Ok(EpidemicSeed {
            suspected_cases_today: check::non_negative(
                "suspectedCasesToday",
                suspected_cases_today,
            )?,
            imports_per_day: check::non_negative("importsPerDay", imports_per_day)?,
            seed_policy: SeedPolicy::default(),
            import_policy: ImportPolicy::default(),
            exposed_share: SEED_EXPOSED_SHARE,
        })
    }

    /// No seeded cases and no imports.
    pub fn none() -> Self {
        EpidemicSeed {
            suspected_cases_today: 0.0,
            imports_per_day: 0.0,
            seed_policy: SeedPolicy::default(),
            import_policy: ImportPolicy::default(),
            exposed_share: SEED_EXPOSED_SHARE,
        }
    }

    pub fn with_seed_policy(mut self, policy: SeedPolicy) -> Result<Self> {
        if let SeedPolicy::PerAge(values) = &policy {
            for (age, &value) in AgeGroup::ALL.iter().zip(values.iter()) {
                check::non_negative(&format!("seed.perAge[{}]", age), value)?;
            }
        }
        self.seed_policy = policy;
        Ok(self)
    }

    pub fn with_import_policy(mut self, policy: ImportPolicy) -> Self {
        self.import_policy = policy;
        self
    }

    pub fn with_exposed_share(mut self, share: Real) -> Result<Self> {
        self.exposed_share = check::in_range("seed.exposedShare", share, 0.0, 1.0)?;
        Ok(self)
    }

    /// Cases seeded in each bucket at day 0, before clamping to the bucket
    /// population.
    pub fn initial_cases(&self, demographics: &DemographicTable) -> PerAge<Real> {
        let cases = self.suspected_cases_today;
        match self.seed_policy {
            SeedPolicy::Proportional => PerAge::from_fn(|age| cases * demographics.share(age)),
            SeedPolicy::MiddleBucket => PerAge::from_fn(|age| {
                if age == AgeGroup::Age60To69 {
                    cases
                } else {
                    0.0
                }
            }),
            SeedPolicy::PerAge(values) => PerAge(values),
        }
    }

    /// Daily imports arriving in the given bucket.
    pub fn imports_for(&self, age: AgeGroup, demographics: &DemographicTable) -> Real {
        match self.import_policy {
            ImportPolicy::Proportional => self.imports_per_day * demographics.share(age),
            ImportPolicy::Uniform => self.imports_per_day / AgeGroup::COUNT as Real,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::switzerland;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn rejects_negative_values() {
        let err = EpidemicSeed::new(-1.0, 0.0).unwrap_err();
        assert_eq!(err.field(), "suspectedCasesToday");
        let err = EpidemicSeed::new(0.0, -4.0).unwrap_err();
        assert_eq!(err.field(), "importsPerDay");
        assert!(EpidemicSeed::none().with_exposed_share(1.5).is_err());
    }

    #[test]
    fn proportional_seed_and_imports_follow_population() {
        let demo = switzerland();
        let seed = EpidemicSeed::new(1148.0, 4.0).unwrap();
        let cases = seed.initial_cases(&demo);
        assert_approx_eq!(cases.sum(), 1148.0, 1e-9);
        assert_approx_eq!(cases[AgeGroup::Age80Plus], 1148.0 * 476_000.0 / 8_600_000.0);

        let imports: Real = AgeGroup::ALL
            .iter()
            .map(|&age| seed.imports_for(age, &demo))
            .sum();
        assert_approx_eq!(imports, 4.0, 1e-12);
    }

    #[test]
    fn alternative_policies() {
        let demo = switzerland();
        let seed = EpidemicSeed::new(100.0, 9.0)
            .unwrap()
            .with_seed_policy(SeedPolicy::MiddleBucket)
            .unwrap()
            .with_import_policy(ImportPolicy::Uniform);
        let cases = seed.initial_cases(&demo);
        assert_eq!(cases[AgeGroup::Age60To69], 100.0);
        assert_eq!(cases.sum(), 100.0);
        assert_approx_eq!(seed.imports_for(AgeGroup::Age0To9, &demo), 1.0);
    }
}
