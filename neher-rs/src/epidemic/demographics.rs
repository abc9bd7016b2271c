use crate::{
    error::{check, Result, ValidationError},
    prelude::{AgeCount10, AgeGroup, PerAge, Real},
};
use getset::{CopyGetters, Getters};
use serde::Serialize;

/// Largest accepted relative gap between `populationServed` and the sum of
/// the age buckets.
pub const POPULATION_MISMATCH_TOLERANCE: Real = 0.10;

/// Immutable age-bucketed population of the served region, together with its
/// healthcare capacity.
///
/// Labels are informational. Bed counts cap the healthcare load when
/// accounting for unmet demand; they never drive the dynamics directly.
#[derive(Debug, Clone, PartialEq, Serialize, Getters, CopyGetters)]
pub struct DemographicTable {
    #[getset(get = "pub")]
    country: String,

    #[getset(get = "pub")]
    case_region: String,

    #[getset(get_copy = "pub")]
    population_served: u64,

    #[getset(get_copy = "pub")]
    hospital_beds: u64,

    #[getset(get_copy = "pub")]
    icu_beds: u64,

    #[getset(get_copy = "pub")]
    population_by_decade: AgeCount10,
}

impl DemographicTable {
    /// Validate raw counts and build the table.
    ///
    /// Counts are taken signed so that negative input is reported with the
    /// offending field rather than failing somewhere upstream.
    pub fn new(
        country: impl Into<String>,
        case_region: impl Into<String>,
        population_served: i64,
        hospital_beds: i64,
        icu_beds: i64,
        population_by_decade: &[i64],
    ) -> Result<Self> {
        let population_served = count("populationServed", population_served)?;
        let hospital_beds = count("hospitalBeds", hospital_beds)?;
        let icu_beds = count("icuBeds", icu_beds)?;
        if population_served == 0 {
            return Err(ValidationError::NonPositive {
                field: "populationServed".into(),
                value: 0.0,
            });
        }

        check::length(
            "populationByDecade",
            population_by_decade.len(),
            AgeGroup::COUNT,
        )?;
        let mut buckets: AgeCount10 = [0; 9];
        for (i, &n) in population_by_decade.iter().enumerate() {
            buckets[i] = count(&format!("populationByDecade[{}]", i), n)?;
        }

        let total = buckets
            .iter()
            .try_fold(0u64, |acc, &n| acc.checked_add(n))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "populationByDecade".into(),
                value: buckets.iter().map(|&n| n as Real).sum(),
                min: 0.0,
                max: u64::MAX as Real,
            })?;
        let served = population_served as Real;
        let mismatch = (total as Real - served).abs() / served;
        if mismatch > POPULATION_MISMATCH_TOLERANCE {
            return Err(ValidationError::Inconsistent {
                field: "populationServed".into(),
                reason: format!(
                    "{} differs from the age-bucket total {} by {:.1}%",
                    population_served,
                    total,
                    100.0 * mismatch
                ),
            });
        }

        Ok(DemographicTable {
            country: country.into(),
            case_region: case_region.into(),
            population_served,
            hospital_beds,
            icu_beds,
            population_by_decade: buckets,
        })
    }

    pub fn builder() -> DemographicTableBuilder {
        DemographicTableBuilder::default()
    }

    /// Population of an age bucket.
    pub fn population(&self, age: AgeGroup) -> Real {
        self.population_by_decade[age.index()] as Real
    }

    /// Population of every bucket.
    pub fn populations(&self) -> PerAge<Real> {
        PerAge::from_fn(|age| self.population(age))
    }

    /// Sum of the age buckets. Close to, but not necessarily equal to,
    /// `population_served`.
    pub fn bucket_total(&self) -> Real {
        self.population_by_decade.iter().sum::<u64>() as Real
    }

    /// Bucket population as a fraction of the population served.
    pub fn share(&self, age: AgeGroup) -> Real {
        self.population(age) / self.population_served as Real
    }
}

fn count(field: &str, value: i64) -> Result<u64> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value: value as Real,
        });
    }
    Ok(value as u64)
}

/// Incremental construction of a [`DemographicTable`]; validation happens in
/// [`DemographicTableBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct DemographicTableBuilder {
    country: String,
    case_region: String,
    population_served: i64,
    hospital_beds: i64,
    icu_beds: i64,
    population_by_decade: Vec<i64>,
}

impl DemographicTableBuilder {
    pub fn country(mut self, value: impl Into<String>) -> Self {
        self.country = value.into();
        self
    }

    pub fn case_region(mut self, value: impl Into<String>) -> Self {
        self.case_region = value.into();
        self
    }

    pub fn population_served(mut self, value: i64) -> Self {
        self.population_served = value;
        self
    }

    pub fn hospital_beds(mut self, value: i64) -> Self {
        self.hospital_beds = value;
        self
    }

    pub fn icu_beds(mut self, value: i64) -> Self {
        self.icu_beds = value;
        self
    }

    pub fn population_by_decade(mut self, value: &[i64]) -> Self {
        self.population_by_decade = value.to_vec();
        self
    }

    pub fn build(self) -> Result<DemographicTable> {
        DemographicTable::new(
            self.country,
            self.case_region,
            self.population_served,
            self.hospital_beds,
            self.icu_beds,
            &self.population_by_decade,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::switzerland;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn builds_valid_table() {
        let demo = switzerland();
        assert_eq!(demo.country(), "Switzerland");
        assert_eq!(demo.population_served(), 8_600_000);
        assert_approx_eq!(demo.bucket_total(), 8_600_000.0);
        assert_approx_eq!(demo.population(AgeGroup::Age80Plus), 476_000.0);
        assert_approx_eq!(demo.populations().sum(), 8_600_000.0);
    }

    #[test]
    fn rejects_negative_counts() {
        let err = DemographicTable::new("X", "X", 100, -1, 0, &[10; 9]).unwrap_err();
        assert_eq!(err.field(), "hospitalBeds");

        let mut counts = [10; 9];
        counts[4] = -3;
        let err = DemographicTable::new("X", "X", 70, 0, 0, &counts).unwrap_err();
        assert_eq!(err.field(), "populationByDecade[4]");
    }

    #[test]
    fn rejects_bucket_total_overflow() {
        let huge = i64::MAX / 4;
        let err = DemographicTable::new("X", "X", huge, 0, 0, &[huge; 9]).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert_eq!(err.field(), "populationByDecade");
    }

    #[test]
    fn rejects_wrong_bucket_count() {
        let err = DemographicTable::new("X", "X", 80, 0, 0, &[10; 8]).unwrap_err();
        assert!(matches!(err, ValidationError::WrongLength { got: 8, .. }));

        let err = DemographicTable::new("X", "X", 80, 0, 0, &[]).unwrap_err();
        assert!(matches!(err, ValidationError::Empty { .. }));
    }

    #[test]
    fn rejects_inconsistent_population() {
        let err = DemographicTable::new("X", "X", 1_000, 0, 0, &[10; 9]).unwrap_err();
        assert_eq!(err.field(), "populationServed");

        // small mismatches are accepted
        assert!(DemographicTable::new("X", "X", 91, 0, 0, &[10; 9]).is_ok());
    }
}
