//! TOML description of a scenario, as read by the `scenario` binary.
//!
//! Raw input is deserialized as is, then converted into validated value
//! objects. Counts are read as signed integers so that a negative count
//! surfaces as a [`ValidationError`] naming the field instead of a parse
//! error.
use crate::{
    epidemic::{
        ContainmentSchedule, DemographicTable, EpidemicSeed, ImportPolicy, SeedPolicy,
    },
    error::{Error, Result, ValidationError},
    params::{EpidemicParameters, EpidemiologyParams, OverflowPolicy, SeverityTable},
    prelude::{Real, Time},
    sim::{Scenario, SimulationConfig},
};
use getset::{CopyGetters, Getters};
use serde::Deserialize;
use std::{fs, path::Path};

/// Population block, with the field names used by the scenario presets.
#[derive(Getters, CopyGetters, Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationInput {
    #[serde(default)]
    #[getset(get = "pub")]
    country: String,

    /// Region whose case counts seed the scenario.
    #[serde(default)]
    #[getset(get = "pub")]
    cases: String,

    #[getset(get_copy = "pub")]
    population_served: i64,

    #[getset(get_copy = "pub")]
    hospital_beds: i64,

    #[serde(rename = "ICUBeds", alias = "icuBeds")]
    #[getset(get_copy = "pub")]
    icu_beds: i64,

    #[serde(default)]
    #[getset(get_copy = "pub")]
    suspected_cases_today: Real,

    #[serde(default)]
    #[getset(get_copy = "pub")]
    imports_per_day: Real,

    #[getset(get = "pub")]
    populations_by_decade: Vec<i64>,
}

/// Containment multipliers. Without `times`, the i-th factor applies from
/// day i.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContainmentInput {
    factors: Vec<Real>,
    #[serde(default)]
    times: Option<Vec<Time>>,
}

impl ContainmentInput {
    pub fn schedule(&self) -> Result<ContainmentSchedule> {
        match &self.times {
            None => ContainmentSchedule::from_factors(&self.factors),
            Some(times) if times.len() != self.factors.len() => {
                Err(ValidationError::WrongLength {
                    field: "containment.times".into(),
                    expected: self.factors.len(),
                    got: times.len(),
                })
            }
            Some(times) => {
                ContainmentSchedule::new(times.iter().copied().zip(self.factors.iter().copied()))
            }
        }
    }
}

#[derive(Getters, Debug, Clone, PartialEq, Deserialize)]
#[getset(get = "pub")]
pub struct ScenarioInput {
    #[serde(default)]
    seed_policy: SeedPolicy,

    #[serde(default)]
    import_policy: ImportPolicy,

    population: PopulationInput,

    #[serde(default)]
    containment: Option<ContainmentInput>,

    #[serde(default)]
    epidemiology: EpidemiologyParams,

    #[serde(default)]
    severity: SeverityTable,

    /// Overrides the ICU severity of `epidemiology.overflow_severity` when
    /// present.
    #[serde(default)]
    overflow: Option<OverflowPolicy>,

    #[serde(default)]
    simulation: SimulationConfig,
}

impl ScenarioInput {
    pub fn from_toml_str(data: &str) -> Result<Self, Error> {
        Ok(toml::from_str(data)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let data = fs::read_to_string(path)?;
        Self::from_toml_str(&data)
    }

    pub fn demographics(&self) -> Result<DemographicTable> {
        let p = &self.population;
        DemographicTable::new(
            p.country.clone(),
            p.cases.clone(),
            p.population_served,
            p.hospital_beds,
            p.icu_beds,
            &p.populations_by_decade,
        )
    }

    pub fn seed(&self) -> Result<EpidemicSeed> {
        let p = &self.population;
        EpidemicSeed::new(p.suspected_cases_today, p.imports_per_day)?
            .with_seed_policy(self.seed_policy)
            .map(|seed| seed.with_import_policy(self.import_policy))
    }

    pub fn containment_schedule(&self) -> Result<Option<ContainmentSchedule>> {
        self.containment.as_ref().map(|c| c.schedule()).transpose()
    }

    pub fn parameters(&self) -> Result<EpidemicParameters> {
        match self.overflow {
            Some(overflow) => {
                EpidemicParameters::with_overflow(self.epidemiology, self.severity, overflow)
            }
            None => EpidemicParameters::new(self.epidemiology, self.severity),
        }
    }

    /// Validate every block and assemble a runnable scenario.
    pub fn scenario(&self) -> Result<Scenario> {
        let name = if self.population.cases.is_empty() {
            self.population.country.clone()
        } else {
            self.population.cases.clone()
        };
        let scenario = Scenario::new(name, self.demographics()?, self.seed()?, self.parameters()?);
        Ok(match self.containment_schedule()? {
            Some(schedule) => scenario.with_containment(schedule),
            None => scenario,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{epidemic::ContainmentLookup, prelude::AgeGroup};
    use assert_approx_eq::assert_approx_eq;

    const SWITZERLAND: &str = r#"
seed_policy = "middle_bucket"

[population]
country = "Switzerland"
cases = "CHE-Basel-Landschaft"
populationServed = 8600000
hospitalBeds = 30799
ICUBeds = 1400
suspectedCasesToday = 1148
importsPerDay = 4.0
populationsByDecade = [866000, 848000, 1048000, 1177000, 1181000, 1309000, 968000, 727000, 476000]

[containment]
factors = [1.0, 0.9, 0.8, 0.8, 0.8, 0.8, 0.8, 0.8, 0.8, 0.8]

[epidemiology]
r0 = 2.2

[simulation]
horizon_days = 10.0
"#;

    #[test]
    fn parses_full_scenario() {
        let input = ScenarioInput::from_toml_str(SWITZERLAND).unwrap();
        assert_eq!(input.population().icu_beds(), 1400);
        assert_eq!(*input.seed_policy(), SeedPolicy::MiddleBucket);
        assert_eq!(*input.import_policy(), ImportPolicy::Proportional);
        assert_eq!(input.simulation().horizon_days(), 10.0);
        assert_eq!(input.simulation().dt(), 1.0);

        let scenario = input.scenario().unwrap();
        assert_eq!(scenario.name(), "CHE-Basel-Landschaft");
        assert_eq!(scenario.demographics().population_served(), 8_600_000);
        assert_approx_eq!(scenario.parameters().beta_baseline(), 2.2 / 3.0);

        let seed = scenario.seed();
        assert_eq!(seed.suspected_cases_today(), 1148.0);
        let cases = seed.initial_cases(scenario.demographics());
        assert_eq!(cases[AgeGroup::Age60To69], 1148.0);

        let containment = scenario.containment().as_ref().unwrap();
        assert_eq!(containment.multiplier_at(0.5), 1.0);
        assert_eq!(containment.multiplier_at(1.0), 0.9);
        assert_eq!(containment.multiplier_at(30.0), 0.8);
    }

    #[test]
    fn negative_counts_name_the_field() {
        let data = SWITZERLAND.replace("hospitalBeds = 30799", "hospitalBeds = -5");
        let input = ScenarioInput::from_toml_str(&data).unwrap();
        assert_eq!(input.demographics().unwrap_err().field(), "hospitalBeds");
        assert!(matches!(
            input.scenario(),
            Err(ValidationError::Negative { .. })
        ));
    }

    #[test]
    fn explicit_times_must_match_factors() {
        let data = SWITZERLAND.replace(
            "[containment]\n",
            "[containment]\ntimes = [0.0, 20.0]\n",
        );
        let input = ScenarioInput::from_toml_str(&data).unwrap();
        let err = input.containment_schedule().unwrap_err();
        assert_eq!(err.field(), "containment.times");

        let ok: ContainmentInput =
            toml::from_str("factors = [1.0, 0.4]\ntimes = [0.0, 20.0]").unwrap();
        let schedule = ok.schedule().unwrap();
        assert_eq!(schedule.multiplier_at(19.0), 1.0);
        assert_eq!(schedule.multiplier_at(20.0), 0.4);
    }

    #[test]
    fn overflow_block_overrides_epidemiology() {
        let data = format!(
            "{}\n[overflow]\nicu_overflow_severity = 3.0\n",
            SWITZERLAND
        );
        let input = ScenarioInput::from_toml_str(&data).unwrap();
        let params = input.parameters().unwrap();
        assert_eq!(params.overflow().icu_overflow_severity(), 3.0);
        assert_eq!(params.overflow().hospital_overflow_severity(), 1.0);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let err = ScenarioInput::from_toml_str("[population]\ncountry = 3").unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
    }
}
