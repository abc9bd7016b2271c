use crate::{
    epidemic::{Compartment, CompartmentState, HealthcareLoad},
    error::{Error, NumericDriftWarning},
    prelude::{AgeGroup, Real, Time},
};
use getset::{CopyGetters, Getters};
use serde::Serialize;
use std::io;

/// A recorded state together with its healthcare load.
#[derive(Getters, CopyGetters, Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    #[getset(get_copy = "pub")]
    time: Time,

    #[getset(get = "pub")]
    state: CompartmentState,

    #[getset(get_copy = "pub")]
    load: HealthcareLoad,
}

impl Snapshot {
    pub fn new(state: CompartmentState, load: HealthcareLoad) -> Self {
        Snapshot {
            time: state.time(),
            state,
            load,
        }
    }
}

/// Non-fatal events observed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A bucket was rescaled after its conservation drift exceeded tolerance.
    NumericDrift(NumericDriftWarning),

    /// Hospitalized demand above the number of hospital beds at a reported
    /// time.
    HospitalOverflow {
        time: Time,
        demand: Real,
        capacity: Real,
        unmet: Real,
    },

    /// Critical demand above the number of ICU beds at a reported time.
    IcuOverflow {
        time: Time,
        demand: Real,
        capacity: Real,
        unmet: Real,
    },
}

impl Diagnostic {
    pub fn time(&self) -> Time {
        match self {
            Diagnostic::NumericDrift(warning) => warning.time,
            Diagnostic::HospitalOverflow { time, .. } | Diagnostic::IcuOverflow { time, .. } => {
                *time
            }
        }
    }
}

/// One line of the long-format CSV export.
#[derive(Serialize)]
struct StateRow {
    time: Time,
    age_group: AgeGroup,
    susceptible: Real,
    exposed: Real,
    infectious: Real,
    hospitalized: Real,
    critical: Real,
    recovered: Real,
    deceased: Real,
}

/// One line of the healthcare load CSV export.
#[derive(Serialize)]
struct LoadRow {
    time: Time,
    hospitalized: Real,
    critical: Real,
    hospital_beds: Real,
    icu_beds: Real,
    hospital_unmet: Real,
    icu_unmet: Real,
}

/// Ordered snapshots of a completed run, starting at day 0.
///
/// A time series is only ever produced by a run that reached its horizon, so
/// it is never partial.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SimulationTimeSeries {
    snapshots: Vec<Snapshot>,
    diagnostics: Vec<Diagnostic>,
}

impl SimulationTimeSeries {
    pub(crate) fn with_capacity(n: usize) -> Self {
        SimulationTimeSeries {
            snapshots: Vec::with_capacity(n),
            diagnostics: vec![],
        }
    }

    /// Append a snapshot, flagging any capacity overflow it shows.
    pub(crate) fn record(&mut self, state: CompartmentState, load: HealthcareLoad) {
        let time = state.time();
        if load.hospital_overflow() {
            self.diagnostics.push(Diagnostic::HospitalOverflow {
                time,
                demand: load.hospitalized(),
                capacity: load.hospital_beds(),
                unmet: load.hospital_unmet(),
            });
        }
        if load.icu_overflow() {
            self.diagnostics.push(Diagnostic::IcuOverflow {
                time,
                demand: load.critical(),
                capacity: load.icu_beds(),
                unmet: load.icu_unmet(),
            });
        }
        self.snapshots.push(Snapshot::new(state, load));
    }

    pub(crate) fn push_drift(&mut self, warning: NumericDriftWarning) {
        self.diagnostics.push(Diagnostic::NumericDrift(warning));
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn get(&self, i: usize) -> Option<&Snapshot> {
        self.snapshots.get(i)
    }

    /// Snapshot recorded exactly at `time`, if any.
    pub fn at(&self, time: Time) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| (s.time - time).abs() < 1e-9)
    }

    pub fn times(&self) -> Vec<Time> {
        self.snapshots.iter().map(|s| s.time).collect()
    }

    pub fn final_state(&self) -> Option<&CompartmentState> {
        self.snapshots.last().map(|s| &s.state)
    }

    /// Total of a compartment at each snapshot.
    pub fn curve(&self, compartment: Compartment) -> Vec<Real> {
        self.snapshots
            .iter()
            .map(|s| s.state.total(compartment))
            .collect()
    }

    /// Count of a compartment in one bucket at each snapshot.
    pub fn bucket_curve(&self, compartment: Compartment, age: AgeGroup) -> Vec<Real> {
        self.snapshots
            .iter()
            .map(|s| s.state.get(compartment, age))
            .collect()
    }

    pub fn cumulative_infected_curve(&self) -> Vec<Real> {
        self.snapshots
            .iter()
            .map(|s| s.state.total_cumulative_infected())
            .collect()
    }

    /// Recovered + Deceased at each snapshot.
    pub fn resolved_curve(&self) -> Vec<Real> {
        self.snapshots
            .iter()
            .map(|s| s.state.total_resolved())
            .collect()
    }

    /// Time and value of the largest total of a compartment.
    pub fn peak(&self, compartment: Compartment) -> Option<(Time, Real)> {
        self.snapshots
            .iter()
            .map(|s| (s.time, s.state.total(compartment)))
            .fold(None, |best, (t, x)| match best {
                Some((_, y)) if y >= x => best,
                _ => Some((t, x)),
            })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn drift_warnings(&self) -> impl Iterator<Item = &NumericDriftWarning> {
        self.diagnostics.iter().filter_map(|d| match d {
            Diagnostic::NumericDrift(warning) => Some(warning),
            _ => None,
        })
    }

    /// Number of reported snapshots with hospital or ICU overflow.
    pub fn overflow_count(&self) -> usize {
        self.snapshots
            .iter()
            .filter(|s| s.load.hospital_overflow() || s.load.icu_overflow())
            .count()
    }

    /// Write one row per (time, age group) with the count of every stage.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        for snapshot in &self.snapshots {
            let state = &snapshot.state;
            for age in AgeGroup::ALL.iter().copied() {
                wtr.serialize(StateRow {
                    time: snapshot.time,
                    age_group: age,
                    susceptible: state.get(Compartment::Susceptible, age),
                    exposed: state.get(Compartment::Exposed, age),
                    infectious: state.get(Compartment::Infectious, age),
                    hospitalized: state.get(Compartment::Hospitalized, age),
                    critical: state.get(Compartment::Critical, age),
                    recovered: state.get(Compartment::Recovered, age),
                    deceased: state.get(Compartment::Deceased, age),
                })?;
            }
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write one row per time with the healthcare load and unmet demand.
    pub fn write_load_csv<W: io::Write>(&self, writer: W) -> Result<(), Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        for snapshot in &self.snapshots {
            let load = snapshot.load;
            wtr.serialize(LoadRow {
                time: snapshot.time,
                hospitalized: load.hospitalized(),
                critical: load.critical(),
                hospital_beds: load.hospital_beds(),
                icu_beds: load.icu_beds(),
                hospital_unmet: load.hospital_unmet(),
                icu_unmet: load.icu_unmet(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Render [`SimulationTimeSeries::write_csv`] output as a string.
    pub fn render_csv(&self) -> Result<String, Error> {
        let mut data = vec![];
        self.write_csv(&mut data)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}
