//! Simulation output: one [`StateRecord`] per point of the time grid.
//!
//! A [`TimeSeries`] is only ever appended to by the simulator while a run is in progress. Once a
//! run returns, the series is read-only.
use serde::{Deserialize, Serialize};

/// Compartment counts at one grid point, plus the transitions that led to it.
///
/// At `t = 0`, `new_infections` and `new_recoveries` are the initial infected and recovered
/// counts.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct StateRecord {
    pub time: f64,
    #[serde(rename = "S")]
    pub susceptible: u64,
    #[serde(rename = "I")]
    pub infected: u64,
    #[serde(rename = "R")]
    pub recovered: u64,
    pub new_infections: u64,
    pub new_recoveries: u64,
}

impl StateRecord {
    #[must_use]
    pub fn population(&self) -> u64 {
        self.susceptible + self.infected + self.recovered
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimeSeries {
    dt: f64,
    records: Vec<StateRecord>,
}

impl TimeSeries {
    pub(crate) fn with_capacity(dt: f64, capacity: usize) -> Self {
        TimeSeries {
            dt,
            records: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, record: StateRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn records(&self) -> &[StateRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StateRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn first(&self) -> Option<&StateRecord> {
        self.records.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&StateRecord> {
        self.records.last()
    }

    /// Returns the record at the grid point nearest to `time`, or `None` if `time` is negative
    /// or beyond the horizon.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn at_time(&self, time: f64) -> Option<&StateRecord> {
        let index = (time / self.dt).round();
        if !index.is_finite() || index < 0.0 {
            return None;
        }
        self.records.get(index as usize)
    }

    /// The record with the largest infected count. Ties resolve to the earliest record.
    #[must_use]
    pub fn peak(&self) -> Option<&StateRecord> {
        self.records
            .iter()
            .reduce(|best, record| {
                if record.infected > best.infected {
                    record
                } else {
                    best
                }
            })
    }

    /// Number of infections that happened during the run, not counting the initial infections.
    #[must_use]
    pub fn cumulative_incidence(&self) -> u64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => first.susceptible - last.susceptible,
            _ => 0,
        }
    }

    /// Time of the first record with no infected people, if the epidemic dies out.
    #[must_use]
    pub fn extinction_time(&self) -> Option<f64> {
        self.records
            .iter()
            .find(|record| record.infected == 0)
            .map(|record| record.time)
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a StateRecord;
    type IntoIter = std::slice::Iter<'a, StateRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(time: f64, s: u64, i: u64, r: u64) -> StateRecord {
        StateRecord {
            time,
            susceptible: s,
            infected: i,
            recovered: r,
            new_infections: 0,
            new_recoveries: 0,
        }
    }

    fn sample_series() -> TimeSeries {
        let mut series = TimeSeries::with_capacity(0.5, 5);
        series.push(record(0.0, 8, 2, 0));
        series.push(record(0.5, 6, 4, 0));
        series.push(record(1.0, 5, 4, 1));
        series.push(record(1.5, 5, 1, 4));
        series.push(record(2.0, 5, 0, 5));
        series
    }

    #[test]
    fn lookup_by_time_rounds_to_grid() {
        let series = sample_series();
        assert_eq!(series.dt(), 0.5);
        assert_eq!(series.at_time(series.dt() * 3.0).unwrap().time, 1.5);
        assert_eq!(series.at_time(1.0).unwrap().time, 1.0);
        assert_eq!(series.at_time(1.1).unwrap().time, 1.0);
        assert_eq!(series.at_time(1.4).unwrap().time, 1.5);
        assert!(series.at_time(2.5).is_none());
        assert!(series.at_time(-1.0).is_none());
        assert!(series.at_time(f64::NAN).is_none());
    }

    #[test]
    fn peak_is_earliest_maximum() {
        let series = sample_series();
        let peak = series.peak().unwrap();
        assert_eq!(peak.infected, 4);
        assert_eq!(peak.time, 0.5);
    }

    #[test]
    fn outbreak_summaries() {
        let series = sample_series();
        assert_eq!(series.cumulative_incidence(), 3);
        assert_eq!(series.extinction_time(), Some(2.0));
        assert_eq!(series.len(), 5);
        assert!(series.iter().all(|r| r.population() == 10));
    }

    #[test]
    fn empty_series() {
        let series = TimeSeries::with_capacity(1.0, 0);
        assert!(series.is_empty());
        assert!(series.peak().is_none());
        assert_eq!(series.cumulative_incidence(), 0);
        assert_eq!(series.extinction_time(), None);
    }
}
