use crate::model::{CounterReading, RawSample, StationId, TurnstileId};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Readings of one turnstile, ordered by unix timestamp.
pub type TurnstileReadings = BTreeMap<i64, CounterReading>;

/// Turnstiles of one station, ordered by turnstile id.
pub type StationTurnstiles = BTreeMap<TurnstileId, TurnstileReadings>;

/// Raw samples of one day window grouped by station, turnstile and timestamp.
///
/// Built fresh for every window and dropped once that day is written.
/// When two samples share the same station, turnstile and timestamp, the
/// one that comes later in the input wins.
#[derive(Debug, Default)]
pub struct TurnstileIndex {
    stations: BTreeMap<StationId, StationTurnstiles>,
}

impl TurnstileIndex {
    /// Groups `samples`, ignoring any whose timestamp falls outside `range`.
    pub fn build<I>(samples: I, range: &RangeInclusive<i64>) -> Self
    where
        I: IntoIterator<Item = RawSample>,
    {
        let mut stations: BTreeMap<StationId, StationTurnstiles> = BTreeMap::new();

        for sample in samples {
            if !range.contains(&sample.unix_timestamp) {
                continue;
            }

            stations
                .entry(sample.station_id)
                .or_default()
                .entry(sample.turnstile_id)
                .or_default()
                .insert(
                    sample.unix_timestamp,
                    CounterReading {
                        entries: sample.entries,
                        exits: sample.exits,
                    },
                );
        }

        Self { stations }
    }

    /// Turnstiles of `station_id`, or `None` if it had no samples in the window.
    pub fn station(&self, station_id: StationId) -> Option<&StationTurnstiles> {
        self.stations.get(&station_id)
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn turnstile_count(&self) -> usize {
        self.stations.values().map(BTreeMap::len).sum()
    }
}
