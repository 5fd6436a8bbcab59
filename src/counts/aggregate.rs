use crate::counts::grouping::{StationTurnstiles, TurnstileIndex, TurnstileReadings};
use crate::counts::resolver::resolve_boundaries;
use crate::model::{DailyCount, DailyCountRow, Period, PeriodTotals, StationId};
use crate::window::DayWindow;
use tracing::trace;

/// Exclusive upper bound for a plausible per-turnstile period delta, and the
/// threshold at which a stored station total is treated as anomalous.
pub const PLAUSIBLE_DELTA_LIMIT: i64 = 50_000;

/// A delta is accepted only if `0 < delta < PLAUSIBLE_DELTA_LIMIT`.
///
/// Negative deltas come from counter rollbacks; huge ones from resets and
/// overflow. A delta of exactly zero is also excluded.
pub fn is_plausible(delta: i64) -> bool {
    delta > 0 && delta < PLAUSIBLE_DELTA_LIMIT
}

/// Raw (unfiltered) entry and exit deltas of one turnstile, one per period.
///
/// `None` marks a difference that does not fit in an `i64`, which can never
/// be plausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnstileDeltas {
    pub entries: [Option<i64>; 4],
    pub exits: [Option<i64>; 4],
}

/// Computes the four period deltas of one turnstile for `window`.
///
/// Returns `None` if the turnstile has no readings.
pub fn turnstile_deltas(readings: &TurnstileReadings, window: &DayWindow) -> Option<TurnstileDeltas> {
    let timestamps: Vec<i64> = readings.keys().copied().collect();
    let resolved = resolve_boundaries(&timestamps, &window.boundaries())?;

    let mut deltas = TurnstileDeltas {
        entries: [None; 4],
        exits: [None; 4],
    };

    for period in Period::ALL {
        let i = period.index();
        let from = readings[&resolved[i]];
        let to = readings[&resolved[i + 1]];
        deltas.entries[i] = to.entries.checked_sub(from.entries);
        deltas.exits[i] = to.exits.checked_sub(from.exits);
    }

    Some(deltas)
}

/// Sums the plausible deltas of every turnstile of one station.
///
/// A station with no turnstiles in the window is [`DailyCount::NoData`],
/// which stays distinct from a measured zero.
pub fn aggregate_station(turnstiles: Option<&StationTurnstiles>, window: &DayWindow) -> DailyCount {
    let Some(turnstiles) = turnstiles.filter(|t| !t.is_empty()) else {
        return DailyCount::NoData;
    };

    let mut totals = PeriodTotals::default();

    for (turnstile_id, readings) in turnstiles {
        let Some(deltas) = turnstile_deltas(readings, window) else {
            continue;
        };

        for period in Period::ALL {
            let i = period.index();

            match deltas.entries[i] {
                Some(d) if is_plausible(d) => totals.entries[i] += d,
                Some(0) => {}
                d => trace!(turnstile = %turnstile_id, period = period.name(), delta = ?d, "Rejected entry delta"),
            }

            match deltas.exits[i] {
                Some(d) if is_plausible(d) => totals.exits[i] += d,
                Some(0) => {}
                d => trace!(turnstile = %turnstile_id, period = period.name(), delta = ?d, "Rejected exit delta"),
            }
        }
    }

    DailyCount::Measured(totals)
}

/// Aggregates every station in `stations` for one day.
pub fn aggregate_day<'a, I>(index: &TurnstileIndex, stations: I, window: &DayWindow) -> Vec<DailyCountRow>
where
    I: IntoIterator<Item = &'a StationId>,
{
    stations
        .into_iter()
        .map(|id| {
            let count = aggregate_station(index.station(*id), window);
            DailyCountRow::new(*id, window.date, &count)
        })
        .collect()
}
