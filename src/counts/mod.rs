//! Daily ridership aggregation and anomaly correction.
//!
//! For each day, raw readings are grouped per turnstile ([`grouping`]), the
//! readings nearest to midnight, 6 AM, noon, 6 PM and the next midnight are
//! picked ([`resolver`]), and the plausible deltas between them are summed
//! per station ([`aggregate`]). [`runner`] drives this over a date range
//! and [`fixer`] later recomputes stored rows that fall out of range.

pub mod aggregate;
pub mod fixer;
pub mod grouping;
pub mod resolver;
pub mod runner;

use crate::model::StationId;
use chrono::NaiveDate;

/// Primary key of a daily count row.
pub type CountKey = (StationId, NaiveDate);
