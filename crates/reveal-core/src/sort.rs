//! Secondary sorts applied by callers after selection.

use std::cmp::Reverse;

use time::macros::format_description;
use time::Date;

/// Parse the `YYYY-MM-DD` prefix of an ISO date or timestamp.
#[must_use]
pub fn parse_iso_date(raw: &str) -> Option<Date> {
    let day = raw.trim().get(..10)?;
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}

/// Newest first. Items with a missing or unparseable date go last, and ties
/// keep their incoming order.
pub fn sort_by_date_desc<T>(items: &mut [T], date_of: impl Fn(&T) -> Option<&str>) {
    items.sort_by_cached_key(|item| {
        let date = date_of(item).and_then(parse_iso_date);
        (date.is_none(), Reverse(date))
    });
}
