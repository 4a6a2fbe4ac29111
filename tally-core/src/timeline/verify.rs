use chrono::Days;
use tally_types::{Attribution, DateRange, TallyError, TrackingLinkId};

/// Check that a set of windows partitions the whole timeline.
///
/// Requirements: no inverted window, exactly one window open to the past,
/// exactly one open to the future, and each window starting the day after
/// its predecessor ends. An empty set is trivially consistent.
///
/// # Errors
/// Returns a description of the first violation found.
pub fn verify_ranges(ranges: &[DateRange]) -> Result<(), String> {
    if ranges.is_empty() {
        return Ok(());
    }
    if let Some(bad) = ranges.iter().find(|r| r.is_inverted()) {
        return Err(format!("inverted window {bad}"));
    }
    let open_past = ranges.iter().filter(|r| r.start.is_none()).count();
    let open_future = ranges.iter().filter(|r| r.end.is_none()).count();
    if open_past != 1 || open_future != 1 {
        return Err(format!(
            "expected one window open to each side, found {open_past} past / {open_future} future"
        ));
    }

    let mut sorted: Vec<&DateRange> = ranges.iter().collect();
    sorted.sort_by_key(|r| r.start);
    for pair in sorted.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let (Some(prev_end), Some(next_start)) = (prev.end, next.start) else {
            return Err(format!("window {prev} is followed by {next}"));
        };
        // A window ending on the last representable day cannot be followed.
        match prev_end.checked_add_days(Days::new(1)) {
            Some(expected) if expected == next_start => {}
            Some(expected) if next_start > expected => {
                return Err(format!("gap between {prev} and {next}"));
            }
            _ => return Err(format!("windows {prev} and {next} overlap")),
        }
    }
    Ok(())
}

/// Verify the stored attribution records of one link.
///
/// # Errors
/// Returns `PartitionInconsistency` for the link when [`verify_ranges`] fails
/// or a record belongs to a different link.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "tally::core::verify_partition",
        level = "trace",
        skip(records),
        fields(records = records.len()),
    )
)]
pub fn verify_partition(
    link: &TrackingLinkId,
    records: &[Attribution],
) -> Result<(), TallyError> {
    if let Some(foreign) = records.iter().find(|r| &r.tracking_link_id != link) {
        return Err(TallyError::partition_inconsistency(
            link,
            format!("record for event {} belongs to {}", foreign.event_id, foreign.tracking_link_id),
        ));
    }
    let ranges: Vec<DateRange> = records.iter().map(|r| r.range).collect();
    verify_ranges(&ranges).map_err(|detail| TallyError::partition_inconsistency(link, detail))
}
