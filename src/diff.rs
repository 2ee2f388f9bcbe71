use crate::tracking::TrackingRecord;

/// Whether `current` is a new observation compared to the last one seen.
///
/// Compares every field of the record, not only the ones that end up in
/// the notification text. Any difference counts, so a change to the
/// response header alone still triggers a notification.
pub fn has_changed(previous: Option<&TrackingRecord>, current: &TrackingRecord) -> bool {
    previous != Some(current)
}

/// Names of the fields that differ between two records, for logging.
pub fn changed_fields(old: &TrackingRecord, new: &TrackingRecord) -> Vec<&'static str> {
    let (old_van, new_van) = (&old.shipment.van, &new.shipment.van);

    [
        ("header.response", old.header != new.header),
        ("orderNumbers", old.order_numbers != new.order_numbers),
        (
            "shipment.actualLoadDate",
            old.shipment.actual_load_date != new.shipment.actual_load_date,
        ),
        (
            "van.lastReportedCity",
            old_van.last_reported_city != new_van.last_reported_city,
        ),
        (
            "van.lastReportedState",
            old_van.last_reported_state != new_van.last_reported_state,
        ),
        (
            "van.lastReportedDateTime",
            old_van.last_reported_date_time != new_van.last_reported_date_time,
        ),
        ("van.trackingCity", old_van.tracking_city != new_van.tracking_city),
        ("van.trackingState", old_van.tracking_state != new_van.tracking_state),
        ("van.trackingDate", old_van.tracking_date != new_van.tracking_date),
        ("van.trackingTime", old_van.tracking_time != new_van.tracking_time),
        (
            "van.trackingDirection",
            old_van.tracking_direction != new_van.tracking_direction,
        ),
        ("van.trackingMiles", old_van.tracking_miles != new_van.tracking_miles),
    ]
    .into_iter()
    .filter_map(|(name, differs)| differs.then_some(name))
    .collect()
}
