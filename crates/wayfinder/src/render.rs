//! Plain-text rendering of view envelopes.
//!
//! A failed envelope renders as its message in place of the content. The
//! `write_*` functions render into any [`fmt::Write`]; the bare-named ones
//! collect into a `String`.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::view::{
    DashboardEnvelope, DeviceEnvelope, LocationsEnvelope, MapEnvelope, ViewEnvelope,
};

fn format_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms).map_or_else(
        || ms.to_string(),
        |dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

fn format_active(ms: i64) -> String {
    let secs = ms / 1_000;
    let (h, m, s) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h{m:02}m")
    } else if m > 0 {
        format!("{m}m{s:02}s")
    } else {
        format!("{s}s")
    }
}

fn collect(write: impl FnOnce(&mut String) -> fmt::Result) -> String {
    let mut out = String::new();
    // Writing into a String never fails.
    let _ = write(&mut out);
    out
}

/// Write the envelope's data, or its error followed by `None`.
fn data_or_error<'a, T>(
    out: &mut impl fmt::Write,
    envelope: &'a ViewEnvelope<T>,
) -> Result<Option<&'a T>, fmt::Error> {
    match &envelope.data {
        Some(data) => Ok(Some(data)),
        None => {
            let message = envelope.error.as_deref().unwrap_or("no data");
            writeln!(out, "Error: {message}")?;
            Ok(None)
        }
    }
}

/// Render a dashboard envelope.
#[must_use]
pub fn dashboard(envelope: &DashboardEnvelope) -> String {
    collect(|out| write_dashboard(out, envelope))
}

/// Render a dashboard envelope into `out`.
///
/// # Errors
///
/// Returns the writer's error.
pub fn write_dashboard(out: &mut impl fmt::Write, envelope: &DashboardEnvelope) -> fmt::Result {
    writeln!(out, "Dashboard: {}", envelope.family)?;
    writeln!(
        out,
        "Generated: {}",
        envelope.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(out)?;

    let Some(view) = data_or_error(out, envelope)? else {
        return Ok(());
    };

    writeln!(out, "[Devices seen in the last {} minutes]", view.window_minutes)?;
    if view.devices.is_empty() {
        writeln!(out, "  No devices reported in this window.")?;
    } else {
        writeln!(
            out,
            "  {:<20} {:<16} {:<24} {:>10} {:>8}",
            "DEVICE", "LOCATION", "LAST SEEN", "CONFIDENCE", "ACTIVE"
        )?;
        for device in &view.devices {
            writeln!(
                out,
                "  {:<20} {:<16} {:<24} {:>9}% {:>8}",
                device.device,
                device.last_location.as_deref().unwrap_or("-"),
                format_ms(device.last_seen),
                device.confidence,
                format_active(device.active_time_ms),
            )?;
        }
    }
    writeln!(out)?;

    writeln!(out, "[Efficacy]")?;
    let efficacy = &view.efficacy;
    if !efficacy.has_calibration_data() {
        return writeln!(out, "  No calibration data.");
    }
    writeln!(
        out,
        "  Overall:          {}% correct of {} samples",
        efficacy.percent_correct, efficacy.total_count
    )?;
    if let Some(last) = efficacy.last_calibration_time {
        writeln!(out, "  Last calibration: {}", format_ms(last))?;
    }
    for location in &efficacy.per_location {
        writeln!(
            out,
            "  {:<16} {:>3}% of {}",
            location.name, location.percent_correct, location.total_count
        )?;
    }
    Ok(())
}

/// Render a map envelope.
#[must_use]
pub fn map(envelope: &MapEnvelope) -> String {
    collect(|out| write_map(out, envelope))
}

/// Render a map envelope into `out`.
///
/// # Errors
///
/// Returns the writer's error.
pub fn write_map(out: &mut impl fmt::Write, envelope: &MapEnvelope) -> fmt::Result {
    writeln!(out, "Map: {}", envelope.family)?;
    writeln!(out)?;

    let Some(view) = data_or_error(out, envelope)? else {
        return Ok(());
    };

    let projection = &view.projection;
    match projection.center {
        Some(center) => writeln!(
            out,
            "Center: {:.5},{:.5} ({})",
            center.latitude, center.longitude, projection.policy
        )?,
        None => writeln!(out, "Center: none")?,
    }
    for marker in &projection.markers {
        writeln!(
            out,
            "  {:<16} {:.10},{:.10}  [{}]",
            marker.label, marker.latitude, marker.longitude, marker.location_hash
        )?;
    }
    if projection.unresolved > 0 {
        writeln!(
            out,
            "  ({} of {} locations have no GPS coordinate)",
            projection.unresolved, projection.total_locations
        )?;
    }
    Ok(())
}

/// Render a location list envelope.
#[must_use]
pub fn locations(envelope: &LocationsEnvelope) -> String {
    collect(|out| write_locations(out, envelope))
}

/// Render a location list envelope into `out`.
///
/// # Errors
///
/// Returns the writer's error.
pub fn write_locations(out: &mut impl fmt::Write, envelope: &LocationsEnvelope) -> fmt::Result {
    writeln!(out, "Locations: {}", envelope.family)?;
    writeln!(out)?;

    let Some(view) = data_or_error(out, envelope)? else {
        return Ok(());
    };

    if view.locations.is_empty() {
        return writeln!(out, "  No locations.");
    }
    for location in &view.locations {
        match location.gps {
            Some(gps) => writeln!(
                out,
                "  {:<16} {:.10},{:.10}  [{}]",
                location.label, gps.latitude, gps.longitude, location.location_hash
            )?,
            None => writeln!(
                out,
                "  {:<16} {:<27}  [{}]",
                location.label, "unresolved", location.location_hash
            )?,
        }
    }
    Ok(())
}

/// Render a device envelope.
#[must_use]
pub fn device(envelope: &DeviceEnvelope) -> String {
    collect(|out| write_device(out, envelope))
}

/// Render a device envelope into `out`.
///
/// # Errors
///
/// Returns the writer's error.
pub fn write_device(out: &mut impl fmt::Write, envelope: &DeviceEnvelope) -> fmt::Result {
    writeln!(out, "Device in {}", envelope.family)?;
    writeln!(out)?;

    let Some(view) = data_or_error(out, envelope)? else {
        return Ok(());
    };

    let status = &view.status;
    writeln!(out, "  Device:      {}", status.device)?;
    writeln!(
        out,
        "  Location:    {}",
        status.last_location.as_deref().unwrap_or("-")
    )?;
    writeln!(out, "  Last seen:   {}", format_ms(status.last_seen))?;
    writeln!(out, "  Confidence:  {}%", status.confidence)?;
    writeln!(out, "  Active:      {}", format_active(status.active_time_ms))?;
    writeln!(out)?;

    writeln!(out, "[Sightings in the last {} minutes]", view.window_minutes)?;
    for sighting in &view.sightings {
        writeln!(
            out,
            "  {:<24} {:<16} {:>3}%",
            format_ms(sighting.timestamp),
            sighting.location.as_deref().unwrap_or("-"),
            sighting.confidence
        )?;
    }
    Ok(())
}
