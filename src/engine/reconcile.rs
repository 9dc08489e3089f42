use std::collections::HashMap;

use crate::models::driver::{DriverRecord, DriverView, RuntimeStatus};
use crate::models::presence::{BookedSet, PresenceSnapshot};

/// Annotates a roster with runtime status and last known position.
///
/// `None` for either source means that fetch failed and its pass is skipped.
/// Presence is applied to every driver before the booked overlay, so a booked
/// driver is reported as booked whatever its presence flag says.
pub fn reconcile(
    roster: &[DriverRecord],
    presence: Option<&PresenceSnapshot>,
    booked: Option<&BookedSet>,
    profile_images: &HashMap<String, String>,
) -> Vec<DriverView> {
    let mut drivers: Vec<DriverView> = roster
        .iter()
        .cloned()
        .map(|record| {
            let mut view = DriverView::new(record);
            view.profile_image_url = profile_images.get(view.id()).cloned();
            view
        })
        .collect();

    if let Some(presence) = presence {
        for driver in drivers.iter_mut() {
            let Some(entry) = presence.get(driver.id()) else {
                continue;
            };
            if entry.is_online {
                driver.runtime_status = RuntimeStatus::Online;
            }
            if let Some(position) = entry.position {
                driver.record.location = Some(position);
            }
        }
    }

    if let Some(booked) = booked {
        for driver in drivers.iter_mut() {
            if booked.contains(driver.id()) {
                driver.runtime_status = RuntimeStatus::Booked;
            }
        }
    }

    drivers
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RuntimeCounts {
    pub online: usize,
    pub offline: usize,
    pub booked: usize,
}

pub fn runtime_counts(drivers: &[DriverView]) -> RuntimeCounts {
    drivers
        .iter()
        .fold(RuntimeCounts::default(), |mut counts, driver| {
            match driver.runtime_status {
                RuntimeStatus::Online => counts.online += 1,
                RuntimeStatus::Offline => counts.offline += 1,
                RuntimeStatus::Booked => counts.booked += 1,
            }
            counts
        })
}
