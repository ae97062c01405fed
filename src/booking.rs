//! Service Booking
//!
//! Slot grid for one vendor and date. Slots already present in the booked
//! data, or already past, are disabled and cannot be selected.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::dto::CreateBookingRequest;
use crate::api::{ApiError, Rejection};
use crate::models::{Address, BookedSlot, Vendor};
use crate::storage::{KeyValueStore, StorageKey, StorageResult, TypedStore};

/// Selected-vendor entries live this long
pub const SELECTED_VENDOR_TTL_HOURS: i64 = 24;

/// Hourly, 09:00 through 17:00
pub fn default_slot_times() -> Vec<String> {
    (9..=17).map(|h| format!("{:02}:00", h)).collect()
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("Invalid slot time: {0}")]
    InvalidTime(String),

    #[error("Slot {0} is not offered")]
    UnknownSlot(String),

    #[error("Slot {0} is already booked")]
    Booked(String),

    #[error("Slot {0} is in the past")]
    Past(String),

    #[error("No slot selected")]
    NoSelection,

    #[error("Sign in to book")]
    NotSignedIn,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Available,
    Booked,
    Past,
}

impl SlotState {
    pub fn is_selectable(self) -> bool {
        self == SlotState::Available
    }

    pub fn label(self) -> &'static str {
        match self {
            SlotState::Available => "available",
            SlotState::Booked => "booked",
            SlotState::Past => "past",
        }
    }
}

fn parse_time(time: &str) -> Result<NaiveTime, BookingError> {
    NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .map_err(|_| BookingError::InvalidTime(time.to_string()))
}

/// Time slots for one vendor on one date
#[derive(Debug, Clone)]
pub struct SlotGrid {
    date: NaiveDate,
    slots: Vec<String>,
    booked: HashSet<String>,
    now: NaiveDateTime,
    selected: Option<String>,
}

impl SlotGrid {
    /// Build a grid; `booked` may carry entries for other dates, which are ignored
    pub fn new(
        date: NaiveDate,
        slot_times: &[String],
        booked: &[BookedSlot],
        now: NaiveDateTime,
    ) -> Result<Self, BookingError> {
        let mut slots = Vec::with_capacity(slot_times.len());
        for time in slot_times {
            let parsed = parse_time(time)?;
            slots.push(parsed.format("%H:%M").to_string());
        }

        let booked = booked
            .iter()
            .filter(|slot| slot.date == date)
            .filter_map(|slot| parse_time(&slot.time).ok())
            .map(|t| t.format("%H:%M").to_string())
            .collect();

        Ok(Self {
            date,
            slots,
            booked,
            now,
            selected: None,
        })
    }

    /// Grid relative to the local clock
    pub fn with_local_clock(
        date: NaiveDate,
        slot_times: &[String],
        booked: &[BookedSlot],
    ) -> Result<Self, BookingError> {
        Self::new(date, slot_times, booked, Local::now().naive_local())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn slot_state(&self, time: &str) -> SlotState {
        if self.booked.contains(time) {
            return SlotState::Booked;
        }
        match parse_time(time) {
            Ok(t) if self.date.and_time(t) <= self.now => SlotState::Past,
            Ok(_) => SlotState::Available,
            Err(_) => SlotState::Past,
        }
    }

    /// Every slot with its state, in display order
    pub fn slots(&self) -> Vec<(String, SlotState)> {
        self.slots
            .iter()
            .map(|time| (time.clone(), self.slot_state(time)))
            .collect()
    }

    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.slots
            .iter()
            .map(String::as_str)
            .filter(|t| self.slot_state(t).is_selectable())
    }

    pub fn select(&mut self, time: &str) -> Result<(), BookingError> {
        let time = parse_time(time)?.format("%H:%M").to_string();
        if !self.slots.contains(&time) {
            return Err(BookingError::UnknownSlot(time));
        }
        match self.slot_state(&time) {
            SlotState::Available => {
                self.selected = Some(time);
                Ok(())
            }
            SlotState::Booked => Err(BookingError::Booked(time)),
            SlotState::Past => Err(BookingError::Past(time)),
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Record a slot as taken; clears the selection if it was that slot
    pub fn mark_booked(&mut self, time: &str) {
        if self.selected.as_deref() == Some(time) {
            self.selected = None;
        }
        self.booked.insert(time.to_string());
    }

    /// Feed back a failed booking attempt
    ///
    /// A "slot already booked" rejection disables the selected slot.
    pub fn apply_failure(&mut self, error: &ApiError) {
        if error.rejection() == Some(&Rejection::SlotAlreadyBooked) {
            if let Some(time) = self.selected.clone() {
                tracing::info!(date = %self.date, time = %time, "Slot taken by someone else");
                self.mark_booked(&time);
            }
        }
    }
}

/// Everything needed to request a booking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingDraft {
    pub vendor_id: String,
    pub service_id: Option<String>,
    pub address: Option<Address>,
    pub notes: Option<String>,
}

impl BookingDraft {
    pub fn for_vendor(vendor_id: impl Into<String>) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            ..Default::default()
        }
    }

    pub fn to_request(
        &self,
        user_id: &str,
        grid: &SlotGrid,
    ) -> Result<CreateBookingRequest, BookingError> {
        if user_id.trim().is_empty() {
            return Err(BookingError::NotSignedIn);
        }
        let time = grid.selected().ok_or(BookingError::NoSelection)?;

        Ok(CreateBookingRequest {
            vendor_id: self.vendor_id.clone(),
            service_id: self.service_id.clone(),
            user_id: user_id.to_string(),
            date: grid.date(),
            time: time.to_string(),
            address: self.address.clone(),
            notes: self
                .notes
                .as_ref()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }
}

/// The vendor picked at the start of the booking flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedVendor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: String,
}

impl From<&Vendor> for SelectedVendor {
    fn from(vendor: &Vendor) -> Self {
        Self {
            id: vendor.id.clone(),
            name: vendor.name.clone(),
            category: vendor.category.clone(),
        }
    }
}

pub fn remember_vendor_at<S: KeyValueStore>(
    store: &TypedStore<S>,
    vendor: &SelectedVendor,
    now: DateTime<chrono::Utc>,
) -> StorageResult<()> {
    store.put_at(
        &StorageKey::SelectedVendor,
        vendor,
        Some(Duration::hours(SELECTED_VENDOR_TTL_HOURS)),
        now,
    )
}

pub fn remember_vendor<S: KeyValueStore>(
    store: &TypedStore<S>,
    vendor: &SelectedVendor,
) -> StorageResult<()> {
    remember_vendor_at(store, vendor, chrono::Utc::now())
}

pub fn selected_vendor_at<S: KeyValueStore>(
    store: &TypedStore<S>,
    now: DateTime<chrono::Utc>,
) -> StorageResult<Option<SelectedVendor>> {
    store.get_at(&StorageKey::SelectedVendor, now)
}

pub fn selected_vendor<S: KeyValueStore>(
    store: &TypedStore<S>,
) -> StorageResult<Option<SelectedVendor>> {
    selected_vendor_at(store, chrono::Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::Utc;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 4).unwrap()
    }

    fn morning() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 3)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn booked(time: &str) -> BookedSlot {
        BookedSlot {
            date: day(),
            time: time.to_string(),
        }
    }

    #[test]
    fn test_default_slots() {
        let slots = default_slot_times();
        assert_eq!(slots.first().map(String::as_str), Some("09:00"));
        assert_eq!(slots.last().map(String::as_str), Some("17:00"));
        assert_eq!(slots.len(), 9);
    }

    #[test]
    fn test_booked_slot_is_disabled_and_unselectable() {
        let mut grid =
            SlotGrid::new(day(), &default_slot_times(), &[booked("11:00")], morning()).unwrap();

        assert_eq!(grid.slot_state("11:00"), SlotState::Booked);
        assert_eq!(grid.slot_state("12:00"), SlotState::Available);
        assert_eq!(
            grid.select("11:00"),
            Err(BookingError::Booked("11:00".to_string()))
        );
        assert!(grid.selected().is_none());
        assert!(!grid.available().any(|t| t == "11:00"));
    }

    #[test]
    fn test_booked_on_other_date_is_ignored() {
        let other = BookedSlot {
            date: day().succ_opt().unwrap(),
            time: "10:00".to_string(),
        };
        let grid = SlotGrid::new(day(), &default_slot_times(), &[other], morning()).unwrap();
        assert_eq!(grid.slot_state("10:00"), SlotState::Available);
    }

    #[test]
    fn test_past_slots_today() {
        let now = day().and_hms_opt(13, 30, 0).unwrap();
        let mut grid = SlotGrid::new(day(), &default_slot_times(), &[], now).unwrap();

        assert_eq!(grid.slot_state("13:00"), SlotState::Past);
        assert_eq!(grid.slot_state("14:00"), SlotState::Available);
        assert!(matches!(grid.select("09:00"), Err(BookingError::Past(_))));
        assert_eq!(grid.available().count(), 4);
    }

    #[test]
    fn test_rejection_marks_slot_booked() {
        let mut grid = SlotGrid::new(day(), &default_slot_times(), &[], morning()).unwrap();
        grid.select("10:00").unwrap();

        grid.apply_failure(&ApiError::Rejected(Rejection::SlotAlreadyBooked));

        assert_eq!(grid.slot_state("10:00"), SlotState::Booked);
        assert!(grid.selected().is_none());
    }

    #[test]
    fn test_only_slot_taken_rejection_changes_grid() {
        let mut grid = SlotGrid::new(day(), &default_slot_times(), &[], morning()).unwrap();
        grid.select("11:00").unwrap();

        grid.apply_failure(&ApiError::Network("connection reset".to_string()));
        assert_eq!(grid.selected(), Some("11:00"));

        grid.apply_failure(&ApiError::Rejected(Rejection::SlotAlreadyBooked));
        let shown: Vec<(String, &str)> = grid
            .slots()
            .into_iter()
            .map(|(time, state)| (time, state.label()))
            .collect();
        assert!(shown.contains(&("11:00".to_string(), "booked")));
        assert!(shown.contains(&("10:00".to_string(), "available")));
    }

    #[test]
    fn test_draft_to_request() {
        let mut grid = SlotGrid::new(day(), &default_slot_times(), &[], morning()).unwrap();
        let draft = BookingDraft {
            service_id: Some("s1".to_string()),
            notes: Some("  ".to_string()),
            ..BookingDraft::for_vendor("v1")
        };

        assert_eq!(
            draft.to_request("u1", &grid),
            Err(BookingError::NoSelection)
        );

        grid.select("09:00").unwrap();
        let request = draft.to_request("u1", &grid).unwrap();
        assert_eq!(request.time, "09:00");
        assert_eq!(request.date, day());
        assert_eq!(request.service_id.as_deref(), Some("s1"));
        assert!(request.notes.is_none());

        assert_eq!(draft.to_request("", &grid), Err(BookingError::NotSignedIn));
    }

    #[test]
    fn test_selected_vendor_expires() {
        let store = TypedStore::new(MemoryStore::new());
        let vendor = SelectedVendor {
            id: "v1".to_string(),
            name: "Glow Salon".to_string(),
            category: "Salon".to_string(),
        };
        let now = Utc::now();

        remember_vendor_at(&store, &vendor, now).unwrap();
        assert_eq!(selected_vendor_at(&store, now).unwrap(), Some(vendor));
        assert!(selected_vendor_at(&store, now + Duration::hours(25))
            .unwrap()
            .is_none());
    }
}
