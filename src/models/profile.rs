//! Logistics profile of a participant: diet, travel, lodging and preferences.
//!
//! Each section is optional and merged one level deep on update and import:
//! fields present in the incoming section replace the stored ones, the rest
//! are kept.

use serde::{Deserialize, Serialize};

/// One level deep field overlay.
pub trait Overlay: Sized {
    /// Fields set in `incoming` win, unset ones keep `self`'s value.
    fn overlay(self, incoming: Self) -> Self;
}

/// Merge an optional incoming section over an optional stored one.
pub fn merge_section<T: Overlay>(existing: Option<T>, incoming: Option<T>) -> Option<T> {
    match (existing, incoming) {
        (Some(existing), Some(incoming)) => Some(existing.overlay(incoming)),
        (existing, None) => existing,
        (None, incoming) => incoming,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diet {
    pub allergens: Option<Vec<String>>,
    pub preferences: Option<Vec<String>>,
}

impl Diet {
    pub fn has_allergens(&self) -> bool {
        self.allergens.as_ref().is_some_and(|a| !a.is_empty())
    }
}

impl Overlay for Diet {
    fn overlay(self, incoming: Self) -> Self {
        Self {
            allergens: incoming.allergens.or(self.allergens),
            preferences: incoming.preferences.or(self.preferences),
        }
    }
}

/// One leg of a participant's travel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TravelLeg {
    /// Train, flight, car...
    pub mode: String,
    pub number: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transport {
    pub arrival: Option<TravelLeg>,
    pub departure: Option<TravelLeg>,
}

impl Overlay for Transport {
    // Legs are replaced whole.
    fn overlay(self, incoming: Self) -> Self {
        Self {
            arrival: incoming.arrival.or(self.arrival),
            departure: incoming.departure.or(self.departure),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Accommodation {
    pub hotel: Option<String>,
    pub checkin: Option<String>,
    pub checkout: Option<String>,
    pub room: Option<String>,
    pub comments: Option<String>,
}

impl Overlay for Accommodation {
    fn overlay(self, incoming: Self) -> Self {
        Self {
            hotel: incoming.hotel.or(self.hotel),
            checkin: incoming.checkin.or(self.checkin),
            checkout: incoming.checkout.or(self.checkout),
            room: incoming.room.or(self.room),
            comments: incoming.comments.or(self.comments),
        }
    }
}

/// Wishes collected at registration, by session code.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    pub workshops: Option<Vec<String>>,
    pub team_building: Option<Vec<String>>,
    pub comments: Option<String>,
}

impl Overlay for Preferences {
    fn overlay(self, incoming: Self) -> Self {
        Self {
            workshops: incoming.workshops.or(self.workshops),
            team_building: incoming.team_building.or(self.team_building),
            comments: incoming.comments.or(self.comments),
        }
    }
}

/// Profile information a participant has not provided yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingInfo {
    /// No allergens declared.
    Allergens,
    /// No arrival leg.
    Transport,
}
