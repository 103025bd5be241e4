use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::structure::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    PendingApproval,
    Cancelled,
    Completed,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::PendingApproval => "pending_approval",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "pending_approval" | "pending" => Ok(EventStatus::PendingApproval),
            "cancelled" => Ok(EventStatus::Cancelled),
            "completed" => Ok(EventStatus::Completed),
            other => Err(format!("unknown event status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatingType {
    Seated,
    Standing,
    #[default]
    Mixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

/// A sub-division of a venue area configured for one event, with its own
/// capacity and ticket price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingZone {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    pub area_id: u64,
    pub max_capacity: u32,
    #[serde(default)]
    pub ticket_price: Option<f64>,
    pub is_active: bool,
    #[serde(default)]
    pub seating_type: SeatingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seats_per_row: Option<u32>,
    #[serde(default)]
    pub tickets_sold: u32,
}

impl SeatingZone {
    /// The price buyers pay in this zone, if the zone is on sale with a
    /// positive price.
    pub fn sale_price(&self) -> Option<f64> {
        match self.ticket_price {
            Some(price) if self.is_active && price > 0.0 => Some(price),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: u64,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub full_description: String,
    #[serde(default, alias = "genre")]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub address: Address,
    pub structure_id: u64,
    #[serde(default)]
    pub area_ids: Vec<u64>,
    pub is_free_event: bool,
    #[serde(default)]
    pub default_seating_type: SeatingType,
    #[serde(default, alias = "audienceZones")]
    pub seating_zones: Vec<SeatingZone>,
    #[serde(default)]
    pub display_on_homepage: bool,
    #[serde(default)]
    pub is_featured_event: bool,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub main_photo_url: Option<String>,
    #[serde(default)]
    pub event_photo_urls: Vec<String>,
    pub status: EventStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Lowest price over zones on sale; 0 when nothing is on sale.
    pub fn min_price(&self) -> f64 {
        self.seating_zones
            .iter()
            .filter_map(SeatingZone::sale_price)
            .min_by(f64::total_cmp)
            .unwrap_or(0.0)
    }

    pub fn total_capacity(&self) -> u32 {
        self.seating_zones
            .iter()
            .filter(|z| z.is_active)
            .map(|z| z.max_capacity)
            .sum()
    }

    pub fn tickets_sold(&self) -> u32 {
        self.seating_zones.iter().map(|z| z.tickets_sold).sum()
    }

    pub fn has_photos(&self) -> bool {
        self.main_photo_url.as_deref().is_some_and(|u| !u.is_empty())
            || !self.event_photo_urls.is_empty()
    }
}

/// Payload for creating or replacing an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub name: String,
    pub category_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    pub full_description: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub address: Address,
    pub structure_id: u64,
    #[serde(default)]
    pub area_ids: Vec<u64>,
    pub is_free_event: bool,
    #[serde(default)]
    pub default_seating_type: SeatingType,
    #[serde(default)]
    pub seating_zones: Vec<SeatingZone>,
    #[serde(default)]
    pub display_on_homepage: bool,
    #[serde(default)]
    pub is_featured_event: bool,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_photo_url: Option<String>,
    #[serde(default)]
    pub event_photo_urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(price: Option<f64>, active: bool) -> SeatingZone {
        SeatingZone {
            id: None,
            name: "Fosse".into(),
            area_id: 1,
            max_capacity: 100,
            ticket_price: price,
            is_active: active,
            seating_type: SeatingType::Standing,
            row_count: None,
            seats_per_row: None,
            tickets_sold: 0,
        }
    }

    #[test]
    fn sale_price_skips_inactive_and_free_zones() {
        assert_eq!(zone(Some(12.5), true).sale_price(), Some(12.5));
        assert_eq!(zone(Some(12.5), false).sale_price(), None);
        assert_eq!(zone(Some(0.0), true).sale_price(), None);
        assert_eq!(zone(None, true).sale_price(), None);
    }

    #[test]
    fn status_parses_wire_names() {
        assert_eq!("pending_approval".parse(), Ok(EventStatus::PendingApproval));
        assert_eq!("Published".parse(), Ok(EventStatus::Published));
        assert!("archived".parse::<EventStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&EventStatus::PendingApproval).unwrap(),
            "\"pending_approval\""
        );
    }
}
