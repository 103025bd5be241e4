use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::SeatingType;
use super::structure::Address;

/// Most tickets one reservation may request.
pub const MAX_PARTICIPANTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Valid,
    Used,
    Cancelled,
    Expired,
}

impl TicketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Valid => "valid",
            TicketStatus::Used => "used",
            TicketStatus::Cancelled => "cancelled",
            TicketStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The person a ticket is issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Event details frozen at booking time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    pub event_id: u64,
    pub name: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub address: Address,
    #[serde(default)]
    pub main_photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudienceZoneSnapshot {
    pub audience_zone_id: u64,
    pub name: String,
    #[serde(default)]
    pub seating_type: SeatingType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    /// Encoded into the QR code scanned at the entrance.
    pub qr_code_value: String,
    pub status: TicketStatus,
    pub participant: ParticipantInfo,
    pub event_snapshot: EventSnapshot,
    pub audience_zone_snapshot: AudienceZoneSnapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

/// One to four tickets for a single zone of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub event_id: u64,
    pub audience_zone_id: u64,
    pub participants: Vec<ParticipantInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationConfirmation {
    pub reservation_id: String,
    pub event_id: u64,
    pub tickets: Vec<Ticket>,
    pub reservation_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_reads_wire_names() {
        let ticket: Ticket = serde_json::from_value(serde_json::json!({
            "id": "t-1",
            "qrCodeValue": "TICKET/t-1",
            "status": "used",
            "participant": {"firstName": "Lucie", "lastName": "Moreau", "email": "l@m.fr"},
            "eventSnapshot": {"eventId": 2, "name": "Roméo et Juliette", "startDate": "2027-02-14T20:00:00Z"},
            "audienceZoneSnapshot": {"audienceZoneId": 201, "name": "Orchestre", "seatingType": "seated"}
        }))
        .unwrap();
        assert_eq!(ticket.status, TicketStatus::Used);
        assert_eq!(ticket.audience_zone_snapshot.seating_type, SeatingType::Seated);
        assert_eq!(ticket.used_at, None);
    }
}
