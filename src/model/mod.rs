//! Wire and domain records shared by the API back ends and the services.

mod auth;
mod event;
mod stats;
mod structure;
mod ticket;

pub use auth::{AuthResponse, JwtPayload, LoginCredentials, Registration, UserRole};
pub use event::{Category, Event, EventDraft, EventStatus, SeatingType, SeatingZone};
pub use stats::{ChartData, ChartDataset, EventStatistics, StructureDashboardStats};
pub use structure::{
    Address, Area, AreaDraft, Structure, StructureCreation, StructureDraft, StructureType,
};
pub use ticket::{
    AudienceZoneSnapshot, EventSnapshot, MAX_PARTICIPANTS, ParticipantInfo, ReservationConfirmation,
    ReservationRequest, Ticket, TicketStatus,
};
