//! Back-end API surface. Each domain has a trait with two implementations:
//! [`HttpBackend`] talks to the REST API, [`MockBackend`] answers from
//! in-memory fixtures.

mod fixtures;
mod http;
mod mock;

use std::sync::Arc;

use async_trait::async_trait;

pub use fixtures::MockUser;
pub use http::HttpBackend;
pub use mock::MockBackend;

use crate::config::{AppConfig, Domain};
use crate::error::Result;
use crate::model::{
    Area, AreaDraft, AuthResponse, Category, Event, EventDraft, EventStatistics, EventStatus,
    LoginCredentials, Registration, ReservationConfirmation, ReservationRequest, Structure,
    StructureCreation, StructureDashboardStats, StructureDraft, StructureType, Ticket,
};
use crate::search::{EventSearchParams, Page, StructureSearchParams};
use crate::storage::SessionStore;

pub(crate) const LOGIN_API_URL: &str = "auth/login";
pub(crate) const REGISTER_API_URL: &str = "auth/register";
pub(crate) const REFRESH_API_URL: &str = "auth/refresh";
pub(crate) const PASSWORD_RESET_API_URL: &str = "auth/password-reset-request";
pub(crate) const EVENTS_API_URL: &str = "events";
pub(crate) const EVENT_API_URL: &str = "events/{id}";
pub(crate) const EVENT_STATUS_API_URL: &str = "events/{id}/status";
pub(crate) const CATEGORIES_API_URL: &str = "event-categories";
pub(crate) const STRUCTURES_API_URL: &str = "structures";
pub(crate) const STRUCTURE_TYPES_API_URL: &str = "structures/types";
pub(crate) const STRUCTURE_API_URL: &str = "structures/{id}";
pub(crate) const AREAS_API_URL: &str = "structures/{id}/areas";
pub(crate) const AREA_API_URL: &str = "structures/{id}/areas/{areaId}";
pub(crate) const DASHBOARD_API_URL: &str = "statistics/structure/{id}/dashboard";
pub(crate) const EVENT_STATS_API_URL: &str = "statistics/events/{id}";
pub(crate) const RESERVATIONS_API_URL: &str = "ticketing/reservations";
pub(crate) const MY_TICKETS_API_URL: &str = "ticketing/tickets/my";
pub(crate) const TICKET_API_URL: &str = "ticketing/tickets/{id}";
pub(crate) const TICKET_VALIDATE_API_URL: &str = "ticketing/tickets/{id}/validate";

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse>;
    async fn register(&self, registration: &Registration) -> Result<AuthResponse>;
    /// Exchanges a refresh token (or the current token) for a fresh one.
    async fn refresh(&self, token: &str) -> Result<AuthResponse>;
    async fn request_password_reset(&self, email: &str) -> Result<()>;
}

#[async_trait]
pub trait EventApi: Send + Sync {
    async fn search_events(&self, params: &EventSearchParams) -> Result<Page<Event>>;
    async fn get_event(&self, id: u64) -> Result<Event>;
    async fn create_event(&self, draft: &EventDraft) -> Result<Event>;
    async fn update_event(&self, id: u64, draft: &EventDraft) -> Result<Event>;
    async fn delete_event(&self, id: u64) -> Result<()>;
    async fn update_event_status(&self, id: u64, status: EventStatus) -> Result<Event>;
    async fn categories(&self) -> Result<Vec<Category>>;
}

#[async_trait]
pub trait StructureApi: Send + Sync {
    async fn search_structures(&self, params: &StructureSearchParams) -> Result<Page<Structure>>;
    async fn get_structure(&self, id: u64) -> Result<Structure>;
    async fn create_structure(&self, draft: &StructureDraft) -> Result<StructureCreation>;
    async fn update_structure(&self, id: u64, draft: &StructureDraft) -> Result<Structure>;
    async fn delete_structure(&self, id: u64) -> Result<()>;
    async fn structure_types(&self) -> Result<Vec<StructureType>>;
    async fn areas(&self, structure_id: u64) -> Result<Vec<Area>>;
    async fn create_area(&self, structure_id: u64, draft: &AreaDraft) -> Result<Area>;
    async fn update_area(&self, structure_id: u64, area_id: u64, draft: &AreaDraft) -> Result<Area>;
    async fn delete_area(&self, structure_id: u64, area_id: u64) -> Result<()>;
}

#[async_trait]
pub trait StatsApi: Send + Sync {
    async fn structure_dashboard(&self, structure_id: u64) -> Result<StructureDashboardStats>;
    async fn event_statistics(&self, event_id: u64) -> Result<EventStatistics>;
}

#[async_trait]
pub trait TicketApi: Send + Sync {
    async fn create_reservation(&self, request: &ReservationRequest) -> Result<ReservationConfirmation>;
    /// Tickets booked by the logged-in user.
    async fn my_tickets(&self) -> Result<Vec<Ticket>>;
    async fn ticket(&self, id: &str) -> Result<Ticket>;
    /// Marks a ticket as used at the entrance.
    async fn validate_ticket(&self, id: &str) -> Result<Ticket>;
}

/// One handle per domain, each picked from the mock or HTTP back end
/// according to the configuration.
#[derive(Clone)]
pub struct Backends {
    pub auth: Arc<dyn AuthApi>,
    pub events: Arc<dyn EventApi>,
    pub structures: Arc<dyn StructureApi>,
    pub stats: Arc<dyn StatsApi>,
    pub tickets: Arc<dyn TicketApi>,
}

impl Backends {
    pub fn from_config(config: &AppConfig, store: Arc<SessionStore>) -> Result<Self> {
        let http = Arc::new(HttpBackend::new(&config.api_url, store.clone(), config.pages)?);
        let mock = Arc::new(
            MockBackend::with_fixtures(config.mock.delay, config.pages).with_session(store),
        );

        let auth: Arc<dyn AuthApi> = if config.is_mocked(Domain::Auth) {
            mock.clone()
        } else {
            http.clone()
        };
        let events: Arc<dyn EventApi> = if config.is_mocked(Domain::Events) {
            mock.clone()
        } else {
            http.clone()
        };
        let structures: Arc<dyn StructureApi> = if config.is_mocked(Domain::Structures) {
            mock.clone()
        } else {
            http.clone()
        };
        let stats: Arc<dyn StatsApi> = if config.is_mocked(Domain::Statistics) {
            mock.clone()
        } else {
            http.clone()
        };
        let tickets: Arc<dyn TicketApi> = if config.is_mocked(Domain::Ticketing) {
            mock
        } else {
            http
        };

        Ok(Self {
            auth,
            events,
            structures,
            stats,
            tickets,
        })
    }

    /// Every domain served by `backend`.
    pub fn all<B>(backend: Arc<B>) -> Self
    where
        B: AuthApi + EventApi + StructureApi + StatsApi + TicketApi + 'static,
    {
        Self {
            auth: backend.clone(),
            events: backend.clone(),
            structures: backend.clone(),
            stats: backend.clone(),
            tickets: backend,
        }
    }
}
