use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use uuid::Uuid;

use super::fixtures::{self, MockUser};
use super::{
    AREA_API_URL, AREAS_API_URL, AuthApi, CATEGORIES_API_URL, DASHBOARD_API_URL, EVENT_API_URL,
    EVENT_STATS_API_URL, EVENT_STATUS_API_URL, EVENTS_API_URL, EventApi, LOGIN_API_URL,
    MY_TICKETS_API_URL, PASSWORD_RESET_API_URL, REFRESH_API_URL, REGISTER_API_URL,
    RESERVATIONS_API_URL, STRUCTURE_API_URL, STRUCTURE_TYPES_API_URL, STRUCTURES_API_URL,
    StatsApi, StructureApi, TICKET_API_URL, TICKET_VALIDATE_API_URL, TicketApi,
};
use crate::error::{ApiContext, Error, Result};
use crate::jwt;
use crate::model::{
    Area, AreaDraft, AudienceZoneSnapshot, AuthResponse, Category, Event, EventDraft,
    EventSnapshot, EventStatistics, EventStatus, JwtPayload, LoginCredentials, MAX_PARTICIPANTS,
    ParticipantInfo, Registration, ReservationConfirmation, ReservationRequest, Structure,
    StructureCreation, StructureDashboardStats, StructureDraft, StructureType, Ticket,
    TicketStatus, UserRole,
};
use crate::search::{self, EventSearchParams, Page, PageLimits, StructureSearchParams};
use crate::stats;
use crate::storage::SessionStore;

const EMAIL_REGEX: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

// SAFETY: The pattern is a constant checked by the tests
static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(EMAIL_REGEX).unwrap());

struct MockState {
    users: Vec<MockUser>,
    categories: Vec<Category>,
    events: Vec<Event>,
    structure_types: Vec<StructureType>,
    structures: Vec<Structure>,
    tickets: Vec<IssuedTicket>,
}

struct IssuedTicket {
    holder: u64,
    structure_id: u64,
    ticket: Ticket,
}

/// Answers every API call from in-memory fixtures after a fixed delay.
/// Mutations are kept for the lifetime of the back end.
pub struct MockBackend {
    state: Mutex<MockState>,
    delay: Duration,
    limits: PageLimits,
    session: Option<Arc<SessionStore>>,
}

fn not_found(context: ApiContext) -> Error {
    Error::from_status(404, context, None)
}

fn bad_request(context: ApiContext, message: &str) -> Error {
    Error::from_status(400, context, Some(message))
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn next_id(ids: impl Iterator<Item = u64>) -> u64 {
    ids.max().unwrap_or(0) + 1
}

fn validate_event(draft: &EventDraft) -> Result<()> {
    if is_blank(&draft.name) {
        return Err(bad_request(ApiContext::Event, "Le nom de l'événement est requis."));
    }
    if draft.end_date < draft.start_date {
        return Err(bad_request(
            ApiContext::Event,
            "La date de fin doit être postérieure à la date de début.",
        ));
    }
    Ok(())
}

fn apply_draft(event: &mut Event, draft: &EventDraft, category: Category) {
    event.name = draft.name.trim().to_owned();
    event.category = category;
    event.short_description.clone_from(&draft.short_description);
    event.full_description.clone_from(&draft.full_description);
    event.genres.clone_from(&draft.genres);
    event.tags.clone_from(&draft.tags);
    event.start_date = draft.start_date;
    event.end_date = draft.end_date;
    event.address = draft.address.clone();
    event.structure_id = draft.structure_id;
    event.area_ids.clone_from(&draft.area_ids);
    event.is_free_event = draft.is_free_event;
    event.default_seating_type = draft.default_seating_type;
    event.seating_zones.clone_from(&draft.seating_zones);
    fixtures::number_zones(event);
    event.display_on_homepage = draft.display_on_homepage;
    event.is_featured_event = draft.is_featured_event;
    event.links.clone_from(&draft.links);
    event.main_photo_url.clone_from(&draft.main_photo_url);
    event.event_photo_urls.clone_from(&draft.event_photo_urls);
    event.updated_at = Some(Utc::now());
}

fn apply_structure_draft(structure: &mut Structure, draft: &StructureDraft, types: &[StructureType]) {
    structure.name = draft.name.trim().to_owned();
    structure.types = types
        .iter()
        .filter(|t| draft.type_ids.contains(&t.id))
        .cloned()
        .collect();
    structure.description.clone_from(&draft.description);
    structure.address = draft.address.clone();
    structure.phone.clone_from(&draft.phone);
    structure.email.clone_from(&draft.email);
    structure.website_url.clone_from(&draft.website_url);
    structure.socials_url.clone_from(&draft.socials_url);
    structure.updated_at = Some(Utc::now());
}

fn validate_participant(p: &ParticipantInfo) -> Result<()> {
    if is_blank(&p.first_name) || is_blank(&p.last_name) || !EMAIL.is_match(p.email.trim()) {
        return Err(bad_request(
            ApiContext::Ticket,
            "Chaque participant doit avoir un nom, un prénom et un email valide.",
        ));
    }
    Ok(())
}

/// The ticket holder, or staff of the hosting structure.
fn may_see(issued: &IssuedTicket, caller: &JwtPayload) -> bool {
    issued.holder == *caller.user_id() || works_at(caller, issued.structure_id)
}

/// Administrators and the reservation service of a structure check tickets
/// at its entrance.
fn works_at(caller: &JwtPayload, structure_id: u64) -> bool {
    matches!(
        caller.user_role(),
        Some(UserRole::StructureAdministrator | UserRole::ReservationService)
    ) && *caller.structure_id() == Some(structure_id)
}

fn claims_for(user: &MockUser) -> JwtPayload {
    JwtPayload::new(&user.email, user.id, user.role.as_str())
        .with_structure(user.structure_id, user.needs_structure_setup)
}

fn auth_response_for(user: &MockUser) -> Result<AuthResponse> {
    let token = jwt::issue_mock_token(claims_for(user), Utc::now())?;
    Ok(AuthResponse::new(
        token,
        user.id,
        user.role.as_str(),
        user.needs_structure_setup,
    ))
}

impl MockBackend {
    pub fn with_fixtures(delay: Duration, limits: PageLimits) -> Self {
        Self {
            state: Mutex::new(MockState {
                users: fixtures::users(),
                categories: fixtures::categories(),
                events: fixtures::events(),
                structure_types: fixtures::structure_types(),
                structures: fixtures::structures(),
                tickets: vec![],
            }),
            delay,
            limits,
            session: None,
        }
    }

    /// Reads the caller's token from `store`, the way the HTTP back end
    /// sends it as a bearer header.
    #[must_use]
    pub fn with_session(mut self, store: Arc<SessionStore>) -> Self {
        self.session = Some(store);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn pause(&self, method: &str, endpoint: &str) {
        tracing::debug!("MOCK {method} {endpoint}");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }

    fn caller(&self, context: ApiContext) -> Result<JwtPayload> {
        let token = match &self.session {
            Some(store) => store.token()?,
            None => None,
        };
        let token = token.ok_or_else(|| Error::from_status(401, context, None))?;
        jwt::decode_payload(&token).map_err(|_| Error::from_status(401, context, None))
    }
}

#[async_trait]
impl AuthApi for MockBackend {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse> {
        self.pause("POST", LOGIN_API_URL).await;

        if is_blank(&credentials.email) || credentials.password.is_empty() {
            return Err(Error::from_status(400, ApiContext::Login, None));
        }

        let state = self.state();
        let user = state
            .users
            .iter()
            .find(|u| {
                u.email.eq_ignore_ascii_case(credentials.email.trim())
                    && u.password == credentials.password
            })
            .ok_or_else(|| Error::from_status(401, ApiContext::Login, None))?;
        auth_response_for(user)
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse> {
        self.pause("POST", REGISTER_API_URL).await;

        let mut state = self.state();
        let email = registration.email.trim();
        if state.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
            return Err(Error::from_status(409, ApiContext::Register, None));
        }
        if [
            &registration.first_name,
            &registration.last_name,
            &registration.email,
            &registration.password,
        ]
        .into_iter()
        .any(|f| is_blank(f))
            || !EMAIL.is_match(email)
        {
            return Err(Error::from_status(400, ApiContext::Register, None));
        }

        let role = if registration.create_structure {
            UserRole::StructureAdministrator
        } else {
            UserRole::Spectator
        };
        let user = MockUser {
            id: next_id(state.users.iter().map(|u| u.id)),
            first_name: registration.first_name.trim().to_owned(),
            last_name: registration.last_name.trim().to_owned(),
            email: email.to_owned(),
            password: registration.password.clone(),
            role,
            structure_id: None,
            needs_structure_setup: registration.create_structure,
        };
        let response = auth_response_for(&user)?;
        tracing::info!("Mock registered user {} as {role}", user.id);
        state.users.push(user);
        Ok(response)
    }

    async fn refresh(&self, token: &str) -> Result<AuthResponse> {
        self.pause("POST", REFRESH_API_URL).await;

        let unauthorized = || Error::from_status(401, ApiContext::Refresh, None);
        let claims = jwt::decode_payload(token).map_err(|_| unauthorized())?;
        let state = self.state();
        let user = state
            .users
            .iter()
            .find(|u| u.id == *claims.user_id())
            .ok_or_else(unauthorized)?;
        auth_response_for(user)
    }

    async fn request_password_reset(&self, email: &str) -> Result<()> {
        self.pause("POST", PASSWORD_RESET_API_URL).await;
        if !EMAIL.is_match(email.trim()) {
            return Err(Error::from_status(400, ApiContext::PasswordReset, None));
        }
        // same answer whether or not the address is known
        Ok(())
    }
}

#[async_trait]
impl EventApi for MockBackend {
    async fn search_events(&self, params: &EventSearchParams) -> Result<Page<Event>> {
        self.pause("GET", EVENTS_API_URL).await;
        Ok(search::search_events(&self.state().events, params, self.limits))
    }

    async fn get_event(&self, id: u64) -> Result<Event> {
        self.pause("GET", &EVENT_API_URL.replace("{id}", &id.to_string())).await;
        self.state()
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or_else(|| not_found(ApiContext::Event))
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Event> {
        self.pause("POST", EVENTS_API_URL).await;
        validate_event(draft)?;

        let mut state = self.state();
        let category = state
            .categories
            .iter()
            .find(|c| c.id == draft.category_id)
            .cloned()
            .ok_or_else(|| bad_request(ApiContext::Event, "Catégorie inconnue."))?;

        let now = Utc::now();
        let mut event = Event {
            id: next_id(state.events.iter().map(|e| e.id)),
            name: String::new(),
            category: category.clone(),
            short_description: None,
            full_description: String::new(),
            genres: vec![],
            tags: vec![],
            start_date: draft.start_date,
            end_date: draft.end_date,
            address: draft.address.clone(),
            structure_id: draft.structure_id,
            area_ids: vec![],
            is_free_event: draft.is_free_event,
            default_seating_type: draft.default_seating_type,
            seating_zones: vec![],
            display_on_homepage: false,
            is_featured_event: false,
            links: vec![],
            main_photo_url: None,
            event_photo_urls: vec![],
            status: EventStatus::Draft,
            created_at: Some(now),
            updated_at: Some(now),
        };
        apply_draft(&mut event, draft, category);
        state.events.push(event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: u64, draft: &EventDraft) -> Result<Event> {
        self.pause("PUT", &EVENT_API_URL.replace("{id}", &id.to_string())).await;
        validate_event(draft)?;

        let mut state = self.state();
        let category = state
            .categories
            .iter()
            .find(|c| c.id == draft.category_id)
            .cloned()
            .ok_or_else(|| bad_request(ApiContext::Event, "Catégorie inconnue."))?;
        let event = state
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| not_found(ApiContext::Event))?;
        apply_draft(event, draft, category);
        Ok(event.clone())
    }

    async fn delete_event(&self, id: u64) -> Result<()> {
        self.pause("DELETE", &EVENT_API_URL.replace("{id}", &id.to_string())).await;
        let mut state = self.state();
        let before = state.events.len();
        state.events.retain(|e| e.id != id);
        if state.events.len() == before {
            return Err(not_found(ApiContext::Event));
        }
        Ok(())
    }

    async fn update_event_status(&self, id: u64, status: EventStatus) -> Result<Event> {
        self.pause("PATCH", &EVENT_STATUS_API_URL.replace("{id}", &id.to_string()))
            .await;
        let mut state = self.state();
        let event = state
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| not_found(ApiContext::Event))?;
        event.status = status;
        event.updated_at = Some(Utc::now());
        Ok(event.clone())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        self.pause("GET", CATEGORIES_API_URL).await;
        Ok(self.state().categories.clone())
    }
}

#[async_trait]
impl StructureApi for MockBackend {
    async fn search_structures(&self, params: &StructureSearchParams) -> Result<Page<Structure>> {
        self.pause("GET", STRUCTURES_API_URL).await;
        Ok(search::search_structures(
            &self.state().structures,
            params,
            self.limits,
        ))
    }

    async fn get_structure(&self, id: u64) -> Result<Structure> {
        self.pause("GET", &STRUCTURE_API_URL.replace("{id}", &id.to_string()))
            .await;
        self.state()
            .structures
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| not_found(ApiContext::Structure))
    }

    async fn create_structure(&self, draft: &StructureDraft) -> Result<StructureCreation> {
        self.pause("POST", STRUCTURES_API_URL).await;
        let caller = self.caller(ApiContext::Structure)?;
        if is_blank(&draft.name) || is_blank(&draft.address.city) {
            return Err(Error::from_status(400, ApiContext::Structure, None));
        }

        let mut state = self.state();
        let now = Utc::now();
        let mut structure = Structure {
            id: next_id(state.structures.iter().map(|s| s.id)),
            name: String::new(),
            types: vec![],
            description: None,
            address: draft.address.clone(),
            areas: vec![],
            phone: None,
            email: None,
            website_url: None,
            socials_url: vec![],
            logo_url: None,
            importance: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        let types = state.structure_types.clone();
        apply_structure_draft(&mut structure, draft, &types);
        state.structures.push(structure.clone());

        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == *caller.user_id())
            .ok_or_else(|| Error::from_status(401, ApiContext::Structure, None))?;
        user.structure_id = Some(structure.id);
        user.needs_structure_setup = false;
        let new_token = jwt::issue_mock_token(claims_for(user), now)?;

        Ok(StructureCreation {
            new_token,
            created_structure: Some(structure),
        })
    }

    async fn update_structure(&self, id: u64, draft: &StructureDraft) -> Result<Structure> {
        self.pause("PUT", &STRUCTURE_API_URL.replace("{id}", &id.to_string()))
            .await;
        if is_blank(&draft.name) {
            return Err(Error::from_status(400, ApiContext::Structure, None));
        }
        let mut state = self.state();
        let types = state.structure_types.clone();
        let structure = state
            .structures
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| not_found(ApiContext::Structure))?;
        apply_structure_draft(structure, draft, &types);
        Ok(structure.clone())
    }

    async fn delete_structure(&self, id: u64) -> Result<()> {
        self.pause("DELETE", &STRUCTURE_API_URL.replace("{id}", &id.to_string()))
            .await;
        let mut state = self.state();
        let before = state.structures.len();
        state.structures.retain(|s| s.id != id);
        if state.structures.len() == before {
            return Err(not_found(ApiContext::Structure));
        }
        Ok(())
    }

    async fn structure_types(&self) -> Result<Vec<StructureType>> {
        self.pause("GET", STRUCTURE_TYPES_API_URL).await;
        Ok(self.state().structure_types.clone())
    }

    async fn areas(&self, structure_id: u64) -> Result<Vec<Area>> {
        self.pause("GET", &AREAS_API_URL.replace("{id}", &structure_id.to_string()))
            .await;
        self.state()
            .structures
            .iter()
            .find(|s| s.id == structure_id)
            .map(|s| s.areas.clone())
            .ok_or_else(|| not_found(ApiContext::Structure))
    }

    async fn create_area(&self, structure_id: u64, draft: &AreaDraft) -> Result<Area> {
        self.pause("POST", &AREAS_API_URL.replace("{id}", &structure_id.to_string()))
            .await;
        if is_blank(&draft.name) || draft.max_capacity == 0 {
            return Err(Error::from_status(400, ApiContext::Structure, None));
        }
        let mut state = self.state();
        let id = next_id(state.structures.iter().flat_map(|s| s.areas.iter().map(|a| a.id)));
        let structure = state
            .structures
            .iter_mut()
            .find(|s| s.id == structure_id)
            .ok_or_else(|| not_found(ApiContext::Structure))?;
        let area = Area {
            id,
            name: draft.name.trim().to_owned(),
            max_capacity: draft.max_capacity,
            is_active: draft.is_active,
            structure_id: Some(structure_id),
            description: draft.description.clone(),
        };
        structure.areas.push(area.clone());
        Ok(area)
    }

    async fn update_area(&self, structure_id: u64, area_id: u64, draft: &AreaDraft) -> Result<Area> {
        let endpoint = AREA_API_URL
            .replace("{id}", &structure_id.to_string())
            .replace("{areaId}", &area_id.to_string());
        self.pause("PUT", &endpoint).await;
        if is_blank(&draft.name) || draft.max_capacity == 0 {
            return Err(Error::from_status(400, ApiContext::Structure, None));
        }
        let mut state = self.state();
        let area = state
            .structures
            .iter_mut()
            .find(|s| s.id == structure_id)
            .and_then(|s| s.areas.iter_mut().find(|a| a.id == area_id))
            .ok_or_else(|| not_found(ApiContext::Structure))?;
        area.name = draft.name.trim().to_owned();
        area.max_capacity = draft.max_capacity;
        area.is_active = draft.is_active;
        area.description.clone_from(&draft.description);
        Ok(area.clone())
    }

    async fn delete_area(&self, structure_id: u64, area_id: u64) -> Result<()> {
        let endpoint = AREA_API_URL
            .replace("{id}", &structure_id.to_string())
            .replace("{areaId}", &area_id.to_string());
        self.pause("DELETE", &endpoint).await;
        let mut state = self.state();
        let structure = state
            .structures
            .iter_mut()
            .find(|s| s.id == structure_id)
            .ok_or_else(|| not_found(ApiContext::Structure))?;
        let before = structure.areas.len();
        structure.areas.retain(|a| a.id != area_id);
        if structure.areas.len() == before {
            return Err(not_found(ApiContext::Structure));
        }
        Ok(())
    }
}

#[async_trait]
impl StatsApi for MockBackend {
    async fn structure_dashboard(&self, structure_id: u64) -> Result<StructureDashboardStats> {
        self.pause("GET", &DASHBOARD_API_URL.replace("{id}", &structure_id.to_string()))
            .await;
        let state = self.state();
        if !state.structures.iter().any(|s| s.id == structure_id) {
            return Err(not_found(ApiContext::Statistics));
        }
        Ok(stats::structure_dashboard(&state.events, structure_id, Utc::now()))
    }

    async fn event_statistics(&self, event_id: u64) -> Result<EventStatistics> {
        self.pause("GET", &EVENT_STATS_API_URL.replace("{id}", &event_id.to_string()))
            .await;
        let state = self.state();
        let event = state
            .events
            .iter()
            .find(|e| e.id == event_id)
            .ok_or_else(|| not_found(ApiContext::Statistics))?;
        Ok(stats::event_statistics(event, Utc::now()))
    }
}

#[async_trait]
impl TicketApi for MockBackend {
    async fn create_reservation(&self, request: &ReservationRequest) -> Result<ReservationConfirmation> {
        self.pause("POST", RESERVATIONS_API_URL).await;
        let caller = self.caller(ApiContext::Ticket)?;

        let count = request.participants.len();
        if count == 0 || count > MAX_PARTICIPANTS {
            return Err(bad_request(
                ApiContext::Ticket,
                "Une réservation compte entre 1 et 4 participants.",
            ));
        }
        request.participants.iter().try_for_each(validate_participant)?;

        let mut guard = self.state();
        let state = &mut *guard;
        let event = state
            .events
            .iter_mut()
            .find(|e| e.id == request.event_id)
            .ok_or_else(|| not_found(ApiContext::Ticket))?;
        if event.status != EventStatus::Published {
            return Err(Error::from_status(
                409,
                ApiContext::Ticket,
                Some("Cet événement n'est pas ouvert à la réservation."),
            ));
        }
        let event_snapshot = EventSnapshot {
            event_id: event.id,
            name: event.name.clone(),
            start_date: event.start_date,
            address: event.address.clone(),
            main_photo_url: event.main_photo_url.clone(),
        };
        let structure_id = event.structure_id;
        let zone = event
            .seating_zones
            .iter_mut()
            .find(|z| z.id == Some(request.audience_zone_id) && z.is_active)
            .ok_or_else(|| not_found(ApiContext::Ticket))?;
        // participants are capped at four, so the count fits
        let wanted = u32::try_from(count).unwrap_or(u32::MAX);
        if zone.tickets_sold.saturating_add(wanted) > zone.max_capacity {
            return Err(Error::from_status(
                409,
                ApiContext::Ticket,
                Some("Plus assez de places disponibles dans cette zone."),
            ));
        }
        zone.tickets_sold += wanted;
        let zone_snapshot = AudienceZoneSnapshot {
            audience_zone_id: request.audience_zone_id,
            name: zone.name.clone(),
            seating_type: zone.seating_type,
        };

        let tickets: Vec<Ticket> = request
            .participants
            .iter()
            .map(|participant| {
                let id = Uuid::new_v4().to_string();
                Ticket {
                    qr_code_value: TICKET_VALIDATE_API_URL.replace("{id}", &id),
                    id,
                    status: TicketStatus::Valid,
                    participant: participant.clone(),
                    event_snapshot: event_snapshot.clone(),
                    audience_zone_snapshot: zone_snapshot.clone(),
                    used_at: None,
                }
            })
            .collect();
        state.tickets.extend(tickets.iter().map(|ticket| IssuedTicket {
            holder: *caller.user_id(),
            structure_id,
            ticket: ticket.clone(),
        }));

        let reference = Uuid::new_v4().simple().to_string().to_uppercase();
        let confirmation = ReservationConfirmation {
            reservation_id: format!("RES-{}", &reference[..8]),
            event_id: request.event_id,
            tickets,
            reservation_date: Utc::now(),
        };
        tracing::info!(
            "Mock reservation {} for user {}: {count} ticket(s)",
            confirmation.reservation_id,
            caller.user_id()
        );
        Ok(confirmation)
    }

    async fn my_tickets(&self) -> Result<Vec<Ticket>> {
        self.pause("GET", MY_TICKETS_API_URL).await;
        let caller = self.caller(ApiContext::Ticket)?;
        Ok(self
            .state()
            .tickets
            .iter()
            .filter(|t| t.holder == *caller.user_id())
            .map(|t| t.ticket.clone())
            .collect())
    }

    async fn ticket(&self, id: &str) -> Result<Ticket> {
        self.pause("GET", &TICKET_API_URL.replace("{id}", id)).await;
        let caller = self.caller(ApiContext::Ticket)?;
        let state = self.state();
        let issued = state
            .tickets
            .iter()
            .find(|t| t.ticket.id == id)
            .ok_or_else(|| not_found(ApiContext::Ticket))?;
        if !may_see(issued, &caller) {
            return Err(Error::from_status(403, ApiContext::Ticket, None));
        }
        Ok(issued.ticket.clone())
    }

    async fn validate_ticket(&self, id: &str) -> Result<Ticket> {
        self.pause("POST", &TICKET_VALIDATE_API_URL.replace("{id}", id)).await;
        let caller = self.caller(ApiContext::Ticket)?;
        let mut state = self.state();
        let issued = state
            .tickets
            .iter_mut()
            .find(|t| t.ticket.id == id)
            .ok_or_else(|| not_found(ApiContext::Ticket))?;
        if !works_at(&caller, issued.structure_id) {
            return Err(Error::from_status(403, ApiContext::Ticket, None));
        }
        match issued.ticket.status {
            TicketStatus::Valid => {}
            TicketStatus::Used => {
                return Err(Error::from_status(
                    409,
                    ApiContext::Ticket,
                    Some("Ce billet a déjà été utilisé."),
                ));
            }
            status @ (TicketStatus::Cancelled | TicketStatus::Expired) => {
                return Err(bad_request(
                    ApiContext::Ticket,
                    &format!("Ce billet ne peut pas être validé (statut: {status})."),
                ));
            }
        }
        issued.ticket.status = TicketStatus::Used;
        issued.ticket.used_at = Some(Utc::now());
        Ok(issued.ticket.clone())
    }
}
