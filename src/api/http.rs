use std::sync::Arc;

use async_trait::async_trait;
use getset::Getters;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{
    AREA_API_URL, AREAS_API_URL, AuthApi, CATEGORIES_API_URL, DASHBOARD_API_URL, EVENT_API_URL,
    EVENT_STATS_API_URL, EVENT_STATUS_API_URL, EVENTS_API_URL, EventApi, LOGIN_API_URL,
    MY_TICKETS_API_URL, PASSWORD_RESET_API_URL, REFRESH_API_URL, REGISTER_API_URL,
    RESERVATIONS_API_URL, STRUCTURE_API_URL, STRUCTURE_TYPES_API_URL, STRUCTURES_API_URL,
    StatsApi, StructureApi, TICKET_API_URL, TICKET_VALIDATE_API_URL, TicketApi,
};
use crate::error::{ApiContext, Error, Result};
use crate::model::{
    Area, AreaDraft, AuthResponse, Category, Event, EventDraft, EventStatistics, EventStatus,
    LoginCredentials, Registration, ReservationConfirmation, ReservationRequest, Structure,
    StructureCreation, StructureDashboardStats, StructureDraft, StructureType, Ticket,
};
use crate::search::{self, EventSearchParams, Page, PageLimits, StructureSearchParams};
use crate::storage::SessionStore;

/// Error body sent by the back end alongside a failing status.
#[derive(Deserialize, Getters)]
#[getset(get = "pub")]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// A server-side page, zero-based.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemotePage<T> {
    content: Vec<T>,
    number: usize,
    size: usize,
    total_elements: usize,
    total_pages: usize,
}

/// Listing endpoints answer either with a server-side page or with the
/// whole matching list.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Paged(RemotePage<T>),
    Plain(Vec<T>),
}

/// Talks to the REST back end.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    session: Arc<SessionStore>,
    limits: PageLimits,
}

impl HttpBackend {
    pub fn new(base_url: &str, session: Arc<SessionStore>, limits: PageLimits) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::Config("API base URL is empty".into()));
        }
        let mut base_url = base_url.trim().to_owned();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self {
            client: Client::builder().build()?,
            base_url,
            session,
            limits,
        })
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        tracing::debug!("{method} {endpoint}");
        let builder = self.client.request(method, self.url(endpoint));
        Ok(match self.session.token()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, context: ApiContext) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message().clone());
        tracing::error!("{context} request failed with {status}: {body}");
        Err(Error::from_status(status.as_u16(), context, message.as_deref()))
    }

    async fn send_empty(&self, request: RequestBuilder, context: ApiContext) -> Result<()> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|b| b.message().clone());
        tracing::error!("{context} request failed with {status}");
        Err(Error::from_status(status.as_u16(), context, message.as_deref()))
    }
}

fn with_id(template: &str, id: u64) -> String {
    template.replace("{id}", &id.to_string())
}

/// Ticket ids are opaque strings rather than numbers.
fn ticket_endpoint(template: &str, id: &str) -> String {
    template.replace("{id}", id)
}

fn area_endpoint(structure_id: u64, area_id: u64) -> String {
    with_id(AREA_API_URL, structure_id).replace("{areaId}", &area_id.to_string())
}

#[async_trait]
impl AuthApi for HttpBackend {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthResponse> {
        let req = self.request(Method::POST, LOGIN_API_URL)?.json(credentials);
        self.send(req, ApiContext::Login).await
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse> {
        let req = self.request(Method::POST, REGISTER_API_URL)?.json(registration);
        self.send(req, ApiContext::Register).await
    }

    async fn refresh(&self, token: &str) -> Result<AuthResponse> {
        let req = self
            .request(Method::POST, REFRESH_API_URL)?
            .json(&json!({ "refreshToken": token }));
        self.send(req, ApiContext::Refresh).await
    }

    async fn request_password_reset(&self, email: &str) -> Result<()> {
        let req = self
            .request(Method::POST, PASSWORD_RESET_API_URL)?
            .json(&json!({ "email": email }));
        self.send_empty(req, ApiContext::PasswordReset).await
    }
}

#[async_trait]
impl EventApi for HttpBackend {
    async fn search_events(&self, params: &EventSearchParams) -> Result<Page<Event>> {
        let req = self
            .request(Method::GET, EVENTS_API_URL)?
            .query(&params.to_query_pairs());
        let listing: Listing<Event> = self.send(req, ApiContext::Event).await?;
        Ok(match listing {
            Listing::Paged(p) => Page::new(
                p.content,
                p.number + 1,
                p.size,
                p.total_elements,
                p.total_pages,
            ),
            // an unpaged server returns everything; apply the pipeline here
            Listing::Plain(all) => search::search_events(&all, params, self.limits),
        })
    }

    async fn get_event(&self, id: u64) -> Result<Event> {
        let req = self.request(Method::GET, &with_id(EVENT_API_URL, id))?;
        self.send(req, ApiContext::Event).await
    }

    async fn create_event(&self, draft: &EventDraft) -> Result<Event> {
        let req = self.request(Method::POST, EVENTS_API_URL)?.json(draft);
        self.send(req, ApiContext::Event).await
    }

    async fn update_event(&self, id: u64, draft: &EventDraft) -> Result<Event> {
        let req = self.request(Method::PUT, &with_id(EVENT_API_URL, id))?.json(draft);
        self.send(req, ApiContext::Event).await
    }

    async fn delete_event(&self, id: u64) -> Result<()> {
        let req = self.request(Method::DELETE, &with_id(EVENT_API_URL, id))?;
        self.send_empty(req, ApiContext::Event).await
    }

    async fn update_event_status(&self, id: u64, status: EventStatus) -> Result<Event> {
        let req = self
            .request(Method::PATCH, &with_id(EVENT_STATUS_API_URL, id))?
            .json(&json!({ "status": status }));
        self.send(req, ApiContext::Event).await
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let req = self.request(Method::GET, CATEGORIES_API_URL)?;
        self.send(req, ApiContext::Event).await
    }
}

#[async_trait]
impl StructureApi for HttpBackend {
    async fn search_structures(&self, params: &StructureSearchParams) -> Result<Page<Structure>> {
        let req = self
            .request(Method::GET, STRUCTURES_API_URL)?
            .query(&params.to_query_pairs());
        let listing: Listing<Structure> = self.send(req, ApiContext::Structure).await?;
        Ok(match listing {
            Listing::Paged(p) => Page::new(
                p.content,
                p.number + 1,
                p.size,
                p.total_elements,
                p.total_pages,
            ),
            Listing::Plain(all) => search::search_structures(&all, params, self.limits),
        })
    }

    async fn get_structure(&self, id: u64) -> Result<Structure> {
        let req = self.request(Method::GET, &with_id(STRUCTURE_API_URL, id))?;
        self.send(req, ApiContext::Structure).await
    }

    async fn create_structure(&self, draft: &StructureDraft) -> Result<StructureCreation> {
        let req = self.request(Method::POST, STRUCTURES_API_URL)?.json(draft);
        self.send(req, ApiContext::Structure).await
    }

    async fn update_structure(&self, id: u64, draft: &StructureDraft) -> Result<Structure> {
        let req = self
            .request(Method::PUT, &with_id(STRUCTURE_API_URL, id))?
            .json(draft);
        self.send(req, ApiContext::Structure).await
    }

    async fn delete_structure(&self, id: u64) -> Result<()> {
        let req = self.request(Method::DELETE, &with_id(STRUCTURE_API_URL, id))?;
        self.send_empty(req, ApiContext::Structure).await
    }

    async fn structure_types(&self) -> Result<Vec<StructureType>> {
        let req = self.request(Method::GET, STRUCTURE_TYPES_API_URL)?;
        self.send(req, ApiContext::Structure).await
    }

    async fn areas(&self, structure_id: u64) -> Result<Vec<Area>> {
        let req = self.request(Method::GET, &with_id(AREAS_API_URL, structure_id))?;
        self.send(req, ApiContext::Structure).await
    }

    async fn create_area(&self, structure_id: u64, draft: &AreaDraft) -> Result<Area> {
        let req = self
            .request(Method::POST, &with_id(AREAS_API_URL, structure_id))?
            .json(draft);
        self.send(req, ApiContext::Structure).await
    }

    async fn update_area(&self, structure_id: u64, area_id: u64, draft: &AreaDraft) -> Result<Area> {
        let req = self
            .request(Method::PUT, &area_endpoint(structure_id, area_id))?
            .json(draft);
        self.send(req, ApiContext::Structure).await
    }

    async fn delete_area(&self, structure_id: u64, area_id: u64) -> Result<()> {
        let req = self.request(Method::DELETE, &area_endpoint(structure_id, area_id))?;
        self.send_empty(req, ApiContext::Structure).await
    }
}

#[async_trait]
impl StatsApi for HttpBackend {
    async fn structure_dashboard(&self, structure_id: u64) -> Result<StructureDashboardStats> {
        let req = self.request(Method::GET, &with_id(DASHBOARD_API_URL, structure_id))?;
        self.send(req, ApiContext::Statistics).await
    }

    async fn event_statistics(&self, event_id: u64) -> Result<EventStatistics> {
        let req = self.request(Method::GET, &with_id(EVENT_STATS_API_URL, event_id))?;
        self.send(req, ApiContext::Statistics).await
    }
}

#[async_trait]
impl TicketApi for HttpBackend {
    async fn create_reservation(&self, request: &ReservationRequest) -> Result<ReservationConfirmation> {
        let req = self.request(Method::POST, RESERVATIONS_API_URL)?.json(request);
        self.send(req, ApiContext::Ticket).await
    }

    async fn my_tickets(&self) -> Result<Vec<Ticket>> {
        let req = self.request(Method::GET, MY_TICKETS_API_URL)?;
        self.send(req, ApiContext::Ticket).await
    }

    async fn ticket(&self, id: &str) -> Result<Ticket> {
        let req = self.request(Method::GET, &ticket_endpoint(TICKET_API_URL, id))?;
        self.send(req, ApiContext::Ticket).await
    }

    async fn validate_ticket(&self, id: &str) -> Result<Ticket> {
        let req = self
            .request(Method::POST, &ticket_endpoint(TICKET_VALIDATE_API_URL, id))?
            .json(&json!({}));
        self.send(req, ApiContext::Ticket).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        HttpBackend::new(base, Arc::new(SessionStore::in_memory()), PageLimits::default()).unwrap()
    }

    #[test]
    fn base_url_gets_trailing_slash() {
        assert_eq!(backend("http://api.test").url(LOGIN_API_URL), "http://api.test/auth/login");
        assert_eq!(backend("http://api.test/v1/").url(EVENTS_API_URL), "http://api.test/v1/events");
        assert!(HttpBackend::new(" ", Arc::new(SessionStore::in_memory()), PageLimits::default()).is_err());
    }

    #[test]
    fn templates_substitute_ids() {
        assert_eq!(with_id(EVENT_STATUS_API_URL, 42), "events/42/status");
        assert_eq!(area_endpoint(3, 9), "structures/3/areas/9");
        assert_eq!(
            ticket_endpoint(TICKET_VALIDATE_API_URL, "5f0c-77"),
            "ticketing/tickets/5f0c-77/validate"
        );
    }

    #[test]
    fn listings_accept_both_shapes() {
        let paged: Listing<u32> = serde_json::from_str(
            r#"{"content":[1,2],"number":0,"size":2,"totalElements":5,"totalPages":3}"#,
        )
        .unwrap();
        assert!(matches!(paged, Listing::Paged(p) if p.total_elements == 5));

        let plain: Listing<u32> = serde_json::from_str("[1,2,3]").unwrap();
        assert!(matches!(plain, Listing::Plain(v) if v.len() == 3));
    }
}
