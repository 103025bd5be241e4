//! Event catalogue service: listings, details and mutations on top of an
//! [`EventApi`], with the caches the front pages read from.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::api::EventApi;
use crate::error::{Error, Result};
use crate::model::{Category, Event, EventDraft, EventStatus, JwtPayload};
use crate::notification::Notifier;
use crate::search::{EventSearchParams, EventSortField, Page, SortDirection};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct EventService {
    api: Arc<dyn EventApi>,
    notifier: Arc<dyn Notifier>,
    home_count: usize,
    featured_count: usize,
    details: Mutex<HashMap<u64, Event>>,
    home: Mutex<Option<Vec<Event>>>,
    featured: Mutex<Option<Vec<Event>>>,
}

impl EventService {
    pub fn new(
        api: Arc<dyn EventApi>,
        notifier: Arc<dyn Notifier>,
        home_count: usize,
        featured_count: usize,
    ) -> Self {
        Self {
            api,
            notifier,
            home_count,
            featured_count,
            details: Mutex::new(HashMap::new()),
            home: Mutex::new(None),
            featured: Mutex::new(None),
        }
    }

    fn fail(&self, what: &str, e: Error) -> Error {
        tracing::error!("{what}: {e}");
        self.notifier.error(&e.to_string());
        e
    }

    pub async fn search(&self, params: &EventSearchParams) -> Result<Page<Event>> {
        self.api
            .search_events(params)
            .await
            .map_err(|e| self.fail("Event search failed", e))
    }

    /// Served from the detail cache unless `force_refresh` is set.
    pub async fn get_event(&self, id: u64, force_refresh: bool) -> Result<Event> {
        if !force_refresh {
            if let Some(event) = lock(&self.details).get(&id) {
                tracing::debug!("Event {id} served from cache");
                return Ok(event.clone());
            }
        }
        match self.api.get_event(id).await {
            Ok(event) => {
                lock(&self.details).insert(id, event.clone());
                Ok(event)
            }
            Err(e) => {
                lock(&self.details).remove(&id);
                Err(self.fail(&format!("Could not load event {id}"), e))
            }
        }
    }

    pub async fn create(&self, draft: &EventDraft) -> Result<Event> {
        let event = self
            .api
            .create_event(draft)
            .await
            .map_err(|e| self.fail("Event creation failed", e))?;
        tracing::info!("Created event {}", event.id);
        lock(&self.details).insert(event.id, event.clone());
        self.refresh_lists_for(event.id, Some(&event)).await;
        self.notifier.success("Événement créé avec succès !");
        Ok(event)
    }

    pub async fn update(&self, id: u64, draft: &EventDraft) -> Result<Event> {
        let event = self
            .api
            .update_event(id, draft)
            .await
            .map_err(|e| self.fail(&format!("Update of event {id} failed"), e))?;
        lock(&self.details).insert(id, event.clone());
        self.refresh_lists_for(id, Some(&event)).await;
        self.notifier.success("Événement mis à jour avec succès.");
        Ok(event)
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        self.api
            .delete_event(id)
            .await
            .map_err(|e| self.fail(&format!("Deletion of event {id} failed"), e))?;
        lock(&self.details).remove(&id);
        self.refresh_lists_for(id, None).await;
        self.notifier.success("Événement supprimé avec succès.");
        Ok(())
    }

    pub async fn update_status(&self, id: u64, status: EventStatus) -> Result<Event> {
        let event = self
            .api
            .update_event_status(id, status)
            .await
            .map_err(|e| self.fail(&format!("Status change of event {id} failed"), e))?;
        lock(&self.details).insert(id, event.clone());
        self.refresh_lists_for(id, Some(&event)).await;
        self.notifier
            .success(&format!("Statut de l'événement mis à jour en : {status}"));
        Ok(event)
    }

    /// Published events flagged for the home page, soonest first.
    pub async fn home_page_events(&self, force_refresh: bool) -> Result<Vec<Event>> {
        let count = self.home_count;
        if !force_refresh {
            if let Some(cached) = lock(&self.home).clone() {
                return Ok(cached);
            }
        }
        let params = EventSearchParams {
            display_on_homepage: Some(true),
            status: Some(EventStatus::Published),
            ..EventSearchParams::default()
        }
        .sorted(EventSortField::StartDate, SortDirection::Asc)
        .paged(1, count);
        let events = self
            .api
            .search_events(&params)
            .await
            .map_err(|e| self.fail("Could not load home page events", e))?
            .into_items();
        *lock(&self.home) = Some(events.clone());
        Ok(events)
    }

    pub async fn featured_events(&self, force_refresh: bool) -> Result<Vec<Event>> {
        let count = self.featured_count;
        if !force_refresh {
            if let Some(cached) = lock(&self.featured).clone() {
                return Ok(cached);
            }
        }
        let params = EventSearchParams {
            featured: Some(true),
            status: Some(EventStatus::Published),
            ..EventSearchParams::default()
        }
        .sorted(EventSortField::StartDate, SortDirection::Asc)
        .paged(1, count);
        let events = self
            .api
            .search_events(&params)
            .await
            .map_err(|e| self.fail("Could not load featured events", e))?
            .into_items();
        *lock(&self.featured) = Some(events.clone());
        Ok(events)
    }

    /// Events starting from `now`, soonest first unless `params` asks for
    /// another order.
    pub async fn upcoming_events(&self, now: DateTime<Utc>, params: EventSearchParams) -> Result<Page<Event>> {
        let mut params = params;
        params.start_date = Some(params.start_date.map_or(now, |d| d.max(now)));
        if params.sort_by.is_none() {
            params = params.sorted(EventSortField::StartDate, SortDirection::Asc);
        }
        self.search(&params).await
    }

    pub async fn events_by_structure(&self, structure_id: u64, params: EventSearchParams) -> Result<Page<Event>> {
        let params = EventSearchParams {
            structure_id: Some(structure_id),
            ..params
        };
        self.search(&params).await
    }

    /// The `count` most recently created events.
    pub async fn latest_events(&self, count: usize) -> Result<Vec<Event>> {
        let params = EventSearchParams::default()
            .sorted(EventSortField::CreatedAt, SortDirection::Desc)
            .paged(1, count);
        Ok(self.search(&params).await?.into_items())
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.api
            .categories()
            .await
            .map_err(|e| self.fail("Could not load categories", e))
    }

    /// Re-fetches a loaded front-page list that holds a copy of event `id`
    /// or that the event now belongs to. `current` is `None` once the event
    /// is deleted.
    async fn refresh_lists_for(&self, id: u64, current: Option<&Event>) {
        let published = current.filter(|e| e.status == EventStatus::Published);
        let refresh_home = list_is_stale(
            lock(&self.home).as_deref(),
            id,
            published.is_some_and(|e| e.display_on_homepage),
        );
        let refresh_featured = list_is_stale(
            lock(&self.featured).as_deref(),
            id,
            published.is_some_and(|e| e.is_featured_event),
        );

        if refresh_home {
            if let Err(e) = self.home_page_events(true).await {
                tracing::warn!("Home page list not refreshed: {e}");
            }
        }
        if refresh_featured {
            if let Err(e) = self.featured_events(true).await {
                tracing::warn!("Featured list not refreshed: {e}");
            }
        }
    }
}

/// A list that was never loaded is fetched on first use anyway.
fn list_is_stale(list: Option<&[Event]>, id: u64, belongs: bool) -> bool {
    list.is_some_and(|events| belongs || events.iter().any(|e| e.id == id))
}

/// A user may edit the events of the structure they belong to.
pub fn can_edit_event(event: &Event, user: Option<&JwtPayload>) -> bool {
    user.and_then(|u| *u.structure_id())
        .is_some_and(|id| id == event.structure_id)
}

/// Drops events that ended before `now`, unless `include_past` is set.
pub fn filter_events_by_date(events: Vec<Event>, include_past: bool, now: DateTime<Utc>) -> Vec<Event> {
    if include_past {
        return events;
    }
    events.into_iter().filter(|e| e.end_date >= now).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::api::MockBackend;
    use crate::notification::{MemoryNotifier, NotificationKind};
    use crate::search::PageLimits;

    fn service() -> (EventService, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::new());
        let api = Arc::new(MockBackend::with_fixtures(Duration::ZERO, PageLimits::default()));
        (EventService::new(api, notifier.clone(), 6, 3), notifier)
    }

    fn draft_from(event: &Event) -> EventDraft {
        EventDraft {
            name: event.name.clone(),
            category_id: event.category.id,
            short_description: event.short_description.clone(),
            full_description: event.full_description.clone(),
            genres: event.genres.clone(),
            tags: event.tags.clone(),
            start_date: event.start_date,
            end_date: event.end_date,
            address: event.address.clone(),
            structure_id: event.structure_id,
            area_ids: event.area_ids.clone(),
            is_free_event: event.is_free_event,
            default_seating_type: event.default_seating_type,
            seating_zones: event.seating_zones.clone(),
            display_on_homepage: event.display_on_homepage,
            is_featured_event: event.is_featured_event,
            links: event.links.clone(),
            main_photo_url: event.main_photo_url.clone(),
            event_photo_urls: event.event_photo_urls.clone(),
        }
    }

    #[tokio::test]
    async fn home_page_lists_published_flagged_events_by_date() {
        let (events, _) = service();
        let home = events.home_page_events(false).await.unwrap();
        let ids: Vec<u64> = home.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 7, 2, 4, 1]);

        let featured = events.featured_events(false).await.unwrap();
        assert_eq!(featured.iter().map(|e| e.id).collect::<Vec<_>>(), vec![7, 4, 1]);
    }

    #[tokio::test]
    async fn unfeaturing_refreshes_featured_cache() {
        let (events, notifier) = service();
        assert_eq!(events.featured_events(false).await.unwrap().len(), 3);

        let mut event = events.get_event(4, false).await.unwrap();
        event.is_featured_event = false;
        events.update(4, &draft_from(&event)).await.unwrap();

        let featured = events.featured_events(false).await.unwrap();
        assert_eq!(featured.len(), 2);
        assert!(featured.iter().all(|e| e.id != 4));
        assert_eq!(notifier.last().unwrap().kind, NotificationKind::Valid);
    }

    #[tokio::test]
    async fn deleting_a_featured_event_refreshes_lists() {
        let (events, _) = service();
        events.home_page_events(false).await.unwrap();
        events.featured_events(false).await.unwrap();

        events.delete(4).await.unwrap();

        let featured = events.featured_events(false).await.unwrap();
        assert_eq!(featured.iter().map(|e| e.id).collect::<Vec<_>>(), vec![7, 1]);
        let home = events.home_page_events(false).await.unwrap();
        assert!(home.iter().all(|e| e.id != 4));
    }

    #[tokio::test]
    async fn cancelled_event_leaves_front_page() {
        let (events, _) = service();
        events.home_page_events(false).await.unwrap();
        events.featured_events(false).await.unwrap();

        events.update_status(4, EventStatus::Cancelled).await.unwrap();

        let featured = events.featured_events(false).await.unwrap();
        assert_eq!(featured.iter().map(|e| e.id).collect::<Vec<_>>(), vec![7, 1]);
        let home = events.home_page_events(false).await.unwrap();
        assert_eq!(home.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 7, 2, 1]);

        events.update_status(4, EventStatus::Published).await.unwrap();
        let featured = events.featured_events(false).await.unwrap();
        assert_eq!(featured.iter().map(|e| e.id).collect::<Vec<_>>(), vec![7, 4, 1]);
    }

    #[tokio::test]
    async fn short_home_list_is_still_cached() {
        let (events, _) = service();
        assert_eq!(events.home_page_events(false).await.unwrap().len(), 5);

        events.api.delete_event(3).await.unwrap();
        assert_eq!(events.home_page_events(false).await.unwrap().len(), 5);
        assert_eq!(events.home_page_events(true).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn missing_event_is_reported() {
        let (events, notifier) = service();
        let err = events.get_event(999, false).await.unwrap_err();
        assert!(err.is_status(404));
        assert_eq!(notifier.last().unwrap().message, "Événement non trouvé.");
    }

    #[tokio::test]
    async fn detail_cache_survives_until_forced() {
        let (events, _) = service();
        events.get_event(2, false).await.unwrap();
        events.api.delete_event(2).await.unwrap();

        assert_eq!(events.get_event(2, false).await.unwrap().id, 2);
        assert!(events.get_event(2, true).await.is_err());
    }

    #[tokio::test]
    async fn latest_and_upcoming() {
        let (events, _) = service();
        let latest = events.latest_events(2).await.unwrap();
        assert_eq!(latest.iter().map(|e| e.id).collect::<Vec<_>>(), vec![1, 6]);

        let now = Utc.with_ymd_and_hms(2027, 3, 1, 0, 0, 0).unwrap();
        let upcoming = events
            .upcoming_events(now, EventSearchParams::default())
            .await
            .unwrap();
        let ids: Vec<u64> = upcoming.items().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![4, 6, 1]);
    }

    #[test]
    fn edit_rights_follow_structure() {
        let admin = JwtPayload::new("admin@example.com", 1, "STRUCTURE_ADMINISTRATOR")
            .with_structure(Some(1), false);
        let spectator = JwtPayload::new("x@y.z", 3, "SPECTATOR");

        let mut e = Event {
            structure_id: 1,
            ..sample()
        };
        assert!(can_edit_event(&e, Some(&admin)));
        assert!(!can_edit_event(&e, Some(&spectator)));
        assert!(!can_edit_event(&e, None));
        e.structure_id = 2;
        assert!(!can_edit_event(&e, Some(&admin)));
    }

    fn sample() -> Event {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "name": "Sample",
            "category": {"id": 1, "name": "Music"},
            "startDate": "2026-01-01T20:00:00Z",
            "endDate": "2026-01-01T23:00:00Z",
            "structureId": 1,
            "isFreeEvent": true,
            "status": "published"
        }))
        .unwrap()
    }

    #[test]
    fn past_events_are_dropped() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 22, 0, 0).unwrap();
        assert_eq!(filter_events_by_date(vec![sample()], false, now).len(), 1);

        let later = now + chrono::Duration::hours(2);
        assert!(filter_events_by_date(vec![sample()], false, later).is_empty());
        assert_eq!(filter_events_by_date(vec![sample()], true, later).len(), 1);
    }
}
