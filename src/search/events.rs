use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::{Page, PageLimits, SortDirection, contains_ci, normalize_text, paginate};
use crate::model::{Event, EventStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventSortField {
    StartDate,
    Name,
    Price,
    CreatedAt,
}

impl EventSortField {
    pub fn as_str(self) -> &'static str {
        match self {
            EventSortField::StartDate => "startDate",
            EventSortField::Name => "name",
            EventSortField::Price => "price",
            EventSortField::CreatedAt => "createdAt",
        }
    }

    fn compare(self, a: &Event, b: &Event) -> Ordering {
        match self {
            EventSortField::StartDate => a.start_date.cmp(&b.start_date),
            EventSortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            EventSortField::Price => a.min_price().total_cmp(&b.min_price()),
            EventSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        }
    }
}

impl fmt::Display for EventSortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "startDate" | "date" => Ok(EventSortField::StartDate),
            "name" => Ok(EventSortField::Name),
            "price" => Ok(EventSortField::Price),
            "createdAt" => Ok(EventSortField::CreatedAt),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

/// Criteria for an event listing. Every field is optional; an unset or
/// empty criterion does not filter anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSearchParams {
    pub query: Option<String>,
    #[serde(default)]
    pub category_ids: Vec<u64>,
    /// Keep events starting at or after this instant.
    pub start_date: Option<DateTime<Utc>>,
    /// Keep events ending at or before this instant.
    pub end_date: Option<DateTime<Utc>>,
    pub free: Option<bool>,
    pub status: Option<EventStatus>,
    pub display_on_homepage: Option<bool>,
    pub featured: Option<bool>,
    pub structure_id: Option<u64>,
    /// City substring.
    pub location: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub with_photos: Option<bool>,
    /// 1-based.
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub sort_by: Option<EventSortField>,
    pub sort_direction: Option<SortDirection>,
}

impl EventSearchParams {
    pub fn query(query: &str) -> Self {
        Self {
            query: Some(query.to_owned()),
            ..Self::default()
        }
    }

    pub fn sorted(mut self, field: EventSortField, direction: SortDirection) -> Self {
        self.sort_by = Some(field);
        self.sort_direction = Some(direction);
        self
    }

    pub fn paged(mut self, page: usize, page_size: usize) -> Self {
        self.page = Some(page);
        self.page_size = Some(page_size);
        self
    }

    /// Whether `event` satisfies every active criterion.
    pub fn matches(&self, event: &Event) -> bool {
        self.matches_category(event)
            && self.matches_query(event)
            && self.matches_dates(event)
            && self.matches_flags(event)
            && self.matches_location(event)
            && self.matches_tags(event)
            && self.matches_genres(event)
    }

    fn matches_category(&self, event: &Event) -> bool {
        self.category_ids.is_empty() || self.category_ids.contains(&event.category.id)
    }

    fn matches_query(&self, event: &Event) -> bool {
        let Some(q) = normalize_text(self.query.as_deref()) else {
            return true;
        };
        contains_ci(&event.name, &q)
            || event
                .short_description
                .as_deref()
                .is_some_and(|d| contains_ci(d, &q))
            || contains_ci(&event.full_description, &q)
            || event.address.parts().any(|p| contains_ci(p, &q))
            || event.tags.iter().any(|t| contains_ci(t, &q))
    }

    fn matches_dates(&self, event: &Event) -> bool {
        self.start_date.is_none_or(|from| event.start_date >= from)
            && self.end_date.is_none_or(|to| event.end_date <= to)
    }

    fn matches_flags(&self, event: &Event) -> bool {
        (self.free != Some(true) || event.is_free_event)
            && self.featured.is_none_or(|f| event.is_featured_event == f)
            && self
                .display_on_homepage
                .is_none_or(|h| event.display_on_homepage == h)
            && self.status.is_none_or(|s| event.status == s)
            && self.structure_id.is_none_or(|id| event.structure_id == id)
            && (self.with_photos != Some(true) || event.has_photos())
    }

    fn matches_location(&self, event: &Event) -> bool {
        match normalize_text(self.location.as_deref()) {
            Some(city) => contains_ci(&event.address.city, &city),
            None => true,
        }
    }

    fn matches_tags(&self, event: &Event) -> bool {
        self.tags.iter().all(|wanted| {
            event
                .tags
                .iter()
                .any(|t| t.eq_ignore_ascii_case(wanted.trim()))
        })
    }

    fn matches_genres(&self, event: &Event) -> bool {
        self.genres.is_empty()
            || self.genres.iter().any(|wanted| {
                event
                    .genres
                    .iter()
                    .any(|g| g.eq_ignore_ascii_case(wanted.trim()))
            })
    }

    /// Orders `events` in place. Stable: ties keep their input order.
    pub fn sort(&self, events: &mut [Event]) {
        if let Some(field) = self.sort_by {
            let direction = self.sort_direction.unwrap_or_default();
            events.sort_by(|a, b| direction.apply(field.compare(a, b)));
        }
    }

    /// Renders the criteria as HTTP query pairs. List criteria repeat their
    /// key. Pages go out zero-based.
    ///
    /// The back end only bounds the start date, so `end_date` goes out as
    /// `startDateBefore`: a server-side page keeps every event starting by
    /// then, a superset of the local containment rule.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        let mut push = |k: &str, v: String| pairs.push((k.to_owned(), v));
        let rfc3339 = |d: &DateTime<Utc>| d.to_rfc3339_opts(SecondsFormat::Secs, true);

        if let Some(q) = self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            push("query", q.to_owned());
        }
        for id in &self.category_ids {
            push("categoryIds", id.to_string());
        }
        if let Some(d) = &self.start_date {
            push("startDateAfter", rfc3339(d));
        }
        if let Some(d) = &self.end_date {
            push("startDateBefore", rfc3339(d));
        }
        if let Some(free) = self.free {
            push("free", free.to_string());
        }
        if let Some(status) = self.status {
            push("status", status.as_str().to_uppercase());
        }
        if let Some(h) = self.display_on_homepage {
            push("displayOnHomepage", h.to_string());
        }
        if let Some(f) = self.featured {
            push("isFeatured", f.to_string());
        }
        if let Some(id) = self.structure_id {
            push("structureId", id.to_string());
        }
        if let Some(city) = self.location.as_deref().filter(|c| !c.trim().is_empty()) {
            push("city", city.trim().to_owned());
        }
        for tag in &self.tags {
            push("tags", tag.clone());
        }
        for genre in &self.genres {
            push("genres", genre.clone());
        }
        if let Some(p) = self.with_photos {
            push("withPhotos", p.to_string());
        }
        if let Some(page) = self.page {
            push("page", page.max(1).saturating_sub(1).to_string());
        }
        if let Some(size) = self.page_size {
            push("size", size.to_string());
        }
        if let (Some(field), Some(direction)) = (self.sort_by, self.sort_direction) {
            push("sort", format!("{field},{direction}"));
        }
        pairs
    }
}

/// Filters, orders and pages `events` according to `params`.
pub fn search_events(events: &[Event], params: &EventSearchParams, limits: PageLimits) -> Page<Event> {
    let mut found: Vec<Event> = events.iter().filter(|e| params.matches(e)).cloned().collect();
    params.sort(&mut found);
    let (page, size) = limits.resolve(params.page, params.page_size);
    paginate(found, page, size)
}
