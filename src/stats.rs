//! Dashboard figures computed from event data.

use chrono::{DateTime, Utc};

use crate::model::{
    ChartData, ChartDataset, Event, EventStatistics, EventStatus, StructureDashboardStats,
};

const TOP_EVENTS: usize = 5;

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Percentage of `capacity` taken by `sold`, to one decimal. 0 for an
/// event without capacity.
pub fn fill_rate(sold: u32, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    round1(f64::from(sold) * 100.0 / f64::from(capacity))
}

fn chart(chart_type: &str, labels: Vec<String>, label: &str, data: Vec<f64>) -> ChartData {
    ChartData {
        chart_type: chart_type.to_owned(),
        labels,
        datasets: vec![ChartDataset {
            label: label.to_owned(),
            data,
        }],
    }
}

/// Aggregates the events of one structure.
pub fn structure_dashboard(
    events: &[Event],
    structure_id: u64,
    now: DateTime<Utc>,
) -> StructureDashboardStats {
    let owned: Vec<&Event> = events
        .iter()
        .filter(|e| e.structure_id == structure_id && e.status != EventStatus::Cancelled)
        .collect();

    let upcoming: Vec<&Event> = owned.iter().copied().filter(|e| e.start_date > now).collect();

    let rates: Vec<f64> = owned
        .iter()
        .filter(|e| e.total_capacity() > 0)
        .map(|e| fill_rate(e.tickets_sold(), e.total_capacity()))
        .collect();
    let average_attendance_rate = if rates.is_empty() {
        0.0
    } else {
        round1(rates.iter().sum::<f64>() / rates.len() as f64)
    };

    let mut top = owned.clone();
    top.sort_by(|a, b| b.tickets_sold().cmp(&a.tickets_sold()));
    top.truncate(TOP_EVENTS);

    let mut categories: Vec<(String, u32)> = Vec::new();
    for event in &owned {
        match categories.iter_mut().find(|(name, _)| *name == event.category.name) {
            Some((_, sold)) => *sold += event.tickets_sold(),
            None => categories.push((event.category.name.clone(), event.tickets_sold())),
        }
    }

    StructureDashboardStats {
        upcoming_events_count: upcoming.len() as u32,
        total_tickets_reserved: owned.iter().map(|e| e.tickets_sold()).sum(),
        total_expected_attendees: upcoming.iter().map(|e| e.tickets_sold()).sum(),
        average_attendance_rate,
        top_events_chart: chart(
            "bar",
            top.iter().map(|e| e.name.clone()).collect(),
            "Billets vendus",
            top.iter().map(|e| f64::from(e.tickets_sold())).collect(),
        ),
        attendance_by_category_chart: chart(
            "pie",
            categories.iter().map(|(name, _)| name.clone()).collect(),
            "Billets vendus",
            categories.iter().map(|(_, sold)| f64::from(*sold)).collect(),
        ),
    }
}

/// Figures for a single event. Tickets of an event that has ended count as
/// scanned.
pub fn event_statistics(event: &Event, now: DateTime<Utc>) -> EventStatistics {
    let capacity = event.total_capacity();
    let sold = event.tickets_sold();
    let scanned = if event.end_date <= now { sold } else { 0 };

    let zones: Vec<_> = event.seating_zones.iter().filter(|z| z.is_active).collect();

    EventStatistics {
        event_id: event.id,
        event_name: event.name.clone(),
        fill_percentage: fill_rate(sold, capacity),
        unique_reservation_amount: sold,
        attributed_tickets_amount: sold,
        scanned_tickets_number: scanned,
        zone_fill_rate_chart: chart(
            "bar",
            zones.iter().map(|z| z.name.clone()).collect(),
            "Taux de remplissage (%)",
            zones
                .iter()
                .map(|z| fill_rate(z.tickets_sold, z.max_capacity))
                .collect(),
        ),
        ticket_status_chart: chart(
            "doughnut",
            vec!["Scannés".into(), "Attribués".into(), "Disponibles".into()],
            "Billets",
            vec![
                f64::from(scanned),
                f64::from(sold - scanned),
                f64::from(capacity.saturating_sub(sold)),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::model::{Address, Category, SeatingType, SeatingZone};

    fn zone(name: &str, capacity: u32, sold: u32, active: bool) -> SeatingZone {
        SeatingZone {
            id: None,
            name: name.into(),
            area_id: 1,
            max_capacity: capacity,
            ticket_price: Some(10.0),
            is_active: active,
            seating_type: SeatingType::Seated,
            row_count: None,
            seats_per_row: None,
            tickets_sold: sold,
        }
    }

    fn event(id: u64, category: &str, start: DateTime<Utc>, zones: Vec<SeatingZone>) -> Event {
        Event {
            id,
            name: format!("Event {id}"),
            category: Category {
                id: 1,
                name: category.into(),
            },
            short_description: None,
            full_description: String::new(),
            genres: vec![],
            tags: vec![],
            start_date: start,
            end_date: start + Duration::hours(3),
            address: Address::default(),
            structure_id: 1,
            area_ids: vec![1],
            is_free_event: false,
            default_seating_type: SeatingType::Seated,
            seating_zones: zones,
            display_on_homepage: false,
            is_featured_event: false,
            links: vec![],
            main_photo_url: None,
            event_photo_urls: vec![],
            status: EventStatus::Published,
            created_at: None,
            updated_at: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fill_rate_rounds_and_handles_zero_capacity() {
        assert_eq!(fill_rate(1, 3), 33.3);
        assert_eq!(fill_rate(5, 0), 0.0);
    }

    #[test]
    fn dashboard_aggregates_structure_events() {
        let past = event(1, "Concert", now() - Duration::days(10), vec![zone("A", 100, 80, true)]);
        let soon = event(2, "Théâtre", now() + Duration::days(3), vec![zone("A", 200, 50, true)]);
        let mut other = event(3, "Concert", now() + Duration::days(3), vec![zone("A", 10, 10, true)]);
        other.structure_id = 2;

        let stats = structure_dashboard(&[past, soon, other], 1, now());

        assert_eq!(stats.upcoming_events_count, 1);
        assert_eq!(stats.total_tickets_reserved, 130);
        assert_eq!(stats.total_expected_attendees, 50);
        assert_eq!(stats.average_attendance_rate, 52.5);
        assert_eq!(stats.top_events_chart.labels, vec!["Event 1", "Event 2"]);
        assert_eq!(stats.attendance_by_category_chart.labels, vec!["Concert", "Théâtre"]);
    }

    #[test]
    fn event_statistics_ignore_inactive_zones() {
        let e = event(
            7,
            "Concert",
            now() - Duration::days(1),
            vec![zone("Fosse", 100, 25, true), zone("Balcon", 50, 0, false)],
        );
        let stats = event_statistics(&e, now());

        assert_eq!(stats.fill_percentage, 25.0);
        assert_eq!(stats.scanned_tickets_number, 25);
        assert_eq!(stats.zone_fill_rate_chart.labels, vec!["Fosse"]);
        assert_eq!(stats.ticket_status_chart.datasets[0].data, vec![25.0, 0.0, 75.0]);
    }
}
