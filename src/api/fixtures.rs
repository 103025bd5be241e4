//! Seed data served by [`super::MockBackend`].

use chrono::{DateTime, TimeZone, Utc};

use crate::model::{
    Address, Area, Category, Event, EventStatus, SeatingType, SeatingZone, Structure,
    StructureType, UserRole,
};

/// An account known to the mock back end.
#[derive(Debug, Clone, PartialEq)]
pub struct MockUser {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub structure_id: Option<u64>,
    pub needs_structure_setup: bool,
}

fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .unwrap_or_default()
}

fn address(city: &str, street: &str, zip: &str) -> Address {
    Address {
        country: "France".into(),
        city: city.into(),
        street: street.into(),
        number: None,
        zip_code: Some(zip.into()),
    }
}

fn user(
    id: u64,
    first: &str,
    last: &str,
    email: &str,
    role: UserRole,
    structure_id: Option<u64>,
) -> MockUser {
    MockUser {
        id,
        first_name: first.into(),
        last_name: last.into(),
        email: email.into(),
        password: if id == 1 { "rootroot" } else { "password123" }.into(),
        role,
        structure_id,
        needs_structure_setup: role == UserRole::StructureAdministrator && structure_id.is_none(),
    }
}

pub(crate) fn users() -> Vec<MockUser> {
    vec![
        user(1, "Admin", "Principal", "admin@example.com", UserRole::StructureAdministrator, Some(1)),
        user(2, "Marie", "Dupont", "marie.dupont@example.com", UserRole::StructureAdministrator, Some(2)),
        user(3, "Lucie", "Moreau", "lucie.moreau@example.com", UserRole::Spectator, None),
        user(4, "Paul", "Bernard", "paul.bernard@example.com", UserRole::ReservationService, Some(1)),
        user(5, "Nina", "Roux", "nina.roux@example.com", UserRole::StructureAdministrator, None),
    ]
}

pub(crate) fn categories() -> Vec<Category> {
    ["Music", "Theater", "Sport", "Conference", "Exhibition", "Festival", "Other"]
        .into_iter()
        .zip(1..)
        .map(|(name, id)| Category {
            id,
            name: name.into(),
        })
        .collect()
}

pub(crate) fn structure_types() -> Vec<StructureType> {
    [
        "Salle de concert",
        "Théâtre",
        "Centre de conférence",
        "Espace polyvalent",
        "Bar / Club",
    ]
    .into_iter()
    .zip(1..)
    .map(|(name, id)| StructureType {
        id,
        name: name.into(),
        icon: None,
    })
    .collect()
}

fn area(id: u64, structure_id: u64, name: &str, max_capacity: u32, is_active: bool) -> Area {
    Area {
        id,
        name: name.into(),
        max_capacity,
        is_active,
        structure_id: Some(structure_id),
        description: None,
    }
}

fn structure(
    id: u64,
    name: &str,
    type_ids: &[u64],
    address: Address,
    areas: Vec<Area>,
    importance: Option<u32>,
    created_at: DateTime<Utc>,
) -> Structure {
    let types = structure_types()
        .into_iter()
        .filter(|t| type_ids.contains(&t.id))
        .collect();
    Structure {
        id,
        name: name.into(),
        types,
        description: None,
        address,
        areas,
        phone: None,
        email: None,
        website_url: None,
        socials_url: vec![],
        logo_url: None,
        importance,
        created_at: Some(created_at),
        updated_at: Some(created_at),
    }
}

pub(crate) fn structures() -> Vec<Structure> {
    vec![
        structure(
            1,
            "Le Zénith",
            &[1],
            address("Paris", "Avenue Jean Jaurès", "75019"),
            vec![
                area(1, 1, "Grande salle", 6000, true),
                area(2, 1, "Fosse", 2000, true),
            ],
            Some(90),
            at(2024, 1, 10, 9),
        ),
        structure(
            2,
            "Théâtre de la Ville",
            &[2],
            address("Paris", "Place du Châtelet", "75004"),
            vec![area(3, 2, "Salle principale", 1000, true)],
            Some(75),
            at(2024, 3, 2, 9),
        ),
        structure(
            3,
            "Centre des Congrès",
            &[3, 4],
            address("Lyon", "Quai Charles de Gaulle", "69006"),
            vec![
                area(4, 3, "Amphithéâtre", 3000, true),
                area(5, 3, "Salon Rhône", 400, true),
            ],
            Some(60),
            at(2024, 5, 20, 9),
        ),
        structure(
            4,
            "Le Dôme",
            &[4, 5],
            address("Marseille", "Boulevard Jean Moulin", "13005"),
            vec![area(6, 4, "Salle unique", 8500, false)],
            None,
            at(2024, 9, 1, 9),
        ),
    ]
}

fn zone(name: &str, area_id: u64, capacity: u32, price: Option<f64>, sold: u32) -> SeatingZone {
    SeatingZone {
        id: None,
        name: name.into(),
        area_id,
        max_capacity: capacity,
        ticket_price: price,
        is_active: true,
        seating_type: SeatingType::Mixed,
        row_count: None,
        seats_per_row: None,
        tickets_sold: sold,
    }
}

/// Gives every unnumbered zone an id derived from its event, so zones can be
/// referenced by reservations.
pub(crate) fn number_zones(event: &mut Event) {
    for (idx, zone) in (1u64..).zip(event.seating_zones.iter_mut()) {
        if zone.id.is_none() {
            zone.id = Some(event.id * 100 + idx);
        }
    }
}

struct Seed {
    id: u64,
    name: &'static str,
    category: u64,
    structure: u64,
    start: DateTime<Utc>,
    hours: i64,
    zones: Vec<SeatingZone>,
    tags: &'static [&'static str],
    genres: &'static [&'static str],
    status: EventStatus,
}

impl Seed {
    fn into_event(self, categories: &[Category], structures: &[Structure]) -> Event {
        let category = categories
            .iter()
            .find(|c| c.id == self.category)
            .cloned()
            .unwrap_or_else(|| Category {
                id: self.category,
                name: String::new(),
            });
        let address = structures
            .iter()
            .find(|s| s.id == self.structure)
            .map(|s| s.address.clone())
            .unwrap_or_default();
        let mut area_ids: Vec<u64> = self.zones.iter().map(|z| z.area_id).collect();
        area_ids.dedup();
        let is_free_event = self.zones.iter().all(|z| z.sale_price().is_none());
        let created = self.start - chrono::Duration::days(60);

        Event {
            id: self.id,
            name: self.name.into(),
            category,
            short_description: None,
            full_description: format!("{} à {}", self.name, address.city),
            genres: self.genres.iter().map(|g| g.to_string()).collect(),
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
            start_date: self.start,
            end_date: self.start + chrono::Duration::hours(self.hours),
            address,
            structure_id: self.structure,
            area_ids,
            is_free_event,
            default_seating_type: SeatingType::Mixed,
            seating_zones: self.zones,
            display_on_homepage: false,
            is_featured_event: false,
            links: vec![],
            main_photo_url: None,
            event_photo_urls: vec![],
            status: self.status,
            created_at: Some(created),
            updated_at: Some(created),
        }
    }
}

pub(crate) fn events() -> Vec<Event> {
    let categories = categories();
    let structures = structures();
    let seeds = vec![
        Seed {
            id: 1,
            name: "Festival de Musique d'été",
            category: 6,
            structure: 1,
            start: at(2027, 7, 10, 16),
            hours: 30,
            zones: vec![zone("Fosse", 2, 2000, Some(45.0), 1200), zone("Gradins", 1, 4000, Some(60.0), 2100)],
            tags: &["plein air", "été"],
            genres: &["Pop", "Électro"],
            status: EventStatus::Published,
        },
        Seed {
            id: 2,
            name: "Roméo et Juliette",
            category: 2,
            structure: 2,
            start: at(2027, 2, 14, 20),
            hours: 3,
            zones: vec![zone("Orchestre", 3, 600, Some(35.0), 420), zone("Balcon", 3, 400, Some(22.0), 150)],
            tags: &["classique"],
            genres: &["Tragédie"],
            status: EventStatus::Published,
        },
        Seed {
            id: 3,
            name: "Exposition Art Numérique",
            category: 5,
            structure: 3,
            start: at(2026, 11, 5, 10),
            hours: 8,
            zones: vec![zone("Salon", 5, 400, None, 310)],
            tags: &["gratuit", "famille"],
            genres: &["Art numérique"],
            status: EventStatus::Published,
        },
        Seed {
            id: 4,
            name: "Conférence Tech: l'avenir de l'IA",
            category: 4,
            structure: 3,
            start: at(2027, 3, 18, 9),
            hours: 9,
            zones: vec![zone("Amphithéâtre", 4, 3000, Some(120.0), 800)],
            tags: &["tech", "ia"],
            genres: &["Innovation"],
            status: EventStatus::Published,
        },
        Seed {
            id: 5,
            name: "Concert Jazz",
            category: 1,
            structure: 1,
            start: at(2025, 6, 21, 19),
            hours: 4,
            zones: vec![zone("Grande salle", 1, 6000, Some(30.0), 5400)],
            tags: &["jazz"],
            genres: &["Jazz"],
            status: EventStatus::Completed,
        },
        Seed {
            id: 6,
            name: "Match de gala",
            category: 3,
            structure: 4,
            start: at(2027, 5, 2, 18),
            hours: 2,
            zones: vec![zone("Tribune", 6, 8500, Some(15.0), 0)],
            tags: &["football"],
            genres: &[],
            status: EventStatus::Draft,
        },
        Seed {
            id: 7,
            name: "Soirée Électro",
            category: 1,
            structure: 1,
            start: at(2026, 12, 31, 22),
            hours: 6,
            zones: vec![zone("Fosse", 2, 2000, Some(25.0), 1950)],
            tags: &["nuit", "électro"],
            genres: &["Électro", "Techno"],
            status: EventStatus::Published,
        },
        Seed {
            id: 8,
            name: "Lecture publique",
            category: 7,
            structure: 2,
            start: at(2027, 1, 9, 15),
            hours: 2,
            zones: vec![zone("Salle principale", 3, 1000, Some(0.0), 90)],
            tags: &["gratuit"],
            genres: &["Littérature"],
            status: EventStatus::PendingApproval,
        },
    ];

    let mut events: Vec<Event> = seeds
        .into_iter()
        .map(|s| s.into_event(&categories, &structures))
        .collect();

    for e in &mut events {
        number_zones(e);
        e.display_on_homepage = matches!(e.id, 1 | 2 | 3 | 4 | 7);
        e.is_featured_event = matches!(e.id, 1 | 4 | 7);
        if e.is_featured_event {
            e.main_photo_url = Some(format!("https://cdn.tickly.test/events/{}.jpg", e.id));
        }
    }
    events
}
