#![warn(clippy::pedantic)]

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

use tickly::api::Backends;
use tickly::auth::AuthService;
use tickly::config::AppConfig;
use tickly::events::EventService;
use tickly::model::{
    Address, Event, EventStatus, LoginCredentials, ParticipantInfo, Registration,
    ReservationRequest, Structure, StructureDraft, Ticket,
};
use tickly::notification::TracingNotifier;
use tickly::search::{
    EventSearchParams, EventSortField, Page, SortDirection, StructureSearchParams,
    StructureSortField,
};
use tickly::storage::{FileStorage, MemoryStorage, SessionStore};
use tickly::tickets::TicketService;

#[derive(Parser)]
#[command(name = "tickly")]
#[command(about = "Browse the Tickly event catalogue and manage your session")]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and manage events
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
    /// Browse and manage structures
    Structures {
        #[command(subcommand)]
        command: StructureCommands,
    },
    /// Log in. Without --keep the session ends with the process
    Login {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        keep: bool,
    },
    /// Create an account and log in
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        email: String,
        #[arg(long)]
        password: String,
        /// Register as a structure administrator
        #[arg(long)]
        create_structure: bool,
        #[arg(long)]
        keep: bool,
    },
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Exchange the current token for a fresh one
    Refresh,
    /// Ask for a password reset link
    ResetPassword { email: String },
    /// Structure and event statistics
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
    /// Book tickets and check them at the entrance
    Tickets {
        #[command(subcommand)]
        command: TicketCommands,
    },
}

#[derive(Subcommand)]
enum EventCommands {
    /// Filter, sort and page the catalogue
    Search {
        query: Option<String>,
        #[arg(long = "category")]
        categories: Vec<u64>,
        /// Events starting at or after this RFC 3339 instant
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Events ending at or before this RFC 3339 instant
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        #[arg(long)]
        free: bool,
        #[arg(long)]
        featured: bool,
        #[arg(long)]
        homepage: bool,
        #[arg(long)]
        status: Option<EventStatus>,
        #[arg(long)]
        structure: Option<u64>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long = "genre")]
        genres: Vec<String>,
        #[arg(long)]
        with_photos: bool,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        page_size: Option<usize>,
        /// startDate, name, price or createdAt
        #[arg(long)]
        sort: Option<EventSortField>,
        #[arg(long)]
        desc: bool,
    },
    Show {
        id: u64,
        /// Bypass the detail cache
        #[arg(long)]
        refresh: bool,
    },
    /// Events shown on the home page
    Home,
    Featured,
    Upcoming,
    Latest {
        #[arg(default_value_t = 5)]
        count: usize,
    },
    Categories,
    /// Change the status of an event
    SetStatus { id: u64, status: EventStatus },
    Delete { id: u64 },
}

#[derive(Subcommand)]
enum StructureCommands {
    List {
        query: Option<String>,
        #[arg(long = "type")]
        types: Vec<u64>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        active_areas: bool,
        #[arg(long)]
        min_importance: Option<u32>,
        #[arg(long)]
        max_importance: Option<u32>,
        #[arg(long)]
        page: Option<usize>,
        #[arg(long)]
        page_size: Option<usize>,
        /// name, city, importance or createdAt
        #[arg(long)]
        sort: Option<StructureSortField>,
        #[arg(long)]
        desc: bool,
    },
    Show { id: u64 },
    Types,
    Areas { id: u64 },
    /// Create the structure of the logged-in administrator
    Create {
        name: String,
        #[arg(long)]
        city: String,
        #[arg(long)]
        street: String,
        #[arg(long, default_value = "France")]
        country: String,
        #[arg(long = "type")]
        types: Vec<u64>,
    },
}

#[derive(Subcommand)]
enum StatsCommands {
    /// Dashboard of a structure, the user's own by default
    Dashboard { structure_id: Option<u64> },
    Event { id: u64 },
}

#[derive(Subcommand)]
enum TicketCommands {
    /// Book up to four tickets in one zone of an event
    Reserve {
        event_id: u64,
        #[arg(long)]
        zone: u64,
        /// `First,Last,email`, once per ticket
        #[arg(long = "participant", value_parser = parse_participant, required = true)]
        participants: Vec<ParticipantInfo>,
    },
    /// Tickets booked by the logged-in user
    Mine {
        #[arg(long)]
        refresh: bool,
    },
    Show {
        id: String,
        #[arg(long)]
        refresh: bool,
    },
    /// Mark a ticket as used
    Validate { id: String },
}

fn parse_participant(raw: &str) -> Result<ParticipantInfo, String> {
    let mut parts = raw.split(',').map(str::trim);
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(last), Some(email), None) => Ok(ParticipantInfo {
            first_name: first.to_owned(),
            last_name: last.to_owned(),
            email: email.to_owned(),
        }),
        _ => Err(format!("expected First,Last,email but got '{raw}'")),
    }
}

fn direction(desc: bool) -> SortDirection {
    if desc {
        SortDirection::Desc
    } else {
        SortDirection::Asc
    }
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_event_line(event: &Event) {
    let price = if event.is_free_event {
        "gratuit".to_owned()
    } else {
        format!("dès {:.2} €", event.min_price())
    };
    println!(
        "#{:<4} {}  {}  [{}]  {}, {}  {}",
        event.id,
        event.start_date.format("%Y-%m-%d %H:%M"),
        event.name,
        event.category.name,
        event.address.city,
        event.status,
        price
    );
}

fn print_events(events: &[Event], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("Aucun événement.");
    }
    events.iter().for_each(print_event_line);
    Ok(())
}

fn print_event_page(page: &Page<Event>, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(page);
    }
    print_events(page.items(), false)?;
    println!(
        "page {}/{} ({} événements)",
        page.page(),
        (*page.total_pages()).max(1),
        page.total_items()
    );
    Ok(())
}

fn print_ticket_line(ticket: &Ticket) {
    println!(
        "{}  {}  {} / {}  {} {}  {}",
        ticket.id,
        ticket.event_snapshot.start_date.format("%Y-%m-%d %H:%M"),
        ticket.event_snapshot.name,
        ticket.audience_zone_snapshot.name,
        ticket.participant.first_name,
        ticket.participant.last_name,
        ticket.status
    );
}

fn print_tickets(tickets: &[Ticket], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&tickets);
    }
    if tickets.is_empty() {
        println!("Aucun billet.");
    }
    tickets.iter().for_each(print_ticket_line);
    Ok(())
}

async fn run_tickets(
    command: TicketCommands,
    tickets: &TicketService,
    auth: &AuthService,
    json: bool,
) -> anyhow::Result<()> {
    auth.ensure_fresh(Utc::now())?;
    match command {
        TicketCommands::Reserve {
            event_id,
            zone,
            participants,
        } => {
            let request = ReservationRequest {
                event_id,
                audience_zone_id: zone,
                participants,
                user_id: auth.current_user().map(|u| *u.user_id()),
            };
            let confirmation = tickets.reserve(&request).await?;
            if json {
                return print_json(&confirmation);
            }
            println!("Réservation {}", confirmation.reservation_id);
            print_tickets(&confirmation.tickets, false)?;
        }
        TicketCommands::Mine { refresh } => {
            print_tickets(&tickets.my_tickets(refresh).await?, json)?;
        }
        TicketCommands::Show { id, refresh } => {
            let ticket = tickets.ticket(&id, refresh).await?;
            if json {
                return print_json(&ticket);
            }
            print_ticket_line(&ticket);
            println!("QR: {}", ticket.qr_code_value);
        }
        TicketCommands::Validate { id } => {
            let ticket = tickets.validate(&id).await?;
            print_ticket_line(&ticket);
        }
    }
    Ok(())
}

fn print_structure_line(structure: &Structure) {
    let types: Vec<&str> = structure.types.iter().map(|t| t.name.as_str()).collect();
    println!(
        "#{:<4} {}  ({})  {}  importance: {}",
        structure.id,
        structure.name,
        types.join(", "),
        structure.address.city,
        structure
            .importance
            .map_or_else(|| "-".to_owned(), |i| i.to_string())
    );
}

async fn run_events(
    command: EventCommands,
    events: &EventService,
    auth: &AuthService,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        EventCommands::Search {
            query,
            categories,
            from,
            to,
            free,
            featured,
            homepage,
            status,
            structure,
            city,
            tags,
            genres,
            with_photos,
            page,
            page_size,
            sort,
            desc,
        } => {
            let params = EventSearchParams {
                query,
                category_ids: categories,
                start_date: from,
                end_date: to,
                free: flag(free),
                status,
                display_on_homepage: flag(homepage),
                featured: flag(featured),
                structure_id: structure,
                location: city,
                tags,
                genres,
                with_photos: flag(with_photos),
                page,
                page_size,
                sort_by: sort,
                sort_direction: Some(direction(desc)),
            };
            let found = events.search(&params).await?;
            print_event_page(&found, json)?;
        }
        EventCommands::Show { id, refresh } => {
            let event = events.get_event(id, refresh).await?;
            if json {
                return print_json(&event);
            }
            print_event_line(&event);
            println!("{}", event.full_description);
            for zone in event.seating_zones.iter().filter(|z| z.is_active) {
                println!(
                    "  - {}: {}/{} places{}",
                    zone.name,
                    zone.tickets_sold,
                    zone.max_capacity,
                    zone.sale_price()
                        .map(|p| format!(", {p:.2} €"))
                        .unwrap_or_default()
                );
            }
            if tickly::events::can_edit_event(&event, auth.current_user().as_ref()) {
                println!("(vous pouvez modifier cet événement)");
            }
        }
        EventCommands::Home => print_events(&events.home_page_events(false).await?, json)?,
        EventCommands::Featured => print_events(&events.featured_events(false).await?, json)?,
        EventCommands::Upcoming => {
            let page = events
                .upcoming_events(Utc::now(), EventSearchParams::default())
                .await?;
            print_event_page(&page, json)?;
        }
        EventCommands::Latest { count } => print_events(&events.latest_events(count).await?, json)?,
        EventCommands::Categories => {
            let categories = events.categories().await?;
            if json {
                return print_json(&categories);
            }
            for c in categories {
                println!("{:>3}  {}", c.id, c.name);
            }
        }
        EventCommands::SetStatus { id, status } => {
            let event = events.update_status(id, status).await?;
            print_event_line(&event);
        }
        EventCommands::Delete { id } => events.delete(id).await?,
    }
    Ok(())
}

async fn run_structures(
    command: StructureCommands,
    backends: &Backends,
    auth: &AuthService,
    json: bool,
) -> anyhow::Result<()> {
    let api = &backends.structures;
    match command {
        StructureCommands::List {
            query,
            types,
            city,
            location,
            active_areas,
            min_importance,
            max_importance,
            page,
            page_size,
            sort,
            desc,
        } => {
            let params = StructureSearchParams {
                query,
                type_ids: types,
                city,
                location,
                has_active_areas: flag(active_areas),
                min_importance,
                max_importance,
                page,
                page_size,
                sort_by: sort,
                sort_direction: Some(direction(desc)),
            };
            let found = api.search_structures(&params).await?;
            if json {
                return print_json(&found);
            }
            found.items().iter().for_each(print_structure_line);
            println!(
                "page {}/{} ({} structures)",
                found.page(),
                (*found.total_pages()).max(1),
                found.total_items()
            );
        }
        StructureCommands::Show { id } => {
            let structure = api.get_structure(id).await?;
            if json {
                return print_json(&structure);
            }
            print_structure_line(&structure);
            for area in &structure.areas {
                let state = if area.is_active { "active" } else { "inactive" };
                println!("  - {} ({} places, {state})", area.name, area.max_capacity);
            }
        }
        StructureCommands::Types => {
            let types = api.structure_types().await?;
            if json {
                return print_json(&types);
            }
            for t in types {
                println!("{:>3}  {}", t.id, t.name);
            }
        }
        StructureCommands::Areas { id } => {
            let areas = api.areas(id).await?;
            if json {
                return print_json(&areas);
            }
            for a in areas {
                println!("{:>3}  {} ({} places)", a.id, a.name, a.max_capacity);
            }
        }
        StructureCommands::Create {
            name,
            city,
            street,
            country,
            types,
        } => {
            auth.ensure_fresh(Utc::now())?;
            let draft = StructureDraft {
                name,
                type_ids: types,
                description: None,
                address: Address {
                    country,
                    city,
                    street,
                    number: None,
                    zip_code: None,
                },
                phone: None,
                email: None,
                website_url: None,
                socials_url: vec![],
            };
            let created = api.create_structure(&draft).await?;
            let route = auth.update_token(&created.new_token)?;
            if let Some(structure) = &created.created_structure {
                print_structure_line(structure);
            }
            println!("-> {route}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a builder for `FmtSubscriber`.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("Invalid configuration")?;

    let persistent = FileStorage::open(config.persistent_storage_path())
        .context("Failed to open persistent storage")?;
    let store = Arc::new(SessionStore::new(
        Box::new(persistent),
        Box::new(MemoryStorage::new()),
    ));
    let backends = Backends::from_config(&config, store.clone())?;
    let notifier = Arc::new(TracingNotifier);

    let auth = AuthService::new(backends.auth.clone(), store, notifier.clone());
    let events = EventService::new(
        backends.events.clone(),
        notifier.clone(),
        config.home_count,
        config.featured_count,
    );
    let tickets = TicketService::new(backends.tickets.clone(), notifier);

    auth.restore(Utc::now())?;

    match cli.command {
        Commands::Events { command } => run_events(command, &events, &auth, cli.json).await?,
        Commands::Structures { command } => run_structures(command, &backends, &auth, cli.json).await?,
        Commands::Login {
            email,
            password,
            keep,
        } => {
            let route = auth
                .login(&LoginCredentials { email, password }, keep)
                .await?;
            println!("-> {route}");
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            create_structure,
            keep,
        } => {
            let registration = Registration {
                first_name,
                last_name,
                email,
                password,
                create_structure,
            };
            let route = auth.register(&registration, keep).await?;
            println!("-> {route}");
        }
        Commands::Logout => {
            let route = auth.logout()?;
            tickets.clear();
            println!("-> {route}");
        }
        Commands::Whoami => match auth.current_user() {
            Some(user) if cli.json => print_json(&user)?,
            Some(user) => {
                println!("{} (#{}), {}", user.sub(), user.user_id(), user.role());
                if let Some(id) = user.structure_id() {
                    println!("structure #{id}");
                }
                println!("-> {}", tickly::auth::redirect_for(&user));
            }
            None => println!("Non connecté."),
        },
        Commands::Refresh => {
            let route = auth.refresh().await?;
            println!("-> {route}");
        }
        Commands::ResetPassword { email } => auth.request_password_reset(&email).await?,
        Commands::Stats { command } => match command {
            StatsCommands::Dashboard { structure_id } => {
                let id = structure_id
                    .or_else(|| auth.structure_id())
                    .context("No structure given and the current user has none")?;
                let dashboard = backends.stats.structure_dashboard(id).await?;
                print_json(&dashboard)?;
            }
            StatsCommands::Event { id } => {
                let stats = backends.stats.event_statistics(id).await?;
                print_json(&stats)?;
            }
        },
        Commands::Tickets { command } => run_tickets(command, &tickets, &auth, cli.json).await?,
    }

    auth.clear_session_if_not_kept()?;
    Ok(())
}
