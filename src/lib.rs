#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

//! Client library for the Tickly ticketing back end: event catalogue
//! search, venue structures, statistics, ticket reservations and the
//! authenticated session.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod jwt;
pub mod model;
pub mod notification;
pub mod search;
pub mod stats;
pub mod storage;
pub mod tickets;

pub use error::{Error, Result};
