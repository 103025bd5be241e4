//! Reservations and the logged-in user's tickets.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::TicketApi;
use crate::error::{Error, Result};
use crate::model::{MAX_PARTICIPANTS, ReservationConfirmation, ReservationRequest, Ticket};
use crate::notification::Notifier;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

pub struct TicketService {
    api: Arc<dyn TicketApi>,
    notifier: Arc<dyn Notifier>,
    mine: Mutex<Option<Vec<Ticket>>>,
}

impl TicketService {
    pub fn new(api: Arc<dyn TicketApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            mine: Mutex::new(None),
        }
    }

    fn fail(&self, what: &str, e: Error) -> Error {
        tracing::error!("{what}: {e}");
        self.notifier.error(&e.to_string());
        e
    }

    /// Books one ticket per participant. The participant count is checked
    /// here before anything is sent.
    pub async fn reserve(&self, request: &ReservationRequest) -> Result<ReservationConfirmation> {
        if !(1..=MAX_PARTICIPANTS).contains(&request.participants.len()) {
            let e = Error::Invalid(format!(
                "Vous devez renseigner entre 1 et {MAX_PARTICIPANTS} participants."
            ));
            return Err(self.fail("Reservation refused", e));
        }
        let confirmation = self.api.create_reservation(request).await.map_err(|e| {
            self.fail(&format!("Reservation for event {} failed", request.event_id), e)
        })?;
        tracing::info!(
            "Reservation {} issued {} ticket(s)",
            confirmation.reservation_id,
            confirmation.tickets.len()
        );
        // next listing picks the new tickets up
        *lock(&self.mine) = None;
        self.notifier
            .success("Réservation effectuée avec succès ! Vos billets ont été émis.");
        Ok(confirmation)
    }

    /// Served from cache unless `force_refresh` is set.
    pub async fn my_tickets(&self, force_refresh: bool) -> Result<Vec<Ticket>> {
        if !force_refresh {
            if let Some(cached) = lock(&self.mine).clone() {
                return Ok(cached);
            }
        }
        let tickets = self
            .api
            .my_tickets()
            .await
            .map_err(|e| self.fail("Could not load tickets", e))?;
        *lock(&self.mine) = Some(tickets.clone());
        Ok(tickets)
    }

    /// Looks in the loaded ticket list first.
    pub async fn ticket(&self, id: &str, force_refresh: bool) -> Result<Ticket> {
        if !force_refresh {
            let cached = lock(&self.mine)
                .as_ref()
                .and_then(|tickets| tickets.iter().find(|t| t.id == id).cloned());
            if let Some(ticket) = cached {
                tracing::debug!("Ticket {id} served from cache");
                return Ok(ticket);
            }
        }
        let ticket = self
            .api
            .ticket(id)
            .await
            .map_err(|e| self.fail(&format!("Could not load ticket {id}"), e))?;
        self.remember(&ticket);
        Ok(ticket)
    }

    pub async fn validate(&self, id: &str) -> Result<Ticket> {
        let ticket = self
            .api
            .validate_ticket(id)
            .await
            .map_err(|e| self.fail(&format!("Validation of ticket {id} failed"), e))?;
        self.remember(&ticket);
        self.notifier.success(&format!(
            "Billet validé avec succès. Nouveau statut: {}",
            ticket.status
        ));
        Ok(ticket)
    }

    /// Forgets the cached tickets, e.g. after logout.
    pub fn clear(&self) {
        *lock(&self.mine) = None;
    }

    /// Replaces the cached copy of `ticket`, if the list is loaded.
    fn remember(&self, ticket: &Ticket) {
        if let Some(tickets) = lock(&self.mine).as_mut() {
            match tickets.iter_mut().find(|t| t.id == ticket.id) {
                Some(slot) => *slot = ticket.clone(),
                None => tickets.push(ticket.clone()),
            }
        }
    }
}
