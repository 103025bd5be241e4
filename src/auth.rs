//! Session lifecycle: login, token storage, expiry, refresh and the
//! landing page a user is sent to after authenticating.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::api::AuthApi;
use crate::error::{Error, Result};
use crate::jwt;
use crate::model::{AuthResponse, JwtPayload, LoginCredentials, Registration, UserRole};
use crate::notification::Notifier;
use crate::storage::{
    AUTH_KEYS, REFRESH_TOKEN_KEY, STRUCTURE_ID_KEY, SessionStore, TOKEN_KEY, USER_ROLE_KEY,
};

/// Where the application sends the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    CreateStructure,
    Admin,
    User,
    Staff,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::CreateStructure => "/create-structure",
            Route::Admin => "/admin",
            Route::User => "/user",
            Route::Staff => "/staff",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Landing page for a decoded token. Structure setup takes precedence
/// over the role.
pub fn redirect_for(payload: &JwtPayload) -> Route {
    if payload.needs_setup() {
        return Route::CreateStructure;
    }
    match payload.user_role() {
        Some(UserRole::StructureAdministrator) => Route::Admin,
        Some(UserRole::Spectator) => Route::User,
        Some(UserRole::ReservationService | UserRole::OrganizationService) => Route::Staff,
        None => {
            tracing::warn!("Unknown role '{}', sending user to login", payload.role());
            Route::Login
        }
    }
}

pub struct AuthService {
    api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
    notifier: Arc<dyn Notifier>,
    current: Mutex<Option<JwtPayload>>,
}

impl AuthService {
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<SessionStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            store,
            notifier,
            current: Mutex::new(None),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<JwtPayload>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn current_user(&self) -> Option<JwtPayload> {
        self.current().clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.current().is_some()
    }

    pub fn structure_id(&self) -> Option<u64> {
        self.current().as_ref().and_then(|p| *p.structure_id())
    }

    /// Whether the current user holds one of `roles`.
    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        self.current()
            .as_ref()
            .and_then(JwtPayload::user_role)
            .is_some_and(|role| roles.contains(&role))
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.store.token()
    }

    pub async fn login(&self, credentials: &LoginCredentials, keep_logged_in: bool) -> Result<Route> {
        match self.api.login(credentials).await {
            Ok(response) => {
                self.store.set_keep_logged_in(keep_logged_in)?;
                let route = self.accept(&response, None)?;
                tracing::info!("User {} logged in", response.user_id());
                self.notifier.success("Connexion réussie ! Bienvenue.");
                Ok(route)
            }
            Err(e) => {
                tracing::error!("Login failed: {e}");
                self.notifier.error(&e.to_string());
                Err(e)
            }
        }
    }

    pub async fn register(&self, registration: &Registration, keep_logged_in: bool) -> Result<Route> {
        match self.api.register(registration).await {
            Ok(response) => {
                self.store.set_keep_logged_in(keep_logged_in)?;
                let route = self.accept(&response, None)?;
                tracing::info!("User {} registered", response.user_id());
                self.notifier
                    .success("Inscription réussie ! Vous êtes maintenant connecté.");
                Ok(route)
            }
            Err(e) => {
                tracing::error!("Registration failed: {e}");
                self.notifier.error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Exchanges the stored refresh token (or the token itself when the
    /// back end issued no refresh token) for a new one. A 401 ends the
    /// session.
    pub async fn refresh(&self) -> Result<Route> {
        let area = self.store.auth_area()?;
        let refresh_token = area.get(REFRESH_TOKEN_KEY)?;
        let presented = match refresh_token.clone() {
            Some(t) => t,
            None => area.get(TOKEN_KEY)?.ok_or(Error::NotAuthenticated)?,
        };

        match self.api.refresh(&presented).await {
            Ok(response) => self.accept(&response, refresh_token),
            Err(e) if e.is_status(401) => {
                tracing::info!("Refresh rejected, ending session");
                self.logout()?;
                Err(e)
            }
            Err(e) => {
                tracing::error!("Token refresh failed: {e}");
                Err(e)
            }
        }
    }

    /// Drops the auth keys from both areas. The keep-logged-in preference
    /// stays.
    pub fn logout(&self) -> Result<Route> {
        *self.current() = None;
        self.store.clear_auth()?;
        tracing::info!("User logged out");
        self.notifier.info("Vous avez été déconnecté.");
        Ok(Route::Home)
    }

    /// Loads the session left in storage by a previous run. An expired or
    /// unreadable token wipes both storage areas.
    pub fn restore(&self, now: DateTime<Utc>) -> Result<Option<JwtPayload>> {
        let Some(token) = self.store.token()? else {
            return Ok(None);
        };
        match jwt::decode_payload(&token) {
            Ok(payload) if !payload.is_expired_at(now) => {
                tracing::info!("Restored session of {}", payload.sub());
                *self.current() = Some(payload.clone());
                Ok(Some(payload))
            }
            Ok(_) => {
                tracing::info!("Stored token has expired, clearing local data");
                self.wipe()?;
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Stored token is unreadable ({e}), clearing local data");
                self.wipe()?;
                Ok(None)
            }
        }
    }

    /// Fails with [`Error::NotAuthenticated`] unless a live token is
    /// stored. Same clearing rule as [`AuthService::restore`].
    pub fn ensure_fresh(&self, now: DateTime<Utc>) -> Result<JwtPayload> {
        self.restore(now)?.ok_or(Error::NotAuthenticated)
    }

    /// Replaces the token after the back end re-issued it, e.g. once the
    /// user's structure was created.
    pub fn update_token(&self, new_token: &str) -> Result<Route> {
        let payload = match jwt::decode_payload(new_token) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Received an unreadable token: {e}");
                self.logout()?;
                self.notifier
                    .error("Erreur de mise à jour de session. Veuillez vous reconnecter.");
                return Err(e);
            }
        };
        let refresh_token = self.store.auth_area()?.get(REFRESH_TOKEN_KEY)?;
        self.save(new_token, refresh_token.as_deref(), &payload)?;
        let route = redirect_for(&payload);
        *self.current() = Some(payload);
        self.notifier.info("Session mise à jour.");
        Ok(route)
    }

    /// Run when the client shuts down: a session the user did not ask to
    /// keep is forgotten.
    pub fn clear_session_if_not_kept(&self) -> Result<()> {
        if self.store.keep_logged_in()? {
            tracing::debug!("Keeping session, keep-logged-in is set");
            return Ok(());
        }
        for key in AUTH_KEYS {
            self.store.session().remove(key)?;
        }
        if self.store.persistent().get(TOKEN_KEY)?.is_none() {
            *self.current() = None;
        }
        tracing::debug!("Session data cleared");
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        match self.api.request_password_reset(email).await {
            Ok(()) => {
                self.notifier.success(
                    "Si un compte existe pour cet email, un lien de réinitialisation de mot de passe a été envoyé.",
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!("Password reset request failed: {e}");
                self.notifier.error(&e.to_string());
                Err(e)
            }
        }
    }

    fn accept(&self, response: &AuthResponse, previous_refresh: Option<String>) -> Result<Route> {
        let payload = match jwt::decode_payload(response.token()) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Back end sent an unreadable token: {e}");
                *self.current() = None;
                self.store.clear_auth()?;
                self.notifier
                    .error("Erreur de session. Veuillez vous reconnecter.");
                return Err(e);
            }
        };
        let refresh = response.refresh_token().clone().or(previous_refresh);
        self.save(response.token(), refresh.as_deref(), &payload)?;
        let route = redirect_for(&payload);
        *self.current() = Some(payload);
        Ok(route)
    }

    /// Writes the session into the area picked by the stored preference,
    /// after dropping whatever either area held.
    fn save(&self, token: &str, refresh_token: Option<&str>, payload: &JwtPayload) -> Result<()> {
        self.store.clear_auth()?;
        let area = self.store.auth_area()?;
        area.set(TOKEN_KEY, token)?;
        if let Some(refresh) = refresh_token {
            area.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        area.set(USER_ROLE_KEY, payload.role())?;
        if let Some(id) = payload.structure_id() {
            area.set(STRUCTURE_ID_KEY, &id.to_string())?;
        }
        Ok(())
    }

    fn wipe(&self) -> Result<()> {
        *self.current() = None;
        self.store.clear_all()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::TimeZone;

    use super::*;
    use crate::api::MockBackend;
    use crate::notification::{MemoryNotifier, NotificationKind};
    use crate::search::PageLimits;
    use crate::storage::KEEP_LOGGED_IN_KEY;

    fn service() -> (AuthService, Arc<SessionStore>, Arc<MemoryNotifier>) {
        let store = Arc::new(SessionStore::in_memory());
        let notifier = Arc::new(MemoryNotifier::new());
        let api = Arc::new(MockBackend::with_fixtures(Duration::ZERO, PageLimits::default()));
        (AuthService::new(api, store.clone(), notifier.clone()), store, notifier)
    }

    fn credentials(email: &str, password: &str) -> LoginCredentials {
        LoginCredentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn redirect_rules() {
        let p = |role: &str| JwtPayload::new("a@b.c", 1, role);
        assert_eq!(redirect_for(&p("STRUCTURE_ADMINISTRATOR")), Route::Admin);
        assert_eq!(redirect_for(&p("SPECTATOR")), Route::User);
        assert_eq!(redirect_for(&p("RESERVATION_SERVICE")), Route::Staff);
        assert_eq!(redirect_for(&p("ORGANIZATION_SERVICE")), Route::Staff);
        assert_eq!(redirect_for(&p("USER")), Route::Login);
        assert_eq!(
            redirect_for(&p("SPECTATOR").with_structure(None, true)),
            Route::CreateStructure
        );
    }

    #[tokio::test]
    async fn session_area_follows_preference() {
        let (auth, store, _) = service();

        auth.login(&credentials("lucie.moreau@example.com", "password123"), false)
            .await
            .unwrap();
        assert!(store.session().get(TOKEN_KEY).unwrap().is_some());
        assert_eq!(store.persistent().get(TOKEN_KEY).unwrap(), None);

        let route = auth
            .login(&credentials("admin@example.com", "rootroot"), true)
            .await
            .unwrap();
        assert_eq!(route, Route::Admin);
        assert!(store.persistent().get(TOKEN_KEY).unwrap().is_some());
        assert_eq!(store.session().get(TOKEN_KEY).unwrap(), None);
        assert_eq!(
            store.persistent().get(STRUCTURE_ID_KEY).unwrap().as_deref(),
            Some("1")
        );
        assert!(auth.has_role(&[UserRole::StructureAdministrator]));
    }

    #[tokio::test]
    async fn failed_login_notifies_and_stores_nothing() {
        let (auth, store, notifier) = service();
        let err = auth
            .login(&credentials("admin@example.com", "wrong"), true)
            .await
            .unwrap_err();
        assert!(err.is_status(401));
        assert_eq!(store.token().unwrap(), None);
        assert!(!store.keep_logged_in().unwrap());

        let last = notifier.last().unwrap();
        assert_eq!(last.kind, NotificationKind::Error);
        assert_eq!(last.message, "Email ou mot de passe incorrect.");
    }

    #[tokio::test]
    async fn logout_keeps_preference() {
        let (auth, store, notifier) = service();
        auth.login(&credentials("admin@example.com", "rootroot"), true)
            .await
            .unwrap();

        assert_eq!(auth.logout().unwrap(), Route::Home);
        assert!(!auth.is_logged_in());
        assert_eq!(store.token().unwrap(), None);
        assert_eq!(
            store.persistent().get(KEEP_LOGGED_IN_KEY).unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(notifier.last().unwrap().kind, NotificationKind::Info);
    }

    #[test]
    fn expired_token_wipes_both_areas() {
        let (auth, store, _) = service();
        let issued = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let token = jwt::issue_mock_token(JwtPayload::new("a@b.c", 1, "SPECTATOR"), issued).unwrap();
        store.set_keep_logged_in(true).unwrap();
        store.persistent().set(TOKEN_KEY, &token).unwrap();
        store.session().set("draft", "x").unwrap();

        let still_valid = issued + chrono::Duration::hours(1);
        assert!(auth.restore(still_valid).unwrap().is_some());
        assert!(auth.is_logged_in());

        let later = issued + chrono::Duration::hours(24);
        assert!(matches!(auth.ensure_fresh(later), Err(Error::NotAuthenticated)));
        assert!(!auth.is_logged_in());
        assert!(!store.keep_logged_in().unwrap());
        assert_eq!(store.persistent().get(TOKEN_KEY).unwrap(), None);
        assert_eq!(store.session().get("draft").unwrap(), None);
    }

    #[test]
    fn garbage_token_is_cleared() {
        let (auth, store, _) = service();
        store.session().set(TOKEN_KEY, "garbage").unwrap();
        assert_eq!(auth.restore(Utc::now()).unwrap(), None);
        assert_eq!(store.session().get(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn refresh_reissues_token() {
        let (auth, store, _) = service();
        auth.login(&credentials("paul.bernard@example.com", "password123"), false)
            .await
            .unwrap();
        assert_eq!(auth.refresh().await.unwrap(), Route::Staff);
        assert!(store.session().get(TOKEN_KEY).unwrap().is_some());

        store.session().set(TOKEN_KEY, "garbage").unwrap();
        assert!(auth.refresh().await.unwrap_err().is_status(401));
        assert!(!auth.is_logged_in());
        assert_eq!(store.token().unwrap(), None);
    }

    #[test]
    fn unreadable_update_logs_out() {
        let (auth, _, notifier) = service();
        assert!(auth.update_token("nope").is_err());
        assert_eq!(notifier.last().unwrap().kind, NotificationKind::Error);
    }

    #[tokio::test]
    async fn unkept_session_is_forgotten_on_close() {
        let (auth, store, _) = service();
        auth.login(&credentials("lucie.moreau@example.com", "password123"), false)
            .await
            .unwrap();
        auth.clear_session_if_not_kept().unwrap();
        assert!(!auth.is_logged_in());
        assert_eq!(store.session().get(TOKEN_KEY).unwrap(), None);
    }
}
