//! Session manager: attaches the access credential, renews it on a 401 with
//! a single shared refresh, and turns an unrecoverable renewal into a
//! forced sign-out.

use futures::future::{BoxFuture, FutureExt, Shared};
use gitvault_core::models::Principal;
use gitvault_core::VaultError;
use http::StatusCode;
use secrecy::{ExposeSecret, Secret};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use validator::Validate;

use crate::dtos::auth::{LoginPayload, LoginRequest, RefreshPayload, RegisterRequest};
use crate::services::credential_store::{CredentialStore, StoredSession};
use crate::services::transport::{ApiRequest, ApiResponse, Transport};

pub const REGISTER_PATH: &str = "/users/register";
pub const LOGIN_PATH: &str = "/users/login";
pub const REFRESH_PATH: &str = "/users/refresh-accessToken";
pub const LOGOUT_PATH: &str = "/users/logout";

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    UserInitiated,
    /// Renewal failed; the caller should route the user back to sign-in.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(Principal),
    SignedOut { reason: SignOutReason },
}

type RenewalFlight = Shared<BoxFuture<'static, Result<Secret<String>, VaultError>>>;

/// Per logical request: at most one renewal-and-retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Initial,
    Retried,
}

struct Inner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    /// Bumped by sign-in and sign-out. Store writes happen under this lock so
    /// a renewal started in an older epoch can never write its credential.
    epoch: Mutex<u64>,
    renewal: tokio::sync::Mutex<Option<(u64, RenewalFlight)>>,
    next_flight: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl Inner {
    fn epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    async fn refresh(self: Arc<Self>, epoch: u64) -> Result<Secret<String>, VaultError> {
        if self.store.session().is_none() {
            return Err(VaultError::SessionExpired);
        }

        // Cookie only: the request deliberately carries no bearer.
        let request = ApiRequest::post(REFRESH_PATH, serde_json::json!({})).without_renewal();
        let outcome = match self.transport.execute(request).await {
            Ok(response) => response
                .into_data::<RefreshPayload>()
                .map(|payload| payload.access_token),
            Err(e) => Err(e),
        };

        let mut current = self.epoch();
        if *current != epoch {
            tracing::debug!("Discarding renewal outcome from a previous session");
            metrics::counter!("gitvault_session_renewals_total", "outcome" => "discarded")
                .increment(1);
            return Err(VaultError::SessionExpired);
        }

        let failure = match outcome {
            Ok(token) => match self.store.set_access_token(token.clone()) {
                Ok(()) => {
                    tracing::info!("Access credential renewed");
                    metrics::counter!("gitvault_session_renewals_total", "outcome" => "success")
                        .increment(1);
                    return Ok(token);
                }
                Err(e) => e,
            },
            Err(e) => e,
        };

        tracing::warn!(error = %failure, "Credential renewal failed, signing out");
        metrics::counter!("gitvault_session_renewals_total", "outcome" => "failure").increment(1);
        metrics::counter!("gitvault_forced_sign_outs_total").increment(1);

        *current += 1;
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear credential store");
        }
        drop(current);

        self.emit(SessionEvent::SignedOut {
            reason: SignOutReason::Expired,
        });
        Err(VaultError::SessionExpired)
    }
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                epoch: Mutex::new(0),
                renewal: tokio::sync::Mutex::new(None),
                next_flight: AtomicU64::new(0),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn principal(&self) -> Option<Principal> {
        self.inner.store.principal()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.store.session().is_some()
    }

    /// Set the bearer from the store, or leave the request anonymous.
    pub fn attach(&self, mut request: ApiRequest) -> ApiRequest {
        request.bearer = self.inner.store.access_token();
        request
    }

    /// Send through the transport, renewing and retrying once on a 401.
    ///
    /// Non-401 statuses come back untouched; a 401 after the retry is
    /// returned as-is for the caller to map.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, VaultError> {
        let mut attempt = Attempt::Initial;
        loop {
            let attached = self.attach(request.clone());
            let sent_with = attached.bearer.clone();
            let response = self.inner.transport.execute(attached).await?;

            if response.status != StatusCode::UNAUTHORIZED || !request.renewable || sent_with.is_none() {
                return Ok(response);
            }

            match attempt {
                Attempt::Initial => {
                    if self.credential_replaced(sent_with.as_ref()) {
                        // A renewal finished while this request was out; reuse its credential.
                        tracing::debug!(
                            request_id = %request.request_id,
                            path = %request.path,
                            "Access credential already renewed, retrying"
                        );
                    } else {
                        tracing::debug!(
                            request_id = %request.request_id,
                            path = %request.path,
                            "Access credential rejected, renewing"
                        );
                        self.renew().await?;
                    }
                    metrics::counter!("gitvault_request_retries_total").increment(1);
                    attempt = Attempt::Retried;
                }
                Attempt::Retried => {
                    tracing::debug!(
                        request_id = %request.request_id,
                        "Request rejected again after renewal"
                    );
                    return Ok(response);
                }
            }
        }
    }

    fn credential_replaced(&self, sent_with: Option<&Secret<String>>) -> bool {
        match (sent_with, self.inner.store.access_token()) {
            (Some(sent), Some(current)) => sent.expose_secret() != current.expose_secret(),
            _ => false,
        }
    }

    /// Obtain a fresh access credential. Concurrent callers share the
    /// in-flight renewal and observe the same outcome.
    pub async fn renew(&self) -> Result<Secret<String>, VaultError> {
        let (flight_id, flight) = {
            let mut slot = self.inner.renewal.lock().await;
            match slot.as_ref() {
                Some((id, flight)) if flight.peek().is_none() => (*id, flight.clone()),
                _ => {
                    let id = self.inner.next_flight.fetch_add(1, Ordering::SeqCst);
                    let epoch = *self.inner.epoch();
                    let flight = self.inner.clone().refresh(epoch).boxed().shared();
                    *slot = Some((id, flight.clone()));
                    (id, flight)
                }
            }
        };

        let outcome = flight.await;

        let mut slot = self.inner.renewal.lock().await;
        if matches!(slot.as_ref(), Some((id, _)) if *id == flight_id) {
            *slot = None;
        }
        outcome
    }

    /// Clear local state, then ask the server to drop the refresh cookie.
    /// Always ends anonymous, whatever the server says.
    pub async fn sign_out(&self) {
        let bearer = self.inner.store.access_token();
        let had_session = self.inner.store.session().is_some();

        {
            let mut epoch = self.inner.epoch();
            *epoch += 1;
            if let Err(e) = self.inner.store.clear() {
                tracing::error!(error = %e, "Failed to clear credential store");
            }
        }
        self.inner.renewal.lock().await.take();

        if had_session {
            tracing::info!("Signed out");
            self.inner.emit(SessionEvent::SignedOut {
                reason: SignOutReason::UserInitiated,
            });
        }

        let mut request = ApiRequest::post(LOGOUT_PATH, serde_json::json!({})).without_renewal();
        request.bearer = bearer;
        match self.inner.transport.execute(request).await {
            Ok(response) if response.is_success() => {}
            Ok(response) => {
                tracing::warn!(status = %response.status, "Server-side logout was rejected")
            }
            Err(e) => tracing::warn!(error = %e, "Server-side logout failed"),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Principal, VaultError> {
        let body = LoginRequest::new(email, password);
        body.validate()?;

        let request = ApiRequest::post(LOGIN_PATH, serde_json::to_value(&body)?).without_renewal();
        let payload: LoginPayload = self.inner.transport.execute(request).await?.into_data()?;
        let principal = payload.user;

        {
            let mut epoch = self.inner.epoch();
            *epoch += 1;
            self.inner.store.set_session(StoredSession {
                principal: principal.clone(),
                access_token: payload.access_token,
            })?;
        }
        self.inner.renewal.lock().await.take();

        tracing::info!(principal_id = %principal.id, "Signed in");
        self.inner.emit(SessionEvent::SignedIn(principal.clone()));
        Ok(principal)
    }

    /// Create an account. Does not sign in.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal, VaultError> {
        let body = RegisterRequest::new(username, email, password);
        body.validate()?;

        let request =
            ApiRequest::post(REGISTER_PATH, serde_json::to_value(&body)?).without_renewal();
        let principal: Principal = self.inner.transport.execute(request).await?.into_data()?;
        tracing::info!(principal_id = %principal.id, "Account registered");
        Ok(principal)
    }
}
