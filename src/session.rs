//! Session lifecycle management: bootstrap, transitions, recovery.
//!
//! The lifecycle owns the only session identity in the client. It is
//! created lazily on first use and re-created transparently when the
//! engine reports the session as missing (for example after an engine
//! restart evicted it). Recovery happens at most once per call.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};

use crate::channel::OperationChannel;
use crate::models::operation::Operation;
use crate::models::session::{Session, SessionId, SessionState};
use crate::models::suspension::Outcome;
use crate::{AppError, Result};

/// Owner of the client's session identity.
pub struct SessionLifecycle {
    channel: Arc<dyn OperationChannel>,
    current: Mutex<Option<Session>>,
}

impl SessionLifecycle {
    /// Build a lifecycle with no session yet.
    #[must_use]
    pub fn new(channel: Arc<dyn OperationChannel>) -> Self {
        Self {
            channel,
            current: Mutex::new(None),
        }
    }

    /// Current session identity, if one exists.
    pub async fn session_id(&self) -> Option<SessionId> {
        self.current.lock().await.as_ref().map(|s| s.id.clone())
    }

    /// Current lifecycle state; `Uninitialized` when no session exists.
    pub async fn state(&self) -> SessionState {
        self.current
            .lock()
            .await
            .as_ref()
            .map_or(SessionState::Uninitialized, |s| s.state)
    }

    /// Return the session identity, bootstrapping one if absent.
    ///
    /// # Errors
    ///
    /// Propagates channel errors from the bootstrap call.
    pub async fn ensure(&self) -> Result<SessionId> {
        let mut current = self.current.lock().await;
        if let Some(ref session) = *current {
            return Ok(session.id.clone());
        }
        let id = self.channel.create_session().await?;
        info!(session_id = %id, "session created");
        *current = Some(Session::new(id.clone()));
        Ok(id)
    }

    /// Run `f` with a valid session identity.
    ///
    /// If `f` fails with `SessionNotFound`, the stale identity is discarded,
    /// a new session is created (reloading the application it had loaded),
    /// and `f` is retried exactly once. A second failure propagates
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns the error of `f` (second attempt after recovery), or any
    /// error raised while bootstrapping or recovering the session.
    pub async fn with_session<T, F, Fut>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(SessionId) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let id = self.ensure().await?;
        match f(id.clone()).await {
            Err(err) if err.is_session_not_found() => {
                warn!(session_id = %id, %err, "session evicted by engine; recovering");
                let fresh = self.recover(&id).await?;
                f(fresh).await
            }
            other => other,
        }
    }

    /// Record a lifecycle transition.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if no session exists or the
    /// transition is not permitted.
    pub async fn mark(&self, next: SessionState) -> Result<()> {
        let mut current = self.current.lock().await;
        let session = current
            .as_mut()
            .ok_or_else(|| AppError::InvalidState("no session".into()))?;
        if !session.can_transition_to(next) {
            return Err(AppError::InvalidState(format!(
                "cannot move session from {:?} to {next:?}",
                session.state
            )));
        }
        info!(session_id = %session.id, from = ?session.state, to = ?next, "session state changed");
        session.state = next;
        Ok(())
    }

    /// Record that `application` was loaded into the current session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidState` if the transition is not permitted.
    pub async fn mark_loaded(&self, application: &str) -> Result<()> {
        self.mark(SessionState::ApplicationLoaded).await?;
        if let Some(session) = self.current.lock().await.as_mut() {
            session.application = Some(application.to_owned());
        }
        Ok(())
    }

    /// Destroy the session on the engine and forget it locally.
    ///
    /// An engine that already evicted the session is not an error.
    ///
    /// # Errors
    ///
    /// Propagates transport errors other than `SessionNotFound`.
    pub async fn destroy(&self) -> Result<()> {
        let Some(session) = self.current.lock().await.take() else {
            return Ok(());
        };
        let span = info_span!("destroy_session", session_id = %session.id);
        async move {
            match self.channel.destroy_session(&session.id).await {
                Ok(()) => {
                    info!("session destroyed");
                    Ok(())
                }
                Err(err) if err.is_session_not_found() => {
                    info!("session already gone on engine");
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }
        .instrument(span)
        .await
    }

    /// Replace the stale identity with a fresh one.
    async fn recover(&self, stale: &SessionId) -> Result<SessionId> {
        let mut current = self.current.lock().await;
        let previous = current.take();
        let application = previous.as_ref().and_then(|s| s.application.clone());
        if previous.as_ref().is_some_and(|s| s.state == SessionState::EntryStarted) {
            warn!(session_id = %stale, "entry in progress was lost with the evicted session");
        }

        let id = self.channel.create_session().await?;
        let mut session = Session::new(id.clone());

        if let Some(app) = application {
            match self.reload(&id, &app).await {
                Ok(()) => {
                    session.state = SessionState::ApplicationLoaded;
                    session.application = Some(app);
                }
                Err(err) => {
                    warn!(session_id = %id, application = %app, %err, "application reload failed; session kept uninitialized");
                    *current = Some(session);
                    return Err(err);
                }
            }
        }

        info!(stale = %stale, session_id = %id, "session recovered");
        *current = Some(session);
        Ok(id)
    }

    async fn reload(&self, session: &SessionId, application: &str) -> Result<()> {
        let load = Operation::LoadApplication {
            application: application.to_owned(),
        };
        let result = self.channel.invoke(session, &load).await?;
        if let Outcome::Suspended(suspension) = result.outcome {
            return Err(AppError::Protocol(format!(
                "application reload suspended with '{}'",
                suspension.name
            )));
        }
        Ok(())
    }
}
