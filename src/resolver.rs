//! Suspension resolution over the operation channel.
//!
//! An engine operation may stop mid-way and ask for a modal interaction.
//! [`SuspensionResolver::execute`] presents each such suspension through
//! the injected [`InteractionPresenter`], submits the answer on the same
//! session, and loops until the engine returns a terminal page. Dialogs may
//! chain; no intermediate page is ever observable by the caller.
//!
//! Presenter waits are bounded. On expiry the resolver proceeds with the
//! conservative "acknowledge/continue" answer rather than holding the
//! session open indefinitely.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::channel::OperationChannel;
use crate::models::operation::Operation;
use crate::models::page::PageState;
use crate::models::session::SessionId;
use crate::models::suspension::{Outcome, Suspension};
use crate::presenter::{InteractionPresenter, PresentationRequest, Resolution};
use crate::{AppError, Result};

/// Result of one bounded presenter wait.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenterOutcome {
    /// The presenter answered (failures are reported as `NoSelection`).
    Resolved(Resolution),
    /// The wait window elapsed.
    TimedOut,
}

/// Clears the busy flag when an execution ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Drives operations to a terminal page, resolving suspensions on the way.
pub struct SuspensionResolver {
    channel: Arc<dyn OperationChannel>,
    presenter: Arc<dyn InteractionPresenter>,
    presenter_timeout: Duration,
    busy: AtomicBool,
}

impl SuspensionResolver {
    /// Build a resolver over `channel` with an injected `presenter`.
    #[must_use]
    pub fn new(
        channel: Arc<dyn OperationChannel>,
        presenter: Arc<dyn InteractionPresenter>,
        presenter_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            presenter,
            presenter_timeout,
            busy: AtomicBool::new(false),
        }
    }

    /// Underlying channel, shared with the session lifecycle.
    #[must_use]
    pub fn channel(&self) -> &Arc<dyn OperationChannel> {
        &self.channel
    }

    /// Whether an operation is currently outstanding.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Execute `operation` and resolve every suspension until a terminal page.
    ///
    /// Informational notices attached to any reply are shown, in order,
    /// before the reply is processed further.
    ///
    /// # Errors
    ///
    /// - `AppError::Busy` if another operation is outstanding.
    /// - Any channel error from the initial call or a resolution submit.
    pub async fn execute(&self, session: &SessionId, operation: &Operation) -> Result<PageState> {
        let _guard = self.acquire(operation)?;
        let span = info_span!(
            "execute",
            op = operation.wire_name(),
            session_id = %session,
        );

        async move {
            let mut result = self.channel.invoke(session, operation).await?;
            let mut rounds: u32 = 0;
            loop {
                self.drain_notices(std::mem::take(&mut result.notices))
                    .await;
                match result.outcome {
                    Outcome::Page(page) => {
                        debug!(rounds, "operation completed");
                        return Ok(page);
                    }
                    Outcome::Suspended(suspension) => {
                        rounds += 1;
                        info!(interaction = %suspension.name, rounds, "operation suspended");
                        let resolution = self.resolve(&suspension).await;
                        let submit = Operation::SubmitInteraction {
                            result: resolution.into_wire(),
                        };
                        result = self.channel.invoke(session, &submit).await?;
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Show `request` and wait at most the configured window.
    ///
    /// Presenter failures are logged and reported as `NoSelection`.
    pub async fn show(&self, request: PresentationRequest) -> PresenterOutcome {
        let kind = request.kind();
        match tokio::time::timeout(self.presenter_timeout, self.presenter.present(request)).await {
            Ok(Ok(resolution)) => {
                debug!(kind, ?resolution, "presenter resolved");
                PresenterOutcome::Resolved(resolution)
            }
            Ok(Err(err)) => {
                warn!(kind, %err, "presenter failed; treating as no selection");
                PresenterOutcome::Resolved(Resolution::NoSelection)
            }
            Err(_elapsed) => {
                info!(
                    kind,
                    timeout_seconds = self.presenter_timeout.as_secs(),
                    "presenter wait timed out"
                );
                PresenterOutcome::TimedOut
            }
        }
    }

    async fn resolve(&self, suspension: &Suspension) -> Resolution {
        match self.show(PresentationRequest::from_suspension(suspension)).await {
            PresenterOutcome::Resolved(resolution) => resolution,
            PresenterOutcome::TimedOut => Resolution::Acknowledged,
        }
    }

    async fn drain_notices(&self, notices: Vec<Suspension>) {
        for notice in notices {
            debug!(interaction = %notice.name, "showing informational notice");
            let _ = self.show(PresentationRequest::from_suspension(&notice)).await;
        }
    }

    fn acquire(&self, operation: &Operation) -> Result<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            error!(
                op = operation.wire_name(),
                "operation issued while another is outstanding"
            );
            return Err(AppError::Busy(format!(
                "cannot issue '{}' while another operation is outstanding",
                operation.wire_name()
            )));
        }
        Ok(BusyGuard(&self.busy))
    }
}
