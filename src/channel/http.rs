//! HTTP implementation of [`OperationChannel`].
//!
//! Each operation is one `POST {base}/sessions/{id}/ops/{name}` request
//! whose JSON body is the operation payload. Replies are decoded by
//! [`wire`](crate::channel::wire). The channel holds the engine binding:
//! once [`HttpChannel::close`] is called every further call fails with
//! [`AppError::EngineUnavailable`].

use std::sync::atomic::{AtomicBool, Ordering};

use reqwest::{Client, RequestBuilder};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::channel::wire::{classify_error, decode_reply, decode_session_created};
use crate::channel::{ChannelFuture, OperationChannel};
use crate::config::GlobalConfig;
use crate::models::operation::Operation;
use crate::models::session::SessionId;
use crate::models::suspension::OperationResult;
use crate::{AppError, Result};

/// Header carrying a per-request correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// HTTP/JSON engine channel.
#[derive(Debug)]
pub struct HttpChannel {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    closed: AtomicBool,
}

impl HttpChannel {
    /// Build a channel for the configured engine.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the HTTP client cannot be constructed.
    pub fn new(config: &GlobalConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base_url: config.engine.base_url.clone(),
            api_token: config.engine.api_token.clone(),
            closed: AtomicBool::new(false),
        })
    }

    /// Drop the engine binding; later calls fail with `EngineUnavailable`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(AppError::EngineUnavailable("engine channel closed".into()))
        } else {
            Ok(())
        }
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        match self.api_token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, builder: RequestBuilder) -> Result<String> {
        self.ensure_open()?;
        let response = self.authorize(builder).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            Ok(body)
        } else {
            let err = classify_error(status.as_u16(), &body);
            warn!(status = status.as_u16(), %err, "engine request failed");
            Err(err)
        }
    }

    fn session_url(&self, session: &SessionId) -> String {
        format!("{}/sessions/{}", self.base_url, session.as_str())
    }
}

impl OperationChannel for HttpChannel {
    fn create_session(&self) -> ChannelFuture<'_, SessionId> {
        Box::pin(async move {
            let url = format!("{}/sessions", self.base_url);
            let body = self.send(self.client.post(url)).await?;
            let session = decode_session_created(&body)?;
            debug!(session_id = %session, "http channel: session created");
            Ok(session)
        })
    }

    fn destroy_session(&self, session: &SessionId) -> ChannelFuture<'_, ()> {
        let session = session.clone();
        Box::pin(async move {
            let url = self.session_url(&session);
            self.send(self.client.delete(url)).await?;
            debug!(session_id = %session, "http channel: session destroyed");
            Ok(())
        })
    }

    fn invoke(
        &self,
        session: &SessionId,
        operation: &Operation,
    ) -> ChannelFuture<'_, OperationResult> {
        let session = session.clone();
        let name = operation.wire_name();
        let payload = operation.payload();
        let span = info_span!("engine_op", op = name, session_id = %session);
        Box::pin(
            async move {
                let url = format!("{}/ops/{name}", self.session_url(&session));
                debug!("http channel: invoking operation");
                let body = self.send(self.client.post(url).json(&payload)).await?;
                decode_reply(&body)
            }
            .instrument(span),
        )
    }
}
