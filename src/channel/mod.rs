//! Engine operation channel abstraction.
//!
//! The [`OperationChannel`] trait decouples the control core (suspension
//! resolution, session recovery, navigation authority) from the transport
//! that carries operations to the engine. Every engine call made by the
//! client routes through this trait.

pub mod http;
pub mod wire;

use std::future::Future;
use std::pin::Pin;

use crate::models::operation::Operation;
use crate::models::session::SessionId;
use crate::models::suspension::OperationResult;
use crate::Result;

/// Boxed future returned by channel methods.
pub type ChannelFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Transport-agnostic interface between the control core and the engine.
///
/// Implementations carry exactly one logical operation per call and never
/// retry; recovery belongs to [`SessionLifecycle`](crate::session::SessionLifecycle).
pub trait OperationChannel: Send + Sync {
    /// Bootstrap a new session identity.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EngineUnavailable`](crate::AppError::EngineUnavailable)
    /// if the engine cannot be reached, or
    /// [`AppError::Transport`](crate::AppError::Transport) on any other failure.
    fn create_session(&self) -> ChannelFuture<'_, SessionId>;

    /// Destroy a session identity on the engine.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::SessionNotFound`](crate::AppError::SessionNotFound)
    /// if the engine has already evicted the session, or a transport error.
    fn destroy_session(&self, session: &SessionId) -> ChannelFuture<'_, ()>;

    /// Invoke one operation and return its terminal or suspended result.
    ///
    /// # Errors
    ///
    /// - [`AppError::EngineUnavailable`](crate::AppError::EngineUnavailable) if no
    ///   live engine binding exists.
    /// - [`AppError::SessionNotFound`](crate::AppError::SessionNotFound) if the
    ///   engine reports the session as missing.
    /// - [`AppError::Transport`](crate::AppError::Transport) on transport errors.
    /// - [`AppError::Protocol`](crate::AppError::Protocol) if the reply is malformed.
    fn invoke(
        &self,
        session: &SessionId,
        operation: &Operation,
    ) -> ChannelFuture<'_, OperationResult>;
}
