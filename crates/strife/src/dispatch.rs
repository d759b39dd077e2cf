//! Message dispatch table.
//!
//! Handlers for the fixed set of [`MessageType`]s live in an array indexed
//! by the enum, so lookup for a known type is a bounds-checked index. Codes
//! outside the enumeration can still be served by handlers registered at
//! runtime with [`HandlerTable::register_code`].

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use strife_protocol::{MessageType, Packet};

use crate::context::ServerContext;
use crate::handlers;
use crate::registry::ConnectionHandle;
use crate::StrifeError;

/// Processes one decoded message for one connection.
///
/// Handlers reply through `conn` or broadcast through `ctx`. A returned
/// error is logged by the caller and only affects this message.
pub trait MessageHandler: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        ctx: &'a ServerContext,
        conn: &'a ConnectionHandle,
        packet: Packet,
    ) -> BoxFuture<'a, Result<(), StrifeError>>;
}

/// Mapping from message type code to handler.
pub struct HandlerTable {
    known: [Option<Arc<dyn MessageHandler>>; MessageType::COUNT],
    custom: HashMap<u16, Arc<dyn MessageHandler>>,
}

impl HandlerTable {
    /// An empty table. Every message is reported as unknown.
    pub fn new() -> Self {
        Self {
            known: std::array::from_fn(|_| None),
            custom: HashMap::new(),
        }
    }

    /// A table with the built-in ping and room handlers registered.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        handlers::register_defaults(&mut table);
        table
    }

    /// Installs `handler` for `kind`, replacing any previous one.
    pub fn register(
        &mut self,
        kind: MessageType,
        handler: impl MessageHandler,
    ) -> &mut Self {
        self.known[kind.index()] = Some(Arc::new(handler));
        self
    }

    /// Installs `handler` for a raw code.
    ///
    /// Codes that name a [`MessageType`] go into the enum-indexed slots, so
    /// the two registration paths never shadow each other.
    pub fn register_code(
        &mut self,
        code: u16,
        handler: impl MessageHandler,
    ) -> &mut Self {
        match MessageType::try_from(code) {
            Ok(kind) => self.register(kind, handler),
            Err(_) => {
                self.custom.insert(code, Arc::new(handler));
                self
            }
        }
    }

    /// Removes the handler for `kind`, if any.
    pub fn unregister(&mut self, kind: MessageType) -> &mut Self {
        self.known[kind.index()] = None;
        self
    }

    /// Finds the handler for a type code.
    pub fn lookup(&self, code: u16) -> Option<&Arc<dyn MessageHandler>> {
        match MessageType::try_from(code) {
            Ok(kind) => self.known[kind.index()].as_ref(),
            Err(_) => self.custom.get(&code),
        }
    }

    pub fn contains(&self, code: u16) -> bool {
        self.lookup(code).is_some()
    }

    /// Runs the handler for `packet`.
    ///
    /// # Errors
    /// [`StrifeError::UnknownMessageType`] when nothing is registered for the
    /// code, [`StrifeError::HandlerPanicked`] when the handler panics, or
    /// whatever the handler itself returns.
    pub async fn dispatch(
        &self,
        ctx: &ServerContext,
        conn: &ConnectionHandle,
        packet: Packet,
    ) -> Result<(), StrifeError> {
        let code = packet.code();
        let handler = self
            .lookup(code)
            .ok_or(StrifeError::UnknownMessageType(code))?;

        match AssertUnwindSafe(handler.handle(ctx, conn, packet))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(_) => Err(StrifeError::HandlerPanicked(code)),
        }
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let known: Vec<MessageType> = MessageType::ALL
            .into_iter()
            .filter(|kind| self.known[kind.index()].is_some())
            .collect();
        let mut custom: Vec<u16> = self.custom.keys().copied().collect();
        custom.sort_unstable();
        f.debug_struct("HandlerTable")
            .field("known", &known)
            .field("custom", &custom)
            .finish()
    }
}
