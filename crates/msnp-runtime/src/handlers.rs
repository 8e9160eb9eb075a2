//! Message handlers for the MSNP dispatcher
//!
//! Handlers receive every parsed inbound frame. The registry is copy-on-write:
//! a dispatch pass iterates the snapshot taken when it started, and the lock
//! only ever guards swapping that snapshot.

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use msnp_core::{Frame, NsMessage, Result};

use crate::dispatcher::NsMessageProcessor;

// ----------------------------------------------------------------------------
// Message Handler Trait
// ----------------------------------------------------------------------------

/// Trait for handling inbound frames
pub trait MessageHandler<M: Frame = NsMessage>: Send + Sync {
    /// Handle one inbound frame
    ///
    /// `message` is this handler's own copy. `source` is the dispatcher that
    /// received it, so replies can be sent from inside the handler.
    fn handle_message(&self, source: &NsMessageProcessor<M>, message: M) -> Result<()>;

    /// Name used when reporting failures
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ----------------------------------------------------------------------------
// Closure Handler
// ----------------------------------------------------------------------------

/// Adapts a closure into a [`MessageHandler`]
pub struct FnHandler<M, F> {
    name: String,
    handler: F,
    _frame: PhantomData<fn(M)>,
}

impl<M, F> FnHandler<M, F>
where
    M: Frame,
    F: Fn(&NsMessageProcessor<M>, M) -> Result<()> + Send + Sync,
{
    pub fn new<N: Into<String>>(name: N, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
            _frame: PhantomData,
        }
    }
}

impl<M, F> MessageHandler<M> for FnHandler<M, F>
where
    M: Frame,
    F: Fn(&NsMessageProcessor<M>, M) -> Result<()> + Send + Sync,
{
    fn handle_message(&self, source: &NsMessageProcessor<M>, message: M) -> Result<()> {
        (self.handler)(source, message)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ----------------------------------------------------------------------------
// Handler Registry
// ----------------------------------------------------------------------------

/// Opaque registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// A registered handler
pub type HandlerEntry<M> = (HandlerId, Arc<dyn MessageHandler<M>>);

/// Ordered, copy-on-write list of handlers
pub struct HandlerRegistry<M: Frame> {
    handlers: RwLock<Arc<Vec<HandlerEntry<M>>>>,
    next_id: AtomicU64,
}

impl<M: Frame> HandlerRegistry<M> {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a handler; it sees frames from the next dispatch pass on
    pub fn register(&self, handler: Arc<dyn MessageHandler<M>>) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = Vec::with_capacity(handlers.len() + 1);
        updated.extend(handlers.iter().cloned());
        updated.push((id, handler));
        *handlers = Arc::new(updated);
        id
    }

    /// Remove a handler; returns whether it was registered
    pub fn unregister(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if !handlers.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        let updated: Vec<_> = handlers
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        *handlers = Arc::new(updated);
        true
    }

    /// The current handler list
    pub fn snapshot(&self) -> Arc<Vec<HandlerEntry<M>>> {
        Arc::clone(&self.handlers.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl<M: Frame> Default for HandlerRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Named;

    impl MessageHandler for Named {
        fn handle_message(&self, _source: &NsMessageProcessor, _message: NsMessage) -> Result<()> {
            Ok(())
        }
    }

    fn noop(name: &str) -> Arc<dyn MessageHandler> {
        Arc::new(FnHandler::new(name, |_: &NsMessageProcessor, _: NsMessage| Ok(())))
    }

    #[test]
    fn test_register_preserves_order() {
        let registry = HandlerRegistry::<NsMessage>::new();
        let a = registry.register(noop("a"));
        let b = registry.register(noop("b"));
        assert_ne!(a, b);

        let names: Vec<_> = registry
            .snapshot()
            .iter()
            .map(|(_, h)| h.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_changes() {
        let registry = HandlerRegistry::<NsMessage>::new();
        let a = registry.register(noop("a"));
        let before = registry.snapshot();

        registry.register(noop("b"));
        assert!(registry.unregister(a));
        assert!(!registry.unregister(a));

        assert_eq!(before.len(), 1);
        assert_eq!(before[0].0, a);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_name_is_type_name() {
        assert!(Named.name().ends_with("Named"));
        assert_eq!(HandlerId(3).to_string(), "handler#3");
    }
}
