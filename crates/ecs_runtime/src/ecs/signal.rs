//! Typed broadcast signals
//!
//! A signal type declares a process-wide unique [`SignalId`] through the
//! [`Signal`] trait. Sending one wraps the value in a reference-counted
//! [`SignalEnvelope`]; every system pool receives a clone of the envelope in
//! its queue and delivers it to subscribed systems during the pool's next
//! update. Nothing is retained after delivery.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use super::error::{EcsError, EcsResult};

/// Unique identifier of a signal type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(Uuid);

impl SignalId {
    /// Build an id from its 128-bit value
    pub const fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    /// Wrap an existing UUID
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A message type that can be broadcast to every system pool
///
/// ```
/// use ecs_runtime::ecs::{Signal, SignalId};
///
/// struct FrameCount(u64);
///
/// impl Signal for FrameCount {
///     const ID: SignalId = SignalId::from_u128(0x6f1c_2a90_5b3e_4d1f_9e7a_0c44_b2d8_1e53);
/// }
/// ```
pub trait Signal: 'static {
    /// Identifier shared by every instance of this signal type
    const ID: SignalId;
}

/// A sent signal as seen by the systems receiving it
#[derive(Clone)]
pub struct SignalEnvelope {
    id: SignalId,
    name: &'static str,
    payload: Rc<dyn Any>,
}

impl SignalEnvelope {
    /// Wrap `signal`, stamping its type's id
    pub fn new<S: Signal>(signal: S) -> Self {
        Self {
            id: S::ID,
            name: type_name::<S>(),
            payload: Rc::new(signal),
        }
    }

    /// Identifier of the wrapped signal type
    pub fn id(&self) -> SignalId {
        self.id
    }

    /// Type name of the wrapped signal
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the payload is an `S`
    pub fn is<S: Signal>(&self) -> bool {
        self.id == S::ID && self.payload.is::<S>()
    }

    /// Borrow the payload as an `S`
    pub fn downcast<S: Signal>(&self) -> Option<&S> {
        if self.id != S::ID {
            return None;
        }
        self.payload.downcast_ref::<S>()
    }
}

impl fmt::Debug for SignalEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalEnvelope")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Records which type claimed each signal id
#[derive(Debug, Default)]
pub(crate) struct SignalRegistry {
    claimed: HashMap<SignalId, &'static str>,
}

impl SignalRegistry {
    /// Register `S` on first use; fail if another type already owns its id
    pub(crate) fn validate<S: Signal>(&mut self) -> EcsResult<()> {
        let incoming = type_name::<S>();
        match self.claimed.get(&S::ID) {
            Some(&existing) if existing != incoming => Err(EcsError::SignalIdCollision {
                id: S::ID,
                existing,
                incoming,
            }),
            Some(_) => Ok(()),
            None => {
                log::debug!("Registered signal `{incoming}` as {}", S::ID);
                self.claimed.insert(S::ID, incoming);
                Ok(())
            }
        }
    }
}
