//! System trait

use std::any::type_name;

use super::error::EcsResult;
use super::manager::EcsManager;
use super::signal::{SignalEnvelope, SignalId};

/// Per-tick behaviour unit owned by a system pool
///
/// A system's identity is its type: a pool holds at most one instance of
/// each system type. Systems read committed component state freely and
/// queue structural changes; those become visible at the next commit.
pub trait System: 'static {
    /// Run the system once for the current tick
    fn run(&mut self, manager: &mut EcsManager) -> EcsResult<()>;

    /// Whether signals with this id should reach [`System::handle_signal`]
    fn is_signal_subscribed(&self, _id: SignalId) -> bool {
        false
    }

    /// Handle a signal this system subscribed to
    fn handle_signal(&mut self, _manager: &mut EcsManager, _signal: &SignalEnvelope) -> EcsResult<()> {
        Ok(())
    }

    /// Name used in logs and diagnostics
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}
