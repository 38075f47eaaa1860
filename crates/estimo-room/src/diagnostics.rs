//! Where rejected actions are reported.
//!
//! Rejections are never sent to the client. The dispatcher reports them
//! here instead so servers and tests can decide what to do with them.

use estimo_transport::ConnectionId;

use crate::RoomError;

/// Receives every action the dispatcher refuses to apply.
pub trait Diagnostics: Send + Sync + 'static {
    /// Called once per rejected event, before the next event is handled.
    fn rejected(&self, conn: ConnectionId, event: &'static str, error: &RoomError);
}

/// Logs rejections as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn rejected(&self, conn: ConnectionId, event: &'static str, error: &RoomError) {
        tracing::warn!(%conn, event, %error, "action rejected");
    }
}

impl<D: Diagnostics> Diagnostics for std::sync::Arc<D> {
    fn rejected(&self, conn: ConnectionId, event: &'static str, error: &RoomError) {
        (**self).rejected(conn, event, error);
    }
}
