//! The "exchange handle" design note (§9): everything a command needs
//! beyond its own normalized arguments, threaded in instead of reached for
//! through process-global state.

use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::domain::exchange::Exchange;
use crate::domain::session::Session;
use crate::port::notifier::Notifier;

/// Per-command-sequence context shared by every command in one block
/// (§3: "Command"). Cheap to clone — everything inside is reference-counted.
#[derive(Clone)]
pub struct CommandCtx {
    pub exchange: Arc<Exchange>,
    pub symbol: String,
    pub session: Arc<Mutex<Session>>,
    pub notifier: Arc<dyn Notifier>,
}

impl CommandCtx {
    pub fn session_id(&self) -> Uuid {
        self.session.lock().id
    }
}
