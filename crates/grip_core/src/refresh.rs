//! Live refresh of an open page.
//!
//! Each connected browser gets its own polling loop which compares the
//! modification time of the Readme every [`DEFAULT_REFRESH_INTERVAL`] and,
//! when it changed, pushes the re-rendered content.

use crate::reader::ReadmeReader;
use crate::render::{Auth, ReadmeRenderer};
use futures::Stream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(300);

/// Flag set once when the server starts shutting down.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// The file changed, new content follows.
    Updating,
    /// The re-rendered HTML.
    Content(String),
}

impl RefreshEvent {
    /// Encodes the event as a server-sent event frame.
    pub fn to_frame(&self) -> String {
        let payload = match self {
            Self::Updating => serde_json::json!({ "updating": true }),
            Self::Content(content) => serde_json::json!({ "content": content }),
        };
        format!("data: {payload}\r\n\r\n")
    }
}

/// What a refresh loop reads and renders with.
#[derive(Clone)]
pub struct RefreshContext {
    pub reader: Arc<dyn ReadmeReader>,
    pub renderer: Arc<dyn ReadmeRenderer>,
    pub auth: Option<Auth>,
}

enum Phase {
    Polling,
    Notifying,
}

struct LoopState {
    ctx: RefreshContext,
    subpath: Option<String>,
    shutdown: ShutdownSignal,
    interval: Duration,
    last_updated: Option<SystemTime>,
    phase: Phase,
}

impl LoopState {
    /// Sleeps until the modification time changes, `false` on shutdown.
    async fn wait_for_change(&mut self) -> bool {
        loop {
            if self.shutdown.is_set() {
                return false;
            }
            tokio::time::sleep(self.interval).await;
            if self.shutdown.is_set() {
                return false;
            }

            let updated = self.ctx.reader.last_updated(self.subpath.as_deref());
            if updated != self.last_updated {
                self.last_updated = updated;
                return true;
            }
        }
    }

    /// Reads and renders the changed file, `None` terminates the stream.
    async fn render(&self) -> Option<String> {
        let subpath = self.subpath.as_deref();

        // Binary changes are not re-rendered.
        if self.ctx.reader.is_binary(subpath) {
            return None;
        }

        let content = match self.ctx.reader.read(subpath) {
            Ok(content) => content,
            Err(err) => {
                tracing::debug!(?subpath, %err, "Readme gone, closing refresh stream");
                return None;
            }
        };
        let text = content.as_text()?;

        match self.ctx.renderer.render(text, self.ctx.auth.as_ref()).await {
            Ok(html) => Some(html),
            Err(err) => {
                tracing::warn!(?subpath, %err, "Failed to render the updated Readme");
                None
            }
        }
    }
}

/// Returns the stream of refresh events for `subpath`.
///
/// Every change yields [`RefreshEvent::Updating`] followed by
/// [`RefreshEvent::Content`]. The stream ends once `shutdown` is set, or when
/// the file turns binary, disappears or fails to render.
pub fn refresh_stream(
    ctx: RefreshContext,
    subpath: Option<String>,
    shutdown: ShutdownSignal,
    interval: Duration,
) -> impl Stream<Item = RefreshEvent> + Send + 'static {
    let last_updated = ctx.reader.last_updated(subpath.as_deref());

    let state = LoopState {
        ctx,
        subpath,
        shutdown,
        interval,
        last_updated,
        phase: Phase::Polling,
    };

    futures::stream::unfold(state, |mut state| async move {
        match state.phase {
            Phase::Polling => {
                if !state.wait_for_change().await {
                    return None;
                }
                state.phase = Phase::Notifying;
                Some((RefreshEvent::Updating, state))
            }
            Phase::Notifying => {
                let html = state.render().await?;
                state.phase = Phase::Polling;
                Some((RefreshEvent::Content(html), state))
            }
        }
    })
}
