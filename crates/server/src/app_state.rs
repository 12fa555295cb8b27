use server_api::ApiContext;
use tokio::sync::broadcast;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    /// Paths written since startup, fanned out to websocket subscribers.
    pub(crate) changes: broadcast::Sender<String>,
}

impl AppState {
    pub(crate) fn new(api: ApiContext, change_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(change_buffer);
        Self { api, changes }
    }

    pub(crate) fn notify_changed(&self, path: &str) {
        // No subscribers is not an error.
        let _ = self.changes.send(path.to_string());
    }
}
