//! The live map widget minus the toolkit: scene, adapter, drag controller, surface size and
//! renderer behind one owner.

use std::sync::Arc;

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    adapter::{fetch_map, MapFetchRequest, MapFetchResult, StateStreamAdapter},
    interaction::{InteractionController, PointerEvent},
    render::{Canvas, DrawingSurface, FrameReport, Renderer, ScreenRect},
    scene::SceneModel,
    transport::{DocumentStore, Subscription},
};

#[derive(Debug, Default)]
pub struct MapView {
    scene: SceneModel,
    adapter: StateStreamAdapter,
    controller: InteractionController,
    surface: DrawingSurface,
    screen_rect: ScreenRect,
    renderer: Renderer,
}

impl MapView {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            ..Self::default()
        }
    }

    pub fn scene(&self) -> &SceneModel {
        &self.scene
    }

    pub fn surface(&self) -> &DrawingSurface {
        &self.surface
    }

    pub fn is_loading(&self) -> bool {
        self.adapter.is_loading()
    }

    pub fn is_dragging(&self) -> bool {
        self.controller.is_dragging()
    }

    pub fn on_snapshot(&mut self, value: &Value) -> Option<MapFetchRequest> {
        self.adapter.on_snapshot(&mut self.scene, value)
    }

    pub fn on_map_fetched(&mut self, result: MapFetchResult) -> bool {
        self.adapter.on_map_fetched(&mut self.scene, result)
    }

    pub fn pointer(&mut self, event: PointerEvent) -> bool {
        self.controller.handle(event, self.screen_rect, &mut self.scene)
    }

    /// Tracks where the surface sits on screen and adopts its container's size.
    /// Returns true when the size changed.
    pub fn layout(&mut self, rect: ScreenRect) -> bool {
        self.screen_rect = rect;
        self.controller.on_resize(&mut self.surface, rect.size)
    }

    pub fn draw<C: Canvas + ?Sized>(&self, canvas: Option<&mut C>) -> FrameReport {
        self.renderer.draw(&self.scene, canvas)
    }

    /// Tears the view down; fetches resolving afterwards are ignored.
    pub fn dispose(&mut self) {
        self.adapter.dispose();
    }

    /// Pumps `subscription` into the view, running map fetches against `store` as the
    /// map reference changes. `on_change` runs after every scene write. Returns once the
    /// subscription ends and in-flight fetches have settled.
    pub async fn drive<F>(
        &mut self,
        mut subscription: Subscription,
        store: Arc<dyn DocumentStore>,
        mut on_change: F,
    ) where
        F: FnMut(&MapView),
    {
        let mut fetches: FuturesUnordered<BoxFuture<'static, MapFetchResult>> =
            FuturesUnordered::new();
        info!(path = subscription.path(), "map view attached to state stream");

        loop {
            tokio::select! {
                frame = subscription.next() => {
                    let Some(value) = frame else {
                        break;
                    };
                    let before = self.scene.revision();
                    if let Some(request) = self.on_snapshot(&value) {
                        let store = Arc::clone(&store);
                        fetches.push(async move { fetch_map(store.as_ref(), request).await }.boxed());
                    }
                    if self.scene.revision() != before {
                        on_change(self);
                    }
                }
                Some(result) = fetches.next(), if !fetches.is_empty() => {
                    if self.on_map_fetched(result) {
                        on_change(self);
                    }
                }
            }
        }

        debug!(pending = fetches.len(), "state stream ended; settling map fetches");
        while let Some(result) = fetches.next().await {
            if self.on_map_fetched(result) {
                on_change(self);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/map_view_tests.rs"]
mod tests;
