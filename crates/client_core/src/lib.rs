//! Client side of the ward dashboard: scene state, the state-stream adapter, rendering,
//! drag-to-pan, queue ordering and the relay transport.

pub mod adapter;
pub mod error;
pub mod interaction;
pub mod map_view;
pub mod ordering;
pub mod queue;
pub mod render;
pub mod scene;
pub mod telemetry;
pub mod time_ago;
pub mod transport;
pub mod voice;

pub use adapter::{fetch_map, MapFetchOutcome, MapFetchRequest, MapFetchResult, StateStreamAdapter};
pub use error::ClientError;
pub use interaction::{DragState, InteractionController, PointerEvent};
pub use map_view::MapView;
pub use ordering::{sort_tasks, SortMode};
pub use queue::{DeliveryRequest, DeliveryRequestError, TaskQueue, Urgency};
pub use render::{Canvas, Color, DrawingSurface, FrameReport, Palette, Renderer, ScreenRect, Viewport};
pub use scene::SceneModel;
pub use telemetry::{BatteryBand, RobotTelemetry};
pub use time_ago::{time_ago, time_ago_at};
pub use transport::{CommandSink, DocumentStore, RelayClient, StateSource, Subscription};
pub use voice::{VoiceCommandLog, VOICE_COMMANDS_CACHE_KEY};
