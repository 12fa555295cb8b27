use std::{path::PathBuf, time::Duration};

use chrono::Utc;
use client_core::{
    DeliveryRequest, MapView, PointerEvent, Renderer, RobotTelemetry, SortMode, TaskQueue,
    Urgency,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use serde::{Deserialize, Serialize};
use shared::domain::VoiceCommand;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorCategory, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

pub(crate) const SETTINGS_STORAGE_KEY: &str = "ward_runner_dashboard_settings";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8443";

#[derive(Debug, Clone)]
pub struct StartupConfig {
    /// Set only when the user passed `--server-url`; otherwise the last saved URL wins.
    pub server_url: Option<String>,
    pub profile: String,
    pub data_dir: Option<PathBuf>,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            profile: "default".to_string(),
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_root: PathBuf,
    pub cache_db_path: PathBuf,
}

impl AppPaths {
    pub fn from_startup(startup: &StartupConfig) -> anyhow::Result<Self> {
        let root = if let Some(p) = &startup.data_dir {
            p.clone()
        } else {
            let base = dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("unable to resolve local app data dir"))?;
            base.join("ward_runner")
                .join("profiles")
                .join(&startup.profile)
        };

        Ok(Self {
            cache_db_path: root.join("dashboard.sqlite3"),
            data_root: root,
        })
    }

    pub fn cache_url(&self) -> String {
        format!(
            "sqlite://{}",
            self.cache_db_path.to_string_lossy().replace('\\', "/")
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Tab {
    Dashboard,
    Tasks,
    Voice,
}

impl Tab {
    pub(super) const ALL: [Tab; 3] = [Tab::Dashboard, Tab::Tasks, Tab::Voice];

    pub(super) fn label(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Tasks => "Tasks",
            Tab::Voice => "Voice",
        }
    }
}

/// Text fields behind the "Add Task" form. List fields are comma separated.
#[derive(Debug, Clone, Default)]
pub(super) struct DeliveryForm {
    pub(super) nurse_name: String,
    pub(super) supplies: String,
    pub(super) source_location: String,
    pub(super) destination_rooms: String,
    pub(super) urgent: bool,
    pub(super) notes: String,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

impl DeliveryForm {
    pub(super) fn to_request(&self) -> DeliveryRequest {
        DeliveryRequest {
            nurse_name: self.nurse_name.clone(),
            supplies: split_list(&self.supplies),
            source_location: self.source_location.clone(),
            destination_rooms: split_list(&self.destination_rooms),
            urgency: if self.urgent {
                Urgency::Urgent
            } else {
                Urgency::Normal
            },
            notes: self.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedDesktopSettings {
    #[serde(default)]
    server_url: Option<String>,
    #[serde(default)]
    sort_mode: SortMode,
}

pub struct DesktopGuiApp {
    pub(super) cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    pub(super) server_url: String,
    pub(super) connected_to: Option<String>,
    pub(super) status: String,
    pub(super) last_error: Option<UiError>,
    pub(super) tab: Tab,
    pub(super) map_view: MapView,
    pub(super) telemetry: RobotTelemetry,
    pub(super) queue: TaskQueue,
    pub(super) delivery_form: DeliveryForm,
    pub(super) voice_commands: Vec<VoiceCommand>,
    pub(super) voice_input: String,
    last_revision: u64,
}

impl DesktopGuiApp {
    pub fn bootstrap(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        startup: StartupConfig,
        storage: Option<&dyn eframe::Storage>,
    ) -> Self {
        let persisted = storage.and_then(|storage| {
            storage
                .get_string(SETTINGS_STORAGE_KEY)
                .and_then(|text| serde_json::from_str::<PersistedDesktopSettings>(&text).ok())
        });
        let saved_url = persisted
            .as_ref()
            .and_then(|settings| settings.server_url.clone())
            .filter(|url| !url.trim().is_empty());
        let server_url = startup
            .server_url
            .or(saved_url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let mut app = Self::new(cmd_tx, ui_rx, server_url);
        if let Some(settings) = persisted {
            app.queue.set_sort_mode(settings.sort_mode);
        }
        app.connect();
        app
    }

    fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>, server_url: String) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            server_url,
            connected_to: None,
            status: "Not connected".to_string(),
            last_error: None,
            tab: Tab::Dashboard,
            map_view: MapView::new(Renderer::default()),
            telemetry: RobotTelemetry::default(),
            queue: TaskQueue::seeded(),
            delivery_form: DeliveryForm::default(),
            voice_commands: Vec::new(),
            voice_input: String::new(),
            last_revision: 0,
        }
    }

    pub(super) fn connect(&mut self) {
        self.status = format!("Connecting to {}", self.server_url);
        dispatch_backend_command(
            &self.cmd_tx,
            BackendCommand::Connect {
                server_url: self.server_url.trim().to_string(),
            },
            &mut self.status,
        );
    }

    pub(super) fn dispatch(&mut self, cmd: BackendCommand) {
        dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status);
    }

    pub(super) fn submit_delivery(&mut self) {
        let request = self.delivery_form.to_request();
        match self.queue.submit(&request, Utc::now()) {
            Ok((task, record)) => {
                self.status = format!("Queued task #{}: {}", task.id, task.name);
                self.delivery_form = DeliveryForm::default();
                self.dispatch(BackendCommand::SubmitDeliveryTask(record));
            }
            Err(err) => {
                self.status = format!("Cannot add task: {err}");
            }
        }
    }

    pub(super) fn record_voice_command(&mut self) {
        let command = self.voice_input.trim().to_string();
        if command.is_empty() {
            return;
        }
        self.voice_input.clear();
        self.dispatch(BackendCommand::RecordVoiceCommand {
            command,
            timestamp_ms: Utc::now().timestamp_millis(),
        });
    }

    /// Ends a drag whose button went up while the map was not on screen.
    fn release_stale_drag(&mut self, button_down: bool) {
        if !button_down && self.map_view.is_dragging() {
            self.map_view.pointer(PointerEvent::Up);
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::Info(message) => {
                    self.status = message;
                }
                UiEvent::Connected { server_url } => {
                    self.status = format!("Connected to {server_url}");
                    self.connected_to = Some(server_url);
                    self.last_error = None;
                }
                UiEvent::Error(err) => {
                    if err.category() == UiErrorCategory::Transport {
                        self.connected_to = None;
                    }
                    self.status = format!("{}: {}", err.context().label(), err.message());
                    self.last_error = Some(err);
                }
                UiEvent::RobotSnapshot(value) => {
                    if let Some(request) = self.map_view.on_snapshot(&value) {
                        self.dispatch(BackendCommand::FetchMap(request));
                    }
                }
                UiEvent::RobotTelemetry(value) => {
                    self.telemetry.apply_snapshot(&value);
                }
                UiEvent::MapFetched(result) => {
                    self.map_view.on_map_fetched(result);
                }
                UiEvent::VoiceCommandsUpdated(commands) => {
                    self.voice_commands = commands;
                }
            }
        }
    }
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        let button_down = ctx.input(|i| i.pointer.primary_down());
        self.release_stale_drag(button_down);

        egui::TopBottomPanel::top("tabs").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for tab in Tab::ALL {
                    ui.selectable_value(&mut self.tab, tab, tab.label());
                }
                ui.separator();
                ui.label("Relay:");
                ui.add(egui::TextEdit::singleline(&mut self.server_url).desired_width(220.0));
                if ui.button("Connect").clicked() {
                    self.connect();
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            let color = if self.last_error.is_some() {
                egui::Color32::from_rgb(220, 53, 69)
            } else {
                ui.visuals().weak_text_color()
            };
            ui.colored_label(color, &self.status);
        });

        match self.tab {
            Tab::Dashboard => self.show_dashboard(ctx),
            Tab::Tasks => self.show_tasks(ctx),
            Tab::Voice => self.show_voice(ctx),
        }

        let revision = self.map_view.scene().revision();
        if revision != self.last_revision {
            self.last_revision = revision;
            ctx.request_repaint();
        }
        if self.map_view.is_dragging() {
            ctx.request_repaint_after(Duration::from_millis(16));
        } else {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedDesktopSettings {
            server_url: Some(self.server_url.clone()),
            sort_mode: self.queue.sort_mode(),
        };
        if let Ok(serialized) = serde_json::to_string(&settings) {
            storage.set_string(SETTINGS_STORAGE_KEY, serialized);
        }
    }
}

impl Drop for DesktopGuiApp {
    fn drop(&mut self) {
        self.map_view.dispose();
        let _ = self.cmd_tx.try_send(BackendCommand::Shutdown);
    }
}
