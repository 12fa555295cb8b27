//! Backend worker: owns the tokio runtime, the relay client, live subscriptions and the
//! voice-command log. Talks to the UI only through the bridge channels.

use std::{sync::Arc, thread};

use client_core::{
    fetch_map, CommandSink, MapFetchResult, RelayClient, StateSource, Subscription,
    VoiceCommandLog,
};
use crossbeam_channel::{Receiver, Sender};
use futures::StreamExt;
use serde_json::Value;
use shared::protocol::{
    DELIVERY_TASKS_PATH, ROBOT_COMMANDS_PATH, ROBOT_STATUS_PATH, ROBOT_TASK_PATH,
    VOICE_COMMANDS_PATH,
};
use storage::{LocalCache, Storage};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{classify_connect_failure, UiError, UiErrorContext, UiEvent};

const COMMAND_BRIDGE_CAPACITY: usize = 64;

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, cache_url: String) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(run_worker(cmd_rx, ui_tx, cache_url));
        // The command bridge may still be parked on a blocking receive.
        runtime.shutdown_background();
        tracing::info!("backend worker stopped");
    });
}

/// Moves blocking crossbeam receives off the async loop.
fn bridge_commands(cmd_rx: Receiver<BackendCommand>) -> mpsc::Receiver<BackendCommand> {
    let (tx, rx) = mpsc::channel(COMMAND_BRIDGE_CAPACITY);
    tokio::task::spawn_blocking(move || {
        while let Ok(cmd) = cmd_rx.recv() {
            if tx.blocking_send(cmd).is_err() {
                break;
            }
        }
    });
    rx
}

struct LiveFeeds {
    tasks: Vec<JoinHandle<()>>,
}

impl LiveFeeds {
    fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for LiveFeeds {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward_to_ui(
    subscription: Subscription,
    ui_tx: Sender<UiEvent>,
    wrap: fn(Value) -> UiEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let path = subscription.path().to_string();
        let mut subscription = subscription;
        while let Some(value) = subscription.next().await {
            if ui_tx.try_send(wrap(value)).is_err() {
                tracing::warn!(%path, "ui event queue full or closed; dropping snapshot");
            }
        }
        tracing::debug!(%path, "live feed ended");
    })
}

fn forward_to_worker(subscription: Subscription, tx: mpsc::Sender<Value>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut subscription = subscription;
        while let Some(value) = subscription.next().await {
            if tx.send(value).await.is_err() {
                break;
            }
        }
    })
}

async fn connect_feeds(
    relay: &RelayClient,
    ui_tx: &Sender<UiEvent>,
    voice_tx: &mpsc::Sender<Value>,
) -> Result<LiveFeeds, client_core::ClientError> {
    let robot_task = relay.subscribe(ROBOT_TASK_PATH).await?;
    let robot_status = relay.subscribe(ROBOT_STATUS_PATH).await?;
    let voice = relay.subscribe(VOICE_COMMANDS_PATH).await?;
    Ok(LiveFeeds {
        tasks: vec![
            forward_to_ui(robot_task, ui_tx.clone(), UiEvent::RobotSnapshot),
            forward_to_ui(robot_status, ui_tx.clone(), UiEvent::RobotTelemetry),
            forward_to_worker(voice, voice_tx.clone()),
        ],
    })
}

/// Waits for room in the UI queue. The adapter never re-requests a map id it has
/// already asked for, so this result must not be dropped.
async fn deliver_map_result(ui_tx: Sender<UiEvent>, result: MapFetchResult) -> bool {
    let map_id = result.map_id.clone();
    match tokio::task::spawn_blocking(move || ui_tx.send(UiEvent::MapFetched(result))).await {
        Ok(Ok(())) => true,
        Ok(Err(_)) => {
            tracing::warn!(%map_id, "ui closed before map fetch result was delivered");
            false
        }
        Err(err) => {
            tracing::error!(%map_id, error = %err, "map fetch delivery task failed");
            false
        }
    }
}

fn report(ui_tx: &Sender<UiEvent>, context: UiErrorContext, message: String) {
    tracing::warn!(?context, %message, "backend operation failed");
    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(context, message)));
}

async fn run_worker(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, cache_url: String) {
    let storage = match Storage::new(&cache_url).await {
        Ok(storage) => storage,
        Err(err) => {
            report(
                &ui_tx,
                UiErrorContext::BackendStartup,
                format!("backend worker startup failure: could not open local cache '{cache_url}': {err}"),
            );
            return;
        }
    };
    let cache: Arc<dyn LocalCache> = Arc::new(storage);
    let mut voice = VoiceCommandLog::restore(cache).await;
    let _ = ui_tx.try_send(UiEvent::VoiceCommandsUpdated(voice.commands().to_vec()));
    let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));

    let mut commands = bridge_commands(cmd_rx);
    let (voice_tx, mut voice_rx) = mpsc::channel::<Value>(COMMAND_BRIDGE_CAPACITY);
    let mut relay: Option<Arc<RelayClient>> = None;
    let mut feeds: Option<LiveFeeds> = None;

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    BackendCommand::Connect { server_url } => {
                        if let Some(mut previous) = feeds.take() {
                            previous.stop();
                        }
                        let client = match RelayClient::new(server_url.clone()) {
                            Ok(client) => client,
                            Err(err) => {
                                report(&ui_tx, UiErrorContext::Connect, classify_connect_failure(&err.to_string()));
                                continue;
                            }
                        };
                        match connect_feeds(&client, &ui_tx, &voice_tx).await {
                            Ok(live) => {
                                feeds = Some(live);
                                relay = Some(Arc::new(client));
                                tracing::info!(%server_url, "connected to relay");
                                let _ = ui_tx.try_send(UiEvent::Connected { server_url });
                            }
                            Err(err) => {
                                relay = None;
                                report(&ui_tx, UiErrorContext::Connect, classify_connect_failure(&err.to_string()));
                            }
                        }
                    }
                    BackendCommand::FetchMap(request) => {
                        let Some(client) = relay.clone() else {
                            continue;
                        };
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let result = fetch_map(&*client, request).await;
                            deliver_map_result(ui_tx, result).await;
                        });
                    }
                    BackendCommand::SendRobotControl(command) => {
                        let Some(client) = relay.clone() else {
                            report(&ui_tx, UiErrorContext::SendCommand, "not connected to relay".to_string());
                            continue;
                        };
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let sent = match serde_json::to_value(&command) {
                                Ok(value) => client.append(ROBOT_COMMANDS_PATH, value).await,
                                Err(err) => Err(err.into()),
                            };
                            if let Err(err) = sent {
                                report(&ui_tx, UiErrorContext::SendCommand, format!("robot command failed: {err}"));
                            }
                        });
                    }
                    BackendCommand::SubmitDeliveryTask(record) => {
                        let Some(client) = relay.clone() else {
                            report(&ui_tx, UiErrorContext::SendCommand, "not connected to relay; task kept locally".to_string());
                            continue;
                        };
                        let ui_tx = ui_tx.clone();
                        tokio::spawn(async move {
                            let sent = match serde_json::to_value(&record) {
                                Ok(value) => client.append(DELIVERY_TASKS_PATH, value).await,
                                Err(err) => Err(err.into()),
                            };
                            match sent {
                                Ok(id) => tracing::info!(%id, "delivery task forwarded"),
                                Err(err) => report(&ui_tx, UiErrorContext::SendCommand, format!("delivery task not forwarded: {err}")),
                            }
                        });
                    }
                    BackendCommand::RecordVoiceCommand { command, timestamp_ms } => {
                        let Some(client) = relay.clone() else {
                            report(&ui_tx, UiErrorContext::VoiceLog, "not connected to relay".to_string());
                            continue;
                        };
                        match voice.record(&*client, &command, timestamp_ms).await {
                            Ok(_) => {
                                let _ = ui_tx.try_send(UiEvent::VoiceCommandsUpdated(voice.commands().to_vec()));
                            }
                            Err(err) => report(&ui_tx, UiErrorContext::VoiceLog, format!("voice command not recorded: {err}")),
                        }
                    }
                    BackendCommand::MarkVoiceCommandSent(id) => match voice.mark_sent(&id).await {
                        Ok(true) => {
                            let _ = ui_tx.try_send(UiEvent::VoiceCommandsUpdated(voice.commands().to_vec()));
                        }
                        Ok(false) => tracing::debug!(%id, "voice command already sent or unknown"),
                        Err(err) => report(&ui_tx, UiErrorContext::VoiceLog, format!("could not update voice cache: {err}")),
                    },
                    BackendCommand::Shutdown => break,
                }
            }
            Some(value) = voice_rx.recv() => {
                if let Err(err) = voice.apply_snapshot(&value).await {
                    report(&ui_tx, UiErrorContext::VoiceLog, format!("could not update voice cache: {err}"));
                }
                let _ = ui_tx.try_send(UiEvent::VoiceCommandsUpdated(voice.commands().to_vec()));
            }
        }
    }

    if let Some(mut live) = feeds.take() {
        live.stop();
    }
}
