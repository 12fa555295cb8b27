//! Hands UI actions to the backend worker without blocking the frame.

use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// Queues `cmd` for the worker. On failure the reason lands in `status`; the command
/// is dropped.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) {
    let name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => tracing::debug!(command = name, "queued dashboard command"),
        Err(TrySendError::Full(_)) => {
            tracing::warn!(command = name, "backend command queue full");
            *status = format!("Busy; {name} was not sent, try again");
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::error!(command = name, "backend worker is gone");
            *status = "Backend worker stopped; restart the dashboard".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use crossbeam_channel::bounded;

    use super::*;

    #[test]
    fn full_queue_reports_the_dropped_command() {
        let (tx, _rx) = bounded(1);
        let mut status = String::new();
        dispatch_backend_command(&tx, BackendCommand::Shutdown, &mut status);
        assert!(status.is_empty());

        dispatch_backend_command(&tx, BackendCommand::Shutdown, &mut status);
        assert_eq!(status, "Busy; shutdown was not sent, try again");
    }

    #[test]
    fn closed_queue_reports_stopped_worker() {
        let (tx, rx) = bounded(1);
        drop(rx);
        let mut status = String::new();
        dispatch_backend_command(&tx, BackendCommand::Shutdown, &mut status);
        assert!(status.starts_with("Backend worker stopped"));
    }
}
