//! Data bridge — connects [`Tracker`] channels to TUI actions.
//!
//! Runs as a background task: watches the accessory snapshot, the
//! marker positions, camera directives, and the feed connection state,
//! forwarding every change as an [`Action`] through the TUI's action
//! channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use waymark_core::{CameraAction, ChannelState, Tracker};

use crate::action::Action;

/// Spawn the data bridge connecting tracker channels to the TUI.
///
/// Sends initial snapshots so the panes have data immediately, then
/// loops forwarding every change until cancelled.
pub async fn run_data_bridge(
    tracker: Tracker,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut accessories = tracker.watch_accessories();
    let mut positions = tracker.watch_positions();
    let mut camera = tracker.watch_camera();
    let mut conn_state = tracker.channel_state();

    // Initial snapshots
    let _ = action_tx.send(Action::AccessoriesUpdated(
        accessories.borrow_and_update().clone(),
    ));
    let _ = action_tx.send(Action::PositionsUpdated(
        positions.borrow_and_update().clone(),
    ));
    let _ = action_tx.send(match &*conn_state.borrow_and_update() {
        ChannelState::Connected => Action::Connected,
        ChannelState::Disconnected => Action::Disconnected,
        ChannelState::Reconnecting { .. } => Action::Reconnecting,
    });

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = accessories.changed() => {
                let snapshot = accessories.borrow_and_update().clone();
                let _ = action_tx.send(Action::AccessoriesUpdated(snapshot));
            }
            Ok(()) = positions.changed() => {
                let snapshot = positions.borrow_and_update().clone();
                let _ = action_tx.send(Action::PositionsUpdated(snapshot));
            }
            Ok(()) = camera.changed() => {
                let action = *camera.borrow_and_update();
                if action != CameraAction::None {
                    let _ = action_tx.send(Action::Camera(action));
                }
            }
            Ok(()) = conn_state.changed() => {
                let state = conn_state.borrow_and_update().clone();
                let _ = action_tx.send(match state {
                    ChannelState::Connected => Action::Connected,
                    ChannelState::Disconnected => Action::Disconnected,
                    ChannelState::Reconnecting { .. } => Action::Reconnecting,
                });
            }
        }
    }

    debug!("data bridge shut down");
}
