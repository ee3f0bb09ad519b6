use std::time::Duration;

use derelict_common::DT;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{self, MissedTickBehavior};
use tracing::info;

use crate::room_manager::RoomManager;
use crate::transport::{ChannelOutbox, Inbound};

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Applies one connection event to the manager.
pub fn dispatch(manager: &mut RoomManager, outbox: &mut ChannelOutbox, event: Inbound) {
    match event {
        Inbound::Connected { client_id, sender } => {
            outbox.register(client_id, sender);
            manager.connect(client_id, outbox);
        }
        Inbound::Frame { client_id, text } => manager.handle_text(client_id, &text, outbox),
        Inbound::Disconnected { client_id } => {
            manager.disconnect(client_id, outbox);
            outbox.unregister(client_id);
        }
    }
}

/// Single owner of every room. Runs until all connection handles are dropped.
pub async fn run(mut manager: RoomManager, mut inbound: UnboundedReceiver<Inbound>) {
    let mut outbox = ChannelOutbox::new();
    let mut ticker = time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            event = inbound.recv() => {
                let Some(event) = event else {
                    break;
                };
                dispatch(&mut manager, &mut outbox, event);
            }
            _ = ticker.tick() => manager.tick(DT, &mut outbox),
        }
    }
    info!("game loop stopped");
}
