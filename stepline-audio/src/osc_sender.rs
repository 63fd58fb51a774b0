//! Dedicated OSC send thread.
//!
//! Packets are encoded by the caller (tick driver or arpeggio task) and pushed
//! to a bounded channel. The sender thread drains it and performs
//! `socket.send_to()`, keeping UDP I/O off the tick driver.

use std::net::{SocketAddr, UdpSocket};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// A pre-encoded OSC packet ready for UDP transmission.
pub struct OscSendEntry {
    pub encoded: Vec<u8>,
}

/// Channel capacity for the OSC send queue.
/// Eight tracks with chords and arpeggios stay far below this per tick.
const SEND_QUEUE_CAPACITY: usize = 512;

/// Sending half of the queue.
pub struct OscSendQueue {
    tx: Sender<OscSendEntry>,
}

impl OscSendQueue {
    /// Try to push an encoded packet to the sender thread.
    /// Returns `false` if the channel was full or closed (caller should fall back).
    pub fn try_queue(&self, encoded: Vec<u8>) -> bool {
        match self.tx.try_send(OscSendEntry { encoded }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::warn!(target: "audio::osc_sender", "OSC send queue full, falling back to direct send");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Create the queue and spawn the sender thread.
pub fn spawn_osc_sender(
    socket: UdpSocket,
    server_addr: SocketAddr,
) -> std::io::Result<(OscSendQueue, JoinHandle<()>)> {
    let (tx, rx) = crossbeam_channel::bounded::<OscSendEntry>(SEND_QUEUE_CAPACITY);

    let handle = thread::Builder::new()
        .name("osc-sender".into())
        .spawn(move || sender_loop(socket, server_addr, rx))?;

    Ok((OscSendQueue { tx }, handle))
}

fn sender_loop(socket: UdpSocket, server_addr: SocketAddr, rx: Receiver<OscSendEntry>) {
    while let Ok(entry) = rx.recv() {
        if let Err(e) = socket.send_to(&entry.encoded, server_addr) {
            log::debug!(target: "audio::osc_sender", "send to {} failed: {}", server_addr, e);
        }
    }
}
