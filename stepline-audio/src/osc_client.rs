//! OSC implementation of [`EngineClient`].
//!
//! Every event becomes one OSC message wrapped in a bundle timestamped
//! `latency` seconds ahead, so the engine can absorb tick-driver jitter.
//! A zero latency uses the immediate timetag.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::LazyLock;
use std::thread::JoinHandle;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rosc::{OscBundle, OscMessage, OscPacket, OscTime, OscType};

use crate::client::{ClientError, ClientResult, EngineClient, NoteOn, SampleTrigger};
use crate::osc_sender::{spawn_osc_sender, OscSendQueue};

pub const ADDR_NOTE_ON: &str = "/stepline/note_on";
pub const ADDR_NOTE_OFF: &str = "/stepline/note_off";
pub const ADDR_SAMPLE: &str = "/stepline/sample";
pub const ADDR_SET: &str = "/stepline/set";

pub struct OscClient {
    socket: UdpSocket,
    server_addr: SocketAddr,
    latency_secs: f64,
    queue: OscSendQueue,
    _sender: JoinHandle<()>,
}

impl OscClient {
    /// Bind `local_port` (0 = any) and target the engine at `server_addr`.
    pub fn connect(server_addr: &str, local_port: u16, latency_secs: f64) -> ClientResult<Self> {
        let server_addr = server_addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ClientError(format!("cannot resolve engine address {}", server_addr)))?;
        let socket = UdpSocket::bind(("0.0.0.0", local_port))?;
        let (queue, sender) = spawn_osc_sender(socket.try_clone()?, server_addr)?;

        log::info!(target: "audio::osc", "sending to engine at {}", server_addr);
        Ok(Self {
            socket,
            server_addr,
            latency_secs: latency_secs.max(0.0),
            queue,
            _sender: sender,
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    fn send(&self, addr: &str, args: Vec<OscType>) -> ClientResult {
        let timetag = if self.latency_secs > 0.0 {
            osc_time_from_now(self.latency_secs)
        } else {
            osc_time_immediate()
        };
        let packet = OscPacket::Bundle(OscBundle {
            timetag,
            content: vec![OscPacket::Message(OscMessage {
                addr: addr.to_string(),
                args,
            })],
        });
        let encoded = rosc::encoder::encode(&packet)?;
        if !self.queue.try_queue(encoded.clone()) {
            self.socket.send_to(&encoded, self.server_addr)?;
        }
        Ok(())
    }
}

fn push_params(args: &mut Vec<OscType>, params: &[(&'static str, f32)]) {
    for &(name, value) in params {
        args.push(OscType::String(name.to_string()));
        args.push(OscType::Float(value));
    }
}

/// `/stepline/note_on track velocity duration synth n note.. (name value)..`
pub fn note_on_args(event: &NoteOn) -> Vec<OscType> {
    let mut args = vec![
        OscType::Int(event.track as i32),
        OscType::Float(event.velocity),
        OscType::Float(event.duration_secs as f32),
        OscType::String(event.synth.clone().unwrap_or_default()),
        OscType::Int(event.notes.len() as i32),
    ];
    args.extend(event.notes.iter().map(|&n| OscType::Int(n)));
    push_params(&mut args, &event.params);
    args
}

/// `/stepline/sample track path slice slices pitch src_bpm dst_bpm (name value)..`
pub fn sample_args(event: &SampleTrigger) -> Vec<OscType> {
    let mut args = vec![
        OscType::Int(event.track as i32),
        OscType::String(event.path.to_string_lossy().into_owned()),
        OscType::Int(event.slice),
        OscType::Int(event.slice_count),
        OscType::Float(event.pitch),
        OscType::Float(event.source_bpm),
        OscType::Float(event.target_bpm),
    ];
    push_params(&mut args, &event.params);
    args
}

impl EngineClient for OscClient {
    fn note_on(&self, event: &NoteOn) -> ClientResult {
        self.send(ADDR_NOTE_ON, note_on_args(event))
    }

    fn note_off(&self, track: usize, notes: &[i32]) -> ClientResult {
        let mut args = vec![OscType::Int(track as i32), OscType::Int(notes.len() as i32)];
        args.extend(notes.iter().map(|&n| OscType::Int(n)));
        self.send(ADDR_NOTE_OFF, args)
    }

    fn sample_trigger(&self, event: &SampleTrigger) -> ClientResult {
        self.send(ADDR_SAMPLE, sample_args(event))
    }

    fn param_set(&self, name: &str, value: f32) -> ClientResult {
        self.send(ADDR_SET, vec![OscType::String(name.to_string()), OscType::Float(value)])
    }
}

/// OSC timetags use the NTP epoch (1900-01-01).
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// (monotonic instant, wall-clock seconds) captured once; timetags advance
/// with the monotonic clock so wall-clock adjustments do not jump them.
static CLOCK_ANCHOR: LazyLock<(Instant, f64)> = LazyLock::new(|| {
    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64();
    (Instant::now(), wall)
});

pub fn osc_time_from_now(offset_secs: f64) -> OscTime {
    let (anchor_instant, anchor_wall) = &*CLOCK_ANCHOR;
    let total_secs = anchor_wall + anchor_instant.elapsed().as_secs_f64() + offset_secs;
    let secs = total_secs as u64 + NTP_UNIX_OFFSET;
    let frac = (total_secs.fract() * (u32::MAX as f64)) as u32;
    OscTime {
        seconds: secs as u32,
        fractional: frac,
    }
}

/// Immediate timetag (0,1): execute as soon as received.
pub fn osc_time_immediate() -> OscTime {
    OscTime {
        seconds: 0,
        fractional: 1,
    }
}
