//! Real-time side of stepline: the tick-driven scheduler, the arpeggiator
//! runtime and the engine clients that carry their output.

pub mod arp_runtime;
pub mod client;
pub mod commands;
pub mod dispatch;
pub mod handle;
pub mod osc_client;
pub mod osc_sender;
pub mod playback;
pub mod telemetry;
mod transport_thread;

pub use arp_runtime::{ArpRuntime, Voice};
pub use client::{ClientError, ClientOp, ClientResult, EngineClient, NoteOn, NullClient, SampleTrigger, TestClient};
pub use commands::{TransportCmd, TransportFeedback};
pub use dispatch::{RowDispatcher, Tempo};
pub use handle::{TransportError, TransportHandle, TransportSettings};
pub use osc_client::OscClient;
pub use playback::{
    AdvancePolicy, Advance, PlaybackCursor, PlaybackStart, RowEvent, RowSink, Scheduler, StartPoint, MAX_ADVANCE_HOPS,
};
pub use telemetry::{TelemetrySummary, TickTelemetry};
