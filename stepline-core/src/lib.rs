//! # stepline-core
//!
//! Control-side library for stepline: configuration, the advance policies
//! that decide how playback continues once a chain ends, and a demo project.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stepline_audio::{NullClient, TransportHandle};
//! use stepline_core::{config::Config, demo::demo_store};
//!
//! let config = Config::load();
//! let mut transport = TransportHandle::spawn(Arc::new(NullClient), config.transport_settings())?;
//! transport.set_store(demo_store("samples"))?;
//! let mode = config.mode();
//! transport.play(mode.start(0, 0), mode.policy())?;
//! ```

pub mod config;
pub mod demo;
pub mod policy;

pub use config::Config;
pub use policy::{ChainLoop, OneShot, PhraseLoop, PlaybackMode, SongLoop};
