//! # Sbnlink - Siemens AT Binary Object Transfer Engine
//!
//! Sbnlink drives the vendor binary object-transfer protocol
//! (`AT^SBNR`/`AT^SBNW`) that Siemens phones layer on top of their AT
//! command channel, moving operator logos, MIDI ringtones, vCalendar
//! entries, and vCard phonebook records to and from device storage slots.
//!
//! ## Features
//!
//! - **Half-Duplex Correlation**: one command, one classified reply; waits
//!   are timeout-bounded with an optional retry budget and a prompt
//!   shutdown path.
//! - **Chunked Transfers**: payloads are hex-encoded and pumped in
//!   176-byte chunks, one command/raw-bytes/terminator round trip each,
//!   all-or-nothing.
//! - **Typed Outcomes**: every operation resolves to a record or a
//!   [`LinkError`]; reply classification is exhaustive, so an unparseable
//!   response can never be silently ignored.
//! - **Pluggable Transport**: serial port behind the `serial` feature, or
//!   any byte pipe implementing [`transport::AtTransport`] (the in-process
//!   [`transport::ChannelTransport`] scripts a fake phone in tests).
//! - **Async Design**: built with Tokio; the engine suspends, never spins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sbnlink::at::AtEngine;
//! use sbnlink::config::Config;
//! use sbnlink::transport::serial::SerialTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("sbnlink.toml").await?;
//!     let port = SerialTransport::open(&config.device.port, config.device.baud_rate).await?;
//!     let mut engine = AtEngine::new(port, config.protocol.clone());
//!
//!     let ringtone = engine.read_ringtone(1).await?;
//!     println!("slot 1 holds {} bytes", ringtone.data.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`at`] - Line indexing, reply classification, request correlation
//! - [`sbn`] - Chunked binary frame transfer (scanner and pump)
//! - [`objects`] - Structured records and the public device operations
//! - [`transport`] - Byte transports below the AT layer
//! - [`config`] - Configuration management and validation
//! - [`logutil`] - Log sanitation helpers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  Object Codecs  │ ← bitmap / ringtone / calendar / phonebook
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │  Frame Transfer │ ← hex chunking, scanner and pump
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   AT Channel    │ ← lines, classification, correlation
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │    Transport    │ ← serial port or byte pipe
//! └─────────────────┘
//! ```
//!
//! One engine instance owns one connection and holds at most one request in
//! flight; every operation takes `&mut self`, so sharing an engine without
//! external serialization does not compile.

pub mod at;
pub mod config;
pub mod error;
pub mod logutil;
pub mod objects;
pub mod sbn;
pub mod transport;

pub use at::{AtEngine, Reply, ReplyClass, ShutdownHandle};
pub use error::LinkError;
pub use objects::{Bitmap, BitmapKind, CalendarEntry, CalendarKind, PhonebookEntry, Ringtone};
