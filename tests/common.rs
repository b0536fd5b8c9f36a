//! Test utilities & fixtures.
//! A scripted phone on the far end of a [`ChannelTransport`]: it answers
//! `AT^SBNR`/`AT^SBNW` the way the real device does, records everything it
//! was asked, and hands its final state back when the engine hangs up.

// Each test binary uses a different slice of this module.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use sbnlink::config::ProtocolConfig;
use sbnlink::transport::{AtTransport, ChannelTransport};

const RAW_TERMINATOR: u8 = 0x1A;
const CHUNK_HEX_CHARS: usize = 352;

/// Opt-in log capture: run with `RUST_LOG=sbnlink=trace` to see the wire
/// traffic of a failing test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Protocol timings tight enough for tests.
pub fn quick_protocol() -> ProtocolConfig {
    init_logging();
    ProtocolConfig {
        reply_timeout_ms: 200,
        edit_timeout_ms: 200,
        ack_timeout_ms: 200,
        command_retries: 0,
    }
}

/// In-flight chunk state while the phone is in raw mode.
struct RawState {
    tag: String,
    location: u32,
    index: u32,
    total: u32,
}

/// A scripted phone. Populate `slots` with stored objects (keyed by tag and
/// wire location), then `run()` it on a spawned task; it returns itself at
/// EOF so tests can assert on what it saw.
pub struct MockPhone {
    transport: ChannelTransport,
    /// Stored objects by (tag, wire location), decoded bytes.
    pub slots: HashMap<(String, u32), Vec<u8>>,
    /// Locations that answer a read with a bare ERROR.
    pub error_locations: HashSet<(String, u32)>,
    /// Locations that answer a read with `+CMS ERROR: <code>`.
    pub cms_locations: HashMap<(String, u32), u16>,
    /// Chunk index (1-based) whose acknowledgement is an ERROR.
    pub nack_chunk: Option<u32>,
    /// Every command line received, in order.
    pub commands: Vec<String>,
    /// Every write header received: (tag, wire location, index, total).
    pub write_headers: Vec<(String, u32, u32, u32)>,
    pending_hex: HashMap<(String, u32), String>,
}

impl MockPhone {
    pub fn new(transport: ChannelTransport) -> Self {
        MockPhone {
            transport,
            slots: HashMap::new(),
            error_locations: HashSet::new(),
            cms_locations: HashMap::new(),
            nack_chunk: None,
            commands: Vec::new(),
            write_headers: Vec::new(),
            pending_hex: HashMap::new(),
        }
    }

    /// Serve the engine until it drops its end, then return final state.
    pub async fn run(mut self) -> MockPhone {
        let mut buf: Vec<u8> = Vec::new();
        let mut raw: Option<RawState> = None;
        loop {
            let data = match self.transport.read_chunk().await {
                Ok(data) => data,
                Err(_) => return self,
            };
            buf.extend_from_slice(&data);
            loop {
                if raw.is_some() {
                    let Some(pos) = buf.iter().position(|&b| b == RAW_TERMINATOR) else {
                        // whole chunk not here yet
                        let state = raw.as_ref().unwrap();
                        let key = (state.tag.clone(), state.location);
                        self.pending_hex
                            .entry(key)
                            .or_default()
                            .push_str(&String::from_utf8_lossy(&buf));
                        buf.clear();
                        break;
                    };
                    let state = raw.take().unwrap();
                    let key = (state.tag.clone(), state.location);
                    self.pending_hex
                        .entry(key)
                        .or_default()
                        .push_str(&String::from_utf8_lossy(&buf[..pos]));
                    buf.drain(..=pos);
                    self.finish_chunk(state).await;
                } else if let Some(pos) = buf.iter().position(|&b| b == b'\r') {
                    let line: Vec<u8> = buf.drain(..=pos).collect();
                    let cmd = String::from_utf8_lossy(&line[..line.len() - 1])
                        .trim()
                        .to_string();
                    if cmd.is_empty() {
                        continue;
                    }
                    raw = self.handle_command(&cmd).await;
                } else {
                    break;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: &str) -> Option<RawState> {
        self.commands.push(cmd.to_string());
        if let Some((tag, location)) = parse_sbnr(cmd) {
            self.answer_read(cmd, &tag, location).await;
            return None;
        }
        if let Some((tag, args)) = parse_sbnw(cmd) {
            match args.as_slice() {
                // delete form
                [location, 0] => {
                    self.slots.remove(&(tag, *location));
                    self.reply(cmd, "OK").await;
                }
                [location, index, total] => {
                    self.write_headers
                        .push((tag.clone(), *location, *index, *total));
                    let _ = self.transport.write_all(b"\r\n> ").await;
                    return Some(RawState {
                        tag,
                        location: *location,
                        index: *index,
                        total: *total,
                    });
                }
                _ => self.reply(cmd, "ERROR").await,
            }
            return None;
        }
        self.reply(cmd, "ERROR").await;
        None
    }

    async fn answer_read(&mut self, cmd: &str, tag: &str, location: u32) {
        let key = (tag.to_string(), location);
        if let Some(code) = self.cms_locations.get(&key) {
            let body = format!("+CMS ERROR: {}", code);
            self.reply(cmd, &body).await;
            return;
        }
        if self.error_locations.contains(&key) {
            self.reply(cmd, "ERROR").await;
            return;
        }
        match self.slots.get(&key) {
            Some(payload) => {
                let encoded = hex::encode_upper(payload);
                let mut body = String::new();
                for (i, chunk) in encoded.as_bytes().chunks(CHUNK_HEX_CHARS).enumerate() {
                    body.push_str(&format!(
                        "^SBNR: \"{}\", {}\r\n{}\r\n",
                        tag,
                        i + 1,
                        String::from_utf8_lossy(chunk)
                    ));
                }
                body.push_str("OK");
                self.reply(cmd, &body).await;
            }
            None => self.reply(cmd, "OK").await,
        }
    }

    async fn finish_chunk(&mut self, state: RawState) {
        if self.nack_chunk == Some(state.index) {
            self.pending_hex
                .remove(&(state.tag.clone(), state.location));
            let _ = self.transport.write_all(b"\r\nERROR\r\n").await;
            return;
        }
        if state.index == state.total {
            let key = (state.tag.clone(), state.location);
            if let Some(hex_payload) = self.pending_hex.remove(&key) {
                if let Ok(decoded) = hex::decode(hex_payload.trim()) {
                    self.slots.insert(key, decoded);
                }
            }
        }
        let _ = self.transport.write_all(b"\r\nOK\r\n").await;
    }

    async fn reply(&mut self, cmd: &str, body: &str) {
        let full = format!("{}\r\r\n{}\r\n", cmd, body);
        let _ = self.transport.write_all(full.as_bytes()).await;
    }
}

fn parse_quoted_tag(rest: &str) -> Option<(String, &str)> {
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some((rest[..end].to_string(), &rest[end + 1..]))
}

/// Parse `AT^SBNR="tag",loc`.
pub fn parse_sbnr(cmd: &str) -> Option<(String, u32)> {
    let rest = cmd.strip_prefix("AT^SBNR=")?;
    let (tag, rest) = parse_quoted_tag(rest)?;
    let location = rest.strip_prefix(',')?.trim().parse().ok()?;
    Some((tag, location))
}

/// Parse `AT^SBNW="tag",a[,b[,c]]`.
pub fn parse_sbnw(cmd: &str) -> Option<(String, Vec<u32>)> {
    let rest = cmd.strip_prefix("AT^SBNW=")?;
    let (tag, rest) = parse_quoted_tag(rest)?;
    let args = rest
        .strip_prefix(',')?
        .split(',')
        .map(|part| part.trim().parse())
        .collect::<Result<Vec<u32>, _>>()
        .ok()?;
    Some((tag, args))
}
