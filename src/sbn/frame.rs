//! Frame scanner (receive) and frame pump (send).
//!
//! Receive side: a read reply interleaves tag lines (`^SBNR: "bmp", 1`) with
//! hex data lines; [`extract_frame`] harvests and decodes the data lines in
//! order. Send side: [`AtEngine::send_frame`] hex-encodes the payload,
//! splits it into 352-hex-character chunks and drives one
//! header/raw-bytes/terminator/ack cycle per chunk. Transfers are
//! all-or-nothing: the first failed chunk aborts the whole write and the
//! remote object must be rewritten from scratch.

use log::debug;

use crate::at::engine::AtEngine;
use crate::at::reply::{Reply, ReplyClass};
use crate::error::LinkError;
use crate::transport::AtTransport;

/// Encoded characters per chunk: 352 hex digits, 176 raw bytes.
pub const CHUNK_HEX_CHARS: usize = 352;

/// Upper bound on a decoded object. Large enough for any logo, ringtone or
/// calendar entry these phones store; a reply claiming more is malformed.
pub const MAX_OBJECT_BYTES: usize = 64 * 1024;

/// Locate the hex-encoded lines tagged `tag` in `reply` and decode them into
/// one payload.
///
/// Line 2 carrying the bare success token means the slot is vacant
/// (`Empty`, a normal outcome distinct from a present-but-zero-byte
/// object). Line 2 not mentioning `tag` at all is a format mismatch. The
/// body is scanned pairwise from line 2: a line matching `tag` followed by
/// one that does not marks that second line as data. Decoding is strict:
/// every matched line must be well-formed hex.
pub fn extract_frame(reply: &Reply, tag: &str) -> Result<Vec<u8>, LinkError> {
    if reply.line_contains(2, "OK") {
        return Err(LinkError::Empty);
    }
    if !reply.line_contains(2, tag) {
        return Err(LinkError::failure(format!(
            "reply carries no \"{}\" section",
            tag
        )));
    }
    let mut out = Vec::new();
    let mut i = 2;
    loop {
        if reply.line(i + 1).is_empty() {
            break;
        }
        if reply.line_contains(i, tag) && !reply.line_contains(i + 1, tag) {
            let data = hex::decode(reply.line(i + 1).trim())?;
            if out.len() + data.len() > MAX_OBJECT_BYTES {
                return Err(LinkError::failure("object exceeds maximum size"));
            }
            out.extend_from_slice(&data);
        }
        i += 1;
    }
    debug!("extracted {} byte \"{}\" frame", out.len(), tag);
    Ok(out)
}

impl<T: AtTransport> AtEngine<T> {
    /// Write `payload` to storage slot `wire_location` under `tag`.
    ///
    /// Per chunk: `AT^SBNW="<tag>",<loc>,<n>,<total>` header, raw-mode
    /// switch, the chunk's hex characters verbatim, the terminator octet,
    /// then a short wait for the acknowledgement. Any timeout or rejected
    /// chunk aborts the transfer; the final outcome is whatever the last
    /// exchange resolved to, so success is only reported when the last
    /// acknowledgement explicitly classified as OK.
    pub async fn send_frame(
        &mut self,
        payload: &[u8],
        tag: &str,
        wire_location: u32,
    ) -> Result<(), LinkError> {
        if payload.is_empty() {
            return Err(LinkError::failure("nothing to send"));
        }
        if payload.len() > MAX_OBJECT_BYTES {
            return Err(LinkError::failure("object exceeds maximum size"));
        }
        let encoded = hex::encode_upper(payload);
        let total_chunks = encoded.len().div_ceil(CHUNK_HEX_CHARS);
        let edit_timeout = self.protocol().edit_timeout();
        let ack_timeout = self.protocol().ack_timeout();
        debug!(
            "sending {} byte \"{}\" frame to location {} in {} chunk(s)",
            payload.len(),
            tag,
            wire_location,
            total_chunks
        );

        let mut outcome: Result<(), LinkError> = Err(LinkError::Timeout);
        for (index, chunk) in encoded.as_bytes().chunks(CHUNK_HEX_CHARS).enumerate() {
            let header = format!(
                "AT^SBNW=\"{}\",{},{},{}\r",
                tag,
                wire_location,
                index + 1,
                total_chunks
            );
            self.send_edit(header.as_bytes(), edit_timeout).await?;
            self.write_raw(chunk).await?;
            self.finish_raw().await?;
            let ack = self.send_once(ack_timeout).await?;
            match ack_outcome(&ack) {
                Ok(()) => outcome = Ok(()),
                Err(e) => {
                    debug!(
                        "chunk {}/{} rejected, aborting transfer",
                        index + 1,
                        total_chunks
                    );
                    return Err(e);
                }
            }
        }
        outcome
    }
}

fn ack_outcome(ack: &Reply) -> Result<(), LinkError> {
    match ack.class() {
        ReplyClass::Ok => Ok(()),
        ReplyClass::Error => Err(LinkError::failure("device rejected chunk")),
        ReplyClass::CmsError(code) => Err(LinkError::Cms(code)),
        ReplyClass::Unrecognized => Err(LinkError::UnrecognizedResponse),
    }
}
