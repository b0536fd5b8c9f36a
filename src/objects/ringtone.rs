//! MIDI ringtones.
//!
//! The payload is an opaque binary blob passed through unchanged; the phone
//! neither names nor frames it, so a fetched ringtone gets a synthesized
//! display name. Only the first two storage slots accept user ringtones.

use log::debug;

use crate::at::engine::AtEngine;
use crate::at::reply::ReplyClass;
use crate::error::LinkError;
use crate::objects::{read_command, wire_location};
use crate::sbn::frame::extract_frame;
use crate::transport::AtTransport;

pub(crate) const RINGTONE_TAG: &str = "mid";

/// Display name used when the source carries none.
pub const DEFAULT_RINGTONE_NAME: &str = "Individual";

/// Highest wire location a user ringtone may occupy.
const MAX_RINGTONE_WIRE_LOCATION: u32 = 1;

/// An opaque MIDI blob in a numbered slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ringtone {
    pub location: u32,
    pub name: String,
    pub data: Vec<u8>,
}

impl<T: AtTransport> AtEngine<T> {
    /// Fetch the ringtone stored at `location` (1-based).
    pub async fn read_ringtone(&mut self, location: u32) -> Result<Ringtone, LinkError> {
        let location = location.max(1);
        let cmd = read_command(RINGTONE_TAG, wire_location(location));
        let reply = self.send_command(&cmd).await?;
        match reply.class() {
            ReplyClass::Ok => {
                let data = extract_frame(&reply, RINGTONE_TAG)?;
                debug!("midi ringtone received, {} bytes", data.len());
                Ok(Ringtone {
                    location,
                    name: DEFAULT_RINGTONE_NAME.to_string(),
                    data,
                })
            }
            ReplyClass::Error => Err(LinkError::failure("device rejected ringtone read")),
            ReplyClass::CmsError(code) => Err(LinkError::Cms(code)),
            ReplyClass::Unrecognized => Err(LinkError::UnrecognizedResponse),
        }
    }

    /// Store `ringtone` at its own location. Location 255 means "the default
    /// slot" and normalizes to 1; anything past the second slot is rejected.
    pub async fn write_ringtone(&mut self, ringtone: &Ringtone) -> Result<(), LinkError> {
        let mut location = ringtone.location;
        if location == 255 {
            location = 1;
        }
        if wire_location(location) > MAX_RINGTONE_WIRE_LOCATION {
            return Err(LinkError::InvalidLocation);
        }
        self.send_frame(&ringtone.data, RINGTONE_TAG, wire_location(location))
            .await
    }
}
