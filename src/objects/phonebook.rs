//! Phonebook records (read only).
//!
//! The phone answers a `vcf` read with a single hex line on line 3 of the
//! reply; decoded, it is a vCard 2.1 text card. There is no write side on
//! this transfer tag. A bare ERROR classification for this read means the
//! location is out of range, not a generic failure.

use log::debug;

use crate::at::engine::AtEngine;
use crate::at::reply::ReplyClass;
use crate::error::LinkError;
use crate::objects::{read_command, wire_location};
use crate::transport::AtTransport;

pub(crate) const PHONEBOOK_TAG: &str = "vcf";

/// One contact record from a numbered slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhonebookEntry {
    pub location: u32,
    pub name: String,
    pub number: String,
}

/// Parse vCard 2.1 text into (name, number). The name comes from `N` (or
/// `FN` as fallback) with its component separators collapsed; the number is
/// the first `TEL` property. A card with neither is not a contact.
pub fn decode_vcard(data: &[u8]) -> Result<(String, String), LinkError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| LinkError::failure("phonebook entry is not valid text"))?;
    let mut name = String::new();
    let mut number = String::new();
    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let base_key = key.split(';').next().unwrap_or(key).to_ascii_uppercase();
        match base_key.as_str() {
            "N" | "FN" => {
                if name.is_empty() {
                    name = value
                        .split(';')
                        .filter(|part| !part.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                }
            }
            "TEL" => {
                if number.is_empty() {
                    number = value.trim().to_string();
                }
            }
            _ => {}
        }
    }
    if name.is_empty() && number.is_empty() {
        return Err(LinkError::failure("vcard carries neither name nor number"));
    }
    Ok((name, number))
}

impl<T: AtTransport> AtEngine<T> {
    /// Fetch the contact stored at `location` (1-based).
    pub async fn read_phonebook_entry(
        &mut self,
        location: u32,
    ) -> Result<PhonebookEntry, LinkError> {
        let location = location.max(1);
        let cmd = read_command(PHONEBOOK_TAG, wire_location(location));
        let reply = self.send_command(&cmd).await?;
        match reply.class() {
            ReplyClass::Ok => {
                let hex_line = reply.copy_line(3);
                if hex_line.is_empty() {
                    return Err(LinkError::UnrecognizedResponse);
                }
                let raw = hex::decode(hex_line.trim())?;
                let (name, number) = decode_vcard(&raw)?;
                debug!("phonebook entry received from location {}", location);
                Ok(PhonebookEntry {
                    location,
                    name,
                    number,
                })
            }
            // The phone answers a read past the end of the phonebook with a
            // bare ERROR rather than a CMS code.
            ReplyClass::Error => Err(LinkError::InvalidLocation),
            ReplyClass::CmsError(code) => Err(LinkError::Cms(code)),
            ReplyClass::Unrecognized => Err(LinkError::UnrecognizedResponse),
        }
    }
}
