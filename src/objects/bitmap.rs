//! Operator-logo bitmaps.
//!
//! Logos travel as a self-describing monochrome BMP container. Before a
//! write, the second palette entry (bytes 58..61 of the container) is
//! patched to the transparency sentinel `0xFF`: the phone keys transparency
//! off that color, and without the patch logos render with an opaque
//! background.
//! The on-wire length is the 16-bit little-endian file size the container
//! header itself declares at bytes 2..4.

use log::debug;

use crate::at::engine::AtEngine;
use crate::at::reply::ReplyClass;
use crate::error::LinkError;
use crate::objects::{read_command, wire_location};
use crate::sbn::frame::extract_frame;
use crate::transport::AtTransport;

pub(crate) const BITMAP_TAG: &str = "bmp";

/// Fixed palette offsets patched to the transparency sentinel before a write.
const TRANSPARENCY_OFFSETS: [usize; 3] = [58, 59, 60];
const TRANSPARENCY_SENTINEL: u8 = 0xFF;

/// Byte offset where the 1bpp pixel rows start: 14-byte file header,
/// 40-byte info header, two palette entries.
const PIXEL_DATA_OFFSET: usize = 62;

/// What the phone uses a bitmap slot for. Only the operator logo rides the
/// `bmp` transfer tag on this device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapKind {
    OperatorLogo,
    StartupLogo,
}

/// A monochrome logo. `pixels` holds MSB-first packed rows, top-down,
/// `(width + 7) / 8` bytes per row, set bit = dark pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub location: u32,
    pub kind: BitmapKind,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    /// Packed bytes per row in `pixels`.
    pub fn row_bytes(&self) -> usize {
        (self.width as usize + 7) / 8
    }
}

/// BMP rows are padded to four-byte boundaries.
fn bmp_row_stride(width: u32) -> usize {
    ((width as usize + 31) / 32) * 4
}

/// Build the BMP container for `bitmap`.
pub fn encode_bmp(bitmap: &Bitmap) -> Result<Vec<u8>, LinkError> {
    if bitmap.width == 0 || bitmap.height == 0 {
        return Err(LinkError::failure("bitmap has zero dimension"));
    }
    let row_bytes = bitmap.row_bytes();
    if bitmap.pixels.len() != row_bytes * bitmap.height as usize {
        return Err(LinkError::failure("bitmap pixel buffer size mismatch"));
    }
    let stride = bmp_row_stride(bitmap.width);
    let image_size = stride * bitmap.height as usize;
    let file_size = PIXEL_DATA_OFFSET + image_size;
    // The on-wire length field is 16 bits; a larger container would wrap
    // modulo 65536 and go out truncated.
    if file_size > u16::MAX as usize {
        return Err(LinkError::failure("bitmap container exceeds 16-bit size field"));
    }

    let mut out = vec![0u8; file_size];
    out[0] = b'B';
    out[1] = b'M';
    out[2..6].copy_from_slice(&(file_size as u32).to_le_bytes());
    out[10..14].copy_from_slice(&(PIXEL_DATA_OFFSET as u32).to_le_bytes());
    out[14..18].copy_from_slice(&40u32.to_le_bytes());
    out[18..22].copy_from_slice(&bitmap.width.to_le_bytes());
    out[22..26].copy_from_slice(&bitmap.height.to_le_bytes());
    out[26..28].copy_from_slice(&1u16.to_le_bytes());
    out[28..30].copy_from_slice(&1u16.to_le_bytes());
    out[34..38].copy_from_slice(&(image_size as u32).to_le_bytes());
    out[46..50].copy_from_slice(&2u32.to_le_bytes());
    out[50..54].copy_from_slice(&2u32.to_le_bytes());
    // Palette: index 0 dark, index 1 light. Rows are stored bottom-up and a
    // set source bit (dark) becomes palette index 0, so bits invert.
    out[58] = 0xFF;
    out[59] = 0xFF;
    out[60] = 0xFF;
    for y in 0..bitmap.height as usize {
        let src = &bitmap.pixels[y * row_bytes..(y + 1) * row_bytes];
        let dst_row = bitmap.height as usize - 1 - y;
        let dst = &mut out[PIXEL_DATA_OFFSET + dst_row * stride..];
        for (i, &b) in src.iter().enumerate() {
            dst[i] = !b;
        }
    }
    Ok(out)
}

/// Re-derive dimensions and pixels from a BMP container.
pub fn decode_bmp(data: &[u8]) -> Result<Bitmap, LinkError> {
    if data.len() < PIXEL_DATA_OFFSET {
        return Err(LinkError::failure("bitmap container too short"));
    }
    if data[0] != b'B' || data[1] != b'M' {
        return Err(LinkError::failure("not a BMP container"));
    }
    let bpp = u16::from_le_bytes([data[28], data[29]]);
    if bpp != 1 {
        return Err(LinkError::failure("not a monochrome bitmap"));
    }
    let width = u32::from_le_bytes([data[18], data[19], data[20], data[21]]);
    let height = u32::from_le_bytes([data[22], data[23], data[24], data[25]]);
    if width == 0 || height == 0 || width > 4096 || height > 4096 {
        return Err(LinkError::failure("implausible bitmap dimensions"));
    }
    let offset = u32::from_le_bytes([data[10], data[11], data[12], data[13]]) as usize;
    let stride = bmp_row_stride(width);
    if offset
        .checked_add(stride * height as usize)
        .map(|end| end > data.len())
        .unwrap_or(true)
    {
        return Err(LinkError::failure("bitmap container truncated"));
    }
    let row_bytes = (width as usize + 7) / 8;
    let mut pixels = vec![0u8; row_bytes * height as usize];
    for y in 0..height as usize {
        let src_row = height as usize - 1 - y;
        let src = &data[offset + src_row * stride..];
        for i in 0..row_bytes {
            pixels[y * row_bytes + i] = !src[i];
        }
    }
    Ok(Bitmap {
        location: 0,
        kind: BitmapKind::OperatorLogo,
        width,
        height,
        pixels,
    })
}

impl<T: AtTransport> AtEngine<T> {
    /// Fetch the logo stored at `location` (1-based).
    pub async fn read_bitmap(&mut self, kind: BitmapKind, location: u32) -> Result<Bitmap, LinkError> {
        if kind != BitmapKind::OperatorLogo {
            return Err(LinkError::NotSupported);
        }
        let location = location.max(1);
        let cmd = read_command(BITMAP_TAG, wire_location(location));
        let reply = self.send_command(&cmd).await?;
        match reply.class() {
            ReplyClass::Ok => {
                let container = extract_frame(&reply, BITMAP_TAG)?;
                debug!("operator logo received, {} bytes", container.len());
                let mut bitmap = decode_bmp(&container)?;
                bitmap.location = location;
                Ok(bitmap)
            }
            ReplyClass::Error => Err(LinkError::failure("device rejected logo read")),
            ReplyClass::CmsError(code) => Err(LinkError::Cms(code)),
            ReplyClass::Unrecognized => Err(LinkError::UnrecognizedResponse),
        }
    }

    /// Store `bitmap` at its own location (1-based; 0 is normalized to 1).
    pub async fn write_bitmap(&mut self, bitmap: &Bitmap) -> Result<(), LinkError> {
        if bitmap.kind != BitmapKind::OperatorLogo {
            return Err(LinkError::NotSupported);
        }
        let mut container = encode_bmp(bitmap)?;
        // On-wire length is the 16-bit file size the header declares.
        let wire_len = u16::from_le_bytes([container[2], container[3]]) as usize;
        if wire_len == 0 || wire_len > container.len() {
            return Err(LinkError::failure("corrupt bitmap container header"));
        }
        for &off in &TRANSPARENCY_OFFSETS {
            container[off] = TRANSPARENCY_SENTINEL;
        }
        debug!("sending operator logo, {} bytes", wire_len);
        self.send_frame(&container[..wire_len], BITMAP_TAG, wire_location(bitmap.location))
            .await
    }
}
