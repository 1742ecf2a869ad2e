//! Pixel buffer and its fast-path stream layout.
//!
//! Images are not streamed per pixel. After the type name the wire carries
//! explicit geometry followed by the raw pixel bytes:
//! ```text
//! ┌───────┬────────┬────────┬─────────┬──────────────┬────────────┬───────────┐
//! │ width │ height │ format │ colors  │ color table  │ byte count │ raw bytes │
//! │ i32   │ i32    │ i32    │ i32 (n) │ n × u32      │ i32 (m)    │ m bytes   │
//! └───────┴────────┴────────┴─────────┴──────────────┴────────────┴───────────┘
//! ```
//!
//! Rows are padded to 32-bit boundaries; the byte count is whatever the
//! buffer reports, never recomputed on encode.

use crate::error::{MarshalError, Result};
use crate::registry::Streamable;
use crate::stream::{StreamReader, StreamWriter};

/// Registered name of the pixel buffer type.
pub const PIXEL_BUFFER_TYPE: &str = "QImage";

/// Pixel format discriminant (wire value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PixelFormat(pub i32);

impl PixelFormat {
    pub const INVALID: PixelFormat = PixelFormat(0);
    pub const MONO: PixelFormat = PixelFormat(1);
    pub const MONO_LSB: PixelFormat = PixelFormat(2);
    pub const INDEXED8: PixelFormat = PixelFormat(3);
    pub const RGB32: PixelFormat = PixelFormat(4);
    pub const ARGB32: PixelFormat = PixelFormat(5);
    pub const ARGB32_PREMULTIPLIED: PixelFormat = PixelFormat(6);
    pub const RGB16: PixelFormat = PixelFormat(7);
    pub const ARGB8565_PREMULTIPLIED: PixelFormat = PixelFormat(8);
    pub const RGB666: PixelFormat = PixelFormat(9);
    pub const ARGB6666_PREMULTIPLIED: PixelFormat = PixelFormat(10);
    pub const RGB555: PixelFormat = PixelFormat(11);
    pub const ARGB8555_PREMULTIPLIED: PixelFormat = PixelFormat(12);
    pub const RGB888: PixelFormat = PixelFormat(13);
    pub const RGB444: PixelFormat = PixelFormat(14);
    pub const ARGB4444_PREMULTIPLIED: PixelFormat = PixelFormat(15);
    pub const RGBX8888: PixelFormat = PixelFormat(16);
    pub const RGBA8888: PixelFormat = PixelFormat(17);
    pub const RGBA8888_PREMULTIPLIED: PixelFormat = PixelFormat(18);
    pub const BGR30: PixelFormat = PixelFormat(19);
    pub const A2BGR30_PREMULTIPLIED: PixelFormat = PixelFormat(20);
    pub const RGB30: PixelFormat = PixelFormat(21);
    pub const A2RGB30_PREMULTIPLIED: PixelFormat = PixelFormat(22);
    pub const ALPHA8: PixelFormat = PixelFormat(23);
    pub const GRAYSCALE8: PixelFormat = PixelFormat(24);

    /// Bits per pixel, or `None` for invalid/unknown formats.
    pub fn depth(self) -> Option<u32> {
        let bits = match self.0 {
            1 | 2 => 1,
            3 | 23 | 24 => 8,
            7 | 11 | 14 | 15 => 16,
            8 | 9 | 10 | 12 | 13 => 24,
            4 | 5 | 6 | 16..=22 => 32,
            _ => return None,
        };
        Some(bits)
    }

    /// Whether pixels index into a colour table.
    pub fn is_indexed(self) -> bool {
        matches!(self, Self::MONO | Self::MONO_LSB | Self::INDEXED8)
    }
}

/// Bytes per row for a given width and depth, padded to 32 bits.
fn bytes_per_line(width: usize, depth: u32) -> Option<usize> {
    let bits = width.checked_mul(depth as usize)?;
    Some(bits.checked_add(31)? / 32 * 4)
}

/// Dense image: geometry, optional colour table and raw pixel storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    color_table: Vec<u32>,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a zero-filled buffer of the given geometry.
    ///
    /// A zero width or height yields a null buffer.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Ok(Self::default());
        }
        let len = Self::storage_len(width, height, format)?;
        Ok(Self {
            width,
            height,
            format,
            color_table: Vec::new(),
            data: vec![0; len],
        })
    }

    /// Build a buffer around existing pixel bytes.
    ///
    /// `data` must have exactly the padded size of the geometry.
    pub fn from_raw(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Result<Self> {
        let len = Self::expected_len(width, height, format)?;
        if data.len() != len {
            return Err(MarshalError::load_failed(
                PIXEL_BUFFER_TYPE,
                format!("pixel data is {} bytes, geometry needs {}", data.len(), len),
            ));
        }
        if len == 0 {
            return Ok(Self::default());
        }
        Ok(Self {
            width,
            height,
            format,
            color_table: Vec::new(),
            data,
        })
    }

    /// Storage size for a geometry, zero for a null buffer.
    fn expected_len(width: u32, height: u32, format: PixelFormat) -> Result<usize> {
        if width == 0 || height == 0 {
            return Ok(0);
        }
        Self::storage_len(width, height, format)
    }

    fn storage_len(width: u32, height: u32, format: PixelFormat) -> Result<usize> {
        // Dimensions travel as i32.
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(MarshalError::load_failed(
                PIXEL_BUFFER_TYPE,
                format!("image geometry {}x{} is too large", width, height),
            ));
        }
        let depth = format.depth().ok_or_else(|| {
            MarshalError::load_failed(
                PIXEL_BUFFER_TYPE,
                format!("unsupported pixel format {}", format.0),
            )
        })?;
        bytes_per_line(width as usize, depth)
            .and_then(|line| line.checked_mul(height as usize))
            .filter(|len| *len <= i32::MAX as usize)
            .ok_or_else(|| {
                MarshalError::load_failed(
                    PIXEL_BUFFER_TYPE,
                    format!("image geometry {}x{} is too large", width, height),
                )
            })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.data.is_empty()
    }

    /// Row stride in bytes.
    pub fn bytes_per_line(&self) -> usize {
        if self.height == 0 {
            0
        } else {
            self.data.len() / self.height as usize
        }
    }

    /// Total size of the pixel storage.
    #[inline]
    pub fn byte_count(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn color_table(&self) -> &[u32] {
        &self.color_table
    }

    pub fn set_color_table(&mut self, table: Vec<u32>) {
        self.color_table = table;
    }

    /// Raw pixel bytes.
    #[inline]
    pub fn bits(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn bits_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Borrow one row of pixel bytes, padding included.
    pub fn scan_line(&self, row: u32) -> Option<&[u8]> {
        if row >= self.height {
            return None;
        }
        let stride = self.bytes_per_line();
        let start = row as usize * stride;
        self.data.get(start..start + stride)
    }

    pub fn scan_line_mut(&mut self, row: u32) -> Option<&mut [u8]> {
        if row >= self.height {
            return None;
        }
        let stride = self.bytes_per_line();
        let start = row as usize * stride;
        self.data.get_mut(start..start + stride)
    }
}

/// Write a pixel buffer's fast-path payload (everything after the type name).
pub fn encode_pixel_buffer(image: &PixelBuffer, stream: &mut StreamWriter) {
    stream.write_i32(image.width as i32);
    stream.write_i32(image.height as i32);
    stream.write_i32(image.format.0);

    stream.write_i32(image.color_table.len() as i32);
    for &color in &image.color_table {
        stream.write_u32(color);
    }

    stream.write_i32(image.byte_count() as i32);
    stream.write_raw(image.bits());
}

fn read_dimension(stream: &mut StreamReader<'_>, what: &str) -> Result<u32> {
    let value = stream.read_i32()?;
    u32::try_from(value).map_err(|_| {
        MarshalError::load_failed(PIXEL_BUFFER_TYPE, format!("negative {} {}", what, value))
    })
}

/// Read a pixel buffer's fast-path payload.
///
/// The byte count is checked against the stream and against the geometry
/// before any pixel storage is allocated.
pub fn decode_pixel_buffer(stream: &mut StreamReader<'_>) -> Result<PixelBuffer> {
    let width = read_dimension(stream, "width")?;
    let height = read_dimension(stream, "height")?;
    let format = PixelFormat(stream.read_i32()?);

    let color_count = read_dimension(stream, "color count")?;
    let color_table = if color_count > 0 {
        stream.read_u32_vec(color_count as usize)?
    } else {
        Vec::new()
    };

    let byte_count = read_dimension(stream, "byte count")? as usize;
    if stream.remaining() < byte_count {
        return Err(MarshalError::TruncatedPixelData {
            expected: byte_count,
            available: stream.remaining(),
        });
    }

    let expected = PixelBuffer::expected_len(width, height, format)?;
    if expected != byte_count {
        return Err(MarshalError::load_failed(
            PIXEL_BUFFER_TYPE,
            format!(
                "byte count {} does not match {}x{} geometry ({} bytes)",
                byte_count, width, height, expected
            ),
        ));
    }

    let data = stream.read_raw(byte_count)?.to_vec();
    let mut image = PixelBuffer::from_raw(width, height, format, data)?;
    image.set_color_table(color_table);
    Ok(image)
}

impl Streamable for PixelBuffer {
    const TYPE_NAME: &'static str = PIXEL_BUFFER_TYPE;

    fn save(&self, stream: &mut StreamWriter) -> Result<()> {
        encode_pixel_buffer(self, stream);
        Ok(())
    }

    fn load(&mut self, stream: &mut StreamReader<'_>) -> Result<()> {
        *self = decode_pixel_buffer(stream)?;
        Ok(())
    }
}
