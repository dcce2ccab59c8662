use std::iter::FusedIterator;
use std::sync::Arc;

use crate::{
    decode::frame::{ColorTable, DisposalMethod, LogicalFrame, LoopCount},
    decode::lzw,
    decode::reader::ByteReader,
    foundation::core::{Canvas, FrameBounds},
    foundation::error::DecodeError,
};

const EXTENSION: u8 = 0x21;
const IMAGE: u8 = 0x2c;
const TRAILER: u8 = 0x3b;

const LABEL_GRAPHIC_CONTROL: u8 = 0xf9;
const LABEL_APPLICATION: u8 = 0xff;

/// Decoder limits.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DecodeOpts {
    /// Refuse canvases or frames with more pixels than this. `None` disables the check.
    pub max_pixels: Option<u64>,
}

impl Default for DecodeOpts {
    fn default() -> Self {
        Self {
            max_pixels: Some(1 << 26),
        }
    }
}

/// Logical screen descriptor plus the global color table.
#[derive(Clone, Debug)]
pub struct ScreenDescriptor {
    /// Canvas dimensions.
    pub canvas: Canvas,
    /// Table used by frames without a local one.
    pub global_color_table: Option<Arc<ColorTable>>,
    /// Background color index. Compositing clears to transparent, so this is informational.
    pub background_index: u8,
}

/// Result of a full decode.
#[derive(Clone, Debug)]
pub struct DecodedStream {
    /// Canvas dimensions.
    pub canvas: Canvas,
    /// Frames in stream order. Never empty.
    pub frames: Vec<LogicalFrame>,
    /// Loop count from the application extension, if the stream declares one.
    pub loop_count: Option<LoopCount>,
}

#[derive(Clone, Copy, Debug, Default)]
struct GraphicControl {
    disposal: DisposalMethod,
    delay_cs: u16,
    transparent_index: Option<u8>,
}

/// Forward-only lazy frame decoder.
///
/// The header is parsed by [`GifDecoder::new`]; each call to `next` parses blocks up to and
/// including the next image. After the trailer or the first error the iterator is exhausted.
pub struct GifDecoder<'a> {
    reader: ByteReader<'a>,
    screen: ScreenDescriptor,
    opts: DecodeOpts,
    control: Option<GraphicControl>,
    loop_count: Option<LoopCount>,
    frames_seen: usize,
    done: bool,
}

impl<'a> GifDecoder<'a> {
    /// Parse the header with default limits.
    pub fn new(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        Self::with_opts(bytes, DecodeOpts::default())
    }

    /// Parse the header with explicit limits.
    pub fn with_opts(bytes: &'a [u8], opts: DecodeOpts) -> Result<Self, DecodeError> {
        let mut reader = ByteReader::new(bytes);

        let sig = reader
            .bytes(6, "signature")
            .map_err(|_| DecodeError::BadSignature)?;
        if sig != b"GIF87a" && sig != b"GIF89a" {
            return Err(DecodeError::BadSignature);
        }

        let width = reader.u16_le("logical screen width")?;
        let height = reader.u16_le("logical screen height")?;
        let packed = reader.u8("logical screen flags")?;
        let background_index = reader.u8("background color index")?;
        let _aspect = reader.u8("pixel aspect ratio")?;

        let canvas = Canvas::new(u32::from(width), u32::from(height));
        check_limit(canvas.pixel_count(), &opts)?;

        let global_color_table = if packed & 0x80 != 0 {
            Some(Arc::new(read_color_table(
                &mut reader,
                packed & 0x07,
                "global color table",
            )?))
        } else {
            None
        };

        Ok(Self {
            reader,
            screen: ScreenDescriptor {
                canvas,
                global_color_table,
                background_index,
            },
            opts,
            control: None,
            loop_count: None,
            frames_seen: 0,
            done: false,
        })
    }

    /// Canvas dimensions from the logical screen descriptor.
    pub fn canvas(&self) -> Canvas {
        self.screen.canvas
    }

    /// Parsed logical screen descriptor.
    pub fn screen(&self) -> &ScreenDescriptor {
        &self.screen
    }

    /// Loop count, once the application extension carrying it has been parsed.
    pub fn loop_count(&self) -> Option<LoopCount> {
        self.loop_count
    }

    fn next_frame(&mut self) -> Result<Option<LogicalFrame>, DecodeError> {
        loop {
            let offset = self.reader.offset();
            match self.reader.u8("block introducer")? {
                EXTENSION => self.read_extension()?,
                IMAGE => return self.read_image().map(Some),
                TRAILER => return Ok(None),
                byte => return Err(DecodeError::UnknownBlock { byte, offset }),
            }
        }
    }

    fn read_extension(&mut self) -> Result<(), DecodeError> {
        match self.reader.u8("extension label")? {
            LABEL_GRAPHIC_CONTROL => {
                let size = self.reader.u8("graphic control extension")? as usize;
                let block = self.reader.bytes(size, "graphic control extension")?;
                if block.len() < 4 {
                    return Err(DecodeError::MalformedBlock {
                        context: "graphic control extension",
                    });
                }
                let packed = block[0];
                self.control = Some(GraphicControl {
                    disposal: DisposalMethod::from_code((packed >> 2) & 0x07),
                    delay_cs: u16::from_le_bytes([block[1], block[2]]),
                    transparent_index: (packed & 0x01 != 0).then_some(block[3]),
                });
                self.reader.skip_sub_blocks("graphic control extension")
            }
            LABEL_APPLICATION => {
                let size = self.reader.u8("application extension")? as usize;
                let ident = self.reader.bytes(size, "application extension")?;
                if ident == b"NETSCAPE2.0" || ident == b"ANIMEXTS1.0" {
                    let data = self.reader.sub_blocks("application extension")?;
                    if data.len() >= 3 && data[0] == 1 {
                        self.loop_count =
                            Some(LoopCount::from_wire(u16::from_le_bytes([data[1], data[2]])));
                    }
                    Ok(())
                } else {
                    self.reader.skip_sub_blocks("application extension")
                }
            }
            // Comments, plain text and anything unknown carry nothing we render.
            _ => self.reader.skip_sub_blocks("extension"),
        }
    }

    fn read_image(&mut self) -> Result<LogicalFrame, DecodeError> {
        let frame = self.frames_seen;
        let left = self.reader.u16_le("image descriptor")?;
        let top = self.reader.u16_le("image descriptor")?;
        let width = self.reader.u16_le("image descriptor")?;
        let height = self.reader.u16_le("image descriptor")?;
        let packed = self.reader.u8("image descriptor")?;
        let bounds = FrameBounds::new(
            u32::from(left),
            u32::from(top),
            u32::from(width),
            u32::from(height),
        );
        check_limit(bounds.pixel_count() as u64, &self.opts)?;

        let color_table = if packed & 0x80 != 0 {
            Arc::new(read_color_table(
                &mut self.reader,
                packed & 0x07,
                "local color table",
            )?)
        } else {
            self.screen
                .global_color_table
                .clone()
                .ok_or(DecodeError::MissingColorTable { frame })?
        };
        let interlaced = packed & 0x40 != 0;

        let min_code_size = self.reader.u8("lzw minimum code size")?;
        let data = self.reader.sub_blocks("image data")?;
        let mut pixel_indices = lzw::decompress(min_code_size, &data, bounds.pixel_count())?;
        if interlaced {
            pixel_indices = deinterlace(&pixel_indices, width as usize, height as usize);
        }

        let control = self.control.take().unwrap_or_default();
        let delay_ms = u32::from(control.delay_cs) * 10;
        self.frames_seen += 1;

        tracing::debug!(
            frame,
            ?bounds,
            disposal = ?control.disposal,
            delay_ms,
            interlaced,
            "decoded frame"
        );

        Ok(LogicalFrame {
            pixel_indices,
            color_table,
            transparent_index: control.transparent_index,
            disposal: control.disposal,
            delay_ms,
            bounds,
        })
    }
}

impl Iterator for GifDecoder<'_> {
    type Item = Result<LogicalFrame, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for GifDecoder<'_> {}

/// Decode every frame with default limits.
pub fn decode(bytes: &[u8]) -> Result<DecodedStream, DecodeError> {
    decode_with(bytes, &DecodeOpts::default())
}

/// Decode every frame. Fails on the first malformed block; a stream without images is
/// [`DecodeError::NoFrames`].
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode_with(bytes: &[u8], opts: &DecodeOpts) -> Result<DecodedStream, DecodeError> {
    let mut decoder = GifDecoder::with_opts(bytes, opts.clone())?;
    let frames = decoder.by_ref().collect::<Result<Vec<_>, _>>()?;
    if frames.is_empty() {
        return Err(DecodeError::NoFrames);
    }
    Ok(DecodedStream {
        canvas: decoder.canvas(),
        frames,
        loop_count: decoder.loop_count(),
    })
}

fn check_limit(pixels: u64, opts: &DecodeOpts) -> Result<(), DecodeError> {
    match opts.max_pixels {
        Some(limit) if pixels > limit => Err(DecodeError::ImageTooLarge { pixels, limit }),
        _ => Ok(()),
    }
}

fn read_color_table(
    reader: &mut ByteReader<'_>,
    size_bits: u8,
    context: &'static str,
) -> Result<ColorTable, DecodeError> {
    let entries = 2usize << size_bits;
    let bytes = reader.bytes(entries * 3, context)?;
    Ok(ColorTable::from_rgb_bytes(bytes))
}

/// Reorder rows stored in four-pass interlace order back to top-to-bottom order.
fn deinterlace(rows: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width == 0 || height == 0 {
        return rows.to_vec();
    }
    let mut out = vec![0u8; rows.len()];
    let mut src = rows.chunks_exact(width);
    for (start, step) in [(0, 8), (4, 8), (2, 4), (1, 2)] {
        for y in (start..height).step_by(step) {
            if let Some(row) = src.next() {
                out[y * width..(y + 1) * width].copy_from_slice(row);
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/decode/stream.rs"]
mod tests;
