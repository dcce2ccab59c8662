//! GIF stream parsing: header, blocks and LZW image data into [`LogicalFrame`]s.

pub(crate) mod frame;
mod lzw;
mod reader;
pub(crate) mod stream;

pub use frame::{ColorTable, DisposalMethod, LogicalFrame, LoopCount};
pub use stream::{DecodeOpts, DecodedStream, GifDecoder, ScreenDescriptor, decode, decode_with};
