pub mod decoder;
pub mod ffmpeg;
#[cfg(test)]
pub mod mock;
pub mod source;
pub mod types;

pub use decoder::{Decoder, SeekDispatch, decoder_channel};
pub use ffmpeg::FfmpegDecoder;
pub use source::{
    ByteRange, BytesSource, MediaDataSource, ResolvedSource, SourceResolver, VideoSource,
};
pub use types::{
    DecodedFrame, DecoderCapabilities, DecoderEvent, FrameSlot, SeekMode, VideoMeta,
};
