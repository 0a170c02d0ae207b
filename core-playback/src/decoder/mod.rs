//! In-process decoding for the PCM strategies, on top of symphonia.
//!
//! ```text
//! Bytes ─> probe (hint from URL / Content-Type) ─> codec ─> f32 interleave ─> AudioFrameChunk
//! ```
//!
//! Clips are short speech recordings and are fully buffered before probing.
//! The buffered-stream strategy pulls chunks with [`ClipDecoder::next_chunk`];
//! the decode-graph strategy renders everything up front with
//! [`ClipDecoder::decode_all`] so a clip can be replayed without refetching.
//!
//! ```rust,no_run
//! use core_playback::decoder::{ClipDecoder, FormatDetector};
//!
//! # fn example(data: bytes::Bytes) -> core_playback::Result<()> {
//! let url = "https://cdn.example.com/tts/line-3.mp3?token=abc";
//! let mut decoder = ClipDecoder::open(data, FormatDetector::hint_for(url, None))?;
//! while let Some(chunk) = decoder.next_chunk(4096)? {
//!     let _ = chunk.frames;
//! }
//! # Ok(())
//! # }
//! ```

mod clip;
mod format_detector;
mod sample_converter;

pub use clip::{ClipDecoder, DecodedClip};
pub use format_detector::FormatDetector;
pub use sample_converter::SampleConverter;
