//! # Clip Decoder
//!
//! Symphonia decode pipeline over a clip that is already in memory.

use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::error::{PlaybackError, Result};
use bridge_traits::playback::{AudioFormat, AudioFrameChunk};
use bytes::Bytes;
use std::io::Cursor;
use std::time::Duration;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, error, instrument, warn};

/// Corrupt packets tolerated in a row before decoding gives up.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Streaming decoder over an in-memory clip.
///
/// `open` probes the container and builds the codec; `next_chunk` then hands
/// out interleaved `f32` PCM in chunks of at most the requested frame count.
/// Decoding is CPU-bound and synchronous.
pub struct ClipDecoder {
    format_reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    format: AudioFormat,
    duration: Option<Duration>,
    /// Decoded samples not yet handed out.
    pending: Vec<f32>,
    /// Frames handed out so far.
    emitted_frames: u64,
    eof: bool,
}

impl std::fmt::Debug for ClipDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipDecoder")
            .field("track_id", &self.track_id)
            .field("format", &self.format)
            .field("duration", &self.duration)
            .field("emitted_frames", &self.emitted_frames)
            .field("eof", &self.eof)
            .finish()
    }
}

impl ClipDecoder {
    /// Probe `data` and prepare the first audio track for decoding.
    ///
    /// # Errors
    ///
    /// - [`PlaybackError::InvalidFormat`] if the container is not recognized
    ///   or carries no audio track
    /// - [`PlaybackError::UnsupportedCodec`] if no decoder exists for the codec
    #[instrument(skip(data, hint), fields(bytes = data.len()))]
    pub fn open(data: Bytes, hint: Hint) -> Result<Self> {
        let media_source = Box::new(Cursor::new(data)) as Box<dyn MediaSource>;
        let mss = MediaSourceStream::new(media_source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                debug!("Format probe failed: {}", e);
                PlaybackError::InvalidFormat(format!("Failed to probe format: {}", e))
            })?;

        let format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| PlaybackError::InvalidFormat("No supported audio tracks".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let codec = FormatDetector::detect_codec(codec_params.codec);

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| PlaybackError::InvalidFormat("Missing sample rate".to_string()))?;

        // Some containers only reveal the layout after the first packet.
        let channels = codec_params
            .channels
            .map(|ch| ch.count() as u16)
            .unwrap_or(2);

        let duration = codec_params
            .n_frames
            .map(|frames| Duration::from_secs_f64(frames as f64 / sample_rate as f64));

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| {
                error!("Failed to create decoder: {}", e);
                PlaybackError::UnsupportedCodec(format!("{:?}: {}", codec, e))
            })?;

        debug!(
            ?codec,
            sample_rate,
            channels,
            ?duration,
            "Clip decoder ready"
        );

        Ok(Self {
            format_reader,
            decoder,
            track_id,
            format: AudioFormat::new(codec, sample_rate, channels),
            duration,
            pending: Vec::new(),
            emitted_frames: 0,
            eof: false,
        })
    }

    pub fn format(&self) -> &AudioFormat {
        &self.format
    }

    /// Track duration, when the container declares it.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// Next chunk of at most `max_frames` frames, or `None` at end of stream.
    pub fn next_chunk(&mut self, max_frames: usize) -> Result<Option<AudioFrameChunk>> {
        let max_frames = max_frames.max(1);

        while self.pending.len() < max_frames * self.channel_count() && !self.eof {
            match self.decode_next_packet()? {
                Some(samples) => self.pending.extend(samples),
                None => break,
            }
        }

        if self.pending.is_empty() {
            return Ok(None);
        }

        let channels = self.channel_count();
        let wanted = (max_frames * channels).min(self.pending.len());
        let take = match wanted - wanted % channels {
            0 => self.pending.len(),
            whole_frames => whole_frames,
        };

        let samples: Vec<f32> = self.pending.drain(..take).collect();
        let frames = samples.len() / channels;
        let timestamp =
            Duration::from_secs_f64(self.emitted_frames as f64 / self.format.sample_rate as f64);
        self.emitted_frames += frames as u64;

        Ok(Some(AudioFrameChunk::new(samples, frames, timestamp)))
    }

    /// Decode the remaining stream into chunks of `chunk_frames`.
    pub fn decode_all(mut self, chunk_frames: usize) -> Result<DecodedClip> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next_chunk(chunk_frames)? {
            chunks.push(chunk);
        }

        let total_frames = chunks.iter().map(|c| c.frames).sum();
        debug!(
            chunks = chunks.len(),
            total_frames, "Decoded clip to PCM"
        );

        Ok(DecodedClip {
            format: self.format,
            chunks,
            total_frames,
        })
    }

    fn channel_count(&self) -> usize {
        self.format.channels.max(1) as usize
    }

    /// Read and decode packets until one yields samples for our track.
    ///
    /// Corrupt packets are skipped up to [`MAX_CONSECUTIVE_ERRORS`] in a row.
    fn decode_next_packet(&mut self) -> Result<Option<Vec<f32>>> {
        if self.eof {
            return Ok(None);
        }

        let mut consecutive_errors = 0;

        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream at {} frames", self.emitted_frames);
                    self.eof = true;
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    return Err(PlaybackError::DecodingError(
                        "Track list changed, reset required".to_string(),
                    ));
                }
                Err(SymphoniaError::IoError(e)) => {
                    consecutive_errors += 1;
                    warn!(
                        "I/O error reading packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(PlaybackError::DecodingError(format!(
                            "Stream I/O failure after {} attempts: {}",
                            MAX_CONSECUTIVE_ERRORS, e
                        )));
                    }
                    continue;
                }
                Err(e) => {
                    return Err(PlaybackError::DecodingError(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            while !self.format_reader.metadata().is_latest() {
                self.format_reader.metadata().pop();
            }

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let decoded_channels = decoded.spec().channels.count() as u16;
                    if self.format.channels != decoded_channels && self.emitted_frames == 0 {
                        debug!(
                            "Updating channel count from {} to {}",
                            self.format.channels, decoded_channels
                        );
                        self.format.channels = decoded_channels;
                    }

                    return Ok(Some(SampleConverter::to_interleaved_f32(&decoded)));
                }
                Err(SymphoniaError::IoError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping corrupt packet (I/O error, attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(PlaybackError::DecodingError(format!(
                            "Stream corruption after {} failed packets",
                            MAX_CONSECUTIVE_ERRORS
                        )));
                    }
                    continue;
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping corrupt packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );
                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(PlaybackError::DecodingError(format!(
                            "Decoder failure after {} failed packets: {}",
                            MAX_CONSECUTIVE_ERRORS, err
                        )));
                    }
                    continue;
                }
                Err(e) => {
                    return Err(PlaybackError::DecodingError(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }
    }
}

/// A clip decoded to PCM ahead of playback.
#[derive(Debug, Clone)]
pub struct DecodedClip {
    pub format: AudioFormat,
    pub chunks: Vec<AudioFrameChunk>,
    pub total_frames: usize,
}

impl DecodedClip {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.total_frames as f64 / self.format.sample_rate.max(1) as f64)
    }
}
