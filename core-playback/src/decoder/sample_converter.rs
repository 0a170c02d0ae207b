//! # Sample Format Converter
//!
//! Normalizes decoded Symphonia buffers to interleaved `f32`.

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;

/// Converts any Symphonia sample layout to interleaved `f32` in `[-1.0, 1.0]`.
pub struct SampleConverter;

impl SampleConverter {
    /// Interleave (LRLR...) and convert a decoded buffer.
    pub fn to_interleaved_f32(buffer: &AudioBufferRef<'_>) -> Vec<f32> {
        match buffer {
            AudioBufferRef::F32(buf) => Self::interleave(buf, |sample: f32| sample),
            AudioBufferRef::F64(buf) => Self::interleave(buf, |sample: f64| sample.into_sample()),
            AudioBufferRef::S32(buf) => Self::interleave(buf, |sample: i32| sample.into_sample()),
            AudioBufferRef::S24(buf) => Self::interleave(buf, |sample| IntoSample::into_sample(sample)),
            AudioBufferRef::S16(buf) => Self::interleave(buf, |sample: i16| sample.into_sample()),
            AudioBufferRef::S8(buf) => Self::interleave(buf, |sample: i8| sample.into_sample()),
            AudioBufferRef::U32(buf) => Self::interleave(buf, |sample: u32| sample.into_sample()),
            AudioBufferRef::U24(buf) => Self::interleave(buf, |sample| IntoSample::into_sample(sample)),
            AudioBufferRef::U16(buf) => Self::interleave(buf, |sample: u16| sample.into_sample()),
            AudioBufferRef::U8(buf) => Self::interleave(buf, |sample: u8| sample.into_sample()),
        }
    }

    fn interleave<T>(buf: &AudioBuffer<T>, convert: fn(T) -> f32) -> Vec<f32>
    where
        T: Sample + Copy,
    {
        let channels = buf.spec().channels.count();
        let frames = buf.frames();
        let mut interleaved = Vec::with_capacity(frames * channels);

        for frame in 0..frames {
            for channel in 0..channels {
                interleaved.push(convert(buf.chan(channel)[frame]));
            }
        }

        interleaved
    }
}
