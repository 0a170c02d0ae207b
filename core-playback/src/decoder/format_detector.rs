//! Probe hints from clip URLs and MIME types, and codec id mapping.

use bridge_traits::playback::AudioCodec;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

pub struct FormatDetector;

impl FormatDetector {
    /// File extension of the URL path, ignoring query string and fragment.
    ///
    /// Signed links carry their token in the query string, so
    /// `https://cdn/tts/3.mp3?token=abc` yields `mp3`.
    pub fn extension_from_url(url: &str) -> Option<&str> {
        let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
        let file = path.rsplit('/').next()?;
        let (stem, extension) = file.rsplit_once('.')?;
        if stem.is_empty() || extension.is_empty() {
            return None;
        }
        Some(extension)
    }

    /// Probe hint for a clip, from its URL and an optional MIME type.
    pub fn hint_for(url: &str, mime_type: Option<&str>) -> Hint {
        let mut hint = Hint::new();

        if let Some(extension) = Self::extension_from_url(url) {
            debug!(extension, "Probe hint from URL");
            hint.with_extension(extension);
        }

        if let Some(mime) = mime_type {
            debug!(mime, "Probe hint from content type");
            hint.mime_type(mime);
        }

        hint
    }

    /// MIME type guessed from a URL's extension.
    pub fn mime_type_for_url(url: &str) -> Option<&'static str> {
        let mime = match Self::extension_from_url(url)?.to_ascii_lowercase().as_str() {
            "mp3" => "audio/mpeg",
            "m4a" | "mp4" | "aac" => "audio/mp4",
            "flac" => "audio/flac",
            "ogg" | "oga" => "audio/ogg",
            "opus" => "audio/opus",
            "wav" => "audio/wav",
            "webm" => "audio/webm",
            _ => return None,
        };
        Some(mime)
    }

    /// Bridge codec for a Symphonia codec id. Every PCM layout reports `Wav`.
    pub fn detect_codec(codec_type: CodecType) -> AudioCodec {
        use symphonia::core::codecs as c;

        const PCM: &[CodecType] = &[
            c::CODEC_TYPE_PCM_U8,
            c::CODEC_TYPE_PCM_S16LE,
            c::CODEC_TYPE_PCM_S16BE,
            c::CODEC_TYPE_PCM_S24LE,
            c::CODEC_TYPE_PCM_S24BE,
            c::CODEC_TYPE_PCM_S32LE,
            c::CODEC_TYPE_PCM_S32BE,
            c::CODEC_TYPE_PCM_F32LE,
            c::CODEC_TYPE_PCM_F32BE,
            c::CODEC_TYPE_PCM_F64LE,
            c::CODEC_TYPE_PCM_F64BE,
        ];
        match codec_type {
            _ if PCM.contains(&codec_type) => AudioCodec::Wav,
            c::CODEC_TYPE_MP3 => AudioCodec::Mp3,
            c::CODEC_TYPE_AAC => AudioCodec::Aac,
            c::CODEC_TYPE_FLAC => AudioCodec::Flac,
            c::CODEC_TYPE_VORBIS => AudioCodec::Vorbis,
            c::CODEC_TYPE_OPUS => AudioCodec::Opus,
            c::CODEC_TYPE_ALAC => AudioCodec::Other("alac".to_string()),
            other => {
                warn!(codec_type = ?other, "Unmapped codec");
                AudioCodec::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_ignores_signature() {
        assert_eq!(
            FormatDetector::extension_from_url("https://cdn.test/tts/u1/3.mp3?token=a.b.c"),
            Some("mp3")
        );
        assert_eq!(
            FormatDetector::extension_from_url("https://cdn.test/clip.wav#t=1"),
            Some("wav")
        );
        assert_eq!(FormatDetector::extension_from_url("https://cdn.test/clip"), None);
        assert_eq!(FormatDetector::extension_from_url("https://cdn.test/.hidden"), None);
    }

    #[test]
    fn mime_from_url() {
        assert_eq!(
            FormatDetector::mime_type_for_url("https://a/b.MP3?x=1"),
            Some("audio/mpeg")
        );
        assert_eq!(FormatDetector::mime_type_for_url("https://a/b.bin"), None);
    }

    #[test]
    fn codec_mapping() {
        use symphonia::core::codecs::{CODEC_TYPE_MP3, CODEC_TYPE_PCM_S16LE};
        assert_eq!(FormatDetector::detect_codec(CODEC_TYPE_MP3), AudioCodec::Mp3);
        assert_eq!(
            FormatDetector::detect_codec(CODEC_TYPE_PCM_S16LE),
            AudioCodec::Wav
        );
    }
}
