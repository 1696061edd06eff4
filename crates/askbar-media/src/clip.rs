use bytes::{BufMut, Bytes, BytesMut};

use crate::audio::AudioConfig;

/// A finished recording: every captured chunk joined in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub config: AudioConfig,
    /// Interleaved samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn from_chunks(config: AudioConfig, chunks: Vec<Vec<f32>>) -> Self {
        let samples = chunks.into_iter().flatten().collect();
        Self { config, samples }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        let frames = self.samples.len() / usize::from(self.config.channels.max(1));
        frames as f32 / self.config.sample_rate.max(1) as f32
    }

    /// Encode as a 16-bit PCM WAV file.
    pub fn to_wav(&self) -> Bytes {
        const HEADER_LEN: usize = 44;
        const BITS_PER_SAMPLE: u16 = 16;

        let channels = self.config.channels.max(1);
        let block_align = channels * (BITS_PER_SAMPLE / 8);
        let byte_rate = self.config.sample_rate * u32::from(block_align);
        let data_len = (self.samples.len() * 2) as u32;

        let mut buf = BytesMut::with_capacity(HEADER_LEN + data_len as usize);
        buf.put_slice(b"RIFF");
        buf.put_u32_le(36 + data_len);
        buf.put_slice(b"WAVE");

        buf.put_slice(b"fmt ");
        buf.put_u32_le(16);
        buf.put_u16_le(1); // PCM
        buf.put_u16_le(channels);
        buf.put_u32_le(self.config.sample_rate);
        buf.put_u32_le(byte_rate);
        buf.put_u16_le(block_align);
        buf.put_u16_le(BITS_PER_SAMPLE);

        buf.put_slice(b"data");
        buf.put_u32_le(data_len);
        for &sample in &self.samples {
            buf.put_i16_le((sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16);
        }

        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_joined_in_order() {
        let clip = AudioClip::from_chunks(
            AudioConfig::default(),
            vec![vec![0.1, 0.2], vec![0.3]],
        );
        assert_eq!(clip.samples, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_duration() {
        let config = AudioConfig {
            sample_rate: 4,
            channels: 2,
        };
        let clip = AudioClip::from_chunks(config, vec![vec![0.0; 16]]);
        assert!((clip.duration_secs() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_wav_header() {
        let clip = AudioClip::from_chunks(AudioConfig::default(), vec![vec![1.0, -1.0, 2.0]]);
        let wav = clip.to_wav();

        assert_eq!(wav.len(), 44 + 6);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes(wav[40..44].try_into().unwrap()), 6);
        assert_eq!(i16::from_le_bytes([wav[44], wav[45]]), i16::MAX);
        assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), -i16::MAX);
        // out-of-range samples are clipped
        assert_eq!(i16::from_le_bytes([wav[48], wav[49]]), i16::MAX);
    }
}
