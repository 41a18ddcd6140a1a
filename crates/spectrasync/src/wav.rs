//! WAV decoding into a mono PCM feed.

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader};
use spectrasync_core::{PcmAudioFeed, SpectrumConfig};
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Decoded mono track
#[derive(Debug, Clone)]
pub struct DecodedTrack {
    /// Mono samples in [-1, 1]
    pub samples: Vec<f32>,
    /// Samples per second
    pub sample_rate: u32,
}

impl DecodedTrack {
    /// Wrap the track in a feed using the engine's analyser settings
    pub fn into_feed(self, bin_count: usize, config: SpectrumConfig) -> Result<PcmAudioFeed> {
        PcmAudioFeed::new(self.samples, self.sample_rate, bin_count, config)
            .context("Failed to create audio feed")
    }
}

/// Decode a WAV file from disk
pub fn load(path: &Path) -> Result<DecodedTrack> {
    let reader =
        WavReader::open(path).with_context(|| format!("Failed to open WAV file: {:?}", path))?;
    let track = decode(reader).with_context(|| format!("Failed to decode WAV file: {:?}", path))?;
    info!(
        "Loaded {:?}: {:.1}s @ {}Hz",
        path,
        track.samples.len() as f64 / track.sample_rate as f64,
        track.sample_rate
    );
    Ok(track)
}

/// Decode any WAV stream, normalizing integer samples and mixing to mono
pub fn decode<R: Read>(mut reader: WavReader<R>) -> Result<DecodedTrack> {
    let spec = reader.spec();
    if spec.channels == 0 {
        bail!("WAV file declares zero channels");
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Corrupt float sample data")?,
        SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                bail!("Unsupported bit depth: {}", spec.bits_per_sample);
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()
                .context("Corrupt integer sample data")?
        }
    };

    Ok(DecodedTrack {
        samples: PcmAudioFeed::downmix(&interleaved, spec.channels),
        sample_rate: spec.sample_rate,
    })
}
