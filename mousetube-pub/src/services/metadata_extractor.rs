//! Audio metadata extraction
//!
//! Reads sampling rate, duration, bit depth, and format from a local audio
//! file using lofty. Extraction is idempotent: it produces a patch holding
//! only the fields the record does not already carry, so user-supplied
//! values are never clobbered and re-runs are no-ops.

use crate::models::{FileRecord, MetadataPatch};
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use thiserror::Error;

/// Audio container extensions accepted for metadata extraction
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "flac", "aiff", "aif", "ogg"];

/// Metadata extraction errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// File extension outside the audio allow-list
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),

    /// Corrupt or truncated audio stream
    #[error("Failed to read audio stream: {0}")]
    ReadError(String),

    /// I/O error (file read)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract audio metadata from a local file.
///
/// Returns a patch containing values only for fields that are currently
/// unset on the record.
pub fn extract_metadata(
    file: &FileRecord,
    local_path: &Path,
) -> Result<MetadataPatch, MetadataError> {
    let extension = local_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| MetadataError::UnsupportedFormat("<no extension>".to_string()))?;

    if !AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(MetadataError::UnsupportedFormat(extension));
    }

    let size = std::fs::metadata(local_path)?.len();

    let tagged_file = Probe::open(local_path)
        .map_err(|e| MetadataError::ReadError(e.to_string()))?
        .read()
        .map_err(|e| MetadataError::ReadError(e.to_string()))?;

    let properties = tagged_file.properties();

    let mut patch = MetadataPatch::default();
    if file.sampling_rate.is_none() {
        patch.sampling_rate = properties.sample_rate().map(i64::from);
    }
    if file.duration.is_none() {
        // Whole seconds, truncated
        patch.duration = Some(properties.duration().as_secs() as i64);
    }
    if file.bit_depth.is_none() {
        patch.bit_depth = properties.bit_depth().and_then(map_bit_depth);
    }
    if file.format.is_none() {
        patch.format = Some(extension);
    }
    if file.size.is_none() {
        patch.size = Some(size as i64);
    }

    tracing::debug!(
        file_id = %file.id,
        path = %local_path.display(),
        sampling_rate = ?patch.sampling_rate,
        duration_s = ?patch.duration,
        bit_depth = ?patch.bit_depth,
        "Extracted audio metadata"
    );

    Ok(patch)
}

/// Keep only the sample encodings the catalog understands: 16/24-bit PCM,
/// 32-bit PCM or float, 64-bit float. Anything else stays unset.
fn map_bit_depth(bits: u8) -> Option<i64> {
    match bits {
        16 | 24 | 32 | 64 => Some(i64::from(bits)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_wav(dir: &Path, name: &str, seconds: u32) -> PathBuf {
        let path = dir.join(name);
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..(44100 * seconds) {
            writer.write_sample(((i % 100) as i16) * 50).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn extracts_rate_duration_bit_depth_from_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(dir.path(), "rec.wav", 2);
        let file = FileRecord::new("rec.wav".into(), "/media/rec.wav".into(), None);

        let patch = extract_metadata(&file, &path).unwrap();
        assert_eq!(patch.sampling_rate, Some(44100));
        assert_eq!(patch.duration, Some(2));
        assert_eq!(patch.bit_depth, Some(16));
        assert_eq!(patch.format, Some("wav".to_string()));
        assert!(patch.size.unwrap() > 0);
    }

    #[test]
    fn populated_fields_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_wav(dir.path(), "rec.wav", 1);

        let mut file = FileRecord::new("rec.wav".into(), "/media/rec.wav".into(), None);
        file.sampling_rate = Some(192_000);
        file.duration = Some(600);
        file.bit_depth = Some(24);
        file.format = Some("wav".to_string());
        file.size = Some(123);

        let patch = extract_metadata(&file, &path).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not audio").unwrap();
        let file = FileRecord::new("notes.txt".into(), "/media/notes.txt".into(), None);

        match extract_metadata(&file, &path) {
            Err(MetadataError::UnsupportedFormat(ext)) => assert_eq!(ext, "txt"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn corrupt_stream_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.wav");
        std::fs::write(&path, b"RIFFgarbage").unwrap();
        let file = FileRecord::new("broken.wav".into(), "/media/broken.wav".into(), None);

        assert!(matches!(
            extract_metadata(&file, &path),
            Err(MetadataError::ReadError(_))
        ));
    }

    #[test]
    fn bit_depth_mapping_drops_unknown_encodings() {
        assert_eq!(map_bit_depth(16), Some(16));
        assert_eq!(map_bit_depth(24), Some(24));
        assert_eq!(map_bit_depth(32), Some(32));
        assert_eq!(map_bit_depth(64), Some(64));
        assert_eq!(map_bit_depth(8), None);
        assert_eq!(map_bit_depth(12), None);
    }
}
