//! # Bitrate Derivation Module
//!
//! Deriva il bitrate target di un video dal bitrate del container
//! sorgente: un quinto dell'originale, arrotondato per eccesso al
//! multiplo di 100 kbps più vicino. La granularità evita stringhe di
//! bitrate troppo precise che l'encoder potrebbe rifiutare.

use crate::error::CompressionError;
use crate::probe;
use std::path::Path;

/// Fixed reduction target: output bitrate is 1/5th of the source
const REDUCTION_FACTOR: u64 = 5;

/// Rounding granularity in bits per second (100 kbps)
const ROUND_STEP_BPS: u64 = 100_000;

/// Target bitrate string for a source bitrate in bits per second.
///
/// `ceil(bit_rate / 5 / 100_000) * 100`, rendered as `"<N>K"`:
/// 5_000_000 bps becomes `"1000K"`, and anything past an exact multiple
/// rounds up (5_000_001 bps becomes `"1100K"`).
pub fn target_bitrate(original_bps: u64) -> String {
    let kbps = original_bps.div_ceil(REDUCTION_FACTOR * ROUND_STEP_BPS) * 100;
    format!("{}K", kbps)
}

/// Probe a source file and derive its target bitrate.
///
/// Unlike the processed-marker oracle this does NOT fail open: a missing or
/// unparsable `bit_rate` field is a hard error for this file, surfaced to
/// the per-file failure handling in the orchestrator.
pub async fn bitrate_for(path: &Path) -> Result<String, CompressionError> {
    let format = probe::probe_format(path).await?;
    let original = format.bit_rate_bps().ok_or_else(|| {
        CompressionError::Bitrate(format!(
            "No readable bit_rate in container metadata for {}",
            path.display()
        ))
    })?;
    Ok(target_bitrate(original))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_multiple_does_not_round_up() {
        assert_eq!(target_bitrate(5_000_000), "1000K");
        assert_eq!(target_bitrate(500_000), "100K");
        assert_eq!(target_bitrate(10_000_000), "2000K");
    }

    #[test]
    fn test_one_past_a_multiple_rounds_up() {
        assert_eq!(target_bitrate(5_000_001), "1100K");
        assert_eq!(target_bitrate(500_001), "200K");
    }

    #[test]
    fn test_small_sources_clamp_to_the_first_step() {
        assert_eq!(target_bitrate(1), "100K");
        assert_eq!(target_bitrate(499_999), "100K");
    }

    #[test]
    fn test_monotonic_in_source_bitrate() {
        let mut last = 0u64;
        for bps in (0..20_000_000u64).step_by(333_333) {
            let rendered = target_bitrate(bps);
            let kbps: u64 = rendered.trim_end_matches('K').parse().unwrap();
            assert!(kbps >= last, "regressed at {} bps", bps);
            assert_eq!(kbps % 100, 0, "not a multiple of 100K at {} bps", bps);
            last = kbps;
        }
    }

    #[tokio::test]
    async fn test_unreadable_file_is_a_hard_error() {
        let result = bitrate_for(Path::new("/no/such/clip.mp4")).await;
        assert!(result.is_err());
    }
}
