use crate::core::quality::Quality;
use crate::storage::bytes_to_mb;

/// Stand-in for a lossy encoder: keeps the first `floor(len * q / 100)` bytes.
///
/// No decoding happens, so for any quality below 100 the result is not a
/// valid image any more.
pub fn simulate_compress(data: &[u8], quality: Quality) -> Vec<u8> {
    data[..quality.retained_len(data.len())].to_vec()
}

pub fn optimize(data: &[u8], quality: Quality) -> Vec<u8> {
    simulate_compress(data, quality)
}

#[derive(Debug, Clone)]
pub struct QualityVariant {
    pub quality: Quality,
    pub data: Vec<u8>,
}

impl QualityVariant {
    pub fn simulated_size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn simulated_size_mb(&self) -> f64 {
        bytes_to_mb(self.data.len() as u64)
    }
}

pub fn build_variant(data: &[u8], quality: Quality) -> QualityVariant {
    QualityVariant {
        quality,
        data: optimize(data, quality),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(percent: u32) -> Quality {
        Quality::new(percent).unwrap()
    }

    #[test]
    fn length_is_floor_of_fraction_for_every_quality() {
        let buffers: [&[u8]; 4] = [b"", b"x", b"0123456789", &[7u8; 1001]];
        for data in buffers {
            for percent in 0..=100 {
                let out = simulate_compress(data, q(percent));
                assert_eq!(out.len(), data.len() * percent as usize / 100);
                assert_eq!(&data[..out.len()], &out[..]);
            }
        }
    }

    #[test]
    fn full_quality_is_identity_and_zero_is_empty() {
        let data = b"not really an image".to_vec();
        assert_eq!(simulate_compress(&data, Quality::FULL), data);
        assert!(simulate_compress(&data, q(0)).is_empty());
    }

    #[test]
    fn optimize_matches_simulation() {
        let data: Vec<u8> = (0..=255).collect();
        assert_eq!(optimize(&data, q(33)), simulate_compress(&data, q(33)));
        // Deterministic
        assert_eq!(optimize(&data, q(33)), optimize(&data, q(33)));
    }

    #[test]
    fn variant_sizes_scale_with_quality() {
        let data = vec![0u8; 3 * 1024 * 1024];
        let sizes: Vec<f64> = [75, 50, 25]
            .into_iter()
            .map(|p| build_variant(&data, q(p)).simulated_size_mb())
            .collect();
        assert_eq!(sizes, vec![2.25, 1.5, 0.75]);
    }
}
