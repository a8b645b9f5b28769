// ============================================================
// Layer 3 - Gain Staging
// ============================================================
// Input and output gain are given in decibels and applied as a
// plain multiplication on the waveform:
//
//     linear = 10 ^ (dB / 20)
//
//   +20 dB → x10,  0 dB → x1,  -6 dB → ~x0.5
//
// Input gain drives the model harder (like turning up the
// guitar volume into an amp); output gain is just a level
// trim on the rendered result.

/// Convert a decibel value to a linear amplitude factor.
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Scale every sample in place by the given gain in dB.
pub fn apply_gain_db(samples: &mut [f32], db: f32) {
    if db == 0.0 {
        return;
    }
    let factor = db_to_linear(db);
    samples.iter_mut().for_each(|s| *s *= factor);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_conversions() {
        assert!((db_to_linear(0.0)   - 1.0).abs() < 1e-6);
        assert!((db_to_linear(20.0)  - 10.0).abs() < 1e-5);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_apply_gain_scales_samples() {
        let mut x = vec![0.01, -0.02, 0.0];
        apply_gain_db(&mut x, 20.0);
        assert!((x[0] - 0.1).abs() < 1e-6);
        assert!((x[1] + 0.2).abs() < 1e-6);
        assert_eq!(x[2], 0.0);
    }
}
