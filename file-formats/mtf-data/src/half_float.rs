//! IEEE-754 binary16 packing used by vertex UV channels.

use half::f16;

/// Pack a 32-bit float into the raw bits of a half float.
///
/// Values outside the half range saturate to infinity, NaN stays NaN.
pub fn pack_half(value: f32) -> u16 {
    f16::from_f32(value).to_bits()
}

/// Unpack raw half float bits into a 32-bit float.
pub fn unpack_half(bits: u16) -> f32 {
    f16::from_bits(bits).to_f32()
}

/// Pack a UV pair. `None` writes the `0xFFFF` sentinel used for absent channels.
pub fn pack_half_pair(uv: Option<[f32; 2]>) -> [u16; 2] {
    match uv {
        Some([u, v]) => [pack_half(u), pack_half(v)],
        None => [ABSENT_CHANNEL, ABSENT_CHANNEL],
    }
}

/// Raw value written for UV channels that carry no data.
pub const ABSENT_CHANNEL: u16 = 0xFFFF;

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0.0, 0x0000 ; "zero")]
    #[test_case(1.0, 0x3C00 ; "one")]
    #[test_case(-2.0, 0xC000 ; "minus two")]
    #[test_case(0.5, 0x3800 ; "half")]
    fn test_pack_known_values(value: f32, bits: u16) {
        assert_eq!(pack_half(value), bits);
        assert_eq!(unpack_half(bits), value);
    }

    #[test]
    fn test_pack_saturates_to_infinity() {
        assert_eq!(unpack_half(pack_half(1.0e6)), f32::INFINITY);
    }

    #[test]
    fn test_nan_stays_nan() {
        assert!(unpack_half(pack_half(f32::NAN)).is_nan());
    }

    #[test]
    fn test_absent_pair() {
        assert_eq!(pack_half_pair(None), [0xFFFF, 0xFFFF]);
        assert_eq!(pack_half_pair(Some([1.0, 0.0])), [0x3C00, 0x0000]);
    }
}
