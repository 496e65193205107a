//! Tick and sqrt-price conversions for concentrated liquidity pools.
//!
//! Prices follow `price = 1.0001^tick`; sqrt prices are Q64.96 fixed point.

use alloy::primitives::U256;

use super::fee::FeeTier;
use super::{UniswapError, UniswapResult};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = -MIN_TICK;

/// Sqrt price at [`MIN_TICK`].
pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739, 0, 0, 0]);
/// Sqrt price at [`MAX_TICK`].
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([6743328256752651558, 17280870778742802505, 4294805859, 0]);

const Q96: f64 = 79228162514264337593543950336.0;

fn check_tick(tick: i32) -> UniswapResult<()> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(UniswapError::InvalidArgument(format!(
            "Tick {tick} is outside [{MIN_TICK}, {MAX_TICK}]"
        )));
    }
    Ok(())
}

/// Returns `sqrt(1.0001^tick) * 2^96`, rounded up, computed exactly with the
/// bitwise multiplier table of the pool contracts.
pub fn tick_to_sqrt_price(tick: i32) -> UniswapResult<U256> {
    check_tick(tick)?;
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 1 != 0 {
        U256::from_limbs([12262481743371124737, 18445821805675392311, 0, 0])
    } else {
        U256::from_limbs([0, 0, 1, 0])
    };

    macro_rules! apply_multiplier {
        ($bit:expr, $l0:expr, $l1:expr) => {
            if abs_tick & $bit != 0 {
                ratio = ratio.wrapping_mul(U256::from_limbs([$l0, $l1, 0, 0])) >> 128;
            }
        };
    }

    apply_multiplier!(2, 6459403834229662010, 18444899583751176498);
    apply_multiplier!(4, 17226890335427755468, 18443055278223354162);
    apply_multiplier!(8, 2032852871939366096, 18439367220385604838);
    apply_multiplier!(16, 14545316742740207172, 18431993317065449817);
    apply_multiplier!(32, 5129152022828963008, 18417254355718160513);
    apply_multiplier!(64, 4894419605888772193, 18387811781193591352);
    apply_multiplier!(128, 1280255884321894483, 18329067761203520168);
    apply_multiplier!(256, 15924666964335305636, 18212142134806087854);
    apply_multiplier!(512, 8010504389359918676, 17980523815641551639);
    apply_multiplier!(1024, 10668036004952895731, 17526086738831147013);
    apply_multiplier!(2048, 4878133418470705625, 16651378430235024244);
    apply_multiplier!(4096, 9537173718739605541, 15030750278693429944);
    apply_multiplier!(8192, 9972618978014552549, 12247334978882834399);
    apply_multiplier!(16384, 10428997489610666743, 8131365268884726200);
    apply_multiplier!(32768, 9305304367709015974, 3584323654723342297);
    apply_multiplier!(65536, 14301143598189091785, 696457651847595233);
    apply_multiplier!(131072, 7393154844743099908, 26294789957452057);
    apply_multiplier!(262144, 2209338891292245656, 37481735321082);
    apply_multiplier!(524288, 10518117631919034274, 76158723);

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    let round_up = ratio.as_limbs()[0] & 0xFFFF_FFFF != 0;
    Ok((ratio >> 32) + U256::from(round_up as u64))
}

/// Inverse of [`tick_to_sqrt_price`] through logarithms, rounded to the
/// nearest tick.
pub fn sqrt_price_to_tick(sqrt_price_x96: U256) -> UniswapResult<i32> {
    if sqrt_price_x96.is_zero() {
        return Err(UniswapError::InvalidArgument(
            "Sqrt price must be positive".to_string(),
        ));
    }

    let ratio = u256_to_f64(sqrt_price_x96) / Q96;
    let price = ratio * ratio;
    let tick = (price.ln() / 1.0001f64.ln()).round();

    if !(f64::from(MIN_TICK)..=f64::from(MAX_TICK)).contains(&tick) {
        return Err(UniswapError::InvalidArgument(format!(
            "Sqrt price {sqrt_price_x96} maps outside [{MIN_TICK}, {MAX_TICK}]"
        )));
    }
    Ok(tick as i32)
}

/// Decodes a Q64.96 sqrt price into the plain token1/token0 price.
pub fn sqrt_price_to_price(sqrt_price_x96: U256) -> f64 {
    let ratio = u256_to_f64(sqrt_price_x96) / Q96;
    ratio * ratio
}

/// Encodes `amount1 / amount0` as a Q64.96 sqrt price.
pub fn encode_sqrt_ratio_x96(amount0: U256, amount1: U256) -> UniswapResult<U256> {
    if amount0.is_zero() {
        return Err(UniswapError::InvalidArgument(
            "amount0 must be non-zero".to_string(),
        ));
    }
    let numerator = amount1.checked_shl(192).ok_or_else(|| {
        UniswapError::InvalidArgument(format!("amount1 {amount1} is too large to encode"))
    })?;
    Ok((numerator / amount0).root(2))
}

pub fn tick_spacing(fee: FeeTier) -> i32 {
    fee.tick_spacing()
}

/// Widest range of initializable ticks for pools of `fee`.
pub fn default_tick_range(fee: FeeTier) -> (i32, i32) {
    let spacing = fee.tick_spacing();
    let max_tick = (MAX_TICK / spacing) * spacing;
    (-max_tick, max_tick)
}

/// Rounds `tick` to the nearest multiple of the tier's spacing, half to even.
///
/// Fails when `tick` lies outside [`default_tick_range`] instead of clamping.
pub fn nearest_valid_tick(tick: i32, fee: FeeTier) -> UniswapResult<i32> {
    let (min_tick, max_tick) = default_tick_range(fee);
    if !(min_tick..=max_tick).contains(&tick) {
        return Err(UniswapError::InvalidArgument(format!(
            "Provided tick {tick} is out of bounds: ({min_tick}, {max_tick})"
        )));
    }

    let spacing = fee.tick_spacing();
    let rounded = (f64::from(tick) / f64::from(spacing)).round_ties_even() as i32 * spacing;

    Ok(if rounded < min_tick {
        rounded + spacing
    } else if rounded > max_tick {
        rounded - spacing
    } else {
        rounded
    })
}

/// Bitmap word index and bit position of a compressed tick (`tick / spacing`).
pub fn bitmap_position(compressed: i32) -> (i16, u8) {
    ((compressed >> 8) as i16, (compressed & 0xff) as u8)
}

/// First and last bitmap words that can hold initialized ticks for `fee`.
pub fn bitmap_word_range(fee: FeeTier) -> (i16, i16) {
    let (min_tick, max_tick) = default_tick_range(fee);
    let spacing = fee.tick_spacing();
    (
        bitmap_position(min_tick / spacing).0,
        bitmap_position(max_tick / spacing).0,
    )
}

/// Tick of bit `bit` in bitmap word `word`.
pub fn tick_at_bitmap_position(word: i16, bit: u8, fee: FeeTier) -> i32 {
    ((i32::from(word) << 8) + i32::from(bit)) * fee.tick_spacing()
}

/// Converts with `f64` precision, sufficient for approximate price math.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, limb| acc * 18446744073709551616.0 + *limb as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_to_sqrt_price_known_values() {
        assert_eq!(tick_to_sqrt_price(0).unwrap(), U256::from(1u128 << 96));
        assert_eq!(tick_to_sqrt_price(MIN_TICK).unwrap(), MIN_SQRT_RATIO);
        assert_eq!(tick_to_sqrt_price(MAX_TICK).unwrap(), MAX_SQRT_RATIO);
    }

    #[test]
    fn test_tick_to_sqrt_price_is_monotonic() {
        let mut previous = tick_to_sqrt_price(-1000).unwrap();
        for tick in (-999..=1000).step_by(7) {
            let current = tick_to_sqrt_price(tick).unwrap();
            assert!(current > previous, "not increasing at {tick}");
            previous = current;
        }
    }

    #[test]
    fn test_tick_bounds_are_enforced() {
        assert!(tick_to_sqrt_price(MAX_TICK + 1).is_err());
        assert!(tick_to_sqrt_price(MIN_TICK - 1).is_err());
        assert!(sqrt_price_to_tick(U256::ZERO).is_err());
        assert!(sqrt_price_to_tick(U256::MAX).is_err());
    }

    #[test]
    fn test_round_trip_through_sqrt_price() {
        let ticks = [
            MIN_TICK,
            -500_000,
            -200_000,
            -60,
            -1,
            0,
            1,
            60,
            69_081,
            200_000,
            500_000,
            MAX_TICK,
        ];
        for tick in ticks {
            let sqrt_price = tick_to_sqrt_price(tick).unwrap();
            assert_eq!(sqrt_price_to_tick(sqrt_price).unwrap(), tick);
        }
    }

    #[test]
    fn test_sqrt_price_to_price() {
        let sqrt_price = tick_to_sqrt_price(0).unwrap();
        assert!((sqrt_price_to_price(sqrt_price) - 1.0).abs() < 1e-12);

        let four = encode_sqrt_ratio_x96(U256::from(1), U256::from(4)).unwrap();
        assert_eq!(four, U256::from(1u128 << 97));
        assert!((sqrt_price_to_price(four) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_tick_range_per_tier() {
        assert_eq!(default_tick_range(FeeTier::Tier100), (-887272, 887272));
        assert_eq!(default_tick_range(FeeTier::Tier500), (-887270, 887270));
        assert_eq!(default_tick_range(FeeTier::Tier3000), (-887220, 887220));
        assert_eq!(default_tick_range(FeeTier::Tier10000), (-887200, 887200));
    }

    #[test]
    fn test_nearest_valid_tick_rounds_to_spacing() {
        assert_eq!(nearest_valid_tick(29, FeeTier::Tier3000).unwrap(), 0);
        assert_eq!(nearest_valid_tick(31, FeeTier::Tier3000).unwrap(), 60);
        assert_eq!(nearest_valid_tick(-31, FeeTier::Tier3000).unwrap(), -60);
        // ties go to the even multiple
        assert_eq!(nearest_valid_tick(30, FeeTier::Tier3000).unwrap(), 0);
        assert_eq!(nearest_valid_tick(90, FeeTier::Tier3000).unwrap(), 120);
        assert_eq!(nearest_valid_tick(5, FeeTier::Tier500).unwrap(), 0);
        assert_eq!(nearest_valid_tick(15, FeeTier::Tier500).unwrap(), 20);
    }

    #[test]
    fn test_nearest_valid_tick_stays_inside_range() {
        assert_eq!(
            nearest_valid_tick(887219, FeeTier::Tier3000).unwrap(),
            887220
        );
        assert_eq!(
            nearest_valid_tick(-887210, FeeTier::Tier3000).unwrap(),
            -887220
        );
        assert_eq!(
            nearest_valid_tick(887199, FeeTier::Tier10000).unwrap(),
            887200
        );
    }

    #[test]
    fn test_nearest_valid_tick_rejects_out_of_range() {
        assert!(matches!(
            nearest_valid_tick(887221, FeeTier::Tier3000),
            Err(UniswapError::InvalidArgument(_))
        ));
        assert!(nearest_valid_tick(MIN_TICK, FeeTier::Tier10000).is_err());
        assert!(nearest_valid_tick(MIN_TICK, FeeTier::Tier100).is_ok());
    }

    #[test]
    fn test_nearest_valid_tick_is_idempotent() {
        for fee in FeeTier::ALL {
            let (min_tick, max_tick) = default_tick_range(fee);
            for tick in (min_tick..=max_tick).step_by(7919) {
                let once = nearest_valid_tick(tick, fee).unwrap();
                assert_eq!(nearest_valid_tick(once, fee).unwrap(), once);
                assert_eq!(once % fee.tick_spacing(), 0);
            }
            assert_eq!(nearest_valid_tick(max_tick, fee).unwrap(), max_tick);
            assert_eq!(nearest_valid_tick(min_tick, fee).unwrap(), min_tick);
        }
    }

    #[test]
    fn test_multiples_of_spacing_are_unchanged() {
        for fee in FeeTier::ALL {
            let spacing = fee.tick_spacing();
            for k in [-100, -3, 0, 1, 57] {
                let tick = k * spacing;
                assert_eq!(nearest_valid_tick(tick, fee).unwrap(), tick);
            }
        }
    }

    #[test]
    fn test_bitmap_word_range_per_tier() {
        assert_eq!(bitmap_word_range(FeeTier::Tier100), (-3466, 3465));
        assert_eq!(bitmap_word_range(FeeTier::Tier500), (-347, 346));
        assert_eq!(bitmap_word_range(FeeTier::Tier3000), (-58, 57));
        assert_eq!(bitmap_word_range(FeeTier::Tier10000), (-18, 17));
    }

    #[test]
    fn test_bitmap_position_round_trip() {
        for compressed in [-14787, -257, -256, -1, 0, 1, 255, 256, 14787] {
            let (word, bit) = bitmap_position(compressed);
            assert_eq!(
                tick_at_bitmap_position(word, bit, FeeTier::Tier100),
                compressed
            );
        }
        assert_eq!(bitmap_position(-1), (-1, 255));
    }

    #[test]
    fn test_u256_to_f64() {
        assert_eq!(u256_to_f64(U256::from(12345u64)), 12345.0);
        assert_eq!(u256_to_f64(U256::from(1u128 << 96)), Q96);
        assert!(u256_to_f64(U256::MAX) > 1e77);
    }
}
