use std::fmt;

use super::version::ProtocolVersion;
use super::{UniswapError, UniswapResult};

/// Pool fee in hundredths of a basis point, 3000 is 0.3%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeeTier {
    Tier100,
    Tier500,
    Tier3000,
    Tier10000,
}

impl FeeTier {
    pub const ALL: [FeeTier; 4] = [
        FeeTier::Tier100,
        FeeTier::Tier500,
        FeeTier::Tier3000,
        FeeTier::Tier10000,
    ];

    pub fn value(self) -> u32 {
        match self {
            Self::Tier100 => 100,
            Self::Tier500 => 500,
            Self::Tier3000 => 3000,
            Self::Tier10000 => 10000,
        }
    }

    pub fn from_value(fee: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.value() == fee)
    }

    /// Distance between two initializable ticks in pools of this tier.
    pub fn tick_spacing(self) -> i32 {
        match self {
            Self::Tier100 => 1,
            Self::Tier500 => 10,
            Self::Tier3000 => 60,
            Self::Tier10000 => 200,
        }
    }

    /// The fee as a fraction of the traded amount.
    pub fn fraction(self) -> f64 {
        f64::from(self.value()) / 1_000_000.0
    }
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Resolves the fee tier for a pricing or trading call.
///
/// V1 and V2 only know the implicit 0.3% tier, V3 requires an explicit tier.
pub fn validate_fee_tier(fee: Option<u32>, version: ProtocolVersion) -> UniswapResult<FeeTier> {
    let fee = match (fee, version) {
        (None, ProtocolVersion::V3) => {
            return Err(UniswapError::InvalidFeeTier(
                "Explicit fee tier is required for Uniswap V3. Refer to the following link for more information: \
                 https://support.uniswap.org/hc/en-us/articles/20904283758349-What-are-fee-tiers"
                    .to_string(),
            ));
        }
        (None, _) => return Ok(FeeTier::Tier3000),
        (Some(fee), _) => fee,
    };

    if version < ProtocolVersion::V3 && fee != FeeTier::Tier3000.value() {
        return Err(UniswapError::InvalidFeeTier(format!(
            "Unsupported fee tier {fee} for Uniswap {version}. Choices are: {}",
            FeeTier::Tier3000
        )));
    }

    FeeTier::from_value(fee).ok_or_else(|| {
        let choices = FeeTier::ALL.map(FeeTier::value);
        UniswapError::InvalidFeeTier(format!(
            "Invalid fee tier {fee} for Uniswap {version}. Choices are: {choices:?}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_v2_default_to_3000() {
        for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
            assert_eq!(validate_fee_tier(None, version).unwrap(), FeeTier::Tier3000);
            assert_eq!(
                validate_fee_tier(Some(3000), version).unwrap(),
                FeeTier::Tier3000
            );
        }
    }

    #[test]
    fn test_v1_v2_reject_other_tiers() {
        for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
            for fee in [100, 500, 10000, 2500, 0] {
                let err = validate_fee_tier(Some(fee), version).unwrap_err();
                assert!(matches!(err, UniswapError::InvalidFeeTier(_)));
                assert!(err.to_string().contains("Choices are: 3000"));
            }
        }
    }

    #[test]
    fn test_v3_requires_explicit_fee() {
        let err = validate_fee_tier(None, ProtocolVersion::V3).unwrap_err();
        assert!(matches!(err, UniswapError::InvalidFeeTier(_)));
        assert!(err.to_string().contains("Explicit fee tier is required"));
    }

    #[test]
    fn test_v3_accepts_enumerated_tiers() {
        for tier in FeeTier::ALL {
            assert_eq!(
                validate_fee_tier(Some(tier.value()), ProtocolVersion::V3).unwrap(),
                tier
            );
        }
    }

    #[test]
    fn test_v3_rejects_unknown_tiers_listing_choices() {
        for fee in [0, 1, 99, 2500, 3001, 100_000] {
            let err = validate_fee_tier(Some(fee), ProtocolVersion::V3).unwrap_err();
            assert!(matches!(err, UniswapError::InvalidFeeTier(_)));
            assert!(err.to_string().contains("[100, 500, 3000, 10000]"));
        }
    }

    #[test]
    fn test_tick_spacing_table() {
        let spacings: Vec<_> = FeeTier::ALL.iter().map(|t| t.tick_spacing()).collect();
        assert_eq!(spacings, vec![1, 10, 60, 200]);
        assert_eq!(FeeTier::Tier3000.fraction(), 0.003);
    }
}
