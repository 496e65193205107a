use std::fmt;

use serde::Deserialize;

use super::{UniswapError, UniswapResult};

/// Uniswap protocol generation a client trades against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "u8")]
pub enum ProtocolVersion {
    V1,
    V2,
    V3,
}

impl ProtocolVersion {
    pub fn number(self) -> u8 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = UniswapError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            other => Err(UniswapError::InvalidArgument(format!(
                "Invalid Uniswap version {other}, must be 1, 2 or 3"
            ))),
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.number())
    }
}

/// Fails with `UnsupportedOperation` unless `version` is one of `supported`.
///
/// Invoked at the top of operations that only exist on some protocol versions.
pub fn ensure_supported(
    version: ProtocolVersion,
    supported: &[ProtocolVersion],
    operation: &str,
) -> UniswapResult<()> {
    if supported.contains(&version) {
        return Ok(());
    }

    let choices = supported
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(UniswapError::UnsupportedOperation(format!(
        "{operation} is not supported on Uniswap {version} (supported: {choices})"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_number() {
        assert_eq!(ProtocolVersion::try_from(1).unwrap(), ProtocolVersion::V1);
        assert_eq!(ProtocolVersion::try_from(3).unwrap(), ProtocolVersion::V3);
        assert!(matches!(
            ProtocolVersion::try_from(4),
            Err(UniswapError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_deserialize_from_yaml_number() {
        let version: ProtocolVersion = serde_yaml::from_str("2").unwrap();
        assert_eq!(version, ProtocolVersion::V2);
        assert!(serde_yaml::from_str::<ProtocolVersion>("7").is_err());
    }

    #[test]
    fn test_ensure_supported() {
        assert!(ensure_supported(ProtocolVersion::V1, &[ProtocolVersion::V1], "add_liquidity").is_ok());

        let err = ensure_supported(
            ProtocolVersion::V3,
            &[ProtocolVersion::V1],
            "add_liquidity",
        )
        .unwrap_err();
        assert!(matches!(err, UniswapError::UnsupportedOperation(_)));
        assert!(err.to_string().contains("add_liquidity"));
        assert!(err.to_string().contains("V3"));
    }
}
