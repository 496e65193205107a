use std::collections::HashMap;

use alloy::primitives::{Address, address};

use super::constants::{ARBITRUM, MAINNET};

/// Native coin sentinel, never a real contract.
pub const ETH_ADDRESS: Address = Address::ZERO;

const MAINNET_TOKENS: &[(&str, Address)] = &[
    ("ETH", ETH_ADDRESS),
    ("WETH", address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
    ("DAI", address!("0x6B175474E89094C44Da98b954EedeAC495271d0F")),
    ("USDC", address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")),
    ("USDT", address!("0xdAC17F958D2ee523a2206206994597C13D831ec7")),
    ("WBTC", address!("0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599")),
    ("UNI", address!("0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984")),
    ("BAT", address!("0x0D8775F648430679A709E98d2b0Cb6250d2887EF")),
    ("LINK", address!("0x514910771AF9Ca656af840dff83E8264EcF986CA")),
    ("MKR", address!("0x9f8F72aA9304c8B593d555F12eF6589cC3A579A2")),
];

const ARBITRUM_TOKENS: &[(&str, Address)] = &[
    ("ETH", ETH_ADDRESS),
    ("WETH", address!("0x82aF49447D8a07e3bd95BD0d56f35241523fBab1")),
    ("DAI", address!("0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1")),
    ("USDC", address!("0xFF970A61A04b1cA14834A43f5dE4533eBDDB5CC8")),
    ("UNI", address!("0xFa7F8980b0f1E64A2062791cc3b0871572f1F7f0")),
];

/// Symbol to address lookup for the tokens known on one network.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    registry: HashMap<String, Address>,
}

impl TokenRegistry {
    /// Registry for `chain_id`, empty for networks without a built-in token list.
    pub fn for_chain(chain_id: u64) -> Self {
        let tokens = match chain_id {
            MAINNET => MAINNET_TOKENS,
            ARBITRUM => ARBITRUM_TOKENS,
            _ => &[],
        };

        Self {
            registry: tokens
                .iter()
                .map(|(symbol, address)| (symbol.to_string(), *address))
                .collect(),
        }
    }

    /// Lookup token address by symbol (case-insensitive)
    pub fn lookup(&self, symbol: &str) -> Option<Address> {
        self.registry.get(&symbol.to_uppercase()).copied()
    }

    /// Reverse lookup, used to label addresses in responses.
    pub fn symbol_of(&self, address: Address) -> Option<&str> {
        self.registry
            .iter()
            .find(|(_, a)| **a == address)
            .map(|(symbol, _)| symbol.as_str())
    }

    /// Get list of all supported token symbols (sorted alphabetically)
    pub fn supported_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = self.registry.keys().cloned().collect();
        tokens.sort();
        tokens
    }

    pub fn insert(&mut self, symbol: &str, address: Address) {
        self.registry.insert(symbol.to_uppercase(), address);
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = TokenRegistry::for_chain(MAINNET);

        let dai = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
        assert_eq!(registry.lookup("DAI"), Some(dai));
        assert_eq!(registry.lookup("dai"), Some(dai));
        assert_eq!(registry.lookup("UNKNOWN"), None);
    }

    #[test]
    fn test_eth_resolves_to_native_sentinel() {
        for chain in [MAINNET, ARBITRUM] {
            let registry = TokenRegistry::for_chain(chain);
            assert_eq!(registry.lookup("eth"), Some(ETH_ADDRESS));
            assert_ne!(registry.lookup("WETH"), Some(ETH_ADDRESS));
        }
    }

    #[test]
    fn test_networks_have_distinct_token_lists() {
        let mainnet = TokenRegistry::for_chain(MAINNET);
        let arbitrum = TokenRegistry::for_chain(ARBITRUM);

        assert_ne!(mainnet.lookup("WETH"), arbitrum.lookup("WETH"));
        assert!(arbitrum.lookup("USDT").is_none());
        assert!(TokenRegistry::for_chain(31337).is_empty());
    }

    #[test]
    fn test_supported_tokens_sorted() {
        let tokens = TokenRegistry::for_chain(MAINNET).supported_tokens();

        assert!(tokens.contains(&"USDC".to_string()));
        for i in 1..tokens.len() {
            assert!(tokens[i - 1] <= tokens[i]);
        }
    }

    #[test]
    fn test_insert_and_reverse_lookup() {
        let mut registry = TokenRegistry::for_chain(31337);
        let token = Address::repeat_byte(0x42);
        registry.insert("test", token);

        assert_eq!(registry.lookup("TEST"), Some(token));
        assert_eq!(registry.symbol_of(token), Some("TEST"));
        assert_eq!(registry.len(), 1);
    }
}
