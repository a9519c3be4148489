//! Contract-address classification.
//!
//! A chat message is split into whitespace-delimited tokens; each token is
//! stripped of surrounding punctuation and matched against chain address
//! shapes. The character classes overlap (a Tron address is also a valid
//! base58 string of the right length), so evaluation order is fixed and the
//! first match wins.

/// Chain families the classifier can recognize.
///
/// Only [`Chain::Solana`] has execution support; the rest are detect-and-relay
/// only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Tron,
    Sui,
    Evm,
    Solana,
}

impl Chain {
    /// Short tag used in chart links and log fields.
    pub fn tag(&self) -> &'static str {
        match self {
            Chain::Tron => "tron",
            Chain::Sui => "sui",
            Chain::Evm => "ethereum",
            Chain::Solana => "solana",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Chain::Tron => "Tron",
            Chain::Sui => "Sui",
            Chain::Evm => "EVM",
            Chain::Solana => "Solana",
        }
    }

    /// Whether the autobuy engine can actually trade on this chain.
    pub fn is_executable(&self) -> bool {
        matches!(self, Chain::Solana)
    }
}

/// A token that matched one of the chain address shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedAddress {
    pub chain: Chain,
    pub address: String,
}

/// Ordinary words that satisfy the base58 length/alphabet constraints and
/// would otherwise be forwarded as Solana mints. Exact match only; a mint
/// that merely contains one of these as a substring is still a mint.
const BANNED_WORDS: &[&str] = &[
    "pump",
    "pumpfun",
    "dexscreener",
    "moonshot",
    "comingsoonstaytunedfornextgemdrop",
    "everybodygetsrichwhenwepumptogether",
];

fn is_base58_char(c: char) -> bool {
    c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l')
}

fn is_base58(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_base58_char)
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_banned(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    BANNED_WORDS.iter().any(|w| *w == lower)
}

/// Classify a single token. Total over arbitrary input: returns `None` for
/// anything that matches no pattern, never panics.
///
/// Order matters: Tron before the generic base58 rule, 64-hex before 40-hex.
pub fn classify(token: &str) -> Option<DetectedAddress> {
    // 1. Tron: 'T' + 33 base58 chars.
    if token.len() == 34 && token.starts_with('T') && is_base58(&token[1..]) {
        return Some(DetectedAddress {
            chain: Chain::Tron,
            address: token.to_string(),
        });
    }

    if let Some(hex_part) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        // 2. Sui-family: 0x + 64 hex.
        if hex_part.len() == 64 && is_hex(hex_part) {
            return Some(DetectedAddress {
                chain: Chain::Sui,
                address: token.to_string(),
            });
        }
        // 3. EVM: 0x + 40 hex.
        if hex_part.len() == 40 && is_hex(hex_part) {
            return Some(DetectedAddress {
                chain: Chain::Evm,
                address: token.to_string(),
            });
        }
        return None;
    }

    // 4. Generic base58, Solana mint length.
    if (32..=44).contains(&token.len()) && is_base58(token) && !is_banned(token) {
        return Some(DetectedAddress {
            chain: Chain::Solana,
            address: token.to_string(),
        });
    }

    None
}

/// Extract every classifiable address from a message, in order of appearance.
/// Tokens are trimmed of surrounding punctuation before matching so that
/// "check CA: Abc...xyz!" still detects the mint.
pub fn extract_addresses(text: &str) -> Vec<DetectedAddress> {
    text.split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric()))
        .filter(|t| !t.is_empty())
        .filter_map(classify)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOL_MINT: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
    const TRON_ADDR: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    #[test]
    fn evm_address_classified_as_evm_only() {
        let token = format!("0x{}", "a".repeat(40));
        let hit = classify(&token).unwrap();
        assert_eq!(hit.chain, Chain::Evm);
        assert_eq!(hit.address, token);
    }

    #[test]
    fn sixty_four_hex_wins_over_forty_hex() {
        let token = format!("0x{}", "b".repeat(64));
        assert_eq!(classify(&token).unwrap().chain, Chain::Sui);
    }

    #[test]
    fn tron_wins_over_generic_base58() {
        // 34 chars, also a valid base58 string of mint length.
        assert_eq!(TRON_ADDR.len(), 34);
        assert_eq!(classify(TRON_ADDR).unwrap().chain, Chain::Tron);
    }

    #[test]
    fn solana_mint_detected() {
        let hit = classify(SOL_MINT).unwrap();
        assert_eq!(hit.chain, Chain::Solana);
        assert_eq!(hit.address, SOL_MINT);
    }

    #[test]
    fn banned_word_rejected_exact_match_only() {
        // Exact (case-insensitive) equality with a banned entry is rejected.
        assert!(classify("ComingSoonStayTunedForNextGemDrop").is_none());
        assert!(classify("everybodygetsrichwhenwepumptogether").is_none());

        // A real-length base58 token merely containing "pump" is accepted.
        let with_substring = format!("pump{}", "A".repeat(30));
        assert_eq!(with_substring.len(), 34);
        assert_eq!(classify(&with_substring).unwrap().chain, Chain::Solana);
    }

    #[test]
    fn base58_alphabet_excludes_ambiguous_digits() {
        // '0', 'O', 'I', 'l' disqualify a would-be mint.
        for bad in ['0', 'O', 'I', 'l'] {
            let token = format!("{}{}", bad, "a".repeat(33));
            assert!(classify(&token).is_none(), "char {:?} should reject", bad);
        }
    }

    #[test]
    fn total_over_garbage() {
        for s in ["", "0x", "T", "hello", "0xzz", &"x".repeat(500), "🚀🚀🚀"] {
            let _ = classify(s);
        }
    }

    #[test]
    fn extraction_strips_punctuation_and_preserves_order() {
        let text = format!("ape this: {SOL_MINT}! also ({TRON_ADDR})");
        let hits = extract_addresses(&text);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].address, SOL_MINT);
        assert_eq!(hits[1].chain, Chain::Tron);
    }

    #[test]
    fn short_and_long_base58_ignored() {
        assert!(classify(&"a".repeat(31)).is_none());
        assert!(classify(&"a".repeat(45)).is_none());
    }
}
