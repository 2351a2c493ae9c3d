//! Venue program addresses and derivations

use solana_sdk::{pubkey, pubkey::Pubkey};

pub const PROGRAM_ID: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
pub const GLOBAL: Pubkey = pubkey!("4wTV1YmiEkRvAtNtsSGPtUrqRYQMe5SKy2uB4Jjaxnjf");
pub const FEE_RECIPIENT: Pubkey = pubkey!("CebN5WGQ4jvEPvsVU4EoHEpgzq1VV7AbicfhtW4xC9iM");
pub const EVENT_AUTHORITY: Pubkey = pubkey!("Ce6TQqeHC9p8KetsN6JsjHK7UTZk7nasjjnr7XxXp9F1");

/// Log line the program writes for a create instruction
pub const CREATE_LOG: &str = "Program log: Instruction: Create";

pub const CREATE_DISCRIMINATOR: [u8; 8] = [24, 30, 200, 40, 5, 28, 7, 119];
pub const BUY_DISCRIMINATOR: [u8; 8] = [0x66, 0x06, 0x3d, 0x12, 0x01, 0xda, 0xeb, 0xea];
pub const SELL_DISCRIMINATOR: [u8; 8] = [0x33, 0xe6, 0x85, 0xa4, 0x01, 0x7f, 0x83, 0xad];

const CREATOR_VAULT_SEED: &[u8] = b"creator-vault";

/// Per-creator fee vault PDA
pub fn creator_vault(creator: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[CREATOR_VAULT_SEED, creator.as_ref()], &PROGRAM_ID).0
}

/// Token vault owned by a bonding curve
pub fn curve_vault(bonding_curve: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(bonding_curve, mint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminators_match_hex() {
        assert_eq!(hex_of(&BUY_DISCRIMINATOR), "66063d1201daebea");
        assert_eq!(hex_of(&SELL_DISCRIMINATOR), "33e685a4017f83ad");
    }

    fn hex_of(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    #[test]
    fn test_creator_vault_is_deterministic() {
        let creator = Pubkey::new_unique();
        assert_eq!(creator_vault(&creator), creator_vault(&creator));
        assert_ne!(creator_vault(&creator), creator_vault(&Pubkey::new_unique()));
        assert!(!creator_vault(&creator).is_on_curve());
    }

    #[test]
    fn test_curve_vault_is_associated_account() {
        let curve = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let (expected, _) = Pubkey::find_program_address(
            &[curve.as_ref(), spl_token::id().as_ref(), mint.as_ref()],
            &spl_associated_token_account::id(),
        );
        assert_eq!(curve_vault(&curve, &mint), expected);
    }
}
