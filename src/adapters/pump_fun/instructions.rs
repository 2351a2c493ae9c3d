//! Venue instruction builders
//!
//! Buy and sell swaps share one account list except for the position of the
//! creator vault, which the sell handler expects ahead of the token program.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};

use super::program::{
    creator_vault, BUY_DISCRIMINATOR, EVENT_AUTHORITY, FEE_RECIPIENT, GLOBAL, PROGRAM_ID,
    SELL_DISCRIMINATOR,
};

/// Accounts a swap touches
#[derive(Debug, Clone, Copy)]
pub struct SwapAccounts {
    pub mint: Pubkey,
    pub bonding_curve: Pubkey,
    pub curve_vault: Pubkey,
    pub user_token_account: Pubkey,
    pub user: Pubkey,
    pub creator: Pubkey,
}

fn swap_data(discriminator: [u8; 8], amount: u64, sol_bound: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(&discriminator);
    data.extend_from_slice(&amount.to_le_bytes());
    data.extend_from_slice(&sol_bound.to_le_bytes());
    data
}

/// Buy `token_amount` base units paying at most `max_sol_cost` lamports
pub fn buy(accounts: &SwapAccounts, token_amount: u64, max_sol_cost: u64) -> Instruction {
    let metas = vec![
        AccountMeta::new_readonly(GLOBAL, false),
        AccountMeta::new(FEE_RECIPIENT, false),
        AccountMeta::new_readonly(accounts.mint, false),
        AccountMeta::new(accounts.bonding_curve, false),
        AccountMeta::new(accounts.curve_vault, false),
        AccountMeta::new(accounts.user_token_account, false),
        AccountMeta::new(accounts.user, true),
        AccountMeta::new_readonly(system_program::ID, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(creator_vault(&accounts.creator), false),
        AccountMeta::new_readonly(EVENT_AUTHORITY, false),
        AccountMeta::new_readonly(PROGRAM_ID, false),
    ];

    Instruction {
        program_id: PROGRAM_ID,
        accounts: metas,
        data: swap_data(BUY_DISCRIMINATOR, token_amount, max_sol_cost),
    }
}

/// Sell `token_amount` base units receiving at least `min_sol_output` lamports
pub fn sell(accounts: &SwapAccounts, token_amount: u64, min_sol_output: u64) -> Instruction {
    let metas = vec![
        AccountMeta::new_readonly(GLOBAL, false),
        AccountMeta::new(FEE_RECIPIENT, false),
        AccountMeta::new_readonly(accounts.mint, false),
        AccountMeta::new(accounts.bonding_curve, false),
        AccountMeta::new(accounts.curve_vault, false),
        AccountMeta::new(accounts.user_token_account, false),
        AccountMeta::new(accounts.user, true),
        AccountMeta::new_readonly(system_program::ID, false),
        AccountMeta::new(creator_vault(&accounts.creator), false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(EVENT_AUTHORITY, false),
        AccountMeta::new_readonly(PROGRAM_ID, false),
    ];

    Instruction {
        program_id: PROGRAM_ID,
        accounts: metas,
        data: swap_data(SELL_DISCRIMINATOR, token_amount, min_sol_output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts() -> SwapAccounts {
        SwapAccounts {
            mint: Pubkey::new_unique(),
            bonding_curve: Pubkey::new_unique(),
            curve_vault: Pubkey::new_unique(),
            user_token_account: Pubkey::new_unique(),
            user: Pubkey::new_unique(),
            creator: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_buy_data_layout() {
        let ix = buy(&accounts(), 3_026_315_000_000, 105_000_000);

        assert_eq!(ix.program_id, PROGRAM_ID);
        assert_eq!(ix.data.len(), 24);
        assert_eq!(&ix.data[..8], &BUY_DISCRIMINATOR);
        assert_eq!(
            u64::from_le_bytes(ix.data[8..16].try_into().unwrap()),
            3_026_315_000_000
        );
        assert_eq!(
            u64::from_le_bytes(ix.data[16..24].try_into().unwrap()),
            105_000_000
        );
    }

    #[test]
    fn test_buy_account_order() {
        let a = accounts();
        let ix = buy(&a, 1, 1);

        let keys: Vec<Pubkey> = ix.accounts.iter().map(|m| m.pubkey).collect();
        assert_eq!(
            keys,
            vec![
                GLOBAL,
                FEE_RECIPIENT,
                a.mint,
                a.bonding_curve,
                a.curve_vault,
                a.user_token_account,
                a.user,
                system_program::ID,
                spl_token::id(),
                creator_vault(&a.creator),
                EVENT_AUTHORITY,
                PROGRAM_ID,
            ]
        );

        let signers: Vec<bool> = ix.accounts.iter().map(|m| m.is_signer).collect();
        assert_eq!(signers.iter().filter(|s| **s).count(), 1);
        assert!(ix.accounts[6].is_signer);
        assert!(ix.accounts[1].is_writable);
        assert!(!ix.accounts[2].is_writable);
        assert!(ix.accounts[9].is_writable);
    }

    #[test]
    fn test_sell_swaps_creator_vault_and_token_program() {
        let a = accounts();
        let ix = sell(&a, 10, 20);

        assert_eq!(&ix.data[..8], &SELL_DISCRIMINATOR);
        assert_eq!(ix.accounts[8].pubkey, creator_vault(&a.creator));
        assert!(ix.accounts[8].is_writable);
        assert_eq!(ix.accounts[9].pubkey, spl_token::id());
        assert_eq!(ix.accounts.len(), 12);
    }
}
