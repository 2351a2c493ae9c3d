//! Launch Decoder
//!
//! Turns a raw ledger transaction from the primary feed into a
//! [`LaunchEvent`]. The input is a feed-neutral [`RawTransaction`] so the
//! decoding stays pure; the gRPC listener does the proto conversion.
//!
//! Create instruction payload, after the 8-byte discriminator:
//!
//! | field   | encoding                       |
//! |---------|--------------------------------|
//! | name    | u32 LE length + UTF-8 bytes    |
//! | symbol  | u32 LE length + UTF-8 bytes    |
//! | uri     | u32 LE length + UTF-8 bytes    |
//! | creator | 32-byte public key             |

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::domain::curve::{lamports_to_sol, reserves_after_create};
use crate::domain::{now_ms, LaunchEvent, TOKEN_DECIMALS};

use super::program::{CREATE_DISCRIMINATOR, CREATE_LOG};

/// Position of the bonding curve in the create instruction's account list
const CURVE_ACCOUNT_POS: usize = 2;
/// Position of the curve vault in the create instruction's account list
const VAULT_ACCOUNT_POS: usize = 3;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("Not a create transaction")]
    NotCreate,
    #[error("Create instruction not found")]
    MissingInstruction,
    #[error("Payload truncated at offset {0}")]
    Truncated(usize),
    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
    #[error("Account index {0} out of range")]
    AccountIndex(usize),
    #[error("No post token balances")]
    MissingMint,
    #[error("No creator token balance for mint")]
    MissingCreatorBalance,
    #[error("No post balance for bonding curve")]
    MissingCurveBalance,
}

/// A compiled instruction as it appears in the transaction message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawInstruction {
    pub program_id_index: u32,
    /// Indices into the transaction's account-key table
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTokenBalance {
    pub account_index: u32,
    pub mint: String,
    pub owner: String,
    /// Whole-token amount
    pub ui_amount: f64,
}

/// Feed-neutral view of one observed transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTransaction {
    pub signature: String,
    /// Static keys, then loaded writable, then loaded readonly
    pub account_keys: Vec<String>,
    pub instructions: Vec<RawInstruction>,
    pub log_messages: Vec<String>,
    pub post_balances: Vec<u64>,
    pub post_token_balances: Vec<RawTokenBalance>,
}

/// Metadata carried in the create instruction
#[derive(Debug, Clone, PartialEq)]
pub struct CreateArgs {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub creator: Pubkey,
}

/// Decode a launch; anything that is not a well-formed create yields `None`
pub fn decode_launch(tx: &RawTransaction) -> Option<LaunchEvent> {
    match try_decode_launch(tx, now_ms()) {
        Ok(event) => Some(event),
        Err(DecodeError::NotCreate) => None,
        Err(e) => {
            tracing::warn!(signature = %tx.signature, "Create transaction not decoded: {}", e);
            None
        }
    }
}

pub fn try_decode_launch(tx: &RawTransaction, detected_at_ms: i64) -> Result<LaunchEvent, DecodeError> {
    if !tx.log_messages.iter().any(|line| line == CREATE_LOG) {
        return Err(DecodeError::NotCreate);
    }

    let mint = tx
        .post_token_balances
        .first()
        .map(|b| b.mint.clone())
        .ok_or(DecodeError::MissingMint)?;

    let ix = tx
        .instructions
        .iter()
        .find(|ix| ix.data.len() >= 8 && ix.data[..8] == CREATE_DISCRIMINATOR)
        .ok_or(DecodeError::MissingInstruction)?;

    let args = parse_create_args(&ix.data)?;
    let creator = args.creator.to_string();

    let curve_index = account_index(ix, CURVE_ACCOUNT_POS)?;
    let vault_index = account_index(ix, VAULT_ACCOUNT_POS)?;
    let bonding_curve = key_at(tx, curve_index)?;
    let curve_vault = key_at(tx, vault_index)?;

    let curve_lamports = *tx
        .post_balances
        .get(curve_index)
        .ok_or(DecodeError::MissingCurveBalance)?;
    let initial_sol_buy = lamports_to_sol(curve_lamports);

    let creator_tokens = tx
        .post_token_balances
        .iter()
        .find(|b| b.mint == mint && b.owner == creator)
        .map(|b| b.ui_amount)
        .ok_or(DecodeError::MissingCreatorBalance)?;

    let (tokens_in_curve, sol_in_curve) = reserves_after_create(initial_sol_buy, creator_tokens);

    Ok(LaunchEvent {
        mint,
        name: args.name,
        symbol: args.symbol,
        creator,
        bonding_curve,
        curve_vault,
        uri: args.uri,
        initial_sol_buy,
        tokens_in_curve,
        sol_in_curve,
        decimals: TOKEN_DECIMALS,
        detected_at_ms,
    })
}

fn account_index(ix: &RawInstruction, pos: usize) -> Result<usize, DecodeError> {
    ix.accounts
        .get(pos)
        .map(|i| *i as usize)
        .ok_or(DecodeError::AccountIndex(pos))
}

fn key_at(tx: &RawTransaction, index: usize) -> Result<String, DecodeError> {
    tx.account_keys
        .get(index)
        .cloned()
        .ok_or(DecodeError::AccountIndex(index))
}

/// Parse name, symbol, uri and creator from create instruction data
pub fn parse_create_args(data: &[u8]) -> Result<CreateArgs, DecodeError> {
    let mut reader = PayloadReader { data, offset: 8 };
    let name = reader.string("name")?;
    let symbol = reader.string("symbol")?;
    let uri = reader.string("uri")?;
    let creator = Pubkey::new_from_array(reader.array::<32>()?);

    Ok(CreateArgs {
        name,
        symbol,
        uri,
        creator,
    })
}

struct PayloadReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PayloadReader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::Truncated(self.offset))?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let at = self.offset;
        self.take(N)?
            .try_into()
            .map_err(|_| DecodeError::Truncated(at))
    }

    fn string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = u32::from_le_bytes(self.array::<4>()?) as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8(field))
    }
}
