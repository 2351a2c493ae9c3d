//! Venue Executor
//!
//! Builds, signs and submits bonding-curve swaps. Instruction order for a
//! swap transaction:
//!
//! 1. compute-budget price and limit (always on buys, opt-in on sells)
//! 2. relay fee transfer, when the send mode charges one
//! 3. idempotent create of the wallet's token account (buys)
//! 4. the swap itself
//! 5. close of the token account (sells of the whole holding)

use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use solana_sdk::{
    compute_budget::ComputeBudgetInstruction,
    hash::Hash,
    instruction::Instruction,
    message::{v0, VersionedMessage},
    pubkey::Pubkey,
    transaction::VersionedTransaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use std::str::FromStr;
use tracing::{info, warn};

use crate::adapters::relay::{
    await_confirmation, ConfirmationLevel, ConfirmationPolicy, RelayClient,
};
use crate::adapters::solana::{BlockhashCache, SolanaClient, WalletManager};
use crate::domain::curve::{
    committed_share, compute_unit_price, min_sol_output, quote_buy, sell_amount,
    TOKEN_ACCOUNT_RENT_SOL,
};
use crate::domain::{now_ms, LaunchEvent, Position, LAMPORTS_PER_SOL};
use crate::ports::{BuyOrder, ExecutionError, ExecutionPort, SellFill, SellOrder};

use super::instructions::{self, SwapAccounts};

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub buy_provider_fee_sol: f64,
    pub sell_provider_fee_sol: f64,
    pub priority_fee_sol: f64,
    pub compute_unit_limit: u32,
    /// Attach compute-budget instructions to sells as well
    pub sell_priority_fee: bool,
    pub buy_confirmation: ConfirmationLevel,
    pub sell_confirmation: ConfirmationLevel,
    pub confirmation: ConfirmationPolicy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            buy_provider_fee_sol: 0.00011,
            sell_provider_fee_sol: 0.0001,
            priority_fee_sol: 0.00001,
            compute_unit_limit: 600_000,
            sell_priority_fee: false,
            buy_confirmation: ConfirmationLevel::Confirmed,
            sell_confirmation: ConfirmationLevel::Finalized,
            confirmation: ConfirmationPolicy::default(),
        }
    }
}

/// A signed transaction ready for submission
pub struct SignedTx {
    pub transaction: VersionedTransaction,
    pub signature: String,
    pub base64: String,
}

pub struct PumpFunExecutor {
    wallet: Arc<WalletManager>,
    rpc: SolanaClient,
    relay: RelayClient,
    blockhash: Arc<BlockhashCache>,
    config: ExecutorConfig,
}

fn parse_key(field: &str, value: &str) -> Result<Pubkey, ExecutionError> {
    Pubkey::from_str(value)
        .map_err(|e| ExecutionError::Build(format!("invalid {} '{}': {}", field, value, e)))
}

impl PumpFunExecutor {
    pub fn new(
        wallet: Arc<WalletManager>,
        rpc: SolanaClient,
        relay: RelayClient,
        blockhash: Arc<BlockhashCache>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            wallet,
            rpc,
            relay,
            blockhash,
            config,
        }
    }

    fn compute_budget(&self) -> [Instruction; 2] {
        let price = compute_unit_price(self.config.priority_fee_sol, self.config.compute_unit_limit);
        [
            ComputeBudgetInstruction::set_compute_unit_price(price),
            ComputeBudgetInstruction::set_compute_unit_limit(self.config.compute_unit_limit),
        ]
    }

    fn swap_accounts(
        &self,
        mint: &str,
        bonding_curve: &str,
        curve_vault: &str,
        creator: &str,
    ) -> Result<SwapAccounts, ExecutionError> {
        let user = self.wallet.pubkey();
        let mint = parse_key("mint", mint)?;
        Ok(SwapAccounts {
            mint,
            bonding_curve: parse_key("bonding curve", bonding_curve)?,
            curve_vault: parse_key("curve vault", curve_vault)?,
            user_token_account: get_associated_token_address(&user, &mint),
            user,
            creator: parse_key("creator", creator)?,
        })
    }

    pub fn build_buy_instructions(
        &self,
        launch: &LaunchEvent,
        token_amount: u64,
        max_sol_cost: u64,
    ) -> Result<Vec<Instruction>, ExecutionError> {
        let accounts = self.swap_accounts(
            &launch.mint,
            &launch.bonding_curve,
            &launch.curve_vault,
            &launch.creator,
        )?;

        let mut ixs = self.compute_budget().to_vec();
        if let Some(fee) = self
            .relay
            .fee_instruction(&accounts.user, self.config.buy_provider_fee_sol)
            .map_err(|e| ExecutionError::Build(e.to_string()))?
        {
            ixs.push(fee);
        }
        ixs.push(create_associated_token_account_idempotent(
            &accounts.user,
            &accounts.user,
            &accounts.mint,
            &spl_token::id(),
        ));
        ixs.push(instructions::buy(&accounts, token_amount, max_sol_cost));
        Ok(ixs)
    }

    pub fn build_sell_instructions(
        &self,
        position: &Position,
        token_amount: u64,
        min_sol_output: u64,
        close_account: bool,
    ) -> Result<Vec<Instruction>, ExecutionError> {
        let accounts = self.swap_accounts(
            &position.mint,
            &position.bonding_curve,
            &position.curve_vault,
            &position.creator,
        )?;

        let mut ixs = Vec::with_capacity(5);
        if self.config.sell_priority_fee {
            ixs.extend(self.compute_budget());
        }
        if let Some(fee) = self
            .relay
            .fee_instruction(&accounts.user, self.config.sell_provider_fee_sol)
            .map_err(|e| ExecutionError::Build(e.to_string()))?
        {
            ixs.push(fee);
        }
        ixs.push(instructions::sell(&accounts, token_amount, min_sol_output));
        if close_account {
            ixs.push(
                spl_token::instruction::close_account(
                    &spl_token::id(),
                    &accounts.user_token_account,
                    &accounts.user,
                    &accounts.user,
                    &[],
                )
                .map_err(|e| ExecutionError::Build(e.to_string()))?,
            );
        }
        Ok(ixs)
    }

    /// Compile a v0 message, sign it once and serialize it
    pub fn sign(&self, ixs: &[Instruction], blockhash: Hash) -> Result<SignedTx, ExecutionError> {
        let payer = self.wallet.pubkey();
        let message = v0::Message::try_compile(&payer, ixs, &[], blockhash)
            .map_err(|e| ExecutionError::Build(format!("compile failed: {}", e)))?;
        let transaction =
            VersionedTransaction::try_new(VersionedMessage::V0(message), &[self.wallet.keypair()])
                .map_err(|e| ExecutionError::Build(format!("signing failed: {}", e)))?;

        let bytes = bincode::serialize(&transaction)
            .map_err(|e| ExecutionError::Build(format!("serialization failed: {}", e)))?;
        let signature = transaction
            .signatures
            .first()
            .map(|sig| bs58::encode(sig.as_ref()).into_string())
            .ok_or_else(|| ExecutionError::Build("transaction has no signature".to_string()))?;

        Ok(SignedTx {
            transaction,
            signature,
            base64: STANDARD.encode(bytes),
        })
    }

    async fn sign_with_latest(&self, ixs: &[Instruction]) -> Result<SignedTx, ExecutionError> {
        let blockhash = self
            .blockhash
            .latest()
            .await
            .map_err(|e| ExecutionError::Ledger(e.to_string()))?;
        self.sign(ixs, blockhash)
    }

    async fn submit(&self, tx: &SignedTx) -> Result<(), ExecutionError> {
        self.relay
            .submit(&tx.base64)
            .await
            .map_err(|e| ExecutionError::Submission(e.to_string()))
    }

    /// SOL the wallet received from a confirmed sell
    async fn realized_sol(&self, signature: &str, account_closed: bool) -> f64 {
        let change = match self.rpc.fee_payer_balance_change(signature).await {
            Ok(change) => {
                if change.is_none() {
                    warn!(signature, "Sell transaction has no balance metadata");
                }
                change
            }
            Err(e) => {
                warn!(signature, "Failed to read sell proceeds: {}", e);
                None
            }
        };
        realized_from_change(change, account_closed)
    }
}

/// Raw tokens to sell and the minimum lamports accepted for them.
///
/// The floor applies slippage to the share of the buy cost carried by the
/// tokens being sold, so a partial sell gets a proportional floor.
pub fn sell_limits(position: &Position, order: &SellOrder) -> Result<(u64, u64), ExecutionError> {
    let amount = sell_amount(position.amount, order.percentage);
    if amount == 0 {
        return Err(ExecutionError::Build(format!(
            "nothing to sell at {}% of {}",
            order.percentage, position.amount
        )));
    }
    let committed = committed_share(position.buy_sol_amount, amount, position.amount);
    Ok((amount, min_sol_output(committed, order.slippage_pct)))
}

/// Fee-payer lamport change in SOL, less the rent refund when the sell
/// closed the token account. Missing metadata counts as nothing received.
pub fn realized_from_change(lamports: Option<i64>, account_closed: bool) -> f64 {
    let Some(lamports) = lamports else {
        return 0.0;
    };
    let change = lamports as f64 / LAMPORTS_PER_SOL;
    if account_closed {
        change - TOKEN_ACCOUNT_RENT_SOL
    } else {
        change
    }
}

#[async_trait]
impl ExecutionPort for PumpFunExecutor {
    async fn buy(&self, launch: &LaunchEvent, order: BuyOrder) -> Result<Position, ExecutionError> {
        let quote = quote_buy(
            launch.tokens_in_curve,
            launch.sol_in_curve,
            order.sol_amount,
            order.slippage_pct,
            launch.decimals,
        )
        .map_err(|e| ExecutionError::Build(e.to_string()))?;

        let ixs = self.build_buy_instructions(launch, quote.token_amount, quote.max_sol_cost)?;
        let tx = self.sign_with_latest(&ixs).await?;

        self.submit(&tx).await?;
        let buy_time = now_ms();
        info!(
            mint = %launch.mint,
            name = %launch.name,
            signature = %tx.signature,
            "Buy sent for {} SOL, latency {} ms",
            order.sol_amount,
            buy_time - launch.detected_at_ms
        );

        await_confirmation(
            &self.rpc,
            &tx.signature,
            self.config.buy_confirmation,
            self.config.confirmation,
        )
        .await?;

        Ok(Position::from_fill(
            launch,
            tx.signature,
            &quote,
            order.sol_amount,
            buy_time,
        ))
    }

    async fn sell(&self, position: &Position, order: SellOrder) -> Result<SellFill, ExecutionError> {
        let (amount, min_out) = sell_limits(position, &order)?;
        let close = order.percentage >= 100.0;

        let ixs = self.build_sell_instructions(position, amount, min_out, close)?;
        let tx = self.sign_with_latest(&ixs).await?;

        self.submit(&tx).await?;
        let sell_time = now_ms();
        info!(
            mint = %position.mint,
            name = %position.name,
            signature = %tx.signature,
            "Sell sent for {}% ({} tokens)",
            order.percentage,
            amount as f64 / 10f64.powi(position.decimals as i32)
        );

        await_confirmation(
            &self.rpc,
            &tx.signature,
            self.config.sell_confirmation,
            self.config.confirmation,
        )
        .await?;

        let realized_sol = self.realized_sol(&tx.signature, close).await;

        Ok(SellFill {
            signature: tx.signature,
            sold_amount: amount,
            realized_sol,
            sell_time_ms: sell_time,
            account_closed: close,
        })
    }

    async fn close_token_account(&self, mint: &str) -> Result<Option<String>, ExecutionError> {
        let owner = self.wallet.pubkey();
        let mint_key = parse_key("mint", mint)?;
        let ata = get_associated_token_address(&owner, &mint_key);

        let Some(residual) = self
            .rpc
            .token_account_amount(&ata)
            .await
            .map_err(|e| ExecutionError::Ledger(e.to_string()))?
        else {
            return Ok(None);
        };

        let mut ixs = Vec::with_capacity(2);
        if residual > 0 {
            ixs.push(
                spl_token::instruction::burn(&spl_token::id(), &ata, &mint_key, &owner, &[], residual)
                    .map_err(|e| ExecutionError::Build(e.to_string()))?,
            );
        }
        ixs.push(
            spl_token::instruction::close_account(&spl_token::id(), &ata, &owner, &owner, &[])
                .map_err(|e| ExecutionError::Build(e.to_string()))?,
        );

        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .map_err(|e| ExecutionError::Ledger(e.to_string()))?;
        let tx = self.sign(&ixs, blockhash)?;

        if let Some(err) = self
            .rpc
            .simulate_versioned(&tx.transaction)
            .await
            .map_err(|e| ExecutionError::Ledger(e.to_string()))?
        {
            return Err(ExecutionError::Build(format!("close simulation failed: {}", err)));
        }

        let signature = self
            .rpc
            .send_versioned(&tx.transaction)
            .await
            .map_err(|e| ExecutionError::Submission(e.to_string()))?;

        info!(mint, signature = %signature, "Token account closed, burned {}", residual);
        Ok(Some(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::adapters::pump_fun::program::{BUY_DISCRIMINATOR, PROGRAM_ID, SELL_DISCRIMINATOR};
    use crate::adapters::relay::{RelayConfig, SendMode};
    use crate::domain::PositionStatus;
    use solana_sdk::{compute_budget, signature::Signer, system_program};

    fn executor(mode: SendMode, config: ExecutorConfig) -> PumpFunExecutor {
        let rpc = SolanaClient::new("http://127.0.0.1:1".to_string());
        let relay = RelayClient::new(RelayConfig::default().with_mode(mode)).unwrap();
        let blockhash = Arc::new(BlockhashCache::new(rpc.clone(), Duration::from_secs(5)));
        PumpFunExecutor::new(
            Arc::new(WalletManager::new_random()),
            rpc,
            relay,
            blockhash,
            config,
        )
    }

    fn launch() -> LaunchEvent {
        LaunchEvent {
            mint: Pubkey::new_unique().to_string(),
            name: "Frog".to_string(),
            symbol: "FRG".to_string(),
            creator: Pubkey::new_unique().to_string(),
            bonding_curve: Pubkey::new_unique().to_string(),
            curve_vault: Pubkey::new_unique().to_string(),
            uri: String::new(),
            initial_sol_buy: 0.3,
            tokens_in_curve: 900_000_000.0,
            sol_in_curve: 30.3,
            decimals: 6,
            detected_at_ms: 0,
        }
    }

    fn position() -> Position {
        let launch = launch();
        Position {
            mint: launch.mint,
            name: launch.name,
            symbol: launch.symbol,
            creator: launch.creator,
            bonding_curve: launch.bonding_curve,
            curve_vault: launch.curve_vault,
            buy_signature: "buy".to_string(),
            buy_price: 0.0,
            amount: 3_026_315_000_000,
            buy_sol_amount: 0.1,
            buy_time_ms: 0,
            buy_latency_ms: 0,
            accumulated_sol: 0.0,
            decimals: 6,
            status: PositionStatus::Open,
        }
    }

    #[test]
    fn test_buy_instruction_order() {
        let exec = executor(SendMode::ZeroSlot, ExecutorConfig::default());
        let ixs = exec.build_buy_instructions(&launch(), 1_000, 2_000).unwrap();

        assert_eq!(ixs.len(), 5);
        assert_eq!(ixs[0].program_id, compute_budget::id());
        assert_eq!(ixs[1].program_id, compute_budget::id());
        assert_eq!(ixs[2].program_id, system_program::ID);
        assert_eq!(ixs[3].program_id, spl_associated_token_account::id());
        assert_eq!(ixs[4].program_id, PROGRAM_ID);
        assert_eq!(&ixs[4].data[..8], &BUY_DISCRIMINATOR);
    }

    #[test]
    fn test_compute_unit_price_default() {
        let exec = executor(SendMode::Direct, ExecutorConfig::default());
        let [price, limit] = exec.compute_budget();
        assert_eq!(price, ComputeBudgetInstruction::set_compute_unit_price(16_666));
        assert_eq!(limit, ComputeBudgetInstruction::set_compute_unit_limit(600_000));
    }

    #[test]
    fn test_direct_buy_has_no_fee_transfer() {
        let exec = executor(SendMode::Direct, ExecutorConfig::default());
        let ixs = exec.build_buy_instructions(&launch(), 1_000, 2_000).unwrap();
        assert_eq!(ixs.len(), 4);
        assert!(ixs.iter().all(|ix| ix.program_id != system_program::ID));
    }

    #[test]
    fn test_sell_without_priority_fee() {
        let exec = executor(SendMode::Jito, ExecutorConfig::default());
        let ixs = exec
            .build_sell_instructions(&position(), 100, 50_000_000, true)
            .unwrap();

        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, system_program::ID);
        assert_eq!(ixs[1].program_id, PROGRAM_ID);
        assert_eq!(&ixs[1].data[..8], &SELL_DISCRIMINATOR);
        assert_eq!(ixs[2].program_id, spl_token::id());
    }

    #[test]
    fn test_partial_sell_keeps_account_open() {
        let config = ExecutorConfig {
            sell_priority_fee: true,
            ..ExecutorConfig::default()
        };
        let exec = executor(SendMode::Jito, config);
        let ixs = exec
            .build_sell_instructions(&position(), 100, 50_000_000, false)
            .unwrap();

        assert_eq!(ixs.len(), 4);
        assert_eq!(ixs[0].program_id, compute_budget::id());
        assert_eq!(ixs.last().unwrap().program_id, PROGRAM_ID);
    }

    #[test]
    fn test_invalid_address_is_build_error() {
        let exec = executor(SendMode::Direct, ExecutorConfig::default());
        let mut bad = launch();
        bad.bonding_curve = "nope".to_string();
        let err = exec.build_buy_instructions(&bad, 1, 1).unwrap_err();
        assert!(matches!(err, ExecutionError::Build(_)));
    }

    #[test]
    fn test_sign_round_trip() {
        let exec = executor(SendMode::ZeroSlot, ExecutorConfig::default());
        let ixs = exec.build_buy_instructions(&launch(), 1_000, 2_000).unwrap();
        let signed = exec.sign(&ixs, Hash::new_unique()).unwrap();

        let bytes = STANDARD.decode(&signed.base64).unwrap();
        let decoded: VersionedTransaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.signatures[0].to_string(), signed.signature);
        assert_eq!(
            decoded.message.static_account_keys()[0],
            exec.wallet.keypair().pubkey()
        );
        assert!(decoded.verify_with_results().iter().all(|ok| *ok));
    }

    #[test]
    fn test_half_sell_has_half_the_floor() {
        let pos = position();
        let full = SellOrder { percentage: 100.0, slippage_pct: 50.0 };
        let half = SellOrder { percentage: 50.0, slippage_pct: 50.0 };

        let (full_amount, full_floor) = sell_limits(&pos, &full).unwrap();
        let (half_amount, half_floor) = sell_limits(&pos, &half).unwrap();

        assert_eq!(full_amount, 3_026_315_000_000);
        assert_eq!(full_floor, 50_000_000);
        assert_eq!(half_amount, 1_513_157_500_000);
        assert_eq!(half_floor, 25_000_000);
    }

    #[test]
    fn test_realized_from_change_full_sell_subtracts_rent() {
        let realized = realized_from_change(Some(122_039_280), true);
        assert!((realized - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_realized_from_change_partial_sell_keeps_rent() {
        let realized = realized_from_change(Some(60_000_000), false);
        assert!((realized - 0.06).abs() < 1e-9);
    }

    #[test]
    fn test_realized_from_change_missing_metadata() {
        assert_eq!(realized_from_change(None, true), 0.0);
        assert_eq!(realized_from_change(None, false), 0.0);
    }

    #[test]
    fn test_realized_from_change_loss() {
        let realized = realized_from_change(Some(-5_000), false);
        assert!(realized < 0.0);
    }

    #[tokio::test]
    async fn test_zero_sell_amount_rejected() {
        let exec = executor(SendMode::Direct, ExecutorConfig::default());
        let mut pos = position();
        pos.amount = 0;
        let err = exec
            .sell(&pos, SellOrder { percentage: 100.0, slippage_pct: 50.0 })
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Build(_)));
    }
}
