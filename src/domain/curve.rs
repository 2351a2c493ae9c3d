//! Bonding Curve Math
//!
//! Constant-product sizing for venue buys and the slippage bounds that go
//! into the swap instruction. Reserves are whole units (tokens, SOL); the
//! instruction amounts returned here are raw base units (token atoms, lamports).

use thiserror::Error;

use super::launch::{LAMPORTS_PER_SOL, TOTAL_SUPPLY_TOKENS, VIRTUAL_SOL_RESERVE};

/// Rent refunded when a token account is closed, in SOL
pub const TOKEN_ACCOUNT_RENT_SOL: f64 = 0.00203928;

#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("Reserves must be positive: tokens={tokens}, sol={sol}")]
    InvalidReserves { tokens: f64, sol: f64 },
    #[error("Trade amount must be positive: {0}")]
    InvalidAmount(f64),
    #[error("Slippage must be within 0-100%: {0}")]
    InvalidSlippage(f64),
}

/// Result of sizing a buy against launch reserves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuyQuote {
    /// Tokens received, scaled to the mint's decimals
    pub token_amount: u64,
    /// Slippage-bounded SOL ceiling in lamports
    pub max_sol_cost: u64,
    /// Price paid, SOL per whole token, taken from pre-trade reserves
    pub buy_price: f64,
    /// SOL reserve after the trade
    pub new_sol_reserve: f64,
    /// Token reserve after the trade
    pub new_token_reserve: f64,
}

/// Reserve pair right after a create transaction
///
/// The curve holds the fixed virtual SOL plus whatever the creator bought with,
/// and the full issuance minus the creator's tokens.
pub fn reserves_after_create(initial_sol_buy: f64, creator_tokens: f64) -> (f64, f64) {
    (
        TOTAL_SUPPLY_TOKENS - creator_tokens,
        VIRTUAL_SOL_RESERVE + initial_sol_buy,
    )
}

/// Token reserve left after adding `sol_amount` to the curve
pub fn token_reserve_after(tokens_in_curve: f64, sol_in_curve: f64, sol_amount: f64) -> f64 {
    let invariant = tokens_in_curve * sol_in_curve;
    invariant / (sol_in_curve + sol_amount)
}

/// Whole tokens bought for `sol_amount`, floored before decimal scaling
pub fn whole_tokens_out(tokens_in_curve: f64, sol_in_curve: f64, sol_amount: f64) -> f64 {
    let new_tokens = token_reserve_after(tokens_in_curve, sol_in_curve, sol_amount);
    (tokens_in_curve - new_tokens).floor().max(0.0)
}

/// Size a buy of `sol_amount` SOL with `slippage_pct` tolerance
pub fn quote_buy(
    tokens_in_curve: f64,
    sol_in_curve: f64,
    sol_amount: f64,
    slippage_pct: f64,
    decimals: u8,
) -> Result<BuyQuote, CurveError> {
    if !(tokens_in_curve > 0.0 && sol_in_curve > 0.0)
        || !tokens_in_curve.is_finite()
        || !sol_in_curve.is_finite()
    {
        return Err(CurveError::InvalidReserves {
            tokens: tokens_in_curve,
            sol: sol_in_curve,
        });
    }
    if !(sol_amount > 0.0) || !sol_amount.is_finite() {
        return Err(CurveError::InvalidAmount(sol_amount));
    }
    validate_slippage(slippage_pct)?;

    let new_sol_reserve = sol_in_curve + sol_amount;
    let new_token_reserve = token_reserve_after(tokens_in_curve, sol_in_curve, sol_amount);
    let whole = whole_tokens_out(tokens_in_curve, sol_in_curve, sol_amount);
    let token_amount = (whole * 10f64.powi(decimals as i32)) as u64;

    Ok(BuyQuote {
        token_amount,
        max_sol_cost: max_sol_cost(sol_amount, slippage_pct),
        buy_price: sol_in_curve / tokens_in_curve,
        new_sol_reserve,
        new_token_reserve,
    })
}

/// Lamport ceiling for a buy: `round(lamports * (1 + slippage/100))`
pub fn max_sol_cost(sol_amount: f64, slippage_pct: f64) -> u64 {
    (sol_amount * LAMPORTS_PER_SOL * (1.0 + slippage_pct / 100.0)).round() as u64
}

/// Lamport floor for a sell, derived from the SOL committed at buy time
pub fn min_sol_output(committed_sol: f64, slippage_pct: f64) -> u64 {
    let factor = (1.0 - slippage_pct / 100.0).max(0.0);
    (committed_sol * factor * LAMPORTS_PER_SOL).floor() as u64
}

/// SOL committed to `sold` of `held` raw tokens, pro rata
pub fn committed_share(committed_sol: f64, sold: u64, held: u64) -> f64 {
    if held == 0 || sold >= held {
        return committed_sol;
    }
    committed_sol * sold as f64 / held as f64
}

/// Raw token amount to sell for a percentage of the holding
pub fn sell_amount(held: u64, percentage: f64) -> u64 {
    if percentage >= 100.0 {
        return held;
    }
    if percentage <= 0.0 {
        return 0;
    }
    ((held as f64) * percentage / 100.0).floor() as u64
}

/// Whole SOL to lamports, rounded
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL).round() as u64
}

/// Lamports to whole SOL
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL
}

/// Compute-unit price in micro-lamports that spends `priority_fee_sol` over `unit_limit` units
pub fn compute_unit_price(priority_fee_sol: f64, unit_limit: u32) -> u64 {
    if unit_limit == 0 {
        return 0;
    }
    ((priority_fee_sol * LAMPORTS_PER_SOL / unit_limit as f64) * 1_000_000.0).floor() as u64
}

/// Realized gain in percent
pub fn gain_pct(realized_sol: f64, committed_sol: f64) -> f64 {
    if committed_sol <= 0.0 {
        return 0.0;
    }
    (realized_sol / committed_sol - 1.0) * 100.0
}

fn validate_slippage(slippage_pct: f64) -> Result<(), CurveError> {
    if !(0.0..=100.0).contains(&slippage_pct) {
        return Err(CurveError::InvalidSlippage(slippage_pct));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_buy_sizing_scenario() {
        // 900M tokens / 30.3 SOL, buying 0.1 SOL
        let new_tokens = token_reserve_after(900_000_000.0, 30.3, 0.1);
        assert_relative_eq!(new_tokens, 896_973_684.210526, epsilon = 1e-3);
        assert_eq!(whole_tokens_out(900_000_000.0, 30.3, 0.1), 3_026_315.0);

        let quote = quote_buy(900_000_000.0, 30.3, 0.1, 5.0, 6).unwrap();
        assert_eq!(quote.token_amount, 3_026_315_000_000);
        assert_relative_eq!(quote.new_sol_reserve, 30.4);
        assert_relative_eq!(quote.buy_price, 30.3 / 900_000_000.0);
    }

    #[test]
    fn test_max_sol_cost_applies_slippage() {
        assert_eq!(max_sol_cost(0.1, 5.0), 105_000_000);
        assert_eq!(max_sol_cost(0.1, 0.0), 100_000_000);
    }

    #[test]
    fn test_min_sol_output_half_at_fifty() {
        assert_eq!(min_sol_output(0.1, 50.0), 50_000_000);
        assert_eq!(min_sol_output(0.1, 100.0), 0);
    }

    #[test]
    fn test_committed_share_scales_with_sold_tokens() {
        assert_relative_eq!(committed_share(0.1, 50, 100), 0.05);
        assert_relative_eq!(committed_share(0.1, 100, 100), 0.1);
        assert_relative_eq!(committed_share(0.1, 0, 100), 0.0);
        assert_relative_eq!(committed_share(0.1, 5, 0), 0.1);
    }

    #[test]
    fn test_purchase_never_negative() {
        let reserves = [(1.0, 1.0), (1_073_000_000.0, 30.0), (5.0, 1e-6), (1e12, 1e3)];
        let amounts = [1e-9, 0.01, 0.1, 1.0, 250.0];
        for (tokens, sol) in reserves {
            for delta in amounts {
                let new_tokens = token_reserve_after(tokens, sol, delta);
                assert!(new_tokens < tokens);
                let quote = quote_buy(tokens, sol, delta, 5.0, 6).unwrap();
                assert!(quote.new_token_reserve < tokens);
                assert!(whole_tokens_out(tokens, sol, delta) >= 0.0);
            }
        }
    }

    #[test]
    fn test_quote_rejects_bad_inputs() {
        assert!(matches!(
            quote_buy(0.0, 30.0, 0.1, 5.0, 6),
            Err(CurveError::InvalidReserves { .. })
        ));
        assert_eq!(
            quote_buy(900.0, 30.0, 0.0, 5.0, 6),
            Err(CurveError::InvalidAmount(0.0))
        );
        assert_eq!(
            quote_buy(900.0, 30.0, 0.1, 150.0, 6),
            Err(CurveError::InvalidSlippage(150.0))
        );
        assert!(quote_buy(900.0, f64::NAN, 0.1, 5.0, 6).is_err());
    }

    #[test]
    fn test_reserves_after_create() {
        let (tokens, sol) = reserves_after_create(0.5, 17_000_000.0);
        assert_relative_eq!(tokens, 1_056_000_000.0);
        assert_relative_eq!(sol, 30.5);
    }

    #[test]
    fn test_sell_amount_percentages() {
        assert_eq!(sell_amount(1_000, 100.0), 1_000);
        assert_eq!(sell_amount(1_000, 150.0), 1_000);
        assert_eq!(sell_amount(1_000, 50.0), 500);
        assert_eq!(sell_amount(999, 50.0), 499);
        assert_eq!(sell_amount(1_000, 0.0), 0);
    }

    #[test]
    fn test_compute_unit_price_defaults() {
        // 0.00001 SOL over 600k units
        assert_eq!(compute_unit_price(0.00001, 600_000), 16_666);
        assert_eq!(compute_unit_price(0.00001, 0), 0);
    }

    #[test]
    fn test_gain_pct() {
        assert_relative_eq!(gain_pct(0.15, 0.1), 50.0, epsilon = 1e-9);
        assert_relative_eq!(gain_pct(0.05, 0.1), -50.0, epsilon = 1e-9);
        assert_eq!(gain_pct(0.05, 0.0), 0.0);
    }

    #[test]
    fn test_lamport_conversions() {
        assert_eq!(sol_to_lamports(0.00011), 110_000);
        assert_relative_eq!(lamports_to_sol(2_039_280), TOKEN_ACCOUNT_RENT_SOL);
    }
}
