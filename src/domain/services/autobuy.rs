//! Autobuy gating and trade orchestration.
//!
//! Gates run in a fixed order and the first failure aborts that single
//! (owner, address) unit of work with a typed error; nothing downstream is
//! invoked. Counters and caches mutate only after the swap returned a
//! signature, and fee collection can never undo a recorded trade.

use crate::domain::errors::TradeError;
use crate::domain::services::custody::WalletCustodyManager;
use crate::domain::services::fee_collector::FeeCollector;
use crate::domain::services::limits::{sol_to_lamports, TradeLimits};
use crate::domain::services::policy_store::PolicyStore;
use crate::domain::services::swap_engine::{SwapExecutor, SwapOutcome};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

pub struct AutobuyEngine {
    policies: Arc<PolicyStore>,
    custody: Arc<WalletCustodyManager>,
    swaps: Arc<SwapExecutor>,
    fees: Arc<FeeCollector>,
    limits: TradeLimits,
}

impl AutobuyEngine {
    pub fn new(
        policies: Arc<PolicyStore>,
        custody: Arc<WalletCustodyManager>,
        swaps: Arc<SwapExecutor>,
        fees: Arc<FeeCollector>,
        limits: TradeLimits,
    ) -> Self {
        Self {
            policies,
            custody,
            swaps,
            fees,
            limits,
        }
    }

    /// Evaluate one detected address for one subscriber and trade when every
    /// gate passes. Must run inside the owner's serialized worker: the
    /// balance/daily-count checks assume no concurrent trade for this owner.
    pub async fn evaluate_and_trade(
        &self,
        owner: u64,
        trader: &str,
        token_mint: &str,
        market_cap: Option<f64>,
    ) -> Result<SwapOutcome, TradeError> {
        // Gate 1: policy present and enabled.
        let policy = self
            .policies
            .get(owner, trader)
            .await
            .ok_or(TradeError::PolicyNotFound {
                trader: trader.to_string(),
            })?;
        if !policy.enabled {
            return Err(TradeError::PolicyDisabled {
                trader: trader.to_string(),
            });
        }

        // Gate 2: market cap ceiling, only when market data resolved.
        if let Some(observed) = market_cap {
            if observed > policy.max_market_cap_usd {
                return Err(TradeError::MarketCapExceeded {
                    cap: policy.max_market_cap_usd,
                    observed,
                });
            }
        }

        // Gate 3: daily trade cap, honoring the configured reset boundary.
        let now = Utc::now();
        let (count, window_elapsed) = self.limits.effective_daily_count(&policy, now);
        if window_elapsed {
            self.policies.reset_window(owner, trader, now).await?;
        }
        self.limits.check_daily_count(count)?;

        // Gate 4: a wallet exists.
        let wallet = self
            .custody
            .active_wallet(owner)
            .await
            .ok_or(TradeError::WalletNotFound { owner })?;

        // Gate 5: cached balance covers amount + estimated fee + gas buffer.
        let amount = sol_to_lamports(policy.buy_amount_sol);
        let estimated_fee = self.fees.config().fee_for(amount);
        let required = amount + estimated_fee + self.fees.config().gas_buffer_lamports;
        if wallet.cached_lamports < required {
            return Err(TradeError::InsufficientBalance {
                required,
                available: wallet.cached_lamports,
            });
        }

        // All gates passed.
        let outcome = self
            .swaps
            .execute_swap(owner, token_mint, amount, policy.slippage_bps)
            .await?;

        // Fee outcome never affects the recorded trade.
        if let Err(e) = self.fees.collect_fee(owner, amount).await {
            warn!(owner, error = %e, "fee collection failed, trade stands");
        }

        self.policies.record_trade(owner, trader).await?;
        if let Err(e) = self.custody.refresh_balance(owner, wallet.wallet_id).await {
            warn!(owner, error = %e, "balance refresh after trade failed");
        }

        info!(
            owner,
            trader,
            token_mint,
            signature = %outcome.tx_signature,
            "autobuy executed"
        );
        Ok(outcome)
    }
}
