//! Trade safety limiter: stateless predicates over global constants.

use crate::domain::entities::policy::AutobuyPolicy;
use crate::domain::errors::TradeError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// When the per-policy daily trade counter rolls over. The boundary is an
/// explicit configuration choice rather than a hard-coded assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DailyResetPolicy {
    /// Reset when the UTC calendar date changes.
    #[default]
    CalendarDayUtc,
    /// Reset 24 hours after the window opened.
    Rolling24h,
    /// Never reset (the counter is a lifetime cap).
    Never,
}

impl DailyResetPolicy {
    pub fn window_elapsed(&self, window_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            DailyResetPolicy::CalendarDayUtc => {
                now.date_naive() != window_start.date_naive() && now > window_start
            }
            DailyResetPolicy::Rolling24h => now - window_start >= Duration::hours(24),
            DailyResetPolicy::Never => false,
        }
    }
}

/// Global safety constants. Evaluated statelessly; per-owner state lives on
/// the policy itself.
#[derive(Debug, Clone)]
pub struct TradeLimits {
    pub max_sol_per_trade: f64,
    pub max_wallet_balance_lamports: u64,
    pub max_trades_per_day: u32,
    pub min_slippage_bps: u16,
    pub max_slippage_bps: u16,
    pub daily_reset: DailyResetPolicy,
}

impl Default for TradeLimits {
    fn default() -> Self {
        Self {
            max_sol_per_trade: 10.0,
            max_wallet_balance_lamports: 100 * LAMPORTS_PER_SOL,
            max_trades_per_day: 10,
            min_slippage_bps: 50,
            max_slippage_bps: 5_000,
            daily_reset: DailyResetPolicy::default(),
        }
    }
}

impl TradeLimits {
    pub fn check_buy_amount(&self, amount_sol: f64) -> Result<(), TradeError> {
        if !amount_sol.is_finite() || amount_sol <= 0.0 || amount_sol > self.max_sol_per_trade {
            return Err(TradeError::AmountExceedsMax {
                amount_sol,
                max_sol: self.max_sol_per_trade,
            });
        }
        Ok(())
    }

    pub fn check_slippage(&self, bps: u16) -> Result<(), TradeError> {
        if bps < self.min_slippage_bps || bps > self.max_slippage_bps {
            return Err(TradeError::SlippageOutOfRange {
                bps,
                min: self.min_slippage_bps,
                max: self.max_slippage_bps,
            });
        }
        Ok(())
    }

    /// Validate a whole policy draft before it is written.
    pub fn check_policy(&self, policy: &AutobuyPolicy) -> Result<(), TradeError> {
        self.check_buy_amount(policy.buy_amount_sol)?;
        self.check_slippage(policy.slippage_bps)?;
        Ok(())
    }

    /// Effective daily count after applying the reset boundary. Returns the
    /// count to gate against and whether the window should be re-opened.
    pub fn effective_daily_count(
        &self,
        policy: &AutobuyPolicy,
        now: DateTime<Utc>,
    ) -> (u32, bool) {
        if self.daily_reset.window_elapsed(policy.window_start, now) {
            (0, true)
        } else {
            (policy.daily_trade_count, false)
        }
    }

    pub fn check_daily_count(&self, count: u32) -> Result<(), TradeError> {
        if count >= self.max_trades_per_day {
            return Err(TradeError::DailyLimitExceeded {
                limit: self.max_trades_per_day,
            });
        }
        Ok(())
    }
}

pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL as f64).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn slippage_bounds_inclusive() {
        let limits = TradeLimits::default();
        assert!(limits.check_slippage(50).is_ok());
        assert!(limits.check_slippage(5_000).is_ok());
        assert!(limits.check_slippage(49).is_err());
        assert!(limits.check_slippage(5_001).is_err());
    }

    #[test]
    fn buy_amount_rejects_nonsense() {
        let limits = TradeLimits::default();
        assert!(limits.check_buy_amount(0.5).is_ok());
        assert!(limits.check_buy_amount(0.0).is_err());
        assert!(limits.check_buy_amount(-1.0).is_err());
        assert!(limits.check_buy_amount(f64::NAN).is_err());
        assert!(limits.check_buy_amount(10.5).is_err());
    }

    #[test]
    fn calendar_reset_fires_on_date_change() {
        let policy = DailyResetPolicy::CalendarDayUtc;
        let start = Utc.with_ymd_and_hms(2026, 8, 25, 23, 50, 0).unwrap();
        assert!(!policy.window_elapsed(start, start + Duration::minutes(5)));
        assert!(policy.window_elapsed(start, start + Duration::minutes(15)));
    }

    #[test]
    fn rolling_reset_needs_full_day() {
        let policy = DailyResetPolicy::Rolling24h;
        let start = Utc::now();
        assert!(!policy.window_elapsed(start, start + Duration::hours(23)));
        assert!(policy.window_elapsed(start, start + Duration::hours(24)));
    }

    #[test]
    fn never_reset_never_elapses() {
        let start = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert!(!DailyResetPolicy::Never.window_elapsed(start, Utc::now()));
    }

    #[test]
    fn sol_conversion_rounds() {
        assert_eq!(sol_to_lamports(0.5), 500_000_000);
        assert_eq!(sol_to_lamports(1.0), LAMPORTS_PER_SOL);
    }
}
