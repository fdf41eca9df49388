use std::collections::BTreeMap;

use itertools::Either;
use tracing::{error, trace};

use crate::engine::types::{BookError, Level, Side};

/// Aggregate resting size per price for one side of one book.
///
/// A price is present only while its aggregate is non-zero. Bids iterate
/// highest price first, asks lowest price first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceLevels {
    side: Side,
    levels: BTreeMap<i64, u64>
}

impl PriceLevels {
    pub fn new(side: Side) -> Self {
        Self { side, levels: BTreeMap::new() }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, price: i64) -> Option<u64> {
        self.levels.get(&price).copied()
    }

    /// Adds `qty` to the level at `price`, creating it first if absent.
    /// The level is left untouched if its aggregate would overflow.
    pub fn deposit(&mut self, price: i64, qty: u64) -> Result<(), BookError> {
        let current = self.get(price).unwrap_or(0);
        let Some(aggregate) = current.checked_add(qty) else {
            error!(side=?self.side, price=price, aggregate=current, qty=qty, "Level overflow");
            return Err(BookError::LevelOverflow { price, aggregate: current, requested: qty });
        };
        if aggregate > 0 {
            self.levels.insert(price, aggregate);
        }
        trace!(side=?self.side, price=price, aggregate=aggregate, "Level deposit");
        Ok(())
    }

    /// Subtracts `qty` from the level at `price`; drops the level once it reaches zero.
    pub fn withdraw(&mut self, price: i64, qty: u64) -> Result<(), BookError> {
        if qty == 0 {
            return Ok(());
        }
        let Some(aggregate) = self.levels.get_mut(&price) else {
            error!(side=?self.side, price=price, qty=qty, "Withdraw from missing level");
            return Err(BookError::LevelUnderflow { price, aggregate: 0, requested: qty });
        };
        let Some(left) = aggregate.checked_sub(qty) else {
            error!(side=?self.side, price=price, aggregate=*aggregate, qty=qty, "Level underflow");
            return Err(BookError::LevelUnderflow { price, aggregate: *aggregate, requested: qty });
        };
        *aggregate = left;
        trace!(side=?self.side, price=price, aggregate=left, "Level withdraw");
        if left == 0 {
            self.levels.remove(&price);
        }
        Ok(())
    }

    /// Replaces `old` with `new` at one price, removing the level only if the
    /// result is exactly zero.
    pub fn resize(&mut self, price: i64, old: u64, new: u64) -> Result<(), BookError> {
        if new >= old {
            self.deposit(price, new - old)
        } else {
            self.withdraw(price, old - new)
        }
    }

    /// Levels in side order (best first), all of them.
    pub fn iter(&self) -> impl Iterator<Item = Level> + '_ {
        let it = match self.side {
            Side::BUY => Either::Left(self.levels.iter().rev()),
            Side::SELL => Either::Right(self.levels.iter()),
        };
        it.map(|(price, size)| Level::new(*price, *size))
    }

    /// Up to `n` best non-empty levels, lazily.
    pub fn top(&self, n: usize) -> impl Iterator<Item = Level> + '_ {
        self.iter().filter(|level| level.size > 0).take(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bids_descend_asks_ascend() {
        let mut bids = PriceLevels::new(Side::BUY);
        let mut asks = PriceLevels::new(Side::SELL);
        for price in [101, 105, 99] {
            bids.deposit(price, 10).unwrap();
            asks.deposit(price, 10).unwrap();
        }
        let bid_prices: Vec<i64> = bids.iter().map(|l| l.price).collect();
        let ask_prices: Vec<i64> = asks.iter().map(|l| l.price).collect();
        assert_eq!(bid_prices, vec![105, 101, 99]);
        assert_eq!(ask_prices, vec![99, 101, 105]);
    }

    #[test]
    fn test_withdraw_to_zero_removes_level() {
        let mut levels = PriceLevels::new(Side::BUY);
        levels.deposit(100, 30).unwrap();
        levels.withdraw(100, 10).unwrap();
        assert_eq!(levels.get(100), Some(20));
        levels.withdraw(100, 20).unwrap();
        assert_eq!(levels.get(100), None);
        assert!(levels.is_empty());
    }

    #[test]
    fn test_zero_deposit_leaves_no_level() {
        let mut levels = PriceLevels::new(Side::SELL);
        levels.deposit(112, 0).unwrap();
        assert!(levels.is_empty());
    }

    #[test]
    fn test_withdraw_underflow() {
        let mut levels = PriceLevels::new(Side::SELL);
        levels.deposit(110, 5).unwrap();
        assert_eq!(
            levels.withdraw(110, 6),
            Err(BookError::LevelUnderflow { price: 110, aggregate: 5, requested: 6 })
        );
        assert_eq!(levels.get(110), Some(5));
        assert_eq!(
            levels.withdraw(111, 1),
            Err(BookError::LevelUnderflow { price: 111, aggregate: 0, requested: 1 })
        );
        assert!(levels.withdraw(111, 0).is_ok());
    }

    #[test]
    fn test_deposit_overflow() {
        let mut levels = PriceLevels::new(Side::BUY);
        levels.deposit(100, u64::MAX).unwrap();
        assert_eq!(
            levels.deposit(100, 1),
            Err(BookError::LevelOverflow { price: 100, aggregate: u64::MAX, requested: 1 })
        );
        assert_eq!(levels.get(100), Some(u64::MAX));
        assert_eq!(
            levels.resize(100, 0, 1),
            Err(BookError::LevelOverflow { price: 100, aggregate: u64::MAX, requested: 1 })
        );
        assert_eq!(levels.get(100), Some(u64::MAX));
    }

    #[test]
    fn test_resize_same_price() {
        let mut levels = PriceLevels::new(Side::BUY);
        levels.deposit(105, 222).unwrap();
        levels.resize(105, 222, 240).unwrap();
        assert_eq!(levels.get(105), Some(240));
        levels.resize(105, 240, 10).unwrap();
        assert_eq!(levels.get(105), Some(10));
        levels.resize(105, 10, 0).unwrap();
        assert_eq!(levels.get(105), None);
    }

    #[test]
    fn test_top_limits_count() {
        let mut levels = PriceLevels::new(Side::BUY);
        for price in 100..110 {
            levels.deposit(price, 1).unwrap();
        }
        let top: Vec<Level> = levels.top(3).collect();
        assert_eq!(top, vec![Level::new(109, 1), Level::new(108, 1), Level::new(107, 1)]);
        assert_eq!(levels.top(50).count(), 10);
        assert_eq!(levels.top(0).count(), 0);
    }
}
