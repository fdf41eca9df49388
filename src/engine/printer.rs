//! Change-detecting top-of-book snapshots.
//!
//! The printer remembers, per symbol, the set of `(price, size)` pairs it last
//! emitted for each side and only renders a new line when either set differs.

use ahash::{AHashMap, AHashSet};
use itertools::Itertools;
use smallvec::SmallVec;
use tracing::trace;

use crate::engine::book::OrderBook;
use crate::engine::types::{Level, Side};

/// Read side of a book as seen by the printer.
pub trait TopOfBook {
    fn symbol(&self) -> &str;

    /// Up to `n` best non-empty levels of `side`, best first.
    fn top_levels(&self, side: Side, n: usize) -> Box<dyn Iterator<Item = Level> + '_>;
}

impl TopOfBook for OrderBook {
    fn symbol(&self) -> &str {
        OrderBook::symbol(self)
    }

    fn top_levels(&self, side: Side, n: usize) -> Box<dyn Iterator<Item = Level> + '_> {
        Box::new(self.top(side, n))
    }
}

type Depth = SmallVec<[Level; 8]>;

#[derive(Debug, Default, PartialEq, Eq)]
struct LastEmitted {
    bids: AHashSet<Level>,
    asks: AHashSet<Level>
}

#[derive(Debug)]
pub struct SnapshotPrinter {
    depth: usize,
    last: AHashMap<String, LastEmitted>
}

impl SnapshotPrinter {
    pub fn new(depth: usize) -> Self {
        Self { depth, last: AHashMap::new() }
    }

    /// Returns the rendered snapshot, or `None` when neither side's top levels
    /// changed since the last line emitted for this symbol.
    pub fn print<B: TopOfBook + ?Sized>(&mut self, seq: u32, book: &B) -> Option<String> {
        let bids: Depth = book.top_levels(Side::BUY, self.depth).collect();
        let asks: Depth = book.top_levels(Side::SELL, self.depth).collect();
        let current = LastEmitted {
            bids: bids.iter().copied().collect(),
            asks: asks.iter().copied().collect(),
        };

        let symbol = book.symbol();
        match self.last.get_mut(symbol) {
            Some(last) if *last == current => {
                trace!(seq=seq, symbol=%symbol, "Top of book unchanged");
                metrics::counter!("bookview_snapshots_suppressed_total").increment(1);
                return None;
            }
            Some(last) => *last = current,
            None => {
                self.last.insert(symbol.to_string(), current);
            }
        }

        metrics::counter!("bookview_snapshots_emitted_total").increment(1);
        Some(format!(
            "{}, {}, [{}], [{}]",
            seq,
            symbol,
            bids.iter().join(", "),
            asks.iter().join(", ")
        ))
    }
}
