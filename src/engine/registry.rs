use ahash::AHashMap;
use tracing::info;

use crate::engine::book::OrderBook;
use crate::engine::types::{BookError, Message};

/// One `OrderBook` per symbol, created on the first message that names it.
#[derive(Debug, Default)]
pub struct BookRegistry {
    books: AHashMap<String, OrderBook>
}

impl BookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, symbol: &str) -> Option<&OrderBook> {
        self.books.get(symbol)
    }

    pub fn book_mut(&mut self, symbol: &str) -> &mut OrderBook {
        let known = self.books.len();
        self.books.entry(symbol.to_string()).or_insert_with(|| {
            info!(symbol=%symbol, books=known + 1, "New instrument");
            OrderBook::new(symbol)
        })
    }

    /// Routes `msg` to its symbol's book and returns that book.
    pub fn apply(&mut self, msg: &Message) -> Result<&OrderBook, BookError> {
        let book = self.book_mut(msg.symbol());
        book.apply(msg)?;
        Ok(&*book)
    }
}
