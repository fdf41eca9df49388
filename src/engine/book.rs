use ahash::AHashMap;
use tracing::{debug, error, instrument, trace, warn};

use crate::engine::levels::PriceLevels;
use crate::engine::types::{
    AddOrder, BookError, DeleteOrder, Level, Message, Order, OrderExecuted, Side, UpdateOrder,
};

/// Order ledger and price-level ledger for one side of a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSide {
    orders: AHashMap<u64, Order>,
    levels: PriceLevels
}

impl BookSide {
    fn new(side: Side) -> Self {
        BookSide { orders: AHashMap::new(), levels: PriceLevels::new(side) }
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> + '_ {
        self.orders.values()
    }

    pub fn order(&self, id: u64) -> Option<&Order> {
        self.orders.get(&id)
    }

    pub fn levels(&self) -> &PriceLevels {
        &self.levels
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBook {
    symbol: String,
    bids: BookSide,
    asks: BookSide
}

impl OrderBook {
    #[instrument(level = "debug")]
    pub fn new(symbol: &str) -> Self {
        let book = OrderBook {
            symbol: symbol.to_string(),
            bids: BookSide::new(Side::BUY),
            asks: BookSide::new(Side::SELL),
        };
        debug!(symbol=%book.symbol, "Initialized new order book");
        book
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::BUY => &self.bids,
            Side::SELL => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::BUY => &mut self.bids,
            Side::SELL => &mut self.asks,
        }
    }

    pub fn apply(&mut self, msg: &Message) -> Result<(), BookError> {
        match msg {
            Message::Add(m) => self.add(m),
            Message::Update(m) => self.update(m),
            Message::Delete(m) => self.delete(m),
            Message::Executed(m) => self.executed(m),
        }
    }

    /// Rests a new order. A reused id silently replaces the ledger entry.
    #[instrument(level = "trace", skip(self), fields(symbol = %self.symbol))]
    pub fn add(&mut self, msg: &AddOrder) -> Result<(), BookError> {
        let side = self.side_mut(msg.side);
        let order = Order { id: msg.order_id, price: msg.price, size: msg.size };
        side.levels.deposit(order.price, order.size)?;
        if side.orders.insert(order.id, order).is_some() {
            warn!(id=order.id, side=?msg.side, "Order id reused, replacing ledger entry");
        }
        trace!(id=order.id, side=?msg.side, price=order.price, size=order.size, "Added order");
        Ok(())
    }

    /// Changes size and/or price of a live order.
    #[instrument(level = "trace", skip(self), fields(symbol = %self.symbol))]
    pub fn update(&mut self, msg: &UpdateOrder) -> Result<(), BookError> {
        let side = self.side_mut(msg.side);
        let Some(order) = side.orders.get_mut(&msg.order_id) else {
            error!(id=msg.order_id, side=?msg.side, "Update for unknown order");
            return Err(BookError::UnknownOrder { id: msg.order_id, side: msg.side });
        };

        if msg.price != order.price {
            side.levels.deposit(msg.price, msg.size)?;
            if let Err(e) = side.levels.withdraw(order.price, order.size) {
                side.levels.withdraw(msg.price, msg.size)?;
                return Err(e);
            }
        } else {
            side.levels.resize(order.price, order.size, msg.size)?;
        }

        trace!(
            id=order.id, side=?msg.side,
            old_price=order.price, old_size=order.size,
            price=msg.price, size=msg.size,
            "Updated order"
        );
        order.price = msg.price;
        order.size = msg.size;
        Ok(())
    }

    #[instrument(level = "trace", skip(self), fields(symbol = %self.symbol))]
    pub fn delete(&mut self, msg: &DeleteOrder) -> Result<(), BookError> {
        let side = self.side_mut(msg.side);
        let Some(order) = side.orders.get(&msg.order_id).copied() else {
            error!(id=msg.order_id, side=?msg.side, "Delete for unknown order");
            return Err(BookError::UnknownOrder { id: msg.order_id, side: msg.side });
        };
        side.levels.withdraw(order.price, order.size)?;
        side.orders.remove(&order.id);
        trace!(id=order.id, side=?msg.side, price=order.price, size=order.size, "Deleted order");
        Ok(())
    }

    /// Reduces a live order by the traded quantity. Unknown ids are ignored
    /// since feeds can report an execution after the order is already gone.
    #[instrument(level = "trace", skip(self), fields(symbol = %self.symbol))]
    pub fn executed(&mut self, msg: &OrderExecuted) -> Result<(), BookError> {
        let side = self.side_mut(msg.side);
        let Some(order) = side.orders.get_mut(&msg.order_id) else {
            warn!(id=msg.order_id, side=?msg.side, qty=msg.traded_quantity, "Execution for unknown order ignored");
            return Ok(());
        };
        let Some(left) = order.size.checked_sub(msg.traded_quantity) else {
            error!(id=order.id, remaining=order.size, qty=msg.traded_quantity, "Execution exceeds remaining size");
            return Err(BookError::Overfill {
                id: order.id,
                remaining: order.size,
                requested: msg.traded_quantity,
            });
        };
        side.levels.withdraw(order.price, msg.traded_quantity)?;
        order.size = left;
        trace!(id=order.id, side=?msg.side, price=order.price, remaining=left, "Executed against order");
        if left == 0 {
            side.orders.remove(&msg.order_id);
        }
        Ok(())
    }

    pub fn top(&self, side: Side, n: usize) -> impl Iterator<Item = Level> + '_ {
        self.side(side).levels.top(n)
    }

    pub fn top_buy(&self, n: usize) -> impl Iterator<Item = Level> + '_ {
        self.top(Side::BUY, n)
    }

    pub fn top_sell(&self, n: usize) -> impl Iterator<Item = Level> + '_ {
        self.top(Side::SELL, n)
    }

    pub fn best_bid(&self) -> Option<Level> {
        self.top_buy(1).next()
    }

    pub fn best_ask(&self) -> Option<Level> {
        self.top_sell(1).next()
    }
}
