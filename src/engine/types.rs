use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    BUY,
    SELL
}

// Live order in one side's ledger (mutable remaining size)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub id: u64,
    pub price: i64,
    pub size: u64
}

// Aggregate resting size at one price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Level {
    pub price: i64,
    pub size: u64
}

impl Level {
    pub fn new(price: i64, size: u64) -> Self {
        Self { price, size }
    }
}

impl From<(i64, u64)> for Level {
    fn from((price, size): (i64, u64)) -> Self {
        Self { price, size }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.price, self.size)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOrder {
    pub seq: u32,
    pub symbol: String,
    pub order_id: u64,
    pub side: Side,
    pub size: u64,
    pub price: i64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOrder {
    pub seq: u32,
    pub symbol: String,
    pub order_id: u64,
    pub side: Side,
    pub size: u64,
    pub price: i64
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOrder {
    pub seq: u32,
    pub symbol: String,
    pub order_id: u64,
    pub side: Side
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderExecuted {
    pub seq: u32,
    pub symbol: String,
    pub order_id: u64,
    pub side: Side,
    pub traded_quantity: u64
}

// Decoded feed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Add(AddOrder),
    Update(UpdateOrder),
    Delete(DeleteOrder),
    Executed(OrderExecuted),
}

impl Message {
    pub fn seq(&self) -> u32 {
        match self {
            Message::Add(m) => m.seq,
            Message::Update(m) => m.seq,
            Message::Delete(m) => m.seq,
            Message::Executed(m) => m.seq,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Message::Add(m) => &m.symbol,
            Message::Update(m) => &m.symbol,
            Message::Delete(m) => &m.symbol,
            Message::Executed(m) => &m.symbol,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Add(_) => "add",
            Message::Update(_) => "update",
            Message::Delete(_) => "delete",
            Message::Executed(_) => "executed",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookError {
    #[error("unknown order {id} on {side:?} side")]
    UnknownOrder { id: u64, side: Side },

    #[error("order {id} has {remaining} remaining, cannot execute {requested}")]
    Overfill { id: u64, remaining: u64, requested: u64 },

    #[error("level {price} holds {aggregate}, cannot deposit {requested}")]
    LevelOverflow { price: i64, aggregate: u64, requested: u64 },

    #[error("level {price} holds {aggregate}, cannot withdraw {requested}")]
    LevelUnderflow { price: i64, aggregate: u64, requested: u64 },
}
