//! Fixed-width little-endian feed records.
//!
//! Every record starts with a 9 byte header (`seq: u32`, `len: u32`,
//! `kind: u8`) followed by a body whose width depends on `kind`:
//!
//! | kind | body |
//! |------|------|
//! | `A`, `U` | symbol `[u8; 3]`, order id `u64`, side `u8`, pad 3, size `u64`, price `i32`, pad 4 |
//! | `D` | symbol `[u8; 3]`, order id `u64`, side `u8`, pad 3 |
//! | `E` | symbol `[u8; 3]`, order id `u64`, side `u8`, pad 3, traded quantity `u64` |
//!
//! The header `len` field is written but not trusted when reading.

use std::io::{self, ErrorKind, Read, Write};

use thiserror::Error;
use tracing::{error, trace};

use crate::engine::types::{AddOrder, DeleteOrder, Message, OrderExecuted, Side, UpdateOrder};

pub const KIND_ADD: u8 = b'A';
pub const KIND_UPDATE: u8 = b'U';
pub const KIND_DELETE: u8 = b'D';
pub const KIND_EXECUTED: u8 = b'E';

pub const SIDE_BUY: u8 = b'B';
pub const SIDE_SELL: u8 = b'S';

pub const HEADER_LEN: usize = 9;
pub const SYMBOL_LEN: usize = 3;
const ORDER_REF_LEN: usize = SYMBOL_LEN + 8 + 1 + 3;
const ADD_LEN: usize = ORDER_REF_LEN + 8 + 4 + 4;
const DELETE_LEN: usize = ORDER_REF_LEN;
const EXECUTED_LEN: usize = ORDER_REF_LEN + 8;
const MAX_BODY_LEN: usize = ADD_LEN;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("feed i/o error")]
    Io(#[from] io::Error),

    #[error("record truncated at byte {offset}")]
    Truncated { offset: u64 },

    #[error("record {seq}: unknown message type {kind:#04x}")]
    UnknownMessageType { seq: u32, kind: u8 },

    #[error("record {seq}: unknown side {side:#04x}")]
    UnknownSide { seq: u32, side: u8 },

    #[error("record {seq}: symbol is not valid utf-8")]
    Symbol { seq: u32 },
}

fn body_len(kind: u8) -> Option<usize> {
    match kind {
        KIND_ADD | KIND_UPDATE => Some(ADD_LEN),
        KIND_DELETE => Some(DELETE_LEN),
        KIND_EXECUTED => Some(EXECUTED_LEN),
        _ => None,
    }
}

// Sequential little-endian field reader over one record body
struct Fields<'a> {
    seq: u32,
    buf: &'a [u8],
    off: usize
}

impl<'a> Fields<'a> {
    fn new(seq: u32, buf: &'a [u8]) -> Self {
        Self { seq, buf, off: 0 }
    }

    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.off..self.off + N]);
        self.off += N;
        out
    }

    fn skip(&mut self, n: usize) {
        self.off += n;
    }

    fn symbol(&mut self) -> Result<String, DecodeError> {
        let raw = self.take::<SYMBOL_LEN>();
        let symbol = std::str::from_utf8(&raw).map_err(|_| DecodeError::Symbol { seq: self.seq })?;
        Ok(symbol.trim_end_matches(['\0', ' ']).to_string())
    }

    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take::<8>())
    }

    fn i32(&mut self) -> i32 {
        i32::from_le_bytes(self.take::<4>())
    }

    fn side(&mut self) -> Result<Side, DecodeError> {
        let [raw] = self.take::<1>();
        match raw {
            SIDE_BUY => Ok(Side::BUY),
            SIDE_SELL => Ok(Side::SELL),
            side => Err(DecodeError::UnknownSide { seq: self.seq, side }),
        }
    }

    // symbol, order id, side, padding
    fn order_ref(&mut self) -> Result<(String, u64, Side), DecodeError> {
        let symbol = self.symbol()?;
        let order_id = self.u64();
        let side = self.side()?;
        self.skip(3);
        Ok((symbol, order_id, side))
    }
}

fn decode_body(seq: u32, kind: u8, body: &[u8]) -> Result<Message, DecodeError> {
    let mut f = Fields::new(seq, body);
    let (symbol, order_id, side) = f.order_ref()?;
    let msg = match kind {
        KIND_ADD => {
            let size = f.u64();
            let price = f.i32() as i64;
            Message::Add(AddOrder { seq, symbol, order_id, side, size, price })
        }
        KIND_UPDATE => {
            let size = f.u64();
            let price = f.i32() as i64;
            Message::Update(UpdateOrder { seq, symbol, order_id, side, size, price })
        }
        KIND_DELETE => Message::Delete(DeleteOrder { seq, symbol, order_id, side }),
        KIND_EXECUTED => {
            let traded_quantity = f.u64();
            Message::Executed(OrderExecuted { seq, symbol, order_id, side, traded_quantity })
        }
        _ => return Err(DecodeError::UnknownMessageType { seq, kind }),
    };
    Ok(msg)
}

/// Streams decoded messages from a feed. Stops after the first error.
pub struct FeedReader<R> {
    inner: R,
    offset: u64,
    done: bool
}

impl<R: Read> FeedReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0, done: false }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    // Ok(false) on clean end of stream before the first byte.
    fn fill(&mut self, buf: &mut [u8], allow_eof: bool) -> Result<bool, DecodeError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 && allow_eof => return Ok(false),
                Ok(0) => {
                    return Err(DecodeError::Truncated { offset: self.offset + filled as u64 });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += filled as u64;
        Ok(true)
    }

    fn next_message(&mut self) -> Result<Option<Message>, DecodeError> {
        let mut header = [0u8; HEADER_LEN];
        if !self.fill(&mut header, true)? {
            return Ok(None);
        }
        let mut f = Fields::new(0, &header);
        let seq = f.take::<4>();
        let seq = u32::from_le_bytes(seq);
        f.skip(4);
        let [kind] = f.take::<1>();

        let Some(len) = body_len(kind) else {
            return Err(DecodeError::UnknownMessageType { seq, kind });
        };
        let mut body = [0u8; MAX_BODY_LEN];
        self.fill(&mut body[..len], false)?;
        let msg = decode_body(seq, kind, &body[..len])?;
        trace!(seq=seq, kind=%(kind as char), offset=self.offset, "Decoded record");
        Ok(Some(msg))
    }
}

impl<R: Read> Iterator for FeedReader<R> {
    type Item = Result<Message, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_message() {
            Ok(Some(msg)) => Some(Ok(msg)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                error!(offset=self.offset, error=%e, "Feed decode failed");
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Encodes messages in the layout `FeedReader` consumes.
pub struct FeedWriter<W> {
    inner: W
}

impl<W: Write> FeedWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write(&mut self, msg: &Message) -> io::Result<()> {
        let mut rec: Vec<u8> = Vec::with_capacity(HEADER_LEN + MAX_BODY_LEN);
        let (kind, len) = match msg {
            Message::Add(_) => (KIND_ADD, ADD_LEN),
            Message::Update(_) => (KIND_UPDATE, ADD_LEN),
            Message::Delete(_) => (KIND_DELETE, DELETE_LEN),
            Message::Executed(_) => (KIND_EXECUTED, EXECUTED_LEN),
        };
        rec.extend_from_slice(&msg.seq().to_le_bytes());
        rec.extend_from_slice(&(len as u32).to_le_bytes());
        rec.push(kind);

        match msg {
            Message::Add(m) => {
                put_order_ref(&mut rec, &m.symbol, m.order_id, m.side)?;
                put_size_price(&mut rec, m.size, m.price)?;
            }
            Message::Update(m) => {
                put_order_ref(&mut rec, &m.symbol, m.order_id, m.side)?;
                put_size_price(&mut rec, m.size, m.price)?;
            }
            Message::Delete(m) => put_order_ref(&mut rec, &m.symbol, m.order_id, m.side)?,
            Message::Executed(m) => {
                put_order_ref(&mut rec, &m.symbol, m.order_id, m.side)?;
                rec.extend_from_slice(&m.traded_quantity.to_le_bytes());
            }
        }
        self.inner.write_all(&rec)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn put_order_ref(rec: &mut Vec<u8>, symbol: &str, order_id: u64, side: Side) -> io::Result<()> {
    let raw = symbol.as_bytes();
    if raw.len() > SYMBOL_LEN {
        return Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("symbol {symbol:?} longer than {SYMBOL_LEN} bytes"),
        ));
    }
    let mut padded = [0u8; SYMBOL_LEN];
    padded[..raw.len()].copy_from_slice(raw);
    rec.extend_from_slice(&padded);
    rec.extend_from_slice(&order_id.to_le_bytes());
    rec.push(match side {
        Side::BUY => SIDE_BUY,
        Side::SELL => SIDE_SELL,
    });
    rec.extend_from_slice(&[0u8; 3]);
    Ok(())
}

fn put_size_price(rec: &mut Vec<u8>, size: u64, price: i64) -> io::Result<()> {
    let price = i32::try_from(price).map_err(|_| {
        io::Error::new(ErrorKind::InvalidInput, format!("price {price} does not fit in 32 bits"))
    })?;
    rec.extend_from_slice(&size.to_le_bytes());
    rec.extend_from_slice(&price.to_le_bytes());
    rec.extend_from_slice(&[0u8; 4]);
    Ok(())
}
