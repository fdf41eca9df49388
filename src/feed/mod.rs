// Feed entrypoint
pub mod codec;          // fixed-width binary records <-> Message

pub use codec::{DecodeError, FeedReader, FeedWriter};
