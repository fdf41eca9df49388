pub mod types;
pub mod levels;
pub mod book;
pub mod registry;
pub mod printer;
pub mod view;

pub use types::*;
pub use book::OrderBook;
pub use registry::BookRegistry;
pub use printer::{SnapshotPrinter, TopOfBook};
pub use view::BookView;
