use std::io::{self, Write};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::engine::printer::SnapshotPrinter;
use crate::engine::registry::BookRegistry;
use crate::engine::types::{BookError, Message};
use crate::feed::DecodeError;
use crate::telemetry::RunStats;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("message {seq} rejected")]
    Book { seq: u32, #[source] source: BookError },

    #[error("failed to write snapshot")]
    Output(#[from] io::Error),
}

/// Applies feed messages and yields a snapshot line whenever a book's
/// visible top levels change.
#[derive(Debug)]
pub struct BookView {
    registry: BookRegistry,
    printer: SnapshotPrinter
}

impl BookView {
    pub fn new(depth: usize) -> Self {
        Self { registry: BookRegistry::new(), printer: SnapshotPrinter::new(depth) }
    }

    pub fn registry(&self) -> &BookRegistry {
        &self.registry
    }

    #[instrument(level = "trace", skip_all, fields(seq = msg.seq(), symbol = %msg.symbol()))]
    pub fn process(&mut self, msg: &Message) -> Result<Option<String>, BookError> {
        metrics::counter!("bookview_messages_total", "kind" => msg.kind()).increment(1);
        let book = self.registry.apply(msg)?;
        let line = self.printer.print(msg.seq(), book);
        if let Some(line) = &line {
            debug!(line=%line, "Snapshot changed");
        }
        Ok(line)
    }

    /// Processes a whole feed, writing one line per emitted snapshot.
    /// The first decode or book error aborts the run.
    pub fn run<I, W>(&mut self, feed: I, out: &mut W, stats: &mut RunStats) -> Result<(), RunError>
    where
        I: IntoIterator<Item = Result<Message, DecodeError>>,
        W: Write,
    {
        for msg in feed {
            let msg = msg?;
            let started = Instant::now();
            let line = self.process(&msg).map_err(|source| {
                error!(seq=msg.seq(), symbol=%msg.symbol(), error=%source, "Aborting run");
                RunError::Book { seq: msg.seq(), source }
            })?;
            stats.record(started.elapsed(), line.is_some());
            if let Some(line) = line {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }
}
