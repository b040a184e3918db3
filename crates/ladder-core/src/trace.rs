// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tracer sinks for step events.
//!
//! A tracer is any sink accepting [`Event`] records one at a time in step
//! order. Tracers must not back-pressure the runtime: when a sink fails the
//! runtime detaches it and records a single warning, then carries on.
use std::io::Write;

use crate::event::Event;

/// Ordered event sink.
pub trait Tracer {
    /// Records one event.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error; the runtime responds by detaching
    /// the sink, never by retrying or failing the run.
    fn record(&mut self, event: &Event) -> std::io::Result<()>;
}

/// Line-delimited JSON sink: one event object per line.
pub struct JsonlTracer<W: Write> {
    out: W,
}

impl<W: Write> JsonlTracer<W> {
    /// Wraps a writer. Every record is flushed so partial runs still leave a
    /// readable trace.
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Tracer for JsonlTracer<W> {
    fn record(&mut self, event: &Event) -> std::io::Result<()> {
        let line = serde_json::to_string(event).map_err(std::io::Error::other)?;
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}
