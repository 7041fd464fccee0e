//! Stream demultiplexer: splits one token stream into a structured JSON
//! block and narrative text.
//!
//! The LLM is instructed to emit a fenced ```json block first, then a
//! Markdown report. Deltas arrive with no alignment to the fence
//! delimiters, so the whole accumulated buffer is re-scanned after each
//! chunk. Invariants:
//!
//! - the parsed block is emitted exactly once, even though the fenced
//!   text stays in the buffer;
//! - text inside a still-open fence is never forwarded as narrative (it
//!   would leak raw JSON into the rendered report);
//! - a stream that ends with no parseable block is a valid terminal
//!   state — [`StreamDemux::finish`] releases any withheld text so the
//!   consumer still sees everything that arrived.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::ReviewBlock;

/// Opening delimiter of the structured block. Plain ``` fences without
/// the `json` tag are narrative (the report may contain code samples).
const FENCE_OPEN: &str = "```json";

/// Matches a syntactically complete fenced JSON region. The closing
/// ``` must sit at the start of a line to avoid matching backticks
/// embedded inside JSON string values.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json[ \t]*\r?\n(.*?)\n```").unwrap());

/// Demultiplexer state. The structured-block concern is terminal once a
/// block has been found; narrative keeps flowing independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scanning,
    BlockFound,
}

/// Output of one [`StreamDemux::push`] call.
#[derive(Debug, Default, PartialEq)]
pub struct DemuxOutput {
    /// Newly safe narrative text, in receipt order.
    pub narrative: String,
    /// The structured block, present on exactly one push (or never).
    pub block: Option<ReviewBlock>,
}

/// Incremental fence demultiplexer over a monotonically growing buffer.
pub struct StreamDemux {
    buffer: String,
    /// Byte offset of buffer already forwarded as narrative.
    forwarded: usize,
    state: State,
}

impl StreamDemux {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            forwarded: 0,
            state: State::Scanning,
        }
    }

    /// Append one text delta and return whatever became safe to forward.
    pub fn push(&mut self, delta: &str) -> DemuxOutput {
        self.buffer.push_str(delta);

        if self.state == State::BlockFound {
            return DemuxOutput {
                narrative: self.drain_to(self.buffer.len()),
                block: None,
            };
        }

        // Try every syntactically complete fence, in order. More than one
        // can exist when an earlier fence holds unparseable content.
        let fences: Vec<(usize, usize)> = FENCE_RE
            .find_iter(&self.buffer)
            .map(|m| (m.start(), m.end()))
            .collect();
        for (start, end) in fences {
            let interior = match FENCE_RE.captures(&self.buffer[start..end]) {
                Some(caps) => caps[1].to_string(),
                None => continue,
            };

            if let Some(block) = parse_block(&interior) {
                // Everything before and after the fence is narrative; the
                // fenced region itself is excised.
                let before = self.buffer[self.forwarded..start].to_string();
                let after = self.buffer[end..].to_string();
                self.forwarded = self.buffer.len();
                self.state = State::BlockFound;
                return DemuxOutput {
                    narrative: format!("{before}{after}"),
                    block: Some(block),
                };
            }
        }

        // No block yet: forward only text that cannot belong to a fence.
        DemuxOutput {
            narrative: self.drain_to(self.safe_boundary()),
            block: None,
        }
    }

    /// Signal end of stream. Releases any text still withheld for a
    /// fence that never closed or never parsed; absence of a block is
    /// not an error.
    pub fn finish(&mut self) -> DemuxOutput {
        DemuxOutput {
            narrative: self.drain_to(self.buffer.len()),
            block: None,
        }
    }

    /// Whether the structured block has been emitted.
    pub fn block_found(&self) -> bool {
        self.state == State::BlockFound
    }

    fn drain_to(&mut self, end: usize) -> String {
        let out = self.buffer[self.forwarded..end].to_string();
        self.forwarded = end;
        out
    }

    /// Largest offset that is provably outside any open fence: up to the
    /// first unconsumed fence opener, also holding back a trailing
    /// partial prefix of the opener (the delimiter may straddle a delta
    /// boundary).
    fn safe_boundary(&self) -> usize {
        let unseen = &self.buffer[self.forwarded..];
        if let Some(pos) = unseen.find(FENCE_OPEN) {
            return self.forwarded + pos;
        }
        for take in (1..FENCE_OPEN.len()).rev() {
            let prefix = &FENCE_OPEN[..take];
            if unseen.ends_with(prefix) {
                return self.buffer.len() - take;
            }
        }
        self.buffer.len()
    }
}

impl Default for StreamDemux {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a fence interior as the review block.
///
/// The value must be a JSON object carrying both mandatory keys (the
/// scores map and the commit-summary map); anything else — including
/// JSON that is incomplete because more tokens are still arriving — is
/// not the block.
fn parse_block(interior: &str) -> Option<ReviewBlock> {
    let value: serde_json::Value = serde_json::from_str(interior.trim()).ok()?;
    let obj = value.as_object()?;
    if !obj.contains_key("scores") || !obj.contains_key("commitSummaries") {
        return None;
    }
    serde_json::from_value(value).ok()
}
