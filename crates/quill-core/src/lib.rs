//! Core of quill: task markers in markdown, resolved into generated text.
//!
//! ```text
//! document --chunk::partition--> [Chunk]
//!     |
//!     +--segment::extract--> [Segment] --generate::Generator--> text
//!                                 |
//!                                 v
//!                         splice::{splice_all, splice_one}
//!                                 |
//!                                 v
//!                 tree::ContentTree (Module > Chapter > Page on disk)
//! ```
//!
//! Nothing here caches: every operation recomputes segments, chunks and
//! the content tree from the text or directory it is handed.

pub mod chunk;
pub mod generate;
pub mod segment;
pub mod splice;
pub mod tree;

pub use chunk::{Chunk, partition};
pub use generate::{ClaudeCodeGenerator, GenerationError, GenerationRequest, Generator, Memory};
pub use segment::{Segment, SegmentKind, extract};
pub use splice::{SpliceError, splice_all, splice_one};
pub use tree::{ContentTree, NodeKind, TreeError};
