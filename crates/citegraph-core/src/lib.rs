//! Citegraph Core - Paper record ingestion
//!
//! This crate reads corpora of academic-paper records and hands them to the
//! graph builder one record at a time. Corpora are newline-delimited JSON,
//! one paper per line, in the DBLP "dblp-ref" layout.
//!
//! # Example
//!
//! ```no_run
//! use citegraph_core::RecordStream;
//!
//! let mut stream = RecordStream::open("dblp-ref-0.json")?;
//! for record in stream.by_ref() {
//!     match record {
//!         Ok(paper) => println!("{:?} cites {} papers", paper.id, paper.references.len()),
//!         Err(e) if e.is_recoverable() => continue,
//!         Err(e) => return Err(e.into()),
//!     }
//! }
//! println!("{} lines, {} malformed", stream.stats().lines_seen, stream.stats().malformed);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod record;
pub mod stream;

pub use error::{RecordError, Result};
pub use record::PaperRecord;
pub use stream::{RecordStream, StreamStats};
