//! A streaming, chunk-incremental decoder for the OpenStreetMap PBF file
//! format (`*.osm.pbf`).
//!
//! Feed arbitrary byte chunks to a [`Decoder`] and it reassembles the
//! length-prefixed `BlobHeader`/`Blob` framing across chunk boundaries,
//! decodes the embedded `HeaderBlock`/`PrimitiveBlock` messages, and pushes
//! one batch of entities per blob to a caller-supplied sink — without ever
//! buffering the whole file.
//!
//! # Example: count ways while streaming a file
//!
//! ```no_run
//! use osmpbf_stream::{stream_from_file, DecoderOptions, Entity};
//!
//! # fn foo() -> osmpbf_stream::Result<()> {
//! let mut ways = 0u64;
//! for entity in osmpbf_stream::stream_from_file("sample.osm.pbf", DecoderOptions::default())? {
//!     if let Entity::Way(_) = entity? {
//!         ways += 1;
//!     }
//! }
//! println!("ways: {ways}");
//! # Ok(())
//! # }
//! ```

mod blob;
mod block;
mod decoder;
mod error;
mod filter;
mod frame;
mod par;
mod parse;
mod reconstruct;
mod util;

pub mod elements;
pub mod proto;
pub mod reader;

pub use blob::BlobKind;
pub use block::HeaderBlock;
pub use decoder::{DecodedBatch, Decoder, DecoderOptions};
pub use elements::{Batch, Entity, Info, Member, MemberType, Node, Relation, Way};
pub use error::{Error, ErrorKind, Result};
pub use filter::{PerEntityTags, TagSelector, WithTags};
pub use par::decode_parallel;
pub use parse::parse;
pub use reader::{stream_from_file, Elements};
