//! The pure `parse` entry point used to reconstruct entities from an
//! already-inflated `PrimitiveBlock`, for callers using raw-passthrough
//! mode (§4.6) who perform their own inflation.

use crate::elements::Batch;
use crate::error::Result;
use crate::filter::TagFilterSet;
use crate::proto::osmformat;
use crate::reconstruct::reconstruct_block;
use crate::util::parse_message_from_bytes;
use crate::DecoderOptions;

/// Decodes an inflated `PrimitiveBlock` byte slice into a `Batch`, applying
/// `options.with_tags`/`options.with_info` exactly as the push-based
/// `Decoder` would for the same block. `options.write_raw` has no effect
/// here: this function always reconstructs.
pub fn parse(inflated_block_bytes: &[u8], options: &DecoderOptions) -> Result<Batch> {
    let filters = TagFilterSet::from_option(&options.with_tags)?;
    let block: osmformat::PrimitiveBlock =
        parse_message_from_bytes(inflated_block_bytes, "PrimitiveBlock")?;
    reconstruct_block(&block, &filters, options.with_info)
}
