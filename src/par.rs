//! An optional, order-preserving parallel decode path (§9's "concurrency
//! extension" design hook), built on the `rayon` thread pool the way the
//! teacher's `par_map_reduce` used it.
//!
//! Framing is reassembled sequentially first — each blob's length depends
//! on the previous one, so reassembly cannot itself be parallelized — then
//! decompression and reconstruction for every blob are fanned out over
//! `rayon::par_iter`. `Vec::par_iter().map(..).collect()` is an indexed
//! parallel iterator, so the collected results land back in their original
//! positions regardless of which blob finishes decoding first; no explicit
//! reorder buffer is needed to keep the single-threaded ordering contract
//! observable from the outside.

use rayon::prelude::*;

use crate::blob::{decode_blob, inflate_blob, raw_passthrough_bytes, BlobKind};
use crate::block::HeaderBlock;
use crate::decoder::{DecodedBatch, DecoderOptions};
use crate::elements::{Batch, Entity};
use crate::error::Result;
use crate::filter::TagFilterSet;
use crate::frame::{Frame, FrameReader};
use crate::proto::osmformat;
use crate::reconstruct::reconstruct_block;
use crate::util::parse_message_from_bytes;

/// Decodes a complete in-memory PBF byte buffer, fanning per-blob
/// decompression and reconstruction out across available cores. Returns
/// one `DecodedBatch` per blob, in source order.
///
/// Unlike [`Decoder`](crate::Decoder), this function requires the whole
/// input up front: it is not chunk-incremental. Use it when the full file
/// already fits in memory and per-blob decode cost dominates, not as a
/// replacement for the streaming path.
pub fn decode_parallel(bytes: &[u8], options: &DecoderOptions) -> Result<Vec<DecodedBatch>> {
    let filters = TagFilterSet::from_option(&options.with_tags)?;

    let mut frames = Vec::new();
    let mut reader = FrameReader::new();
    reader.push(bytes, |frame: Frame| {
        frames.push(frame);
        Ok(())
    })?;
    reader.finish()?;

    frames
        .into_par_iter()
        .map(|frame| decode_one(frame, &filters, options.with_info, options.write_raw))
        .collect()
}

fn decode_one(
    frame: Frame,
    filters: &TagFilterSet,
    with_info: bool,
    write_raw: bool,
) -> Result<DecodedBatch> {
    let blob = decode_blob(&frame.blob_bytes)?;

    match frame.kind {
        BlobKind::OsmHeader => {
            let inflated = inflate_blob(&blob)?;
            let header: osmformat::HeaderBlock = parse_message_from_bytes(&inflated, "HeaderBlock")?;
            Ok(DecodedBatch::Header(Batch::single(Entity::Header(
                HeaderBlock::new(header),
            ))))
        }
        BlobKind::OsmData if write_raw => {
            Ok(DecodedBatch::RawData(raw_passthrough_bytes(&blob)?))
        }
        BlobKind::OsmData => {
            let inflated = inflate_blob(&blob)?;
            let block: osmformat::PrimitiveBlock = parse_message_from_bytes(&inflated, "PrimitiveBlock")?;
            Ok(DecodedBatch::Data(reconstruct_block(&block, filters, with_info)?))
        }
    }
}
