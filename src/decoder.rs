//! The public, push-based `Decoder`: buffers chunks, reassembles frames,
//! decodes header/data blobs and pushes completed batches to a sink.

use log::trace;

use crate::blob::{decode_blob, inflate_blob, raw_passthrough_bytes, BlobKind};
use crate::block::HeaderBlock;
use crate::elements::{Batch, Entity};
use crate::error::Result;
use crate::filter::{TagFilterSet, WithTags};
use crate::frame::{Frame, FrameReader};
use crate::proto::osmformat;
use crate::reconstruct::reconstruct_block;
use crate::util::parse_message_from_bytes;

/// Options controlling what a `Decoder` emits and how.
///
/// Matches the three enumerated options of the decoder's public contract:
/// `withTags`, `withInfo`, `writeRaw`.
#[derive(Clone, Debug)]
pub struct DecoderOptions {
    pub with_tags: WithTags,
    pub with_info: bool,
    pub write_raw: bool,
}

impl Default for DecoderOptions {
    fn default() -> DecoderOptions {
        DecoderOptions {
            with_tags: WithTags::default(),
            with_info: false,
            write_raw: false,
        }
    }
}

/// A decoded header batch or a reconstructed/raw data batch, as handed to
/// the registered sink.
pub enum DecodedBatch {
    /// The single-element batch emitted for the file's `OSMHeader` blob.
    Header(Batch),
    /// A reconstructed batch of entities from an `OSMData` blob.
    Data(Batch),
    /// The still-compressed `zlib_data` bytes of an `OSMData` blob, emitted
    /// instead of `Data` when `write_raw` is set.
    RawData(Vec<u8>),
}

/// A stateful, push-based decoder for the OSM PBF format.
///
/// Feed it arbitrary byte chunks via [`push`](Decoder::push); it reassembles
/// frames internally and invokes the registered sink once per completed
/// blob, in source order. Call [`finish`](Decoder::finish) once the input is
/// exhausted to assert the stream ended on a frame boundary.
pub struct Decoder<F: FnMut(DecodedBatch) -> Result<()>> {
    frames: FrameReader,
    filters: TagFilterSet,
    with_info: bool,
    write_raw: bool,
    sink: F,
}

impl<F: FnMut(DecodedBatch) -> Result<()>> Decoder<F> {
    /// Constructs a new decoder. Fails synchronously with
    /// [`ErrorKind::Config`](crate::error::ErrorKind::Config) if `options`
    /// describes a malformed `withTags` shape.
    pub fn new(options: DecoderOptions, sink: F) -> Result<Decoder<F>> {
        let filters = TagFilterSet::from_option(&options.with_tags)?;
        Ok(Decoder {
            frames: FrameReader::new(),
            filters,
            with_info: options.with_info,
            write_raw: options.write_raw,
            sink,
        })
    }

    /// Feeds one chunk of input. May invoke the sink zero or more times
    /// before returning.
    pub fn push(&mut self, chunk: &[u8]) -> Result<()> {
        let filters = &self.filters;
        let with_info = self.with_info;
        let write_raw = self.write_raw;
        let sink = &mut self.sink;

        self.frames.push(chunk, |frame: Frame| {
            dispatch_frame(frame, filters, with_info, write_raw, sink)
        })
    }

    /// Asserts the byte stream ended on a frame boundary.
    pub fn finish(&mut self) -> Result<()> {
        self.frames.finish()
    }
}

fn dispatch_frame<F: FnMut(DecodedBatch) -> Result<()>>(
    frame: Frame,
    filters: &TagFilterSet,
    with_info: bool,
    write_raw: bool,
    sink: &mut F,
) -> Result<()> {
    let blob = decode_blob(&frame.blob_bytes)?;

    match frame.kind {
        BlobKind::OsmHeader => {
            let inflated = inflate_blob(&blob)?;
            let header: osmformat::HeaderBlock = parse_message_from_bytes(&inflated, "HeaderBlock")?;
            trace!("dispatch: decoded HeaderBlock");
            sink(DecodedBatch::Header(Batch::single(Entity::Header(
                HeaderBlock::new(header),
            ))))
        }
        BlobKind::OsmData if write_raw => {
            let passthrough = raw_passthrough_bytes(&blob)?;
            sink(DecodedBatch::RawData(passthrough))
        }
        BlobKind::OsmData => {
            let inflated = inflate_blob(&blob)?;
            let block: osmformat::PrimitiveBlock = parse_message_from_bytes(&inflated, "PrimitiveBlock")?;
            let batch = reconstruct_block(&block, filters, with_info)?;
            sink(DecodedBatch::Data(batch))
        }
    }
}
