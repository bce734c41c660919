//! Decode `BlobHeader`/`Blob` framing and select a decompression strategy.

use crate::error::{new_error, new_protobuf_error, ErrorKind, Result};
use crate::proto::fileformat;
use flate2::read::ZlibDecoder;
use protobuf::Message;
use std::io::Read;

/// The content type of a blob, read from its `BlobHeader` without decoding
/// the blob body.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BlobKind {
    /// Blob contains a `HeaderBlock`.
    OsmHeader,
    /// Blob contains a `PrimitiveBlock`.
    OsmData,
}

impl BlobKind {
    pub(crate) fn from_header_type(field_type: &str) -> Result<BlobKind> {
        match field_type {
            "OSMHeader" => Ok(BlobKind::OsmHeader),
            "OSMData" => Ok(BlobKind::OsmData),
            other => Err(new_error(ErrorKind::InputSequence(format!(
                "unexpected BlobHeader.type '{other}', expected 'OSMHeader' or 'OSMData'"
            )))),
        }
    }
}

/// Decodes a `BlobHeader` from its raw bytes.
pub(crate) fn decode_blob_header(bytes: &[u8]) -> Result<fileformat::BlobHeader> {
    fileformat::BlobHeader::parse_from_bytes(bytes)
        .map_err(|err| new_protobuf_error(err, "BlobHeader"))
}

/// Decodes a `Blob` from its raw bytes.
pub(crate) fn decode_blob(bytes: &[u8]) -> Result<fileformat::Blob> {
    fileformat::Blob::parse_from_bytes(bytes).map_err(|err| new_protobuf_error(err, "Blob"))
}

/// Returns the inflated payload of a `Blob`: its `raw` bytes verbatim, or
/// its `zlib_data` inflated through the external zlib capability.
///
/// This is the one place compression codec selection happens (§4.2 of the
/// decoder's design): `raw` and `zlib_data` are tried in that order, and
/// anything else is a fatal `unsupported-compression` error.
pub(crate) fn inflate_blob(blob: &fileformat::Blob) -> Result<Vec<u8>> {
    if blob.has_zlib_data() {
        let raw_size = blob.raw_size.unwrap_or(0).max(0) as usize;
        let mut out = Vec::with_capacity(raw_size);
        let mut decoder = ZlibDecoder::new(blob.zlib_data());
        decoder
            .read_to_end(&mut out)
            .map_err(|err| new_error(ErrorKind::Io(err)))?;
        Ok(out)
    } else if blob.has_raw() {
        Ok(blob.raw().to_vec())
    } else {
        Err(new_error(ErrorKind::UnsupportedCompression))
    }
}

/// Returns the still-compressed `zlib_data` payload for raw-passthrough
/// mode, or the `raw` bytes verbatim if the blob was never compressed.
pub(crate) fn raw_passthrough_bytes(blob: &fileformat::Blob) -> Result<Vec<u8>> {
    if blob.has_zlib_data() {
        Ok(blob.zlib_data().to_vec())
    } else if blob.has_raw() {
        Ok(blob.raw().to_vec())
    } else {
        Err(new_error(ErrorKind::UnsupportedCompression))
    }
}
