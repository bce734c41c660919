//! `HeaderBlock` and the per-`PrimitiveBlock` coordinate/string-table context.

use crate::error::{new_error, ErrorKind, Result};
use crate::proto::osmformat;

/// A decoded `HeaderBlock`, the payload of the first (`OSMHeader`) blob in
/// every file.
#[derive(Debug, Clone)]
pub struct HeaderBlock {
    inner: osmformat::HeaderBlock,
}

impl HeaderBlock {
    pub(crate) fn new(inner: osmformat::HeaderBlock) -> HeaderBlock {
        HeaderBlock { inner }
    }

    pub fn bbox(&self) -> Option<&osmformat::HeaderBBox> {
        self.inner.bbox.as_ref()
    }

    pub fn required_features(&self) -> &[String] {
        &self.inner.required_features
    }

    pub fn optional_features(&self) -> &[String] {
        &self.inner.optional_features
    }

    pub fn writingprogram(&self) -> Option<&str> {
        self.inner.writingprogram.as_deref()
    }

    pub fn source(&self) -> Option<&str> {
        self.inner.source.as_deref()
    }

    pub fn osmosis_replication_timestamp(&self) -> Option<i64> {
        self.inner.osmosis_replication_timestamp
    }

    pub fn osmosis_replication_sequence_number(&self) -> Option<i64> {
        self.inner.osmosis_replication_sequence_number
    }

    pub fn osmosis_replication_base_url(&self) -> Option<&str> {
        self.inner.osmosis_replication_base_url.as_deref()
    }
}

/// Per-block coordinate and string-table context shared by every entity
/// decoded out of one `PrimitiveBlock`.
///
/// Carries `granularity` as a pre-derived coordinate scale,
/// `lat_offset`/`lon_offset` pre-multiplied into degrees, `date_granularity`
/// and the decoded string table. Owned by the reconstructor for the
/// lifetime of one block; emitted entities are fully owned and never
/// borrow from it.
pub(crate) struct BlockContext {
    /// `1e7` when raw granularity is unset or equals 100 (preserving the
    /// literal special case), else `1e9 / raw_granularity`.
    granularity_scale: f64,
    /// Nanodegrees, pre-multiplied by `1e-9`.
    lat_offset_deg: f64,
    lon_offset_deg: f64,
    date_granularity: i64,
    strings: Vec<String>,
}

impl BlockContext {
    pub(crate) fn new(block: &osmformat::PrimitiveBlock) -> Result<BlockContext> {
        let raw_granularity = block.granularity.unwrap_or(100);
        let granularity_scale = if raw_granularity == 100 {
            1e7
        } else {
            1e9 / f64::from(raw_granularity)
        };

        let lat_offset_deg = 1e-9 * (block.lat_offset.unwrap_or(0) as f64);
        let lon_offset_deg = 1e-9 * (block.lon_offset.unwrap_or(0) as f64);
        let date_granularity = i64::from(block.date_granularity.unwrap_or(1000));

        let strings = decode_stringtable(block)?;

        Ok(BlockContext {
            granularity_scale,
            lat_offset_deg,
            lon_offset_deg,
            date_granularity,
            strings,
        })
    }

    pub(crate) fn lat(&self, raw: i64) -> f64 {
        self.lat_offset_deg + (raw as f64) / self.granularity_scale
    }

    pub(crate) fn lon(&self, raw: i64) -> f64 {
        self.lon_offset_deg + (raw as f64) / self.granularity_scale
    }

    pub(crate) fn milli_timestamp(&self, raw: i64) -> i64 {
        raw * self.date_granularity
    }

    pub(crate) fn string(&self, index: usize) -> Result<&str> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or(new_error(ErrorKind::StringtableIndexOutOfBounds { index }))
    }
}

fn decode_stringtable(block: &osmformat::PrimitiveBlock) -> Result<Vec<String>> {
    block
        .stringtable
        .s
        .iter()
        .enumerate()
        .map(|(index, bytes)| {
            std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|err| new_error(ErrorKind::StringtableUtf8 { err, index }))
        })
        .collect()
}
