//! The incremental byte-stream state machine that reassembles `BlobHeader`/
//! `Blob` framing across arbitrary chunk boundaries.
//!
//! `FrameReader` is the one component in this crate with no teacher
//! counterpart: earlier OSM PBF readers in this family all read framing
//! from a blocking `Read` source one frame at a time. This reader instead
//! suspends between chunks, buffering only the unconsumed tail.

use byteorder::{BigEndian, ByteOrder};
use log::{debug, trace};

use crate::blob::{decode_blob_header, BlobKind};
use crate::error::{new_error, ErrorKind, Result};

const LEN_PREFIX_BYTES: usize = 4;

enum FrameState {
    WantLen,
    WantHeader { len: u32 },
    WantBlobHeader { kind: BlobKind, datasize: u32 },
}

/// One fully framed blob: its content kind and inflated-or-not blob body
/// bytes, still in wire (protobuf `Blob` message) form.
pub(crate) struct Frame {
    pub(crate) kind: BlobKind,
    pub(crate) blob_bytes: Vec<u8>,
}

/// Reassembles the length-prefixed `BlobHeader`/`Blob` stream, one chunk at
/// a time. Each `push` call consumes as many complete frames as the
/// buffered bytes allow and hands each to the supplied callback before
/// returning control to the caller.
pub(crate) struct FrameReader {
    state: FrameState,
    buf: Vec<u8>,
    pos: usize,
    seen_header: bool,
    frames_produced: u64,
}

impl FrameReader {
    pub(crate) fn new() -> FrameReader {
        FrameReader {
            state: FrameState::WantLen,
            buf: Vec::new(),
            pos: 0,
            seen_header: false,
            frames_produced: 0,
        }
    }

    /// Feeds one chunk of input, invoking `on_frame` for every frame
    /// completed by it (zero or more times).
    pub(crate) fn push(
        &mut self,
        chunk: &[u8],
        mut on_frame: impl FnMut(Frame) -> Result<()>,
    ) -> Result<()> {
        self.buf.extend_from_slice(chunk);

        loop {
            let available = self.buf.len() - self.pos;

            match &self.state {
                FrameState::WantLen => {
                    if available < LEN_PREFIX_BYTES {
                        break;
                    }
                    let len = BigEndian::read_u32(&self.buf[self.pos..self.pos + LEN_PREFIX_BYTES]);
                    self.pos += LEN_PREFIX_BYTES;
                    trace!("frame: want_len -> want_header(len={len})");
                    self.state = FrameState::WantHeader { len };
                }
                FrameState::WantHeader { len } => {
                    let len = *len as usize;
                    if available < len {
                        break;
                    }
                    let header_bytes = &self.buf[self.pos..self.pos + len];
                    let header = decode_blob_header(header_bytes)?;
                    self.pos += len;

                    let kind = BlobKind::from_header_type(header.type_())?;
                    if matches!(kind, BlobKind::OsmData) && !self.seen_header {
                        return Err(new_error(ErrorKind::InputSequence(
                            "OSMData blob encountered before any OSMHeader blob".to_owned(),
                        )));
                    }
                    if matches!(kind, BlobKind::OsmHeader) {
                        self.seen_header = true;
                    }

                    let datasize = header.datasize() as u32;
                    trace!("frame: want_header -> want_blob({kind:?}, datasize={datasize})");
                    self.state = FrameState::WantBlobHeader { kind, datasize };
                }
                FrameState::WantBlobHeader { kind, datasize } => {
                    let datasize = *datasize as usize;
                    if self.buf.len() - self.pos < datasize {
                        break;
                    }
                    let blob_bytes = self.buf[self.pos..self.pos + datasize].to_vec();
                    self.pos += datasize;

                    let frame = Frame {
                        kind: *kind,
                        blob_bytes,
                    };
                    debug!("frame: completed {:?} blob ({} bytes)", frame.kind, datasize);
                    self.frames_produced += 1;
                    on_frame(frame)?;

                    self.state = FrameState::WantLen;
                }
            }
        }

        self.compact();
        Ok(())
    }

    /// Asserts the reader is in a terminal state (awaiting a fresh length
    /// prefix with nothing buffered) and that at least one frame was ever
    /// produced, returning a truncation error otherwise. An input that ends
    /// with an empty accumulator in `WantLen` but never produced a single
    /// frame (e.g. the empty file) is itself a truncation: the file is
    /// required to contain at least one `OSMHeader` blob.
    pub(crate) fn finish(&self) -> Result<()> {
        let remaining = self.buf.len() - self.pos;
        match self.state {
            FrameState::WantLen if remaining == 0 && self.frames_produced > 0 => Ok(()),
            _ => Err(new_error(ErrorKind::Format(
                "input ended mid-frame: expected more bytes than were supplied".to_owned(),
            ))),
        }
    }

    fn compact(&mut self) {
        if self.pos > self.buf.len() / 2 {
            self.buf.drain(0..self.pos);
            self.pos = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::fileformat;
    use protobuf::Message;

    fn encode_frame(header_type: &str, blob_bytes: &[u8]) -> Vec<u8> {
        let mut header = fileformat::BlobHeader::new();
        header.set_type(header_type.to_owned());
        header.datasize = Some(blob_bytes.len() as i32);
        let header_bytes = header.write_to_bytes().unwrap();

        let mut out = Vec::new();
        let mut len_prefix = [0u8; 4];
        BigEndian::write_u32(&mut len_prefix, header_bytes.len() as u32);
        out.extend_from_slice(&len_prefix);
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(blob_bytes);
        out
    }

    fn encode_blob(raw: &[u8]) -> Vec<u8> {
        let mut blob = fileformat::Blob::new();
        blob.raw = Some(raw.to_vec());
        blob.raw_size = Some(raw.len() as i32);
        blob.write_to_bytes().unwrap()
    }

    #[test]
    fn rejects_data_before_header() {
        let blob = encode_blob(b"hello");
        let bytes = encode_frame("OSMData", &blob);

        let mut reader = FrameReader::new();
        let err = reader.push(&bytes, |_| Ok(())).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InputSequence(_)));
    }

    #[test]
    fn chunk_independence_byte_at_a_time() {
        let header_blob = encode_blob(b"header-bytes");
        let data_blob = encode_blob(b"data-bytes");
        let mut bytes = encode_frame("OSMHeader", &header_blob);
        bytes.extend(encode_frame("OSMData", &data_blob));

        let mut whole_kinds = Vec::new();
        let mut reader = FrameReader::new();
        reader
            .push(&bytes, |frame| {
                whole_kinds.push(frame.kind);
                Ok(())
            })
            .unwrap();
        reader.finish().unwrap();

        let mut chunked_kinds = Vec::new();
        let mut reader = FrameReader::new();
        for byte in &bytes {
            reader
                .push(&[*byte], |frame| {
                    chunked_kinds.push(frame.kind);
                    Ok(())
                })
                .unwrap();
        }
        reader.finish().unwrap();

        assert_eq!(whole_kinds, chunked_kinds);
        assert_eq!(whole_kinds, vec![BlobKind::OsmHeader, BlobKind::OsmData]);
    }

    #[test]
    fn truncation_at_eof_is_format_error() {
        let mut reader = FrameReader::new();
        reader.push(&[0, 0, 0, 10], |_| Ok(())).unwrap();
        let err = reader.finish().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Format(_)));
    }

    #[test]
    fn empty_input_is_a_truncation_error() {
        let mut reader = FrameReader::new();
        reader.push(&[], |_| Ok(())).unwrap();
        let err = reader.finish().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Format(_)));
    }

    #[test]
    fn finish_succeeds_once_at_least_one_frame_was_produced() {
        let header_blob = encode_blob(b"header-bytes");
        let bytes = encode_frame("OSMHeader", &header_blob);

        let mut reader = FrameReader::new();
        reader.push(&bytes, |_| Ok(())).unwrap();
        reader.finish().unwrap();
    }
}
