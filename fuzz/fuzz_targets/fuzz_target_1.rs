#![no_main]
#[macro_use]
extern crate libfuzzer_sys;
extern crate osmpbf_stream;

use osmpbf_stream::{Decoder, DecoderOptions};

fuzz_target!(|data: &[u8]| {
    let mut elements = 0u64;
    let mut decoder = Decoder::new(DecoderOptions::default(), |batch| {
        match batch {
            osmpbf_stream::DecodedBatch::Header(b) | osmpbf_stream::DecodedBatch::Data(b) => {
                elements += b.len() as u64;
            }
            osmpbf_stream::DecodedBatch::RawData(_) => {}
        }
        Ok(())
    })
    .unwrap();

    // Feed the fuzzer's bytes one chunk at a time to exercise the
    // chunk-boundary state machine, not just whole-buffer decoding.
    for chunk in data.chunks(37) {
        if decoder.push(chunk).is_err() {
            return;
        }
    }
    let _ = decoder.finish();
    let _ = elements;
});
