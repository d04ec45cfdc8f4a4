#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use packet_bridge::FrameCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Fuzz frame splitting - test for panics and unbounded buffering
    let mut codec = FrameCodec::default();
    let mut src = BytesMut::from(data);
    while let Ok(Some(mut frame)) = codec.decode(&mut src) {
        let _ = frame.body.read_string();
    }
});
