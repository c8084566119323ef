use bytes::{BufMut, Bytes, BytesMut};

pub const HEADER_LEN: usize = 8;

/// Stream selector byte of the daemon's log framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
  Stdin,
  Stdout,
  Stderr,
}

impl StreamKind {
  fn from_byte(byte: u8) -> Option<StreamKind> {
    match byte {
      0 => Some(StreamKind::Stdin),
      1 => Some(StreamKind::Stdout),
      2 => Some(StreamKind::Stderr),
      _ => None,
    }
  }

  fn byte(self) -> u8 {
    match self {
      StreamKind::Stdin => 0,
      StreamKind::Stdout => 1,
      StreamKind::Stderr => 2,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxFrame {
  pub kind: StreamKind,
  pub payload: Bytes,
}

/// One frame in wire format: stream byte, 3 reserved zero bytes,
/// big-endian u32 payload length, payload.
pub fn encode_frame(kind: StreamKind, payload: &[u8]) -> Bytes {
  let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
  buf.put_u8(kind.byte());
  buf.put_bytes(0, 3);
  buf.put_u32(payload.len() as u32);
  buf.put_slice(payload);
  buf.freeze()
}

/// Incremental decoder for the multiplexed framing. A partial frame
/// at the tail of a chunk is buffered and completed by the next
/// chunk; a half frame is never emitted.
#[derive(Default)]
pub struct LogDemuxer {
  buf: BytesMut,
}

impl LogDemuxer {
  pub fn push(&mut self, chunk: &[u8]) -> Vec<MuxFrame> {
    self.buf.extend_from_slice(chunk);
    let mut frames = Vec::new();
    loop {
      if self.buf.len() < HEADER_LEN {
        break;
      }
      let len = u32::from_be_bytes([
        self.buf[4],
        self.buf[5],
        self.buf[6],
        self.buf[7],
      ]) as usize;
      if self.buf.len() < HEADER_LEN + len {
        break;
      }
      let header = self.buf.split_to(HEADER_LEN);
      let payload = self.buf.split_to(len).freeze();
      // Unknown stream bytes: drop the frame, keep the framing.
      if let Some(kind) = StreamKind::from_byte(header[0]) {
        frames.push(MuxFrame { kind, payload });
      }
    }
    frames
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn frames() -> Vec<(StreamKind, &'static [u8])> {
    vec![
      (StreamKind::Stdout, b"hello from stdout\n".as_slice()),
      (StreamKind::Stderr, b"and stderr".as_slice()),
      (StreamKind::Stdout, b"".as_slice()),
      (StreamKind::Stdout, b"x".as_slice()),
      (StreamKind::Stderr, b"final error line\n".as_slice()),
    ]
  }

  fn wire(frames: &[(StreamKind, &[u8])]) -> Vec<u8> {
    frames
      .iter()
      .flat_map(|(kind, payload)| {
        encode_frame(*kind, payload).to_vec()
      })
      .collect()
  }

  fn decode_in_chunks(
    bytes: &[u8],
    chunk_size: usize,
  ) -> Vec<MuxFrame> {
    let mut demuxer = LogDemuxer::default();
    let mut out = Vec::new();
    for chunk in bytes.chunks(chunk_size) {
      out.extend(demuxer.push(chunk));
    }
    out
  }

  #[test]
  fn roundtrip_at_every_chunk_boundary() {
    let frames = frames();
    let bytes = wire(&frames);
    for chunk_size in 1..=bytes.len() {
      let decoded = decode_in_chunks(&bytes, chunk_size);
      assert_eq!(
        decoded.len(),
        frames.len(),
        "chunk size {chunk_size}"
      );
      for (decoded, (kind, payload)) in
        decoded.iter().zip(frames.iter())
      {
        assert_eq!(decoded.kind, *kind);
        assert_eq!(&decoded.payload[..], *payload);
      }
    }
  }

  #[test]
  fn partial_frame_is_never_emitted() {
    let bytes = wire(&[(StreamKind::Stdout, b"0123456789")]);
    let mut demuxer = LogDemuxer::default();
    assert!(demuxer.push(&bytes[..HEADER_LEN + 4]).is_empty());
    let frames = demuxer.push(&bytes[HEADER_LEN + 4..]);
    assert_eq!(frames.len(), 1);
    assert_eq!(&frames[0].payload[..], b"0123456789");
  }

  #[test]
  fn unknown_stream_byte_is_skipped() {
    let mut bytes =
      encode_frame(StreamKind::Stdout, b"keep").to_vec();
    let mut bogus = encode_frame(StreamKind::Stdin, b"drop").to_vec();
    bogus[0] = 7;
    bytes.extend(bogus);
    bytes
      .extend(encode_frame(StreamKind::Stderr, b"keep too").to_vec());
    let mut demuxer = LogDemuxer::default();
    let frames = demuxer.push(&bytes);
    assert_eq!(frames.len(), 2);
    assert_eq!(&frames[0].payload[..], b"keep");
    assert_eq!(frames[1].kind, StreamKind::Stderr);
  }

  #[test]
  fn interleaving_is_preserved() {
    let frames = frames();
    let bytes = wire(&frames);
    let decoded = decode_in_chunks(&bytes, 3);
    let kinds =
      decoded.iter().map(|f| f.kind).collect::<Vec<_>>();
    assert_eq!(
      kinds,
      frames.iter().map(|(kind, _)| *kind).collect::<Vec<_>>()
    );
  }
}
