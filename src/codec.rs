// Copyright 2023 Divy Srivastava <dj.srivastava23@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::{Read, Write};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::{Result, WsError};
use crate::frame::{ClientEvent, FrameHeader, FrameReader, FrameWriter};
use crate::handshake;

/// Default cap on a single frame's declared payload length, matching the
/// teacher's own `max_message_size` default. Guards `read_event` against
/// treating an attacker-controlled 64-bit length as an invitation to block
/// forever on a payload that will never fully arrive.
const DEFAULT_MAX_FRAME_LENGTH: u64 = 64 << 20;

const MIN_SCRATCH_LEN: usize = 16;

/// Streaming RFC 6455 client codec over a caller-owned scratch buffer and
/// reader/writer pair. See `SPEC_FULL.md` for the full contract.
///
/// `Codec` owns no heap allocations itself; `R`/`W` are monomorphized type
/// parameters rather than a dynamic `dyn Read`/`dyn Write`, so the hot
/// `read_event` path never goes through a vtable (spec.md §9's note on
/// avoiding per-byte dynamic dispatch in the mask loop).
///
/// `Rng` defaults to [`StdRng`], seeded from OS entropy by [`Codec::new`].
/// [`Codec::with_rng`] accepts any [`RngCore`] so a caller — or a test —
/// can pin the `Sec-WebSocket-Key` and the per-frame write mask to a
/// known sequence instead of letting the PRNG draw from entropy.
pub struct Codec<'buf, R, W, Rng = StdRng> {
  scratch: &'buf mut [u8],
  reader: R,
  writer: W,
  frame_reader: FrameReader,
  frame_writer: FrameWriter,
  rng: Rng,
  handshaken: bool,
  max_frame_length: u64,
}

impl<'buf, R: Read, W: Write> Codec<'buf, R, W, StdRng> {
  /// Creates a codec over `scratch` (must be at least 16 bytes), `reader`,
  /// and `writer`, seeding its PRNG from OS entropy. The buffer is reused
  /// for both header bytes and payload chunks for the lifetime of the
  /// codec.
  pub fn new(scratch: &'buf mut [u8], reader: R, writer: W) -> Result<Self> {
    Self::with_rng(scratch, reader, writer, StdRng::from_entropy())
  }
}

impl<'buf, R: Read, W: Write, Rng: RngCore> Codec<'buf, R, W, Rng> {
  /// Creates a codec driven by a caller-supplied PRNG instead of the
  /// default OS-entropy-seeded [`StdRng`]. The handshake's
  /// `Sec-WebSocket-Key` and every write mask are drawn from `rng`, so a
  /// deterministic `Rng` (a fixed-sequence stub, say) makes both
  /// reproducible end to end.
  pub fn with_rng(scratch: &'buf mut [u8], reader: R, writer: W, rng: Rng) -> Result<Self> {
    if scratch.len() < MIN_SCRATCH_LEN {
      return Err(WsError::ScratchTooSmall(scratch.len()));
    }
    Ok(Codec {
      scratch,
      reader,
      writer,
      frame_reader: FrameReader::new(),
      frame_writer: FrameWriter::new(),
      rng,
      handshaken: false,
      max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
    })
  }

  /// Bounds the payload length a single frame may declare. `read_event`
  /// fails with [`WsError::FrameTooLarge`] before attempting to read the
  /// payload of a frame that exceeds this. Default: 64 MiB.
  pub fn set_max_frame_length(&mut self, max: u64) {
    self.max_frame_length = max;
  }

  /// `true` once [`Codec::handshake`] has completed successfully. Advisory
  /// only — `read_event`/`write_*` do not gate on it.
  pub fn handshaken(&self) -> bool {
    self.handshaken
  }

  /// Performs the client Upgrade handshake (spec.md §4.1). `headers` are
  /// written verbatim, in order, before the codec's own required headers.
  pub fn handshake(&mut self, path: &str, headers: &[(&str, &str)]) -> Result<()> {
    handshake::handshake(&mut self.reader, &mut self.writer, &mut self.rng, path, headers)?;
    self.handshaken = true;
    Ok(())
  }

  /// Pulls the next event from the stream: a frame header, a chunk of the
  /// current frame's payload, or `Closed` on premature EOF.
  pub fn read_event(&mut self) -> Result<ClientEvent<'_>> {
    self.frame_reader.read_event(&mut self.reader, self.scratch, self.max_frame_length)
  }

  /// Writes a frame header. If `header.mask` is `Some(_)`, a fresh 32-bit
  /// mask key is drawn from the codec's PRNG (spec.md §9) and used for the
  /// subsequent [`Codec::write_message_payload`] calls — the value carried
  /// in `header.mask` only signals that masking is requested, matching the
  /// design decision recorded in `DESIGN.md`.
  pub fn write_message_header(&mut self, header: FrameHeader) -> Result<()> {
    let mask_key = if header.mask.is_some() {
      let mut key = [0u8; 4];
      self.rng.fill_bytes(&mut key);
      Some(key)
    } else {
      None
    };
    self.frame_writer.write_message_header(&mut self.writer, header, mask_key)
  }

  /// Streams payload bytes for the frame whose header was most recently
  /// written, masking through a bounded stack buffer if a mask is active.
  /// The caller's `bytes` slice is never mutated.
  pub fn write_message_payload(&mut self, bytes: &[u8]) -> Result<()> {
    self.frame_writer.write_message_payload(&mut self.writer, bytes)
  }

  /// Consumes the codec, returning the reader and writer.
  pub fn into_inner(self) -> (R, W) {
    (self.reader, self.writer)
  }
}
