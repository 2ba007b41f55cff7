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

use crate::error::{Result, WsError};
use crate::mask::mask_in_place;

/// The 4-bit frame opcode (RFC 6455 §5.2).
///
/// Unlike a server-role implementation, a client codec has no business
/// rejecting opcodes it doesn't recognize — an extension the caller has
/// negotiated out-of-band may define new ones. Unknown values round-trip
/// through [`Opcode::Reserved`] instead of failing to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
  Continuation,
  Text,
  Binary,
  Close,
  Ping,
  Pong,
  Reserved(u8),
}

impl Opcode {
  pub(crate) fn from_nibble(byte: u8) -> Self {
    match byte & 0x0F {
      0x0 => Opcode::Continuation,
      0x1 => Opcode::Text,
      0x2 => Opcode::Binary,
      0x8 => Opcode::Close,
      0x9 => Opcode::Ping,
      0xA => Opcode::Pong,
      other => Opcode::Reserved(other),
    }
  }

  pub(crate) fn to_nibble(self) -> u8 {
    match self {
      Opcode::Continuation => 0x0,
      Opcode::Text => 0x1,
      Opcode::Binary => 0x2,
      Opcode::Close => 0x8,
      Opcode::Ping => 0x9,
      Opcode::Pong => 0xA,
      Opcode::Reserved(n) => n & 0x0F,
    }
  }
}

/// A parsed (or to-be-written) frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
  pub fin: bool,
  pub rsv1: bool,
  pub rsv2: bool,
  pub rsv3: bool,
  pub opcode: Opcode,
  pub length: u64,
  /// On write: `Some(key)` masks the payload with `key`, `None` masks
  /// with a fresh PRNG-drawn key (see [`crate::Codec::write_message_header`]).
  /// On read: always `None` — the mask key itself is never surfaced, only
  /// whether one was present on the wire (already applied by the time a
  /// [`crate::ClientEvent::Chunk`] reaches the caller).
  pub mask: Option<u32>,
}

impl FrameHeader {
  pub fn new(fin: bool, opcode: Opcode, length: u64) -> Self {
    FrameHeader { fin, rsv1: false, rsv2: false, rsv3: false, opcode, length, mask: None }
  }
}

/// One delivered slice of a frame's payload, borrowed from the caller's
/// scratch buffer. The borrow (and the data behind it) is only valid
/// until the next call into the codec.
#[derive(Debug)]
pub struct ChunkEvent<'a> {
  pub data: &'a [u8],
  pub is_final: bool,
}

/// The event stream produced by [`crate::Codec::read_event`].
#[derive(Debug)]
pub enum ClientEvent<'a> {
  Header(FrameHeader),
  Chunk(ChunkEvent<'a>),
  /// The peer closed the stream (EOF) between frames or mid-frame.
  Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
  AwaitingHeader,
  ReadingPayload,
}

/// Resumable pull parser: `AwaitingHeader -> ReadingPayload -> AwaitingHeader`.
///
/// All cross-call state lives in this struct's fields — no borrowed slice
/// is ever cached here, matching spec.md's "no retained borrows" invariant.
pub(crate) struct FrameReader {
  state: ReadState,
  chunk_need: u64,
  chunk_read: u64,
  chunk_has_mask: bool,
  chunk_mask: [u8; 4],
}

impl FrameReader {
  pub(crate) fn new() -> Self {
    FrameReader {
      state: ReadState::AwaitingHeader,
      chunk_need: 0,
      chunk_read: 0,
      chunk_has_mask: false,
      chunk_mask: [0; 4],
    }
  }

  /// Reads exactly `buf.len()` bytes, returning `Ok(false)` (instead of an
  /// error) on a short read — the short-read-as-`Closed` convention spec.md
  /// §7 calls for.
  fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut nread = 0;
    while nread < buf.len() {
      let n = reader.read(&mut buf[nread..])?;
      if n == 0 {
        return Ok(false);
      }
      nread += n;
    }
    Ok(true)
  }

  pub(crate) fn read_event<'s, R: Read>(
    &mut self,
    reader: &mut R,
    scratch: &'s mut [u8],
    max_frame_length: u64,
  ) -> Result<ClientEvent<'s>> {
    match self.state {
      ReadState::AwaitingHeader => self.read_header(reader, scratch, max_frame_length),
      ReadState::ReadingPayload => self.read_payload(reader, scratch, max_frame_length),
    }
  }

  fn read_header<'s, R: Read>(
    &mut self,
    reader: &mut R,
    _scratch: &'s mut [u8],
    max_frame_length: u64,
  ) -> Result<ClientEvent<'s>> {
    let mut head = [0u8; 2];
    if !Self::read_full(reader, &mut head)? {
      return Ok(ClientEvent::Closed);
    }

    let fin = head[0] & 0x80 != 0;
    let rsv1 = head[0] & 0x40 != 0;
    let rsv2 = head[0] & 0x20 != 0;
    let rsv3 = head[0] & 0x10 != 0;
    let opcode = Opcode::from_nibble(head[0]);

    let masked = head[1] & 0x80 != 0;
    let len7 = head[1] & 0x7F;

    let length: u64 = match len7 {
      126 => {
        let mut ext = [0u8; 2];
        if !Self::read_full(reader, &mut ext)? {
          return Ok(ClientEvent::Closed);
        }
        u16::from_be_bytes(ext) as u64
      }
      127 => {
        let mut ext = [0u8; 8];
        if !Self::read_full(reader, &mut ext)? {
          return Ok(ClientEvent::Closed);
        }
        u64::from_be_bytes(ext)
      }
      _ => len7 as u64,
    };

    if length > max_frame_length {
      return Err(WsError::FrameTooLarge { length, max: max_frame_length });
    }

    if masked {
      let mut key = [0u8; 4];
      if !Self::read_full(reader, &mut key)? {
        return Ok(ClientEvent::Closed);
      }
      self.chunk_mask = key;
      self.chunk_has_mask = true;
    } else {
      self.chunk_has_mask = false;
    }

    self.chunk_need = length;
    self.chunk_read = 0;
    self.state = ReadState::ReadingPayload;

    Ok(ClientEvent::Header(FrameHeader {
      fin,
      rsv1,
      rsv2,
      rsv3,
      opcode,
      length,
      mask: None,
    }))
  }

  fn read_payload<'s, R: Read>(
    &mut self,
    reader: &mut R,
    scratch: &'s mut [u8],
    max_frame_length: u64,
  ) -> Result<ClientEvent<'s>> {
    let left = self.chunk_need - self.chunk_read;

    if left == 0 {
      // length == 0: AwaitingHeader never saw payload to begin with, but
      // ReadingPayload is still entered so that this branch is the single
      // place that flips state back. No Chunk is emitted for a zero-length
      // frame (spec.md §9's zero-length-frame open question, decided).
      self.state = ReadState::AwaitingHeader;
      return self.read_header(reader, scratch, max_frame_length);
    }

    if left <= scratch.len() as u64 {
      // The whole remainder of the payload fits: read exactly that many
      // bytes, `Closed` on a short read (spec.md §4.3's first branch).
      let want = left as usize;
      let buf = &mut scratch[..want];
      if !Self::read_full(reader, buf)? {
        return Ok(ClientEvent::Closed);
      }
      return self.finish_chunk(want as u64, buf, want);
    }

    // More payload remains than the scratch buffer can hold: a single
    // best-effort read, not a fill loop — the chunk boundary tracks
    // whatever the underlying reader actually handed back this call
    // (spec.md §4.3's second branch), rather than blocking until the
    // buffer is full.
    let want = scratch.len();
    let buf = &mut scratch[..want];
    let n = reader.read(buf)?;
    if n == 0 {
      return Ok(ClientEvent::Closed);
    }
    self.finish_chunk(n as u64, buf, n)
  }

  fn finish_chunk<'s>(
    &mut self,
    advanced: u64,
    buf: &'s mut [u8],
    n: usize,
  ) -> Result<ClientEvent<'s>> {
    if self.chunk_has_mask {
      mask_in_place(&mut buf[..n], self.chunk_mask, self.chunk_read);
    }

    self.chunk_read += advanced;
    let is_final = self.chunk_read >= self.chunk_need;
    if is_final {
      self.state = ReadState::AwaitingHeader;
    }

    Ok(ClientEvent::Chunk(ChunkEvent { data: &buf[..n], is_final }))
  }
}

/// Serializes frame headers and streams (optionally masked) payload bytes.
pub(crate) struct FrameWriter {
  current_write_mask: Option<[u8; 4]>,
  write_mask_offset: u64,
}

impl FrameWriter {
  pub(crate) fn new() -> Self {
    FrameWriter { current_write_mask: None, write_mask_offset: 0 }
  }

  pub(crate) fn write_message_header<W: Write>(
    &mut self,
    writer: &mut W,
    header: FrameHeader,
    mask_key: Option<[u8; 4]>,
  ) -> Result<()> {
    let mut byte0 = header.opcode.to_nibble();
    if header.fin {
      byte0 |= 0x80;
    }
    if header.rsv1 {
      byte0 |= 0x40;
    }
    if header.rsv2 {
      byte0 |= 0x20;
    }
    if header.rsv3 {
      byte0 |= 0x10;
    }

    let mut out = [0u8; 14];
    out[0] = byte0;
    let mut n = 2;

    let mask_bit = if mask_key.is_some() { 0x80 } else { 0x00 };
    if header.length < 126 {
      out[1] = mask_bit | header.length as u8;
    } else if header.length < 1 << 16 {
      out[1] = mask_bit | 126;
      out[2..4].copy_from_slice(&(header.length as u16).to_be_bytes());
      n += 2;
    } else {
      out[1] = mask_bit | 127;
      out[2..10].copy_from_slice(&header.length.to_be_bytes());
      n += 8;
    }

    if let Some(key) = mask_key {
      out[n..n + 4].copy_from_slice(&key);
      n += 4;
    }

    writer.write_all(&out[..n])?;

    self.current_write_mask = mask_key;
    self.write_mask_offset = 0;
    Ok(())
  }

  pub(crate) fn write_message_payload<W: Write>(
    &mut self,
    writer: &mut W,
    bytes: &[u8],
  ) -> Result<()> {
    let Some(key) = self.current_write_mask else {
      writer.write_all(bytes)?;
      return Ok(());
    };

    // Stream through a small stack buffer so the caller's slice is never
    // mutated in place.
    const STACK_BUF: usize = 256;
    let mut stage = [0u8; STACK_BUF];
    let mut offset = 0;
    while offset < bytes.len() {
      let take = (bytes.len() - offset).min(STACK_BUF);
      stage[..take].copy_from_slice(&bytes[offset..offset + take]);
      mask_in_place(&mut stage[..take], key, self.write_mask_offset);
      writer.write_all(&stage[..take])?;
      self.write_mask_offset += take as u64;
      offset += take;
    }

    Ok(())
  }
}
