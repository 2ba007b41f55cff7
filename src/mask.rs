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

//! RFC 6455 §5.3 masking/unmasking. The operation is its own inverse: the
//! same function de-masks a server frame and masks a client frame.

/// XORs `buf` in place with `key`, where `key[(base_offset + i) % 4]` is
/// applied to `buf[i]`.
///
/// `base_offset` is the absolute byte position of `buf[0]` within the
/// frame's payload, not within `buf` itself — this is what makes masking
/// correct across chunk boundaries: a frame delivered over several calls
/// to [`crate::FrameReader`] masks identically to one delivered in a
/// single call, because each call passes the running payload offset
/// rather than restarting from zero.
pub fn mask_in_place(buf: &mut [u8], key: [u8; 4], base_offset: u64) {
  let phase = (base_offset % 4) as usize;

  // Rotate the key so that key_rot[0] lines up with buf[0]; this lets the
  // loop below index the key with a plain `i & 3` instead of carrying the
  // phase through every iteration.
  let mut key_rot = [0u8; 4];
  for i in 0..4 {
    key_rot[i] = key[(phase + i) % 4];
  }

  let mut chunks = buf.chunks_exact_mut(4);
  let key_word = u32::from_ne_bytes(key_rot);
  for chunk in &mut chunks {
    let word = u32::from_ne_bytes(chunk.try_into().unwrap()) ^ key_word;
    chunk.copy_from_slice(&word.to_ne_bytes());
  }

  let remainder = chunks.into_remainder();
  for (i, byte) in remainder.iter_mut().enumerate() {
    *byte ^= key_rot[i];
  }
}
