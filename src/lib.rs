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

//! _wsdrive_ is a minimal, streaming RFC 6455 WebSocket **client** codec.
//!
//! It drives the HTTP/1.1 Upgrade handshake, then hands you a frame-level
//! read/write interface over a caller-supplied reader, writer, and scratch
//! buffer. There is no internal message buffering: a payload larger than
//! your scratch buffer arrives as a sequence of `Chunk` events instead of
//! being collected into a `Vec` for you.
//!
//! This is a raw frame codec, not a message-reassembling client: the `fin`
//! bit and opcode are surfaced as-is, and fragmented messages are not
//! concatenated across frames. If your server never fragments messages
//! (most don't), every `Header` you see is a complete message.
//!
//! # Example
//!
//! ```no_run
//! use std::net::TcpStream;
//! use wsdrive::{Codec, ClientEvent, FrameHeader, Opcode};
//!
//! # fn run() -> Result<(), wsdrive::WsError> {
//! let stream = TcpStream::connect("localhost:9001")?;
//! let mut scratch = [0u8; 4096];
//! let mut codec = Codec::new(&mut scratch, stream.try_clone()?, stream)?;
//! codec.handshake("/", &[("Host", "localhost:9001")])?;
//!
//! loop {
//!   match codec.read_event()? {
//!     ClientEvent::Header(h) if h.opcode == Opcode::Close => break,
//!     ClientEvent::Header(_) => {}
//!     ClientEvent::Chunk(_chunk) => { /* process chunk.data */ }
//!     ClientEvent::Closed => break,
//!   }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing a masked frame
//!
//! Client-to-server frames must be masked (RFC 6455 §5.3). Set
//! `FrameHeader.mask` to request one; the codec draws a fresh key from its
//! PRNG per frame and masks the payload through a small stack buffer — your
//! buffer is never mutated.
//!
//! ```no_run
//! # use wsdrive::{Codec, FrameHeader, Opcode};
//! # fn run(mut codec: Codec<'_, std::net::TcpStream, std::net::TcpStream>) -> Result<(), wsdrive::WsError> {
//! let mut header = FrameHeader::new(true, Opcode::Text, 5);
//! header.mask = Some(0); // value is ignored; presence requests masking
//! codec.write_message_header(header)?;
//! codec.write_message_payload(b"hello")?;
//! # Ok(())
//! # }
//! ```

mod codec;
mod error;
mod frame;
mod handshake;
mod mask;

pub use crate::codec::Codec;
pub use crate::error::{Result, WsError};
pub use crate::frame::{ChunkEvent, ClientEvent, FrameHeader, Opcode};
pub use crate::mask::mask_in_place;
