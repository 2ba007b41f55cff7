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

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = WsError> = std::result::Result<T, E>;

/// Errors produced by the handshake driver and the frame codec.
///
/// `Closed` (premature EOF between or within frames) is not part of this
/// enum — it is surfaced as [`crate::ClientEvent::Closed`] instead, since
/// it is a normal outcome the caller decides how to act on, not a failure
/// of the codec itself.
#[derive(Debug, Error)]
pub enum WsError {
  /// Transport-level error, passed through unchanged.
  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  /// The server responded but not with a valid `101` Upgrade response.
  #[error("unexpected HTTP response during handshake")]
  WrongResponse,

  /// `Connection: Upgrade` was missing or had the wrong value.
  #[error("missing or invalid Connection: Upgrade header")]
  InvalidConnectionHeader,

  /// `Sec-WebSocket-Accept` did not match the computed challenge response.
  #[error("Sec-WebSocket-Accept did not match the computed challenge")]
  FailedChallenge,

  /// The peer closed the connection before the handshake completed.
  #[error("connection closed before the handshake completed")]
  ConnectionClosed,

  /// A frame declared a payload length past the configured maximum.
  #[error("frame length {length} exceeds configured maximum {max}")]
  FrameTooLarge { length: u64, max: u64 },

  /// The caller-provided scratch buffer is smaller than the 16-byte floor.
  #[error("scratch buffer must be at least 16 bytes, got {0}")]
  ScratchTooSmall(usize),
}
