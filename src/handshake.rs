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

//! Client-side HTTP/1.1 Upgrade handshake (RFC 6455 §4.1/§4.2.2).

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use sha1::{Digest, Sha1};

use crate::error::{Result, WsError};

/// The fixed GUID concatenated onto the client's key before SHA-1, per
/// RFC 6455 §1.3.
const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Generates a fresh `Sec-WebSocket-Key`: 8 random bytes, standard-alphabet
/// base64 with no wrapping, always 12 characters long.
pub(crate) fn generate_key<Rng: RngCore>(rng: &mut Rng) -> String {
  let mut raw = [0u8; 8];
  rng.fill_bytes(&mut raw);
  BASE64.encode(raw)
}

/// Computes the `Sec-WebSocket-Accept` value the server must echo back.
pub(crate) fn accept_value(encoded_key: &str) -> String {
  let mut digest = Sha1::new();
  digest.update(encoded_key.as_bytes());
  digest.update(GUID.as_bytes());
  BASE64.encode(digest.finalize())
}

fn eq_ignore_ascii_case(a: &str, b: &str) -> bool {
  a.eq_ignore_ascii_case(b)
}

/// Performs the client Upgrade handshake described in spec.md §4.1:
/// writes the request head, then drives the response line-by-line until
/// the blank line that ends the header block, checking `Connection` and
/// `Sec-WebSocket-Accept` as they arrive.
pub(crate) fn handshake<R: Read, W: Write, Rng: RngCore>(
  reader: &mut R,
  mut writer: W,
  rng: &mut Rng,
  path: &str,
  headers: &[(&str, &str)],
) -> Result<()> {
  let encoded_key = generate_key(rng);

  write!(writer, "GET {path} HTTP/1.1\r\n")?;
  for (name, value) in headers {
    write!(writer, "{name}: {value}\r\n")?;
  }
  write!(writer, "Connection: Upgrade\r\n")?;
  write!(writer, "Upgrade: websocket\r\n")?;
  write!(writer, "Sec-WebSocket-Version: 13\r\n")?;
  write!(writer, "Sec-WebSocket-Key: {encoded_key}\r\n")?;
  write!(writer, "\r\n")?;
  writer.flush()?;

  let expected_accept = accept_value(&encoded_key);

  let mut line = Vec::new();

  if read_line(reader, &mut line)? == 0 {
    return Err(WsError::ConnectionClosed);
  }
  let status_line = std::str::from_utf8(&line).map_err(|_| WsError::WrongResponse)?;
  let status_code = parse_status_code(status_line.trim_end()).ok_or(WsError::WrongResponse)?;
  if status_code != 101 {
    return Err(WsError::WrongResponse);
  }

  let mut upgrade_seen = false;
  let mut accept_seen = false;

  loop {
    if read_line(reader, &mut line)? == 0 {
      return Err(WsError::ConnectionClosed);
    }
    let trimmed_bytes = trim_crlf(&line);
    if trimmed_bytes.is_empty() {
      break;
    }
    let trimmed = std::str::from_utf8(trimmed_bytes).map_err(|_| WsError::WrongResponse)?;

    let Some((name, value)) = trimmed.split_once(':') else {
      return Err(WsError::WrongResponse);
    };
    let name = name.trim();
    let value = value.trim();

    if eq_ignore_ascii_case(name, "connection") {
      if !eq_ignore_ascii_case(value, "upgrade") {
        return Err(WsError::InvalidConnectionHeader);
      }
      upgrade_seen = true;
    } else if eq_ignore_ascii_case(name, "sec-websocket-accept") {
      if value != expected_accept {
        return Err(WsError::FailedChallenge);
      }
      accept_seen = true;
    }
    // All other headers (Upgrade, Sec-WebSocket-Protocol, ...) are ignored,
    // matching spec.md §4.1 step 3.
  }

  if !upgrade_seen {
    return Err(WsError::InvalidConnectionHeader);
  }
  if !accept_seen {
    return Err(WsError::FailedChallenge);
  }

  Ok(())
}

/// Reads a single `\n`-terminated line, one byte at a time.
///
/// Unlike wrapping `reader` in a `BufReader`, this never reads past the
/// line it was asked for: a server that pipelines the first WebSocket
/// frame directly after the handshake response (no round-trip delay)
/// must not have those bytes silently consumed and discarded here, since
/// the same reader is handed to [`crate::FrameReader`] immediately after
/// the handshake completes.
fn read_line<R: Read>(reader: &mut R, line: &mut Vec<u8>) -> Result<usize> {
  line.clear();
  let mut byte = [0u8; 1];
  let mut total = 0;
  loop {
    let n = reader.read(&mut byte)?;
    if n == 0 {
      return Ok(total);
    }
    total += 1;
    line.push(byte[0]);
    if byte[0] == b'\n' {
      return Ok(total);
    }
  }
}

fn trim_crlf(line: &[u8]) -> &[u8] {
  let mut end = line.len();
  while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
    end -= 1;
  }
  &line[..end]
}

fn parse_status_code(status_line: &str) -> Option<u16> {
  // "HTTP/1.1 101 Switching Protocols"
  let mut parts = status_line.splitn(3, ' ');
  let _http_version = parts.next()?;
  parts.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::mock::StepRng;
  use std::io::Cursor;

  struct FixedKeyRng(u64);

  impl RngCore for FixedKeyRng {
    fn next_u32(&mut self) -> u32 {
      self.0 as u32
    }
    fn next_u64(&mut self) -> u64 {
      self.0
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
      for (i, b) in dest.iter_mut().enumerate() {
        *b = i as u8;
      }
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
      self.fill_bytes(dest);
      Ok(())
    }
  }

  #[test]
  fn s5_handshake_success_with_stubbed_key() {
    let mut rng = FixedKeyRng(0);
    let key = generate_key(&mut rng);
    assert_eq!(key, "AAECAwQFBgc=");

    let accept = accept_value(&key);
    let response = format!(
      "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
    );

    let mut rng = FixedKeyRng(0);
    let mut out = Vec::new();
    let result = handshake(&mut Cursor::new(response.as_bytes()), &mut out, &mut rng, "/", &[]);
    assert!(result.is_ok());
  }

  #[test]
  fn s6_handshake_fails_on_bad_accept() {
    let mut rng = FixedKeyRng(0);
    let key = generate_key(&mut rng);
    let mut accept = accept_value(&key);
    // Corrupt one character.
    let last = accept.pop().unwrap();
    accept.push(if last == 'A' { 'B' } else { 'A' });

    let response = format!(
      "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
    );

    let mut rng = FixedKeyRng(0);
    let mut out = Vec::new();
    let err = handshake(&mut Cursor::new(response.as_bytes()), &mut out, &mut rng, "/", &[]).unwrap_err();
    assert!(matches!(err, WsError::FailedChallenge));
  }

  #[test]
  fn wrong_status_code_is_rejected() {
    let response = "HTTP/1.1 404 Not Found\r\n\r\n";
    let mut rng = StepRng::new(0, 1);
    let mut out = Vec::new();
    let err = handshake(&mut Cursor::new(response.as_bytes()), &mut out, &mut rng, "/", &[]).unwrap_err();
    assert!(matches!(err, WsError::WrongResponse));
  }

  #[test]
  fn missing_connection_upgrade_is_rejected() {
    let mut rng = FixedKeyRng(0);
    let key = generate_key(&mut rng);
    let accept = accept_value(&key);
    let response =
      format!("HTTP/1.1 101 Switching Protocols\r\nSec-WebSocket-Accept: {accept}\r\n\r\n");

    let mut rng = FixedKeyRng(0);
    let mut out = Vec::new();
    let err = handshake(&mut Cursor::new(response.as_bytes()), &mut out, &mut rng, "/", &[]).unwrap_err();
    assert!(matches!(err, WsError::InvalidConnectionHeader));
  }

  #[test]
  fn header_name_case_is_ignored() {
    let mut rng = FixedKeyRng(0);
    let key = generate_key(&mut rng);
    let accept = accept_value(&key);
    let response = format!(
      "HTTP/1.1 101 Switching Protocols\r\nCONNECTION: UPGRADE\r\nSEC-WEBSOCKET-ACCEPT: {accept}\r\n\r\n"
    );

    let mut rng = FixedKeyRng(0);
    let mut out = Vec::new();
    let result = handshake(&mut Cursor::new(response.as_bytes()), &mut out, &mut rng, "/", &[]);
    assert!(result.is_ok());
  }

  #[test]
  fn caller_headers_are_written_verbatim_and_in_order() {
    let mut rng = FixedKeyRng(0);
    let key = generate_key(&mut rng);
    let accept = accept_value(&key);
    let response = format!(
      "HTTP/1.1 101 Switching Protocols\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {accept}\r\n\r\n"
    );

    let mut rng = FixedKeyRng(0);
    let mut out = Vec::new();
    handshake(
      &mut Cursor::new(response.as_bytes()),
      &mut out,
      &mut rng,
      "/chat",
      &[("Host", "example.com"), ("Origin", "http://example.com")],
    )
    .unwrap();

    let sent = String::from_utf8(out).unwrap();
    let host_pos = sent.find("Host: example.com").unwrap();
    let origin_pos = sent.find("Origin: http://example.com").unwrap();
    let connection_pos = sent.find("Connection: Upgrade").unwrap();
    assert!(sent.starts_with("GET /chat HTTP/1.1\r\n"));
    assert!(host_pos < origin_pos);
    assert!(origin_pos < connection_pos);
  }

  #[test]
  fn connection_closed_before_status_line() {
    let mut rng = StepRng::new(0, 1);
    let mut out = Vec::new();
    let err = handshake(&mut Cursor::new(&b""[..]), &mut out, &mut rng, "/", &[]).unwrap_err();
    assert!(matches!(err, WsError::ConnectionClosed));
  }
}
