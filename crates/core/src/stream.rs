//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Streaming encrypt/decrypt operations over `std::io` readers and writers.
//!
//! Two layers, two wire formats:
//!
//! ```text
//! outer (client-produced, verified at ingest):  salt(16) || nonce(12) || ciphertext || tag(16)
//! inner (server-produced, stored at rest):      nonce(12) || ciphertext || tag(16)
//! ```
//!
//! All operations run in bounded memory — a few chunk buffers — and never
//! emit a tag anywhere but stream end. Decryption writes plaintext to the
//! sink as it streams; the sink must be treated as garbage unless the call
//! returns `Ok` (the trailing tag is withheld and checked at finalization,
//! so the final `TAG_LEN` bytes of input are never mistaken for ciphertext).

use rand_core::{OsRng, RngCore};
use std::io::{ErrorKind, Read, Write};

use crate::gcm::GcmStream;
use crate::kdf::derive_key;
use crate::secret::DataKey;
use crate::{CoreError, CHUNK_SIZE, KEY_LEN, NONCE_LEN, SALT_LEN, TAG_LEN};

/// Result of verifying and decrypting the client (outer) layer.
#[derive(Debug)]
pub struct OuterSummary {
    /// Plaintext bytes written to the sink.
    pub bytes_written: u64,
    /// True only when GCM finalization succeeded. Always true on `Ok` —
    /// callers that skip verification record the distinction downstream.
    pub verified: bool,
}

/// Result of encrypting the inner (stored) layer.
pub struct InnerSummary {
    /// The freshly generated per-object data key. The caller must wrap it
    /// and let it drop (zeroize) immediately after.
    pub data_key: DataKey,
    /// Total bytes written to the sink: nonce + ciphertext + tag.
    pub ciphertext_length: u64,
}

/// Encrypt the outer (client) layer: `salt || nonce || ciphertext || tag`.
///
/// This is the producer side of the contracted client format — used by
/// tooling and tests; the ingest service only ever consumes it.
/// Returns the total bytes written to the sink.
pub fn encrypt_outer_stream<R: Read, W: Write>(
    src: &mut R,
    sink: &mut W,
    passphrase: &str,
) -> Result<u64, CoreError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt);

    sink.write_all(&salt)?;
    sink.write_all(&nonce)?;
    let body = encrypt_body(src, sink, key.as_bytes(), &nonce)?;

    Ok((SALT_LEN + NONCE_LEN + TAG_LEN) as u64 + body)
}

/// Verify and decrypt the outer (client) layer.
///
/// Reads `salt(16) || nonce(12)`, derives the passphrase key, and streams
/// plaintext into the sink. Fails with [`CoreError::AuthFailure`] when the
/// trailing tag does not verify — a wrong passphrase and tampered bytes are
/// indistinguishable by design.
pub fn decrypt_outer_stream<R: Read, W: Write>(
    src: &mut R,
    sink: &mut W,
    passphrase: &str,
) -> Result<OuterSummary, CoreError> {
    let mut salt = [0u8; SALT_LEN];
    read_exact_or_format(src, &mut salt, "salt")?;
    let mut nonce = [0u8; NONCE_LEN];
    read_exact_or_format(src, &mut nonce, "nonce")?;

    let key = derive_key(passphrase, &salt);
    let bytes_written = decrypt_body(src, sink, key.as_bytes(), &nonce)?;

    Ok(OuterSummary {
        bytes_written,
        verified: true,
    })
}

/// Encrypt the inner (stored) layer under a fresh data key:
/// `nonce || ciphertext || tag`.
pub fn encrypt_inner_stream<R: Read, W: Write>(
    src: &mut R,
    sink: &mut W,
) -> Result<InnerSummary, CoreError> {
    let data_key = DataKey::generate();
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    sink.write_all(&nonce)?;
    let body = encrypt_body(src, sink, data_key.as_bytes(), &nonce)?;

    Ok(InnerSummary {
        data_key,
        ciphertext_length: (NONCE_LEN + TAG_LEN) as u64 + body,
    })
}

/// Decrypt the inner (stored) layer. Returns plaintext bytes written.
pub fn decrypt_inner_stream<R: Read, W: Write>(
    src: &mut R,
    sink: &mut W,
    data_key: &DataKey,
) -> Result<u64, CoreError> {
    let mut nonce = [0u8; NONCE_LEN];
    read_exact_or_format(src, &mut nonce, "nonce")?;
    decrypt_body(src, sink, data_key.as_bytes(), &nonce)
}

// ---------------------------------------------------------------------------
// Shared body plumbing
// ---------------------------------------------------------------------------

fn encrypt_body<R: Read, W: Write>(
    src: &mut R,
    sink: &mut W,
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<u64, CoreError> {
    let mut gcm = GcmStream::new(key, nonce);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = read_full(src, &mut buf)?;
        if n == 0 {
            break;
        }
        gcm.encrypt_chunk(&mut buf[..n]);
        sink.write_all(&buf[..n])?;
        total += n as u64;
        if n < CHUNK_SIZE {
            break;
        }
    }

    let tag = gcm.finalize();
    sink.write_all(&tag)?;
    sink.flush()?;
    Ok(total)
}

fn decrypt_body<R: Read, W: Write>(
    src: &mut R,
    sink: &mut W,
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<u64, CoreError> {
    let mut gcm = GcmStream::new(key, nonce);
    // Holds the yet-unprocessed suffix of the stream; the final TAG_LEN bytes
    // are the candidate tag and are never decrypted.
    let mut carry: Vec<u8> = Vec::with_capacity(TAG_LEN + CHUNK_SIZE);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    loop {
        let n = read_full(src, &mut chunk)?;
        if n == 0 {
            break;
        }
        carry.extend_from_slice(&chunk[..n]);

        if carry.len() > TAG_LEN {
            let body = carry.len() - TAG_LEN;
            gcm.decrypt_chunk(&mut carry[..body]);
            sink.write_all(&carry[..body])?;
            written += body as u64;
            carry.copy_within(body.., 0);
            carry.truncate(TAG_LEN);
        }
    }

    if carry.len() < TAG_LEN {
        return Err(CoreError::format(
            "ciphertext shorter than authentication tag",
        ));
    }

    if !gcm.verify_tag(&carry) {
        return Err(CoreError::AuthFailure);
    }

    sink.flush()?;
    Ok(written)
}

/// Read until `buf` is full or the source reaches EOF. Keeps every chunk
/// except the last one at full length, so short reads from pipes or sockets
/// cannot perturb chunk boundaries.
fn read_full<R: Read>(src: &mut R, buf: &mut [u8]) -> Result<usize, CoreError> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(CoreError::Io(e)),
        }
    }
    Ok(filled)
}

fn read_exact_or_format<R: Read>(
    src: &mut R,
    buf: &mut [u8],
    what: &str,
) -> Result<(), CoreError> {
    let n = read_full(src, buf)?;
    if n != buf.len() {
        return Err(CoreError::format(format!("truncated stream: missing {what}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm::aead::{Aead, KeyInit};
    use aes_gcm::{Aes256Gcm, Key, Nonce};
    use std::io::Cursor;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 239) as u8).collect()
    }

    /// Outer round-trip across chunk-boundary sizes, including empty input.
    #[test]
    fn test_outer_round_trip() {
        for len in [0usize, 1, 15, 16, 8191, 8192, 8193, 100_000] {
            let plaintext = patterned(len);
            let mut sealed = Vec::new();
            let total =
                encrypt_outer_stream(&mut Cursor::new(&plaintext), &mut sealed, "hunter2").unwrap();

            assert_eq!(sealed.len() as u64, total);
            assert_eq!(sealed.len(), SALT_LEN + NONCE_LEN + len + TAG_LEN);

            let mut recovered = Vec::new();
            let summary =
                decrypt_outer_stream(&mut Cursor::new(&sealed), &mut recovered, "hunter2").unwrap();

            assert_eq!(recovered, plaintext, "len {len}");
            assert_eq!(summary.bytes_written, len as u64);
            assert!(summary.verified);
        }
    }

    #[test]
    fn test_outer_rejects_wrong_passphrase() {
        let plaintext = patterned(4096);
        let mut sealed = Vec::new();
        encrypt_outer_stream(&mut Cursor::new(&plaintext), &mut sealed, "hunter2").unwrap();

        let mut sink = Vec::new();
        let err = decrypt_outer_stream(&mut Cursor::new(&sealed), &mut sink, "wrong").unwrap_err();
        assert!(matches!(err, CoreError::AuthFailure));
    }

    /// Flipping any single bit in salt, nonce, ciphertext, or tag breaks
    /// authentication.
    #[test]
    fn test_outer_rejects_any_bit_flip() {
        let plaintext = patterned(1000);
        let mut sealed = Vec::new();
        encrypt_outer_stream(&mut Cursor::new(&plaintext), &mut sealed, "hunter2").unwrap();

        // One position inside each region of the layout.
        let positions = [
            0,                            // salt
            SALT_LEN,                     // nonce
            SALT_LEN + NONCE_LEN + 11,    // ciphertext body
            sealed.len() - 1,             // tag
        ];
        for pos in positions {
            let mut tampered = sealed.clone();
            tampered[pos] ^= 0x01;
            let mut sink = Vec::new();
            let err = decrypt_outer_stream(&mut Cursor::new(&tampered), &mut sink, "hunter2")
                .unwrap_err();
            assert!(
                matches!(err, CoreError::AuthFailure),
                "flip at byte {pos} should fail authentication"
            );
        }
    }

    #[test]
    fn test_inner_round_trip() {
        for len in [0usize, 1, 16, 8192, 65_536] {
            let plaintext = patterned(len);
            let mut sealed = Vec::new();
            let summary =
                encrypt_inner_stream(&mut Cursor::new(&plaintext), &mut sealed).unwrap();

            assert_eq!(summary.ciphertext_length, sealed.len() as u64);
            assert_eq!(sealed.len(), NONCE_LEN + len + TAG_LEN);

            let mut recovered = Vec::new();
            let written = decrypt_inner_stream(
                &mut Cursor::new(&sealed),
                &mut recovered,
                &summary.data_key,
            )
            .unwrap();

            assert_eq!(recovered, plaintext, "len {len}");
            assert_eq!(written, len as u64);
        }
    }

    /// The stored stream is exactly what the reference one-shot cipher
    /// produces for the same key and nonce — the streaming chunk size leaves
    /// no trace in the bytes.
    #[test]
    fn test_inner_matches_reference_cipher() {
        let plaintext = patterned(30_000);
        let mut sealed = Vec::new();
        let summary = encrypt_inner_stream(&mut Cursor::new(&plaintext), &mut sealed).unwrap();

        let (nonce, body_and_tag) = sealed.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(summary.data_key.as_bytes()));
        let reference = cipher
            .encrypt(Nonce::from_slice(nonce), plaintext.as_slice())
            .unwrap();

        assert_eq!(body_and_tag, reference.as_slice());
    }

    #[test]
    fn test_inner_rejects_truncated_tag() {
        let plaintext = patterned(5000);
        let mut sealed = Vec::new();
        let summary = encrypt_inner_stream(&mut Cursor::new(&plaintext), &mut sealed).unwrap();

        sealed.truncate(sealed.len() - TAG_LEN);

        let mut sink = Vec::new();
        let err = decrypt_inner_stream(&mut Cursor::new(&sealed), &mut sink, &summary.data_key)
            .unwrap_err();
        // Removing the tag leaves the last 16 ciphertext bytes posing as one;
        // authentication must fail.
        assert!(matches!(err, CoreError::AuthFailure));
    }

    #[test]
    fn test_inner_rejects_stream_shorter_than_tag() {
        let sealed = [0u8; NONCE_LEN + 7];
        let mut sink = Vec::new();
        let err = decrypt_inner_stream(
            &mut Cursor::new(&sealed[..]),
            &mut sink,
            &DataKey::from_bytes([0u8; KEY_LEN]),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Format(_)));
    }

    #[test]
    fn test_outer_rejects_missing_header() {
        let mut sink = Vec::new();
        let err =
            decrypt_outer_stream(&mut Cursor::new(&[0u8; 10][..]), &mut sink, "pp").unwrap_err();
        assert!(matches!(err, CoreError::Format(_)));
    }

    #[test]
    fn test_data_keys_and_nonces_are_fresh_per_stream() {
        let plaintext = patterned(64);
        let mut a = Vec::new();
        let mut b = Vec::new();
        let sa = encrypt_inner_stream(&mut Cursor::new(&plaintext), &mut a).unwrap();
        let sb = encrypt_inner_stream(&mut Cursor::new(&plaintext), &mut b).unwrap();

        assert_ne!(sa.data_key.as_bytes(), sb.data_key.as_bytes());
        assert_ne!(&a[..NONCE_LEN], &b[..NONCE_LEN]);
        // Fresh key + fresh nonce: identical plaintext yields unrelated bytes.
        assert_ne!(a, b);
    }
}
