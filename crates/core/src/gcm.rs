//
// Copyright (c) 2025 SOUNDVAULT LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: soundvault — Secure audio ingest with envelope encryption.
//

//! Incremental AES-256-GCM.
//!
//! The one-shot `aes-gcm` crate would force whole-object buffering, and its
//! `aead::stream` module produces per-chunk tags — a different wire format.
//! This module composes the primitives `aes-gcm` is itself built from (`aes`,
//! 32-bit big-endian `ctr`, `ghash`) into an incremental cipher whose output
//! is byte-identical to one-shot `Aes256Gcm` with empty AAD: a single tag at
//! stream end, independent of chunking. Equality with the one-shot crate is
//! asserted in the stream tests.
//!
//! Internal module: the public streaming API lives in [`crate::stream`].

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit, KeyIvInit, StreamCipher};
use aes::Aes256;
use ghash::universal_hash::UniversalHash;
use ghash::GHash;
use subtle::ConstantTimeEq;

use crate::{KEY_LEN, NONCE_LEN, TAG_LEN};

type Ctr32 = ctr::Ctr32BE<Aes256>;

const BLOCK_LEN: usize = 16;

/// Incremental GCM state for one message (one key, one nonce).
///
/// Counter block 1 is reserved for the tag mask; data encryption starts at
/// counter block 2, exactly as NIST SP 800-38D lays out for 96-bit nonces.
pub(crate) struct GcmStream {
    ctr: Ctr32,
    ghash: GHash,
    tag_mask: [u8; TAG_LEN],
    // Partial-block buffer for GHASH absorption; callers may feed arbitrary
    // chunk sizes.
    buf: [u8; BLOCK_LEN],
    buf_len: usize,
    ct_len: u64,
}

impl GcmStream {
    pub(crate) fn new(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN]) -> Self {
        let key = GenericArray::from_slice(key);

        // H = AES_K(0^128), the GHASH key.
        let aes = Aes256::new(key);
        let mut h = GenericArray::default();
        aes.encrypt_block(&mut h);
        let ghash = GHash::new(&h);

        // J0 = nonce || 0^31 || 1. The first keystream block E(K, J0) masks
        // the tag; the counter then sits at J0+1 for the data.
        let mut j0 = [0u8; BLOCK_LEN];
        j0[..NONCE_LEN].copy_from_slice(nonce);
        j0[BLOCK_LEN - 1] = 1;

        let mut ctr = Ctr32::new(key, GenericArray::from_slice(&j0));
        let mut tag_mask = [0u8; TAG_LEN];
        ctr.apply_keystream(&mut tag_mask);

        Self {
            ctr,
            ghash,
            tag_mask,
            buf: [0u8; BLOCK_LEN],
            buf_len: 0,
            ct_len: 0,
        }
    }

    /// Encrypt a chunk in place. Chunks may be any length.
    pub(crate) fn encrypt_chunk(&mut self, chunk: &mut [u8]) {
        self.ctr.apply_keystream(chunk);
        self.absorb(chunk);
    }

    /// Decrypt a chunk in place. The caller must withhold the trailing tag
    /// from the chunks and pass it to [`GcmStream::verify_tag`].
    pub(crate) fn decrypt_chunk(&mut self, chunk: &mut [u8]) {
        self.absorb(chunk);
        self.ctr.apply_keystream(chunk);
    }

    /// Finish the stream and produce the authentication tag.
    pub(crate) fn finalize(mut self) -> [u8; TAG_LEN] {
        if self.buf_len > 0 {
            self.buf[self.buf_len..].fill(0);
            let block = *GenericArray::from_slice(&self.buf);
            self.ghash.update(&[block]);
        }

        // len(AAD) || len(C), both in bits. AAD is always empty here.
        let mut len_block = [0u8; BLOCK_LEN];
        len_block[8..].copy_from_slice(&(self.ct_len * 8).to_be_bytes());
        self.ghash.update(&[*GenericArray::from_slice(&len_block)]);

        let s = self.ghash.finalize();
        let mut tag = [0u8; TAG_LEN];
        for (i, byte) in s.iter().enumerate() {
            tag[i] = byte ^ self.tag_mask[i];
        }
        tag
    }

    /// Finish the stream and compare against an expected tag in constant time.
    pub(crate) fn verify_tag(self, expected: &[u8]) -> bool {
        let tag = self.finalize();
        tag.ct_eq(expected).into()
    }

    /// Feed ciphertext bytes into GHASH, buffering partial blocks.
    fn absorb(&mut self, mut data: &[u8]) {
        self.ct_len += data.len() as u64;

        if self.buf_len > 0 {
            let take = (BLOCK_LEN - self.buf_len).min(data.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&data[..take]);
            self.buf_len += take;
            data = &data[take..];

            if self.buf_len < BLOCK_LEN {
                return;
            }
            let block = *GenericArray::from_slice(&self.buf);
            self.ghash.update(&[block]);
            self.buf_len = 0;
        }

        let full = data.len() - data.len() % BLOCK_LEN;
        for block in data[..full].chunks_exact(BLOCK_LEN) {
            self.ghash.update(&[*GenericArray::from_slice(block)]);
        }

        let rem = &data[full..];
        self.buf[..rem.len()].copy_from_slice(rem);
        self.buf_len = rem.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm::aead::{Aead, KeyInit as AeadKeyInit};
    use aes_gcm::{Aes256Gcm, Nonce};

    fn one_shot_encrypt(key: &[u8; 32], nonce: &[u8; 12], plaintext: &[u8]) -> Vec<u8> {
        let cipher = Aes256Gcm::new(GenericArray::from_slice(key));
        cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .expect("one-shot encryption cannot fail")
    }

    /// The incremental cipher matches one-shot `Aes256Gcm` byte for byte,
    /// regardless of how the input is chunked.
    #[test]
    fn test_matches_one_shot_for_any_chunking() {
        let key = [0x11u8; 32];
        let nonce = [0x22u8; 12];
        let plaintext: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let reference = one_shot_encrypt(&key, &nonce, &plaintext);

        for chunk_size in [1usize, 7, 15, 16, 17, 1024, 8192, 10_000] {
            let mut gcm = GcmStream::new(&key, &nonce);
            let mut produced = Vec::new();
            for chunk in plaintext.chunks(chunk_size) {
                let mut chunk = chunk.to_vec();
                gcm.encrypt_chunk(&mut chunk);
                produced.extend_from_slice(&chunk);
            }
            produced.extend_from_slice(&gcm.finalize());

            assert_eq!(
                produced, reference,
                "chunk size {chunk_size} changed the output bytes"
            );
        }
    }

    #[test]
    fn test_matches_one_shot_for_empty_message() {
        let key = [0x33u8; 32];
        let nonce = [0x44u8; 12];
        let reference = one_shot_encrypt(&key, &nonce, b"");

        let gcm = GcmStream::new(&key, &nonce);
        let tag = gcm.finalize();
        assert_eq!(tag.as_slice(), reference.as_slice());
    }

    #[test]
    fn test_decrypt_round_trip_and_verify() {
        let key = [0x55u8; 32];
        let nonce = [0x66u8; 12];
        let plaintext = b"the quick brown fox jumps over the lazy dog";
        let sealed = one_shot_encrypt(&key, &nonce, plaintext);
        let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut gcm = GcmStream::new(&key, &nonce);
        let mut recovered = body.to_vec();
        gcm.decrypt_chunk(&mut recovered);
        assert_eq!(recovered, plaintext);
        assert!(gcm.verify_tag(tag));
    }

    #[test]
    fn test_verify_rejects_wrong_tag() {
        let key = [0x77u8; 32];
        let nonce = [0x88u8; 12];
        let sealed = one_shot_encrypt(&key, &nonce, b"payload");
        let (body, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut flipped = tag.to_vec();
        flipped[0] ^= 0x01;

        let mut gcm = GcmStream::new(&key, &nonce);
        let mut buf = body.to_vec();
        gcm.decrypt_chunk(&mut buf);
        assert!(!gcm.verify_tag(&flipped));
    }
}
