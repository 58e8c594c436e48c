//! GCM authenticated encryption built from an arbitrary block cipher
//! (spec §4.5): GHASH, authentication key and mask derivation, CTR
//! keystream generation starting at counter 2, length block, and the
//! encrypt/decrypt entry points.

use byteorder::{BigEndian, ByteOrder};

use crate::block::{Block, Semantic, BLOCK_SIZE};
use crate::error::Result;
use crate::field::FieldElement;

/// Block-cipher single-block encrypt, abstracted so GCM can run over
/// AES or SEA-128 identically.
pub type BlockCipher<'a> = dyn Fn(&[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> + 'a;

pub fn auth_key(cipher: &BlockCipher) -> Result<FieldElement> {
    let e = cipher(&[0u8; BLOCK_SIZE])?;
    Ok(FieldElement::from_block(&Block(e), Semantic::Gcm))
}

/// J0 = E_K(nonce[-12:] || u32be(1)), the mask applied to GHASH to
/// produce the tag.
pub fn mask(cipher: &BlockCipher, nonce: &[u8]) -> Result<[u8; BLOCK_SIZE]> {
    cipher(&y_block(nonce, 1))
}

fn y_block(nonce: &[u8], counter: u32) -> [u8; BLOCK_SIZE] {
    let mut y = [0u8; BLOCK_SIZE];
    let n = &nonce[nonce.len().saturating_sub(12)..];
    y[..n.len()].copy_from_slice(n);
    BigEndian::write_u32(&mut y[12..], counter);
    y
}

/// CTR keystream, counter starting at 2 (counter 1 is reserved for the
/// mask).
pub fn apply_key_stream(cipher: &BlockCipher, nonce: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(data.len());
    let mut counter = 2u32;
    for chunk in data.chunks(BLOCK_SIZE) {
        let y = y_block(nonce, counter);
        let keystream = cipher(&y)?;
        for (d, k) in chunk.iter().zip(keystream.iter()) {
            result.push(d ^ k);
        }
        counter += 1;
    }
    Ok(result)
}

pub fn length_block(ad: &[u8], ciphertext: &[u8]) -> [u8; BLOCK_SIZE] {
    let mut l = [0u8; BLOCK_SIZE];
    BigEndian::write_u64(&mut l[0..8], ad.len() as u64 * 8);
    BigEndian::write_u64(&mut l[8..16], ciphertext.len() as u64 * 8);
    l
}

fn pad_to_block(data: &[u8]) -> Vec<u8> {
    let rem = data.len() % BLOCK_SIZE;
    if rem == 0 {
        return data.to_vec();
    }
    let mut padded = data.to_vec();
    padded.resize(data.len() + (BLOCK_SIZE - rem), 0);
    padded
}

fn process_blocks(mut x: FieldElement, data: &[u8], auth_key: FieldElement) -> FieldElement {
    for chunk in data.chunks(BLOCK_SIZE) {
        let block = FieldElement::from_block(&Block::from_bytes(chunk), Semantic::Gcm);
        x = x.add(&block).mul(&auth_key);
    }
    x
}

/// GHASH over associated data, ciphertext, and the length block, all
/// folded through the same Horner-style accumulator.
pub fn ghash(auth_key: FieldElement, ad: &[u8], ciphertext: &[u8], l: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let mut x = FieldElement::ZERO;
    x = process_blocks(x, &pad_to_block(ad), auth_key);
    x = process_blocks(x, &pad_to_block(ciphertext), auth_key);
    let l_elem = FieldElement::from_block(&Block::from_bytes(l), Semantic::Gcm);
    x = x.add(&l_elem).mul(&auth_key);
    x.to_block(Semantic::Gcm).bytes().to_owned()
}

fn xor_blocks(a: &[u8; BLOCK_SIZE], b: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let mut out = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        out[i] = a[i] ^ b[i];
    }
    out
}

pub struct EncryptResult {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; BLOCK_SIZE],
    pub l: [u8; BLOCK_SIZE],
    pub auth_key: FieldElement,
}

pub fn encrypt(cipher: &BlockCipher, nonce: &[u8], plaintext: &[u8], ad: &[u8]) -> Result<EncryptResult> {
    let ciphertext = apply_key_stream(cipher, nonce, plaintext)?;
    let key = auth_key(cipher)?;
    let l = length_block(ad, &ciphertext);
    let j0 = mask(cipher, nonce)?;
    let h = ghash(key, ad, &ciphertext, &l);
    let tag = xor_blocks(&j0, &h);

    Ok(EncryptResult {
        ciphertext,
        tag,
        l,
        auth_key: key,
    })
}

pub struct DecryptResult {
    pub plaintext: Vec<u8>,
    pub authentic: bool,
}

pub fn decrypt(
    cipher: &BlockCipher,
    nonce: &[u8],
    ciphertext: &[u8],
    ad: &[u8],
    provided_tag: &[u8; BLOCK_SIZE],
) -> Result<DecryptResult> {
    let plaintext = apply_key_stream(cipher, nonce, ciphertext)?;
    let key = auth_key(cipher)?;
    let l = length_block(ad, ciphertext);
    let j0 = mask(cipher, nonce)?;
    let h = ghash(key, ad, ciphertext, &l);
    let tag = xor_blocks(&j0, &h);

    Ok(DecryptResult {
        plaintext,
        authentic: &tag == provided_tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::aes_encrypt_block;

    fn aes_cipher(key: [u8; 16]) -> impl Fn(&[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
        move |block| aes_encrypt_block(&key, block)
    }

    #[test]
    fn encrypt_then_decrypt_round_trips_and_authenticates() {
        let key = [0x11u8; 16];
        let nonce = [0x22u8; 12];
        let plaintext = b"the quick brown fox jumps over".to_vec();
        let ad = b"header".to_vec();

        let cipher = aes_cipher(key);
        let enc = encrypt(&cipher, &nonce, &plaintext, &ad).unwrap();
        let dec = decrypt(&cipher, &nonce, &enc.ciphertext, &ad, &enc.tag).unwrap();

        assert!(dec.authentic);
        assert_eq!(dec.plaintext, plaintext);
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let key = [0x33u8; 16];
        let nonce = [0x44u8; 12];
        let plaintext = b"0123456789abcdef".to_vec();
        let ad = b"".to_vec();

        let cipher = aes_cipher(key);
        let enc = encrypt(&cipher, &nonce, &plaintext, &ad).unwrap();
        let mut tampered = enc.ciphertext.clone();
        tampered[0] ^= 1;

        let dec = decrypt(&cipher, &nonce, &tampered, &ad, &enc.tag).unwrap();
        assert!(!dec.authentic);
    }

    #[test]
    fn length_block_encodes_bit_lengths_big_endian() {
        let l = length_block(&[0u8; 5], &[0u8; 32]);
        assert_eq!(BigEndian::read_u64(&l[0..8]), 40);
        assert_eq!(BigEndian::read_u64(&l[8..16]), 256);
    }
}
