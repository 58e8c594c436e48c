//! Block ciphers used outside the core field/poly math (spec §4.8):
//! plain AES-128 in ECB mode (single block, no padding), SEA-128 (AES
//! with a fixed XOR applied to the ciphertext block), and FDE, a
//! tweakable XEX-like mode built from SEA-128.

use openssl::symm::{Cipher, Crypter, Mode};

use crate::block::{Block, Semantic, BLOCK_SIZE};
use crate::error::{KaumaError, Result};
use crate::field::FieldElement;

/// SEA-128's fixed constant, XORed into every AES-ECB output block.
const SEA_CONSTANT: [u8; BLOCK_SIZE] = [
    0xc0, 0xff, 0xee, 0xc0, 0xff, 0xee, 0xc0, 0xff, 0xee, 0xc0, 0xff, 0xee, 0xc0, 0xff, 0xee, 0x11,
];

fn xor_block(a: &[u8; BLOCK_SIZE], b: &[u8; BLOCK_SIZE]) -> [u8; BLOCK_SIZE] {
    let mut out = [0u8; BLOCK_SIZE];
    for i in 0..BLOCK_SIZE {
        out[i] = a[i] ^ b[i];
    }
    out
}

/// Single-block AES-128 encrypt, ECB, no padding.
pub fn aes_encrypt_block(key: &[u8; 16], plaintext: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
    let cipher = Cipher::aes_128_ecb();
    let mut crypter = Crypter::new(cipher, Mode::Encrypt, key, None)
        .map_err(|e| KaumaError::BadArgument(e.to_string()))?;
    crypter.pad(false);

    let mut out = vec![0u8; BLOCK_SIZE + cipher.block_size()];
    let mut count = crypter
        .update(plaintext, &mut out)
        .map_err(|e| KaumaError::BadArgument(e.to_string()))?;
    count += crypter
        .finalize(&mut out[count..])
        .map_err(|e| KaumaError::BadArgument(e.to_string()))?;
    out.truncate(count);

    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(&out[..BLOCK_SIZE]);
    Ok(block)
}

/// Single-block AES-128 decrypt, ECB, no padding.
pub fn aes_decrypt_block(key: &[u8; 16], ciphertext: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
    let cipher = Cipher::aes_128_ecb();
    let mut crypter = Crypter::new(cipher, Mode::Decrypt, key, None)
        .map_err(|e| KaumaError::BadArgument(e.to_string()))?;
    crypter.pad(false);

    let mut out = vec![0u8; BLOCK_SIZE + cipher.block_size()];
    let mut count = crypter
        .update(ciphertext, &mut out)
        .map_err(|e| KaumaError::BadArgument(e.to_string()))?;
    count += crypter
        .finalize(&mut out[count..])
        .map_err(|e| KaumaError::BadArgument(e.to_string()))?;
    out.truncate(count);

    let mut block = [0u8; BLOCK_SIZE];
    block.copy_from_slice(&out[..BLOCK_SIZE]);
    Ok(block)
}

pub fn sea_encrypt(key: &[u8; 16], plaintext: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
    let aes = aes_encrypt_block(key, plaintext)?;
    Ok(xor_block(&SEA_CONSTANT, &aes))
}

pub fn sea_decrypt(key: &[u8; 16], ciphertext: &[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
    let unmasked = xor_block(&SEA_CONSTANT, ciphertext);
    aes_decrypt_block(key, &unmasked)
}

fn split_key(key: &[u8]) -> Result<(&[u8; 16], &[u8; 16])> {
    if key.len() != 32 {
        return Err(KaumaError::BadArgument(format!(
            "fde key must be 32 bytes, got {}",
            key.len()
        )));
    }
    let (a, b) = key.split_at(16);
    Ok((a.try_into().unwrap(), b.try_into().unwrap()))
}

/// FDE, a XEX-like tweakable mode: the tweak is SEA-128-encrypted once
/// under the second half-key, then advanced by multiplication by X in
/// the XEX field view for every subsequent block (spec §4.8).
pub fn fde_apply(key: &[u8], tweak: &[u8; BLOCK_SIZE], text: &[u8], encrypt: bool) -> Result<Vec<u8>> {
    let (key1, key2) = split_key(key)?;
    let mut xor = sea_encrypt(key2, tweak)?;
    let alpha = FieldElement::new(1u128 << 1);

    let mut result = Vec::with_capacity(text.len());
    for chunk in text.chunks(BLOCK_SIZE) {
        let mut text_block = [0u8; BLOCK_SIZE];
        text_block[..chunk.len()].copy_from_slice(chunk);

        let xored_in = xor_block(&text_block, &xor);
        let ciphered = if encrypt {
            sea_encrypt(key1, &xored_in)?
        } else {
            sea_decrypt(key1, &xored_in)?
        };
        let xored_out = xor_block(&ciphered, &xor);
        result.extend_from_slice(&xored_out[..chunk.len()]);

        let xor_elem = FieldElement::from_block(&Block::from_bytes(&xor), Semantic::Xex);
        xor = alpha.mul(&xor_elem).to_block(Semantic::Xex).bytes().to_owned();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_key() -> [u8; 16] {
        [0u8; 16]
    }

    #[test]
    fn aes_ecb_round_trips() {
        let key = zero_key();
        let plaintext = [0x42u8; BLOCK_SIZE];
        let ciphertext = aes_encrypt_block(&key, &plaintext).unwrap();
        assert_eq!(aes_decrypt_block(&key, &ciphertext).unwrap(), plaintext);
    }

    /// NIST FIPS-197 Appendix B known-answer vector.
    #[test]
    fn aes_ecb_matches_nist_test_vector() {
        let key: [u8; 16] = hex::decode("000102030405060708090a0b0c0d0e0f")
            .unwrap()
            .try_into()
            .unwrap();
        let plaintext: [u8; 16] = hex::decode("00112233445566778899aabbccddeeff")
            .unwrap()
            .try_into()
            .unwrap();
        let ciphertext = aes_encrypt_block(&key, &plaintext).unwrap();
        assert_eq!(hex::encode(ciphertext), "69c4e0d86a7b0430d8cdb78070b4c55a");
    }

    #[test]
    fn sea128_round_trips() {
        let key = zero_key();
        let plaintext = [0x13u8; BLOCK_SIZE];
        let ciphertext = sea_encrypt(&key, &plaintext).unwrap();
        assert_eq!(sea_decrypt(&key, &ciphertext).unwrap(), plaintext);
        assert_ne!(ciphertext, aes_encrypt_block(&key, &plaintext).unwrap());
    }

    #[test]
    fn fde_round_trips_multi_block() {
        let key = [7u8; 32];
        let tweak = [1u8; BLOCK_SIZE];
        let plaintext = [9u8; BLOCK_SIZE * 3];

        let ciphertext = fde_apply(&key, &tweak, &plaintext, true).unwrap();
        let decrypted = fde_apply(&key, &tweak, &ciphertext, false).unwrap();
        assert_eq!(decrypted, plaintext.to_vec());
    }

    #[test]
    fn fde_rejects_wrong_key_length() {
        let key = [0u8; 16];
        let tweak = [0u8; BLOCK_SIZE];
        assert!(fde_apply(&key, &tweak, &[0u8; 16], true).is_err());
    }

    // S4 from spec §8.
    #[test]
    fn sea128_scenario() {
        let key = Block::from_base64("istDASeincoolerKEYrofg==").unwrap();
        let pt = Block::from_base64("yv66vvrO263eyviIiDNEVQ==").unwrap();
        let ct = sea_encrypt(key.bytes(), pt.bytes()).unwrap();
        assert_eq!(Block(ct).to_base64(), "D5FDo3iVBoBN9gVi9/MSKQ==");
    }
}
