//! Nonce-misuse GCM forgery (spec §4.6): given three messages
//! encrypted under the same key and nonce, recover the authentication
//! key H and the one-time mask E_K(Y_0), then forge a tag for an
//! attacker-chosen (ciphertext, associated_data) pair.

use rand::RngCore;

use crate::block::{Block, Semantic, BLOCK_SIZE};
use crate::error::{KaumaError, Result};
use crate::factor::find_roots;
use crate::field::FieldElement;
use crate::gcm::{ghash, length_block};
use crate::poly::FieldPoly;

pub struct GcmMessage {
    pub ciphertext: Vec<u8>,
    pub associated_data: Vec<u8>,
    pub tag: FieldElement,
}

pub struct GcmForgeryTarget {
    pub ciphertext: Vec<u8>,
    pub associated_data: Vec<u8>,
}

pub struct CrackResult {
    pub tag: FieldElement,
    pub h: FieldElement,
    pub mask: FieldElement,
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

fn blocks_gcm(data: &[u8]) -> Vec<FieldElement> {
    pad_to_block(data)
        .chunks(BLOCK_SIZE)
        .map(|c| FieldElement::from_block(&Block::from_bytes(c), Semantic::Gcm))
        .collect()
}

/// T(Y) = tag + L·Y + c_n·Y^2 + ... + c_1·Y^{n+1} + a_m·Y^{n+2} + ... +
/// a_1·Y^{n+m+1}, coefficients low-degree first: `[tag, L, rev(ciphertext
/// blocks), rev(ad blocks)]`. Evaluating this at Y = H is exactly the
/// GHASH accumulator with the mask carried over to the other side of
/// the equation, so it cancels between two messages sharing a nonce.
fn message_poly(message: &GcmMessage) -> FieldPoly {
    let l = length_block(&message.associated_data, &message.ciphertext);
    let l_elem = FieldElement::from_block(&Block::from_bytes(&l), Semantic::Gcm);

    let mut coefficients = vec![message.tag, l_elem];

    let mut ciphertext_blocks = blocks_gcm(&message.ciphertext);
    ciphertext_blocks.reverse();
    coefficients.extend(ciphertext_blocks);

    let mut ad_blocks = blocks_gcm(&message.associated_data);
    ad_blocks.reverse();
    coefficients.extend(ad_blocks);

    FieldPoly::new(coefficients)
}

fn find_correct_h(
    candidates: &[FieldElement],
    m1: &GcmMessage,
    m3: &GcmMessage,
) -> Option<(FieldElement, FieldElement)> {
    for &h in candidates {
        let m1_l = length_block(&m1.associated_data, &m1.ciphertext);
        let m1_ghash = FieldElement::from_block(
            &Block(ghash(h, &m1.associated_data, &m1.ciphertext, &m1_l)),
            Semantic::Gcm,
        );
        let ek0 = m1_ghash.add(&m1.tag);

        let m3_l = length_block(&m3.associated_data, &m3.ciphertext);
        let m3_ghash = FieldElement::from_block(
            &Block(ghash(h, &m3.associated_data, &m3.ciphertext, &m3_l)),
            Semantic::Gcm,
        );
        let tag = ek0.add(&m3_ghash);

        if tag == m3.tag {
            return Some((h, ek0));
        }
    }
    None
}

pub fn gcm_crack(
    m1: &GcmMessage,
    m2: &GcmMessage,
    m3: &GcmMessage,
    forgery: &GcmForgeryTarget,
    rng: &mut dyn RngCore,
) -> Result<CrackResult> {
    let t1 = message_poly(m1);
    let t2 = message_poly(m2);

    let mut f = t1.add(&t2);
    if f.is_zero() {
        return Err(KaumaError::CollidingMessages);
    }
    f.make_monic()?;

    let roots = find_roots(&f, rng)?;
    let (h, mask) = find_correct_h(&roots, m1, m3).ok_or(KaumaError::NoKeyCandidate)?;

    let forgery_l = length_block(&forgery.associated_data, &forgery.ciphertext);
    let forgery_ghash = FieldElement::from_block(
        &Block(ghash(h, &forgery.associated_data, &forgery.ciphertext, &forgery_l)),
        Semantic::Gcm,
    );
    let tag = forgery_ghash.add(&mask);

    Ok(CrackResult { tag, h, mask })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::aes_encrypt_block;
    use crate::gcm::{encrypt, BlockCipher};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn aes_cipher(key: [u8; 16]) -> impl Fn(&[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]> {
        move |block| aes_encrypt_block(&key, block)
    }

    fn to_message(nonce: &[u8], key: [u8; 16], plaintext: &[u8], ad: &[u8]) -> GcmMessage {
        let cipher: &BlockCipher = &aes_cipher(key);
        let enc = encrypt(cipher, nonce, plaintext, ad).unwrap();
        GcmMessage {
            ciphertext: enc.ciphertext,
            associated_data: ad.to_vec(),
            tag: FieldElement::from_block(&Block(enc.tag), Semantic::Gcm),
        }
    }

    #[test]
    fn recovers_h_and_mask_and_forges_valid_tag() {
        let key = [0x5cu8; 16];
        let nonce = [0x7au8; 12];

        let m1 = to_message(&nonce, key, b"hello world there", b"ad-one-x");
        let m2 = to_message(&nonce, key, b"goodbye cruel worl", b"ad-two-y");
        let m3 = to_message(&nonce, key, b"a third message he", b"ad-three");

        let forgery_ciphertext = b"forged block here!".to_vec();
        let forgery_ad = b"forged-ad".to_vec();
        let forgery = GcmForgeryTarget {
            ciphertext: forgery_ciphertext.clone(),
            associated_data: forgery_ad.clone(),
        };

        let mut rng = StdRng::seed_from_u64(1234);
        let result = gcm_crack(&m1, &m2, &m3, &forgery, &mut rng).unwrap();

        let cipher: &BlockCipher = &aes_cipher(key);
        let expected_h = crate::gcm::auth_key(cipher).unwrap();
        assert_eq!(result.h, expected_h);

        let l = length_block(&forgery_ad, &forgery_ciphertext);
        let expected_tag = FieldElement::from_block(
            &Block(ghash(result.h, &forgery_ad, &forgery_ciphertext, &l)),
            Semantic::Gcm,
        )
        .add(&result.mask);
        assert_eq!(result.tag, expected_tag);
    }

    #[test]
    fn identical_messages_are_rejected() {
        let key = [0x11u8; 16];
        let nonce = [0x22u8; 12];
        let m1 = to_message(&nonce, key, b"same plaintext!!", b"same-ad");
        let m2 = to_message(&nonce, key, b"same plaintext!!", b"same-ad");
        let forgery = GcmForgeryTarget {
            ciphertext: b"anything here!!!".to_vec(),
            associated_data: b"ad".to_vec(),
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            gcm_crack(&m1, &m2, &m1, &forgery, &mut rng),
            Err(KaumaError::CollidingMessages)
        );
    }
}
