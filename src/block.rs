//! Block codec (spec §4.1): conversions between base64 strings, raw
//! 16-byte blocks, the two bit-ordering integer views ("XEX" and "GCM"),
//! and coefficient-index sets.
//!
//! A block is always exactly 16 bytes. The XEX view reads the bytes as a
//! little-endian integer; the GCM view is the same byte order with every
//! byte's bits individually reversed. Both conversions are involutions.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{KaumaError, Result};

pub const BLOCK_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block(pub [u8; BLOCK_SIZE]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Semantic {
    Xex,
    Gcm,
}

impl Semantic {
    pub fn parse(s: &str) -> Result<Semantic> {
        match s {
            "xex" => Ok(Semantic::Xex),
            "gcm" => Ok(Semantic::Gcm),
            other => Err(KaumaError::BadArgument(format!(
                "unknown semantic {other:?}, expected \"xex\" or \"gcm\""
            ))),
        }
    }
}

impl Block {
    pub fn zero() -> Block {
        Block([0u8; BLOCK_SIZE])
    }

    pub fn from_bytes(bytes: &[u8]) -> Block {
        let mut buf = [0u8; BLOCK_SIZE];
        let n = bytes.len().min(BLOCK_SIZE);
        buf[..n].copy_from_slice(&bytes[..n]);
        Block(buf)
    }

    pub fn from_base64(s: &str) -> Result<Block> {
        let raw = general_purpose::STANDARD
            .decode(s)
            .map_err(|_| KaumaError::MalformedBlock)?;
        if raw.len() != BLOCK_SIZE {
            return Err(KaumaError::MalformedBlock);
        }
        let mut buf = [0u8; BLOCK_SIZE];
        buf.copy_from_slice(&raw);
        Ok(Block(buf))
    }

    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.0)
    }

    pub fn bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.0
    }

    /// Little-endian integer over the raw byte order — the XEX view.
    pub fn to_xex_int(&self) -> u128 {
        u128::from_le_bytes(self.0)
    }

    /// Same byte order as XEX, each byte's bits individually reversed.
    pub fn to_gcm_int(&self) -> u128 {
        let mut reversed = self.0;
        for b in reversed.iter_mut() {
            *b = b.reverse_bits();
        }
        u128::from_le_bytes(reversed)
    }

    pub fn from_xex_int(value: u128) -> Block {
        Block(value.to_le_bytes())
    }

    pub fn from_gcm_int(value: u128) -> Block {
        let mut bytes = value.to_le_bytes();
        for b in bytes.iter_mut() {
            *b = b.reverse_bits();
        }
        Block(bytes)
    }

    pub fn to_int(&self, semantic: Semantic) -> u128 {
        match semantic {
            Semantic::Xex => self.to_xex_int(),
            Semantic::Gcm => self.to_gcm_int(),
        }
    }

    pub fn from_int(value: u128, semantic: Semantic) -> Block {
        match semantic {
            Semantic::Xex => Block::from_xex_int(value),
            Semantic::Gcm => Block::from_gcm_int(value),
        }
    }

    pub fn to_coefficients(&self, semantic: Semantic) -> Vec<u32> {
        int_to_coefficients(self.to_int(semantic))
    }

    pub fn from_coefficients(coefficients: &[u32], semantic: Semantic) -> Block {
        Block::from_int(coefficients_to_int(coefficients), semantic)
    }
}

pub fn int_to_coefficients(value: u128) -> Vec<u32> {
    (0..128u32).filter(|&i| (value >> i) & 1 == 1).collect()
}

pub fn coefficients_to_int(coefficients: &[u32]) -> u128 {
    coefficients.iter().fold(0u128, |acc, &i| acc | (1u128 << i))
}
