//! Field polynomial F[X] (spec §4.3): coefficient sequences over
//! GF(2^128), low-degree term first, always kept in normal form (no
//! trailing zero coefficients except the zero polynomial `[0]` itself).

use std::cmp::Ordering;

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::block::{Block, Semantic, BLOCK_SIZE};
use crate::error::{KaumaError, Result};
use crate::field::FieldElement;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPoly(Vec<FieldElement>);

impl FieldPoly {
    pub fn zero() -> FieldPoly {
        FieldPoly(vec![FieldElement::ZERO])
    }

    pub fn one() -> FieldPoly {
        FieldPoly(vec![FieldElement::ONE])
    }

    /// The monomial X.
    pub fn x() -> FieldPoly {
        FieldPoly(vec![FieldElement::ZERO, FieldElement::ONE])
    }

    pub fn new(coefficients: Vec<FieldElement>) -> FieldPoly {
        let mut p = FieldPoly(coefficients);
        p.normalize();
        p
    }

    pub fn coefficients(&self) -> &[FieldElement] {
        &self.0
    }

    pub fn degree(&self) -> usize {
        self.0.len() - 1
    }

    pub fn is_zero(&self) -> bool {
        self.0.len() == 1 && self.0[0].is_zero()
    }

    fn normalize(&mut self) {
        while self.0.len() > 1 && self.0.last().unwrap().is_zero() {
            self.0.pop();
        }
        if self.0.is_empty() {
            self.0.push(FieldElement::ZERO);
        }
    }

    pub fn leading(&self) -> FieldElement {
        *self.0.last().unwrap()
    }

    /// Split raw bytes into 16-byte blocks (zero-padding the final
    /// block) and read each as a field element under the GCM view.
    pub fn from_bytes_gcm(bytes: &[u8]) -> FieldPoly {
        if bytes.is_empty() {
            return FieldPoly::zero();
        }
        let coefficients = bytes
            .chunks(BLOCK_SIZE)
            .map(|chunk| FieldElement::from_block(&Block::from_bytes(chunk), Semantic::Gcm))
            .collect();
        FieldPoly::new(coefficients)
    }

    pub fn from_b64_list(blocks: &[String]) -> Result<FieldPoly> {
        let coefficients = blocks
            .iter()
            .map(|b| Block::from_base64(b).map(|blk| FieldElement::from_block(&blk, Semantic::Gcm)))
            .collect::<Result<Vec<_>>>()?;
        if coefficients.is_empty() {
            return Ok(FieldPoly::zero());
        }
        Ok(FieldPoly::new(coefficients))
    }

    pub fn to_b64_list(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|c| c.to_block(Semantic::Gcm).to_base64())
            .collect()
    }

    pub fn add(&self, other: &FieldPoly) -> FieldPoly {
        use itertools::EitherOrBoth;
        use itertools::Itertools;

        let result = self
            .0
            .iter()
            .zip_longest(other.0.iter())
            .map(|pair| match pair {
                EitherOrBoth::Both(a, b) => a.add(b),
                EitherOrBoth::Left(a) | EitherOrBoth::Right(a) => *a,
            })
            .collect();
        FieldPoly::new(result)
    }

    pub fn mul(&self, other: &FieldPoly) -> FieldPoly {
        if self.is_zero() || other.is_zero() {
            return FieldPoly::zero();
        }
        let mut result = vec![FieldElement::ZERO; self.0.len() + other.0.len() - 1];
        for (i, a) in self.0.iter().enumerate() {
            if a.is_zero() {
                continue;
            }
            for (j, b) in other.0.iter().enumerate() {
                result[i + j] = result[i + j].add(&a.mul(b));
            }
        }
        FieldPoly::new(result)
    }

    /// Long division (spec §4.3). Fails with `DivisionByZero` if `other`
    /// is the zero polynomial.
    pub fn divmod(&self, other: &FieldPoly) -> Result<(FieldPoly, FieldPoly)> {
        if other.is_zero() {
            return Err(KaumaError::DivisionByZero);
        }

        let mut remainder = self.clone();
        if remainder.degree() < other.degree() {
            return Ok((FieldPoly::zero(), remainder));
        }

        let mut quotient = vec![FieldElement::ZERO; remainder.degree() - other.degree() + 1];
        let other_lead_inv = other.leading().inv()?;

        loop {
            if remainder.is_zero() || remainder.degree() < other.degree() {
                break;
            }
            let shift = remainder.degree() - other.degree();
            let coeff = remainder.leading().mul(&other_lead_inv);
            quotient[shift] = coeff;

            for (idx, c) in other.0.iter().enumerate() {
                let pos = shift + idx;
                remainder.0[pos] = remainder.0[pos].add(&coeff.mul(c));
            }
            remainder.normalize();
        }

        Ok((FieldPoly::new(quotient), remainder))
    }

    pub fn floor_div(&self, other: &FieldPoly) -> Result<FieldPoly> {
        Ok(self.divmod(other)?.0)
    }

    pub fn modulo(&self, other: &FieldPoly) -> Result<FieldPoly> {
        Ok(self.divmod(other)?.1)
    }

    /// Square-and-multiply. Reduces mod `modulus` once at the start (if
    /// given) and after every squaring/multiplication.
    pub fn pow(&self, k: &BigUint, modulus: Option<&FieldPoly>) -> Result<FieldPoly> {
        if k.is_zero() {
            return Ok(FieldPoly::one());
        }
        if self.0.len() == 1 && (self.0[0].is_zero() || self.0[0] == FieldElement::ONE) {
            return match modulus {
                Some(m) => self.modulo(m),
                None => Ok(self.clone()),
            };
        }

        let reduce = |p: &FieldPoly| -> Result<FieldPoly> {
            match modulus {
                Some(m) => p.modulo(m),
                None => Ok(p.clone()),
            }
        };

        let mut base = reduce(self)?;
        let mut result = FieldPoly::one();
        let mut exponent = k.clone();
        let two = BigUint::from(2u32);

        while !exponent.is_zero() {
            if &exponent % &two == BigUint::one() {
                result = reduce(&result.mul(&base))?;
            }
            exponent /= &two;
            if !exponent.is_zero() {
                base = reduce(&base.mul(&base))?;
            }
        }

        Ok(result)
    }

    pub fn make_monic(&mut self) -> Result<()> {
        if self.is_zero() {
            return Ok(());
        }
        let lead_inv = self.leading().inv()?;
        for c in self.0.iter_mut() {
            *c = c.mul(&lead_inv);
        }
        *self.0.last_mut().unwrap() = FieldElement::ONE;
        Ok(())
    }

    pub fn monic(&self) -> Result<FieldPoly> {
        let mut p = self.clone();
        p.make_monic()?;
        Ok(p)
    }

    /// Formal derivative in characteristic 2: only odd-degree terms
    /// survive, each shifted down by one degree.
    pub fn diff(&self) -> FieldPoly {
        if self.0.len() == 1 {
            return FieldPoly::zero();
        }
        let mut result = vec![FieldElement::ZERO; self.0.len() - 1];
        let mut i = 1;
        while i < self.0.len() {
            result[i - 1] = self.0[i];
            i += 2;
        }
        FieldPoly::new(result)
    }

    /// Square root, defined only when every odd-indexed coefficient is
    /// zero. Fails `DegreeMismatch` otherwise (spec §7/§9).
    pub fn sqrt(&self) -> Result<FieldPoly> {
        if self.0.len() % 2 == 0 {
            return Err(KaumaError::DegreeMismatch);
        }
        let mut result = Vec::with_capacity((self.0.len() + 1) / 2);
        for (i, c) in self.0.iter().enumerate() {
            if i % 2 == 1 && !c.is_zero() {
                return Err(KaumaError::DegreeMismatch);
            }
            if i % 2 == 0 {
                result.push(c.sqrt());
            }
        }
        Ok(FieldPoly::new(result))
    }

    pub fn gcd(&self, other: &FieldPoly) -> Result<FieldPoly> {
        let mut a = self.clone();
        let mut b = other.clone();
        while !b.is_zero() {
            let (_, r) = a.divmod(&b)?;
            a = b;
            b = r;
        }
        a.make_monic()?;
        Ok(a)
    }
}

impl PartialOrd for FieldPoly {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldPoly {
    /// Total order (spec §3/§9): degree ascending, then compare
    /// coefficients highest-degree-first on ties.
    fn cmp(&self, other: &Self) -> Ordering {
        match self.0.len().cmp(&other.0.len()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        for (a, b) in self.0.iter().rev().zip(other.0.iter().rev()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}
