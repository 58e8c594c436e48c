//! Polynomial factorization pipeline (spec §4.4): Square-Free
//! Factorization, Distinct-Degree Factorization, Equal-Degree
//! Factorization (char-2 Cantor-Zassenhaus), and root-finding built on
//! top of the three.

use num_bigint::BigUint;
use num_traits::One;
use rand::RngCore;

use crate::error::Result;
use crate::field::FieldElement;
use crate::poly::FieldPoly;

fn one() -> FieldPoly {
    FieldPoly::one()
}

fn x() -> FieldPoly {
    FieldPoly::x()
}

fn q_pow(d: u64) -> BigUint {
    BigUint::from(2u32).pow(128).pow(d as u32)
}

/// Square-free factorization (Yun's algorithm variant for char 2):
/// returns `(factor, exponent)` pairs with ascending degree.
pub fn sff(f: &FieldPoly) -> Result<Vec<(FieldPoly, u64)>> {
    let f_derived = f.diff();
    let c = f.gcd(&f_derived)?;
    let mut f = f.floor_div(&c)?;

    let mut z = Vec::new();
    let mut exponent = 1u64;
    let mut c = c;

    while f != one() {
        let y = f.gcd(&c)?;
        if f != y {
            z.push((f.floor_div(&y)?, exponent));
        }
        f = y;
        c = c.floor_div(&f)?;
        exponent += 1;
    }

    if c != one() {
        for (fstar, estar) in sff(&c.sqrt()?)? {
            z.push((fstar, estar * 2));
        }
    }

    z.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(z)
}

/// Distinct-degree factorization: returns `(factor, degree)` pairs,
/// where `factor` is the product of all irreducible factors of `f`
/// that share that degree.
pub fn ddf(f: &FieldPoly) -> Result<Vec<(FieldPoly, u64)>> {
    let mut d = 1u64;
    let mut z = Vec::new();
    let mut fstar = f.clone();
    let xp = x();
    let one_poly = one();

    while fstar.degree() as u64 >= 2 * d {
        let h = xp
            .pow(&q_pow(d), Some(&fstar))?
            .add(&xp)
            .modulo(&fstar)?;

        let g = h.gcd(&fstar)?;
        if g != one_poly {
            z.push((g.clone(), d));
            fstar = fstar.floor_div(&g)?;
        }
        d += 1;
    }

    if fstar != one_poly {
        let deg = fstar.degree() as u64;
        z.push((fstar, deg));
    } else if z.is_empty() {
        z.push((f.clone(), 1));
    }

    z.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(z)
}

/// Uniform degree in `[1, deg(f)-1]` with an explicit nonzero leading
/// coefficient, per spec §4.4 (the original's `randbelow`-based degree
/// pick can degenerate to the empty polynomial; this cannot).
fn random_poly(max_degree: usize, rng: &mut dyn RngCore) -> FieldPoly {
    let degree = 1 + (rng.next_u32() as usize % max_degree);
    let mut coefficients = Vec::with_capacity(degree + 1);
    for _ in 0..degree {
        coefficients.push(FieldElement::new(random_u128(rng)));
    }
    let mut lead = random_u128(rng);
    if lead == 0 {
        lead = 1;
    }
    coefficients.push(FieldElement::new(lead));
    FieldPoly::new(coefficients)
}

fn random_u128(rng: &mut dyn RngCore) -> u128 {
    let mut bytes = [0u8; 16];
    rng.fill_bytes(&mut bytes);
    u128::from_le_bytes(bytes)
}

/// Equal-degree factorization via char-2 Cantor-Zassenhaus: splits `f`,
/// known to be a product of `n = deg(f)/d` irreducibles all of degree
/// `d`, into its `n` irreducible factors.
pub fn edf(f: &FieldPoly, d: u64, rng: &mut dyn RngCore) -> Result<Vec<FieldPoly>> {
    let n = f.degree() as u64 / d;
    let mut z = vec![f.clone()];
    if n <= 1 {
        return Ok(z);
    }
    let max_random_degree = f.degree() - 1;
    let exponent = (q_pow(d) - BigUint::one()) / BigUint::from(3u32);
    let one_poly = one();

    let progress = indicatif::ProgressBar::new(n);
    progress.set_style(
        indicatif::ProgressStyle::with_template("edf(d={msg}) {pos}/{len} factors")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
    );
    progress.set_message(d.to_string());

    let mut iterations = 0u64;
    while (z.len() as u64) < n {
        iterations += 1;
        log::trace!("edf(d={d}): iteration {iterations}, {} factors found", z.len());
        progress.set_position(z.len() as u64);
        let h = random_poly(max_random_degree, rng);
        let g = h.pow(&exponent, Some(f))?.add(&one_poly).modulo(f)?;

        let mut i = 0;
        while i < z.len() {
            let u = z[i].clone();
            if u.degree() as u64 > d {
                let j = u.gcd(&g)?;
                if j != one_poly && j != u {
                    z.remove(i);
                    let quotient = u.floor_div(&j)?;
                    z.push(j);
                    z.push(quotient);
                    continue;
                }
            }
            i += 1;
        }
    }
    progress.finish_and_clear();

    z.sort_by(|a, b| a.cmp(b));
    Ok(z)
}

/// SFF -> DDF -> EDF composed into the full set of roots (degree-1
/// factors, read off as their constant term) of `f` in GF(2^128).
pub fn find_roots(f: &FieldPoly, rng: &mut dyn RngCore) -> Result<Vec<FieldElement>> {
    let mut roots = Vec::new();
    for (f_sff, _) in sff(f)? {
        for (f_ddf, degree) in ddf(&f_sff)? {
            if degree == f_ddf.degree() as u64 {
                if degree == 1 {
                    roots.push(f_ddf.coefficients()[0]);
                }
                continue;
            }
            for factor in edf(&f_ddf, degree, rng)? {
                if factor.degree() == 1 {
                    roots.push(factor.coefficients()[0]);
                }
            }
        }
    }
    Ok(roots)
}
