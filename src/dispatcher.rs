//! Dispatcher façade (spec §4.7/§6). Maps each named request to a core
//! operation and formats the response. Unknown actions are silently
//! skipped, matching the original `kauma.py`'s behavior (spec §9).

use std::collections::BTreeMap;

use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::block::{Block, Semantic, BLOCK_SIZE};
use crate::cipher::{aes_encrypt_block, fde_apply, sea_encrypt};
use crate::crack::{gcm_crack, GcmForgeryTarget, GcmMessage};
use crate::error::{KaumaError, Result};
use crate::factor::{ddf, edf, sff};
use crate::field::FieldElement;
use crate::gcm::{self, BlockCipher};
use crate::poly::FieldPoly;

#[derive(Debug, Deserialize)]
pub struct RequestDocument {
    pub testcases: BTreeMap<String, TestCase>,
}

#[derive(Debug, Deserialize)]
pub struct TestCase {
    pub action: String,
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
pub struct ResponseDocument {
    pub responses: BTreeMap<String, Value>,
}

/// Runs every testcase, logging at `debug` per spec §4.9/C10. A
/// `KaumaError` for one test id becomes `{"error": "..."}` for that id;
/// it never aborts the rest of the batch.
pub fn run(request: &RequestDocument) -> ResponseDocument {
    let mut responses = BTreeMap::new();

    for (id, testcase) in &request.testcases {
        log::debug!("running test {id}: action={}", testcase.action);
        match dispatch(&testcase.action, &testcase.arguments) {
            Dispatched::Ok(value) => {
                responses.insert(id.clone(), value);
            }
            Dispatched::Err(e) => {
                responses.insert(id.clone(), serde_json::json!({ "error": e.to_string() }));
            }
            Dispatched::Unknown => {
                log::debug!("unknown action {} for test {id}, skipping", testcase.action);
            }
        }
    }

    ResponseDocument { responses }
}

enum Dispatched {
    Ok(Value),
    Err(KaumaError),
    Unknown,
}

impl From<Result<Value>> for Dispatched {
    fn from(r: Result<Value>) -> Dispatched {
        match r {
            Ok(v) => Dispatched::Ok(v),
            Err(e) => Dispatched::Err(e),
        }
    }
}

fn dispatch(action: &str, args: &Value) -> Dispatched {
    match action {
        "poly2block" => poly2block(args).into(),
        "block2poly" => block2poly(args).into(),
        "gfmul" => gfmul(args).into(),
        "gfdiv" => gfdiv(args).into(),
        "gfpoly_add" => gfpoly_add(args).into(),
        "gfpoly_mul" => gfpoly_mul(args).into(),
        "gfpoly_pow" => gfpoly_pow(args).into(),
        "gfpoly_divmod" => gfpoly_divmod(args).into(),
        "gfpoly_powmod" => gfpoly_powmod(args).into(),
        "gfpoly_sort" => gfpoly_sort(args).into(),
        "gfpoly_make_monic" => gfpoly_make_monic(args).into(),
        "gfpoly_sqrt" => gfpoly_sqrt(args).into(),
        "gfpoly_diff" => gfpoly_diff(args).into(),
        "gfpoly_gcd" => gfpoly_gcd(args).into(),
        "gfpoly_factor_sff" => gfpoly_factor_sff(args).into(),
        "gfpoly_factor_ddf" => gfpoly_factor_ddf(args).into(),
        "gfpoly_factor_edf" => gfpoly_factor_edf(args).into(),
        "gcm_encrypt" => gcm_encrypt(args).into(),
        "gcm_decrypt" => gcm_decrypt(args).into(),
        "gcm_crack" => gcm_crack_action(args).into(),
        "fde" => fde_action(args).into(),
        _ => Dispatched::Unknown,
    }
}

fn arg_str(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| KaumaError::BadArgument(format!("missing string argument {key:?}")))
}

fn arg_u64(args: &Value, key: &str) -> Result<u64> {
    args.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| KaumaError::BadArgument(format!("missing integer argument {key:?}")))
}

fn arg_block_list(args: &Value, key: &str) -> Result<Vec<String>> {
    args.get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| KaumaError::BadArgument(format!("missing array argument {key:?}")))?
        .iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| KaumaError::BadArgument(format!("{key} entries must be strings")))
        })
        .collect()
}

fn semantic_arg(args: &Value, key: &str) -> Result<Semantic> {
    Semantic::parse(&arg_str(args, key)?)
}

fn block_field(block: &FieldElement, semantic: Semantic) -> String {
    block.to_block(semantic).to_base64()
}

fn poly2block(args: &Value) -> Result<Value> {
    let semantic = semantic_arg(args, "semantic")?;
    let coefficients: Vec<u32> = args
        .get("coefficients")
        .and_then(Value::as_array)
        .ok_or_else(|| KaumaError::BadArgument("missing coefficients".into()))?
        .iter()
        .map(|v| v.as_u64().map(|n| n as u32))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| KaumaError::BadArgument("coefficients must be integers".into()))?;
    let block = Block::from_coefficients(&coefficients, semantic);
    Ok(serde_json::json!({ "block": block.to_base64() }))
}

fn block2poly(args: &Value) -> Result<Value> {
    let semantic = semantic_arg(args, "semantic")?;
    let block = Block::from_base64(&arg_str(args, "block")?)?;
    Ok(serde_json::json!({ "coefficients": block.to_coefficients(semantic) }))
}

fn gfmul(args: &Value) -> Result<Value> {
    let semantic = semantic_arg(args, "semantic")?;
    let a = FieldElement::from_block(&Block::from_base64(&arg_str(args, "a")?)?, semantic);
    let b = FieldElement::from_block(&Block::from_base64(&arg_str(args, "b")?)?, semantic);
    Ok(serde_json::json!({ "product": block_field(&a.mul(&b), semantic) }))
}

fn gfdiv(args: &Value) -> Result<Value> {
    let a = FieldElement::from_block(&Block::from_base64(&arg_str(args, "a")?)?, Semantic::Gcm);
    let b = FieldElement::from_block(&Block::from_base64(&arg_str(args, "b")?)?, Semantic::Gcm);
    Ok(serde_json::json!({ "q": block_field(&a.div(&b)?, Semantic::Gcm) }))
}

fn poly_arg(args: &Value, key: &str) -> Result<FieldPoly> {
    FieldPoly::from_b64_list(&arg_block_list(args, key)?)
}

fn gfpoly_add(args: &Value) -> Result<Value> {
    let a = poly_arg(args, "A")?;
    let b = poly_arg(args, "B")?;
    Ok(serde_json::json!({ "S": a.add(&b).to_b64_list() }))
}

fn gfpoly_mul(args: &Value) -> Result<Value> {
    let a = poly_arg(args, "A")?;
    let b = poly_arg(args, "B")?;
    Ok(serde_json::json!({ "P": a.mul(&b).to_b64_list() }))
}

fn gfpoly_pow(args: &Value) -> Result<Value> {
    let a = poly_arg(args, "A")?;
    let k = BigUint::from(arg_u64(args, "k")?);
    Ok(serde_json::json!({ "Z": a.pow(&k, None)?.to_b64_list() }))
}

fn gfpoly_divmod(args: &Value) -> Result<Value> {
    let a = poly_arg(args, "A")?;
    let b = poly_arg(args, "B")?;
    let (q, r) = a.divmod(&b)?;
    Ok(serde_json::json!({ "Q": q.to_b64_list(), "R": r.to_b64_list() }))
}

fn gfpoly_powmod(args: &Value) -> Result<Value> {
    let a = poly_arg(args, "A")?;
    let m = poly_arg(args, "M")?;
    let k = BigUint::from(arg_u64(args, "k")?);
    Ok(serde_json::json!({ "Z": a.pow(&k, Some(&m))?.to_b64_list() }))
}

fn gfpoly_sort(args: &Value) -> Result<Value> {
    let lists = args
        .get("polys")
        .and_then(Value::as_array)
        .ok_or_else(|| KaumaError::BadArgument("missing polys".into()))?;
    let mut polys = Vec::with_capacity(lists.len());
    for entry in lists {
        let blocks: Vec<String> = entry
            .as_array()
            .ok_or_else(|| KaumaError::BadArgument("polys entries must be arrays".into()))?
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_owned)
                    .ok_or_else(|| KaumaError::BadArgument("poly block must be a string".into()))
            })
            .collect::<Result<Vec<_>>>()?;
        polys.push(FieldPoly::from_b64_list(&blocks)?);
    }
    polys.sort();
    Ok(serde_json::json!({
        "sorted_polys": polys.iter().map(FieldPoly::to_b64_list).collect::<Vec<_>>()
    }))
}

fn gfpoly_make_monic(args: &Value) -> Result<Value> {
    Ok(serde_json::json!({ "A*": poly_arg(args, "A")?.monic()?.to_b64_list() }))
}

fn gfpoly_sqrt(args: &Value) -> Result<Value> {
    Ok(serde_json::json!({ "S": poly_arg(args, "Q")?.sqrt()?.to_b64_list() }))
}

fn gfpoly_diff(args: &Value) -> Result<Value> {
    Ok(serde_json::json!({ "F'": poly_arg(args, "F")?.diff().to_b64_list() }))
}

fn gfpoly_gcd(args: &Value) -> Result<Value> {
    let a = poly_arg(args, "A")?;
    let b = poly_arg(args, "B")?;
    Ok(serde_json::json!({ "G": a.gcd(&b)?.to_b64_list() }))
}

fn gfpoly_factor_sff(args: &Value) -> Result<Value> {
    let f = poly_arg(args, "F")?;
    let factors = sff(&f)?;
    Ok(serde_json::json!({
        "factors": factors.into_iter().map(|(factor, exponent)| {
            serde_json::json!({ "factor": factor.to_b64_list(), "exponent": exponent })
        }).collect::<Vec<_>>()
    }))
}

fn gfpoly_factor_ddf(args: &Value) -> Result<Value> {
    let f = poly_arg(args, "F")?;
    let factors = ddf(&f)?;
    Ok(serde_json::json!({
        "factors": factors.into_iter().map(|(factor, degree)| {
            serde_json::json!({ "factor": factor.to_b64_list(), "degree": degree })
        }).collect::<Vec<_>>()
    }))
}

fn gfpoly_factor_edf(args: &Value) -> Result<Value> {
    let f = poly_arg(args, "F")?;
    let d = arg_u64(args, "d")?;
    let mut rng = StdRng::from_entropy();
    let factors = edf(&f, d, &mut rng)?;
    Ok(serde_json::json!({
        "factors": factors.into_iter().map(|p| p.to_b64_list()).collect::<Vec<_>>()
    }))
}

fn block_cipher_for(algorithm: &str, key_b64: &str) -> Result<Box<dyn Fn(&[u8; BLOCK_SIZE]) -> Result<[u8; BLOCK_SIZE]>>> {
    let key = Block::from_base64(key_b64)?.bytes().to_owned();
    match algorithm {
        "aes128" => Ok(Box::new(move |block| aes_encrypt_block(&key, block))),
        "sea128" => Ok(Box::new(move |block| sea_encrypt(&key, block))),
        other => Err(KaumaError::BadArgument(format!(
            "unknown algorithm {other:?}, expected \"aes128\" or \"sea128\""
        ))),
    }
}

fn decode_bytes(args: &Value, key: &str) -> Result<Vec<u8>> {
    use base64::{engine::general_purpose, Engine as _};
    general_purpose::STANDARD
        .decode(arg_str(args, key)?)
        .map_err(|_| KaumaError::BadArgument(format!("{key} is not valid base64")))
}

fn encode_bytes(bytes: &[u8]) -> String {
    use base64::{engine::general_purpose, Engine as _};
    general_purpose::STANDARD.encode(bytes)
}

fn gcm_encrypt(args: &Value) -> Result<Value> {
    let algorithm = arg_str(args, "algorithm")?;
    let key = arg_str(args, "key")?;
    let nonce = decode_bytes(args, "nonce")?;
    let plaintext = decode_bytes(args, "plaintext")?;
    let ad = decode_bytes(args, "ad")?;

    let cipher = block_cipher_for(&algorithm, &key)?;
    let cipher_ref: &BlockCipher = &*cipher;
    let result = gcm::encrypt(cipher_ref, &nonce, &plaintext, &ad)?;

    Ok(serde_json::json!({
        "ciphertext": encode_bytes(&result.ciphertext),
        "tag": Block(result.tag).to_base64(),
        "L": Block(result.l).to_base64(),
        "H": result.auth_key.to_block(Semantic::Gcm).to_base64(),
    }))
}

fn gcm_decrypt(args: &Value) -> Result<Value> {
    let algorithm = arg_str(args, "algorithm")?;
    let key = arg_str(args, "key")?;
    let nonce = decode_bytes(args, "nonce")?;
    let ciphertext = decode_bytes(args, "ciphertext")?;
    let ad = decode_bytes(args, "ad")?;
    let tag = Block::from_base64(&arg_str(args, "tag")?)?;

    let cipher = block_cipher_for(&algorithm, &key)?;
    let cipher_ref: &BlockCipher = &*cipher;
    let result = gcm::decrypt(cipher_ref, &nonce, &ciphertext, &ad, tag.bytes())?;

    Ok(serde_json::json!({
        "authentic": result.authentic,
        "plaintext": encode_bytes(&result.plaintext),
    }))
}

fn gcm_message_arg(args: &Value, key: &str) -> Result<GcmMessage> {
    let m = args
        .get(key)
        .ok_or_else(|| KaumaError::BadArgument(format!("missing {key}")))?;
    Ok(GcmMessage {
        ciphertext: decode_bytes(m, "ciphertext")?,
        associated_data: decode_bytes(m, "associated_data")?,
        tag: FieldElement::from_block(&Block::from_base64(&arg_str(m, "tag")?)?, Semantic::Gcm),
    })
}

fn gcm_crack_action(args: &Value) -> Result<Value> {
    let m1 = gcm_message_arg(args, "m1")?;
    let m2 = gcm_message_arg(args, "m2")?;
    let m3 = gcm_message_arg(args, "m3")?;

    let forgery_args = args
        .get("forgery")
        .ok_or_else(|| KaumaError::BadArgument("missing forgery".into()))?;
    let forgery = GcmForgeryTarget {
        ciphertext: decode_bytes(forgery_args, "ciphertext")?,
        associated_data: decode_bytes(forgery_args, "associated_data")?,
    };

    let mut rng = StdRng::from_entropy();
    let result = gcm_crack(&m1, &m2, &m3, &forgery, &mut rng)?;

    Ok(serde_json::json!({
        "tag": result.tag.to_block(Semantic::Gcm).to_base64(),
        "H": result.h.to_block(Semantic::Gcm).to_base64(),
        "mask": result.mask.to_block(Semantic::Gcm).to_base64(),
    }))
}

fn fde_action(args: &Value) -> Result<Value> {
    let mode = arg_str(args, "mode")?;
    let key = decode_bytes(args, "key")?;
    let tweak = Block::from_base64(&arg_str(args, "tweak")?)?;
    let data = decode_bytes(args, "data")?;

    let encrypt = match mode.as_str() {
        "encrypt" => true,
        "decrypt" => false,
        other => {
            return Err(KaumaError::BadArgument(format!(
                "unknown mode {other:?}, expected \"encrypt\" or \"decrypt\""
            )))
        }
    };

    let result = fde_apply(&key, tweak.bytes(), &data, encrypt)?;
    Ok(serde_json::json!({ "data": encode_bytes(&result) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_one(action: &str, args: Value) -> Value {
        match dispatch(action, &args) {
            Dispatched::Ok(v) => v,
            Dispatched::Err(e) => panic!("action failed: {e}"),
            Dispatched::Unknown => panic!("unknown action {action}"),
        }
    }

    // S1/S2 from spec §8.
    #[test]
    fn poly2block_and_block2poly_scenario() {
        let block = run_one(
            "poly2block",
            serde_json::json!({ "coefficients": [0, 9, 12, 127], "semantic": "xex" }),
        );
        assert_eq!(block["block"], "ARIAAAAAAAAAAAAAAAAAgA==");

        let coeffs = run_one(
            "block2poly",
            serde_json::json!({ "block": "ARIAAAAAAAAAAAAAAAAAgA==", "semantic": "xex" }),
        );
        assert_eq!(coeffs["coefficients"], serde_json::json!([0, 9, 12, 127]));
    }

    // S3 from spec §8.
    #[test]
    fn gfmul_scenario() {
        let result = run_one(
            "gfmul",
            serde_json::json!({
                "a": "ARIAAAAAAAAAAAAAAAAAgA==",
                "b": "AgAAAAAAAAAAAAAAAAAAAA==",
                "semantic": "xex",
            }),
        );
        assert_eq!(result["product"], "hSQAAAAAAAAAAAAAAAAAAA==");
    }

    #[test]
    fn unknown_action_is_skipped_not_erred() {
        let mut testcases = BTreeMap::new();
        testcases.insert(
            "t1".to_string(),
            TestCase {
                action: "not_a_real_action".to_string(),
                arguments: serde_json::json!({}),
            },
        );
        let response = run(&RequestDocument { testcases });
        assert!(response.responses.is_empty());
    }

    // S5 from spec §8.
    #[test]
    fn gcm_encrypt_aes128_scenario() {
        let result = run_one(
            "gcm_encrypt",
            serde_json::json!({
                "algorithm": "aes128",
                "key": "Xjq/GkpTSWoe3ZH0F+tjrQ==",
                "nonce": "4gF+BtR3ku/PUQci",
                "plaintext": "RGFzIGlzdCBlaW4gVGVzdA==",
                "ad": "QUQtRGF0ZW4=",
            }),
        );
        assert_eq!(result["ciphertext"], "ET3RmvH/Hbuxba63EuPRrw==");
        assert_eq!(result["tag"], "Mp0APJb/ZIURRwQlMgNN/w==");
        assert_eq!(result["L"], "AAAAAAAAAEAAAAAAAAAAgA==");
        assert_eq!(result["H"], "Bu6ywbsUKlpmZXMQyuGAng==");
    }

    // S6 from spec §8.
    #[test]
    fn gcm_encrypt_sea128_scenario() {
        let result = run_one(
            "gcm_encrypt",
            serde_json::json!({
                "algorithm": "sea128",
                "key": "Xjq/GkpTSWoe3ZH0F+tjrQ==",
                "nonce": "4gF+BtR3ku/PUQci",
                "plaintext": "RGFzIGlzdCBlaW4gVGVzdA==",
                "ad": "QUQtRGF0ZW4=",
            }),
        );
        assert_eq!(result["ciphertext"], "0cI/Wg4R3URfrVFZ0hw/vg==");
        assert_eq!(result["tag"], "ysDdzOSnqLH0MQ+Mkb23gw==");
        assert_eq!(result["H"], "xhFcAUT66qWIpYz+Ch5ujw==");
    }

    #[test]
    fn bad_semantic_is_a_bad_argument_error() {
        let mut testcases = BTreeMap::new();
        testcases.insert(
            "t1".to_string(),
            TestCase {
                action: "block2poly".to_string(),
                arguments: serde_json::json!({ "block": "ARIAAAAAAAAAAAAAAAAAgA==", "semantic": "nope" }),
            },
        );
        let response = run(&RequestDocument { testcases });
        assert!(response.responses["t1"]["error"].is_string());
    }
}
