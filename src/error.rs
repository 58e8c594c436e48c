//! Error kinds surfaced by the core (spec §7).

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KaumaError {
    #[error("base64 block did not decode to exactly 16 bytes")]
    MalformedBlock,

    #[error("division by zero")]
    DivisionByZero,

    #[error("polynomial is not a perfect square")]
    DegreeMismatch,

    #[error("m1 and m2 produce an identical ghash polynomial (T1 = T2)")]
    CollidingMessages,

    #[error("no root candidate verified against the third message")]
    NoKeyCandidate,

    #[error("bad argument: {0}")]
    BadArgument(String),
}

pub type Result<T> = std::result::Result<T, KaumaError>;
