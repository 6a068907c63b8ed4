//! Core XML parsing primitives
//!
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Entities: XML entity decoding and escaping with Cow (zero-copy when possible)

pub mod entities;
pub mod scanner;
