//! Deterministic user-to-variant assignment
//!
//! Assignment must be repeatable without storing anything: the same user
//! always lands in the same variant as long as the variant list and its
//! order are unchanged. A polynomial hash of the user id picks a bucket in
//! [0, 100), and the variants' cumulative weights partition that range in
//! declaration order.

use crate::experiment::Variant;

/// Hash a user id into a percentile bucket in [0, 100).
///
/// Polynomial string hash (h = h*31 + char) folded into a signed 32-bit
/// integer, absolute value, modulo 100.
pub fn bucket_for(user_id: &str) -> u8 {
    let mut hash: i32 = 0;
    for ch in user_id.chars() {
        hash = hash.wrapping_mul(31).wrapping_add(ch as i32);
    }
    (i64::from(hash).abs() % 100) as u8
}

/// Select the variant whose cumulative weight range contains the bucket.
///
/// Walks the variants in declaration order; the first variant whose
/// cumulative weight exceeds the bucket percentile wins. Rounding can
/// leave the final cumulative weight short of 100, in which case the
/// first variant absorbs the remainder.
pub fn select_variant<'a>(variants: &'a [Variant], bucket: u8) -> &'a Variant {
    let percentile = f64::from(bucket);
    let mut cumulative = 0.0;

    for variant in variants {
        cumulative += variant.weight;
        if percentile < cumulative {
            return variant;
        }
    }

    &variants[0]
}
