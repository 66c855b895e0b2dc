//! Canonical serialization for deterministic cache keys.
//!
//! Query parameters are serialized to JSON in declaration order and hashed
//! with xxh64, so the same query always maps to the same cache file.
//!
//! - Stable field order: struct fields serialize in declaration order
//! - No HashMap allowed: use BTreeMap for maps in hashed data
//! - Floats that identify a query are truncated to integers first

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::error::AdapterResult;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> AdapterResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// xxh64 of the canonical bytes of `value`.
pub fn canonical_hash<T: Serialize>(value: &T) -> AdapterResult<u64> {
    to_canonical_bytes(value).map(|bytes| xxh64(&bytes, 0))
}

/// [`canonical_hash`] as 16 lowercase hex digits, usable in file names.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> AdapterResult<String> {
    canonical_hash(value).map(|h| hex::encode(h.to_be_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpatialSearchParams;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Query<'a> {
        seed: [i64; 3],
        params: &'a SpatialSearchParams,
    }

    #[test]
    fn test_fingerprint_is_stable_file_name() {
        let params = SpatialSearchParams::default();
        let q = Query { seed: [1, 2, 3], params: &params };
        let fp = canonical_hash_hex(&q).unwrap();
        assert_eq!(fp, canonical_hash_hex(&q).unwrap());
        assert_eq!(fp.len(), 16);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(fp, format!("{:016x}", canonical_hash(&q).unwrap()));
    }

    #[test]
    fn test_seed_and_params_change_hash() {
        let a = SpatialSearchParams::default();
        let b = SpatialSearchParams {
            primary_structure_only: true,
            ..Default::default()
        };
        let qa = Query { seed: [1, 2, 3], params: &a };
        let qb = Query { seed: [1, 2, 3], params: &b };
        let qc = Query { seed: [1, 2, 4], params: &a };
        assert_ne!(canonical_hash(&qa).unwrap(), canonical_hash(&qb).unwrap());
        assert_ne!(canonical_hash(&qa).unwrap(), canonical_hash(&qc).unwrap());
    }

    #[test]
    fn test_non_string_map_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert([1u8, 2], "x");
        assert!(to_canonical_bytes(&map).is_err());
    }
}
