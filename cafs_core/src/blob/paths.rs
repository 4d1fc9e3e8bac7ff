//! Deterministic placement of blobs inside a [`Store`](crate::Store).

use crate::{Hash, store::StoreFeatures};
use base64::Engine;

const BLOB_PREFIX: &str = "blob3/";

fn encode_hash(hash: Hash, features: &StoreFeatures) -> String {
    if features.case_sensitive {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash)
    } else {
        let mut output = Vec::with_capacity(base32_fs::encoded_len(Hash::SIZE));
        base32_fs::encode(hash.as_bytes(), &mut output);
        String::from_utf8_lossy(&output).into_owned()
    }
}

/// Relative path of the blob for `hash`, fanned out into nested
/// directories when the backend prefers small directories.
pub fn blob_path_for_hash(hash: Hash, features: &StoreFeatures) -> String {
    let encoded = encode_hash(hash, features);
    if features.recommended_max_dir_size < 10_000 {
        format!(
            "{BLOB_PREFIX}{}/{}/{}",
            &encoded[0..2],
            &encoded[2..4],
            &encoded[4..]
        )
    } else {
        format!("{BLOB_PREFIX}{encoded}")
    }
}

/// Inverse of [`blob_path_for_hash`]. Paths outside the blob prefix, or
/// that do not decode to a full digest, yield `None`.
pub fn hash_from_blob_path(path: &str, features: &StoreFeatures) -> Option<Hash> {
    let rest = path.strip_prefix(BLOB_PREFIX)?;
    let encoded: String = rest.chars().filter(|&c| c != '/').collect();
    if encoded.is_empty() {
        return None;
    }

    let bytes = if features.case_sensitive {
        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .ok()?
    } else {
        // validate first, `decode` assumes well-formed input
        if !base32_fs::is_valid(encoded.as_bytes()) {
            return None;
        }
        let len = base32_fs::decoded_len(encoded.len())?;
        let mut out = Vec::with_capacity(len);
        let _ = base32_fs::decode(encoded.as_bytes(), &mut out);
        out
    };

    let arr: [u8; 32] = bytes.try_into().ok()?;
    Some(Hash::from_bytes(arr))
}
