//! Content addresses for marks and courses.
//!
//! A hash is SHA-256 over the plain concatenation of the identifying fields,
//! encoded as unpadded URL-safe base64. Numbers are rendered with `f64`'s
//! shortest round-trip form, so `20.0` contributes `"20"` and `7.5` contributes `"7.5"`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::types::Strand;

/// Hash the concatenation of `parts`.
///
/// # Examples
/// ```
/// use gradesync_harvester::identity::combined_hash;
///
/// assert_eq!(combined_hash(["ab", "c"]), combined_hash(["abc"]));
/// assert_eq!(combined_hash(["abc"]).len(), 43);
/// ```
pub fn combined_hash<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Identity of a single mark.
#[must_use]
pub fn mark_hash(
    strand: Strand,
    student_id: &str,
    portal_id: &str,
    name: &str,
    weight: f64,
    numerator: f64,
    denominator: f64,
) -> String {
    combined_hash([
        strand.as_str(),
        student_id,
        portal_id,
        name,
        &weight.to_string(),
        &numerator.to_string(),
        &denominator.to_string(),
    ])
}

/// Identity of a course: its name and enrollment date, never its weights.
#[must_use]
pub fn course_hash(name: &str, enrollment_date: &str) -> String {
    combined_hash([name, enrollment_date])
}
