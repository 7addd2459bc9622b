//! Region name canonicalization and ISO code lookup.

use crate::models::Meta;
use regex::Regex;
use std::sync::LazyLock;

static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("valid parenthesis pattern"));
static NON_KEY_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9a-z_]").expect("valid key pattern"));

/// Turn a free-text region name into the key used by the data collections.
///
/// `"Côte d'Ivoire (West Africa)"` -> `"cte_divoire"`.
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = PARENTHESIZED.replace_all(lowered.trim(), "");
    let underscored = stripped.trim().replace(' ', "_");
    NON_KEY_CHARS.replace_all(&underscored, "").into_owned()
}

/// Key of the first region whose ISO code equals `code`, in document order.
pub fn resolve_by_code<'a>(code: &str, meta: &'a Meta) -> Option<&'a str> {
    meta.locations
        .iter()
        .find(|(_, location)| location.iso.as_deref() == Some(code))
        .map(|(key, _)| key)
}
