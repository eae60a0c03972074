use once_cell::sync::Lazy;
use regex::Regex;

static DOI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^10\.\d{4,}/\S+$").unwrap());

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi.org/",
    "doi:",
];

/// Strip resolver URL / `doi:` prefixes and surrounding whitespace.
///
/// Returns `None` for an empty DOI.
pub fn normalize_doi(raw: &str) -> Option<String> {
    let mut doi = raw.trim();
    for prefix in DOI_PREFIXES {
        if doi
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        {
            doi = doi[prefix.len()..].trim_start();
            break;
        }
    }
    if doi.is_empty() {
        None
    } else {
        Some(doi.to_string())
    }
}

/// Whether `doi` has the `10.NNNN+/suffix` shape.
pub fn is_valid_doi(doi: &str) -> bool {
    DOI_RE.is_match(doi)
}
