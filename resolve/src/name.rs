use std::sync::OnceLock;

use regex::Regex;

/// Pattern matching a single trailing authority or epithet token: a
/// capitalized abbreviation-like word, or one of the known authority names.
const AUTHORITY_SUFFIX: &str = r"\s+([A-Z][a-z]*\.?|Moench|L\.)$";

fn authority_suffix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(AUTHORITY_SUFFIX).unwrap())
}

/// Strips trailing authority tokens from a scientific name.
///
/// Tokens are removed until the name no longer ends in one, so the function
/// is a fixpoint: cleaning an already-clean name returns it unchanged.
/// Returns `None` when the input holds no name at all.
#[must_use]
pub fn clean_scientific_name(name: &str) -> Option<String> {
    let suffix = authority_suffix();
    let mut current = name.trim().to_string();
    if current.is_empty() {
        return None;
    }
    loop {
        let next = suffix.replace(&current, "").trim().to_string();
        if next == current {
            break;
        }
        current = next;
    }
    Some(current)
}

/// Returns the first whitespace-delimited token of a multi-word name,
/// assumed to be the genus. Single-token and empty names yield `None`.
#[must_use]
pub fn extract_genus(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if !trimmed.contains(' ') {
        return None;
    }
    trimmed.split_whitespace().next().map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_abbreviated_authority() {
        assert_eq!(
            clean_scientific_name("Oryza sativa L.").as_deref(),
            Some("Oryza sativa")
        );
    }

    #[test]
    fn strips_known_authority_name() {
        assert_eq!(
            clean_scientific_name("Abelmoschus esculentus Moench").as_deref(),
            Some("Abelmoschus esculentus")
        );
    }

    #[test]
    fn leaves_clean_binomial_untouched() {
        assert_eq!(
            clean_scientific_name("Mangifera indica").as_deref(),
            Some("Mangifera indica")
        );
    }

    #[test]
    fn cleaning_is_idempotent() {
        for raw in [
            "Oryza sativa L.",
            "Foo bar Baz Qux",
            "Mangifera indica",
            "  Brassica  ",
        ] {
            let once = clean_scientific_name(raw).unwrap();
            let twice = clean_scientific_name(&once).unwrap();
            assert_eq!(once, twice, "clean not idempotent for {raw:?}");
        }
    }

    #[test]
    fn repeated_calls_share_the_compiled_pattern() {
        // The suffix pattern is compiled once and reused; results stay
        // identical call after call.
        let first = clean_scientific_name("Oryza sativa L.");
        for _ in 0..3 {
            assert_eq!(clean_scientific_name("Oryza sativa L."), first);
        }
        assert!(std::ptr::eq(authority_suffix(), authority_suffix()));
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(clean_scientific_name("   "), None);
        assert_eq!(clean_scientific_name(""), None);
    }

    #[test]
    fn genus_is_first_token_of_multiword_name() {
        assert_eq!(
            extract_genus("Oryza sativa L.").as_deref(),
            Some("Oryza")
        );
    }

    #[test]
    fn genus_absent_for_single_token() {
        assert_eq!(extract_genus("Oryza"), None);
        assert_eq!(extract_genus("  Oryza  "), None);
        assert_eq!(extract_genus(""), None);
    }
}
