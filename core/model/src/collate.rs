//! FILENAME: core/model/src/collate.rs
//! PURPOSE: Brazilian-Portuguese-friendly string ordering.
//! CONTEXT: Filter value lists are presented to users sorted. Plain byte
//! ordering puts "Água" after "Zona"; here accented characters sort next to
//! their base letters, case-insensitively, with a code-point fallback so
//! the ordering is total and stable.

use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Strips diacritics via NFKD decomposition.
pub fn fold_diacritics(text: &str) -> String {
    text.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// The primary collation key: lowercased, diacritics folded.
pub fn sort_key(text: &str) -> String {
    fold_diacritics(text).to_lowercase()
}

/// Case-insensitive, diacritic-insensitive comparison with a code-point
/// tie-break so distinct strings never compare equal.
pub fn compare(a: &str, b: &str) -> Ordering {
    match sort_key(a).cmp(&sort_key(b)) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

/// Sorts a list of values in place using the collation above.
pub fn sort_values(values: &mut [String]) {
    values.sort_by(|a, b| compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accented_values_sort_next_to_base_letters() {
        let mut values = vec![
            "Zona Norte".to_string(),
            "Água".to_string(),
            "água mineral".to_string(),
            "Brasília".to_string(),
        ];
        sort_values(&mut values);
        assert_eq!(
            values,
            vec![
                "Água".to_string(),
                "água mineral".to_string(),
                "Brasília".to_string(),
                "Zona Norte".to_string(),
            ]
        );
    }

    #[test]
    fn comparison_is_stable_and_total() {
        assert_eq!(compare("abc", "abc"), Ordering::Equal);
        // Same folded key, different code points: still deterministic.
        assert_ne!(compare("a", "á"), Ordering::Equal);
    }

    #[test]
    fn folding_is_idempotent() {
        let once = fold_diacritics("Execução Orçamentária");
        let twice = fold_diacritics(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "Execucao Orcamentaria");
    }
}
