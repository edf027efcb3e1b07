/// Lowercases and collapses runs of whitespace so search terms and titles
/// compare on content only.
pub fn fold_for_search(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn contains_folded(haystack: &str, needle: &str) -> bool {
    let needle = fold_for_search(needle);
    if needle.is_empty() {
        return true;
    }
    fold_for_search(haystack).contains(&needle)
}

/// Strips a trailing `.json` from an upstream resource link to get the
/// human-facing page.
pub fn public_page_url(link: &str) -> String {
    link.strip_suffix(".json").unwrap_or(link).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_dedupes_whitespace() {
        assert_eq!(fold_for_search("  Ban   Fireworks \n"), "ban fireworks");
    }

    #[test]
    fn contains_is_case_insensitive() {
        assert!(contains_folded("Ban the sale of Fireworks", "fireworks"));
        assert!(contains_folded("Ban the  sale", "THE SALE"));
        assert!(!contains_folded("Ban the sale", "buy"));
    }

    #[test]
    fn empty_needle_matches() {
        assert!(contains_folded("anything", "   "));
    }

    #[test]
    fn public_page_drops_json_suffix() {
        assert_eq!(
            public_page_url("https://petition.parliament.uk/petitions/700001.json"),
            "https://petition.parliament.uk/petitions/700001"
        );
    }
}
