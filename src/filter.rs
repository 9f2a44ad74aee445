/// Sentinel filter value that disables a categorical predicate.
pub const ALL: &str = "all";

/// Case-insensitive substring match over one or more string fields. An empty
/// term matches everything.
pub fn matches_search(term: &str, fields: &[&str]) -> bool {
    let needle = term.to_lowercase();
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Exact-equality match on a categorical field. A missing selection or the
/// `"all"` sentinel disables the predicate.
pub fn matches_choice(selected: Option<&str>, actual: &str) -> bool {
    match selected {
        None => true,
        Some(choice) if choice == ALL => true,
        Some(choice) => choice == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Donor {
        name: &'static str,
        email: &'static str,
        status: &'static str,
    }

    const DONORS: [Donor; 2] = [
        Donor {
            name: "John Smith",
            email: "john@email.com",
            status: "active",
        },
        Donor {
            name: "Sarah Lee",
            email: "sarah@email.com",
            status: "inactive",
        },
    ];

    #[test]
    fn search_is_case_insensitive() {
        for term in ["john", "JOHN"] {
            let matched: Vec<&str> = DONORS
                .iter()
                .filter(|d| matches_search(term, &[d.name]))
                .map(|d| d.name)
                .collect();
            assert_eq!(matched, vec!["John Smith"]);
        }
    }

    #[test]
    fn search_spans_multiple_fields() {
        let matched: Vec<&str> = DONORS
            .iter()
            .filter(|d| matches_search("sarah@", &[d.name, d.email]))
            .map(|d| d.name)
            .collect();
        assert_eq!(matched, vec!["Sarah Lee"]);
    }

    #[test]
    fn empty_term_matches_everything() {
        assert!(DONORS.iter().all(|d| matches_search("", &[d.name])));
    }

    #[test]
    fn all_sentinel_disables_choice() {
        assert!(matches_choice(Some(ALL), "active"));
        assert!(matches_choice(None, "active"));
        assert!(matches_choice(Some("active"), "active"));
        assert!(!matches_choice(Some("active"), "inactive"));
    }

    #[test]
    fn combined_predicates_preserve_order() {
        let matched: Vec<&str> = DONORS
            .iter()
            .filter(|d| matches_search("", &[d.name]) && matches_choice(Some("all"), d.status))
            .map(|d| d.name)
            .collect();
        assert_eq!(matched, vec!["John Smith", "Sarah Lee"]);
    }
}
