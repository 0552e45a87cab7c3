//! Fuzzy contact resolution by word-set containment.

use std::collections::HashSet;

use crate::contacts::{Contact, ContactDirectory};

/// Resolve an extracted client name to exactly one contact.
///
/// Tries an exact case-insensitive full-name lookup first, then a token
/// match: a contact qualifies when every whitespace token of the query
/// appears among the tokens of its display name, in any order. A unique
/// qualifier resolves; zero or several qualifiers resolve to nothing —
/// ambiguity is handled manually, never guessed.
pub fn resolve<'d>(directory: &'d ContactDirectory, name: &str) -> Option<&'d Contact> {
    if let Some(contact) = directory.lookup(name) {
        return Some(contact);
    }

    let tokens: Vec<String> = name
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect();
    if tokens.is_empty() {
        return None;
    }

    let mut matched: Option<&Contact> = None;
    for contact in directory.contacts() {
        let contact_tokens: HashSet<String> = contact
            .display_name
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        if tokens.iter().all(|t| contact_tokens.contains(t)) {
            if matched.is_some() {
                log::debug!("ambiguous contact resolution for {name:?}");
                return None;
            }
            matched = Some(contact);
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> ContactDirectory {
        ContactDirectory::from_contacts([
            Contact::with_number("Jane Doe", "0411111111"),
            Contact::with_number("Jane Roe", "0422222222"),
            Contact::with_number("Bob van der Berg", "0433333333"),
        ])
    }

    #[test]
    fn test_exact_full_name_resolves() {
        let dir = directory();
        let contact = resolve(&dir, "Jane Doe").unwrap();
        assert_eq!(contact.most_likely_number.as_deref(), Some("0411111111"));
    }

    #[test]
    fn test_ambiguous_first_name_does_not_resolve() {
        let dir = directory();
        assert!(resolve(&dir, "Jane").is_none());
    }

    #[test]
    fn test_reordered_tokens_resolve() {
        let dir = directory();
        let contact = resolve(&dir, "Doe Jane").unwrap();
        assert_eq!(contact.display_name, "Jane Doe");
    }

    #[test]
    fn test_subset_of_longer_name_resolves() {
        let dir = directory();
        let contact = resolve(&dir, "Bob Berg").unwrap();
        assert_eq!(contact.display_name, "Bob van der Berg");
    }

    #[test]
    fn test_unknown_token_does_not_resolve() {
        let dir = directory();
        assert!(resolve(&dir, "Jane Smith").is_none());
        assert!(resolve(&dir, "").is_none());
    }
}
