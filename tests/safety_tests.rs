// tests for the allergy safety check

use allergyguard::is_safe;

#[test]
fn test_no_allergens_is_safe() {
    assert!(is_safe("peanut", None));
}

#[test]
fn test_none_sentinel_is_safe() {
    assert!(is_safe("peanut", Some("None")));
}

#[test]
fn test_empty_tags_is_safe() {
    assert!(is_safe("peanut", Some("")));
}

#[test]
fn test_lowercase_none_is_not_sentinel() {
    // the sentinel is case-sensitive: "none" is an ordinary tag string
    assert!(is_safe("peanut", Some("none")));
}

#[test]
fn test_trigger_in_tags_is_unsafe() {
    assert!(!is_safe("peanut", Some("peanut, tree nuts")));
}

#[test]
fn test_match_is_case_insensitive() {
    assert!(!is_safe("PEANUT", Some("peanut")));
    assert!(!is_safe("peanut", Some("Peanut, Soy")));
}

#[test]
fn test_unrelated_tags_are_safe() {
    assert!(is_safe("soy", Some("dairy, gluten")));
}

#[test]
fn test_substring_false_positive() {
    // known fragility: plain substring matching flags "eggplant" for an
    // "egg" allergy - asserting current behavior, not correctness
    assert!(!is_safe("egg", Some("eggplant")));
}

#[test]
fn test_empty_trigger_is_safe() {
    assert!(is_safe("", Some("dairy, gluten")));
}
