// allergy safety check
// a plain substring test - catches the declared trigger but not synonyms
// or plural forms, and "egg" will also flag "eggplant"

/// Decide whether an item is safe to show to a user with the given allergy.
///
/// An item with no allergen tags, or tagged with the literal sentinel
/// `"None"`, is always safe. Otherwise the item is unsafe when the user's
/// trigger appears anywhere in the tag string, compared case-insensitively.
pub fn is_safe(user_allergy: &str, item_allergens: Option<&str>) -> bool {
    let tags = match item_allergens {
        None | Some("") | Some("None") => return true,
        Some(t) => t,
    };

    // a user with no declared trigger has nothing to match against
    if user_allergy.is_empty() {
        return true;
    }

    !tags.to_lowercase().contains(&user_allergy.to_lowercase())
}
