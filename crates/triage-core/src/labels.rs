//! Label conventions for classification write-back.
//!
//! Classified tickets carry `ai-category:<slug>` and `ai-subcategory:<slug>`
//! labels. Jira labels cannot contain spaces, so names are slugged.

/// Prefix of the category label.
pub const CATEGORY_PREFIX: &str = "ai-category:";

/// Prefix of the sub-category label.
pub const SUBCATEGORY_PREFIX: &str = "ai-subcategory:";

/// Marker label added to every triaged ticket.
pub const TRIAGED_LABEL: &str = "ai-triaged";

/// Lowercase a name and replace whitespace runs with single hyphens.
pub fn slug(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

pub fn category_label(category: &str) -> String {
    format!("{}{}", CATEGORY_PREFIX, slug(category))
}

pub fn subcategory_label(sub_category: &str) -> String {
    format!("{}{}", SUBCATEGORY_PREFIX, slug(sub_category))
}

/// Whether a label was produced by a previous classification.
pub fn is_classification_label(label: &str) -> bool {
    label.starts_with(CATEGORY_PREFIX) || label.starts_with(SUBCATEGORY_PREFIX)
}

/// Replace any previous classification labels with the given category pair.
///
/// Unrelated labels keep their original order; duplicates are dropped.
pub fn merge_classification_labels(
    existing: &[String],
    category: &str,
    sub_category: &str,
) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(existing.len() + 3);
    for label in existing {
        if !is_classification_label(label) && !labels.contains(label) {
            labels.push(label.clone());
        }
    }
    for label in [
        category_label(category),
        subcategory_label(sub_category),
        TRIAGED_LABEL.to_string(),
    ] {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}
