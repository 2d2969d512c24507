//! Inflection - Pluralization and casing helpers used for alias and key naming

/// Pluralization collaborator. Implementations must be pure.
pub trait Inflector: Send + Sync {
    fn pluralize(&self, word: &str) -> String;

    fn singularize(&self, word: &str) -> String;
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
];

const UNCOUNTABLE: &[&str] = &["data", "equipment", "information", "series", "species", "sheep", "fish"];

/// Simple English inflector (suffix rules plus a short irregular table)
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishInflector;

impl EnglishInflector {
    fn irregular(word: &str, singular_to_plural: bool) -> Option<String> {
        let lower = word.to_lowercase();
        IRREGULAR.iter().find_map(|(singular, plural)| {
            let (from, to) = if singular_to_plural {
                (singular, plural)
            } else {
                (plural, singular)
            };
            lower
                .ends_with(from)
                .then(|| format!("{}{}", &word[..word.len() - from.len()], match_case(word, from, to)))
        })
    }

    fn is_uncountable(word: &str) -> bool {
        let lower = word.to_lowercase();
        UNCOUNTABLE.iter().any(|u| lower.ends_with(u))
    }
}

impl Inflector for EnglishInflector {
    fn pluralize(&self, word: &str) -> String {
        if word.is_empty() || Self::is_uncountable(word) {
            return word.to_string();
        }
        if let Some(plural) = Self::irregular(word, true) {
            return plural;
        }

        let lower = word.to_lowercase();
        if lower.ends_with('y') && !ends_with_any(&lower, &["ay", "ey", "iy", "oy", "uy"]) {
            format!("{}ies", &word[..word.len() - 1])
        } else if ends_with_any(&lower, &["s", "sh", "ch", "x", "z"]) {
            format!("{}es", word)
        } else {
            format!("{}s", word)
        }
    }

    fn singularize(&self, word: &str) -> String {
        if word.is_empty() || Self::is_uncountable(word) {
            return word.to_string();
        }
        if let Some(singular) = Self::irregular(word, false) {
            return singular;
        }

        let lower = word.to_lowercase();
        if lower.ends_with("ies") && word.len() > 3 {
            format!("{}y", &word[..word.len() - 3])
        } else if ends_with_any(&lower, &["sses", "ches", "shes", "xes", "zes"]) {
            word[..word.len() - 2].to_string()
        } else if lower.ends_with('s') && !lower.ends_with("ss") && word.len() > 1 {
            word[..word.len() - 1].to_string()
        } else {
            word.to_string()
        }
    }
}

fn ends_with_any(word: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|suffix| word.ends_with(suffix))
}

/// Keep the capitalization of the replaced suffix's first letter
fn match_case(word: &str, from: &str, to: &str) -> String {
    let start = word.len() - from.len();
    let capitalized = word[start..].chars().next().is_some_and(char::is_uppercase);
    if capitalized {
        upper_first(to)
    } else {
        to.to_string()
    }
}

/// Uppercase the first character (`posts` -> `Posts`)
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character (`User` -> `user`)
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join name parts into a camelCase identifier.
///
/// Each part may itself contain underscores: `["User", "id"]` and
/// `["blog_post", "uuid"]` become `userId` and `blogPostUuid`.
pub fn camelize(parts: &[&str]) -> String {
    let mut result = String::new();
    for segment in parts
        .iter()
        .flat_map(|part| part.split('_'))
        .filter(|segment| !segment.is_empty())
    {
        if result.is_empty() {
            result.push_str(&lower_first(segment));
        } else {
            result.push_str(&upper_first(segment));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        let inflector = EnglishInflector;
        assert_eq!(inflector.pluralize("post"), "posts");
        assert_eq!(inflector.pluralize("Category"), "Categories");
        assert_eq!(inflector.pluralize("day"), "days");
        assert_eq!(inflector.pluralize("box"), "boxes");
        assert_eq!(inflector.pluralize("owner"), "owners");
        assert_eq!(inflector.pluralize("Person"), "People");
        assert_eq!(inflector.pluralize("data"), "data");
    }

    #[test]
    fn test_singularize() {
        let inflector = EnglishInflector;
        assert_eq!(inflector.singularize("tags"), "tag");
        assert_eq!(inflector.singularize("Categories"), "Category");
        assert_eq!(inflector.singularize("boxes"), "box");
        assert_eq!(inflector.singularize("addresses"), "address");
        assert_eq!(inflector.singularize("address"), "address");
        assert_eq!(inflector.singularize("people"), "person");
        assert_eq!(inflector.singularize("Children"), "Child");
    }

    #[test]
    fn test_camelize() {
        assert_eq!(camelize(&["User", "id"]), "userId");
        assert_eq!(camelize(&["owner", "id"]), "ownerId");
        assert_eq!(camelize(&["blog_post", "uuid"]), "blogPostUuid");
        assert_eq!(camelize(&["BlogPost", "id"]), "blogPostId");
        assert_eq!(camelize(&[]), "");
    }

    #[test]
    fn test_first_letter_casing() {
        assert_eq!(upper_first("posts"), "Posts");
        assert_eq!(lower_first("Posts"), "posts");
        assert_eq!(upper_first(""), "");
    }
}
