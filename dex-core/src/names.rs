//! Display-name canonicalization.
//!
//! The API identifies everything by lowercase, dash-separated slugs
//! (`sheer-will`, `mr-mime`). Entities are stored and looked up under the
//! canonical display form (`Sheer Will`, `Mr Mime`).

/// Upper-case the first character and lower-case the rest.
pub fn proper_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Split on dashes and apply [`proper_word`] to every segment.
///
/// Empty segments are kept, so `a--b` becomes `A  B`.
pub fn split_then_proper_word(slug: &str) -> String {
    slug.split('-').map(proper_word).collect::<Vec<_>>().join(" ")
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Roman generation tag from an API generation slug.
///
/// `generation-vii` becomes `VII`. Slugs without a dash are upper-cased whole.
pub fn generation_tag(slug: &str) -> String {
    match slug.split_once('-') {
        Some((_, numeral)) => numeral.to_uppercase(),
        None => slug.to_uppercase(),
    }
}

/// Numeric value of a roman numeral tag, `None` if it is not one.
pub fn roman_value(tag: &str) -> Option<u32> {
    let digit = |c: char| match c {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        _ => None,
    };

    let digits = tag
        .chars()
        .map(|c| digit(c.to_ascii_uppercase()))
        .collect::<Option<Vec<u32>>>()?;
    if digits.is_empty() {
        return None;
    }

    let mut total = 0;
    for (i, value) in digits.iter().enumerate() {
        match digits.get(i + 1) {
            Some(next) if next > value => total -= *value as i64,
            _ => total += *value as i64,
        }
    }
    u32::try_from(total).ok()
}
