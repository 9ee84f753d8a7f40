//! URL-safe slugs derived from human-readable names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Derive a URL-safe slug from a human-readable string.
///
/// Lowercases the input, folds common Latin diacritics to ASCII, collapses
/// every run of non-alphanumeric characters to a single hyphen and trims
/// leading/trailing hyphens. The result may be empty if the input contains
/// no alphanumeric characters at all.
///
/// Idempotent: `slugify(slugify(x)) == slugify(x)`.
///
/// ```
/// use dele_dzina_core::slugify;
///
/// assert_eq!(slugify("Pull Premium"), "pull-premium");
/// assert_eq!(slugify("Déjà Vu!!"), "deja-vu");
/// ```
#[must_use]
pub fn slugify(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_hyphen = false;

    for c in value.chars().flat_map(fold_diacritic) {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// Fold a single accented Latin character to its ASCII base letters.
///
/// Covers Latin-1 Supplement and the ligatures that show up in product
/// titles. Characters outside the table pass through unchanged (and are
/// then dropped by `slugify` unless alphanumeric).
fn fold_diacritic(c: char) -> impl Iterator<Item = char> {
    let folded: &'static str = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        'ç' | 'Ç' => "c",
        'ñ' | 'Ñ' => "n",
        'æ' | 'Æ' => "ae",
        'œ' | 'Œ' => "oe",
        'ß' => "ss",
        _ => {
            return FoldChars::Single(Some(c));
        }
    };
    FoldChars::Str(folded.chars())
}

enum FoldChars {
    Single(Option<char>),
    Str(core::str::Chars<'static>),
}

impl Iterator for FoldChars {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        match self {
            Self::Single(c) => c.take(),
            Self::Str(chars) => chars.next(),
        }
    }
}

/// A non-empty slug, used as the product identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Slugify `value`, returning `None` if the result is empty.
    #[must_use]
    pub fn new(value: &str) -> Option<Self> {
        let slug = slugify(value);
        if slug.is_empty() { None } else { Some(Self(slug)) }
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Slug` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
