//! URL slugs for SEO aliases and label ids.
//!
//! Vietnamese and common Latin diacritics are folded to ASCII, everything
//! else that is not alphanumeric becomes a single hyphen.

/// Fold a single lowercase character to its unaccented ASCII base, if known.
fn fold(c: char) -> Option<char> {
  const TABLE: &[(&str, char)] = &[
    ("àáạảãâầấậẩẫăằắặẳẵäå", 'a'),
    ("èéẹẻẽêềếệểễë", 'e'),
    ("ìíịỉĩîï", 'i'),
    ("òóọỏõôồốộổỗơờớợởỡöø", 'o'),
    ("ùúụủũưừứựửữûü", 'u'),
    ("ỳýỵỷỹÿ", 'y'),
    ("đ", 'd'),
    ("ç", 'c'),
    ("ñ", 'n'),
  ];
  TABLE
    .iter()
    .find(|(accented, _)| accented.contains(c))
    .map(|(_, base)| *base)
}

/// Word for a symbol that tells label names apart, as in `C`, `C#`, `C++`.
fn spell(c: char) -> Option<&'static str> {
  match c {
    '#' => Some("sharp"),
    '+' => Some("plus"),
    '&' => Some("and"),
    '@' => Some("at"),
    _ => None,
  }
}

/// Convert free text into a lowercase, hyphen-separated ASCII slug.
///
/// Returns an empty string when `text` has no alphanumeric content.
pub fn to_slug(text: &str) -> String { slugify(text, false) }

/// Slug used as a label id. Unlike [`to_slug`], `#`, `+`, `&` and `@` are
/// spelled out, so `C#` and `C++` do not collapse onto `c`.
pub fn to_label_id(text: &str) -> String { slugify(text, true) }

fn slugify(text: &str, spell_symbols: bool) -> String {
  let mut slug = String::with_capacity(text.len());
  let mut pending_hyphen = false;

  for c in text.chars().flat_map(char::to_lowercase) {
    if let Some(word) = spell(c).filter(|_| spell_symbols) {
      if !slug.is_empty() {
        slug.push('-');
      }
      slug.push_str(word);
      pending_hyphen = true;
      continue;
    }
    let c = if c.is_ascii() { Some(c) } else { fold(c) };
    match c {
      Some(c) if c.is_ascii_alphanumeric() => {
        if pending_hyphen && !slug.is_empty() {
          slug.push('-');
        }
        pending_hyphen = false;
        slug.push(c);
      }
      _ => pending_hyphen = true,
    }
  }

  slug
}
