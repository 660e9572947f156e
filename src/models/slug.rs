//! Name slugging for URI path segments

/// Derive a URI path segment from a display name
///
/// Lowercases the name, folds common Latin accents to ASCII and spells out `&`.
/// Every run of remaining non-alphanumeric characters becomes a single `-`,
/// with no separator at either end.
///
/// # Examples
///
/// ```
/// use compactd::models::slugify;
///
/// assert_eq!(slugify("OK Computer"), "ok-computer");
/// assert_eq!(slugify("Simon & Garfunkel"), "simon-and-garfunkel");
/// ```
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut separator = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let mut folded = String::new();
        if !fold_char(c, &mut folded) {
            separator = true;
            continue;
        }
        if separator && !slug.is_empty() {
            slug.push('-');
        }
        separator = false;
        slug.push_str(&folded);
    }

    slug
}

/// Push the ASCII rendition of a lowercase character, returning false for separators
fn fold_char(c: char, out: &mut String) -> bool {
    let replacement = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ą' => "a",
        'ç' | 'ć' | 'č' => "c",
        'ď' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'ī' => "i",
        'ł' => "l",
        'ñ' | 'ń' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'ř' => "r",
        'ś' | 'š' => "s",
        'ť' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'ß' => "ss",
        'æ' => "ae",
        'œ' => "oe",
        'þ' => "th",
        '&' => "and",
        c if c.is_alphanumeric() => {
            out.push(c);
            return true;
        }
        _ => return false,
    };
    out.push_str(replacement);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_spaces() {
        assert_eq!(slugify("OK Computer"), "ok-computer");
        assert_eq!(slugify("In Rainbows"), "in-rainbows");
    }

    #[test]
    fn test_slug_collapses_symbol_runs() {
        assert_eq!(slugify("AC/DC"), "ac-dc");
        assert_eq!(slugify("LOVE /// DISCONNECT"), "love-disconnect");
        assert_eq!(slugify("Hail to the Thief (2003)"), "hail-to-the-thief-2003");
    }

    #[test]
    fn test_slug_trims_separators() {
        assert_eq!(slugify("  ...Baby One More Time!  "), "baby-one-more-time");
    }

    #[test]
    fn test_slug_folds_accents() {
        assert_eq!(slugify("Sigur Rós"), "sigur-ros");
        assert_eq!(slugify("Beyoncé"), "beyonce");
        assert_eq!(slugify("Straße"), "strasse");
    }

    #[test]
    fn test_slug_ampersand() {
        assert_eq!(slugify("Simon & Garfunkel"), "simon-and-garfunkel");
    }

    #[test]
    fn test_slug_of_symbols_is_empty() {
        assert_eq!(slugify("???"), "");
        assert_eq!(slugify(""), "");
    }
}
