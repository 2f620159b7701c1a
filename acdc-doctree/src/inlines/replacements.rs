use crate::model::Replacement;

/// Textual replacements in match order. Longer sources come before their prefixes.
const REPLACEMENTS: [(&str, Replacement); 9] = [
    ("(C)", Replacement::Copyright),
    ("(R)", Replacement::Registered),
    ("(TM)", Replacement::Trademark),
    ("...", Replacement::Ellipsis),
    ("->", Replacement::RightArrow),
    ("<-", Replacement::LeftArrow),
    ("=>", Replacement::RightDoubleArrow),
    ("<=", Replacement::LeftDoubleArrow),
    ("--", Replacement::EmDash),
];

/// The replacement `text` starts with. Context checks (em dash) are the caller's.
pub(crate) fn match_replacement(text: &str) -> Option<(&'static str, Replacement)> {
    REPLACEMENTS
        .iter()
        .find(|(source, _)| text.starts_with(source))
        .copied()
}

/// A named (`&amp;`), decimal (`&#169;`) or hexadecimal (`&#x2022;`) entity at the
/// start of `text`.
pub(crate) fn match_entity(text: &str) -> Option<&str> {
    let body = text.strip_prefix('&')?;
    let end = body.find(';')?;
    let name = body.get(..end)?;
    let valid = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(decimal) = name.strip_prefix('#') {
        !decimal.is_empty() && decimal.chars().all(|c| c.is_ascii_digit())
    } else {
        name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            && name.chars().all(|c| c.is_ascii_alphanumeric())
    };
    valid.then(|| text.get(..end + 2)).flatten()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[rstest::rstest]
    #[case("&amp; rest", Some("&amp;"))]
    #[case("&#169;", Some("&#169;"))]
    #[case("&#x2022;x", Some("&#x2022;"))]
    #[case("& nope;", None)]
    #[case("&#xZZ;", None)]
    #[case("&amp", None)]
    fn entities(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(match_entity(text), expected);
    }

    #[test]
    fn longest_match_first() {
        assert_eq!(match_replacement("(TM)"), Some(("(TM)", Replacement::Trademark)));
        assert_eq!(match_replacement("->x"), Some(("->", Replacement::RightArrow)));
        assert_eq!(match_replacement("(c)"), None);
    }
}
