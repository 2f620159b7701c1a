//! Tagged regions (`tag::name[]` ... `end::name[]`) selected by `tag=` / `tags=`.

/// One entry of a `tags=` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Filter {
    Include(String),
    Exclude(String),
    /// `*`: every tagged region.
    Wildcard,
    /// `**`: every line, tagged or not.
    DoubleWildcard,
    /// `!*`: only lines outside any tagged region.
    Untagged,
}

impl Filter {
    pub(crate) fn parse(tag: &str) -> Self {
        match tag.trim() {
            "**" => Filter::DoubleWildcard,
            "*" => Filter::Wildcard,
            "!*" => Filter::Untagged,
            tag => match tag.strip_prefix('!') {
                Some(name) => Filter::Exclude(name.to_string()),
                None => Filter::Include(tag.to_string()),
            },
        }
    }

    /// Parses a `tags=` value, which separates names with `;` or `,`.
    pub(crate) fn parse_list(value: &str) -> Vec<Self> {
        value
            .split([';', ','])
            .filter(|tag| !tag.trim().is_empty())
            .map(Filter::parse)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker<'a> {
    Start(&'a str),
    End(&'a str),
}

/// Finds a `tag::name[]` or `end::name[]` marker anywhere in the line, typically
/// behind a comment prefix. The keyword must not be glued to a preceding word.
fn marker(line: &str) -> Option<Marker<'_>> {
    for keyword in ["tag::", "end::"] {
        let Some(position) = line.find(keyword) else {
            continue;
        };
        let glued = line
            .get(..position)
            .and_then(|before| before.chars().last())
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if glued {
            continue;
        }
        let after = line.get(position + keyword.len()..).unwrap_or_default();
        let Some(close) = after.find("[]") else {
            continue;
        };
        let name = after.get(..close).unwrap_or_default();
        if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == '[' || c == ']') {
            continue;
        }
        return Some(if keyword == "tag::" {
            Marker::Start(name)
        } else {
            Marker::End(name)
        });
    }
    None
}

struct Selection<'f> {
    filters: &'f [Filter],
    tagged_default: bool,
    untagged: bool,
}

impl<'f> Selection<'f> {
    fn new(filters: &'f [Filter]) -> Self {
        let double = filters.contains(&Filter::DoubleWildcard);
        let only_exclusions = filters
            .iter()
            .all(|filter| matches!(filter, Filter::Exclude(_) | Filter::Untagged));
        let untagged = double || only_exclusions;
        Self {
            filters,
            tagged_default: double || (only_exclusions && !filters.contains(&Filter::Untagged)),
            untagged,
        }
    }

    fn decide(&self, tag: &str) -> Option<bool> {
        let mut wildcard = None;
        for filter in self.filters {
            match filter {
                Filter::Include(name) if name == tag => return Some(true),
                Filter::Exclude(name) if name == tag => return Some(false),
                Filter::Wildcard => wildcard = Some(true),
                Filter::Include(_)
                | Filter::Exclude(_)
                | Filter::DoubleWildcard
                | Filter::Untagged => {}
            }
        }
        wildcard
    }

    /// Inclusion of a line given the currently open tags, innermost last.
    fn includes(&self, open: &[&str]) -> bool {
        if open.is_empty() {
            return self.untagged;
        }
        open.iter()
            .rev()
            .find_map(|tag| self.decide(tag))
            .unwrap_or(self.tagged_default)
    }
}

/// Keeps the lines selected by `filters`, dropping every tag marker line.
pub(crate) fn select_tagged<T: AsRef<str>>(lines: Vec<T>, filters: &[Filter]) -> Vec<T> {
    let selection = Selection::new(filters);
    let mut open: Vec<String> = Vec::new();
    let mut selected = Vec::with_capacity(lines.len());
    for line in lines {
        match marker(line.as_ref()) {
            Some(Marker::Start(name)) => open.push(name.to_string()),
            Some(Marker::End(name)) => match open.iter().rposition(|tag| tag == name) {
                Some(position) => {
                    open.truncate(position);
                }
                None => tracing::warn!(tag = name, "mismatched end tag in include"),
            },
            None => {
                let names: Vec<&str> = open.iter().map(String::as_str).collect();
                if selection.includes(&names) {
                    selected.push(line);
                }
            }
        }
    }
    for tag in open {
        tracing::warn!(%tag, "unclosed tag region in include");
    }
    selected
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn source() -> Vec<String> {
        [
            "preamble",
            "# tag::intro[]",
            "intro line",
            "// tag::detail[]",
            "detail line",
            "// end::detail[]",
            "# end::intro[]",
            "between",
            "<!-- tag::outro[] -->",
            "outro line",
            "<!-- end::outro[] -->",
        ]
        .iter()
        .map(ToString::to_string)
        .collect()
    }

    #[rstest::rstest]
    #[case("intro", &["intro line", "detail line"])]
    #[case("intro;!detail", &["intro line"])]
    #[case("detail", &["detail line"])]
    #[case("*", &["intro line", "detail line", "outro line"])]
    #[case("**", &["preamble", "intro line", "detail line", "between", "outro line"])]
    #[case("!*", &["preamble", "between"])]
    #[case("!intro", &["preamble", "between", "outro line"])]
    #[case("intro,outro", &["intro line", "detail line", "outro line"])]
    fn selects_regions(#[case] tags: &str, #[case] expected: &[&str]) {
        let filters = Filter::parse_list(tags);
        assert_eq!(select_tagged(source(), &filters), expected);
    }

    #[test]
    fn markers_need_a_word_boundary() {
        assert_eq!(marker("atag::x[]"), None);
        assert_eq!(marker("-tag::x[]"), Some(Marker::Start("x")));
        assert_eq!(marker("// end::x[]"), Some(Marker::End("x")));
        assert_eq!(marker("// tag::[]"), None);
        assert_eq!(marker("// tag::a b[]"), None);
    }
}
