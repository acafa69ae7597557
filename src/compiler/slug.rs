//! Route segment and template identifier derivation.
//!
//! Only ASCII letters and digits survive; every run of anything else is a
//! gap. Two different names can collapse to the same slug, in which case the
//! compiler keeps the one enumerated last.

/// Lowercased fields joined by `-`: `"My Post!"` → `"my-post"`.
pub fn slugify(name: &str) -> String {
    fields(name)
        .map(|f| f.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Fields of all parts joined by `_`, case preserved:
/// `["/blog", "latest"]` → `"blog_latest"`.
pub fn template_name(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| fields(part))
        .collect::<Vec<_>>()
        .join("_")
}

fn fields(s: &str) -> impl Iterator<Item = &str> {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|field| !field.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Post!"), "my-post");
        assert_eq!(slugify("2024-01-15 Hello, World"), "2024-01-15-hello-world");
        assert_eq!(slugify("--a__b--"), "a-b");
        assert_eq!(slugify("über"), "ber");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_template_name() {
        assert_eq!(template_name(&["/blog", "latest"]), "blog_latest");
        assert_eq!(template_name(&["", "News Feed"]), "News_Feed");
    }
}
