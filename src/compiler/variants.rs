//! Modifier parsing: `md:hover:!p-4` → variants `[md, hover]`, base `p-4`,
//! important.

/// Reserved delimiter between variants and the base utility
pub const VARIANT_SEPARATOR: char = ':';

/// A token split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedToken<'a> {
    pub variants: Vec<&'a str>,
    pub base: &'a str,
    pub important: bool,
}

/// Split `token` on separators that are not inside `[...]` or `(...)`.
///
/// Returns `None` for shapes that can never be a utility: empty variant
/// segments (`a::b`) or an empty base (`hover:`).
pub fn parse_token(token: &str) -> Option<ParsedToken<'_>> {
    let mut paren_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut variants = Vec::new();
    let mut start = 0usize;

    for (idx, ch) in token.char_indices() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            VARIANT_SEPARATOR if paren_depth == 0 && bracket_depth == 0 => {
                let variant = &token[start..idx];
                if variant.is_empty() {
                    return None;
                }
                variants.push(variant);
                start = idx + 1;
            }
            _ => {}
        }
    }

    let mut base = &token[start..];
    let mut important = false;
    if let Some(rest) = base.strip_prefix('!') {
        base = rest;
        important = true;
    } else if let Some(rest) = base.strip_suffix('!') {
        base = rest;
        important = true;
    }

    if base.is_empty() {
        return None;
    }

    Some(ParsedToken {
        variants,
        base,
        important,
    })
}

/// `[property:value]` → `(property, value)` with `_` as space
pub fn arbitrary_property(base: &str) -> Option<(String, String)> {
    let inner = base.strip_prefix('[')?.strip_suffix(']')?;
    let (property, value) = inner.split_once(':')?;
    let valid_property = !property.is_empty()
        && property
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !property.starts_with(|c: char| c.is_ascii_digit());
    if !valid_property || value.trim().is_empty() {
        return None;
    }
    Some((property.to_string(), value.replace('_', " ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_token() {
        let parsed = parse_token("flex").unwrap();
        assert!(parsed.variants.is_empty());
        assert_eq!(parsed.base, "flex");
        assert!(!parsed.important);
    }

    #[test]
    fn test_variants() {
        let parsed = parse_token("md:hover:text-red-500").unwrap();
        assert_eq!(parsed.variants, vec!["md", "hover"]);
        assert_eq!(parsed.base, "text-red-500");
    }

    #[test]
    fn test_separator_inside_brackets_is_not_a_split() {
        let parsed = parse_token("hover:[mask-type:luminance]").unwrap();
        assert_eq!(parsed.variants, vec!["hover"]);
        assert_eq!(parsed.base, "[mask-type:luminance]");

        let parsed = parse_token("bg-[url(a:b)]").unwrap();
        assert!(parsed.variants.is_empty());
    }

    #[test]
    fn test_important() {
        assert!(parse_token("!p-4").unwrap().important);
        assert!(parse_token("md:p-4!").unwrap().important);
        assert_eq!(parse_token("md:!p-4").unwrap().base, "p-4");
    }

    #[test]
    fn test_degenerate_shapes() {
        assert!(parse_token("a--b::c").is_none());
        assert!(parse_token("hover:").is_none());
        assert!(parse_token(":flex").is_none());
        assert!(parse_token("!").is_none());
    }

    #[test]
    fn test_arbitrary_property() {
        assert_eq!(
            arbitrary_property("[mask-type:luminance]"),
            Some(("mask-type".to_string(), "luminance".to_string()))
        );
        assert_eq!(
            arbitrary_property("[grid-template-columns:1fr_2fr]"),
            Some(("grid-template-columns".to_string(), "1fr 2fr".to_string()))
        );
        assert!(arbitrary_property("[#fff]").is_none());
        assert!(arbitrary_property("[Color:red]").is_none());
        assert!(arbitrary_property("[color:]").is_none());
        assert!(arbitrary_property("color:red").is_none());
    }
}
