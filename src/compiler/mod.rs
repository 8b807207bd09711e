//! Rule compiler - candidate tokens → ordered utility rules
//!
//! Unresolvable tokens are dropped without error: the extractor is lossy
//! and most candidates are not utilities. The output order depends only on
//! the token set and the catalog, never on the order tokens arrive in.

pub mod catalog;
pub mod variants;

use std::collections::BTreeSet;

use crate::core::model::{Declaration, UtilityRule};

pub use catalog::{Catalog, CatalogSource, FileCatalogSource, StaticCatalog, StaticCatalogSource};
use catalog::VariantKind;
use variants::{arbitrary_property, parse_token};

/// Sort key: catalog order, then variant specificity, then token
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RuleSortKey {
    utility_order: usize,
    variant_count: usize,
    variant_orders: Vec<usize>,
    token: String,
}

/// Compile `tokens` into rules ordered by the catalog.
pub fn compile<I, S>(tokens: I, catalog: &dyn Catalog) -> Vec<UtilityRule>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = tokens
        .into_iter()
        .map(|token| token.as_ref().to_string())
        .collect();

    let mut keyed: Vec<(RuleSortKey, UtilityRule)> = unique
        .iter()
        .filter_map(|token| compile_token(token, catalog))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| a.cmp(b));

    keyed
        .into_iter()
        .enumerate()
        .map(|(order, (_, mut rule))| {
            rule.source_order = order;
            rule
        })
        .collect()
}

/// Compile one token, or `None` if it is not a utility
pub fn compile_one(token: &str, catalog: &dyn Catalog) -> Option<UtilityRule> {
    compile_token(token, catalog).map(|(_, rule)| rule)
}

fn compile_token(token: &str, catalog: &dyn Catalog) -> Option<(RuleSortKey, UtilityRule)> {
    let parsed = parse_token(token)?;

    let mut variant_orders = Vec::with_capacity(parsed.variants.len());
    let mut pseudo = String::new();
    let mut wrappers = Vec::new();
    for name in &parsed.variants {
        let variant = catalog.variant(name)?;
        variant_orders.push(variant.order);
        match variant.kind {
            VariantKind::Pseudo(suffix) => pseudo.push_str(&suffix),
            VariantKind::Media(query) => wrappers.push(format!("@media {}", query)),
        }
    }

    let (utility_order, mut declarations) = match arbitrary_property(parsed.base) {
        Some((property, value)) => (
            catalog.utility_count(),
            vec![Declaration::new(property, value)],
        ),
        None => {
            let resolved = catalog.utility(parsed.base)?;
            (resolved.order, resolved.declarations)
        }
    };

    if parsed.important {
        for declaration in &mut declarations {
            declaration.value.push_str(" !important");
        }
    }

    let key = RuleSortKey {
        utility_order,
        variant_count: variant_orders.len(),
        variant_orders,
        token: token.to_string(),
    };
    let rule = UtilityRule {
        token: token.to_string(),
        selector: format!(".{}{}", escape_selector(token), pseudo),
        declarations,
        wrappers,
        source_order: 0,
    };
    Some((key, rule))
}

/// Escape a class name for use in a CSS selector
pub fn escape_selector(class: &str) -> String {
    let mut escaped = String::with_capacity(class.len() * 2);

    for (idx, ch) in class.chars().enumerate() {
        match ch {
            // Identifiers cannot start with a digit
            '0'..='9' if idx == 0 => escaped.push_str(&format!("\\{:x} ", ch as u32)),
            '\\' | ':' | '/' | '[' | ']' | '(' | ')' | '&' | '>' | '+' | ',' | '%' | '='
            | '!' | '*' | '@' | '#' | '\'' | '"' | '.' | '~' | '$' | '^' | '|' | '?' | '{'
            | '}' | ';' | '<' | '`' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' ' => escaped.push_str("\\ "),
            _ => escaped.push(ch),
        }
    }

    escaped
}
