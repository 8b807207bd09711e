//! Utility catalog - maps base utility names and variants to CSS
//!
//! The engine only ever sees an already-built catalog through the
//! [`Catalog`] trait. [`StaticCatalog`] is the JSON-backed implementation
//! and [`StaticCatalog::builtin`] a small default set.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::error::CompileError;
use crate::core::model::Declaration;
use crate::core::util::{hash_bytes, HashAlgorithm};

/// A base utility resolved against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Declaration index of the utility in the catalog
    pub order: usize,
    pub declarations: Vec<Declaration>,
}

/// How a variant changes a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    /// Appended to the selector, e.g. `:hover`
    Pseudo(String),
    /// Wraps the rule in `@media <query>`
    Media(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDef {
    pub name: String,
    #[serde(flatten)]
    pub kind: VariantKind,
}

/// A variant resolved against the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMatch {
    /// Declaration index of the variant in the catalog
    pub order: usize,
    pub kind: VariantKind,
}

/// Catalog lookups used by the compiler
pub trait Catalog: Send + Sync {
    /// Resolve a base utility (no variants, no `!`), longest match first
    fn utility(&self, base: &str) -> Option<Resolved>;

    fn variant(&self, name: &str) -> Option<VariantMatch>;

    /// Number of utility definitions; arbitrary properties sort after all of them
    fn utility_count(&self) -> usize;
}

/// Numeric scale `n * step` with `unit`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacingScale {
    #[serde(default = "default_step")]
    pub step: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Accept `a/b` fractions as percentages
    #[serde(default)]
    pub fractions: bool,
}

fn default_step() -> f64 {
    0.25
}

fn default_unit() -> String {
    "rem".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SpacingScale {
    fn default() -> Self {
        Self {
            step: default_step(),
            unit: default_unit(),
            fractions: false,
        }
    }
}

/// One utility definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum UtilityDef {
    /// Exact name, fixed declarations
    Static {
        name: String,
        declarations: Vec<Declaration>,
    },
    /// `name-<value>`: every property gets the resolved value
    Functional {
        name: String,
        properties: Vec<String>,
        #[serde(default)]
        named: BTreeMap<String, String>,
        #[serde(default)]
        spacing: Option<SpacingScale>,
        #[serde(default)]
        negative: bool,
        #[serde(default = "default_true")]
        arbitrary: bool,
    },
}

impl UtilityDef {
    pub fn name(&self) -> &str {
        match self {
            UtilityDef::Static { name, .. } | UtilityDef::Functional { name, .. } => name,
        }
    }
}

/// On-disk catalog document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub utilities: Vec<UtilityDef>,
    #[serde(default)]
    pub variants: Vec<VariantDef>,
}

/// Ordered, in-memory catalog
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    utilities: Vec<UtilityDef>,
    by_name: BTreeMap<String, Vec<usize>>,
    variants: BTreeMap<String, VariantMatch>,
}

impl StaticCatalog {
    pub fn new(document: CatalogDocument) -> Result<Self, CompileError> {
        let mut by_name: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, utility) in document.utilities.iter().enumerate() {
            let name = utility.name();
            if name.is_empty() || name.starts_with('-') || name.contains(':') {
                return Err(CompileError::InvalidCatalog(format!(
                    "invalid utility name `{}` at index {}",
                    name, idx
                )));
            }
            if let UtilityDef::Functional {
                properties,
                spacing,
                ..
            } = utility
            {
                if properties.is_empty() {
                    return Err(CompileError::InvalidCatalog(format!(
                        "functional utility `{}` has no properties",
                        name
                    )));
                }
                if spacing.as_ref().is_some_and(|s| !(s.step.is_finite() && s.step > 0.0)) {
                    return Err(CompileError::InvalidCatalog(format!(
                        "functional utility `{}` has a non-positive spacing step",
                        name
                    )));
                }
            }
            by_name.entry(name.to_string()).or_default().push(idx);
        }

        let mut variants = BTreeMap::new();
        for (order, variant) in document.variants.into_iter().enumerate() {
            if variant.name.is_empty() || variant.name.contains(':') {
                return Err(CompileError::InvalidCatalog(format!(
                    "invalid variant name `{}`",
                    variant.name
                )));
            }
            // First definition of a name wins, like utilities
            variants.entry(variant.name).or_insert(VariantMatch {
                order,
                kind: variant.kind,
            });
        }

        Ok(Self {
            utilities: document.utilities,
            by_name,
            variants,
        })
    }

    /// Parse a JSON catalog document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::new(document).map_err(|e| serde::de::Error::custom(e.to_string()))
    }

    /// Built-in default catalog
    pub fn builtin() -> Arc<StaticCatalog> {
        Arc::clone(&BUILTIN)
    }

    fn resolve_functional(&self, idx: usize, value: &str, negative: bool) -> Option<Resolved> {
        let UtilityDef::Functional {
            properties,
            named,
            spacing,
            negative: allows_negative,
            arbitrary,
            ..
        } = &self.utilities[idx]
        else {
            return None;
        };
        if negative && !allows_negative {
            return None;
        }

        let resolved = if let Some(inner) = arbitrary_value(value) {
            if !arbitrary {
                return None;
            }
            if negative {
                format!("calc({} * -1)", inner)
            } else {
                inner
            }
        } else if let Some(named_value) = named.get(value) {
            if negative {
                return None;
            }
            named_value.clone()
        } else {
            let scale = spacing.as_ref()?;
            let scaled = scale_value(scale, value)?;
            if negative && scaled != "0" {
                format!("-{}", scaled)
            } else {
                scaled
            }
        };

        Some(Resolved {
            order: idx,
            declarations: properties
                .iter()
                .map(|property| Declaration::new(property.as_str(), resolved.as_str()))
                .collect(),
        })
    }
}

impl Catalog for StaticCatalog {
    fn utility(&self, base: &str) -> Option<Resolved> {
        let (negative, base) = match base.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, base),
        };
        if base.is_empty() {
            return None;
        }

        if !negative {
            if let Some(indices) = self.by_name.get(base) {
                for &idx in indices {
                    if let UtilityDef::Static { declarations, .. } = &self.utilities[idx] {
                        return Some(Resolved {
                            order: idx,
                            declarations: declarations.clone(),
                        });
                    }
                }
            }
        }

        // Longest prefix first: `text-red-500` tries `text-red`, then `text`
        let dashes: Vec<usize> = base
            .char_indices()
            .filter(|(i, ch)| *ch == '-' && *i > 0 && !inside_brackets(base, *i))
            .map(|(i, _)| i)
            .collect();
        for &split in dashes.iter().rev() {
            let (name, value) = (&base[..split], &base[split + 1..]);
            if value.is_empty() {
                continue;
            }
            if let Some(indices) = self.by_name.get(name) {
                for &idx in indices {
                    if let Some(resolved) = self.resolve_functional(idx, value, negative) {
                        return Some(resolved);
                    }
                }
            }
        }
        None
    }

    fn variant(&self, name: &str) -> Option<VariantMatch> {
        self.variants.get(name).cloned()
    }

    fn utility_count(&self) -> usize {
        self.utilities.len()
    }
}

fn inside_brackets(text: &str, idx: usize) -> bool {
    let before = &text[..idx];
    before.matches('[').count() > before.matches(']').count()
}

/// `[value]` → `value` with `_` as space
fn arbitrary_value(value: &str) -> Option<String> {
    let inner = value.strip_prefix('[')?.strip_suffix(']')?;
    if inner.trim().is_empty() {
        return None;
    }
    Some(inner.replace('_', " "))
}

/// `4`, `0.5`, `10`; not `4.`, `.5`, `02` or `1.2.3`.
fn is_plain_number(value: &str) -> bool {
    let (int, frac) = match value.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (value, None),
    };
    let digits = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit());
    if !digits(int) || (int.len() > 1 && int.starts_with('0')) {
        return false;
    }
    frac.map_or(true, digits)
}

fn scale_value(scale: &SpacingScale, value: &str) -> Option<String> {
    if value == "px" {
        return Some("1px".to_string());
    }

    if scale.fractions {
        if let Some((num, den)) = value.split_once('/') {
            let whole = |part: &str| is_plain_number(part) && !part.contains('.');
            if !whole(num) || !whole(den) {
                return None;
            }
            let num: u32 = num.parse().ok()?;
            let den: u32 = den.parse().ok()?;
            if den == 0 {
                return None;
            }
            let percent = f64::from(num) / f64::from(den) * 100.0;
            return Some(format!("{}%", format_number(percent)));
        }
    }

    if !is_plain_number(value) {
        return None;
    }
    let number: f64 = value.parse().ok()?;
    // Only quarter steps are part of the scale
    if (number * 4.0).fract() != 0.0 {
        return None;
    }
    if number == 0.0 {
        return Some("0".to_string());
    }
    Some(format!("{}{}", format_number(number * scale.step), scale.unit))
}

fn format_number(value: f64) -> String {
    let text = format!("{:.6}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    text.to_string()
}

/// Source of the catalog for a cycle
pub trait CatalogSource: Send + Sync {
    fn load(&self) -> Result<Arc<dyn Catalog>, CompileError>;
}

/// Always returns the same in-memory catalog
#[derive(Clone)]
pub struct StaticCatalogSource {
    catalog: Arc<dyn Catalog>,
}

impl StaticCatalogSource {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    pub fn builtin() -> Self {
        Self::new(StaticCatalog::builtin())
    }
}

impl CatalogSource for StaticCatalogSource {
    fn load(&self) -> Result<Arc<dyn Catalog>, CompileError> {
        Ok(Arc::clone(&self.catalog))
    }
}

/// Reads a JSON catalog from disk on every cycle, reparsing only when the
/// file content changed.
pub struct FileCatalogSource {
    path: PathBuf,
    parsed: Mutex<Option<(String, Arc<StaticCatalog>)>>,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            parsed: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogSource for FileCatalogSource {
    fn load(&self) -> Result<Arc<dyn Catalog>, CompileError> {
        let bytes = fs::read(&self.path).map_err(|source| CompileError::CatalogUnavailable {
            path: self.path.clone(),
            source,
        })?;
        let fingerprint = hash_bytes(&bytes, HashAlgorithm::Xxh3);

        let mut parsed = self
            .parsed
            .lock()
            .map_err(|_| CompileError::InvalidCatalog("catalog cache poisoned".to_string()))?;
        if let Some((cached, catalog)) = parsed.as_ref() {
            if *cached == fingerprint {
                let catalog: Arc<dyn Catalog> = catalog.clone();
                return Ok(catalog);
            }
        }

        let text = String::from_utf8_lossy(&bytes);
        let catalog = Arc::new(StaticCatalog::from_json(&text).map_err(|source| {
            CompileError::CatalogCorrupt {
                path: self.path.clone(),
                source,
            }
        })?);
        *parsed = Some((fingerprint, Arc::clone(&catalog)));
        tracing::debug!(path = %self.path.display(), "catalog loaded");
        Ok(catalog)
    }
}

static BUILTIN: Lazy<Arc<StaticCatalog>> = Lazy::new(|| {
    Arc::new(StaticCatalog::new(builtin_document()).expect("Invalid builtin catalog"))
});

const PALETTE: &[(&str, &[(&str, &str)])] = &[
    (
        "slate",
        &[
            ("100", "#f1f5f9"),
            ("300", "#cbd5e1"),
            ("500", "#64748b"),
            ("600", "#475569"),
            ("700", "#334155"),
            ("800", "#1e293b"),
            ("900", "#0f172a"),
        ],
    ),
    (
        "gray",
        &[
            ("100", "#f3f4f6"),
            ("300", "#d1d5db"),
            ("500", "#6b7280"),
            ("700", "#374151"),
            ("900", "#111827"),
        ],
    ),
    (
        "red",
        &[
            ("100", "#fee2e2"),
            ("300", "#fca5a5"),
            ("500", "#ef4444"),
            ("700", "#b91c1c"),
            ("900", "#7f1d1d"),
        ],
    ),
    (
        "green",
        &[
            ("100", "#dcfce7"),
            ("300", "#86efac"),
            ("500", "#22c55e"),
            ("700", "#15803d"),
            ("900", "#14532d"),
        ],
    ),
    (
        "blue",
        &[
            ("100", "#dbeafe"),
            ("300", "#93c5fd"),
            ("500", "#3b82f6"),
            ("700", "#1d4ed8"),
            ("900", "#1e3a8a"),
        ],
    ),
    (
        "cyan",
        &[
            ("100", "#cffafe"),
            ("300", "#67e8f9"),
            ("500", "#06b6d4"),
            ("700", "#0e7490"),
            ("900", "#164e63"),
        ],
    ),
];

fn colors() -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for (keyword, value) in [
        ("white", "#fff"),
        ("black", "#000"),
        ("transparent", "transparent"),
        ("current", "currentColor"),
    ] {
        map.insert(keyword.to_string(), value.to_string());
    }
    for (family, shades) in PALETTE {
        for (shade, hex) in shades.iter() {
            map.insert(format!("{}-{}", family, shade), hex.to_string());
        }
    }
    map
}

fn named(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn static_util(name: &str, declarations: &[(&str, &str)]) -> UtilityDef {
    UtilityDef::Static {
        name: name.to_string(),
        declarations: declarations
            .iter()
            .map(|(p, v)| Declaration::new(*p, *v))
            .collect(),
    }
}

fn spacing_util(name: &str, properties: &[&str], fractions: bool) -> UtilityDef {
    let margin = matches!(name, "m" | "mx" | "my" | "mt" | "mr" | "mb" | "ml");
    UtilityDef::Functional {
        name: name.to_string(),
        properties: properties.iter().map(|p| p.to_string()).collect(),
        named: if fractions {
            named(&[
                ("auto", "auto"),
                ("full", "100%"),
                ("screen", "100vw"),
                ("min", "min-content"),
                ("max", "max-content"),
                ("fit", "fit-content"),
            ])
        } else if margin {
            named(&[("auto", "auto")])
        } else {
            BTreeMap::new()
        },
        spacing: Some(SpacingScale {
            fractions,
            ..SpacingScale::default()
        }),
        negative: margin || matches!(name, "inset" | "top" | "left"),
        arbitrary: true,
    }
}

fn named_util(name: &str, properties: &[&str], values: BTreeMap<String, String>) -> UtilityDef {
    UtilityDef::Functional {
        name: name.to_string(),
        properties: properties.iter().map(|p| p.to_string()).collect(),
        named: values,
        spacing: None,
        negative: false,
        arbitrary: true,
    }
}

fn builtin_document() -> CatalogDocument {
    let utilities = vec![
        static_util("static", &[("position", "static")]),
        static_util("relative", &[("position", "relative")]),
        static_util("absolute", &[("position", "absolute")]),
        static_util("fixed", &[("position", "fixed")]),
        static_util("sticky", &[("position", "sticky")]),
        spacing_util("inset", &["inset"], true),
        spacing_util("top", &["top"], true),
        spacing_util("left", &["left"], true),
        named_util("z", &["z-index"], named(&[("0", "0"), ("10", "10"), ("20", "20"), ("50", "50"), ("auto", "auto")])),
        spacing_util("m", &["margin"], false),
        spacing_util("mx", &["margin-inline"], false),
        spacing_util("my", &["margin-block"], false),
        spacing_util("mt", &["margin-top"], false),
        spacing_util("mr", &["margin-right"], false),
        spacing_util("mb", &["margin-bottom"], false),
        spacing_util("ml", &["margin-left"], false),
        static_util("block", &[("display", "block")]),
        static_util("inline-block", &[("display", "inline-block")]),
        static_util("inline", &[("display", "inline")]),
        static_util("flex", &[("display", "flex")]),
        static_util("inline-flex", &[("display", "inline-flex")]),
        static_util("grid", &[("display", "grid")]),
        static_util("contents", &[("display", "contents")]),
        static_util("hidden", &[("display", "none")]),
        spacing_util("w", &["width"], true),
        spacing_util("h", &["height"], true),
        spacing_util("min-h", &["min-height"], true),
        spacing_util("max-w", &["max-width"], true),
        static_util("flex-row", &[("flex-direction", "row")]),
        static_util("flex-col", &[("flex-direction", "column")]),
        static_util("flex-wrap", &[("flex-wrap", "wrap")]),
        static_util("items-start", &[("align-items", "flex-start")]),
        static_util("items-center", &[("align-items", "center")]),
        static_util("items-end", &[("align-items", "flex-end")]),
        static_util("justify-start", &[("justify-content", "flex-start")]),
        static_util("justify-center", &[("justify-content", "center")]),
        static_util("justify-end", &[("justify-content", "flex-end")]),
        static_util("justify-between", &[("justify-content", "space-between")]),
        spacing_util("gap", &["gap"], false),
        static_util(
            "truncate",
            &[
                ("overflow", "hidden"),
                ("text-overflow", "ellipsis"),
                ("white-space", "nowrap"),
            ],
        ),
        static_util("rounded", &[("border-radius", "0.25rem")]),
        named_util(
            "rounded",
            &["border-radius"],
            named(&[
                ("none", "0"),
                ("sm", "0.125rem"),
                ("md", "0.375rem"),
                ("lg", "0.5rem"),
                ("xl", "0.75rem"),
                ("full", "9999px"),
            ]),
        ),
        static_util("border", &[("border-width", "1px")]),
        named_util("border", &["border-color"], colors()),
        named_util("bg", &["background-color"], colors()),
        spacing_util("p", &["padding"], false),
        spacing_util("px", &["padding-inline"], false),
        spacing_util("py", &["padding-block"], false),
        spacing_util("pt", &["padding-top"], false),
        spacing_util("pr", &["padding-right"], false),
        spacing_util("pb", &["padding-bottom"], false),
        spacing_util("pl", &["padding-left"], false),
        static_util("text-left", &[("text-align", "left")]),
        static_util("text-center", &[("text-align", "center")]),
        static_util("text-right", &[("text-align", "right")]),
        named_util("font", &["font-family"], named(&[
            ("sans", "ui-sans-serif, system-ui, sans-serif"),
            ("serif", "ui-serif, Georgia, serif"),
            ("mono", "ui-monospace, monospace"),
        ])),
        named_util(
            "text",
            &["font-size"],
            named(&[
                ("xs", "0.75rem"),
                ("sm", "0.875rem"),
                ("base", "1rem"),
                ("lg", "1.125rem"),
                ("xl", "1.25rem"),
                ("2xl", "1.5rem"),
                ("3xl", "1.875rem"),
                ("4xl", "2.25rem"),
            ]),
        ),
        named_util(
            "font",
            &["font-weight"],
            named(&[
                ("thin", "100"),
                ("light", "300"),
                ("normal", "400"),
                ("medium", "500"),
                ("semibold", "600"),
                ("bold", "700"),
                ("black", "900"),
            ]),
        ),
        static_util("uppercase", &[("text-transform", "uppercase")]),
        static_util("italic", &[("font-style", "italic")]),
        named_util("text", &["color"], colors()),
        static_util("underline", &[("text-decoration-line", "underline")]),
        named_util(
            "opacity",
            &["opacity"],
            named(&[("0", "0"), ("50", "0.5"), ("75", "0.75"), ("100", "1")]),
        ),
        static_util("cursor-pointer", &[("cursor", "pointer")]),
    ];

    let variant = |name: &str, kind: VariantKind| VariantDef {
        name: name.to_string(),
        kind,
    };
    let variants = vec![
        variant("first", VariantKind::Pseudo(":first-child".to_string())),
        variant("last", VariantKind::Pseudo(":last-child".to_string())),
        variant("hover", VariantKind::Pseudo(":hover".to_string())),
        variant("focus", VariantKind::Pseudo(":focus".to_string())),
        variant("focus-visible", VariantKind::Pseudo(":focus-visible".to_string())),
        variant("active", VariantKind::Pseudo(":active".to_string())),
        variant("disabled", VariantKind::Pseudo(":disabled".to_string())),
        variant("sm", VariantKind::Media("(min-width: 40rem)".to_string())),
        variant("md", VariantKind::Media("(min-width: 48rem)".to_string())),
        variant("lg", VariantKind::Media("(min-width: 64rem)".to_string())),
        variant("xl", VariantKind::Media("(min-width: 80rem)".to_string())),
        variant("2xl", VariantKind::Media("(min-width: 96rem)".to_string())),
        variant("dark", VariantKind::Media("(prefers-color-scheme: dark)".to_string())),
        variant("print", VariantKind::Media("print".to_string())),
    ];

    CatalogDocument {
        utilities,
        variants,
    }
}
