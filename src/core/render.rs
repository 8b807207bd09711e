//! Renderer module
//!
//! Renders compiled rules as CSS, and records/rules/warnings to jsonl, json
//! or md for the CLI.

use serde::Serialize;
use std::io::Write;

use crate::core::model::{FileRecord, ScanWarning, UtilityRule};

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Jsonl,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "json" => Ok(OutputFormat::Json),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Render configuration combining format and options
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderConfig {
    pub format: OutputFormat,
    pub pretty: bool,
}

impl RenderConfig {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            pretty: false,
        }
    }

    pub fn with_pretty(format: OutputFormat, pretty: bool) -> Self {
        Self { format, pretty }
    }
}

/// One Markdown list line per item
pub trait MarkdownLine {
    fn markdown_line(&self) -> String;
}

impl MarkdownLine for FileRecord {
    fn markdown_line(&self) -> String {
        let tokens: Vec<&str> = self.tokens.iter().map(String::as_str).collect();
        format!("- `{}` ({} tokens): {}", self.path, tokens.len(), tokens.join(" "))
    }
}

impl MarkdownLine for UtilityRule {
    fn markdown_line(&self) -> String {
        let body: Vec<String> = self
            .declarations
            .iter()
            .map(|d| format!("{}: {}", d.property, d.value))
            .collect();
        let mut line = format!("- `{}` → `{}`", self.token, body.join("; "));
        if !self.wrappers.is_empty() {
            line.push_str(&format!(" within `{}`", self.wrappers.join(" ")));
        }
        line
    }
}

impl MarkdownLine for ScanWarning {
    fn markdown_line(&self) -> String {
        format!("- **{}** `{}`: {}", self.code.as_str(), self.path, self.reason)
    }
}

impl MarkdownLine for String {
    fn markdown_line(&self) -> String {
        format!("- `{}`", self)
    }
}

/// Renderer for CLI output
pub struct Renderer {
    config: RenderConfig,
}

impl Renderer {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            config: RenderConfig::new(format),
        }
    }

    pub fn with_config(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render items to a string
    pub fn render<T: Serialize + MarkdownLine>(&self, items: &[T]) -> String {
        match self.config.format {
            OutputFormat::Jsonl => self.render_jsonl(items),
            OutputFormat::Json => self.render_json(items),
            OutputFormat::Markdown => self.render_markdown(items),
        }
    }

    /// Render to a writer
    pub fn render_to<T: Serialize + MarkdownLine, W: Write>(
        &self,
        items: &[T],
        mut writer: W,
    ) -> std::io::Result<()> {
        let output = self.render(items);
        writer.write_all(output.as_bytes())
    }

    fn render_jsonl<T: Serialize>(&self, items: &[T]) -> String {
        items
            .iter()
            .filter_map(|item| {
                if self.config.pretty {
                    serde_json::to_string_pretty(item).ok()
                } else {
                    serde_json::to_string(item).ok()
                }
            })
            .collect::<Vec<_>>()
            .join(if self.config.pretty { "\n\n" } else { "\n" })
    }

    fn render_json<T: Serialize>(&self, items: &[T]) -> String {
        if self.config.pretty {
            serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string())
        } else {
            serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
        }
    }

    fn render_markdown<T: MarkdownLine>(&self, items: &[T]) -> String {
        items
            .iter()
            .map(MarkdownLine::markdown_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Print rules as a stylesheet, in their `source_order`
pub fn render_css(rules: &[UtilityRule], minify: bool) -> String {
    let mut ordered: Vec<&UtilityRule> = rules.iter().collect();
    ordered.sort_by_key(|rule| rule.source_order);

    let blocks: Vec<String> = ordered
        .into_iter()
        .map(|rule| render_rule(rule, minify))
        .collect();

    if minify {
        blocks.concat()
    } else if blocks.is_empty() {
        String::new()
    } else {
        format!("{}\n", blocks.join("\n\n"))
    }
}

fn render_rule(rule: &UtilityRule, minify: bool) -> String {
    if minify {
        let body: String = rule
            .declarations
            .iter()
            .map(|d| format!("{}:{}", d.property, d.value))
            .collect::<Vec<_>>()
            .join(";");
        let mut css = format!("{}{{{}}}", rule.selector, body);
        for wrapper in rule.wrappers.iter().rev() {
            css = format!("{}{{{}}}", wrapper, css);
        }
        return css;
    }

    let depth = rule.wrappers.len();
    let mut css = String::new();
    for (level, wrapper) in rule.wrappers.iter().enumerate() {
        css.push_str(&format!("{}{} {{\n", indent(level), wrapper));
    }
    css.push_str(&format!("{}{} {{\n", indent(depth), rule.selector));
    for declaration in &rule.declarations {
        css.push_str(&format!(
            "{}{}: {};\n",
            indent(depth + 1),
            declaration.property,
            declaration.value
        ));
    }
    css.push_str(&format!("{}}}", indent(depth)));
    for level in (0..depth).rev() {
        css.push_str(&format!("\n{}}}", indent(level)));
    }
    css
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}
