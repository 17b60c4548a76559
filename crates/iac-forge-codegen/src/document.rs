// crates/iac-forge-codegen/src/document.rs
// ============================================================================
// Module: HCL Document Model
// Description: Value objects for expressions, blocks, and titled sections.
// Purpose: Build Terraform text structurally and render it with one formatter.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Generators never concatenate HCL by hand. They build [`Block`] values made
//! of [`Item`]s and group them into [`Section`]s; [`Section::render`] is the
//! only place layout rules live:
//!
//! - consecutive attributes align their `=` on the longest key of the run;
//! - map attributes are separated from their neighbours by a blank line;
//! - nested blocks follow attributes directly;
//! - indentation is two spaces per level.
//!
//! # Invariants
//! - Rendering is a pure function of the value; equal documents render to
//!   equal text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Number;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Banner line that opens and closes every section.
pub const BANNER: &str =
    "##############################################################################";

/// Marker rendered in place of a reference whose target does not exist.
pub const UNFOUND_REF: &str = "ERROR: Unfound Ref";

/// Indentation unit.
const INDENT: &str = "  ";

// ============================================================================
// SECTION: Expressions
// ============================================================================

/// Right-hand side of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Quoted string literal. Interpolations such as `${var.prefix}` are kept.
    Str(String),
    /// Unquoted expression such as `var.region` or `module.x_vpc.crn`.
    Raw(String),
    /// Boolean literal.
    Bool(bool),
    /// Numeric literal.
    Number(Number),
    /// Inline list.
    List(Vec<Self>),
    /// Reference whose target could not be resolved.
    Unfound,
}

impl Expr {
    /// Quoted string literal.
    #[must_use]
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    /// Unquoted expression.
    #[must_use]
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }

    /// Integer literal.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Number(Number::from(value))
    }

    /// List of quoted strings.
    #[must_use]
    pub fn str_list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Self::str).collect())
    }

    /// Converts a stored JSON value; `null` yields `None`.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(flag) => Some(Self::Bool(*flag)),
            Value::Number(number) => Some(Self::Number(number.clone())),
            Value::String(text) => Some(Self::Str(text.clone())),
            Value::Array(items) => Some(Self::List(items.iter().filter_map(Self::from_json).collect())),
            Value::Object(_) => Some(Self::Str(value.to_string())),
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            Self::Str(text) => quote(text, out),
            Self::Raw(text) => out.push_str(text),
            Self::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
            Self::Number(number) => out.push_str(&number.to_string()),
            Self::List(items) => {
                out.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        out.push_str(", ");
                    }
                    item.render(out);
                }
                out.push(']');
            }
            Self::Unfound => quote(UNFOUND_REF, out),
        }
    }
}

fn quote(text: &str, out: &mut String) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
}

// ============================================================================
// SECTION: Blocks
// ============================================================================

/// One entry of a block body.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// `key = value`.
    Attr(String, Expr),
    /// `key = { ... }` with aligned entries.
    Map(String, Vec<(String, Expr)>),
    /// Nested block such as `timeouts { ... }`.
    Block(Block),
}

/// A labelled HCL block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// Block keyword (`resource`, `data`, `module`, `provider`, `timeouts`, ...).
    pub keyword: String,
    /// Quoted labels following the keyword.
    pub labels: Vec<String>,
    /// Body entries in emission order.
    pub body: Vec<Item>,
}

impl Block {
    /// Creates an empty block.
    #[must_use]
    pub fn new(keyword: impl Into<String>, labels: Vec<String>) -> Self {
        Self {
            keyword: keyword.into(),
            labels,
            body: Vec::new(),
        }
    }

    /// `resource "<kind>" "<name>"`.
    #[must_use]
    pub fn resource(kind: &str, name: impl Into<String>) -> Self {
        Self::new("resource", vec![kind.to_string(), name.into()])
    }

    /// `data "<kind>" "<name>"`.
    #[must_use]
    pub fn data(kind: &str, name: impl Into<String>) -> Self {
        Self::new("data", vec![kind.to_string(), name.into()])
    }

    /// `module "<name>"`.
    #[must_use]
    pub fn module(name: impl Into<String>) -> Self {
        Self::new("module", vec![name.into()])
    }

    /// `provider "<name>"`.
    #[must_use]
    pub fn provider(name: &str) -> Self {
        Self::new("provider", vec![name.to_string()])
    }

    /// Unlabelled nested block.
    #[must_use]
    pub fn nested(keyword: &str) -> Self {
        Self::new(keyword, Vec::new())
    }

    /// Appends an attribute.
    #[must_use]
    pub fn attr(mut self, key: &str, value: Expr) -> Self {
        self.body.push(Item::Attr(key.to_string(), value));
        self
    }

    /// Appends an attribute when a value is present.
    #[must_use]
    pub fn attr_opt(self, key: &str, value: Option<Expr>) -> Self {
        match value {
            Some(value) => self.attr(key, value),
            None => self,
        }
    }

    /// Appends a map attribute.
    #[must_use]
    pub fn map(mut self, key: &str, entries: Vec<(String, Expr)>) -> Self {
        self.body.push(Item::Map(key.to_string(), entries));
        self
    }

    /// Appends a nested block.
    #[must_use]
    pub fn block(mut self, block: Self) -> Self {
        self.body.push(Item::Block(block));
        self
    }

    /// Appends a nested block when present.
    #[must_use]
    pub fn block_opt(self, block: Option<Self>) -> Self {
        match block {
            Some(block) => self.block(block),
            None => self,
        }
    }

    /// Renders the block without a trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_at(0, &mut out);
        out
    }

    fn render_at(&self, depth: usize, out: &mut String) {
        let indent = INDENT.repeat(depth);
        out.push_str(&indent);
        out.push_str(&self.keyword);
        for label in &self.labels {
            out.push(' ');
            quote(label, out);
        }
        out.push_str(" {\n");
        render_body(&self.body, depth + 1, out);
        out.push_str(&indent);
        out.push('}');
    }
}

/// `timeouts` block with the given `(operation, duration)` pairs.
#[must_use]
pub fn timeouts(entries: &[(&str, &str)]) -> Block {
    entries.iter().fold(Block::nested("timeouts"), |block, (operation, duration)| {
        block.attr(operation, Expr::str(*duration))
    })
}

fn render_body(items: &[Item], depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    let mut index = 0;
    while index < items.len() {
        match &items[index] {
            Item::Attr(..) => {
                let run: Vec<(&String, &Expr)> = items[index ..]
                    .iter()
                    .map_while(|item| match item {
                        Item::Attr(key, value) => Some((key, value)),
                        Item::Map(..) | Item::Block(_) => None,
                    })
                    .collect();
                render_aligned(&run, &indent, out);
                index += run.len();
            }
            Item::Map(key, entries) => {
                if index > 0 {
                    out.push('\n');
                }
                out.push_str(&indent);
                out.push_str(key);
                out.push_str(" = {\n");
                let run: Vec<(&String, &Expr)> = entries.iter().map(|(key, value)| (key, value)).collect();
                render_aligned(&run, &INDENT.repeat(depth + 1), out);
                out.push_str(&indent);
                out.push_str("}\n");
                if index + 1 < items.len() {
                    out.push('\n');
                }
                index += 1;
            }
            Item::Block(block) => {
                block.render_at(depth, out);
                out.push('\n');
                index += 1;
            }
        }
    }
}

fn render_aligned(run: &[(&String, &Expr)], indent: &str, out: &mut String) {
    let width = run.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, value) in run {
        out.push_str(indent);
        out.push_str(key);
        out.push_str(&" ".repeat(width - key.len()));
        out.push_str(" = ");
        value.render(out);
        out.push('\n');
    }
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// A titled group of blocks delimited by banner comments.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Title shown between the opening banners.
    pub title: String,
    /// Blocks in emission order.
    pub blocks: Vec<Block>,
}

impl Section {
    /// Creates a section.
    #[must_use]
    pub fn new(title: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            title: title.into(),
            blocks,
        }
    }

    /// Returns `None` when there are no blocks to emit.
    #[must_use]
    pub fn non_empty(title: impl Into<String>, blocks: Vec<Block>) -> Option<Self> {
        if blocks.is_empty() { None } else { Some(Self::new(title, blocks)) }
    }

    /// Renders the section, ending with a newline after the closing banner.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("{BANNER}\n# {}\n{BANNER}\n", self.title);
        for block in &self.blocks {
            out.push('\n');
            out.push_str(&block.render());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(BANNER);
        out.push('\n');
        out
    }
}

/// Renders sections separated by one blank line; `None` when there are none.
#[must_use]
pub fn render_sections<I>(sections: I) -> Option<String>
where
    I: IntoIterator<Item = Section>,
{
    let rendered: Vec<String> = sections.into_iter().map(|section| section.render()).collect();
    if rendered.is_empty() { None } else { Some(rendered.join("\n")) }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
