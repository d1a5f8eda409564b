//! SQL text transformation helpers.
//!
//! The generic interface lets callers write positional `?` placeholders;
//! the native layer only binds by name. [`rewrite_placeholders`] bridges
//! the two before statement text ever reaches the native parse primitive.

/// Name stem of generated placeholders.
const PARAM_STEM: &str = "autoparam";

/// SQL text transformed for the native named-placeholder convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenSql {
    /// Transformed SQL text.
    pub text: String,
    /// Generated placeholder names (no leading colon), in occurrence order.
    pub names: Vec<String>,
}

impl RewrittenSql {
    /// Number of positional placeholders that were rewritten.
    pub fn param_count(&self) -> usize {
        self.names.len()
    }
}

/// Replace each unnamed `?` marker with a uniquely named placeholder.
///
/// The first occurrence becomes `:autoparam0`, the second `:autoparam1`,
/// and so on in strict left-to-right order, one occurrence per substitution
/// pass until none remain. Placeholders that are already named pass through
/// untouched, and input with no markers is returned unchanged, so the
/// rewrite is idempotent on its own output.
///
/// Known limitation: the scan is purely textual and does not track quoted
/// string literals, so a `?` inside one is rewritten as well. Callers that
/// need a literal question mark must bind it as a parameter.
pub fn rewrite_placeholders(sql: &str) -> RewrittenSql {
    let mut text = sql.to_string();
    let mut names = Vec::new();
    // Replacement text never contains `?`, so each pass strictly reduces
    // the marker count.
    while let Some(pos) = text.find('?') {
        let name = format!("{}{}", PARAM_STEM, names.len());
        text.replace_range(pos..pos + 1, &format!(":{}", name));
        names.push(name);
    }
    RewrittenSql { text, names }
}

/// Escape embedded quotes by doubling them and wrap the value in quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
