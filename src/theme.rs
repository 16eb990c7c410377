//! Theme colors backed by CSS custom properties
//!
//! The hero page styles its effects through custom properties such as
//! `--greasy-gold`. A [`VariableRegistry`] holds those properties (read from
//! the page's computed style, or from `fryfall.toml`) and expands `var()`
//! references, including `var(--name, fallback)` and nested references.
//!
//! ```
//! use fryfall::theme::{Theme, ThemeSource, VariableRegistry};
//!
//! let mut vars = VariableRegistry::new();
//! vars.define("--greasy-gold", "#ffcc00");
//!
//! let theme = Theme::resolve(&ThemeSource::default(), &vars).unwrap();
//! assert_eq!(theme.gold, image::Rgba([255, 204, 0, 255]));
//! assert_eq!(theme.red, image::Rgba([217, 43, 43, 255])); // fallback
//! ```

use std::collections::{HashMap, HashSet};

use image::Rgba;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{parse_color, ColorError};

/// Error type for variable resolution failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VariableError {
    /// Variable is not defined and no fallback was provided
    #[error("undefined variable '{0}' with no fallback")]
    Undefined(String),
    /// Circular dependency detected in variable resolution
    #[error("circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Unbalanced parentheses in a `var()` reference
    #[error("invalid variable syntax: {0}")]
    InvalidSyntax(String),
    /// Maximum recursion depth exceeded
    #[error("maximum variable resolution depth exceeded")]
    MaxDepthExceeded,
}

/// Error resolving one theme slot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThemeError {
    #[error("theme color '{slot}': {source}")]
    Variable {
        slot: &'static str,
        #[source]
        source: VariableError,
    },
    #[error("theme color '{slot}': {source}")]
    Color {
        slot: &'static str,
        #[source]
        source: ColorError,
    },
}

const MAX_RESOLUTION_DEPTH: usize = 32;

/// Registry of CSS custom properties
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: HashMap<String, String>,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a variable. The `--` prefix is optional.
    pub fn define(&mut self, name: &str, value: &str) {
        self.variables.insert(normalize_name(name), value.trim().to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(&normalize_name(name))
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Expand every `var()` reference in `value`.
    pub fn resolve(&self, value: &str) -> Result<String, VariableError> {
        let mut visiting = Vec::new();
        self.resolve_inner(value, &mut visiting, 0)
    }

    fn resolve_inner(
        &self,
        value: &str,
        visiting: &mut Vec<String>,
        depth: usize,
    ) -> Result<String, VariableError> {
        if depth > MAX_RESOLUTION_DEPTH {
            return Err(VariableError::MaxDepthExceeded);
        }

        let mut result = value.to_string();
        while let Some(reference) = find_var_reference(&result)? {
            let name = normalize_name(&reference.name);
            if visiting.contains(&name) {
                let mut chain = visiting.clone();
                chain.push(name);
                return Err(VariableError::Circular(chain));
            }

            let expanded = match (self.variables.get(&name), reference.fallback) {
                (Some(raw), _) => {
                    visiting.push(name);
                    let expanded = self.resolve_inner(raw, visiting, depth + 1)?;
                    visiting.pop();
                    expanded
                }
                (None, Some(fallback)) => self.resolve_inner(&fallback, visiting, depth + 1)?,
                (None, None) => return Err(VariableError::Undefined(name)),
            };

            result.replace_range(reference.start..reference.end, &expanded);
        }

        Ok(result)
    }
}

struct VarReference {
    start: usize,
    end: usize,
    name: String,
    fallback: Option<String>,
}

fn find_var_reference(s: &str) -> Result<Option<VarReference>, VariableError> {
    let Some(start) = s.find("var(") else {
        return Ok(None);
    };

    let body_start = start + 4;
    let mut depth = 1;
    let mut comma = None;
    let mut close = None;
    for (i, c) in s[body_start..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(body_start + i);
                    break;
                }
            }
            ',' if depth == 1 && comma.is_none() => comma = Some(body_start + i),
            _ => {}
        }
    }

    let close = close.ok_or_else(|| VariableError::InvalidSyntax(s.to_string()))?;
    let (name, fallback) = match comma {
        Some(comma) => {
            (s[body_start..comma].trim().to_string(), Some(s[comma + 1..close].trim().to_string()))
        }
        None => (s[body_start..close].trim().to_string(), None),
    };

    Ok(Some(VarReference { start, end: close + 1, name, fallback }))
}

fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.starts_with("--") {
        trimmed.to_string()
    } else {
        format!("--{}", trimmed)
    }
}

/// Custom properties the page is expected to define
pub const THEME_VARIABLES: [&str; 3] = ["--greasy-gold", "--fry-red", "--white"];

/// Unresolved theme color expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSource {
    /// Fry body, spark tint and debris
    pub gold: String,
    /// Fry tip accent and debris
    pub red: String,
    pub white: String,
    /// Extra custom properties, merged under anything the host defines
    pub vars: HashMap<String, String>,
}

impl Default for ThemeSource {
    fn default() -> Self {
        Self {
            gold: "var(--greasy-gold, #f8b400)".to_string(),
            red: "var(--fry-red, #d92b2b)".to_string(),
            white: "var(--white, #ffffff)".to_string(),
            vars: HashMap::new(),
        }
    }
}

/// Resolved theme colors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub gold: Rgba<u8>,
    pub red: Rgba<u8>,
    pub white: Rgba<u8>,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            gold: Rgba([248, 180, 0, 255]),
            red: Rgba([217, 43, 43, 255]),
            white: Rgba([255, 255, 255, 255]),
        }
    }
}

impl Theme {
    /// Resolve every slot of `source` against `host_vars`.
    ///
    /// Variables from `source.vars` are only used where the host does not
    /// define the same property.
    pub fn resolve(source: &ThemeSource, host_vars: &VariableRegistry) -> Result<Self, ThemeError> {
        let mut vars = VariableRegistry::new();
        for (name, value) in &source.vars {
            vars.define(name, value);
        }
        for (name, value) in &host_vars.variables {
            vars.define(name, value);
        }

        let slot = |slot: &'static str, expr: &str| -> Result<Rgba<u8>, ThemeError> {
            let css = vars.resolve(expr).map_err(|source| ThemeError::Variable { slot, source })?;
            parse_color(&css).map_err(|source| ThemeError::Color { slot, source })
        };

        Ok(Self {
            gold: slot("gold", &source.gold)?,
            red: slot("red", &source.red)?,
            white: slot("white", &source.white)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_normalizes_prefix() {
        let mut reg = VariableRegistry::new();
        reg.define("fry-red", "#d92b2b");
        assert!(reg.contains("--fry-red"));
        assert!(reg.contains("fry-red"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_resolve_plain_value_untouched() {
        let reg = VariableRegistry::new();
        assert_eq!(reg.resolve("#00ff00").unwrap(), "#00ff00");
    }

    #[test]
    fn test_resolve_nested_and_fallback() {
        let mut reg = VariableRegistry::new();
        reg.define("--base", "#101010");
        reg.define("--accent", "var(--base)");

        assert_eq!(reg.resolve("var(--accent)").unwrap(), "#101010");
        assert_eq!(reg.resolve("var(--missing, var(--base))").unwrap(), "#101010");
        assert_eq!(reg.resolve("var(--missing, rgb(1, 2, 3))").unwrap(), "rgb(1, 2, 3)");
    }

    #[test]
    fn test_resolve_undefined_without_fallback() {
        let reg = VariableRegistry::new();
        assert_eq!(
            reg.resolve("var(--nope)"),
            Err(VariableError::Undefined("--nope".to_string()))
        );
    }

    #[test]
    fn test_resolve_detects_cycle() {
        let mut reg = VariableRegistry::new();
        reg.define("--a", "var(--b)");
        reg.define("--b", "var(--a)");
        assert!(matches!(reg.resolve("var(--a)"), Err(VariableError::Circular(_))));
    }

    #[test]
    fn test_resolve_unbalanced() {
        let reg = VariableRegistry::new();
        assert!(matches!(reg.resolve("var(--a"), Err(VariableError::InvalidSyntax(_))));
    }

    #[test]
    fn test_theme_defaults_without_host_vars() {
        let theme = Theme::resolve(&ThemeSource::default(), &VariableRegistry::new()).unwrap();
        assert_eq!(theme, Theme::default());
    }

    #[test]
    fn test_host_vars_win_over_config_vars() {
        let mut source = ThemeSource::default();
        source.vars.insert("--fry-red".to_string(), "#000000".to_string());
        let mut host = VariableRegistry::new();
        host.define("--fry-red", "#ff0000");

        let theme = Theme::resolve(&source, &host).unwrap();
        assert_eq!(theme.red, Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_theme_reports_bad_slot() {
        let source = ThemeSource { gold: "var(--g, nonsense)".to_string(), ..Default::default() };
        let err = Theme::resolve(&source, &VariableRegistry::new()).unwrap_err();
        assert!(matches!(err, ThemeError::Color { slot: "gold", .. }));
        assert!(err.to_string().contains("gold"));
    }
}
