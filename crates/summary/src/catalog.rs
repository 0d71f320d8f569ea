//! Template catalog — the fixed instruction texts behind each template kind.
//!
//! The built-in catalog is a TOML document compiled into the binary and
//! parsed once per process. Operators can supply a replacement file; it must
//! define every template kind and both style directives.

use edsum_core::template::{StyleMode, TemplateKind};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::info;

const BUILTIN_TOML: &str = include_str!("templates.toml");

static BUILTIN: OnceLock<Result<Arc<TemplateCatalog>, CatalogError>> = OnceLock::new();

/// Errors from loading a template catalog.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("cannot read template catalog {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("template catalog TOML error: {0}")]
    Parse(String),

    #[error("template catalog has no entry for '{0}'")]
    MissingTemplate(TemplateKind),

    #[error("template catalog names unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("template catalog entry '{0}' is blank")]
    Blank(String),
}

// ── File layout ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CatalogFile {
    version: u32,
    styles: StyleSection,
    #[serde(default)]
    focus: FocusSection,
    templates: HashMap<String, TemplateEntry>,
}

#[derive(Deserialize)]
struct StyleSection {
    bulleted: String,
    narrative: String,
}

#[derive(Deserialize)]
struct FocusSection {
    #[serde(default = "default_focus_header")]
    header: String,
}

impl Default for FocusSection {
    fn default() -> Self {
        Self {
            header: default_focus_header(),
        }
    }
}

fn default_focus_header() -> String {
    "Give particular depth to the following areas, in this order:".into()
}

#[derive(Deserialize)]
struct TemplateEntry {
    body: String,
}

// ── Catalog ───────────────────────────────────────────────────────────────

/// Validated, immutable template texts.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    version: u32,
    bodies: HashMap<TemplateKind, String>,
    bulleted: String,
    narrative: String,
    focus_header: String,
}

impl TemplateCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Result<Arc<TemplateCatalog>, CatalogError> {
        BUILTIN
            .get_or_init(|| TemplateCatalog::from_toml(BUILTIN_TOML).map(Arc::new))
            .clone()
    }

    /// Parse and validate a catalog document.
    pub fn from_toml(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(raw).map_err(|e| CatalogError::Parse(e.to_string()))?;

        let mut bodies = HashMap::new();
        for (name, entry) in file.templates {
            let kind: TemplateKind = name
                .parse()
                .map_err(|_| CatalogError::UnknownTemplate(name.clone()))?;
            non_blank(&entry.body, kind.as_str())?;
            bodies.insert(kind, entry.body.trim().to_string());
        }
        for kind in TemplateKind::ALL {
            if !bodies.contains_key(&kind) {
                return Err(CatalogError::MissingTemplate(kind));
            }
        }

        non_blank(&file.styles.bulleted, "styles.bulleted")?;
        non_blank(&file.styles.narrative, "styles.narrative")?;
        non_blank(&file.focus.header, "focus.header")?;

        Ok(Self {
            version: file.version,
            bodies,
            bulleted: file.styles.bulleted.trim().to_string(),
            narrative: file.styles.narrative.trim().to_string(),
            focus_header: file.focus.header.trim().to_string(),
        })
    }

    /// Load an operator-supplied catalog file.
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|e| CatalogError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let catalog = Self::from_toml(&raw)?;
        info!(path = %path.display(), version = catalog.version, "Loaded template catalog override");
        Ok(catalog)
    }

    /// The override at `path` when given, otherwise the built-in catalog.
    pub fn load(path: Option<&str>) -> Result<Arc<TemplateCatalog>, CatalogError> {
        match path {
            Some(p) => Self::from_file(Path::new(p)).map(Arc::new),
            None => Self::builtin(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Base text for a template kind.
    pub fn body(&self, kind: TemplateKind) -> &str {
        // Presence of every kind is checked in `from_toml`.
        self.bodies.get(&kind).map(String::as_str).unwrap_or_default()
    }

    /// Formatting directive for a style.
    pub fn style_directive(&self, style: StyleMode) -> &str {
        match style {
            StyleMode::Bulleted => &self.bulleted,
            StyleMode::Narrative => &self.narrative,
        }
    }

    /// Lead-in sentence of the focus directive.
    pub fn focus_header(&self) -> &str {
        &self.focus_header
    }
}

fn non_blank(text: &str, what: &str) -> Result<(), CatalogError> {
    if text.trim().is_empty() {
        return Err(CatalogError::Blank(what.to_string()));
    }
    Ok(())
}
