//! Configuration rendering.
//!
//! The intended configuration is rendered once per run from a Handlebars
//! template and a [`VariableTree`], then written to disk so that every
//! driver can load the same file as its merge candidate.

use std::fs;
use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use indexmap::IndexMap;
use log::{debug, info};

use crate::error::{Error, Result, TemplateError};

/// Template variables: config name → ordered list of variable mappings.
///
/// ```yaml
/// loopbacks:
///   - interface_name: lo1
///     ip: 2.2.2.2
///     subnet: 255.255.255.255
/// ```
pub type VariableTree = IndexMap<String, Vec<IndexMap<String, serde_yaml::Value>>>;

/// Load a variable tree from `dir/file`.
pub fn load_variables(dir: &Path, file: &str) -> Result<VariableTree> {
    let path = dir.join(file);
    let text = fs::read_to_string(&path).map_err(|source| TemplateError::VariablesRead {
        path: path.clone(),
        source,
    })?;
    let tree: VariableTree = serde_yaml::from_str(&text)
        .map_err(|source| TemplateError::VariablesParse { path: path.clone(), source })?;
    debug!("loaded {} variable groups from {}", tree.len(), path.display());
    Ok(tree)
}

/// Where the rendered configuration is written.
pub fn output_path(dir: &Path, file: &str) -> PathBuf {
    dir.join(file)
}

/// Renders templates from one directory.
pub struct TemplateRenderer {
    template_dir: PathBuf,
    handlebars: Handlebars<'static>,
}

impl TemplateRenderer {
    /// Create a renderer over `template_dir`. Missing variables are errors.
    pub fn new(template_dir: impl Into<PathBuf>) -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        // Config text is not HTML.
        handlebars.register_escape_fn(handlebars::no_escape);
        Self {
            template_dir: template_dir.into(),
            handlebars,
        }
    }

    /// The template directory.
    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    fn ensure_registered(&mut self, name: &str) -> Result<()> {
        if self.handlebars.has_template(name) {
            return Ok(());
        }
        let path = self.template_dir.join(name);
        self.handlebars
            .register_template_file(name, &path)
            .map_err(|source| TemplateError::Load {
                name: name.to_string(),
                source: Box::new(source),
            })?;
        Ok(())
    }

    /// Render template `name` with `variables` as its context.
    pub fn render(&mut self, name: &str, variables: &VariableTree) -> Result<String> {
        self.ensure_registered(name)?;
        let text = self
            .handlebars
            .render(name, variables)
            .map_err(|source| TemplateError::Render {
                name: name.to_string(),
                source: Box::new(source),
            })?;
        Ok(text)
    }
}

/// The rendered configuration and the file it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedConfig {
    text: String,
    path: PathBuf,
}

impl RenderedConfig {
    /// Write `text` to `dir/file`, creating directories as needed.
    pub fn write(text: String, dir: &Path, file: &str) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| Error::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = output_path(dir, file);
        fs::write(&path, &text).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        info!("rendered config written to {}", path.display());
        Ok(Self { text, path })
    }

    /// Rendered text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// File the text was written to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file back from disk.
    pub fn read_back(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })
    }
}
