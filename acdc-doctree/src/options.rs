use std::path::PathBuf;

use acdc_core::{Doctype, SafeMode};

use crate::attributes::AttributeMissing;

const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

/// An attribute passed in by the caller.
///
/// Locked attributes cannot be changed by entries in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerAttribute {
    pub name: String,
    /// `None` unsets the attribute.
    pub value: Option<String>,
    pub locked: bool,
}

impl CallerAttribute {
    /// Interprets a caller `name` / `value` pair the way the command line does: a
    /// trailing `!` on the name unsets, a trailing `@` on the value makes the
    /// attribute soft.
    fn new(name: &str, value: &str) -> Self {
        if let Some(name) = name.strip_suffix('!') {
            return Self {
                name: name.to_lowercase(),
                value: None,
                locked: true,
            };
        }
        match value.strip_suffix('@') {
            Some(value) => Self {
                name: name.to_lowercase(),
                value: Some(value.to_string()),
                locked: false,
            },
            None => Self {
                name: name.to_lowercase(),
                value: Some(value.to_string()),
                locked: true,
            },
        }
    }
}

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Options {
    pub safe_mode: SafeMode,
    /// Locks the `doctype` attribute when set.
    pub doctype: Option<Doctype>,
    /// Backend name, resolved when parsing starts. `None` means `html5`.
    pub backend: Option<String>,
    pub attributes: Vec<CallerAttribute>,
    /// Policy for references to missing attributes unless the document sets
    /// `attribute-missing` itself.
    pub attribute_missing: AttributeMissing,
    /// Directory includes resolve against and, in safe mode, stay inside of.
    pub base_dir: Option<PathBuf>,
    pub max_include_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            safe_mode: SafeMode::default(),
            doctype: None,
            backend: None,
            attributes: Vec::new(),
            attribute_missing: AttributeMissing::default(),
            base_dir: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use acdc_doctree::Options;
    /// use acdc_core::SafeMode;
    ///
    /// let options = Options::builder()
    ///     .with_safe_mode(SafeMode::Server)
    ///     .with_attribute("toc", "left")
    ///     .build();
    /// assert_eq!(options.attributes.len(), 1);
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Equivalent to `Options::default()`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builder for [`Options`], created with [`Options::builder()`].
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    /// Set the safe mode. `Secure` turns include directives into links; `Safe` and
    /// stricter keep includes inside the base directory.
    #[must_use]
    pub fn with_safe_mode(mut self, safe_mode: SafeMode) -> Self {
        self.options.safe_mode = safe_mode;
        self
    }

    /// Set and lock the document type.
    ///
    /// # Example
    ///
    /// ```
    /// use acdc_doctree::Options;
    /// use acdc_core::Doctype;
    ///
    /// let options = Options::builder().with_doctype(Doctype::Book).build();
    /// assert_eq!(options.doctype, Some(Doctype::Book));
    /// ```
    #[must_use]
    pub fn with_doctype(mut self, doctype: Doctype) -> Self {
        self.options.doctype = Some(doctype);
        self
    }

    /// Request an output backend. An unknown name makes parsing fail.
    #[must_use]
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.options.backend = Some(backend.into());
        self
    }

    /// Add a caller attribute. It is locked unless the value ends in `@`; a name
    /// ending in `!` unsets the attribute.
    ///
    /// # Example
    ///
    /// ```
    /// use acdc_doctree::Options;
    ///
    /// let options = Options::builder()
    ///     .with_attribute("icons", "font")
    ///     .with_attribute("toc", "left@")
    ///     .with_attribute("sectids!", "")
    ///     .build();
    /// assert!(options.attributes[0].locked);
    /// assert!(!options.attributes[1].locked);
    /// assert_eq!(options.attributes[2].value, None);
    /// ```
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.options.attributes.push(CallerAttribute::new(name, value));
        self
    }

    #[must_use]
    pub fn with_attributes<'a>(mut self, attributes: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.options.attributes.extend(
            attributes
                .into_iter()
                .map(|(name, value)| CallerAttribute::new(name, value)),
        );
        self
    }

    /// Add an attribute the document is allowed to override.
    #[must_use]
    pub fn with_soft_attribute(mut self, name: &str, value: &str) -> Self {
        self.options.attributes.push(CallerAttribute {
            name: name.to_lowercase(),
            value: Some(value.to_string()),
            locked: false,
        });
        self
    }

    #[must_use]
    pub fn with_attribute_missing(mut self, policy: AttributeMissing) -> Self {
        self.options.attribute_missing = policy;
        self
    }

    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.options.base_dir = Some(base_dir.into());
        self
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.options.max_include_depth = depth;
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        self.options
    }
}
