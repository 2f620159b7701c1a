use std::path::PathBuf;

use acdc_core::{Backend, Doctype, SafeMode};

use crate::{
    Options,
    anchor::AnchorRegistry,
    attributes::{AttributeTable, AttributeValue},
    callouts::CalloutTable,
    diagnostic::Diagnostics,
};

/// Everything one parse accumulates besides the tree itself.
#[derive(Debug)]
pub(crate) struct ParserState {
    pub(crate) attributes: AttributeTable,
    pub(crate) anchors: AnchorRegistry,
    pub(crate) callouts: CalloutTable,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) safe_mode: SafeMode,
    pub(crate) base_dir: PathBuf,
    pub(crate) max_include_depth: usize,
}

impl ParserState {
    /// Seeds the attribute table from the intrinsics, the backend and the caller's
    /// options, in that order.
    pub(crate) fn new(options: &Options, backend: Backend) -> Self {
        let mut attributes = AttributeTable::with_intrinsics();
        attributes.set("attribute-missing", options.attribute_missing.to_string());
        let safe_mode = options.safe_mode;
        attributes.set_locked("safe-mode-name", safe_mode.to_string().into());
        attributes.set_locked("safe-mode-level", (safe_mode as u8).to_string().into());
        attributes.set_locked(&format!("safe-mode-{safe_mode}"), AttributeValue::Bool(true));
        for (name, value) in [
            ("backend", backend.to_string()),
            ("basebackend", backend.basebackend().to_string()),
            ("outfilesuffix", backend.outfilesuffix().to_string()),
            ("filetype", backend.outfilesuffix().trim_start_matches('.').to_string()),
        ] {
            attributes.set(name, value);
        }
        attributes.set_value(&format!("backend-{backend}"), AttributeValue::Bool(true));
        attributes.set_value(
            &format!("basebackend-{}", backend.basebackend()),
            AttributeValue::Bool(true),
        );
        if let Some(doctype) = options.doctype {
            attributes.set_locked("doctype", doctype.to_string().into());
        }
        let doctype = attributes
            .get("doctype")
            .and_then(|doctype| doctype.parse::<Doctype>().ok())
            .unwrap_or_default();
        attributes.set_value(&format!("doctype-{doctype}"), AttributeValue::Bool(true));
        for attribute in &options.attributes {
            let value = attribute
                .value
                .clone()
                .map_or(AttributeValue::Bool(false), AttributeValue::String);
            if attribute.locked {
                attributes.set_locked(&attribute.name, value);
            } else {
                attributes.set_value(&attribute.name, value);
            }
        }
        Self {
            attributes,
            anchors: AnchorRegistry::default(),
            callouts: CalloutTable::default(),
            diagnostics: Diagnostics::default(),
            safe_mode,
            base_dir: options.base_dir.clone().unwrap_or_else(|| PathBuf::from(".")),
            max_include_depth: options.max_include_depth,
        }
    }

    /// The document type in force.
    pub(crate) fn doctype(&self) -> Doctype {
        self.attributes
            .get("doctype")
            .and_then(|doctype| doctype.parse().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn seeds_attributes_from_options() {
        let options = Options::builder()
            .with_doctype(Doctype::Book)
            .with_attribute("icons", "font")
            .with_attribute("toc", "left@")
            .with_attribute("sectids!", "")
            .build();
        let state = ParserState::new(&options, Backend::Docbook5);
        let attributes = &state.attributes;
        assert_eq!(attributes.get("doctype"), Some("book"));
        assert!(attributes.is_locked("doctype"));
        assert!(attributes.is_set("doctype-book"));
        assert_eq!(attributes.get("backend"), Some("docbook5"));
        assert_eq!(attributes.get("basebackend"), Some("docbook"));
        assert_eq!(attributes.get("outfilesuffix"), Some(".xml"));
        assert!(attributes.is_set("safe-mode-safe"));
        assert!(attributes.is_locked("icons"));
        assert!(!attributes.is_locked("toc"));
        assert_eq!(attributes.get("sectids"), None);
        assert_eq!(state.doctype(), Doctype::Book);
    }
}
