//! Variable declarations
//!
//! A declaration is always a leaf. Its canonical text is rebuilt from its
//! parts rather than taken from the source line, so two declarations written
//! with different spacing still compare equal.

use serde::{Deserialize, Serialize};

/// One axis of an array declaration (`start:end`); either bound may be omitted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DimensionBound {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

impl DimensionBound {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }

    /// Assumed-shape axis (`:`)
    pub fn assumed() -> Self {
        Self::default()
    }
}

/// A declared variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    /// Type descriptor as written, e.g. `real(kind=8)`
    pub type_descriptor: String,
    #[serde(default)]
    pub dimensions: Option<Vec<DimensionBound>>,
    #[serde(default)]
    pub attributes: Option<Vec<String>>,
    #[serde(default)]
    pub initializer: Option<String>,
}

impl VariableDeclaration {
    pub fn new(name: impl Into<String>, type_descriptor: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_descriptor: type_descriptor.into(),
            dimensions: None,
            attributes: None,
            initializer: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec<DimensionBound>) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(Vec::new)
            .push(attribute.into());
        self
    }

    pub fn with_initializer(mut self, value: impl Into<String>) -> Self {
        self.initializer = Some(value.into());
        self
    }

    /// Single-line rendering: `type[,dimension(s:e,...)][,attr...] ::name[=init]`
    pub fn canonical_text(&self) -> String {
        let mut text = self.type_descriptor.clone();

        if let Some(dimensions) = &self.dimensions {
            let axes: Vec<String> = dimensions
                .iter()
                .map(|axis| {
                    format!(
                        "{}:{}",
                        axis.start.as_deref().unwrap_or(""),
                        axis.end.as_deref().unwrap_or("")
                    )
                })
                .collect();
            text.push_str(",dimension(");
            text.push_str(&axes.join(","));
            text.push(')');
        }

        for attribute in self.attributes.iter().flatten() {
            text.push(',');
            text.push_str(attribute);
        }

        text.push_str(" ::");
        text.push_str(&self.name);

        if let Some(init) = &self.initializer {
            text.push('=');
            text.push_str(init);
        }

        text
    }
}
