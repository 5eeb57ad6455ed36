//! Module version notations.
//!
//! Forced versions can be given in several shapes. [`NotationInput`] names each
//! accepted shape and [`NotationInput::parse`] converts any of them, flattening
//! lists, into [`ModuleVersionSelector`]s.

use crate::error::{Error, Result};
use crate::identifier::ModuleVersionSelector;
use indexmap::IndexMap;
use serde_json::Value;

/// Every accepted way of writing a module version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotationInput {
    /// `group:name:version`.
    StringForm(String),
    /// Map with `group`, `name` and `version` keys.
    MapForm(IndexMap<String, String>),
    /// An already constructed selector.
    TypedForm(ModuleVersionSelector),
    /// Any nesting of the above.
    ListForm(Vec<NotationInput>),
}

impl NotationInput {
    /// Convert the notation into selectors, flattening nested lists in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNotation`] when any element is malformed.
    pub fn parse(&self) -> Result<Vec<ModuleVersionSelector>> {
        let mut selectors = Vec::new();
        self.parse_into(&mut selectors)?;
        Ok(selectors)
    }

    fn parse_into(&self, out: &mut Vec<ModuleVersionSelector>) -> Result<()> {
        match self {
            Self::StringForm(text) => out.push(parse_string(text)?),
            Self::MapForm(fields) => out.push(parse_map(fields)?),
            Self::TypedForm(selector) => out.push(selector.clone()),
            Self::ListForm(items) => {
                for item in items {
                    item.parse_into(out)?;
                }
            }
        }
        Ok(())
    }

    /// Classify an untyped JSON value.
    ///
    /// Strings, objects of strings and arrays map to their notation form. Any
    /// other value is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNotation`] for numbers, booleans, null and objects
    /// holding non-string values.
    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(Self::StringForm(text.clone())),
            Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>>>()
                .map(Self::ListForm),
            Value::Object(fields) => {
                let mut map = IndexMap::new();
                for (key, field) in fields {
                    let Value::String(text) = field else {
                        return Err(Error::invalid_notation(value.to_string()));
                    };
                    map.insert(key.clone(), text.clone());
                }
                Ok(Self::MapForm(map))
            }
            other => Err(Error::invalid_notation(other.to_string())),
        }
    }
}

impl From<&str> for NotationInput {
    fn from(text: &str) -> Self {
        Self::StringForm(text.to_string())
    }
}

impl From<ModuleVersionSelector> for NotationInput {
    fn from(selector: ModuleVersionSelector) -> Self {
        Self::TypedForm(selector)
    }
}

impl<T: Into<Self>> From<Vec<T>> for NotationInput {
    fn from(items: Vec<T>) -> Self {
        Self::ListForm(items.into_iter().map(Into::into).collect())
    }
}

fn parse_string(text: &str) -> Result<ModuleVersionSelector> {
    let parts: Vec<&str> = text.split(':').map(str::trim).collect();
    match parts.as_slice() {
        [group, name, version]
            if !group.is_empty() && !name.is_empty() && !version.is_empty() =>
        {
            Ok(ModuleVersionSelector::new(*group, *name, *version))
        }
        _ => Err(Error::invalid_notation(format!("'{text}'"))),
    }
}

fn parse_map(fields: &IndexMap<String, String>) -> Result<ModuleVersionSelector> {
    let field = |key: &str| {
        fields
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    };
    match (field("group"), field("name"), field("version")) {
        (Some(group), Some(name), Some(version)) if fields.len() == 3 => {
            Ok(ModuleVersionSelector::new(group, name, version))
        }
        _ => Err(Error::invalid_notation(format!("{fields:?}"))),
    }
}
