//! Reading Terraform values and building state objects

use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

/// Builder for object values (resource state, nested set elements)
#[derive(Debug, Default)]
pub(crate) struct Object(HashMap<String, Dynamic>);

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<Dynamic>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn set_strings(self, name: &str, values: impl IntoIterator<Item = String>) -> Self {
        self.set(name, Dynamic::string_list(values))
    }

    pub fn set_objects(self, name: &str, values: impl IntoIterator<Item = Object>) -> Self {
        self.set(
            name,
            Dynamic::List(values.into_iter().map(Object::into_dynamic).collect()),
        )
    }

    pub fn into_dynamic(self) -> Dynamic {
        Dynamic::Map(self.0)
    }

    pub fn build(self) -> DynamicValue {
        DynamicValue::new(self.into_dynamic())
    }
}

/// Known, non-null string attribute
pub(crate) fn string(value: &DynamicValue, name: &str) -> Option<String> {
    value.get_string(&AttributePath::new(name)).ok()
}

pub(crate) fn bool_or(value: &DynamicValue, name: &str, default: bool) -> bool {
    value.get_bool(&AttributePath::new(name)).unwrap_or(default)
}

/// Null and unknown lists read as `None`
pub(crate) fn strings(value: &DynamicValue, name: &str) -> Option<Vec<String>> {
    value.get_string_list(&AttributePath::new(name)).ok()
}

/// Elements of a list or set of objects
pub(crate) fn objects(value: &DynamicValue, name: &str) -> Option<Vec<HashMap<String, Dynamic>>> {
    value.get_list(&AttributePath::new(name)).ok().map(|items| {
        items
            .into_iter()
            .filter_map(|item| match item {
                Dynamic::Map(fields) => Some(fields),
                _ => None,
            })
            .collect()
    })
}

pub(crate) fn field<'a>(fields: &'a HashMap<String, Dynamic>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .and_then(Dynamic::as_string)
        .map(String::as_str)
}

pub(crate) fn is_set(value: &DynamicValue, name: &str) -> bool {
    value
        .get(&AttributePath::new(name))
        .is_some_and(|v| !v.is_null())
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
