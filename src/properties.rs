//! Capability-based property visiting
//!
//! Types describe their own shape by implementing [`PropertySource`]:
//! nested beans are handed to the visitor as further sources, leaves as
//! optional boolean values. Nothing here relies on runtime introspection.

/// Receives the properties a [`PropertySource`] declares
pub trait PropertyVisitor {
    /// A leaf property; `None` when the value was never assigned
    fn visit_leaf(&mut self, name: &str, value: Option<bool>);

    /// A nested bean whose own properties follow
    fn visit_nested(&mut self, name: &str, source: &dyn PropertySource);
}

/// A type that declares its nested and leaf properties explicitly
pub trait PropertySource {
    /// Walk the declared properties in declaration order
    fn visit_properties(&self, visitor: &mut dyn PropertyVisitor);
}

/// Collects leaves under dotted names, e.g. `user.read`
#[derive(Debug, Default)]
pub struct PropertyCollector {
    prefix: Vec<String>,
    /// Flattened `(name, value)` pairs in visit order
    pub properties: Vec<(String, Option<bool>)>,
}

impl PropertyCollector {
    fn qualified(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.prefix.join("."), name)
        }
    }
}

impl PropertyVisitor for PropertyCollector {
    fn visit_leaf(&mut self, name: &str, value: Option<bool>) {
        let qualified = self.qualified(name);
        self.properties.push((qualified, value));
    }

    fn visit_nested(&mut self, name: &str, source: &dyn PropertySource) {
        self.prefix.push(name.to_string());
        source.visit_properties(self);
        self.prefix.pop();
    }
}

/// Flatten all properties of a source into dotted names
pub fn collect_properties(source: &dyn PropertySource) -> Vec<(String, Option<bool>)> {
    let mut collector = PropertyCollector::default();
    source.visit_properties(&mut collector);
    collector.properties
}
