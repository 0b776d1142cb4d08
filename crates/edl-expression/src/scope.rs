use crate::error::ExprError;
use crate::types::JsValue;
use crate::util;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Variable bindings for structural evaluation.
///
/// A child scope sees everything its parent sees, plus its own bindings,
/// which shadow the parent's. Parents are borrowed, never written, so lambda
/// invocations cannot leak bindings into each other.
#[derive(Debug, Default)]
pub struct Scope<'p> {
    parent: Option<&'p Scope<'p>>,
    vars: HashMap<String, JsValue>,
}

impl Scope<'static> {
    pub fn new() -> Self {
        Scope::default()
    }

    /// Root scope holding the keys of a JSON object. Any other value yields an
    /// empty scope.
    pub fn from_json(data: Value) -> Self {
        let mut scope = Scope::new();
        if let Value::Object(map) = data {
            for (name, value) in map {
                scope.vars.insert(name, JsValue::from(value));
            }
        }
        scope
    }
}

impl<'p> Scope<'p> {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<JsValue>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Nearest binding for `name`, searching outward.
    pub fn get(&self, name: &str) -> Option<&JsValue> {
        let mut scope = Some(self);
        while let Some(current) = scope {
            if let Some(value) = current.vars.get(name) {
                return Some(value);
            }
            scope = current.parent;
        }
        None
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn child<I>(&self, bindings: I) -> Scope<'_>
    where
        I: IntoIterator<Item = (String, JsValue)>,
    {
        Scope {
            parent: Some(self),
            vars: bindings.into_iter().collect(),
        }
    }

    /// All visible bindings as one object, inner bindings winning.
    pub fn to_object(&self) -> JsValue {
        let mut chain = Vec::new();
        let mut scope = Some(self);
        while let Some(current) = scope {
            chain.push(current);
            scope = current.parent;
        }
        let mut merged = BTreeMap::new();
        for current in chain.into_iter().rev() {
            for (name, value) in &current.vars {
                merged.insert(name.clone(), value.clone());
            }
        }
        JsValue::Object(merged)
    }

    /// Resolves a dotted path such as `order.items[0].price`.
    ///
    /// The empty path is the whole scope. Missing names and null or missing
    /// intermediates resolve to `undefined`.
    pub fn resolve_path(&self, path: &str) -> Result<JsValue, ExprError> {
        let segments = split_path(path);
        let Some((head, rest)) = segments.split_first() else {
            return Ok(self.to_object());
        };
        for segment in &segments {
            util::check_access(segment)?;
        }
        let mut current = self.get(head).cloned().unwrap_or_default();
        for segment in rest {
            if current.is_nullish() {
                return Ok(JsValue::Undefined);
            }
            current = util::get_property(&current, segment);
        }
        Ok(current)
    }
}

/// `a.b[0]["c"]` -> `["a", "b", "0", "c"]`.
fn split_path(path: &str) -> Vec<String> {
    path.split(['.', '[', ']'])
        .map(|segment| segment.trim_matches(|c: char| c == '"' || c == '\''))
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_child_shadows_without_touching_parent() {
        let mut root = Scope::new();
        root.set("x", 1.0);
        root.set("y", 2.0);
        {
            let child = root.child([("x".to_string(), JsValue::from(10.0))]);
            assert_eq!(child.get("x"), Some(&JsValue::from(10.0)));
            assert_eq!(child.get("y"), Some(&JsValue::from(2.0)));
        }
        assert_eq!(root.get("x"), Some(&JsValue::from(1.0)));
    }

    #[test]
    fn test_resolve_path() {
        let scope = Scope::from_json(json!({
            "order": {"items": [{"price": 5}, {"price": 7}]},
            "name": "abc",
            "empty": null
        }));
        assert_eq!(
            scope.resolve_path("order.items.1.price").unwrap(),
            JsValue::from(7.0)
        );
        assert_eq!(
            scope.resolve_path("order.items[0].price").unwrap(),
            JsValue::from(5.0)
        );
        assert_eq!(scope.resolve_path("order.items.length").unwrap(), JsValue::from(2.0));
        assert_eq!(scope.resolve_path("name.length").unwrap(), JsValue::from(3.0));
        assert_eq!(scope.resolve_path("empty.deep.er").unwrap(), JsValue::Undefined);
        assert_eq!(scope.resolve_path("missing").unwrap(), JsValue::Undefined);
    }

    #[test]
    fn test_empty_path_is_whole_scope() {
        let root = Scope::from_json(json!({"a": 1}));
        let child = root.child([("b".to_string(), JsValue::from(2.0))]);
        assert_eq!(
            child.resolve_path("").unwrap(),
            JsValue::from(json!({"a": 1, "b": 2}))
        );
    }

    #[test]
    fn test_denied_segments() {
        let scope = Scope::from_json(json!({"a": {}}));
        assert!(matches!(
            scope.resolve_path("a.constructor"),
            Err(ExprError::SandboxViolation(_))
        ));
        assert!(matches!(
            scope.resolve_path("__proto__"),
            Err(ExprError::SandboxViolation(_))
        ));
    }
}
