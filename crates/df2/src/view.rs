//! JSON rendering of a tree, for debugging and the dump tool.

use serde_json::{json, Map, Number};

use crate::stream::Df2Stream;
use crate::tree::{NodeBody, NodeRef};
use crate::value::{Array, Value};

impl NodeRef<'_> {
    /// Renders this node and everything below it.
    ///
    /// Groups become objects in insertion order. Non-finite floats have no
    /// JSON number form and are rendered as strings (`"NaN"`, `"inf"`).
    pub fn to_json(&self) -> serde_json::Value {
        match self.node().body() {
            NodeBody::Group(_) => {
                let mut map = Map::new();
                for child in self.children() {
                    map.insert(child.name().to_string(), child.to_json());
                }
                serde_json::Value::Object(map)
            }
            NodeBody::Value(value) => value_to_json(value),
        }
    }
}

impl<S> Df2Stream<S> {
    /// Renders the attached tree from the root.
    pub fn to_json(&self) -> serde_json::Value {
        self.root().to_json()
    }
}

fn float(v: f64) -> serde_json::Value {
    match Number::from_f64(v) {
        Some(n) => serde_json::Value::Number(n),
        None => serde_json::Value::String(v.to_string()),
    }
}

pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Byte(v) => json!(v),
        Value::SByte(v) => json!(v),
        Value::Short(v) => json!(v),
        Value::UShort(v) => json!(v),
        Value::Int(v) => json!(v),
        Value::UInt(v) => json!(v),
        Value::Long(v) => json!(v),
        Value::ULong(v) => json!(v),
        Value::Float(v) => float(f64::from(*v)),
        Value::Double(v) => float(*v),
        Value::String(v) => json!(v),
        Value::Array(array) => array_to_json(array),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
    }
}

fn array_to_json(array: &Array) -> serde_json::Value {
    match array {
        Array::Byte(v) => json!(v),
        Array::SByte(v) => json!(v),
        Array::Short(v) => json!(v),
        Array::UShort(v) => json!(v),
        Array::Int(v) => json!(v),
        Array::UInt(v) => json!(v),
        Array::Long(v) => json!(v),
        Array::ULong(v) => json!(v),
        Array::Float(v) => v.iter().map(|x| float(f64::from(*x))).collect(),
        Array::Double(v) => v.iter().map(|x| float(*x)).collect(),
        Array::String(v) => json!(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeId, Tree};

    #[test]
    fn groups_keep_insertion_order() {
        let mut tree = Tree::new();
        let (g, _) = tree.get_or_add_group(NodeId::ROOT, "zeta").unwrap();
        tree.add_or_update(g, "b", Value::from(2u8)).unwrap();
        tree.add_or_update(g, "a", Value::from("x")).unwrap();
        tree.add_or_update(NodeId::ROOT, "alpha", Value::from(vec![1i32, -1])).unwrap();

        let rendered = tree.view(NodeId::ROOT).to_json().to_string();
        assert_eq!(rendered, r#"{"zeta":{"b":2,"a":"x"},"alpha":[1,-1]}"#);
    }

    #[test]
    fn non_finite_floats_become_strings() {
        assert_eq!(value_to_json(&Value::from(f64::NAN)), json!("NaN"));
        assert_eq!(value_to_json(&Value::from(f32::INFINITY)), json!("inf"));
        assert_eq!(value_to_json(&Value::from(1.5f32)), json!(1.5));
        assert_eq!(
            value_to_json(&Value::list([Value::from(1u8), Value::list([Value::from("n")])])),
            json!([1, ["n"]])
        );
    }
}
