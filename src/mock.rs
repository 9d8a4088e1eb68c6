//! Validate and synthesize example JSON payloads against Param trees.

use serde_json::{Map, Value};

use crate::document::{Param, ParamType};
use crate::error::{Error, Result};

/// Element count used when synthesizing array values.
const ARRAY_SAMPLE_LEN: usize = 5;

/// Sentinel literals for primitive types.
const SAMPLE_NUMBER: i64 = 1024;
const SAMPLE_STRING: &str = "1024";
const SAMPLE_BOOL: bool = true;

/// Check a JSON payload against a declared Param tree.
///
/// The walk descends schema and value together; the first mismatch fails
/// with the dotted path of the offending node. Declared items missing from
/// a JSON object are tolerated, JSON fields with no declared item are not.
pub fn validate(param: &Param, data: &[u8]) -> Result<()> {
    let value: Value = serde_json::from_slice(data)?;
    validate_value(param, &value, "")
}

fn validate_value(param: &Param, value: &Value, path: &str) -> Result<()> {
    if param.array {
        let Value::Array(elements) = value else {
            return Err(mismatch(path, "expected an array"));
        };
        // Every element must satisfy the same param with the flag cleared.
        let mut element_param = param.clone();
        element_param.array = false;
        for (index, element) in elements.iter().enumerate() {
            validate_value(&element_param, element, &join(path, &index.to_string()))?;
        }
        return Ok(());
    }

    match param.ptype {
        ParamType::None => match value {
            Value::Null => Ok(()),
            _ => Err(mismatch(path, "expected null")),
        },
        ParamType::Bool => match value {
            Value::Bool(_) => Ok(()),
            _ => Err(mismatch(path, "expected a bool")),
        },
        ParamType::Number => match value {
            Value::Number(n) => check_enum(param, &n.to_string(), path),
            _ => Err(mismatch(path, "expected a number")),
        },
        ParamType::String => match value {
            Value::String(s) => check_enum(param, s, path),
            _ => Err(mismatch(path, "expected a string")),
        },
        ParamType::Object => {
            let Value::Object(fields) = value else {
                return Err(mismatch(path, "expected an object"));
            };
            for (name, field_value) in fields {
                let field_path = join(path, name);
                let item = param
                    .items
                    .iter()
                    .find(|item| item.name == *name)
                    .ok_or_else(|| mismatch(&field_path, "unknown field"))?;
                validate_value(item, field_value, &field_path)?;
            }
            Ok(())
        }
    }
}

/// For enum-valued params the rendered value must be one of the declared
/// enum values.
fn check_enum(param: &Param, rendered: &str, path: &str) -> Result<()> {
    if param.is_enum() && !param.enums.iter().any(|e| e.value == rendered) {
        return Err(mismatch(path, "not a declared enum value"));
    }
    Ok(())
}

/// Locate the Param reachable from `root` by field-name segments.
///
/// Array wrappers are passed through transparently and Object nesting may
/// be arbitrarily deep. An empty path resolves to the root; an
/// unresolvable segment yields None — "not found", as opposed to the
/// "found but wrong type" failures `validate` reports.
pub fn find<'a>(root: &'a Param, path: &[&str]) -> Option<&'a Param> {
    let mut current = root;
    for segment in path {
        current = current.items.iter().find(|item| item.name == *segment)?;
    }
    Some(current)
}

/// Build a representative JSON value for a Param tree.
///
/// Primitives map to fixed sentinels, an enum-valued param takes its first
/// declared value, arrays wrap a fixed element count, objects synthesize
/// every declared item in declaration order.
pub fn synthesize(param: &Param) -> Value {
    if param.array {
        let mut element_param = param.clone();
        element_param.array = false;
        return Value::Array(
            (0..ARRAY_SAMPLE_LEN)
                .map(|_| synthesize(&element_param))
                .collect(),
        );
    }

    if let Some(first) = param.enums.first() {
        return match param.ptype {
            ParamType::Number => first
                .value
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(SAMPLE_NUMBER)),
            _ => Value::String(first.value.clone()),
        };
    }

    match param.ptype {
        ParamType::None => Value::Null,
        ParamType::Bool => Value::from(SAMPLE_BOOL),
        ParamType::Number => Value::from(SAMPLE_NUMBER),
        ParamType::String => Value::from(SAMPLE_STRING),
        ParamType::Object => {
            let mut fields = Map::new();
            for item in &param.items {
                fields.insert(item.name.clone(), synthesize(item));
            }
            Value::Object(fields)
        }
    }
}

/// Render a synthesized value as pretty-printed JSON bytes.
pub fn synthesize_bytes(param: &Param) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&synthesize(param))?)
}

fn mismatch(path: &str, message: &str) -> Error {
    Error::SchemaMismatch {
        path: path.to_string(),
        message: message.to_string(),
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{path}.{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::EnumValue;
    use crate::markup;

    fn param(src: &str) -> Param {
        let el = markup::parse(src.as_bytes()).unwrap();
        let p = Param::from_element(&el).unwrap();
        p.sanitize().unwrap();
        p
    }

    fn nested_tree() -> Param {
        param(
            r#"<param name="root" type="object">
                 <param name="name" type="string"/>
                 <param name="id" type="number"/>
                 <param name="group" type="object">
                   <param name="name" type="string"/>
                   <param name="id" type="number"/>
                   <param name="tags" type="object" array="true">
                     <param name="name" type="string"/>
                     <param name="id" type="number"/>
                   </param>
                 </param>
               </param>"#,
        )
    }

    #[test]
    fn test_synthesize_primitives() {
        assert_eq!(synthesize(&param(r#"<param name="n" type="number"/>"#)), 1024);
        assert_eq!(synthesize(&param(r#"<param name="s" type="string"/>"#)), "1024");
        assert_eq!(synthesize(&param(r#"<param name="b" type="bool"/>"#)), true);
    }

    #[test]
    fn test_synthesize_array_length() {
        let value = synthesize(&param(r#"<param name="b" type="bool" array="true"/>"#));
        assert_eq!(value, serde_json::json!([true, true, true, true, true]));
    }

    #[test]
    fn test_synthesize_object_fields() {
        let value = synthesize(&param(
            r#"<param name="o" type="object"><param name="id" type="number"/></param>"#,
        ));
        assert_eq!(value, serde_json::json!({"id": 1024}));
    }

    #[test]
    fn test_synthesize_enum_uses_first_value() {
        let value = synthesize(&param(
            r#"<param name="sex" type="string"><enum value="male">M</enum><enum value="female">F</enum></param>"#,
        ));
        assert_eq!(value, "male");
    }

    #[test]
    fn test_round_trip_nested() {
        let tree = nested_tree();
        let data = synthesize_bytes(&tree).unwrap();
        validate(&tree, &data).unwrap();
    }

    #[test]
    fn test_round_trip_enum_and_array() {
        let tree = param(
            r#"<param name="root" type="object">
                 <param name="tags" type="string" array="true"/>
                 <param name="kind" type="string"><enum value="a">A</enum></param>
               </param>"#,
        );
        let data = synthesize_bytes(&tree).unwrap();
        validate(&tree, &data).unwrap();
    }

    #[test]
    fn test_validate_type_mismatch_names_path() {
        let tree = param(
            r#"<param name="r" type="object"><param name="id" type="number"/></param>"#,
        );
        let err = validate(&tree, br#"{"id": "x"}"#).unwrap_err();
        match err {
            Error::SchemaMismatch { path, .. } => assert_eq!(path, "id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_nested_mismatch_path() {
        let tree = nested_tree();
        let err = validate(
            &tree,
            br#"{"group": {"tags": [{"id": 1}, {"id": "no"}]}}"#,
        )
        .unwrap_err();
        match err {
            Error::SchemaMismatch { path, .. } => assert_eq!(path, "group.tags.1.id"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_unknown_field() {
        let tree = param(
            r#"<param name="r" type="object"><param name="id" type="number"/></param>"#,
        );
        let err = validate(&tree, br#"{"id": 1, "extra": true}"#).unwrap_err();
        match err {
            Error::SchemaMismatch { path, message } => {
                assert_eq!(path, "extra");
                assert_eq!(message, "unknown field");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_missing_declared_field_tolerated() {
        let tree = param(
            r#"<param name="r" type="object"><param name="id" type="number"/><param name="name" type="string"/></param>"#,
        );
        validate(&tree, br#"{"id": 1}"#).unwrap();
    }

    #[test]
    fn test_validate_array_requires_json_array() {
        let tree = param(r#"<param name="xs" type="number" array="true"/>"#);
        assert!(validate(&tree, b"1024").is_err());
        validate(&tree, b"[1, 2, 3]").unwrap();
    }

    #[test]
    fn test_validate_enum_membership() {
        let tree = param(
            r#"<param name="kind" type="string"><enum value="a">A</enum></param>"#,
        );
        validate(&tree, br#""a""#).unwrap();
        assert!(validate(&tree, br#""b""#).is_err());
    }

    #[test]
    fn test_find_root_and_nested() {
        let tree = nested_tree();

        assert_eq!(find(&tree, &[]), Some(&tree));

        let name = find(&tree, &["name"]).unwrap();
        assert_eq!(name.ptype, ParamType::String);

        let id = find(&tree, &["group", "id"]).unwrap();
        assert_eq!(id.ptype, ParamType::Number);

        // Array wrappers are transparent.
        let tag_id = find(&tree, &["group", "tags", "id"]).unwrap();
        assert_eq!(tag_id.ptype, ParamType::Number);
    }

    #[test]
    fn test_find_not_found() {
        let tree = nested_tree();
        assert_eq!(find(&tree, &[""]), None);
        assert_eq!(find(&tree, &["not-exists"]), None);
        assert_eq!(find(&tree, &["group", "missing"]), None);
    }

    #[test]
    fn test_enum_value_not_stringly_typed_number() {
        let p = Param {
            name: "code".to_string(),
            ptype: ParamType::Number,
            enums: vec![EnumValue {
                value: "7".to_string(),
                description: String::new(),
                deprecated: None,
            }],
            ..Param::default()
        };
        assert_eq!(synthesize(&p), 7);
        validate(&p, b"7").unwrap();
        assert!(validate(&p, b"8").is_err());
    }
}
