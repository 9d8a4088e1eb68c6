//! Domain model for the documentation tree, with structural mapping from
//! markup elements and the sanitize invariant checks.
//!
//! Mapping and validation are deliberately separate: `from_element`
//! produces a possibly-invalid draft, `sanitize` either accepts it or
//! reports the first violated invariant (depth-first) as a `SyntaxError`
//! with a dotted field path. The builder composes the two.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SyntaxError;
use crate::markup::Element;

/// Group used when an annotation does not name one.
pub const DEFAULT_GROUP: &str = "default";

/// Accepted callback schemas, compared case-insensitively.
pub const SCHEMA_HTTP: &str = "HTTP";
pub const SCHEMA_HTTPS: &str = "HTTPS";

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    None,
    Bool,
    Number,
    String,
    Object,
}

impl ParamType {
    /// Map a `type` attribute value. An absent attribute is None (caught
    /// by sanitize where a type is required); an unknown value is an
    /// invariant violation outright.
    fn from_attr(value: Option<&str>) -> Result<Self, SyntaxError> {
        match value {
            None | Some("none") => Ok(ParamType::None),
            Some("bool") => Ok(ParamType::Bool),
            Some("number") => Ok(ParamType::Number),
            Some("string") => Ok(ParamType::String),
            Some("object") => Ok(ParamType::Object),
            Some(_) => Err(SyntaxError::new("type", "invalid value")),
        }
    }
}

/// A `major.minor[.patch]` version marker used by `deprecated` attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Version(pub String);

impl Version {
    pub fn parse(value: &str) -> Result<Self, SyntaxError> {
        let re = Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("invalid version pattern");
        if re.is_match(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(SyntaxError::new("", "invalid version marker"))
        }
    }
}

/// One declared enum value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnumValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Version>,
}

impl EnumValue {
    fn from_element(el: &Element) -> Result<Self, SyntaxError> {
        Ok(Self {
            value: el.attr("value").unwrap_or_default().to_string(),
            description: el.text.clone(),
            deprecated: parse_deprecated(el)?,
        })
    }

    fn sanitize(&self) -> Result<(), SyntaxError> {
        if self.value.is_empty() {
            return Err(SyntaxError::new("enum.value", "required"));
        }
        Ok(())
    }
}

/// A typed, possibly nested, named value description.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ptype: ParamType,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub array: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Version>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
}

impl Param {
    pub fn from_element(el: &Element) -> Result<Self, SyntaxError> {
        let name = el.attr("name").unwrap_or_default().to_string();
        Ok(Self {
            name,
            ptype: ParamType::from_attr(el.attr("type"))?,
            array: el.attr("array") == Some("true"),
            items: collect_params(el)?,
            enums: collect_enums(el)?,
            reference: el.attr("ref").map(str::to_string),
            deprecated: parse_deprecated(el)?,
            summary: el.attr("summary").unwrap_or(&el.text).to_string(),
        })
    }

    /// Whether this param takes its shape from a named definition.
    pub fn is_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn is_enum(&self) -> bool {
        !self.enums.is_empty()
    }

    /// Path segment used in error field paths.
    fn segment(&self) -> &str {
        if self.name.is_empty() {
            "param"
        } else {
            &self.name
        }
    }

    pub fn sanitize(&self) -> Result<(), SyntaxError> {
        if self.name.is_empty() {
            return Err(SyntaxError::new("param.name", "required"));
        }
        if self.is_reference() {
            // Shape arrives from the definition during the final pass.
            return Ok(());
        }
        if self.ptype == ParamType::None {
            return Err(SyntaxError::new("type", "required").in_field(self.segment()));
        }
        if self.ptype == ParamType::Object && self.items.is_empty() {
            return Err(SyntaxError::new("param", "required").in_field(self.segment()));
        }
        if self.ptype != ParamType::Object && !self.items.is_empty() {
            return Err(SyntaxError::new("param", "must be empty").in_field(self.segment()));
        }
        sanitize_children(&self.items, &self.enums)
            .map_err(|e| e.in_field(self.segment()))
    }
}

/// An inline example payload attached to a request or response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExampleValue {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mimetype: String,
    pub content: String,
}

/// A request or response body description.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    #[serde(rename = "type")]
    pub ptype: ParamType,
    pub mimetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub array: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Version>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleValue>,
}

impl Request {
    pub fn from_element(el: &Element) -> Result<Self, SyntaxError> {
        let status = match el.attr("status") {
            None => None,
            Some(raw) => Some(raw.parse::<u16>().map_err(|_| {
                SyntaxError::new("status", "invalid value")
            })?),
        };

        Ok(Self {
            ptype: ParamType::from_attr(el.attr("type"))?,
            mimetype: el.attr("mimetype").unwrap_or_default().to_string(),
            status,
            array: el.attr("array") == Some("true"),
            items: collect_params(el)?,
            enums: collect_enums(el)?,
            reference: el.attr("ref").map(str::to_string),
            deprecated: parse_deprecated(el)?,
            summary: el.attr("summary").unwrap_or_default().to_string(),
            description: el.child_text("description").unwrap_or_default().to_string(),
            examples: el
                .children_named("example")
                .map(|ex| ExampleValue {
                    mimetype: ex.attr("mimetype").unwrap_or_default().to_string(),
                    content: ex.text.clone(),
                })
                .collect(),
        })
    }

    pub fn is_enum(&self) -> bool {
        !self.enums.is_empty()
    }

    /// View the body shape as a Param tree root for example validation
    /// and synthesis.
    pub fn to_param(&self) -> Param {
        Param {
            name: String::new(),
            ptype: self.ptype,
            array: self.array,
            items: self.items.clone(),
            enums: self.enums.clone(),
            reference: self.reference.clone(),
            deprecated: None,
            summary: String::new(),
        }
    }

    pub fn sanitize(&self) -> Result<(), SyntaxError> {
        if self.reference.is_none() {
            if self.ptype == ParamType::None {
                return Err(SyntaxError::new("type", "required"));
            }
            if self.ptype == ParamType::Object && self.items.is_empty() {
                return Err(SyntaxError::new("param", "required"));
            }
            if self.ptype != ParamType::Object && !self.items.is_empty() {
                return Err(SyntaxError::new("param", "must be empty"));
            }
        }
        if self.mimetype.is_empty() {
            return Err(SyntaxError::new("mimetype", "required"));
        }
        sanitize_children(&self.items, &self.enums)
    }
}

/// A server-to-client callback: structurally a nested request/response set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Callback {
    pub method: String,
    pub schema: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<Param>,
    pub requests: Vec<Request>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<Request>,
}

impl Callback {
    pub fn from_element(el: &Element) -> Result<Self, SyntaxError> {
        Ok(Self {
            method: el.attr("method").unwrap_or_default().to_string(),
            schema: el.attr("schema").unwrap_or_default().to_string(),
            summary: el.attr("summary").unwrap_or_default().to_string(),
            description: el.child_text("description").unwrap_or_default().to_string(),
            deprecated: parse_deprecated(el)?,
            queries: map_children(el, "query", Param::from_element)?,
            requests: map_children(el, "request", Request::from_element)
                .map_err(|e| e.in_field("request"))?,
            responses: map_children(el, "response", Request::from_element)
                .map_err(|e| e.in_field("response"))?,
        })
    }

    pub fn sanitize(&self) -> Result<(), SyntaxError> {
        if self.method.is_empty() {
            return Err(SyntaxError::new("method", "required"));
        }
        let schema = self.schema.to_uppercase();
        if schema != SCHEMA_HTTP && schema != SCHEMA_HTTPS {
            return Err(SyntaxError::new("schema", "invalid value"));
        }
        if self.requests.is_empty() {
            return Err(SyntaxError::new("request", "required"));
        }
        for query in &self.queries {
            query.sanitize().map_err(|e| e.in_field("query"))?;
        }
        for request in &self.requests {
            request.sanitize().map_err(|e| e.in_field("request"))?;
        }
        for response in &self.responses {
            response.sanitize().map_err(|e| e.in_field("response"))?;
        }
        Ok(())
    }
}

/// One documented API operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Api {
    pub method: String,
    pub path: String,
    /// Source file of the annotation block, carried for error records.
    #[serde(skip)]
    pub file: std::path::PathBuf,
    #[serde(skip)]
    pub line: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<Version>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub queries: Vec<Param>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requests: Vec<Request>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<Request>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callbacks: Vec<Callback>,
}

impl Api {
    /// Structural mapping only; `group` routing happens in the builder.
    pub fn from_element(el: &Element) -> Result<Self, SyntaxError> {
        Ok(Self {
            method: el.attr("method").unwrap_or_default().to_string(),
            path: el.child_text("path").unwrap_or_default().to_string(),
            file: std::path::PathBuf::new(),
            line: 0,
            summary: el.attr("summary").unwrap_or(&el.text).to_string(),
            description: el.child_text("description").unwrap_or_default().to_string(),
            deprecated: parse_deprecated(el)?,
            queries: map_children(el, "query", Param::from_element)?,
            requests: map_children(el, "request", Request::from_element)
                .map_err(|e| e.in_field("request"))?,
            responses: map_children(el, "response", Request::from_element)
                .map_err(|e| e.in_field("response"))?,
            callbacks: map_children(el, "callback", Callback::from_element)
                .map_err(|e| e.in_field("callback"))?,
        })
    }

    pub fn sanitize(&self) -> Result<(), SyntaxError> {
        if self.method.is_empty() {
            return Err(SyntaxError::new("method", "required"));
        }
        if self.path.is_empty() {
            return Err(SyntaxError::new("path", "required"));
        }
        for query in &self.queries {
            query.sanitize().map_err(|e| e.in_field("query"))?;
        }
        for request in &self.requests {
            request.sanitize().map_err(|e| e.in_field("request"))?;
        }
        for response in &self.responses {
            response.sanitize().map_err(|e| e.in_field("response"))?;
        }
        for callback in &self.callbacks {
            callback.sanitize().map_err(|e| e.in_field("callback"))?;
        }
        Ok(())
    }
}

/// Aggregate root for one group of API entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Reusable named schema definitions, referenced by `ref` attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, Param>,
    pub apis: Vec<Api>,
    /// Cleared when the final pass finds unresolved references.
    pub valid: bool,
}

impl Document {
    pub fn new() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }

    /// Apply a `<apidoc>` metadata block to this document.
    pub fn apply_meta(&mut self, el: &Element) -> Result<(), SyntaxError> {
        self.title = el
            .attr("title")
            .map(str::to_string)
            .or_else(|| el.child_text("title").map(str::to_string))
            .unwrap_or_default();
        if let Some(raw) = el.attr("version") {
            self.version = Some(Version::parse(raw).map_err(|e| e.in_field("version"))?);
        }
        if let Some(text) = el.child_text("description") {
            self.description = text.to_string();
        }

        for schema in el.children_named("schema") {
            let param = Param::from_element(schema)?;
            param.sanitize().map_err(|e| e.in_field("schema"))?;
            if self.definitions.insert(param.name.clone(), param).is_some() {
                return Err(SyntaxError::new("schema", "duplicate value"));
            }
        }

        if self.title.is_empty() {
            return Err(SyntaxError::new("title", "required"));
        }
        Ok(())
    }
}

/// Map all children with the given tag through a draft constructor.
fn map_children<T>(
    el: &Element,
    name: &str,
    f: impl Fn(&Element) -> Result<T, SyntaxError>,
) -> Result<Vec<T>, SyntaxError> {
    el.children_named(name).map(|c| f(c)).collect()
}

fn collect_params(el: &Element) -> Result<Vec<Param>, SyntaxError> {
    map_children(el, "param", Param::from_element)
}

fn collect_enums(el: &Element) -> Result<Vec<EnumValue>, SyntaxError> {
    map_children(el, "enum", EnumValue::from_element)
}

fn parse_deprecated(el: &Element) -> Result<Option<Version>, SyntaxError> {
    el.attr("deprecated")
        .map(|raw| Version::parse(raw).map_err(|e| e.in_field("deprecated")))
        .transpose()
}

/// Shared invariant checks for nested items and enums: every child is
/// sanitized, sibling names are unique, enum values are unique.
fn sanitize_children(items: &[Param], enums: &[EnumValue]) -> Result<(), SyntaxError> {
    for item in items {
        item.sanitize()?;
    }
    for value in enums {
        value.sanitize()?;
    }
    if let Some(name) = duplicate_item(items) {
        return Err(SyntaxError::new("param", &format!("duplicate value `{name}`")));
    }
    if let Some(value) = duplicate_enum(enums) {
        return Err(SyntaxError::new("enum", &format!("duplicate value `{value}`")));
    }
    Ok(())
}

/// First repeated sibling param name, if any.
fn duplicate_item(items: &[Param]) -> Option<&str> {
    let mut seen = HashSet::new();
    items
        .iter()
        .find(|p| !seen.insert(p.name.as_str()))
        .map(|p| p.name.as_str())
}

/// First repeated enum value, if any.
fn duplicate_enum(enums: &[EnumValue]) -> Option<&str> {
    let mut seen = HashSet::new();
    enums
        .iter()
        .find(|e| !seen.insert(e.value.as_str()))
        .map(|e| e.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup;

    fn request(src: &str) -> Result<Request, SyntaxError> {
        let el = markup::parse(src.as_bytes()).unwrap();
        let draft = Request::from_element(&el)?;
        draft.sanitize()?;
        Ok(draft)
    }

    fn callback(src: &str) -> Result<Callback, SyntaxError> {
        let el = markup::parse(src.as_bytes()).unwrap();
        let draft = Callback::from_element(&el)?;
        draft.sanitize()?;
        Ok(draft)
    }

    #[test]
    fn test_request_object_with_items() {
        let r = request(
            r#"<request type="object" mimetype="json"><param name="id" type="number"/></request>"#,
        )
        .unwrap();
        assert_eq!(r.ptype, ParamType::Object);
        assert_eq!(r.items.len(), 1);
        assert_eq!(r.items[0].name, "id");
        assert_eq!(r.items[0].ptype, ParamType::Number);
    }

    #[test]
    fn test_request_missing_type() {
        let err = request(r#"<request mimetype="json"/>"#).unwrap_err();
        assert_eq!(err.field, "type");
    }

    #[test]
    fn test_request_missing_mimetype() {
        let err = request(r#"<request type="number"/>"#).unwrap_err();
        assert_eq!(err.field, "mimetype");
    }

    #[test]
    fn test_object_request_without_items() {
        let err = request(r#"<request type="object" mimetype="json"/>"#).unwrap_err();
        assert_eq!(err.field, "param");
        assert_eq!(err.message, "required");
    }

    #[test]
    fn test_non_object_request_with_items_rejected() {
        let err = request(
            r#"<request type="number" mimetype="json"><param name="id" type="number"/></request>"#,
        )
        .unwrap_err();
        assert_eq!(err.field, "param");
        assert_eq!(err.message, "must be empty");
    }

    #[test]
    fn test_duplicate_sibling_param_names_rejected() {
        let err = request(
            r#"<request type="object" mimetype="json"><param name="id" type="number"/><param name="id" type="string"/></request>"#,
        )
        .unwrap_err();
        assert_eq!(err.field, "param");
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn test_duplicate_enum_values_rejected() {
        let err = request(
            r#"<request type="string" mimetype="json"><enum value="a">A</enum><enum value="a">B</enum></request>"#,
        )
        .unwrap_err();
        assert_eq!(err.field, "enum");
        assert!(err.message.contains("duplicate"));
    }

    #[test]
    fn test_nested_violation_carries_dotted_path() {
        let err = request(
            r#"<request type="object" mimetype="json"><param name="user" type="object"><param name="tag" type="object"/></param></request>"#,
        )
        .unwrap_err();
        assert_eq!(err.field, "user.tag.param");
    }

    #[test]
    fn test_first_violation_only() {
        // Both params are invalid; only the first (depth-first) reports.
        let err = request(
            r#"<request type="object" mimetype="json"><param name="a" type="object"/><param name="b"/></request>"#,
        )
        .unwrap_err();
        assert_eq!(err.field, "a.param");
    }

    #[test]
    fn test_callback_valid() {
        let c = callback(
            r#"<callback method="POST" schema="https"><request type="number" mimetype="json"/></callback>"#,
        )
        .unwrap();
        assert_eq!(c.method, "POST");
        assert_eq!(c.requests.len(), 1);
    }

    #[test]
    fn test_callback_schema_case_insensitive() {
        assert!(callback(
            r#"<callback method="GET" schema="Http"><request type="bool" mimetype="json"/></callback>"#,
        )
        .is_ok());
    }

    #[test]
    fn test_callback_invalid_schema() {
        let err = callback(
            r#"<callback method="GET" schema="ftp"><request type="bool" mimetype="json"/></callback>"#,
        )
        .unwrap_err();
        assert_eq!(err.field, "schema");
    }

    #[test]
    fn test_callback_requires_method() {
        let err = callback(
            r#"<callback schema="http"><request type="bool" mimetype="json"/></callback>"#,
        )
        .unwrap_err();
        assert_eq!(err.field, "method");
    }

    #[test]
    fn test_callback_requires_request() {
        let err = callback(r#"<callback method="GET" schema="http"/>"#).unwrap_err();
        assert_eq!(err.field, "request");
    }

    #[test]
    fn test_api_from_element() {
        let el = markup::parse(
            br#"<api method="GET"><path>/users</path><response status="200" mimetype="json" type="object"><param name="id" type="number"/></response></api>"#,
        )
        .unwrap();
        let api = Api::from_element(&el).unwrap();
        api.sanitize().unwrap();
        assert_eq!(api.method, "GET");
        assert_eq!(api.path, "/users");
        assert_eq!(api.responses.len(), 1);
        assert_eq!(api.responses[0].status, Some(200));
        assert_eq!(api.responses[0].ptype, ParamType::Object);
        assert_eq!(api.responses[0].items[0].name, "id");
    }

    #[test]
    fn test_api_requires_path() {
        let el = markup::parse(br#"<api method="GET"></api>"#).unwrap();
        let api = Api::from_element(&el).unwrap();
        assert_eq!(api.sanitize().unwrap_err().field, "path");
    }

    #[test]
    fn test_invalid_deprecated_marker() {
        let el = markup::parse(br#"<param name="x" type="bool" deprecated="soon"/>"#).unwrap();
        let err = Param::from_element(&el).unwrap_err();
        assert_eq!(err.field, "deprecated");
    }

    #[test]
    fn test_unknown_type_attribute_rejected() {
        let el = markup::parse(br#"<param name="x" type="decimal"/>"#).unwrap();
        let err = Param::from_element(&el).unwrap_err();
        assert_eq!(err.field, "type");
        assert_eq!(err.message, "invalid value");
    }

    #[test]
    fn test_version_markers() {
        assert!(Version::parse("1.0").is_ok());
        assert!(Version::parse("2.13.4").is_ok());
        assert!(Version::parse("v1.0").is_err());
        assert!(Version::parse("1").is_err());
    }

    #[test]
    fn test_reference_param_skips_shape_checks() {
        let el = markup::parse(br#"<param name="user" ref="user"/>"#).unwrap();
        let param = Param::from_element(&el).unwrap();
        assert!(param.sanitize().is_ok());
    }

    #[test]
    fn test_apply_meta() {
        let el = markup::parse(
            br#"<apidoc title="Pet Store" version="1.2.0"><description>All pets, all day</description><schema name="user" type="object"><param name="id" type="number"/></schema></apidoc>"#,
        )
        .unwrap();
        let mut doc = Document::new();
        doc.apply_meta(&el).unwrap();
        assert_eq!(doc.title, "Pet Store");
        assert_eq!(doc.version, Some(Version("1.2.0".to_string())));
        assert!(doc.definitions.contains_key("user"));
    }

    #[test]
    fn test_apply_meta_requires_title() {
        let el = markup::parse(br#"<apidoc version="1.0"></apidoc>"#).unwrap();
        let err = Document::new().apply_meta(&el).unwrap_err();
        assert_eq!(err.field, "title");
    }
}
