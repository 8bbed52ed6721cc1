//! Schema translation.
//!
//! [`SchemaTranslator`] turns `OpenAPI` schema nodes into [`SchemaValidator`] descriptions. The
//! per-tool [`ValidatorMap`] built from them is both advertised to the host as the tool's JSON
//! Schema `inputSchema` and compiled (via `jsonschema`) into the [`ArgumentValidator`] that checks
//! every call.
//!
//! Translation never fails: unresolvable or circular references degrade to an accept-anything
//! validator whose description names the offending pointer.

use crate::error::{OpenApiToolsError, Result};
use crate::resolver::ReferenceResolver;
use crate::spec::SpecDocument;
use openapiv3::{
    AnySchema, ReferenceOr, Schema, SchemaKind, StringFormat, StringType, Type,
    VariantOrUnknownOrEmpty,
};
use rmcp::model::JsonObject;
use serde_json::{Map, Number, Value, json};
use std::collections::BTreeMap;
use tracing::warn;

/// A translated schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaValidator {
    pub kind: ValidatorKind,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidatorKind {
    /// Accepts any value.
    Any,
    String {
        email: bool,
    },
    /// Closed set of strings. Takes precedence over every other string constraint.
    Enum(Vec<String>),
    Number {
        integer: bool,
        minimum: Option<Number>,
        maximum: Option<Number>,
    },
    Boolean,
    Array(Box<SchemaValidator>),
    Object(BTreeMap<String, FieldValidator>),
    /// Object without declared properties: any string-keyed map.
    Record,
    Union(Vec<SchemaValidator>),
}

/// A validator plus its required/optional marker.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValidator {
    pub validator: SchemaValidator,
    pub required: bool,
}

impl SchemaValidator {
    #[must_use]
    pub fn new(kind: ValidatorKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    #[must_use]
    pub fn any(description: impl Into<String>) -> Self {
        Self {
            kind: ValidatorKind::Any,
            description: Some(description.into()),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        if description.is_some() {
            self.description = description;
        }
        self
    }

    /// Render as a JSON Schema fragment.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut out = match &self.kind {
            ValidatorKind::Any => json!({}),
            ValidatorKind::String { email } => {
                let mut s = json!({"type": "string"});
                if *email {
                    s["format"] = json!("email");
                }
                s
            }
            ValidatorKind::Enum(values) => json!({"type": "string", "enum": values}),
            ValidatorKind::Number {
                integer,
                minimum,
                maximum,
            } => {
                let mut s = json!({"type": if *integer { "integer" } else { "number" }});
                if let Some(min) = minimum {
                    s["minimum"] = Value::Number(min.clone());
                }
                if let Some(max) = maximum {
                    s["maximum"] = Value::Number(max.clone());
                }
                s
            }
            ValidatorKind::Boolean => json!({"type": "boolean"}),
            ValidatorKind::Array(items) => {
                json!({"type": "array", "items": items.to_json_schema()})
            }
            ValidatorKind::Object(fields) => object_schema(fields.iter()),
            ValidatorKind::Record => json!({"type": "object"}),
            ValidatorKind::Union(branches) => {
                json!({"anyOf": branches.iter().map(Self::to_json_schema).collect::<Vec<_>>()})
            }
        };
        if let Some(desc) = &self.description {
            out["description"] = json!(desc);
        }
        out
    }
}

fn object_schema<'a>(fields: impl Iterator<Item = (&'a String, &'a FieldValidator)>) -> Value {
    let mut properties = Map::new();
    let mut required: Vec<&str> = Vec::new();
    for (name, field) in fields {
        properties.insert(name.clone(), field.validator.to_json_schema());
        if field.required {
            required.push(name);
        }
    }
    let mut schema = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        schema["required"] = json!(required);
    }
    schema
}

/// Recursive `OpenAPI` schema → [`SchemaValidator`] conversion.
pub struct SchemaTranslator<'a> {
    resolver: ReferenceResolver<'a>,
    /// References currently being expanded, innermost last.
    visiting: Vec<String>,
}

impl<'a> SchemaTranslator<'a> {
    #[must_use]
    pub fn new(spec: &'a SpecDocument) -> Self {
        Self::with_resolver(spec.resolver())
    }

    #[must_use]
    pub fn with_resolver(resolver: ReferenceResolver<'a>) -> Self {
        Self {
            resolver,
            visiting: Vec::new(),
        }
    }

    pub fn translate_ref(&mut self, node: &ReferenceOr<Schema>) -> SchemaValidator {
        match node {
            ReferenceOr::Item(schema) => self.translate(schema),
            ReferenceOr::Reference { reference } => self.translate_reference(reference),
        }
    }

    pub fn translate_boxed(&mut self, node: &ReferenceOr<Box<Schema>>) -> SchemaValidator {
        match node {
            ReferenceOr::Item(schema) => self.translate(schema),
            ReferenceOr::Reference { reference } => self.translate_reference(reference),
        }
    }

    fn translate_reference(&mut self, reference: &str) -> SchemaValidator {
        if self.visiting.iter().any(|r| r == reference) {
            return SchemaValidator::any(format!("Circular reference: {reference}"));
        }

        let target = self.resolver.resolve_value(reference).and_then(|v| {
            serde_json::from_value::<ReferenceOr<Schema>>(v.clone()).map_err(|e| {
                OpenApiToolsError::Reference {
                    reference: reference.to_string(),
                    message: e.to_string(),
                }
            })
        });
        match target {
            Ok(node) => {
                self.visiting.push(reference.to_string());
                let out = self.translate_ref(&node);
                self.visiting.pop();
                out
            }
            Err(e) => {
                warn!("{e}");
                SchemaValidator::any(format!("Failed reference: {reference}"))
            }
        }
    }

    pub fn translate(&mut self, schema: &Schema) -> SchemaValidator {
        let description = schema.schema_data.description.clone();
        match &schema.schema_kind {
            SchemaKind::Type(Type::String(s)) => translate_string(s, description),
            SchemaKind::Type(Type::Number(n)) => SchemaValidator::new(ValidatorKind::Number {
                integer: false,
                minimum: n.minimum.and_then(Number::from_f64),
                maximum: n.maximum.and_then(Number::from_f64),
            })
            .with_description(description),
            SchemaKind::Type(Type::Integer(i)) => SchemaValidator::new(ValidatorKind::Number {
                integer: true,
                minimum: i.minimum.map(Number::from),
                maximum: i.maximum.map(Number::from),
            })
            .with_description(description),
            SchemaKind::Type(Type::Boolean(_)) => {
                SchemaValidator::new(ValidatorKind::Boolean).with_description(description)
            }
            SchemaKind::Type(Type::Array(a)) => {
                let items = a
                    .items
                    .as_ref()
                    .map_or_else(|| SchemaValidator::new(ValidatorKind::Any), |i| {
                        self.translate_boxed(i)
                    });
                SchemaValidator::new(ValidatorKind::Array(Box::new(items)))
                    .with_description(description)
            }
            SchemaKind::Type(Type::Object(o)) => {
                if o.properties.is_empty() {
                    return SchemaValidator::new(ValidatorKind::Record)
                        .with_description(description);
                }
                self.translate_object(o.properties.iter(), &o.required)
                    .with_description(description)
            }
            SchemaKind::OneOf { one_of: branches } | SchemaKind::AnyOf { any_of: branches } => {
                self.translate_union(branches).with_description(description)
            }
            SchemaKind::Any(any) => self.translate_untyped(any).with_description(description),
            SchemaKind::AllOf { .. } | SchemaKind::Not { .. } => {
                SchemaValidator::new(ValidatorKind::Any).with_description(description)
            }
        }
    }

    fn translate_object<'s>(
        &mut self,
        properties: impl Iterator<Item = (&'s String, &'s ReferenceOr<Box<Schema>>)>,
        required: &[String],
    ) -> SchemaValidator {
        let fields = properties
            .map(|(name, prop)| {
                let field = FieldValidator {
                    validator: self.translate_boxed(prop),
                    required: required.contains(name),
                };
                (name.clone(), field)
            })
            .collect();
        SchemaValidator::new(ValidatorKind::Object(fields))
    }

    fn translate_union(&mut self, branches: &[ReferenceOr<Schema>]) -> SchemaValidator {
        let branches = branches.iter().map(|b| self.translate_ref(b)).collect();
        SchemaValidator::new(ValidatorKind::Union(branches))
    }

    /// Schemas without `type`: properties imply an object, `oneOf`/`anyOf` a union.
    fn translate_untyped(&mut self, any: &AnySchema) -> SchemaValidator {
        if !any.properties.is_empty() {
            return self.translate_object(any.properties.iter(), &any.required);
        }
        if !any.one_of.is_empty() {
            return self.translate_union(&any.one_of);
        }
        if !any.any_of.is_empty() {
            return self.translate_union(&any.any_of);
        }
        SchemaValidator::new(ValidatorKind::Any)
    }
}

fn translate_string(s: &StringType, description: Option<String>) -> SchemaValidator {
    let values: Vec<String> = s.enumeration.iter().flatten().cloned().collect();
    if !values.is_empty() {
        return SchemaValidator::new(ValidatorKind::Enum(values)).with_description(description);
    }

    let format = match &s.format {
        VariantOrUnknownOrEmpty::Item(StringFormat::Date) => Some("date"),
        VariantOrUnknownOrEmpty::Item(StringFormat::DateTime) => Some("date-time"),
        VariantOrUnknownOrEmpty::Unknown(f) => Some(f.as_str()),
        _ => None,
    };
    let description = if format == Some("uri") {
        Some(format!("URI: {}", description.unwrap_or_default()))
    } else {
        description
    };
    SchemaValidator::new(ValidatorKind::String {
        email: format == Some("email"),
    })
    .with_description(description)
}

/// The flat, per-operation input contract: path, query and body fields share one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatorMap {
    fields: BTreeMap<String, FieldValidator>,
}

impl ValidatorMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Returns `false`, leaving the map unchanged, if the name is taken.
    pub fn insert(&mut self, name: &str, validator: SchemaValidator, required: bool) -> bool {
        if self.fields.contains_key(name) {
            return false;
        }
        self.fields.insert(
            name.to_string(),
            FieldValidator {
                validator,
                required,
            },
        );
        true
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValidator> {
        self.fields.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The MCP `inputSchema` for this map.
    #[must_use]
    pub fn input_schema(&self) -> JsonObject {
        match object_schema(self.fields.iter()) {
            Value::Object(obj) => obj,
            _ => JsonObject::new(),
        }
    }

    /// Compile into a reusable argument checker.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated schema is rejected by the JSON Schema compiler.
    pub fn compile(&self) -> Result<ArgumentValidator> {
        ArgumentValidator::new(&Value::Object(self.input_schema()))
    }
}

/// Compiled JSON Schema for a tool's arguments.
pub struct ArgumentValidator {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for ArgumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArgumentValidator").finish_non_exhaustive()
    }
}

impl ArgumentValidator {
    /// # Errors
    ///
    /// Returns an error if `schema` is not a valid JSON Schema.
    pub fn new(schema: &Value) -> Result<Self> {
        let validator = jsonschema::options()
            .should_validate_formats(true)
            .build(schema)
            .map_err(|e| OpenApiToolsError::Config(format!("invalid input schema: {e}")))?;
        Ok(Self { validator })
    }

    /// Check `arguments`, reporting every violation.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::InvalidArguments`] listing each violation with its location.
    pub fn validate(&self, arguments: &Value) -> Result<()> {
        let violations: Vec<String> = self
            .validator
            .iter_errors(arguments)
            .map(|e| {
                let path = e.instance_path().to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(OpenApiToolsError::InvalidArguments(violations.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SpecDocument {
        SpecDocument::from_yaml_str(
            r##"
openapi: "3.0.0"
info: { title: t, version: "1" }
paths: {}
components:
  schemas:
    Message:
      type: object
      description: One SMS
      required: [to, body]
      properties:
        to: { type: string, description: Recipient number }
        body: { type: string }
        from_email: { type: string, format: email }
        schedule: { type: integer, minimum: 0 }
        list_id: { type: integer }
    Node:
      type: object
      properties:
        child: { $ref: "#/components/schemas/Node" }
"##,
            "inline",
        )
        .unwrap()
    }

    fn schema(yaml: &str) -> Schema {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn translate_ref(spec: &SpecDocument, reference: &str) -> SchemaValidator {
        SchemaTranslator::new(spec).translate_ref(&ReferenceOr::Reference {
            reference: reference.to_string(),
        })
    }

    #[test]
    fn object_required_marks_follow_required_list() {
        let spec = spec();
        let v = translate_ref(&spec, "#/components/schemas/Message");
        assert_eq!(v.description.as_deref(), Some("One SMS"));
        let ValidatorKind::Object(fields) = &v.kind else {
            panic!("expected object, got {v:?}");
        };
        assert!(fields["to"].required);
        assert!(fields["body"].required);
        assert!(!fields["from_email"].required);
        assert!(!fields["schedule"].required);
        assert_eq!(
            fields["to"].validator.description.as_deref(),
            Some("Recipient number")
        );
        assert_eq!(
            fields["from_email"].validator.kind,
            ValidatorKind::String { email: true }
        );
    }

    #[test]
    fn enum_wins_over_format() {
        let spec = spec();
        let v = SchemaTranslator::new(&spec)
            .translate(&schema("{type: string, format: email, enum: [a, b]}"));
        assert_eq!(v.kind, ValidatorKind::Enum(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn uri_format_prefixes_description() {
        let spec = spec();
        let v = SchemaTranslator::new(&spec)
            .translate(&schema("{type: string, format: uri, description: Callback}"));
        assert_eq!(v.description.as_deref(), Some("URI: Callback"));
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let spec = spec();
        let v = SchemaTranslator::new(&spec)
            .translate(&schema("{type: number, minimum: 1.5, maximum: 10}"));
        let compiled = ArgumentValidator::new(&v.to_json_schema()).unwrap();
        assert!(compiled.validate(&json!(1.5)).is_ok());
        assert!(compiled.validate(&json!(10)).is_ok());
        assert!(compiled.validate(&json!(10.01)).is_err());
        assert!(compiled.validate(&json!(1)).is_err());
    }

    #[test]
    fn untyped_nodes_infer_object_or_union() {
        let spec = spec();
        let mut t = SchemaTranslator::new(&spec);

        let obj = t.translate(&schema("{properties: {a: {type: boolean}}, required: [a]}"));
        assert!(matches!(obj.kind, ValidatorKind::Object(ref f) if f["a"].required));

        let union = t.translate(&schema("{oneOf: [{type: string}, {type: integer}]}"));
        let ValidatorKind::Union(branches) = &union.kind else {
            panic!("expected union, got {union:?}");
        };
        assert_eq!(branches.len(), 2);
    }

    #[test]
    fn object_without_properties_is_a_record() {
        let spec = spec();
        let v = SchemaTranslator::new(&spec).translate(&schema("{type: object}"));
        assert_eq!(v.kind, ValidatorKind::Record);
    }

    #[test]
    fn unresolvable_reference_degrades_to_any() {
        let spec = spec();
        let v = translate_ref(&spec, "#/components/schemas/Missing");
        assert_eq!(v.kind, ValidatorKind::Any);
        assert_eq!(
            v.description.as_deref(),
            Some("Failed reference: #/components/schemas/Missing")
        );

        let compiled = ArgumentValidator::new(&v.to_json_schema()).unwrap();
        assert!(compiled.validate(&json!({"anything": [1, 2, 3]})).is_ok());
        assert!(compiled.validate(&json!("text")).is_ok());
    }

    #[test]
    fn self_referencing_schema_terminates() {
        let spec = spec();
        let v = translate_ref(&spec, "#/components/schemas/Node");
        let ValidatorKind::Object(fields) = &v.kind else {
            panic!("expected object, got {v:?}");
        };
        let child = &fields["child"].validator;
        assert_eq!(child.kind, ValidatorKind::Any);
        assert!(child.description.as_deref().unwrap().starts_with("Circular reference"));
    }

    #[test]
    fn conforming_payload_passes_and_missing_required_fails() {
        let spec = spec();
        let v = translate_ref(&spec, "#/components/schemas/Message");
        let compiled = ArgumentValidator::new(&v.to_json_schema()).unwrap();

        assert!(
            compiled
                .validate(&json!({"to": "+61411111111", "body": "hi", "schedule": 0}))
                .is_ok()
        );

        let err = compiled.validate(&json!({"to": "+61411111111"})).unwrap_err();
        assert!(err.to_string().contains("body"), "{err}");

        let err = compiled
            .validate(&json!({"to": "x", "body": "y", "from_email": "not-an-email"}))
            .unwrap_err();
        assert!(err.to_string().contains("/from_email"), "{err}");
    }

    #[test]
    fn validator_map_rejects_duplicate_names() {
        let mut map = ValidatorMap::new();
        assert!(map.insert("page", SchemaValidator::new(ValidatorKind::Boolean), false));
        assert!(!map.insert("page", SchemaValidator::new(ValidatorKind::Any), true));
        assert_eq!(map.len(), 1);
        assert!(!map.get("page").unwrap().required);
    }

    #[test]
    fn input_schema_lists_required_names() {
        let mut map = ValidatorMap::new();
        map.insert(
            "message_id",
            SchemaValidator::new(ValidatorKind::String { email: false }),
            true,
        );
        map.insert("page", SchemaValidator::new(ValidatorKind::Boolean), false);
        let schema = Value::Object(map.input_schema());
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["message_id"]));
        assert_eq!(schema["properties"]["page"], json!({"type": "boolean"}));
    }
}
