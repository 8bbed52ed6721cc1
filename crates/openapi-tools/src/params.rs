//! Per-operation input contract.

use crate::operation::{OperationDescriptor, ParamLocation};
use crate::resolver::ReferenceResolver;
use crate::schema::{SchemaTranslator, SchemaValidator, ValidatorKind, ValidatorMap};
use crate::spec::SpecDocument;
use openapiv3::{MediaType, ReferenceOr, RequestBody, Schema, SchemaKind, Type};
use tracing::warn;

/// Request body content types, most preferred first.
pub const BODY_CONTENT_TYPES: [&str; 3] = [
    "application/json",
    "multipart/form-data",
    "application/x-www-form-urlencoded",
];

type Properties<'s> = Vec<(&'s String, &'s ReferenceOr<Box<Schema>>)>;

/// Where the provenance marker goes in an outbound body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BodyShape {
    /// On the payload object itself.
    #[default]
    Single,
    /// On every record of the array held in `field` (e.g. `messages`).
    EachElement { field: String },
}

/// What [`ParamsSchemaBuilder`] produces for one operation.
#[derive(Debug, Clone, Default)]
pub struct ParamsSchema {
    pub validators: ValidatorMap,
    pub body_shape: BodyShape,
}

pub struct ParamsSchemaBuilder<'a> {
    spec: &'a SpecDocument,
}

impl<'a> ParamsSchemaBuilder<'a> {
    #[must_use]
    pub fn new(spec: &'a SpecDocument) -> Self {
        Self { spec }
    }

    /// Combine path parameters, query parameters and top-level body properties, in that order,
    /// into one flat map. On a name collision the first declaration wins.
    #[must_use]
    pub fn build(&self, op: &OperationDescriptor) -> ParamsSchema {
        let mut translator = SchemaTranslator::new(self.spec);
        let mut out = ParamsSchema::default();

        for location in [ParamLocation::Path, ParamLocation::Query] {
            for param in op.parameters_in(location) {
                let validator = match &param.schema {
                    Some(schema) => translator.translate_ref(schema),
                    // `content`-described parameters travel as plain strings.
                    None => SchemaValidator::new(ValidatorKind::String { email: false }),
                };
                let validator = validator.with_description(param.description.clone());
                if !out.validators.insert(&param.name, validator, param.required) {
                    warn!(
                        "{} {}: duplicate parameter '{}' ignored",
                        op.method, op.path, param.name
                    );
                }
            }
        }

        let Some(body) = &op.request_body else {
            return out;
        };
        let Some((content_type, schema)) = preferred_body_schema(body) else {
            return out;
        };
        let resolver = self.spec.resolver();
        let schema = match resolver.resolve_schema(schema) {
            Ok(schema) => schema,
            Err(e) => {
                warn!("{} {}: body schema ({content_type}): {e}", op.method, op.path);
                return out;
            }
        };
        let Some((properties, required)) = object_parts(&schema) else {
            return out;
        };

        for &(name, prop) in &properties {
            let validator = translator.translate_boxed(prop);
            if !out
                .validators
                .insert(name, validator, required.contains(name))
            {
                warn!(
                    "{} {}: body field '{name}' collides with a parameter of the same name; skipped",
                    op.method, op.path
                );
            }
        }
        out.body_shape = detect_body_shape(resolver, &properties);
        out
    }
}

fn preferred_body_schema(body: &RequestBody) -> Option<(&'static str, &ReferenceOr<Schema>)> {
    BODY_CONTENT_TYPES.iter().find_map(|ct| {
        body.content
            .get(*ct)
            .and_then(|media: &MediaType| media.schema.as_ref())
            .map(|schema| (*ct, schema))
    })
}

fn object_parts(schema: &Schema) -> Option<(Properties<'_>, &[String])> {
    match &schema.schema_kind {
        SchemaKind::Type(Type::Object(o)) => Some((o.properties.iter().collect(), &o.required)),
        SchemaKind::Any(a) if !a.properties.is_empty() => {
            Some((a.properties.iter().collect(), &a.required))
        }
        _ => None,
    }
}

/// `EachElement` when the first array-typed property holds records, `Single` otherwise.
fn detect_body_shape(resolver: ReferenceResolver<'_>, properties: &Properties<'_>) -> BodyShape {
    for &(name, prop) in properties {
        let Ok(schema) = resolver.resolve_boxed_schema(prop) else {
            continue;
        };
        let SchemaKind::Type(Type::Array(array)) = &schema.schema_kind else {
            continue;
        };
        let holds_records = array
            .items
            .as_ref()
            .and_then(|items| resolver.resolve_boxed_schema(items).ok())
            .is_some_and(|items| object_parts(&items).is_some());
        if holds_records {
            return BodyShape::EachElement {
                field: name.clone(),
            };
        }
    }
    BodyShape::Single
}
