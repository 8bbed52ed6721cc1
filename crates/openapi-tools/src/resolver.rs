//! Local `$ref` resolution.
//!
//! The `openapiv3` crate models `$ref`s using `ReferenceOr<T>` but does not resolve them. This
//! resolver walks local pointers (`#/components/schemas/Foo`) against a JSON view of the loaded
//! document and deserializes the target back into the typed model.
//!
//! Only same-document references are supported; anything else is reported as unresolvable.

use crate::error::{OpenApiToolsError, Result};
use openapiv3::{Parameter, PathItem, ReferenceOr, RequestBody, Schema};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    document: &'a Value,
}

impl<'a> ReferenceResolver<'a> {
    #[must_use]
    pub fn new(document: &'a Value) -> Self {
        Self { document }
    }

    /// Return the raw node a local reference points at.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::Reference`] for non-local references and for pointers with a
    /// missing segment.
    pub fn resolve_value(&self, reference: &str) -> Result<&'a Value> {
        let pointer = reference.strip_prefix('#').ok_or_else(|| OpenApiToolsError::Reference {
            reference: reference.to_string(),
            message: "only local references are supported".to_string(),
        })?;
        if pointer.is_empty() {
            return Ok(self.document);
        }
        if !pointer.starts_with('/') {
            return Err(OpenApiToolsError::Reference {
                reference: reference.to_string(),
                message: "expected a JSON pointer starting with '/'".to_string(),
            });
        }
        self.document
            .pointer(pointer)
            .ok_or_else(|| OpenApiToolsError::Reference {
                reference: reference.to_string(),
                message: "missing segment".to_string(),
            })
    }

    /// Resolve a schema, following chained references.
    ///
    /// # Errors
    ///
    /// Returns an error if a reference is unresolvable, cyclic, or does not point at a schema.
    pub fn resolve_schema(&self, schema: &ReferenceOr<Schema>) -> Result<Schema> {
        self.resolve_reference_or(schema)
    }

    /// Boxed variant, as used for object properties and array items.
    ///
    /// # Errors
    ///
    /// See [`Self::resolve_schema`].
    pub fn resolve_boxed_schema(&self, schema: &ReferenceOr<Box<Schema>>) -> Result<Schema> {
        self.resolve_reference_or(schema).map(|s| *s)
    }

    /// # Errors
    ///
    /// See [`Self::resolve_schema`].
    pub fn resolve_parameter(&self, param: &ReferenceOr<Parameter>) -> Result<Parameter> {
        self.resolve_reference_or(param)
    }

    /// # Errors
    ///
    /// See [`Self::resolve_schema`].
    pub fn resolve_request_body(&self, body: &ReferenceOr<RequestBody>) -> Result<RequestBody> {
        self.resolve_reference_or(body)
    }

    /// # Errors
    ///
    /// See [`Self::resolve_schema`].
    pub fn resolve_path_item(&self, item: &ReferenceOr<PathItem>) -> Result<PathItem> {
        self.resolve_reference_or(item)
    }

    fn resolve_reference_or<T>(&self, r: &ReferenceOr<T>) -> Result<T>
    where
        T: Clone + DeserializeOwned,
    {
        let mut seen: HashSet<String> = HashSet::new();
        let mut cur: ReferenceOr<T> = r.clone();

        loop {
            match cur {
                ReferenceOr::Item(item) => return Ok(item),
                ReferenceOr::Reference { reference } => {
                    if !seen.insert(reference.clone()) {
                        return Err(OpenApiToolsError::Reference {
                            reference,
                            message: "cyclic reference chain".to_string(),
                        });
                    }
                    let value = self.resolve_value(&reference)?;
                    cur = serde_json::from_value(value.clone()).map_err(|e| {
                        OpenApiToolsError::Reference {
                            reference: reference.clone(),
                            message: format!("unexpected target shape: {e}"),
                        }
                    })?;
                }
            }
        }
    }
}
