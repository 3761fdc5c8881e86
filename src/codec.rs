//! Encode/decode administrative messages against registered schemas.
//!
//! Both directions are pure, single-attempt transforms: encode walks the
//! schema's field order and fails before emitting anything when a required
//! field is absent; decode parses the wire form, matches fields by wire name
//! in any document order, and discards unknown attributes and elements
//! (forward-compatibility policy).

use crate::schema::{
    FieldDescriptor, FieldKind, Literal, MessageSchema, ScalarType, SchemaError, SchemaRegistry,
    ValueType,
};
use crate::value::{MessageValue, Value};
use crate::xml::XmlElement;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("root element mismatch: expected <{expected}>, found <{found}>")]
    RootMismatch { expected: String, found: String },
    #[error("missing required field: {0}")]
    MissingRequiredField(String),
    /// Also raised on encode when a value's shape does not match its
    /// descriptor (the symmetric check).
    #[error("field {field}: expected {expected}, found {found}")]
    UnsupportedScalarFormat {
        field: String,
        expected: &'static str,
        found: String,
    },
    #[error("unknown field: {0}")]
    UnknownField(String),
}

/// Stateless transform engine over an immutable schema registry.
///
/// Construction verifies that every nested-schema reference resolves, so a
/// misconfigured catalog fails at startup rather than mid-request. A `Codec`
/// holds no per-call state and is safe to share across threads.
#[derive(Debug)]
pub struct Codec {
    registry: SchemaRegistry,
}

impl Codec {
    pub fn new(registry: SchemaRegistry) -> Result<Self, SchemaError> {
        registry.check_references()?;
        Ok(Codec { registry })
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Encode `value` as the message registered under (root, namespace).
    /// Deterministic: equal inputs yield byte-identical output.
    pub fn encode(
        &self,
        root: &str,
        namespace: Option<&str>,
        value: &MessageValue,
    ) -> Result<Vec<u8>, CodecError> {
        let schema = self.registry.lookup(root, namespace)?;
        let el = self.build_root(schema, value)?;
        Ok(el.to_xml().into_bytes())
    }

    /// Decode wire bytes as the message registered under (root, namespace).
    pub fn decode(
        &self,
        root: &str,
        namespace: Option<&str>,
        bytes: &[u8],
    ) -> Result<MessageValue, CodecError> {
        let schema = self.registry.lookup(root, namespace)?;
        let text = std::str::from_utf8(bytes)
            .map_err(|e| CodecError::MalformedInput(format!("input is not UTF-8: {}", e)))?;
        let el = XmlElement::parse(text).map_err(|e| CodecError::MalformedInput(e.to_string()))?;
        self.check_root(schema, &el)?;
        self.extract(schema, &el)
    }

    fn check_root(
        &self,
        schema: &MessageSchema,
        el: &XmlElement,
    ) -> Result<(), CodecError> {
        if el.name != schema.root {
            return Err(CodecError::RootMismatch {
                expected: schema.root.clone(),
                found: el.name.clone(),
            });
        }
        // An explicit wire namespace must agree; an absent one is accepted
        // (elements commonly inherit the namespace from an outer envelope).
        if let Some(wire_ns) = el.attr("xmlns") {
            if schema.namespace.as_deref() != Some(wire_ns) {
                return Err(CodecError::RootMismatch {
                    expected: schema.root.clone(),
                    found: format!("{} xmlns={}", el.name, wire_ns),
                });
            }
        }
        Ok(())
    }

    // ==================== Encode ====================

    pub(crate) fn build_root(
        &self,
        schema: &MessageSchema,
        value: &MessageValue,
    ) -> Result<XmlElement, CodecError> {
        let mut el = XmlElement::new(&schema.root);
        if let Some(ns) = &schema.namespace {
            el.set_attr("xmlns", ns);
        }
        self.populate(&mut el, schema, value)?;
        Ok(el)
    }

    fn populate(
        &self,
        el: &mut XmlElement,
        schema: &MessageSchema,
        value: &MessageValue,
    ) -> Result<(), CodecError> {
        let mut unknown: Vec<&str> = value
            .names()
            .filter(|n| schema.field(n).is_none())
            .collect();
        if !unknown.is_empty() {
            // Sorted so the reported name does not depend on map order.
            unknown.sort_unstable();
            return Err(CodecError::UnknownField(unknown[0].to_string()));
        }

        for field in &schema.fields {
            let v = match value.get(&field.name) {
                Some(v) => v,
                None => {
                    if field.required {
                        return Err(CodecError::MissingRequiredField(field.name.clone()));
                    }
                    continue;
                }
            };
            match field.kind {
                FieldKind::Attribute => {
                    let raw = self.encode_scalar(field, v)?;
                    el.set_attr(&field.wire, &raw);
                }
                FieldKind::Text => {
                    el.text = self.encode_scalar(field, v)?;
                }
                FieldKind::Element => {
                    if let Some(child) = self.build_child(schema, field, v)? {
                        el.children.push(child);
                    }
                }
                FieldKind::ElementList => {
                    let items = v.as_list().ok_or_else(|| mismatch(field, "list", v))?;
                    if items.is_empty() && field.required {
                        return Err(CodecError::MissingRequiredField(field.name.clone()));
                    }
                    for item in items {
                        if let Some(child) = self.build_child(schema, field, item)? {
                            el.children.push(child);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// One child element for an Element field or a list item. Returns `None`
    /// when a blank string is dropped instead of emitted.
    fn build_child(
        &self,
        schema: &MessageSchema,
        field: &FieldDescriptor,
        v: &Value,
    ) -> Result<Option<XmlElement>, CodecError> {
        let mut child = XmlElement::new(&field.wire);
        match &field.value_type {
            ValueType::Scalar(_) => {
                let raw = self.encode_scalar(field, v)?;
                if raw.is_empty() && !field.emit_empty {
                    return Ok(None);
                }
                child.text = raw;
            }
            ValueType::Schema(target) => {
                let nested = v.as_msg().ok_or_else(|| mismatch(field, "message", v))?;
                let nested_schema = self
                    .registry
                    .resolve_ref(target, schema.namespace.as_deref())?;
                self.populate(&mut child, nested_schema, nested)?;
            }
        }
        Ok(Some(child))
    }

    fn encode_scalar(&self, field: &FieldDescriptor, v: &Value) -> Result<String, CodecError> {
        let ty = match &field.value_type {
            ValueType::Scalar(ty) => *ty,
            ValueType::Schema(_) => return Err(mismatch(field, "message", v)),
        };
        match (ty, v) {
            (ScalarType::String, Value::Str(s)) => Ok(s.clone()),
            (ScalarType::Int, Value::Int(i)) => Ok(i.to_string()),
            (ScalarType::Bool, Value::Bool(b)) => Ok(if *b { "1" } else { "0" }.to_string()),
            _ => Err(mismatch(field, ty.name(), v)),
        }
    }

    // ==================== Decode ====================

    pub(crate) fn extract(
        &self,
        schema: &MessageSchema,
        el: &XmlElement,
    ) -> Result<MessageValue, CodecError> {
        log_discards(schema, el);

        let mut out = MessageValue::new();
        for field in &schema.fields {
            match field.kind {
                FieldKind::Attribute => match el.attr(&field.wire) {
                    Some(raw) => out.set(&field.name, self.decode_scalar(field, raw)?),
                    None => self.absent(&mut out, field)?,
                },
                FieldKind::Text => {
                    if el.text.is_empty() {
                        self.absent(&mut out, field)?;
                    } else {
                        out.set(&field.name, self.decode_scalar(field, &el.text)?);
                    }
                }
                FieldKind::Element => {
                    let mut found = el.children.iter().filter(|c| c.name == field.wire);
                    match found.next() {
                        Some(child) => {
                            if found.next().is_some() {
                                log::debug!(
                                    "{}: repeated <{}> for a single-valued field, extras discarded",
                                    schema.root,
                                    field.wire
                                );
                            }
                            out.set(&field.name, self.decode_child(schema, field, child)?);
                        }
                        None => self.absent(&mut out, field)?,
                    }
                }
                FieldKind::ElementList => {
                    let items: Vec<Value> = el
                        .children
                        .iter()
                        .filter(|c| c.name == field.wire)
                        .map(|c| self.decode_child(schema, field, c))
                        .collect::<Result<_, _>>()?;
                    if items.is_empty() {
                        // Zero occurrences is only valid for an optional list.
                        if field.required {
                            return Err(CodecError::MissingRequiredField(field.name.clone()));
                        }
                    } else {
                        out.set(&field.name, Value::List(items));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Required absent fields fail; optional ones take their default, if any.
    fn absent(&self, out: &mut MessageValue, field: &FieldDescriptor) -> Result<(), CodecError> {
        if field.required {
            return Err(CodecError::MissingRequiredField(field.name.clone()));
        }
        if let Some(default) = &field.default {
            let v = match default {
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Int(i) => Value::Int(*i),
                Literal::Bool(b) => Value::Bool(*b),
            };
            out.set(&field.name, v);
        }
        Ok(())
    }

    fn decode_child(
        &self,
        schema: &MessageSchema,
        field: &FieldDescriptor,
        child: &XmlElement,
    ) -> Result<Value, CodecError> {
        match &field.value_type {
            ValueType::Scalar(_) => self.decode_scalar(field, &child.text),
            ValueType::Schema(target) => {
                let nested_schema = self
                    .registry
                    .resolve_ref(target, schema.namespace.as_deref())?;
                Ok(Value::Msg(self.extract(nested_schema, child)?))
            }
        }
    }

    fn decode_scalar(&self, field: &FieldDescriptor, raw: &str) -> Result<Value, CodecError> {
        let ty = match &field.value_type {
            ValueType::Scalar(ty) => *ty,
            ValueType::Schema(_) => {
                return Err(CodecError::UnsupportedScalarFormat {
                    field: field.name.clone(),
                    expected: "message",
                    found: raw.to_string(),
                })
            }
        };
        match ty {
            ScalarType::String => Ok(Value::Str(raw.to_string())),
            ScalarType::Int => raw.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                CodecError::UnsupportedScalarFormat {
                    field: field.name.clone(),
                    expected: "int",
                    found: raw.to_string(),
                }
            }),
            // Compatibility shim: the wire convention is "1"/"0" but
            // true/false is accepted case-insensitively.
            ScalarType::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" => Ok(Value::Bool(true)),
                "0" | "false" => Ok(Value::Bool(false)),
                _ => Err(CodecError::UnsupportedScalarFormat {
                    field: field.name.clone(),
                    expected: "bool",
                    found: raw.to_string(),
                }),
            },
        }
    }
}

fn mismatch(field: &FieldDescriptor, expected: &'static str, v: &Value) -> CodecError {
    CodecError::UnsupportedScalarFormat {
        field: field.name.clone(),
        expected,
        found: v.type_name().to_string(),
    }
}

fn log_discards(schema: &MessageSchema, el: &XmlElement) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for (name, _) in &el.attrs {
        if name == "xmlns" || name.starts_with("xmlns:") {
            continue;
        }
        if schema.attribute_by_wire(name).is_none() {
            log::debug!("{}: discarding unknown attribute {}", schema.root, name);
        }
    }
    for child in &el.children {
        if schema.element_by_wire(&child.name).is_none() {
            log::debug!("{}: discarding unknown element <{}>", schema.root, child.name);
        }
    }
}
