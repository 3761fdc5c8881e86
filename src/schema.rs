//! Schema model: field descriptors, message schemas, and the registry.
//!
//! Schemas are constructed during the registration phase (process start) and
//! are immutable afterwards; the codec only reads them. Registration-time
//! validation catches misconfigured schemas before any traffic is served.

use std::collections::HashMap;

use crate::xml;

/// Scalar wire type of an attribute, child element, or text-content field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    /// Character data, escaped on the wire.
    String,
    /// Decimal ASCII integer (i64).
    Int,
    /// Encoded as `"1"`/`"0"`; decode also accepts `true`/`false` case-insensitively.
    Bool,
}

impl ScalarType {
    pub fn name(self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Int => "int",
            ScalarType::Bool => "bool",
        }
    }
}

/// What a field holds: a scalar, or a nested message described by another schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Scalar(ScalarType),
    /// Reference to another registered schema by root name. Resolved against
    /// the referring schema's namespace first, then the namespace-less pool.
    Schema(String),
}

/// Where a field lives on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `key="value"` pair on the owning element.
    Attribute,
    /// One nested element.
    Element,
    /// Repeated sibling elements sharing the field's wire name, order-preserving.
    ElementList,
    /// The owning element's character content. At most one per schema, and it
    /// cannot coexist with element or list fields.
    Text,
}

/// Default literal for an absent optional scalar field (absent-means-use-default).
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl Literal {
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            Literal::Str(_) => ScalarType::String,
            Literal::Int(_) => ScalarType::Int,
            Literal::Bool(_) => ScalarType::Bool,
        }
    }
}

/// Describes one member of a message.
///
/// `name` keys the `MessageValue` map; `wire` is the attribute/element name on
/// the wire (defaults to `name`). Wire names are unique per kind scope —
/// attributes and elements have independent namespaces — while `name` is
/// unique across the whole schema so values stay unambiguous.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub wire: String,
    pub kind: FieldKind,
    pub value_type: ValueType,
    pub required: bool,
    pub default: Option<Literal>,
    /// Emit `<name/>` when the value is present but blank (instead of omitting it).
    pub emit_empty: bool,
}

impl FieldDescriptor {
    /// Scalar field with wire name equal to the value name.
    pub fn scalar(name: &str, kind: FieldKind, ty: ScalarType, required: bool) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            wire: name.to_string(),
            kind,
            value_type: ValueType::Scalar(ty),
            required,
            default: None,
            emit_empty: false,
        }
    }

    /// Field holding a nested message.
    pub fn nested(name: &str, kind: FieldKind, schema: &str, required: bool) -> Self {
        FieldDescriptor {
            name: name.to_string(),
            wire: name.to_string(),
            kind,
            value_type: ValueType::Schema(schema.to_string()),
            required,
            default: None,
            emit_empty: false,
        }
    }
}

/// Describes one wire message: root element name, optional namespace, and the
/// ordered field sequence. Declaration order is the encode order; decode
/// accepts any document order.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSchema {
    pub root: String,
    pub namespace: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl MessageSchema {
    pub fn new(root: &str, namespace: Option<&str>) -> Self {
        MessageSchema {
            root: root.to_string(),
            namespace: namespace.map(str::to_string),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Descriptor by value name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn attribute_by_wire(&self, wire: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.kind == FieldKind::Attribute && f.wire == wire)
    }

    pub fn element_by_wire(&self, wire: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| matches!(f.kind, FieldKind::Element | FieldKind::ElementList) && f.wire == wire)
    }

    pub fn text_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.kind == FieldKind::Text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema conflict: {root}{} is already registered", ns_suffix(.namespace))]
    Conflict {
        root: String,
        namespace: Option<String>,
    },
    #[error("invalid schema {root}: {reason}")]
    Invalid { root: String, reason: String },
    #[error("schema not found: {root}{}", ns_suffix(.namespace))]
    NotFound {
        root: String,
        namespace: Option<String>,
    },
}

fn ns_suffix(ns: &Option<String>) -> String {
    match ns {
        Some(ns) => format!(" in {}", ns),
        None => String::new(),
    }
}

/// Holds registered schemas, keyed by root name and namespace.
///
/// Registration and serving are disjoint phases: build the registry once at
/// startup (registration errors should be fatal), then hand it to the codec.
/// Lookups never mutate, so the sealed registry is safe to share across threads.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<MessageSchema>,
    by_key: HashMap<(String, Option<String>), usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        SchemaRegistry::default()
    }

    /// Register one schema. Fails with `Conflict` when the (root, namespace)
    /// pair is taken, or `Invalid` when the schema violates its own invariants.
    pub fn register(&mut self, schema: MessageSchema) -> Result<(), SchemaError> {
        validate_schema(&schema)?;
        let key = (schema.root.clone(), schema.namespace.clone());
        if self.by_key.contains_key(&key) {
            return Err(SchemaError::Conflict {
                root: schema.root,
                namespace: schema.namespace,
            });
        }
        log::debug!(
            "registered schema {}{}",
            schema.root,
            schema
                .namespace
                .as_deref()
                .map(|ns| format!(" ({})", ns))
                .unwrap_or_default()
        );
        self.by_key.insert(key, self.schemas.len());
        self.schemas.push(schema);
        Ok(())
    }

    /// Register a batch of schemas, stopping at the first failure.
    pub fn register_all<I>(&mut self, schemas: I) -> Result<(), SchemaError>
    where
        I: IntoIterator<Item = MessageSchema>,
    {
        for schema in schemas {
            self.register(schema)?;
        }
        Ok(())
    }

    pub fn lookup(&self, root: &str, namespace: Option<&str>) -> Result<&MessageSchema, SchemaError> {
        self.by_key
            .get(&(root.to_string(), namespace.map(str::to_string)))
            .map(|&i| &self.schemas[i])
            .ok_or_else(|| SchemaError::NotFound {
                root: root.to_string(),
                namespace: namespace.map(str::to_string),
            })
    }

    /// Resolve a nested-schema reference made from a schema in `referrer_ns`:
    /// same namespace first, then the namespace-less pool.
    pub fn resolve_ref(
        &self,
        name: &str,
        referrer_ns: Option<&str>,
    ) -> Result<&MessageSchema, SchemaError> {
        match self.lookup(name, referrer_ns) {
            Ok(s) => Ok(s),
            Err(_) if referrer_ns.is_some() => self.lookup(name, None),
            Err(e) => Err(e),
        }
    }

    /// Check that every nested-schema reference resolves. Run once after the
    /// registration phase; the codec constructor does this.
    pub fn check_references(&self) -> Result<(), SchemaError> {
        for schema in &self.schemas {
            for field in &schema.fields {
                if let ValueType::Schema(target) = &field.value_type {
                    self.resolve_ref(target, schema.namespace.as_deref())
                        .map_err(|_| SchemaError::Invalid {
                            root: schema.root.clone(),
                            reason: format!(
                                "field {} references unregistered schema {}",
                                field.name, target
                            ),
                        })?;
                }
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageSchema> {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

fn invalid(schema: &MessageSchema, reason: String) -> SchemaError {
    SchemaError::Invalid {
        root: schema.root.clone(),
        reason,
    }
}

fn validate_schema(schema: &MessageSchema) -> Result<(), SchemaError> {
    if !xml::is_name(&schema.root) {
        return Err(invalid(schema, "root is not a valid element name".to_string()));
    }

    let mut value_names: Vec<&str> = Vec::new();
    let mut attr_wires: Vec<&str> = Vec::new();
    let mut element_wires: Vec<&str> = Vec::new();
    let mut text_fields = 0usize;
    let mut has_elements = false;

    for f in &schema.fields {
        if value_names.contains(&f.name.as_str()) {
            return Err(invalid(schema, format!("duplicate field name {}", f.name)));
        }
        value_names.push(&f.name);

        match f.kind {
            FieldKind::Attribute => {
                if !xml::is_name(&f.wire) {
                    return Err(invalid(
                        schema,
                        format!("field {}: invalid attribute name {:?}", f.name, f.wire),
                    ));
                }
                if f.wire == "xmlns" || f.wire.starts_with("xmlns:") {
                    return Err(invalid(
                        schema,
                        format!("field {}: attribute name {} is reserved", f.name, f.wire),
                    ));
                }
                if attr_wires.contains(&f.wire.as_str()) {
                    return Err(invalid(
                        schema,
                        format!("duplicate attribute wire name {}", f.wire),
                    ));
                }
                attr_wires.push(&f.wire);
                if !matches!(f.value_type, ValueType::Scalar(_)) {
                    return Err(invalid(
                        schema,
                        format!("field {}: attributes must be scalar", f.name),
                    ));
                }
            }
            FieldKind::Element | FieldKind::ElementList => {
                if !xml::is_name(&f.wire) {
                    return Err(invalid(
                        schema,
                        format!("field {}: invalid element name {:?}", f.name, f.wire),
                    ));
                }
                if element_wires.contains(&f.wire.as_str()) {
                    return Err(invalid(
                        schema,
                        format!("duplicate element wire name {}", f.wire),
                    ));
                }
                element_wires.push(&f.wire);
                has_elements = true;
            }
            FieldKind::Text => {
                text_fields += 1;
                if text_fields > 1 {
                    return Err(invalid(schema, "more than one text-content field".to_string()));
                }
                if !matches!(f.value_type, ValueType::Scalar(_)) {
                    return Err(invalid(
                        schema,
                        format!("field {}: text content must be scalar", f.name),
                    ));
                }
            }
        }

        if let Some(default) = &f.default {
            if f.required {
                // Absent-means-use-default only makes sense for optional fields.
                return Err(invalid(
                    schema,
                    format!("field {}: required field cannot declare a default", f.name),
                ));
            }
            match &f.value_type {
                ValueType::Scalar(ty) if f.kind != FieldKind::ElementList => {
                    if default.scalar_type() != *ty {
                        return Err(invalid(
                            schema,
                            format!(
                                "field {}: default is {} but the field is {}",
                                f.name,
                                default.scalar_type().name(),
                                ty.name()
                            ),
                        ));
                    }
                }
                _ => {
                    return Err(invalid(
                        schema,
                        format!("field {}: only scalar fields can declare a default", f.name),
                    ));
                }
            }
        }

        if f.emit_empty
            && !(f.kind == FieldKind::Element
                && f.value_type == ValueType::Scalar(ScalarType::String))
        {
            return Err(invalid(
                schema,
                format!("field {}: emit_empty applies to string elements only", f.name),
            ));
        }
    }

    if text_fields > 0 && has_elements {
        return Err(invalid(
            schema,
            "text content cannot coexist with child elements".to_string(),
        ));
    }

    Ok(())
}
