//! Parse schema definition sources into `MessageSchema`s using PEST.
//!
//! Message catalogs are static configuration: definition files are parsed at
//! startup and the result is fed to `SchemaRegistry::register`. Cross-field
//! and cross-schema invariants are the registry's job; this module only
//! rejects shapes the definition language itself cannot mean.

use crate::schema::{FieldDescriptor, FieldKind, Literal, MessageSchema, ScalarType, ValueType};
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

/// Parse one definition source into schemas, in declaration order.
pub fn parse_schemas(source: &str) -> Result<Vec<MessageSchema>, String> {
    let pairs = SchemaParser::parse(Rule::schema_file, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let file = pairs.into_iter().next().ok_or("Empty parse")?;

    let mut namespace: Option<String> = None;
    let mut schemas = Vec::new();
    for decl in file.into_inner() {
        match decl.as_rule() {
            Rule::namespace_decl => namespace = Some(build_namespace(decl)?),
            Rule::message_section | Rule::struct_section => {
                schemas.push(build_section(decl, namespace.as_deref())?);
            }
            _ => {}
        }
    }
    Ok(schemas)
}

fn build_namespace(pair: pest::iterators::Pair<Rule>) -> Result<String, String> {
    let lit = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::string_literal)
        .ok_or("namespace: missing string")?;
    let ns = unquote(lit.as_str());
    if ns.is_empty() {
        return Err("namespace must not be empty".to_string());
    }
    Ok(ns)
}

fn build_section(
    pair: pest::iterators::Pair<Rule>,
    namespace: Option<&str>,
) -> Result<MessageSchema, String> {
    let mut root = String::new();
    let mut fields = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => root = inner.as_str().to_string(),
            Rule::field_decl => fields.push(build_field(inner)?),
            _ => {}
        }
    }
    if root.is_empty() {
        return Err("section: missing name".to_string());
    }
    Ok(MessageSchema {
        root,
        namespace: namespace.map(str::to_string),
        fields,
    })
}

// ==================== Fields ====================

/// Parsed type shape before it is folded into a descriptor.
enum TypeToken {
    Scalar(ScalarType),
    Text,
    Ref(String),
}

fn build_field(pair: pest::iterators::Pair<Rule>) -> Result<FieldDescriptor, String> {
    let mut is_attr = false;
    let mut name = String::new();
    let mut parsed = None;
    let mut wire = None;
    let mut default = None;
    let mut emit_empty = false;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::attr_mark => is_attr = true,
            Rule::ident => name = inner.as_str().to_string(),
            Rule::type_spec => parsed = Some(build_type_spec(inner)?),
            Rule::as_clause => {
                let lit = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::string_literal)
                    .ok_or("as: missing wire name")?;
                wire = Some(unquote(lit.as_str()));
            }
            Rule::default_clause => {
                let lit = inner.into_inner().next().ok_or("default: missing literal")?;
                default = Some(build_literal(lit)?);
            }
            Rule::flag_clause => {
                for flag in inner.into_inner() {
                    if flag.as_rule() == Rule::flag && flag.as_str() == "emit_empty" {
                        emit_empty = true;
                    }
                }
            }
            _ => {}
        }
    }

    let (optional, list, token) = parsed.ok_or_else(|| format!("field {}: missing type", name))?;

    let kind;
    let value_type;
    match token {
        TypeToken::Text => {
            if is_attr {
                return Err(format!("field {}: text content cannot be an attribute", name));
            }
            if list {
                return Err(format!("field {}: text content cannot repeat", name));
            }
            kind = FieldKind::Text;
            value_type = ValueType::Scalar(ScalarType::String);
        }
        TypeToken::Scalar(ty) => {
            kind = field_kind(is_attr, list, &name)?;
            value_type = ValueType::Scalar(ty);
        }
        TypeToken::Ref(target) => {
            if is_attr {
                return Err(format!("field {}: attributes must be scalar", name));
            }
            kind = field_kind(false, list, &name)?;
            value_type = ValueType::Schema(target);
        }
    }

    Ok(FieldDescriptor {
        wire: wire.unwrap_or_else(|| name.clone()),
        name,
        kind,
        value_type,
        required: !optional,
        default,
        emit_empty,
    })
}

fn field_kind(is_attr: bool, list: bool, name: &str) -> Result<FieldKind, String> {
    match (is_attr, list) {
        (true, true) => Err(format!("field {}: attributes cannot repeat", name)),
        (true, false) => Ok(FieldKind::Attribute),
        (false, true) => Ok(FieldKind::ElementList),
        (false, false) => Ok(FieldKind::Element),
    }
}

/// Returns (optional, list, inner type).
fn build_type_spec(pair: pest::iterators::Pair<Rule>) -> Result<(bool, bool, TypeToken), String> {
    let inner = pair.into_inner().next().ok_or("Empty type")?;
    match inner.as_rule() {
        Rule::optional_type => {
            let wrapped = inner
                .into_inner()
                .find(|p| matches!(p.as_rule(), Rule::list_type | Rule::simple_type))
                .ok_or("optional<T>: missing inner type")?;
            match wrapped.as_rule() {
                Rule::list_type => Ok((true, true, build_list_elem(wrapped)?)),
                _ => Ok((true, false, build_simple(wrapped)?)),
            }
        }
        Rule::list_type => Ok((false, true, build_list_elem(inner)?)),
        Rule::simple_type => Ok((false, false, build_simple(inner)?)),
        other => Err(format!("Unhandled type rule: {:?}", other)),
    }
}

fn build_list_elem(pair: pest::iterators::Pair<Rule>) -> Result<TypeToken, String> {
    let elem = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::simple_type)
        .ok_or("list<T>: missing element type")?;
    build_simple(elem)
}

fn build_simple(pair: pest::iterators::Pair<Rule>) -> Result<TypeToken, String> {
    let inner = pair.into_inner().next().ok_or("Empty simple type")?;
    match inner.as_rule() {
        Rule::base_type => match inner.as_str() {
            "string" => Ok(TypeToken::Scalar(ScalarType::String)),
            "int" | "long" => Ok(TypeToken::Scalar(ScalarType::Int)),
            "bool" => Ok(TypeToken::Scalar(ScalarType::Bool)),
            "text" => Ok(TypeToken::Text),
            other => Err(format!("Unknown base type: {}", other)),
        },
        Rule::ident => Ok(TypeToken::Ref(inner.as_str().to_string())),
        other => Err(format!("Unhandled simple type rule: {:?}", other)),
    }
}

fn build_literal(pair: pest::iterators::Pair<Rule>) -> Result<Literal, String> {
    match pair.as_rule() {
        Rule::literal => {
            let inner = pair.into_inner().next().ok_or("Empty literal")?;
            build_literal(inner)
        }
        Rule::string_literal => Ok(Literal::Str(unquote(pair.as_str()))),
        Rule::bool_literal => Ok(Literal::Bool(pair.as_str() == "true")),
        Rule::int_literal => pair
            .as_str()
            .parse::<i64>()
            .map(Literal::Int)
            .map_err(|_| format!("bad integer literal: {}", pair.as_str())),
        other => Err(format!("Unhandled literal rule: {:?}", other)),
    }
}

fn unquote(s: &str) -> String {
    let inner = &s[1..s.len() - 1];
    inner.replace("\\\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_message() {
        let schemas = parse_schemas("message Ping { }").expect("parse");
        assert_eq!(schemas.len(), 1);
        assert_eq!(schemas[0].root, "Ping");
        assert!(schemas[0].namespace.is_none());
        assert!(schemas[0].fields.is_empty());
    }

    #[test]
    fn namespace_applies_to_following_sections() {
        let src = r#"
namespace "urn:mailadmin";
message GetCosRequest {
	cos: optional<CosSelector>;
}
struct CosSelector {
	@by: optional<string>;
	value: text;
}
"#;
        let schemas = parse_schemas(src).expect("parse");
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].namespace.as_deref(), Some("urn:mailadmin"));
        assert_eq!(schemas[1].namespace.as_deref(), Some("urn:mailadmin"));
    }

    #[test]
    fn field_shapes() {
        let src = r#"
message CreateAccountRequest {
	name: string as "name";
	password: optional<string> [emit_empty];
	@limit: optional<int> = 25;
	a: optional<list<Attr>>;
}
struct Attr {
	@n: string;
	value: optional<text>;
}
"#;
        let schemas = parse_schemas(src).expect("parse");
        let req = &schemas[0];
        let name = req.field("name").expect("name");
        assert_eq!(name.kind, FieldKind::Element);
        assert!(name.required);
        let password = req.field("password").expect("password");
        assert!(!password.required);
        assert!(password.emit_empty);
        let limit = req.field("limit").expect("limit");
        assert_eq!(limit.kind, FieldKind::Attribute);
        assert_eq!(limit.default, Some(Literal::Int(25)));
        let attrs = req.field("a").expect("a");
        assert_eq!(attrs.kind, FieldKind::ElementList);
        assert_eq!(attrs.value_type, ValueType::Schema("Attr".to_string()));
        assert!(!attrs.required);

        let attr = &schemas[1];
        let value = attr.field("value").expect("value");
        assert_eq!(value.kind, FieldKind::Text);
        assert!(!value.required);
    }

    #[test]
    fn rejects_attribute_shapes() {
        for src in [
            "message M { @v: text; }",
            "message M { @v: list<string>; }",
            "message M { @v: SomeStruct; }",
            "message M { v: list<text>; }",
        ] {
            assert!(parse_schemas(src).is_err(), "should reject {:?}", src);
        }
    }

    #[test]
    fn rejects_syntax_errors() {
        for src in [
            "message { }",
            "message M { x: ; }",
            "message M { x string; }",
            "message M { x: string }",
            "msg M { }",
        ] {
            assert!(parse_schemas(src).is_err(), "should reject {:?}", src);
        }
    }

    #[test]
    fn comments_and_crlf_accepted() {
        let src = "// catalog\r\nmessage M {\r\n\t// id attribute\r\n\t@id: string; /* inline */\r\n}\r\n";
        let schemas = parse_schemas(src).expect("parse");
        assert_eq!(schemas[0].fields.len(), 1);
    }
}
