//! Format decoded message values for display (CLI output, debugging).

use crate::value::{MessageValue, Value};

/// Multi-line indented rendering. Fields are sorted by name so the output is
/// stable regardless of map order.
pub fn message_to_dump(value: &MessageValue, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    if value.is_empty() {
        return format!("{}{{}}", pad);
    }
    let mut fields: Vec<(&str, &Value)> = value.fields().collect();
    fields.sort_by_key(|(n, _)| *n);
    let mut lines = vec![format!("{}{{", pad)];
    for (name, v) in fields {
        lines.push(format!("{}  {}: {}", pad, name, value_to_dump(v, indent + 1)));
    }
    lines.push(format!("{}}}", pad));
    lines.join("\n")
}

fn value_to_dump(v: &Value, indent: usize) -> String {
    match v {
        Value::Str(s) => format!("{:?}", s),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Msg(m) => message_to_dump(m, indent).trim_start().to_string(),
        Value::List(items) => {
            if items.is_empty() {
                return "[]".to_string();
            }
            let pad = "  ".repeat(indent);
            let mut lines = vec!["[".to_string()];
            for (i, item) in items.iter().enumerate() {
                lines.push(format!("{}  [{}] {}", pad, i, value_to_dump(item, indent + 1)));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
    }
}

/// One-line summary (first line of the full dump).
pub fn summary_line(value: &MessageValue) -> String {
    let mut fields: Vec<(&str, &Value)> = value.fields().collect();
    fields.sort_by_key(|(n, _)| *n);
    let rendered: Vec<String> = fields
        .iter()
        .map(|(n, v)| match v {
            Value::Str(s) => format!("{}={:?}", n, s),
            Value::Int(i) => format!("{}={}", n, i),
            Value::Bool(b) => format!("{}={}", n, b),
            Value::Msg(_) => format!("{}={{..}}", n),
            Value::List(items) => format!("{}=[{}]", n, items.len()),
        })
        .collect();
    format!("{{{}}}", rendered.join(", "))
}
