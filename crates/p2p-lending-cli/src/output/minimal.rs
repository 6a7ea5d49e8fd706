use serde_json::Value;

/// Fields that best summarise a record, most telling first.
const PRIORITY_KEYS: [&str; 6] = [
    "document",
    "status",
    "signed",
    "role",
    "collected_amount",
    "state_file",
];

/// Print just the key answer from the output.
///
/// A record prints its first non-null priority field. A list prints one
/// `id: <field>` line per record.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result_obj {
        Value::Object(map) => match key_field(map) {
            Some((_, val)) => println!("{}", format_minimal(val)),
            None => println!("{}", format_minimal(result_obj)),
        },
        Value::Array(items) => {
            for item in items {
                let Value::Object(map) = item else {
                    println!("{}", format_minimal(item));
                    continue;
                };
                let id = map.get("id").map(format_minimal).unwrap_or_default();
                match key_field(map) {
                    Some((_, val)) => println!("{}: {}", id, format_minimal(val)),
                    None => println!("{}", id),
                }
            }
        }
        other => println!("{}", format_minimal(other)),
    }
}

fn key_field(map: &serde_json::Map<String, Value>) -> Option<(&str, &Value)> {
    PRIORITY_KEYS
        .iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
