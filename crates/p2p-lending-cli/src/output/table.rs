use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Nested arrays of records printed as their own table under the main one.
const DETAIL_TABLES: [(&str, &str); 2] = [("lendings", "Lendings"), ("signed_agreement_urls", "Signed agreements")];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            // Check if "result" key holds the primary data
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_record(map);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Some(Value::String(action)) = envelope.get("action") {
        println!("Action: {}\n", action);
    }

    match result {
        Value::Object(res_map) => print_record(res_map),
        Value::Array(arr) => print_array_table(arr),
        other => println!("{}", format_value(other)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }
}

/// One Field/Value table, then detail tables for nested record lists.
fn print_record(map: &serde_json::Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        if key == "lendings" {
            continue;
        }
        match val {
            Value::Object(inner) => {
                for (inner_key, inner_val) in inner {
                    if DETAIL_TABLES.iter().any(|(k, _)| k == inner_key) {
                        continue;
                    }
                    let label = format!("{}.{}", key, inner_key);
                    builder.push_record([label.as_str(), &format_value(inner_val)]);
                }
            }
            _ => builder.push_record([key.as_str(), &format_value(val)]),
        }
    }
    println!("{}", Table::from(builder));

    for (key, title) in DETAIL_TABLES {
        let nested = map
            .get(key)
            .or_else(|| map.values().find_map(|v| v.as_object().and_then(|o| o.get(key))));
        if let Some(Value::Array(rows)) = nested {
            if !rows.is_empty() {
                println!("\n{}:", title);
                print_array_table(rows);
            }
        }
    }
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    // Collect all keys from first object for headers
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
