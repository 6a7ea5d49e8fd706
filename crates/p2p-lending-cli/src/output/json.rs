use serde_json::Value;

/// Print JSON to stdout: pretty for a terminal, one line per invocation
/// when piped so scripts can chain `p2pl` calls.
pub fn print_json(value: &Value) {
    match render(value, atty::is(atty::Stream::Stdout)) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}

fn render(value: &Value, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
