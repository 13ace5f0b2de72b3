//! CLI command implementations

pub mod run;
pub mod validate;

use std::collections::HashMap;

/// Parse repeated `--arg name=value` bindings.
pub fn parse_arg_bindings(pairs: &[String]) -> Result<HashMap<String, String>, String> {
    let mut supplied = HashMap::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                supplied.insert(name.to_string(), value.to_string());
            }
            _ => return Err(format!("invalid argument binding {pair:?}, expected NAME=VALUE")),
        }
    }
    Ok(supplied)
}
