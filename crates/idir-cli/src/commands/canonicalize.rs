//! Canonicalize command implementation.

use idir_canonical::{canonicalize, sha256_hex};
use serde_json::Value;
use std::io::{self, Read};

pub fn run(input: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    // Read JSON from file or stdin
    let json_str = if let Some(path) = input {
        std::fs::read_to_string(&path).map_err(|e| format!("Failed to read file {}: {}", path, e))?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let value: Value = serde_json::from_str(&json_str).map_err(|e| format!("Invalid JSON: {}", e))?;
    let bytes = canonicalize(&value).map_err(|e| format!("Canonicalization failed: {}", e))?;

    println!("{}", String::from_utf8_lossy(&bytes));
    println!("sha256: {}", sha256_hex(&bytes));
    Ok(())
}
