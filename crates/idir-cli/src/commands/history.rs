//! History command implementation.

use super::Context;
use crate::output::{format_event_row, format_json, print_history_header};

pub fn run(ctx: &Context, certificate_id: String, json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let service = ctx.service()?;
    let events = service.history(&certificate_id)?;
    if json_output {
        println!("{}", format_json(&events));
    } else {
        print_history_header();
        for event in &events {
            println!("{}", format_event_row(event));
        }
    }
    Ok(())
}
