//! Reissue command implementation.

use super::{manual_actor, Context};
use crate::output::format_json;

pub fn run(
    ctx: &Context,
    certificate_id: String,
    actor: Option<String>,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = ctx.service()?;
    let issued = service.reissue(&certificate_id, &manual_actor(actor))?;
    if json_output {
        println!("{}", format_json(&issued));
    } else {
        println!("superseded:     {}", certificate_id.trim());
        println!("certificate_id: {}", issued.certificate_id);
        println!("payload_hash:   {}", issued.payload_hash);
    }
    Ok(())
}
