//! Revoke command implementation.

use super::{manual_actor, Context};

pub fn run(
    ctx: &Context,
    certificate_id: String,
    reason: String,
    actor: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = ctx.service()?;
    let revocation = service.revoke(&certificate_id, &reason, &manual_actor(actor))?;
    println!(
        "Revoked {} at {}: {}",
        revocation.certificate_id, revocation.revoked_at, revocation.reason
    );
    Ok(())
}
