//! Init command implementation.

use idir_store::migrations;

use super::Context;

pub fn run(ctx: &Context) -> Result<(), Box<dyn std::error::Error>> {
    let store = ctx.open_store()?;
    let version = store.read(|conn| migrations::current_version(conn))?;
    println!(
        "Initialized certificate store at {} (schema version {})",
        store.config().database_path.display(),
        version
    );
    store.shutdown();
    Ok(())
}
