//! Issue command implementation.

use clap::Args;
use idir_issuance::IssueInput;

use super::{manual_actor, Context};
use crate::output::format_json;

#[derive(Args)]
pub struct IssueArgs {
    /// Student full name
    #[arg(long)]
    pub name: String,
    /// Student email (only its hash enters the certificate)
    #[arg(long)]
    pub email: String,
    /// Course title
    #[arg(long)]
    pub course: String,
    /// Completion date (YYYY-MM-DD or RFC 3339)
    #[arg(long)]
    pub completed_at: String,
    /// Course identifier (default: derived from the title)
    #[arg(long)]
    pub course_id: Option<String>,
    /// Course revision timestamp (default: issuance time)
    #[arg(long)]
    pub course_version: Option<String>,
    /// Issuance time override
    #[arg(long)]
    pub issued_at: Option<String>,
    /// Operator email recorded in the audit log
    #[arg(long)]
    pub actor: Option<String>,
    /// Explicit ID segment; repeat or comma-separate for several
    #[arg(long = "segment", value_delimiter = ',')]
    pub segments: Vec<String>,
    /// Originating course signup
    #[arg(long)]
    pub course_signup_id: Option<String>,
    /// Rendered PDF reference
    #[arg(long)]
    pub pdf_url: Option<String>,
    /// Rendered image reference
    #[arg(long)]
    pub jpg_url: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IssueArgs {
    fn into_input(self) -> IssueInput {
        let mut input = IssueInput::new(self.name, self.email, self.course, self.completed_at)
            .with_actor(manual_actor(self.actor))
            .with_segments(self.segments)
            .with_artifacts(self.pdf_url, self.jpg_url);
        input.course_id = self.course_id;
        input.course_version = self.course_version.map(Into::into);
        input.issued_at = self.issued_at.map(Into::into);
        input.course_signup_id = self.course_signup_id;
        input
    }
}

pub fn run(ctx: &Context, args: IssueArgs) -> Result<(), Box<dyn std::error::Error>> {
    let json_output = args.json;
    let service = ctx.service()?;
    let issued = service.issue(&args.into_input())?;

    if json_output {
        println!("{}", format_json(&issued));
    } else {
        println!("certificate_id: {}", issued.certificate_id);
        println!("payload_hash:   {}", issued.payload_hash);
    }
    Ok(())
}
