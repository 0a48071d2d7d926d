//! Verify command implementation.

use idir_core::IntegrityStatus;
use idir_issuance::{PublicVerification, Verification};

use super::Context;
use crate::error::CliError;
use crate::output::format_json;

pub fn run(
    ctx: &Context,
    certificate_id: String,
    public: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = ctx.service()?;

    if public {
        let answer = service.public_verification(&certificate_id);
        if json_output {
            println!("{}", format_json(&answer));
        } else {
            print_public(&answer);
        }
        return match answer {
            PublicVerification::NotFound => Err(CliError::NotFound(certificate_id).into()),
            PublicVerification::Unavailable => Err(CliError::Unavailable.into()),
            _ => Ok(()),
        };
    }

    let verification = service.verify(&certificate_id)?;
    if json_output {
        println!("{}", format_json(&verification));
    } else {
        print_operator(&verification);
    }
    if !verification.is_intact() {
        return Err(CliError::IntegrityMismatch(verification.certificate.certificate_id.to_string()).into());
    }
    Ok(())
}

fn print_operator(verification: &Verification) {
    let certificate = &verification.certificate;
    println!("Certificate:   {}", certificate.certificate_id);
    println!("Status:        {}", certificate.status);
    println!(
        "Integrity:     {}",
        if verification.is_intact() { "intact" } else { "MISMATCH" }
    );
    println!("Payload hash:  {}", certificate.payload_hash);
    if !verification.is_intact() {
        println!("Computed hash: {}", verification.integrity.computed_hash);
    }
    if let Some(snapshot) = &verification.snapshot {
        println!("Student:       {}", snapshot.student_full_name);
        println!("Course:        {} ({})", snapshot.course_title, snapshot.course_id);
        println!("Completed at:  {}", snapshot.completed_at);
        println!("Issued at:     {}", snapshot.issued_at);
    }
    if let Some(revoked_at) = &certificate.revoked_at {
        println!(
            "Revoked at:    {} ({})",
            revoked_at,
            certificate.revoked_reason.as_deref().unwrap_or("no reason recorded")
        );
    }
    if let Some(next) = &certificate.superseded_by {
        println!("Superseded by: {}", next);
    }
}

fn print_public(answer: &PublicVerification) {
    println!("Outcome:       {}", answer.outcome());
    if let Some(certificate) = answer.certificate() {
        println!("Certificate:   {}", certificate.certificate_id);
        if let Some(name) = &certificate.student_full_name {
            println!("Student:       {}", name);
        }
        if let Some(title) = &certificate.course_title {
            println!("Course:        {}", title);
        }
        if let Some(completed_at) = &certificate.completed_at {
            println!("Completed at:  {}", completed_at);
        }
        println!("Issued at:     {}", certificate.issued_at);
        if certificate.integrity == IntegrityStatus::Mismatch {
            println!("Integrity:     MISMATCH");
        }
    }
    match answer {
        PublicVerification::Revoked {
            revoked_at,
            revoked_reason,
            ..
        } => {
            if let Some(at) = revoked_at {
                println!("Revoked at:    {}", at);
            }
            if let Some(reason) = revoked_reason {
                println!("Reason:        {}", reason);
            }
        }
        PublicVerification::Reissued { superseded_by, .. } => {
            if let Some(next) = superseded_by {
                println!("This certificate was reissued; request {} instead.", next);
            }
        }
        _ => {}
    }
}
