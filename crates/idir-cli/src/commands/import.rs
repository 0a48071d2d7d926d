//! Import command implementation.

use clap::Args;
use idir_issuance::bulk::{self, BulkError, ImportOptions};
use std::path::PathBuf;

use super::{manual_actor, Context};
use crate::error::CliError;
use crate::output::{
    format_json, format_plan_row, format_report_row, print_plan_header, print_report_header,
};

#[derive(Args)]
pub struct ImportArgs {
    /// CSV file with student_name, student_email, course_title, completed_at[, course_id]
    pub file: PathBuf,
    /// Operator email recorded on every issued certificate
    #[arg(long)]
    pub actor: Option<String>,
    /// Validate and print the plan without issuing anything
    #[arg(long)]
    pub dry_run: bool,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(ctx: &Context, args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let rows = bulk::read_csv_path(&args.file)?;
    let options = ImportOptions {
        actor: manual_actor(args.actor),
    };

    let batch = match bulk::validate(rows, &options) {
        Ok(batch) => batch,
        Err(BulkError::Invalid(errors)) => {
            if args.json {
                println!("{}", format_json(&errors));
            } else {
                for error in &errors {
                    eprintln!("{}", error);
                }
            }
            return Err(BulkError::Invalid(errors).into());
        }
        Err(e) => return Err(e.into()),
    };

    if args.dry_run {
        let plan = batch.plan();
        if args.json {
            println!("{}", format_json(&plan));
        } else {
            print_plan_header();
            for entry in &plan.entries {
                println!("{}", format_plan_row(entry));
            }
            println!();
            println!("Dry run: {} row(s) valid, nothing issued", plan.entries.len());
        }
        return Ok(());
    }

    let service = ctx.service()?;
    let report = batch.issue_all(&service);
    if args.json {
        println!("{}", format_json(&report));
    } else {
        print_report_header();
        for outcome in &report.rows {
            println!("{}", format_report_row(outcome));
        }
        println!();
        println!("{} issued, {} failed", report.succeeded(), report.failed());
    }

    if report.has_failures() {
        return Err(CliError::RowsFailed {
            failed: report.failed(),
            total: report.rows.len(),
        }
        .into());
    }
    Ok(())
}
