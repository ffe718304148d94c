//! The `clbprep validate` command.

use std::path::PathBuf;

use anyhow::Result;

use clbprep_core::Skill;

use crate::submission::{field_errors, format_field_errors, Submission};

pub fn execute(skill: Skill, input: PathBuf) -> Result<()> {
    let err = match Submission::load(skill, &input) {
        Ok(_) => {
            println!("{}: valid {skill} submission.", input.display());
            return Ok(());
        }
        Err(err) => err,
    };

    let Some(errors) = field_errors(&err) else {
        return Err(err);
    };
    println!("{}: invalid {skill} submission", input.display());
    print!("{}", format_field_errors(errors));
    anyhow::bail!("{} field error(s) found", errors.fields().len())
}
