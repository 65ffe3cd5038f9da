use anyhow::Result;
use districtor::{load_project, save_project};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::BranchArgs) -> Result<()> {
    let mut session = load_project(&args.project)?;
    let id = session.branch_scenario(args.from, &args.name)?;
    save_project(&args.project, &session)?;
    println!("[branch] created scenario {id} '{}' from {}", args.name, args.from);
    Ok(())
}
