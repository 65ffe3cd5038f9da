use anyhow::Result;
use districtor::{load_project, save_project};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ReassignArgs) -> Result<()> {
    let mut session = load_project(&args.project)?;
    session.start_editing();
    if let Err(err) = session.redistrict(args.district_type, &args.label, &args.meshblocks, &args.district) {
        session.rollback_changes()?;
        return Err(err);
    }
    session.commit_changes()?;
    save_project(&args.project, &session)?;

    if let Some(district) = session.districts().find(args.district_type, &args.district) {
        println!(
            "[reassign] {} meshblock(s) -> {} {} (estimated population {})",
            args.meshblocks.len(),
            district.code,
            district.name,
            district.estimated_pop.map_or("-".to_string(), |pop| pop.to_string()),
        );
    }
    Ok(())
}
