use anyhow::Result;
use districtor::{load_project, save_project};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ScenarioArgs) -> Result<()> {
    let mut session = load_project(&args.project)?;
    let report = session.validate_scenario(args.scenario)?;
    if session.live_scenario() == Some(args.scenario) {
        save_project(&args.project, &session)?;
    } else {
        println!("[validate] scenario {} is not live; electorates were not flagged", args.scenario);
    }

    if report.is_valid() {
        println!("[validate] all electorates are valid");
    }
    for result in &report.results {
        println!("[validate] {} {} ({}): {}", result.district_type, result.district_id, result.name, result.error);
    }
    Ok(())
}
