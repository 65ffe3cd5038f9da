use anyhow::Result;
use districtor::{load_project, save_project};

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ScenarioArgs) -> Result<()> {
    let mut session = load_project(&args.project)?;
    session.switch_scenario(args.scenario)?;
    save_project(&args.project, &session)?;
    println!("[switch] live scenario is now '{}'", session.scenarios().get_scenario_name(args.scenario));
    Ok(())
}
