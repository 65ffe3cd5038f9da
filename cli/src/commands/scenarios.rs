use anyhow::Result;
use districtor::load_project;

pub fn run(_cli: &crate::cli::Cli, args: &crate::cli::ProjectArgs) -> Result<()> {
    let session = load_project(&args.project)?;
    let live = session.live_scenario();

    for scenario in session.scenarios().scenarios() {
        let marker = if Some(scenario.id) == live { "*" } else { " " };
        println!(
            "{marker} {:>4}  {:<30} {}  {}",
            scenario.id,
            scenario.name,
            scenario.created.format("%Y-%m-%d %H:%M"),
            scenario.created_by,
        );
    }
    Ok(())
}
