use std::path::PathBuf;

use districtor::{DistrictId, DistrictType, MeshblockNumber, ScenarioId};

/// Electorate redistricting over a project directory
#[derive(clap::Parser, Debug)]
#[command(name = "districtor", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv); DISTRICTOR_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// List scenarios, marking the live one
    Scenarios(ProjectArgs),

    /// Copy a scenario under a new name
    Branch(BranchArgs),

    /// Move meshblocks into an electorate
    Reassign(ReassignArgs),

    /// Make a scenario the live one
    Switch(ScenarioArgs),

    /// Check a scenario's electorates against quota and contiguity
    Validate(ScenarioArgs),

    /// Write a scenario to a zip archive
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ProjectArgs {
    /// Project directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub project: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct ScenarioArgs {
    /// Project directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub project: PathBuf,

    /// Scenario id
    #[arg(short, long)]
    pub scenario: ScenarioId,
}

#[derive(clap::Args, Debug)]
pub struct BranchArgs {
    /// Project directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub project: PathBuf,

    /// Source scenario id
    #[arg(long)]
    pub from: ScenarioId,

    /// Name of the new scenario
    #[arg(long)]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct ReassignArgs {
    /// Project directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub project: PathBuf,

    /// District type: GN, GS or M
    #[arg(short = 't', long = "type", value_parser = parse_district_type)]
    pub district_type: DistrictType,

    /// Target electorate id
    #[arg(short, long, value_parser = parse_district_id)]
    pub district: DistrictId,

    /// Undo label for the change
    #[arg(long, default_value = "Redistrict")]
    pub label: String,

    /// Meshblock numbers to move
    #[arg(required = true)]
    pub meshblocks: Vec<MeshblockNumber>,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Project directory
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub project: PathBuf,

    /// Scenario id
    #[arg(short, long)]
    pub scenario: ScenarioId,

    /// Output archive, defaults to "./scenario-<id>.zip"
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

fn parse_district_type(code: &str) -> Result<DistrictType, String> {
    DistrictType::from_code(code).map_err(|err| err.to_string())
}

/// Integer ids stay integers; anything else is a text id.
fn parse_district_id(value: &str) -> Result<DistrictId, String> {
    Ok(value.parse::<i64>().map(DistrictId::from).unwrap_or_else(|_| DistrictId::from(value)))
}
