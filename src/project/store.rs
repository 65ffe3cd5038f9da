use std::{fs, path::Path, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::{
    common::{ensure_dir_exists, require_dir_exists, write_atomic, JsonFileSettings, ProjectConfig, SettingsStore},
    layer::{AuditLog, District, DistrictField, DistrictLayer, Meshblock, MeshblockLayer},
    scenario::{AssignmentRow, Scenario, ScenarioRegistry},
    session::RedistrictSession,
    types::{AttrValue, DistrictId, DistrictType},
};
use super::geojson::{read_feature_collection, write_feature_collection};

pub const MESHBLOCKS_FILE: &str = "meshblocks.geojson";
pub const ELECTORATES_FILE: &str = "electorates.geojson";
pub const SCENARIOS_FILE: &str = "scenarios.json";
pub const USER_LOG_FILE: &str = "user_log.json";

const MESHBLOCK_NUMBER_FIELD: &str = "meshblock_number";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScenarioFile {
    scenarios: Vec<Scenario>,
    assignments: Vec<AssignmentRow>,
}

fn district_id(value: Option<&Value>) -> Result<Option<DistrictId>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(|n| Some(DistrictId::from(n))).ok_or_else(|| anyhow!("Invalid electorate id {n}")),
        Some(Value::String(text)) => Ok(Some(DistrictId::from(text.as_str()))),
        Some(other) => bail!("Invalid electorate id {other}"),
    }
}

fn integer(value: Option<&Value>) -> Result<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| anyhow!("Expected an integer, found {value}")),
    }
}

fn text(properties: &Map<String, Value>, key: &str) -> String {
    properties.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn id_field(ty: DistrictType) -> String { format!("{}_electorate_id", ty.column_prefix()) }

fn pop_field(ty: DistrictType) -> String { format!("{}_offline_pop", ty.column_prefix()) }

fn read_meshblocks(path: &Path) -> Result<MeshblockLayer> {
    let bytes = fs::read(path).with_context(|| format!("[project] Failed to read {}", path.display()))?;
    let meshblocks = read_feature_collection(&bytes)?.into_iter().enumerate().map(|(i, (properties, geometry))| {
        let number = integer(properties.get(MESHBLOCK_NUMBER_FIELD))?
            .ok_or_else(|| anyhow!("Meshblock feature {i} has no {MESHBLOCK_NUMBER_FIELD}"))?;
        let geometry = geometry.ok_or_else(|| anyhow!("Meshblock {number} has no geometry"))?;
        let mut meshblock = Meshblock::new(number, geometry);
        for ty in DistrictType::order() {
            meshblock.districts.set(ty, district_id(properties.get(&id_field(ty)))?);
            meshblock.offline_pop.set(ty, integer(properties.get(&pop_field(ty)))?);
        }
        Ok(meshblock)
    }).collect::<Result<Vec<_>>>()
        .with_context(|| format!("[project] Invalid meshblock in {}", path.display()))?;
    MeshblockLayer::new(meshblocks)
}

fn write_meshblocks(path: &Path, layer: &MeshblockLayer) -> Result<()> {
    let bytes = write_feature_collection(layer.meshblocks().iter().map(|meshblock| {
        let mut properties = Map::new();
        properties.insert(MESHBLOCK_NUMBER_FIELD.into(), json!(meshblock.number));
        for ty in DistrictType::order() {
            properties.insert(id_field(ty), json!(meshblock.districts.get(ty)));
            properties.insert(pop_field(ty), json!(meshblock.offline_pop.get(ty)));
        }
        (properties, Some(&meshblock.geometry))
    }))?;
    write_atomic(path, &bytes)
}

const DISTRICT_FIELDS: [DistrictField; 7] = [
    DistrictField::EstimatedPop,
    DistrictField::ScenarioId,
    DistrictField::StatsPop,
    DistrictField::StatsVarYear1,
    DistrictField::StatsVarYear2,
    DistrictField::Invalid,
    DistrictField::InvalidReason,
];

fn read_electorates(path: &Path) -> Result<DistrictLayer> {
    let bytes = fs::read(path).with_context(|| format!("[project] Failed to read {}", path.display()))?;
    let mut layer = DistrictLayer::new();
    for (i, (properties, geometry)) in read_feature_collection(&bytes)?.into_iter().enumerate() {
        let id = district_id(properties.get("electorate_id"))?
            .ok_or_else(|| anyhow!("[project] Electorate feature {i} has no electorate_id"))?;
        let ty = DistrictType::from_code(&text(&properties, "type"))
            .with_context(|| format!("[project] Electorate feature {i} has an invalid type"))?;
        let mut district = District::new(id, ty, &text(&properties, "code"), &text(&properties, "name"));
        district.geometry = geometry;
        district.estimated_pop = integer(properties.get(DistrictField::EstimatedPop.to_str()))?;
        district.scenario_id = integer(properties.get(DistrictField::ScenarioId.to_str()))?;
        district.stats_pop = integer(properties.get(DistrictField::StatsPop.to_str()))?;
        district.stats_var_year1 = integer(properties.get(DistrictField::StatsVarYear1.to_str()))?;
        district.stats_var_year2 = integer(properties.get(DistrictField::StatsVarYear2.to_str()))?;
        district.invalid = properties.get(DistrictField::Invalid.to_str()).and_then(Value::as_bool);
        district.invalid_reason = properties.get(DistrictField::InvalidReason.to_str()).and_then(Value::as_str).map(str::to_string);
        layer.add_district(district)?;
    }
    Ok(layer)
}

fn write_electorates(path: &Path, layer: &DistrictLayer) -> Result<()> {
    let bytes = write_feature_collection(layer.districts().map(|district| {
        let mut properties = Map::new();
        properties.insert("electorate_id".into(), json!(district.district_id));
        properties.insert("type".into(), json!(district.ty.to_str()));
        properties.insert("code".into(), json!(district.code));
        properties.insert("name".into(), json!(district.name));
        for field in DISTRICT_FIELDS {
            let value = match district.attribute(field) {
                AttrValue::Null => Value::Null,
                AttrValue::Bool(b) => json!(b),
                AttrValue::Int(n) => json!(n),
                AttrValue::Text(s) => json!(s),
            };
            properties.insert(field.to_str().into(), value);
        }
        (properties, district.geometry.as_ref())
    }))?;
    write_atomic(path, &bytes)
}

/// Load a project directory into a session.
///
/// Missing `scenarios.json`, `user_log.json` and settings files start empty;
/// the two layers are required.
pub fn load_project(dir: &Path) -> Result<RedistrictSession> {
    require_dir_exists(dir)?;
    let config = ProjectConfig::load(dir)?;
    let user = config.author();

    let meshblocks = read_meshblocks(&dir.join(MESHBLOCKS_FILE))?;
    let districts = read_electorates(&dir.join(ELECTORATES_FILE))?;

    let scenarios_path = dir.join(SCENARIOS_FILE);
    let scenarios = if scenarios_path.exists() {
        let bytes = fs::read(&scenarios_path).with_context(|| format!("[project] Failed to read {}", scenarios_path.display()))?;
        let file: ScenarioFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("[project] Failed to parse {}", scenarios_path.display()))?;
        ScenarioRegistry::from_rows(&user, file.scenarios, file.assignments)?
    } else {
        ScenarioRegistry::new(&user)
    };

    let log_path = dir.join(USER_LOG_FILE);
    let audit = if log_path.exists() {
        let bytes = fs::read(&log_path).with_context(|| format!("[project] Failed to read {}", log_path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("[project] Failed to parse {}", log_path.display()))?
    } else {
        AuditLog::new()
    };

    let settings: Arc<dyn SettingsStore> = Arc::new(JsonFileSettings::open(&dir.join(&config.settings_file))?);
    info!(
        dir = %dir.display(),
        meshblocks = meshblocks.len(),
        electorates = districts.len(),
        scenarios = scenarios.scenarios().len(),
        "project loaded"
    );
    Ok(RedistrictSession::new(meshblocks, districts, audit, scenarios, config, settings))
}

/// Write the session's layers, scenarios and audit log back to a project directory.
pub fn save_project(dir: &Path, session: &RedistrictSession) -> Result<()> {
    ensure_dir_exists(dir)?;
    write_meshblocks(&dir.join(MESHBLOCKS_FILE), session.meshblocks())?;
    write_electorates(&dir.join(ELECTORATES_FILE), session.districts())?;

    let (scenarios, assignments) = session.scenarios().to_rows();
    let bytes = serde_json::to_vec_pretty(&ScenarioFile { scenarios, assignments })
        .context("[project] Failed to serialize scenarios")?;
    write_atomic(&dir.join(SCENARIOS_FILE), &bytes)?;

    let bytes = serde_json::to_vec_pretty(session.audit()).context("[project] Failed to serialize user log")?;
    write_atomic(&dir.join(USER_LOG_FILE), &bytes)?;
    info!(dir = %dir.display(), "project saved");
    Ok(())
}
