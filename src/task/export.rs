use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use ahash::AHashMap;
use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerWriter, prelude::{Column, CsvWriter}};
use serde_json::{json, Map};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{
    layer::{AuditEntry, AuditLog, DistrictLayer, MeshblockLayer},
    project::write_feature_collection,
    scenario::ScenarioRegistry,
    types::{DistrictId, DistrictType, MeshblockNumber, PerType, ScenarioId},
};
use super::{base::{DistrictSummary, ScenarioBaseTask}, job::{BackgroundJob, TaskControl}};

/// Archive entry holding the district polygons.
pub const ELECTORATES_TABLE: &str = "electorates.geojson";

/// Archive entry holding the per-meshblock district codes.
pub const MESHBLOCKS_TABLE: &str = "meshblocks.csv";

/// Archive entry holding the audit log.
pub const USER_LOG_TABLE: &str = "user_log.csv";

/// What an export wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub electorates: usize,
    pub meshblocks: usize,
    pub log_rows: usize,
}

/// Writes a scenario's electorates, meshblock codes and audit log into one zip archive.
#[derive(Debug, Clone)]
pub struct ExportScenarioTask {
    base: ScenarioBaseTask,
    scenario_name: String,
    destination: PathBuf,
    meshblock_codes: Vec<(MeshblockNumber, PerType<Option<String>>)>,
    log: Vec<AuditEntry>,
}

impl ExportScenarioTask {
    pub fn prepare(
        scenario_id: ScenarioId,
        scenarios: &ScenarioRegistry,
        meshblocks: &MeshblockLayer,
        districts: &DistrictLayer,
        audit: &AuditLog,
        destination: &Path,
    ) -> Result<Self> {
        let base = ScenarioBaseTask::prepare(scenario_id, scenarios, meshblocks, districts)?;

        let codes: AHashMap<(DistrictType, &DistrictId), &str> = districts.districts()
            .map(|district| ((district.ty, &district.district_id), district.code.as_str()))
            .collect();
        let code_of = |ty: DistrictType, id: &Option<DistrictId>| -> Option<String> {
            id.as_ref().map(|id| codes.get(&(ty, id)).map_or_else(|| id.to_string(), |code| code.to_string()))
        };

        let meshblock_codes = meshblocks.meshblocks().iter().map(|meshblock| {
            let codes = match scenarios.meshblock_assignment(scenario_id, meshblock.number) {
                Some(assignment) => PerType::new(
                    code_of(DistrictType::GeneralNorth, &assignment.gn),
                    code_of(DistrictType::GeneralSouth, &assignment.gs),
                    code_of(DistrictType::Maori, &assignment.m),
                ),
                None => PerType::default(),
            };
            (meshblock.number, codes)
        }).collect();

        Ok(Self {
            base,
            scenario_name: scenarios.get_scenario_name(scenario_id),
            destination: destination.to_path_buf(),
            meshblock_codes,
            log: audit.entries().map(|(_, entry)| entry.clone()).collect(),
        })
    }

    fn electorates_table(summaries: &[DistrictSummary]) -> Result<Vec<u8>> {
        write_feature_collection(summaries.iter().map(|summary| {
            let mut properties = Map::new();
            properties.insert("type".into(), json!(summary.ty.to_str()));
            properties.insert("code".into(), json!(summary.code));
            properties.insert("name".into(), json!(summary.name));
            (properties, summary.geometry.as_ref())
        }))
    }

    fn meshblocks_table(&self) -> Result<Vec<u8>> {
        let column = |ty: DistrictType| -> Column {
            Column::new(
                format!("{}_code", ty.column_prefix()).into(),
                self.meshblock_codes.iter().map(|(_, codes)| codes.get(ty).clone()).collect::<Vec<Option<String>>>(),
            )
        };
        let mut df = DataFrame::new(vec![
            Column::new("meshblock_number".into(), self.meshblock_codes.iter().map(|(number, _)| *number).collect::<Vec<i64>>()),
            column(DistrictType::GeneralNorth),
            column(DistrictType::GeneralSouth),
            column(DistrictType::Maori),
        ])?;
        csv_bytes(&mut df)
    }

    fn user_log_table(&self) -> Result<Vec<u8>> {
        let mut df = DataFrame::new(vec![
            Column::new("timestamp".into(), self.log.iter().map(|row| row.timestamp.to_rfc3339()).collect::<Vec<_>>()),
            Column::new("username".into(), self.log.iter().map(|row| row.username.clone()).collect::<Vec<_>>()),
            Column::new("meshblock_number".into(), self.log.iter().map(|row| row.meshblock_number).collect::<Vec<i64>>()),
            Column::new("type".into(), self.log.iter().map(|row| row.district_type.to_str()).collect::<Vec<_>>()),
            Column::new(
                "from_electorate".into(),
                self.log.iter().map(|row| row.from_district.as_ref().map(ToString::to_string)).collect::<Vec<Option<String>>>(),
            ),
            Column::new("to_electorate".into(), self.log.iter().map(|row| row.to_district.to_string()).collect::<Vec<_>>()),
        ])?;
        csv_bytes(&mut df)
    }
}

fn csv_bytes(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    CsvWriter::new(&mut out).finish(df)?;
    Ok(out)
}

/// Build the archive in a temporary file next to `destination`, carrying over
/// any existing entries that are not being replaced, then move it into place.
fn write_archive(destination: &Path, tables: &[(&str, Vec<u8>)]) -> Result<()> {
    let dir = destination.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("[export] failed to create temporary file in {}", dir.display()))?;

    {
        let mut writer = ZipWriter::new(temp.as_file_mut());
        if destination.exists() {
            let file = File::open(destination)
                .with_context(|| format!("[export] failed to open {}", destination.display()))?;
            let mut existing = ZipArchive::new(file)
                .with_context(|| format!("[export] {} is not a zip archive", destination.display()))?;
            for i in 0..existing.len() {
                let entry = existing.by_index_raw(i)?;
                if tables.iter().any(|(name, _)| *name == entry.name()) { continue }
                debug!(entry = entry.name(), "keeping archive entry");
                writer.raw_copy_file(entry)?;
            }
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in tables {
            writer.start_file(*name, options)
                .with_context(|| format!("[export] failed to add {name}"))?;
            writer.write_all(bytes)
                .with_context(|| format!("[export] failed to write {name}"))?;
        }
        writer.finish().context("[export] failed to finish archive")?;
    }

    temp.persist(destination)
        .with_context(|| format!("[export] failed to write {}", destination.display()))?;
    Ok(())
}

impl BackgroundJob for ExportScenarioTask {
    type Output = ExportSummary;

    fn description(&self) -> String {
        format!("Exporting scenario '{}' to {}", self.scenario_name, self.destination.display())
    }

    fn run(&mut self, control: &TaskControl) -> Result<ExportSummary> {
        let summaries = self.base.compute(control)?;
        let tables = [
            (ELECTORATES_TABLE, Self::electorates_table(&summaries)?),
            (MESHBLOCKS_TABLE, self.meshblocks_table()?),
            (USER_LOG_TABLE, self.user_log_table()?),
        ];
        control.check()?;

        write_archive(&self.destination, &tables)?;
        info!(path = %self.destination.display(), electorates = summaries.len(), "exported scenario");
        Ok(ExportSummary {
            path: self.destination.clone(),
            electorates: summaries.len(),
            meshblocks: self.meshblock_codes.len(),
            log_rows: self.log.len(),
        })
    }
}
