use std::{fs::File, io::Read, path::Path, sync::Arc};

use districtor::{
    load_project, save_project, AuditLog, District, DistrictId, DistrictLayer, DistrictType, Meshblock,
    JsonFileSettings, MeshblockLayer, PerType, ProjectConfig, RedistrictSession, ScenarioRegistry,
    ELECTORATES_TABLE, MESHBLOCKS_TABLE, USER_LOG_TABLE,
};
use geo::{polygon, MultiPolygon};
use zip::ZipArchive;

fn square(x: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![(x: x, y: 0.0), (x: x + 1.0, y: 0.0), (x: x + 1.0, y: 1.0), (x: x, y: 1.0), (x: x, y: 0.0)]])
}

/// Write a two-meshblock, two-electorate project with one scenario.
fn write_project(dir: &Path) {
    let meshblocks = MeshblockLayer::new(vec![
        {
            let mut meshblock = Meshblock::new(100, square(0.0));
            meshblock.districts.gn = Some(DistrictId::from(1));
            meshblock.offline_pop.gn = Some(30);
            meshblock
        },
        {
            let mut meshblock = Meshblock::new(101, square(1.0));
            meshblock.districts.gn = Some(DistrictId::from(1));
            meshblock.offline_pop.gn = Some(20);
            meshblock
        },
    ]).unwrap();
    let mut districts = DistrictLayer::new();
    districts.add_district(District::new(DistrictId::from(1), DistrictType::GeneralNorth, "N01", "Northland")).unwrap();
    districts.add_district(District::new(DistrictId::from(2), DistrictType::GeneralNorth, "N02", "Whangarei")).unwrap();

    let mut scenarios = ScenarioRegistry::new("tester");
    let base = scenarios.create_scenario("Base").unwrap();
    for number in [100, 101] {
        scenarios.set_meshblock_assignment(base, number, PerType::new(Some(DistrictId::from(1)), None, None)).unwrap();
    }

    let config = ProjectConfig { author: Some("tester".into()), ..Default::default() };
    config.save(dir).unwrap();
    let settings = Arc::new(JsonFileSettings::open(&dir.join(&config.settings_file)).unwrap());
    let mut session = RedistrictSession::new(meshblocks, districts, AuditLog::new(), scenarios, config, settings);
    session.switch_scenario(base).unwrap();
    save_project(dir, &session).unwrap();
}

fn read_entry(path: &Path, name: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut text = String::new();
    archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
    text
}

#[test]
fn edits_persist_across_reloads() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let mut session = load_project(dir.path()).unwrap();
    session.start_editing();
    session.redistrict(DistrictType::GeneralNorth, "move", &[101], &DistrictId::from(2)).unwrap();
    session.commit_changes().unwrap();
    save_project(dir.path(), &session).unwrap();

    let session = load_project(dir.path()).unwrap();
    let live = session.live_scenario().unwrap();
    assert_eq!(session.meshblocks().assignment(101, DistrictType::GeneralNorth), Some(&DistrictId::from(2)));
    assert_eq!(session.scenarios().electorate_meshblocks(&DistrictId::from(2), DistrictType::GeneralNorth, live), vec![101]);
    assert_eq!(session.audit().len(), 1);
    let north = session.districts().find(DistrictType::GeneralNorth, &DistrictId::from(1)).unwrap();
    assert_eq!(north.estimated_pop, Some(30));
}

#[test]
fn export_writes_all_three_tables() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let mut session = load_project(dir.path()).unwrap();
    session.start_editing();
    session.redistrict(DistrictType::GeneralNorth, "move", &[101], &DistrictId::from(2)).unwrap();
    session.commit_changes().unwrap();

    let live = session.live_scenario().unwrap();
    let path = dir.path().join("export.zip");
    let summary = session.export_scenario(live, &path).unwrap();
    assert_eq!((summary.electorates, summary.meshblocks, summary.log_rows), (2, 2, 1));

    let meshblocks = read_entry(&path, MESHBLOCKS_TABLE);
    assert!(meshblocks.lines().any(|line| line == "101,N02,,"));
    assert!(read_entry(&path, ELECTORATES_TABLE).contains("Whangarei"));
    let log = read_entry(&path, USER_LOG_TABLE);
    assert_eq!(log.lines().count(), 2);
    assert!(log.lines().nth(1).unwrap().contains("tester"));
}
