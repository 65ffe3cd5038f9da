use std::sync::Arc;

use districtor::{
    quota_variance, AuditLog, District, DistrictId, DistrictLayer, DistrictType, MemorySettings, Meshblock,
    MeshblockLayer, PerType, ProjectConfig, RedistrictSession, ScenarioRegistry,
};
use geo::{polygon, Area, BooleanOps, MultiPolygon};

fn square(x: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![
        (x: x, y: 0.0),
        (x: x + 1.0, y: 0.0),
        (x: x + 1.0, y: 1.0),
        (x: x, y: 1.0),
        (x: x, y: 0.0),
    ]])
}

/// GS electorate "A" covers meshblocks 1 and 2, electorate "B" covers 3; "Base" is live.
fn session(quota: Option<i64>) -> RedistrictSession {
    let meshblocks = MeshblockLayer::new((1..=3).map(|number| {
        let mut meshblock = Meshblock::new(number, square(number as f64));
        meshblock.offline_pop.gs = Some(50_000);
        meshblock
    }).collect()).unwrap();

    let mut districts = DistrictLayer::new();
    districts.add_district(District::new(DistrictId::from("A"), DistrictType::GeneralSouth, "S01", "Alpha")).unwrap();
    districts.add_district(District::new(DistrictId::from("B"), DistrictType::GeneralSouth, "S02", "Bravo")).unwrap();

    let mut scenarios = ScenarioRegistry::new("tester");
    let base = scenarios.create_scenario("Base").unwrap();
    for (number, district) in [(1, "A"), (2, "A"), (3, "B")] {
        scenarios.set_assignment(base, number, DistrictType::GeneralSouth, Some(DistrictId::from(district))).unwrap();
    }

    let config = ProjectConfig { quotas: PerType::new(None, quota, None), ..Default::default() };
    let mut session = RedistrictSession::new(meshblocks, districts, AuditLog::new(), scenarios, config, Arc::new(MemorySettings::new()));
    session.switch_scenario(base).unwrap();
    session.start_editing();
    session
}

fn geometry(session: &RedistrictSession, id: &str) -> Option<MultiPolygon<f64>> {
    session.districts().find(DistrictType::GeneralSouth, &DistrictId::from(id)).and_then(|district| district.geometry.clone())
}

#[test]
fn moving_both_units_yields_their_union() {
    let mut session = session(None);
    session.redistrict(DistrictType::GeneralSouth, "take all", &[1, 2], &DistrictId::from("B")).unwrap();

    let b = geometry(&session, "B").unwrap();
    assert_eq!(b.0.len(), 1);
    let expected = square(1.0).union(&square(2.0)).union(&square(3.0));
    assert!((b.unsigned_area() - expected.unsigned_area()).abs() < 1e-9);
    assert!(geometry(&session, "A").is_none());
}

#[test]
fn moving_one_unit_leaves_the_other() {
    let mut session = session(None);
    session.redistrict(DistrictType::GeneralSouth, "take one", &[2], &DistrictId::from("B")).unwrap();

    let a = geometry(&session, "A").unwrap();
    assert!((a.unsigned_area() - 1.0).abs() < 1e-9);
    assert!(a.difference(&square(1.0)).unsigned_area() < 1e-9);
}

#[test]
fn switching_back_rebuilds_from_the_scenario() {
    let mut session = session(None);
    let base = session.live_scenario().unwrap();
    let branch = session.branch_scenario(base, "Draft").unwrap();
    session.switch_scenario(branch).unwrap();
    session.start_editing();
    session.redistrict(DistrictType::GeneralSouth, "move", &[2], &DistrictId::from("B")).unwrap();
    session.commit_changes().unwrap();

    session.switch_scenario(base).unwrap();
    assert!((geometry(&session, "A").unwrap().unsigned_area() - 2.0).abs() < 1e-9);
    assert_eq!(session.scenarios().electorate_meshblocks(&DistrictId::from("B"), DistrictType::GeneralSouth, branch), vec![2, 3]);
    assert_eq!(session.scenarios().electorate_meshblocks(&DistrictId::from("B"), DistrictType::GeneralSouth, base), vec![3]);
}

#[test]
fn validation_reports_only_the_district_out_of_quota() {
    let mut session = session(Some(50_000));
    let base = session.live_scenario().unwrap();
    let report = session.validate_scenario(base).unwrap();

    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert_eq!(result.district_id, DistrictId::from("A"));
    assert_eq!(result.name, "Alpha");
    assert!(result.geometry.is_some());
    assert!(result.error.contains("quota"));

    let b = session.districts().find(DistrictType::GeneralSouth, &DistrictId::from("B")).unwrap();
    assert_eq!(b.invalid, Some(false));
    assert_eq!(b.invalid_reason, None);
}

#[test]
fn branching_twice_allocates_increasing_ids() {
    let mut session = session(None);
    let base = session.live_scenario().unwrap();
    let first = session.branch_scenario(base, "One").unwrap();
    let second = session.branch_scenario(base, "Two").unwrap();
    assert_eq!(first, base + 1);
    assert_eq!(second, first + 1);
    assert!(session.branch_scenario(base, "One").is_err());
    assert_eq!(session.scenarios().scenario_assignments(second).count(), 3);
}

#[test]
fn variance_is_symmetric_around_the_quota() {
    assert_eq!(quota_variance(55_000, 50_000), Some(10));
    assert_eq!(quota_variance(45_000, 50_000), Some(-10));
}
