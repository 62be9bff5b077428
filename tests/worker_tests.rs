// tests/worker_tests.rs

use macroquad_tileworld::{
    Environment, Layer, MapDocument, MapError, MapFormat, MapGrid, MapInfo, TaskError, TaskKind,
    TaskOutcome, TaskStatus, TileRegistry,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("tileworld_worker_{}_{name}", std::process::id()))
}

fn document() -> MapDocument {
    let reg = Arc::new(TileRegistry::builtin());
    let mut map = MapGrid::new(3, 3, MapInfo::new("Doc", Environment::Cave), &reg).unwrap();
    map.set(Layer::Terrain, 1, 2, reg.find(Layer::Terrain, "stone").unwrap()).unwrap();
    MapDocument::with_grid(reg, map)
}

fn poll_until_done(doc: &mut MapDocument) -> TaskOutcome {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match doc.poll() {
            TaskStatus::Done(outcome) => return outcome,
            TaskStatus::Running => {
                assert!(Instant::now() < deadline, "task did not finish");
                std::thread::sleep(Duration::from_millis(5));
            }
            TaskStatus::Idle => panic!("task vanished"),
        }
    }
}

#[test]
fn save_hides_the_grid_until_done() {
    let mut doc = document();
    let path = temp_path("save.json");

    doc.begin_save(&path).unwrap();
    assert!(doc.is_busy());
    assert!(doc.grid().is_none());
    assert!(doc.grid_mut().is_none());

    match poll_until_done(&mut doc) {
        TaskOutcome::Saved { path: saved } => assert_eq!(saved, path),
        other => panic!("expected Saved, got {:?}", other),
    }
    assert!(matches!(doc.poll(), TaskStatus::Idle));
    assert_eq!(doc.grid().unwrap().get(Layer::Terrain, 1, 2).unwrap().id(), "stone");
    assert!(path.exists());
    fs::remove_file(&path).unwrap();
}

#[test]
fn only_one_task_at_a_time() {
    let mut doc = document();
    let path = temp_path("busy.json");

    doc.begin_save(&path).unwrap();
    assert_eq!(doc.begin_save(&path), Err(TaskError::Busy));
    assert_eq!(doc.begin_load(&path), Err(TaskError::Busy));
    assert!(doc.wait().is_some());
    assert!(doc.wait().is_none());
    fs::remove_file(&path).unwrap();
}

#[test]
fn saving_without_a_map_fails() {
    let mut doc = MapDocument::new(Arc::new(TileRegistry::builtin()));
    assert_eq!(doc.begin_save(temp_path("none.json")), Err(TaskError::NoMap));
    assert!(!doc.is_busy());
}

#[test]
fn load_replaces_the_grid() {
    let mut doc = document();
    let path = temp_path("load.json");
    doc.grid().unwrap().save_to_file(&path).unwrap();

    doc.grid_mut().unwrap().info_mut().name = "Edited".into();
    doc.begin_load(&path).unwrap();
    assert!(doc.grid().is_none());

    match doc.wait().unwrap() {
        TaskOutcome::Loaded { report, .. } => assert_eq!(report.format, MapFormat::Current),
        other => panic!("expected Loaded, got {:?}", other),
    }
    assert_eq!(doc.grid().unwrap().info().name, "Doc");
    fs::remove_file(&path).unwrap();
}

#[test]
fn failed_load_restores_the_previous_grid() {
    let mut doc = document();
    let path = temp_path("does_not_exist.json");

    doc.begin_load(&path).unwrap();
    match poll_until_done(&mut doc) {
        TaskOutcome::Failed { kind, error, .. } => {
            assert_eq!(kind, TaskKind::Load);
            assert!(matches!(error, MapError::Io { .. }));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(doc.grid().unwrap().info().name, "Doc");
}

#[test]
fn failed_save_keeps_the_grid() {
    let mut doc = document();
    doc.begin_save(temp_path("wrong.txt")).unwrap();
    match doc.wait().unwrap() {
        TaskOutcome::Failed {
            kind: TaskKind::Save,
            error: MapError::UnsupportedFormat(_),
            ..
        } => {}
        other => panic!("expected a failed save, got {:?}", other),
    }
    assert!(doc.grid().is_some());
}
