// tests/load_tests.rs

use macroquad_tileworld::{
    Environment, Layer, MapError, MapFormat, MapGrid, MapInfo, ReadStage, TileMetadata,
    TileRegistry, UnknownTile, Weather, MAP_FORMAT_VERSION,
};
use std::fs;
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("tileworld_{}_{name}", std::process::id()));
    path
}

fn town(reg: &TileRegistry) -> MapGrid {
    let mut info = MapInfo::new("Town", Environment::Desert);
    info.weather = Weather::Foggy;
    let mut map = MapGrid::new(5, 3, info, reg).unwrap();
    map.fill(Layer::Terrain, reg.find(Layer::Terrain, "sand").unwrap()).unwrap();
    map.set(Layer::Terrain, 4, 2, reg.find(Layer::Terrain, "water").unwrap()).unwrap();
    map.set(Layer::Decoration, 1, 1, reg.find(Layer::Decoration, "sign").unwrap()).unwrap();
    map.set_metadata(
        Layer::Decoration,
        1,
        1,
        Some(TileMetadata::new().with("text", "Welcome").with("author", "mayor").with("a", "1")),
    )
    .unwrap();
    map.set(Layer::Npc, 2, 0, reg.find(Layer::Npc, "merchant").unwrap()).unwrap();
    map.set(Layer::Control, 0, 2, reg.find(Layer::Control, "spawn").unwrap()).unwrap();
    map.set_metadata(Layer::Control, 3, 0, Some(TileMetadata::new().with("event", "gate")))
        .unwrap();
    map
}

fn assert_same_map(a: &MapGrid, b: &MapGrid) {
    assert_eq!((a.width(), a.height()), (b.width(), b.height()));
    assert_eq!(a.info(), b.info());
    for layer in Layer::ALL {
        let left: Vec<_> = a
            .cells(layer)
            .map(|(p, t, m)| (p, t.id().to_owned(), m.cloned()))
            .collect();
        let right: Vec<_> = b
            .cells(layer)
            .map(|(p, t, m)| (p, t.id().to_owned(), m.cloned()))
            .collect();
        assert_eq!(left, right, "{layer} layer differs");
    }
}

#[test]
fn save_then_load_reproduces_the_map() {
    let reg = TileRegistry::builtin();
    let map = town(&reg);

    let json = map.to_json_string().unwrap();
    let (back, report) = MapGrid::load_from_str(&json, &reg).unwrap();

    assert_eq!(report.format, MapFormat::Current);
    assert!(report.unknown_tiles.is_empty());
    assert_same_map(&map, &back);

    let keys: Vec<_> = back
        .metadata(Layer::Decoration, 1, 1)
        .unwrap()
        .iter()
        .map(|(k, _)| k.to_owned())
        .collect();
    assert_eq!(keys, ["text", "author", "a"]);
    back.validate().unwrap();
}

#[test]
fn plain_cells_are_written_as_bare_ids() {
    let reg = TileRegistry::builtin();
    let json = town(&reg).to_json_string().unwrap();
    let doc: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(doc["version"], MAP_FORMAT_VERSION);
    assert_eq!(doc["info"]["environment"], 3);
    assert_eq!(doc["info"]["weather"], 3);
    let deco = doc["layers"]["decoration"].as_array().unwrap();
    assert_eq!(deco.len(), 15);
    // column-major: (1, 1) is 1 * 3 + 1
    assert_eq!(deco[4]["id"], "sign");
    assert_eq!(deco[4]["metadata"]["text"], "Welcome");
    assert_eq!(deco[0], "empty");
}

#[test]
fn grass_with_one_stone_round_trips() {
    let reg = TileRegistry::builtin();
    let mut map = MapGrid::new(4, 4, MapInfo::new("Field", Environment::Forest), &reg).unwrap();
    map.fill(Layer::Terrain, reg.find(Layer::Terrain, "grass").unwrap()).unwrap();
    map.set(Layer::Terrain, 1, 1, reg.find(Layer::Terrain, "stone").unwrap()).unwrap();

    let (back, _) = MapGrid::load_from_str(&map.to_json_string().unwrap(), &reg).unwrap();
    for x in 0..4 {
        for y in 0..4 {
            let want = if (x, y) == (1, 1) { "stone" } else { "grass" };
            assert_eq!(back.get(Layer::Terrain, x, y).unwrap().id(), want);
        }
    }
}

#[test]
fn unknown_ids_are_skipped_and_reported() {
    let reg = TileRegistry::builtin();
    let json = format!(
        r#"{{ "version": {MAP_FORMAT_VERSION},
             "info": {{ "name": "x", "environment": 0 }},
             "width": 2, "height": 1,
             "layers": {{ "terrain": ["grass", "lava"],
                          "decoration": ["empty", {{ "id": "statue", "metadata": {{ "k": "v" }} }}] }} }}"#
    );
    let (map, report) = MapGrid::load_from_str(&json, &reg).unwrap();

    assert_eq!(map.get(Layer::Terrain, 1, 0).unwrap().id(), "empty");
    assert_eq!(map.get(Layer::Terrain, 0, 0).unwrap().id(), "grass");
    assert!(map.metadata(Layer::Decoration, 1, 0).is_none());
    assert_eq!(
        report.unknown_tiles,
        [
            UnknownTile { layer: Layer::Terrain, x: 1, y: 0, id: "lava".into() },
            UnknownTile { layer: Layer::Decoration, x: 1, y: 0, id: "statue".into() },
        ]
    );
}

const LEGACY_MAP: &str = r#"
{
  "name": "Old Farm",
  "environment": 0,
  "width": 3, "height": 2,
  "palettes": { "terrain": ["grass", "dirt"], "decoration": ["empty", "door"] },
  "terrain":    [0, 1, 1,
                 0, 0, 1],
  "decoration": [0, 0, 0,
                 1, 0, 0],
  "metadata": [ { "layer": "decoration", "x": 0, "y": 1, "values": { "locked": "true" } } ]
}
"#;

#[test]
fn legacy_maps_load_through_the_fallback() {
    let reg = TileRegistry::builtin();
    let (map, report) = MapGrid::load_from_str(LEGACY_MAP, &reg).unwrap();

    assert_eq!(report.format, MapFormat::Legacy);
    assert_eq!(map.info().name, "Old Farm");
    assert_eq!(map.info().weather, Weather::Sunny);
    assert_eq!(map.get(Layer::Terrain, 1, 0).unwrap().id(), "dirt");
    assert_eq!(map.get(Layer::Terrain, 2, 1).unwrap().id(), "dirt");
    assert_eq!(map.get(Layer::Terrain, 1, 1).unwrap().id(), "grass");
    assert_eq!(map.get(Layer::Decoration, 0, 1).unwrap().id(), "door");
    assert!(map.is_solid(0, 1));
    assert_eq!(map.get(Layer::Npc, 2, 1).unwrap().id(), "empty");

    // Saving upgrades to the current format.
    let (again, report) = MapGrid::load_from_str(&map.to_json_string().unwrap(), &reg).unwrap();
    assert_eq!(report.format, MapFormat::Current);
    assert_same_map(&map, &again);
}

#[test]
fn unreadable_version_fails_with_both_errors() {
    let reg = TileRegistry::builtin();
    let json = r#"{ "version": 99, "info": { "name": "future" },
                    "width": 1, "height": 1, "layers": {} }"#;
    let err = MapGrid::load_from_str(json, &reg).unwrap_err();
    match err {
        MapError::LegacyFallbackFailed { version, source } => {
            assert_eq!(version, Some(99));
            assert!(matches!(*source, MapError::Malformed { stage: ReadStage::Header, .. }));
        }
        other => panic!("expected LegacyFallbackFailed, got {:?}", other),
    }
}

#[test]
fn malformed_current_map_does_not_fall_back() {
    let reg = TileRegistry::builtin();
    let json = format!(
        r#"{{ "version": {MAP_FORMAT_VERSION}, "info": {{ "name": "x" }}, "width": 2, "height": 2,
             "layers": {{ "terrain": ["grass"] }} }}"#
    );
    let err = MapGrid::load_from_str(&json, &reg).unwrap_err();
    assert!(matches!(
        err,
        MapError::InvalidLayerSize { layer: Layer::Terrain, expected: 4, found: 1 }
    ));
}

#[test]
fn not_json_at_all_is_a_parse_error() {
    let reg = TileRegistry::builtin();
    assert!(matches!(MapGrid::load_from_str("{ nope", &reg), Err(MapError::Parse(_))));
}

#[test]
fn integration_save_and_load_file() {
    let reg = TileRegistry::builtin();
    let map = town(&reg);
    let path = temp_path("town.json");

    map.save_to_file(&path).unwrap();
    let (back, _) = MapGrid::load_from_file(&path, &reg).unwrap();
    assert_same_map(&map, &back);
    fs::remove_file(&path).unwrap();
}

#[test]
fn integration_unsupported_format() {
    let reg = TileRegistry::builtin();
    let err = MapGrid::load_from_file("foo.tmx", &reg).unwrap_err();
    match err {
        MapError::UnsupportedFormat(ext) => assert_eq!(ext, "foo.tmx"),
        other => panic!("expected UnsupportedFormat, got {:?}", other),
    }
    let map = town(&reg);
    assert!(matches!(map.save_to_file("town.txt"), Err(MapError::UnsupportedFormat(_))));
}

#[test]
fn file_errors_carry_the_path() {
    let reg = TileRegistry::builtin();
    let missing = temp_path("missing.json");
    match MapGrid::load_from_file(&missing, &reg).unwrap_err() {
        MapError::Io { path, .. } => assert_eq!(path, missing),
        other => panic!("expected Io, got {:?}", other),
    }

    let broken = temp_path("broken.json");
    fs::write(&broken, "{ not json").unwrap();
    match MapGrid::load_from_file(&broken, &reg).unwrap_err() {
        MapError::Json { path, .. } => assert_eq!(path, broken),
        other => panic!("expected Json, got {:?}", other),
    }
    fs::remove_file(&broken).unwrap();
}
