use radiobar_proto::catalog::{CatalogError, StationCatalog};
use std::io::Write;
use std::path::PathBuf;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
fn loads_channels_json_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "channels.json",
        r#"{"channels": [
            {"title": "Radio Paradise", "url": "https://stream.radioparadise.com/aac-320"},
            {"title": "FIP", "url": "https://icecast.radiofrance.fr/fip-hifi.aac"},
            {"title": "KEXP", "url": "https://kexp-mp3-128.streamguys1.com/kexp128.mp3"}
        ]}"#,
    );

    let catalog = StationCatalog::load(&path).unwrap();
    let titles: Vec<_> = catalog.as_slice().iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, ["Radio Paradise", "FIP", "KEXP"]);
    assert_eq!(catalog.by_number(2).unwrap().title, "FIP");
    assert!(catalog.get("KEXP").is_some());
}

#[test]
fn loads_station_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        &dir,
        "stations.toml",
        r#"
[[station]]
title = "SomaFM Drone Zone"
url = "https://ice1.somafm.com/dronezone-128-mp3"

[[station]]
title = "NTS 2"
url = "https://stream-relay-geo.ntslive.net/stream2"
"#,
    );

    let catalog = StationCatalog::load(&path).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(
        catalog.get("NTS 2").unwrap().stream_url,
        "https://stream-relay-geo.ntslive.net/stream2"
    );
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = StationCatalog::load(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, CatalogError::Io { .. }));
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn malformed_json_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "channels.json", r#"{"channels": [{"title": 3}]}"#);
    assert!(matches!(
        StationCatalog::load(&path),
        Err(CatalogError::Parse { .. })
    ));
}

#[test]
fn empty_channel_list_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "channels.json", r#"{"channels": []}"#);
    assert!(matches!(StationCatalog::load(&path), Err(CatalogError::Empty)));
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(&dir, "stations.m3u", "#EXTM3U\nhttps://example.com/stream\n");
    assert!(matches!(
        StationCatalog::load(&path),
        Err(CatalogError::UnsupportedFormat(_))
    ));
}
