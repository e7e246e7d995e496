use nowplaying_proto::config::{Config, SinkKind};

#[test]
fn missing_config_is_written_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let config = Config::load_from(&path).unwrap();
    assert!(path.exists());
    assert_eq!(config.display.fps, 30);

    let reloaded = Config::load_from(&path).unwrap();
    assert_eq!(reloaded.mqtt.topic_base, config.mqtt.topic_base);
    assert_eq!(reloaded.title.font, config.title.font);
}

#[test]
fn existing_config_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[display]
sink = "file"
sink_path = "/dev/fb1"

[stars]
count = 64

[mqtt]
host = "10.0.0.50"
"#,
    )
    .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.display.sink, SinkKind::File);
    assert_eq!(config.display.sink_path.to_str(), Some("/dev/fb1"));
    assert_eq!(config.stars.count, 64);
    assert_eq!(config.stars.depth_step, 0.2);
    assert_eq!(config.mqtt.host, "10.0.0.50");
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[display]\nfps = \"fast\"\n").unwrap();
    assert!(Config::load_from(&path).is_err());
}

#[test]
fn invalid_animation_values_are_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[stars]\ndepth_step = -0.5\n").unwrap();
    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("stars.depth_step"), "{}", err);

    std::fs::write(&path, "[title]\ndwell_secs = inf\n").unwrap();
    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("title.dwell_secs"), "{}", err);
}

#[test]
fn rotation_is_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[display]\nrotate = 2\n").unwrap();
    assert_eq!(Config::load_from(&path).unwrap().display.rotate, 2);
}
