use std::path::PathBuf;

const APP_DIR: &str = "nowplaying";

pub fn data_dir() -> PathBuf {
    // ~/.local/share/nowplaying/ on every unix, XDG style
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".local")
        .join("share")
        .join(APP_DIR)
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(APP_DIR)
}

/// Client id presented to the broker when none is configured.  The hostname
/// keeps two displays on one broker from kicking each other off.
pub fn default_client_id() -> String {
    let host = std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "local".to_string());
    format!("{}-{}", APP_DIR, host.trim())
}
