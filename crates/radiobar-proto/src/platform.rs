use std::path::PathBuf;

/// Loopback port the remote control server listens on.
pub const DEFAULT_REMOTE_PORT: u16 = 65432;

const DEFAULT_REMOTE_HOST: &str = "127.0.0.1";

pub fn default_remote_host() -> &'static str {
    DEFAULT_REMOTE_HOST
}

pub fn mpv_socket_name() -> String {
    format!(
        "{}/radiobar-mpv-{}.sock",
        std::env::temp_dir().display(),
        std::process::id()
    )
}

pub fn mpv_socket_arg(socket_name: &str) -> String {
    format!("--input-ipc-server={}", socket_name)
}

pub fn data_dir() -> PathBuf {
    // ~/.local/share/radiobar on macOS as well, not Application Support
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".local")
        .join("share")
        .join("radiobar")
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("radiobar")
}

pub fn mpv_binary_name() -> &'static str {
    "mpv"
}

fn find_beside_exe(names: &[&str]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var("PATH").ok()?;
    for dir in std::env::split_paths(&path) {
        for name in names {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }
    None
}

/// Find mpv for playback.
///
/// Searches in order:
/// 1. MPV_PATH environment variable
/// 2. Beside the current executable (bundled app layout)
/// 3. The mpv.app bundle in /Applications (macOS)
/// 4. PATH
pub fn find_mpv_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("MPV_PATH") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(p) = find_beside_exe(&[mpv_binary_name()]) {
        return Some(p);
    }

    #[cfg(target_os = "macos")]
    {
        let bundled = PathBuf::from("/Applications/mpv.app/Contents/MacOS/mpv");
        if bundled.exists() {
            return Some(bundled);
        }
    }

    find_on_path(&[mpv_binary_name()])
}

/// Command used by the remote client to start the application when nothing
/// is listening on the control port.
pub fn default_launch_command() -> Vec<String> {
    #[cfg(target_os = "macos")]
    {
        vec!["open".to_string(), "-a".to_string(), "RadioBar".to_string()]
    }
    #[cfg(not(target_os = "macos"))]
    {
        let daemon = find_beside_exe(&["radiobar"])
            .or_else(|| find_on_path(&["radiobar"]))
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "radiobar".to_string());
        vec![daemon]
    }
}
