//! Browser launching for `--open`.

use std::process::Command;

/// Open `url` in the default browser. Failure is logged, never fatal.
pub fn open(url: &str) {
    #[cfg(target_os = "macos")]
    let result = Command::new("open").arg(url).spawn();

    #[cfg(target_os = "windows")]
    let result = Command::new("cmd").args(["/C", "start", url]).spawn();

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = Command::new("xdg-open").arg(url).spawn();

    if let Err(e) = result {
        crate::log!("serve"; "failed to open browser: {}", e);
    }
}
