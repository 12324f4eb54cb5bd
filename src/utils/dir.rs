use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

const APPLICATION_DIR: &str = "studymood";

#[cfg_attr(windows, allow(dead_code))]
fn home() -> Result<PathBuf> {
    env::var("HOME")
        .map(PathBuf::from)
        .context("Couldn't find HOME")
}

pub fn create_application_default_path() -> Result<PathBuf> {
    let path = {
        #[cfg(windows)]
        {
            let mut path =
                PathBuf::from(env::var("APPDATA").context("APPDATA should be present on Windows")?);
            path.push(APPLICATION_DIR);
            path
        }
        #[cfg(target_os = "macos")]
        {
            let mut path = home()?;
            path.push("Library/Application Support");
            path.push(APPLICATION_DIR);
            path
        }
        #[cfg(not(any(windows, target_os = "macos")))]
        {
            let mut path = match env::var("XDG_STATE_HOME") {
                Ok(state) => PathBuf::from(state),
                Err(_) => home()
                    .map(|home| home.join(".local/state"))
                    .context("Couldn't find neither XDG_STATE_HOME nor HOME")?,
            };
            path.push(APPLICATION_DIR);
            path
        }
    };

    ensure_dir(path)
}

pub fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v).with_context(|| format!("Failed to create {path:?}")),
    }
}
