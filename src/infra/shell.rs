//! Locating external executables (`git`, `gh`, narrator CLIs) on `PATH`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Resolve a command name (or an explicit path) to an executable file.
pub fn find_bin(command: &str) -> Option<PathBuf> {
    let path = Path::new(command);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }

    let names = executable_names(command);
    search_dirs()
        .into_iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

pub fn is_installed(command: &str) -> bool {
    find_bin(command).is_some()
}

fn search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if let Some(env_path) = std::env::var_os("PATH") {
        push_unique(&mut dirs, std::env::split_paths(&env_path));
    }
    // Tools installed per-user are often missing from a minimal PATH.
    if let Some(home) = home::home_dir() {
        push_unique(
            &mut dirs,
            [home.join(".local/bin"), home.join(".cargo/bin")],
        );
    }
    push_unique(&mut dirs, fallback_dirs());
    dirs
}

fn fallback_dirs() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin", "/bin"]
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }
    #[cfg(not(target_os = "macos"))]
    {
        ["/usr/local/bin", "/usr/bin", "/bin"]
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }
}

fn executable_names(command: &str) -> Vec<OsString> {
    #[cfg(target_os = "windows")]
    {
        let mut names = vec![OsString::from(command)];
        if Path::new(command).extension().is_none() {
            let exts = std::env::var("PATHEXT").unwrap_or_else(|_| ".COM;.EXE;.BAT;.CMD".into());
            names.extend(
                exts.split(';')
                    .map(str::trim)
                    .filter(|ext| !ext.is_empty())
                    .map(|ext| OsString::from(format!("{command}{ext}"))),
            );
        }
        names
    }
    #[cfg(not(target_os = "windows"))]
    {
        vec![OsString::from(command)]
    }
}

fn push_unique<I>(dest: &mut Vec<PathBuf>, paths: I)
where
    I: IntoIterator<Item = PathBuf>,
{
    for path in paths {
        if !dest.contains(&path) {
            dest.push(path);
        }
    }
}
