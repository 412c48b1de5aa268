//! Where installed fonts usually live on the host operating system.

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Operating-system families with a known font layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    Windows,
    MacOs,
    Unknown,
}

impl OsFamily {
    /// Classify an OS name such as `std::env::consts::OS` or a
    /// human-readable name like "Mac OS X".
    pub fn from_name(name: &str) -> Self {
        let name = name.to_ascii_lowercase();
        if name.contains("nux") || name.contains("nix") {
            OsFamily::Linux
        } else if name.contains("windows") {
            OsFamily::Windows
        } else if name.contains("mac") || name.contains("darwin") {
            OsFamily::MacOs
        } else {
            OsFamily::Unknown
        }
    }

    /// The family of the running process, detected once.
    pub fn current() -> Self {
        static CURRENT: OnceLock<OsFamily> = OnceLock::new();
        *CURRENT.get_or_init(|| OsFamily::from_name(env::consts::OS))
    }

    /// Conventional font directories for this family, whether or not they exist.
    pub fn candidate_font_dirs(self, home: Option<PathBuf>) -> Vec<PathBuf> {
        let mut dirs = Vec::with_capacity(4);
        match self {
            OsFamily::Linux => {
                dirs.push(PathBuf::from("/usr/share/fonts"));
                dirs.push(PathBuf::from("/usr/local/share/fonts"));
                if let Some(home) = home {
                    dirs.push(home.join(".fonts"));
                    dirs.push(home.join(".local").join("share").join("fonts"));
                }
            }
            OsFamily::MacOs => {
                if let Some(home) = home {
                    dirs.push(home.join("Library").join("Fonts"));
                }
                dirs.push(PathBuf::from("/Library/Fonts"));
                dirs.push(PathBuf::from("/System/Library/Fonts"));
            }
            OsFamily::Windows => {
                dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
            }
            OsFamily::Unknown => {}
        }
        dirs
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .or_else(|| env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

/// Font directories of the current OS that exist on disk.
pub fn preinstalled_font_paths() -> Vec<PathBuf> {
    OsFamily::current()
        .candidate_font_dirs(home_dir())
        .into_iter()
        .filter(|p| p.is_dir())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_os_names() {
        assert_eq!(OsFamily::from_name("linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_name("Linux"), OsFamily::Linux);
        assert_eq!(OsFamily::from_name("Windows 11"), OsFamily::Windows);
        assert_eq!(OsFamily::from_name("windows"), OsFamily::Windows);
        assert_eq!(OsFamily::from_name("Mac OS X"), OsFamily::MacOs);
        assert_eq!(OsFamily::from_name("macos"), OsFamily::MacOs);
        assert_eq!(OsFamily::from_name("freebsd"), OsFamily::Unknown);
    }

    #[test]
    fn linux_candidates_include_home_dirs() {
        let dirs = OsFamily::Linux.candidate_font_dirs(Some(PathBuf::from("/home/ada")));
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/usr/share/fonts"),
                PathBuf::from("/usr/local/share/fonts"),
                PathBuf::from("/home/ada/.fonts"),
                PathBuf::from("/home/ada/.local/share/fonts"),
            ]
        );
    }

    #[test]
    fn unknown_os_has_no_candidates() {
        assert!(OsFamily::Unknown.candidate_font_dirs(None).is_empty());
    }

    #[test]
    fn preinstalled_paths_all_exist() {
        for path in preinstalled_font_paths() {
            assert!(path.is_dir(), "{} should exist", path.display());
        }
    }

    #[test]
    fn detection_is_stable() {
        assert_eq!(OsFamily::current(), OsFamily::current());
    }
}
