//! Font table – fonts registered here become selectable by family name
//! (`font-family: 'Noto Sans SC'`) in every document rendered with the
//! registry.
//!
//! A [`FontRegistry`] is a cheap, cloneable handle to shared state. Pass one
//! explicitly to each [`DocumentBuilder`](crate::DocumentBuilder), or use
//! [`FontRegistry::global`] for an application-lifetime table. Either way
//! registration and lookup are guarded by a lock.
//!
//! Registering a family that already exists replaces the earlier face, so a
//! family is always listed once.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::error::{Error, Result};
use crate::font_paths::preinstalled_font_paths;

const FONT_EXTENSIONS: [&str; 3] = ["ttf", "otf", "ttc"];

/// One registered face.
#[derive(Debug, Clone)]
pub struct RegisteredFont {
    pub family: String,
    /// File the face was read from, if any.
    pub path: Option<PathBuf>,
    /// Face index inside a TrueType collection (0 for plain fonts).
    pub index: u32,
    /// Raw font file bytes.
    pub bytes: Arc<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    fonts: Arc<RwLock<BTreeMap<String, RegisteredFont>>>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static FontRegistry {
        static GLOBAL: OnceLock<FontRegistry> = OnceLock::new();
        GLOBAL.get_or_init(FontRegistry::new)
    }

    /// Register a font file and return its family name.
    ///
    /// `spec` is a path, optionally followed by `,<index>` to pick a face
    /// from a TrueType collection (`/fonts/simsun.ttc,1`).
    pub fn add_font(&self, spec: impl AsRef<str>) -> Result<String> {
        let (path, index) = split_font_spec(spec.as_ref());
        self.add_font_file(path, index)
    }

    pub fn add_font_file(&self, path: impl AsRef<Path>, index: u32) -> Result<String> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let family = face_family(&bytes, index).map_err(|reason| Error::Font {
            path: path.to_path_buf(),
            reason,
        })?;
        self.insert(RegisteredFont {
            family: family.clone(),
            path: Some(path.to_path_buf()),
            index,
            bytes: Arc::new(bytes),
        });
        Ok(family)
    }

    /// Register in-memory font bytes, e.g. from `include_bytes!`.
    pub fn add_font_bytes(&self, bytes: Vec<u8>, index: u32) -> Result<String> {
        let family = face_family(&bytes, index).map_err(|reason| Error::Font {
            path: PathBuf::from("<memory>"),
            reason,
        })?;
        self.insert(RegisteredFont {
            family: family.clone(),
            path: None,
            index,
            bytes: Arc::new(bytes),
        });
        Ok(family)
    }

    fn insert(&self, font: RegisteredFont) {
        let mut fonts = self.fonts.write().unwrap_or_else(PoisonError::into_inner);
        if fonts.contains_key(&font.family) {
            log::debug!("Font family '{}' re-registered; replacing", font.family);
        }
        fonts.insert(font.family.clone(), font);
    }

    /// Registered family names, sorted.
    pub fn list_font_family(&self) -> Vec<String> {
        self.fonts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn contains(&self, family: &str) -> bool {
        self.fonts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(family)
    }

    pub fn len(&self) -> usize {
        self.fonts.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every registered face, for handing to a render engine.
    pub fn snapshot(&self) -> Vec<RegisteredFont> {
        self.fonts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Register every font found below `dir`. Unreadable or unparseable
    /// files are logged and skipped. Returns the number of faces added.
    pub fn load_fonts_dir(&self, dir: impl AsRef<Path>) -> usize {
        let mut files = Vec::new();
        collect_font_files(dir.as_ref(), &mut files);
        files.sort();

        let mut added = 0;
        for file in files {
            let faces = match fs::read(&file) {
                Ok(bytes) => ttf_parser::fonts_in_collection(&bytes).unwrap_or(1),
                Err(e) => {
                    log::warn!("Skipping font {}: {e}", file.display());
                    continue;
                }
            };
            for index in 0..faces {
                match self.add_font_file(&file, index) {
                    Ok(_) => added += 1,
                    Err(e) => log::warn!("Skipping font {},{index}: {e}", file.display()),
                }
            }
        }
        added
    }

    /// Register the fonts installed on this machine.
    pub fn load_preinstalled_fonts(&self) -> usize {
        let added: usize = preinstalled_font_paths()
            .iter()
            .map(|dir| self.load_fonts_dir(dir))
            .sum();
        log::info!("Loaded {added} preinstalled font faces");
        added
    }
}

/// Split `path,index` into its parts. A suffix that is not a number stays
/// part of the path.
fn split_font_spec(spec: &str) -> (&str, u32) {
    if let Some((path, index)) = spec.rsplit_once(',') {
        if let Ok(index) = index.trim().parse::<u32>() {
            return (path, index);
        }
    }
    (spec, 0)
}

/// Read the family name of face `index`, preferring the legacy family name
/// over the typographic one.
fn face_family(bytes: &[u8], index: u32) -> std::result::Result<String, String> {
    let face = ttf_parser::Face::parse(bytes, index).map_err(|e| e.to_string())?;
    let lookup = |id: u16| {
        face.names()
            .into_iter()
            .filter(|name| name.name_id == id && name.is_unicode())
            .find_map(|name| name.to_string())
            .filter(|family| !family.trim().is_empty())
    };
    lookup(ttf_parser::name_id::FAMILY)
        .or_else(|| lookup(ttf_parser::name_id::TYPOGRAPHIC_FAMILY))
        .ok_or_else(|| "font has no family name".to_string())
}

fn collect_font_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Cannot read font directory {}: {e}", dir.display());
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, out);
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FONT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        {
            out.push(path);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build the smallest TrueType file ttf-parser accepts: `head`, `hhea`,
    /// `maxp` and a `name` table carrying `family`.
    pub(crate) fn tiny_font(family: &str) -> Vec<u8> {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());

        let mut hhea = vec![0u8; 36];
        hhea[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        hhea[4..6].copy_from_slice(&800i16.to_be_bytes());
        hhea[6..8].copy_from_slice(&(-200i16).to_be_bytes());
        hhea[34..36].copy_from_slice(&1u16.to_be_bytes());

        let mut maxp = Vec::new();
        maxp.extend_from_slice(&0x0000_5000u32.to_be_bytes());
        maxp.extend_from_slice(&1u16.to_be_bytes());

        let utf16: Vec<u8> = family.encode_utf16().flat_map(|u| u.to_be_bytes()).collect();
        let mut name = Vec::new();
        for v in [0u16, 1, 18] {
            name.extend_from_slice(&v.to_be_bytes());
        }
        // platform 3 (Windows), encoding 1 (Unicode BMP), en-US, family
        for v in [3u16, 1, 0x0409, 1, utf16.len() as u16, 0] {
            name.extend_from_slice(&v.to_be_bytes());
        }
        name.extend_from_slice(&utf16);

        let tables: [(&[u8; 4], Vec<u8>); 4] =
            [(b"head", head), (b"hhea", hhea), (b"maxp", maxp), (b"name", name)];

        let mut out = Vec::new();
        out.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        out.extend_from_slice(&(tables.len() as u16).to_be_bytes());
        out.extend_from_slice(&[0, 64, 0, 2, 0, 0]);

        let mut offset = 12 + 16 * tables.len();
        let mut body = Vec::new();
        for (tag, data) in &tables {
            out.extend_from_slice(*tag);
            out.extend_from_slice(&0u32.to_be_bytes());
            out.extend_from_slice(&(offset as u32).to_be_bytes());
            out.extend_from_slice(&(data.len() as u32).to_be_bytes());
            let mut padded = data.clone();
            while padded.len() % 4 != 0 {
                padded.push(0);
            }
            offset += padded.len();
            body.extend_from_slice(&padded);
        }
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn split_spec_with_collection_index() {
        assert_eq!(split_font_spec("/fonts/simsun.ttc,1"), ("/fonts/simsun.ttc", 1));
        assert_eq!(split_font_spec("/fonts/a.ttf"), ("/fonts/a.ttf", 0));
        assert_eq!(split_font_spec("/fonts/odd,name.ttf"), ("/fonts/odd,name.ttf", 0));
    }

    #[test]
    fn reads_family_from_name_table() {
        assert_eq!(face_family(&tiny_font("Motto Sans"), 0).unwrap(), "Motto Sans");
    }

    #[test]
    fn add_font_lists_family_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motto.ttf");
        fs::write(&path, tiny_font("Motto Sans")).unwrap();

        let registry = FontRegistry::new();
        let spec = path.to_str().unwrap();
        assert_eq!(registry.add_font(spec).unwrap(), "Motto Sans");
        registry.add_font(spec).unwrap();

        let families = registry.list_font_family();
        assert_eq!(families.iter().filter(|f| *f == "Motto Sans").count(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = FontRegistry::new();
        registry.add_font_bytes(tiny_font("Dup"), 0).unwrap();
        let replacement = tiny_font("Dup");
        let expected_len = replacement.len();
        registry.add_font_bytes(replacement, 0).unwrap();
        let fonts = registry.snapshot();
        assert_eq!(fonts.len(), 1);
        assert_eq!(fonts[0].bytes.len(), expected_len);
    }

    #[test]
    fn clones_share_state() {
        let registry = FontRegistry::new();
        let handle = registry.clone();
        handle.add_font_bytes(tiny_font("Shared"), 0).unwrap();
        assert!(registry.contains("Shared"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let registry = FontRegistry::new();
        assert!(matches!(
            registry.add_font("/definitely/not/here.ttf"),
            Err(Error::Io(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn garbage_bytes_are_font_error() {
        let registry = FontRegistry::new();
        assert!(matches!(
            registry.add_font_bytes(b"not a font".to_vec(), 0),
            Err(Error::Font { .. })
        ));
    }

    #[test]
    fn load_dir_skips_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("a.ttf"), tiny_font("Alpha")).unwrap();
        fs::write(nested.join("b.otf"), tiny_font("Beta")).unwrap();
        fs::write(dir.path().join("broken.ttf"), b"junk").unwrap();
        fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let registry = FontRegistry::new();
        assert_eq!(registry.load_fonts_dir(dir.path()), 2);
        assert_eq!(registry.list_font_family(), vec!["Alpha", "Beta"]);
    }
}
