//! Font provisioning for the `subtitles` filter.
//!
//! libass finds fonts through fontconfig, so each job gets a `fonts/`
//! directory holding the font files and a `fonts.conf` pointing at it.

use crate::error::{Result, SubforgeError};
use crate::subtitle::{Cue, FontFamily};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the font directory inside a job workspace, as referenced by the
/// filter graph's `fontsdir=` option.
pub const FONTS_DIR_NAME: &str = "fonts";

#[derive(Clone, PartialEq)]
pub struct FontAsset {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for FontAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAsset")
            .field("file_name", &self.file_name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Families referenced by the global style and any per-cue override, global
/// family first, without duplicates.
pub fn required_families(global_family: &str, cues: &[Cue]) -> Vec<FontFamily> {
    let mut families = vec![FontFamily::resolve(global_family)];
    for cue in cues {
        if let Some(family) = &cue.style().font_family {
            let family = FontFamily::resolve(family);
            if !families.contains(&family) {
                families.push(family);
            }
        }
    }
    families
}

/// Load the bundled font file for `family` from `fonts_dir`.
pub fn resolve_font(fonts_dir: Option<&Path>, family: FontFamily) -> Result<FontAsset> {
    let dir = fonts_dir.ok_or_else(|| {
        SubforgeError::MissingResource(format!(
            "font {} (no fonts directory configured; set SUBFORGE_FONTS_DIR)",
            family.file_name()
        ))
    })?;

    let path = dir.join(family.file_name());
    if !path.is_file() {
        return Err(SubforgeError::MissingResource(path.display().to_string()));
    }

    debug!("Using font {} from {}", family.font_name(), path.display());
    Ok(FontAsset {
        file_name: family.file_name().to_string(),
        data: fs::read(&path)?,
    })
}

/// fontconfig configuration scanning only `font_dir`.
pub fn fonts_conf(font_dir: &Path, cache_dir: &Path) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n\
         <fontconfig>\n  \
         <dir>{}</dir>\n  \
         <cachedir>{}</cachedir>\n  \
         <config></config>\n\
         </fontconfig>\n",
        font_dir.display(),
        cache_dir.display()
    )
}

/// Write `fonts` and a matching `fonts.conf` under `workspace`, returning the
/// path to export as `FONTCONFIG_FILE`.
pub fn provision_fonts(workspace: &Path, fonts: &[FontAsset]) -> Result<PathBuf> {
    let font_dir = workspace.join(FONTS_DIR_NAME);
    let cache_dir = workspace.join("fontcache");
    fs::create_dir_all(&font_dir)?;
    fs::create_dir_all(&cache_dir)?;

    for font in fonts {
        fs::write(font_dir.join(&font.file_name), &font.data)?;
    }

    let conf_path = font_dir.join("fonts.conf");
    fs::write(&conf_path, fonts_conf(&font_dir, &cache_dir))?;
    debug!("Provisioned {} font(s) in {}", fonts.len(), font_dir.display());
    Ok(conf_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::CueStyle;
    use tempfile::TempDir;

    #[test]
    fn test_required_families() {
        let serif = CueStyle {
            font_family: Some("Georgia".to_string()),
            ..Default::default()
        };
        let cues = vec![
            Cue::new(0.0, 1.0, "a").with_style(serif.clone()),
            Cue::new(1.0, 2.0, "b").with_style(serif),
        ];
        assert_eq!(
            required_families("sans-serif", &cues),
            vec![FontFamily::Sans, FontFamily::Serif]
        );
        assert_eq!(required_families("Times", &[]), vec![FontFamily::Serif]);
    }

    #[test]
    fn test_resolve_font_missing() {
        let dir = TempDir::new().unwrap();
        match resolve_font(Some(dir.path()), FontFamily::Sans) {
            Err(SubforgeError::MissingResource(msg)) => {
                assert!(msg.contains("NotoSansCJKsc-Regular.otf"))
            }
            other => panic!("expected missing resource, got {other:?}"),
        }
        assert!(matches!(
            resolve_font(None, FontFamily::Serif),
            Err(SubforgeError::MissingResource(_))
        ));
    }

    #[test]
    fn test_resolve_and_provision() {
        let fonts = TempDir::new().unwrap();
        fs::write(fonts.path().join("NotoSerifCJKsc-Regular.otf"), b"font").unwrap();
        let font = resolve_font(Some(fonts.path()), FontFamily::Serif).unwrap();
        assert_eq!(font.data, b"font");

        let workspace = TempDir::new().unwrap();
        let conf = provision_fonts(workspace.path(), &[font]).unwrap();

        let font_dir = workspace.path().join(FONTS_DIR_NAME);
        assert!(font_dir.join("NotoSerifCJKsc-Regular.otf").is_file());
        let contents = fs::read_to_string(conf).unwrap();
        assert!(contents.contains(&format!("<dir>{}</dir>", font_dir.display())));
        assert!(contents.starts_with("<?xml version=\"1.0\"?>\n<fontconfig>"));
    }
}
