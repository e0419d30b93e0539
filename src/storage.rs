use crate::template::Template;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const TEMPLATE_EXTENSION: &str = "tpl";

/// File a template for `image` is stored under: the image's file stem plus `.tpl`.
pub fn template_path(dir: &Path, image: &str) -> PathBuf {
    let stem = Path::new(image)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| image.to_string());
    dir.join(stem).with_extension(TEMPLATE_EXTENSION)
}

pub fn save_template(path: &Path, template: &Template) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let data = postcard::to_allocvec(template)?;
    std::fs::write(path, data).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_template(path: &Path) -> Result<Template> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    postcard::from_bytes(&data).with_context(|| format!("decoding {}", path.display()))
}

/// Every `.tpl` file in `dir`, sorted by path. A missing directory is an empty gallery.
pub fn load_gallery(dir: &Path) -> Result<Vec<Template>> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("listing {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map_or(false, |ext| ext == TEMPLATE_EXTENSION))
        .collect::<Vec<_>>();
    paths.sort();
    paths.iter().map(|p| load_template(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{FileMeta, Mat};

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("neclatent-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_template_path_uses_stem() {
        let p = template_path(Path::new("/t"), "/images/a/print01.png");
        assert_eq!(p, PathBuf::from("/t/print01.tpl"));
    }

    #[test]
    fn test_gallery_keeps_failed_flag() -> Result<()> {
        let dir = scratch_dir();
        let good = Template::new(FileMeta::new("a.png"), Mat::from_bytes(vec![1, 2, 3]));
        let mut bad = Template::from_path("b.png");
        bad.mark_failed();

        save_template(&template_path(&dir, "a.png"), &good)?;
        save_template(&template_path(&dir, "b.png"), &bad)?;
        std::fs::write(dir.join("notes.txt"), b"ignored")?;

        let gallery = load_gallery(&dir)?;
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(gallery, vec![good, bad]);
        assert!(gallery[1].failed_to_extract());
        Ok(())
    }

    #[test]
    fn test_missing_gallery_is_empty() -> Result<()> {
        assert!(load_gallery(&scratch_dir())?.is_empty());
        Ok(())
    }
}
