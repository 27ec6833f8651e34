//! Centralized helpers for on-disk resources rooted at the storage directory.
//! Backend operations and test provisioning both go through these so the
//! layout stays consistent.

use std::path::{Path, PathBuf};

// ---- assembly ----
#[inline]
pub fn assembly_attachments_dir(root: &Path) -> PathBuf { root.join("assembly_attachment") }

#[inline]
pub fn assembly_attachment_path(root: &Path, attachment_id: i64, version: u32) -> PathBuf {
    assembly_attachments_dir(root).join(format!("{attachment_id}_v{version}"))
}

// ---- event ----
#[inline]
pub fn event_logo_dir(root: &Path) -> PathBuf { root.join("event_logo") }

// ---- mailing lists ----
#[inline]
pub fn mailinglist_export_dir(root: &Path) -> PathBuf { root.join("ml_export") }

#[inline]
pub fn mailinglist_export_path(root: &Path, mailinglist_id: i64) -> PathBuf {
    mailinglist_export_dir(root).join(format!("{mailinglist_id}.json"))
}

/// Create every storage subdirectory below `root`.
pub fn ensure_layout(root: &Path) -> std::io::Result<()> {
    for dir in [assembly_attachments_dir(root), event_logo_dir(root), mailinglist_export_dir(root)] {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        ensure_layout(tmp.path()).unwrap();
        assert!(assembly_attachments_dir(tmp.path()).is_dir());
        assert!(event_logo_dir(tmp.path()).is_dir());
        assert!(mailinglist_export_dir(tmp.path()).is_dir());
    }

    #[test]
    fn paths_are_rooted() {
        let root = Path::new("/srv/storage");
        assert_eq!(assembly_attachment_path(root, 3, 2), Path::new("/srv/storage/assembly_attachment/3_v2"));
        assert_eq!(mailinglist_export_path(root, 4), Path::new("/srv/storage/ml_export/4.json"));
    }
}
