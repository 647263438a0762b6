//! Advisory descriptions for MODIFIED entries.

use hq_content::summarize_text;
use hq_fs::{EntryKind, FileEntry, Inventory};

/// Describe how `local` differs from `template`. Text files are read from their
/// inventory roots; an unreadable file yields no summary.
pub fn summarize_change(
    template_inv: &Inventory,
    local_inv: &Inventory,
    template: &FileEntry,
    local: &FileEntry,
) -> Option<String> {
    if template.kind != local.kind {
        return None;
    }
    match template.kind {
        EntryKind::Symlink => Some(format!(
            "symlink target: {} -> {}",
            local.symlink_target.as_deref().unwrap_or("?"),
            template.symlink_target.as_deref().unwrap_or("?")
        )),
        EntryKind::Directory => None,
        EntryKind::File if template.is_binary || local.is_binary => {
            let delta = template.size as i64 - local.size as i64;
            Some(format!(
                "binary size: {} -> {} bytes ({delta:+})",
                local.size, template.size
            ))
        }
        EntryKind::File => {
            let path = &template.relative_path;
            let old = std::fs::read_to_string(local_inv.absolute(path));
            let new = std::fs::read_to_string(template_inv.absolute(path));
            match (old, new) {
                (Ok(old), Ok(new)) => {
                    Some(summarize_text(template.extension().as_deref(), &old, &new).to_string())
                }
                (Err(e), _) | (_, Err(e)) => {
                    tracing::debug!("No summary for {}: {}", path, e);
                    None
                }
            }
        }
    }
}
