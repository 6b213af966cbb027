//! Plain-file JSON backup: an array of key objects
//! `{"name", "account", "secret", "createdAt"}`.

use crate::key::TotpKey;
use anyhow::{Context, Result, anyhow};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// What a backup file yielded on read: the usable keys plus the number
/// of rows dropped for missing required fields.
pub struct BackupImport {
    pub keys: Vec<TotpKey>,
    pub dropped: usize,
}

/// Write all keys to a JSON backup file.
///
///   otpm backup create
///   otpm backup create my_backup
///   otpm backup create my_backup.json
pub fn backup_create(keys: &[TotpKey], optional_path: Option<String>) -> Result<String> {
    if keys.is_empty() {
        return Err(anyhow!("No keys to back up."));
    }

    let path = match optional_path.as_deref().map(str::trim) {
        None | Some("") => {
            let timestamp = OffsetDateTime::now_utc()
                .format(&Rfc3339)?
                .replace(':', "-");
            format!("otpm_backup_{timestamp}.json")
        }
        Some(p) if p.ends_with(".json") => p.to_string(),
        Some(p) => format!("{p}.json"),
    };

    let json = serde_json::to_string_pretty(keys)?;
    std::fs::write(&path, json).with_context(|| format!("cannot write backup {path}"))?;
    Ok(path)
}

/// Read a backup file, dropping rows with an empty `name` or `secret`.
pub fn backup_read(path: &Path) -> Result<BackupImport> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read backup file {}", path.display()))?;
    let rows: Vec<TotpKey> = serde_json::from_str(&data)
        .with_context(|| format!("not a valid backup file {}", path.display()))?;

    let total = rows.len();
    let keys: Vec<TotpKey> = rows
        .into_iter()
        .filter(|k| !k.name.trim().is_empty() && !k.secret.trim().is_empty())
        .collect();
    let dropped = total - keys.len();

    Ok(BackupImport { keys, dropped })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_drops_rows_missing_required_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(
            &path,
            r#"[{"name":"A","secret":"JBSWY3DPEHPK3PXP"},
                {"name":"","secret":"X"},
                {"name":"B","secret":""},
                {"account":"orphan@example.com"}]"#,
        )
        .unwrap();

        let result = backup_read(&path).unwrap();
        assert_eq!(result.keys.len(), 1);
        assert_eq!(result.keys[0].name, "A");
        assert_eq!(result.dropped, 3);
    }

    #[test]
    fn create_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let keys = vec![
            TotpKey::new("GitHub", "alice", "JBSWY3DPEHPK3PXP"),
            TotpKey::new("AWS", "", "GEZDGNBVGY3TQOJQ"),
        ];

        let out = dir.path().join("b").to_string_lossy().into_owned();
        let written = backup_create(&keys, Some(out)).unwrap();
        assert!(written.ends_with(".json"));

        let result = backup_read(Path::new(&written)).unwrap();
        assert_eq!(result.keys, keys);
        assert_eq!(result.dropped, 0);
    }

    #[test]
    fn empty_store_refused() {
        assert!(backup_create(&[], None).is_err());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert!(backup_read(&path).is_err());
    }
}
