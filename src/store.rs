use crate::key::TotpKey;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Store root directory (e.g. ~/.local/share/otpm)
pub fn store_root() -> Result<PathBuf> {
    let mut dir = dirs::data_dir().ok_or_else(|| anyhow::anyhow!("cannot get data dir"))?;
    dir.push("otpm");
    Ok(dir)
}

/// Path of the key list file.
pub fn store_path() -> Result<PathBuf> {
    Ok(store_root()?.join("keys.json"))
}

/// Load all keys. A missing store reads as empty.
pub fn load_keys(path: &Path) -> Result<Vec<TotpKey>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read key store {}", path.display()))?;
    let keys: Vec<TotpKey> = serde_json::from_str(&data)
        .with_context(|| format!("corrupt key store {}", path.display()))?;
    Ok(keys)
}

/// Save the whole key list. Mutations always rewrite the full list, so
/// a failed operation never leaves a partial store behind.
pub fn save_keys(path: &Path, keys: &[TotpKey]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let s = serde_json::to_string_pretty(keys)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Index of the first key with the given name.
pub fn find_key(keys: &[TotpKey], name: &str) -> Option<usize> {
    keys.iter().position(|k| k.name == name)
}

/// True if the store already holds a duplicate of `key` (same name and
/// account, empty account treated as absent).
pub fn has_duplicate(keys: &[TotpKey], key: &TotpKey) -> bool {
    keys.iter().any(|k| k.is_duplicate_of(key))
}

/// Append every non-duplicate incoming key. Returns (added, skipped).
pub fn merge_keys(keys: &mut Vec<TotpKey>, incoming: Vec<TotpKey>) -> (usize, usize) {
    let mut added = 0;
    let mut skipped = 0;
    for key in incoming {
        if has_duplicate(keys, &key) {
            skipped += 1;
        } else {
            keys.push(key);
            added += 1;
        }
    }
    (added, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, account: &str) -> TotpKey {
        TotpKey::new(name, account, "JBSWY3DPEHPK3PXP")
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        let keys = vec![key("GitHub", "alice"), key("AWS", "")];

        save_keys(&path, &keys).unwrap();
        assert_eq!(load_keys(&path).unwrap(), keys);
    }

    #[test]
    fn missing_store_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        assert!(load_keys(&path).unwrap().is_empty());
    }

    #[test]
    fn corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_keys(&path).is_err());
    }

    #[test]
    fn merge_skips_duplicates() {
        let mut keys = vec![key("GitHub", "alice")];
        let (added, skipped) = merge_keys(
            &mut keys,
            vec![key("GitHub", "alice"), key("GitHub", "bob"), key("AWS", "")],
        );
        assert_eq!((added, skipped), (2, 1));
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn find_by_name() {
        let keys = vec![key("GitHub", "alice"), key("AWS", "")];
        assert_eq!(find_key(&keys, "AWS"), Some(1));
        assert_eq!(find_key(&keys, "aws"), None);
    }
}
