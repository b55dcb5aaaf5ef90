// src/inputs.rs
//
// Line-delimited input files. Blank lines and `#` comments are skipped and
// surrounding whitespace is trimmed.

use crate::proxy::Proxy;
use anyhow::{Context, Result};
use log::warn;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Wallet addresses in file order, first occurrence wins.
pub fn load_addresses(path: &Path) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let addresses: Vec<String> = read_lines(path)
        .context("loading address list")?
        .into_iter()
        .filter(|address| seen.insert(address.clone()))
        .collect();
    if addresses.is_empty() {
        warn!("[INPUTS] {} contains no addresses", path.display());
    }
    Ok(addresses)
}

/// Proxy candidates; unparseable lines are logged and skipped.
pub fn load_proxies(path: &Path) -> Result<Vec<Proxy>> {
    let lines = read_lines(path).context("loading proxy list")?;
    Ok(lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| match line.parse::<Proxy>() {
            Ok(proxy) => Some(proxy),
            Err(e) => {
                warn!("[INPUTS] {}: skipping entry {}: {}", path.display(), i + 1, e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_addresses_skip_comments_and_duplicates() {
        let file = file_with("# wallets\n0xA\n\n  0xB  \n0xA\n");
        let addresses = load_addresses(file.path()).unwrap();
        assert_eq!(addresses, vec!["0xA", "0xB"]);
    }

    #[test]
    fn test_invalid_proxies_are_skipped() {
        let file = file_with(
            "10.0.0.1:8080\nsocks5://10.0.0.2:1080\nhost:port:only\nuser:pw@10.0.0.3:3128\n",
        );
        let proxies = load_proxies(file.path()).unwrap();
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies[1].url().username(), "user");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_addresses(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(format!("{:#}", err).contains("/definitely/not/here.txt"));
    }
}
