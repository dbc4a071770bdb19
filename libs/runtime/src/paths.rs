use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Resolve the application home directory.
///
/// - `None` (or blank) → `<platform home>/<default_subdir>`
/// - `~` / `~/x` → expanded against the platform home
/// - relative paths → joined with the current directory
///
/// With `create`, the directory is created when missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf> {
    let raw = configured.filter(|s| !s.trim().is_empty());

    let resolved = match raw.as_deref() {
        None => platform_home()?.join(default_subdir),
        Some("~") => platform_home()?,
        Some(p) if p.starts_with("~/") || p.starts_with("~\\") => platform_home()?.join(&p[2..]),
        Some(p) => {
            let p = Path::new(p);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                std::env::current_dir()
                    .context("current directory is not accessible")?
                    .join(p)
            }
        }
    };

    if create {
        std::fs::create_dir_all(&resolved)
            .with_context(|| format!("failed to create home dir '{}'", resolved.display()))?;
    }
    Ok(resolved)
}

fn platform_home() -> Result<PathBuf> {
    match dirs::home_dir() {
        Some(home) if home.is_absolute() => Ok(home),
        Some(home) => bail!("platform home '{}' is not absolute", home.display()),
        None => bail!("platform home directory is not available"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absolute_path_is_kept_and_created() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("ngkit-home");

        let resolved =
            resolve_home_dir(Some(target.to_string_lossy().into()), ".ngkit", true).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn blank_means_default_subdir() {
        let resolved = resolve_home_dir(Some("  ".into()), ".ngkit", false).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with(".ngkit"));
    }

    #[test]
    fn tilde_is_expanded() {
        let resolved = resolve_home_dir(Some("~/.ngkit-test".into()), ".ngkit", false).unwrap();
        assert!(resolved.is_absolute());
        assert!(!resolved.to_string_lossy().contains('~'));
        assert!(resolved.ends_with(".ngkit-test"));
    }
}
