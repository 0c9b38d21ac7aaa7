use std::fs;
use std::io;
use std::path::Path;

/// Convert runs of whitespace and hyphens to a single hyphen. Remove
/// every other character that isn't an ASCII alphanumeric or an
/// underscore. Convert to lowercase and trim leading and trailing
/// hyphens.
pub fn slugify(string: &str) -> String {
    let mut output = String::with_capacity(string.len());

    let mut pending_dash = false;
    for ch in string.chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        } else if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_dash && !output.is_empty() {
                output.push('-');
            }

            pending_dash = false;
            output.push(ch.to_ascii_lowercase());
        }
    }

    output
}

/// Copies `src` to `dst`, recursing into directories. Existing files at
/// the destination are overwritten; modification times carry over.
pub fn copy_recursively(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_recursively(&entry.path(), &dst.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::copy(src, dst)?;
        let modified = fs::metadata(src)?.modified()?;
        fs::File::options().write(true).open(dst)?.set_modified(modified)?;
    }

    Ok(())
}

#[cfg(test)]
mod slug_tests {
    use super::slugify;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("My Test String!!!1!1"), "my-test-string11");
        assert_eq!(slugify("test\nit   now!"), "test-it-now");
        assert_eq!(slugify("  --test_-_cool- -  "), "test_-_cool");
        assert_eq!(slugify("You & Me"), "you-me");
        assert_eq!(slugify("Getting Started"), "getting-started");
    }

    #[test]
    fn test_slugify_strips_non_ascii() {
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("Æúű--cool?"), "cool");
        assert_eq!(slugify("日本語 guide"), "guide");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        for s in ["My Test String!!!1!1", "You & Me", "Æúű--cool?", "Café", "", "a"] {
            assert_eq!(slugify(&slugify(s)), slugify(s));
        }
    }
}

#[cfg(test)]
mod copy_tests {
    use super::copy_recursively;
    use std::fs;

    #[test]
    fn test_copies_nested_tree() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        fs::create_dir_all(src.path().join("css")).unwrap();
        fs::write(src.path().join("css/site.css"), "body {}").unwrap();
        fs::write(src.path().join("logo.svg"), "<svg/>").unwrap();

        copy_recursively(src.path(), dst.path()).unwrap();
        assert_eq!(fs::read_to_string(dst.path().join("css/site.css")).unwrap(), "body {}");
        assert_eq!(fs::read_to_string(dst.path().join("logo.svg")).unwrap(), "<svg/>");
    }

    #[test]
    fn test_preserves_modification_times() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        fs::write(src.path().join("CNAME"), "docs.example.com").unwrap();

        copy_recursively(src.path(), dst.path()).unwrap();
        let original = fs::metadata(src.path().join("CNAME")).unwrap().modified().unwrap();
        let copied = fs::metadata(dst.path().join("CNAME")).unwrap().modified().unwrap();
        assert_eq!(original, copied);
    }
}
