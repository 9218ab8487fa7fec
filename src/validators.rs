//! Validation for the upload path field.

use std::path::Path;

use crate::config::Config;

/// Document types the backend can parse.
pub const ALLOWED_EXTENSIONS: &[&str] = &[".docx", ".pdf", ".md", ".txt"];

/// Lower-cased extension of a file name, including the leading dot.
pub fn dotted_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    Some(format!(".{}", ext.to_lowercase()))
}

/// Check that the file name carries one of the accepted extensions.
/// Returns an error message if validation fails, None if valid.
pub fn validate_extension(file_name: &str) -> Option<String> {
    match dotted_extension(file_name) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => None,
        _ => Some(format!(
            "Unsupported file type. Use: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )),
    }
}

/// Check if metadata indicates a valid file (pure function).
fn check_file_metadata(is_file: bool) -> Option<String> {
    if !is_file {
        Some("Path is not a file".to_string())
    } else {
        None
    }
}

/// Convert an I/O error to an appropriate error message for file validation.
fn file_error_message(error: &std::io::Error) -> String {
    match error.kind() {
        std::io::ErrorKind::NotFound => "File not found".to_string(),
        std::io::ErrorKind::PermissionDenied => "Cannot access file".to_string(),
        _ => "Invalid path".to_string(),
    }
}

/// Validate that a path points to an existing file.
pub fn validate_file_exists(path: &str) -> Option<String> {
    if path.is_empty() {
        return Some("Path cannot be empty".to_string());
    }

    let expanded = Config::expand_tilde(path);

    match std::fs::metadata(&expanded) {
        Ok(metadata) => check_file_metadata(metadata.is_file()),
        Err(e) => Some(file_error_message(&e)),
    }
}

/// Validate a document path typed into the upload screen.
///
/// Extension is checked first so a typo'd name gets the more useful message.
pub fn validate_upload_path(path: &str) -> Option<String> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Some("Path cannot be empty".to_string());
    }
    let file_name = Path::new(trimmed)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(trimmed);
    validate_extension(file_name).or_else(|| validate_file_exists(trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_extension() {
        assert_eq!(dotted_extension("spec.PDF"), Some(".pdf".to_string()));
        assert_eq!(dotted_extension("a.b.md"), Some(".md".to_string()));
        assert_eq!(dotted_extension("README"), None);
    }

    #[test]
    fn test_validate_extension_accepts_allowed_types() {
        for name in ["req.docx", "req.pdf", "notes.md", "plain.txt", "UPPER.TXT"] {
            assert_eq!(validate_extension(name), None, "{name} should be accepted");
        }
    }

    #[test]
    fn test_validate_extension_rejects_others() {
        let msg = validate_extension("image.png").unwrap();
        assert_eq!(msg, "Unsupported file type. Use: .docx, .pdf, .md, .txt");
        assert!(validate_extension("Makefile").is_some());
        assert!(validate_extension("archive.tar.gz").is_some());
    }

    #[test]
    fn test_check_file_metadata() {
        assert_eq!(check_file_metadata(true), None);
        assert_eq!(
            check_file_metadata(false),
            Some("Path is not a file".to_string())
        );
    }

    #[test]
    fn test_file_error_message() {
        let error = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        assert_eq!(file_error_message(&error), "File not found");
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(file_error_message(&error), "Cannot access file");
        let error = std::io::Error::other("other");
        assert_eq!(file_error_message(&error), "Invalid path");
    }

    #[test]
    fn test_validate_upload_path() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("requirements.md");
        std::fs::write(&doc, "# Requirements").unwrap();

        assert_eq!(validate_upload_path(doc.to_str().unwrap()), None);
        assert_eq!(
            validate_upload_path(dir.path().join("missing.md").to_str().unwrap()),
            Some("File not found".to_string())
        );
        assert_eq!(
            validate_upload_path(""),
            Some("Path cannot be empty".to_string())
        );

        let folder = dir.path().join("folder.md");
        std::fs::create_dir(&folder).unwrap();
        assert_eq!(
            validate_upload_path(folder.to_str().unwrap()),
            Some("Path is not a file".to_string())
        );
    }
}
