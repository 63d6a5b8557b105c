use crate::utils::error::{EtlError, Result};
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 分隔符必須是單一 ASCII 字元，且不能是換行或引號
pub fn validate_delimiter(field_name: &str, delimiter: char) -> Result<()> {
    let reason = if !delimiter.is_ascii() {
        Some("Delimiter must be a single ASCII character")
    } else if matches!(delimiter, '\n' | '\r' | '"') {
        Some("Delimiter cannot be a line terminator or quote")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: delimiter.escape_default().to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

pub fn validate_distinct_paths(input_path: &str, output_path: &str) -> Result<()> {
    if input_path == output_path {
        return Err(EtlError::ConfigValidationError {
            field: "output_path".to_string(),
            message: "Output path must differ from input path".to_string(),
        });
    }
    Ok(())
}

/// Rejects an output that resolves to the same file as the input.
///
/// Runs after the input has been opened and before the output is, so `./` segments,
/// relative versus absolute spellings and symbolic links are all resolved against the
/// file system. An output that does not exist yet cannot alias the input.
pub async fn validate_distinct_files(input_path: &Path, output_path: &Path) -> Result<()> {
    let Ok(output_meta) = tokio::fs::metadata(output_path).await else {
        return Ok(());
    };
    let input_meta = tokio::fs::metadata(input_path).await?;

    let same = match (
        tokio::fs::canonicalize(input_path).await,
        tokio::fs::canonicalize(output_path).await,
    ) {
        (Ok(input), Ok(output)) => input == output,
        _ => false,
    } || same_file(&input_meta, &output_meta);

    if same {
        return Err(EtlError::ConfigValidationError {
            field: "output_path".to_string(),
            message: format!(
                "'{}' is the same file as the input '{}'",
                output_path.display(),
                input_path.display()
            ),
        });
    }
    Ok(())
}

// 硬連結的路徑不同，只能以裝置與 inode 判斷
#[cfg(unix)]
fn same_file(a: &std::fs::Metadata, b: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(_: &std::fs::Metadata, _: &std::fs::Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("input_path", "data.csv").is_ok());
        assert!(validate_path("input_path", "").is_err());
        assert!(validate_path("input_path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("chunk_size", 5, 1).is_ok());
        assert!(validate_positive_number("chunk_size", 0, 1).is_err());
    }

    #[test]
    fn test_validate_delimiter() {
        assert!(validate_delimiter("field_delimiter", ',').is_ok());
        assert!(validate_delimiter("field_delimiter", ';').is_ok());
        assert!(validate_delimiter("field_delimiter", '\t').is_ok());
        assert!(validate_delimiter("field_delimiter", '\n').is_err());
        assert!(validate_delimiter("field_delimiter", 'é').is_err());
    }

    #[test]
    fn test_validate_distinct_paths() {
        assert!(validate_distinct_paths("in.csv", "out.csv").is_ok());
        assert!(validate_distinct_paths("same.csv", "same.csv").is_err());
    }

    #[tokio::test]
    async fn test_validate_distinct_files_resolves_aliases() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("data.csv");
        std::fs::write(&input, "alice,smith\n").unwrap();

        let dotted = dir.path().join(".").join("data.csv");
        let result = validate_distinct_files(&input, &dotted).await;
        assert!(matches!(result, Err(EtlError::ConfigValidationError { .. })));

        let other = dir.path().join("output.csv");
        assert!(validate_distinct_files(&input, &other).await.is_ok());
        std::fs::write(&other, "").unwrap();
        assert!(validate_distinct_files(&input, &other).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validate_distinct_files_follows_links() {
        let dir = tempfile::TempDir::new().unwrap();
        let input = dir.path().join("data.csv");
        std::fs::write(&input, "alice,smith\n").unwrap();

        let symlink = dir.path().join("link.csv");
        std::os::unix::fs::symlink(&input, &symlink).unwrap();
        assert!(validate_distinct_files(&input, &symlink).await.is_err());

        let hard_link = dir.path().join("hard.csv");
        std::fs::hard_link(&input, &hard_link).unwrap();
        assert!(validate_distinct_files(&input, &hard_link).await.is_err());
    }
}
