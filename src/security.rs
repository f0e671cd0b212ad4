//! Security Module
//!
//! 入力サイズ・レコード数の上限と、出力アーカイブのエントリ名検証を提供します。

use crate::error::ReportError;

/// セキュリティ設定
///
/// 1ファイルあたりの処理上限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 50MB (52_428_800 bytes)
    pub max_input_file_size: u64,
    /// 1ファイルあたりの最大データ行数
    /// デフォルト: 10000
    pub max_records: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_input_file_size: 52_428_800, // 50MB
            max_records: 10_000,
        }
    }
}

impl SecurityConfig {
    /// 入力サイズを検証する
    pub fn check_input_size(&self, file_name: &str, size: usize) -> Result<(), ReportError> {
        if size as u64 > self.max_input_file_size {
            return Err(ReportError::SecurityViolation(format!(
                "Input file '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                file_name, size, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// データ行数を検証する
    pub fn check_record_count(&self, count: usize) -> Result<(), ReportError> {
        if count > self.max_records {
            return Err(ReportError::SecurityViolation(format!(
                "Too many data rows: {} (max: {})",
                count, self.max_records
            )));
        }
        Ok(())
    }
}

/// アーカイブのエントリ名の検証
///
/// パストラバーサルを防ぐため、エントリ名を検証します。
///
/// # 引数
///
/// * `name` - 検証するエントリ名
///
/// # 戻り値
///
/// * `Ok(())` - エントリ名が安全な場合
/// * `Err(String)` - エントリ名が危険な場合（空、絶対パス、`..`、`\`、制御文字を含む）
pub(crate) fn validate_entry_name(name: &str) -> Result<(), String> {
    // 空の名前は拒否
    if name.is_empty() {
        return Err("Empty entry name is not allowed".to_string());
    }

    // 絶対パスを拒否（Unix形式の`/`、Windows形式のドライブ指定）
    let bytes = name.as_bytes();
    if name.starts_with('/') || (bytes.len() >= 2 && bytes[1] == b':') {
        return Err(format!("Absolute path is not allowed: {}", name));
    }

    // `..`を含むパスを拒否
    if name.split('/').any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", name));
    }

    // `\`を含むパスを拒否
    if name.contains('\\') {
        return Err(format!("Backslash in entry name is not allowed: {}", name));
    }

    if name.chars().any(char::is_control) {
        return Err(format!("Control character in entry name: {:?}", name));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_entry_name_valid() {
        assert!(validate_entry_name("word/document.xml").is_ok());
        assert!(validate_entry_name("[Content_Types].xml").is_ok());
        assert!(validate_entry_name("scores_John_Smith_report.pdf").is_ok());
        // ".."を含むだけのファイル名は許可
        assert!(validate_entry_name("a..b_report.pdf").is_ok());
    }

    #[test]
    fn test_validate_entry_name_empty() {
        assert!(validate_entry_name("").is_err());
    }

    #[test]
    fn test_validate_entry_name_absolute() {
        assert!(validate_entry_name("/etc/passwd").is_err());
        assert!(validate_entry_name("C:/Windows/report.pdf").is_err());
        assert!(validate_entry_name("c:\\report.pdf").is_err());
    }

    #[test]
    fn test_validate_entry_name_traversal() {
        assert!(validate_entry_name("../report.pdf").is_err());
        assert!(validate_entry_name("out/../../report.pdf").is_err());
        assert!(validate_entry_name("..").is_err());
    }

    #[test]
    fn test_validate_entry_name_backslash_and_control() {
        assert!(validate_entry_name("out\\report.pdf").is_err());
        assert!(validate_entry_name("report\n.pdf").is_err());
    }

    #[test]
    fn test_check_input_size() {
        let config = SecurityConfig {
            max_input_file_size: 10,
            ..Default::default()
        };
        assert!(config.check_input_size("a.csv", 10).is_ok());
        assert!(matches!(
            config.check_input_size("a.csv", 11),
            Err(ReportError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_check_record_count() {
        let config = SecurityConfig {
            max_records: 2,
            ..Default::default()
        };
        assert!(config.check_record_count(2).is_ok());
        assert!(config.check_record_count(3).is_err());
    }
}
