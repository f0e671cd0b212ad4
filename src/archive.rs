//! Archive Module
//!
//! メモリ上でZIPアーカイブを組み立てるモジュール。
//! DOCXコンテナとバッチ出力アーカイブの両方で使用します。

use std::io::{Cursor, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::ReportError;
use crate::security::validate_entry_name;

/// メモリ上のZIPアーカイブ
///
/// エントリ名は追加時に検証されます（絶対パス、`..`、バックスラッシュを拒否）。
pub(crate) struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions,
    entries: Vec<String>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
            entries: Vec::new(),
        }
    }

    /// エントリを追加する
    ///
    /// # 戻り値
    ///
    /// * `Err(ReportError::SecurityViolation)` - エントリ名が不正な場合
    /// * `Err(ReportError::Zip)` - 書き込みに失敗した場合
    pub fn add(&mut self, name: &str, bytes: &[u8]) -> Result<(), ReportError> {
        validate_entry_name(name).map_err(ReportError::SecurityViolation)?;
        if self.entries.iter().any(|e| e == name) {
            return Err(ReportError::Zip(format!("Duplicate archive entry: {}", name)));
        }

        self.zip.start_file(name, self.options)?;
        self.zip.write_all(bytes)?;
        self.entries.push(name.to_string());
        Ok(())
    }

    /// 追加済みのエントリ名（追加順）
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// アーカイブを完成させ、バイト列を返す
    pub fn finish(mut self) -> Result<Vec<u8>, ReportError> {
        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_archive_round_trip() {
        let mut archive = ArchiveWriter::new();
        archive.add("a.txt", b"alpha").unwrap();
        archive.add("dir/b.txt", b"beta").unwrap();
        assert_eq!(archive.entries(), &["a.txt".to_string(), "dir/b.txt".to_string()]);

        let bytes = archive.finish().unwrap();
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut content = String::new();
        zip.by_name("dir/b.txt").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "beta");
    }

    #[test]
    fn test_archive_rejects_unsafe_names() {
        let mut archive = ArchiveWriter::new();
        assert!(matches!(
            archive.add("../escape.pdf", b""),
            Err(ReportError::SecurityViolation(_))
        ));
        assert!(matches!(
            archive.add("/abs.pdf", b""),
            Err(ReportError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_archive_rejects_duplicates() {
        let mut archive = ArchiveWriter::new();
        archive.add("same.pdf", b"1").unwrap();
        assert!(matches!(archive.add("same.pdf", b"2"), Err(ReportError::Zip(_))));
    }
}
