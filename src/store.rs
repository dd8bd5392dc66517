// ============================================
// src/store.rs
// 永続キーバリューストア (ブラウザの localStorage 相当)
// ============================================

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use thiserror::Error;
use tracing::warn;

const STORE_FILE: &str = "storage.json";
const STORE_TMP_FILE: &str = "storage.json.tmp";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("ストアの入出力に失敗しました: {0}")]
    Io(#[from] std::io::Error),

    #[error("ストアのJSONが不正です: {0}")]
    Json(#[from] serde_json::Error),

    #[error("データディレクトリを特定できません")]
    NoDataDir,
}

/// 文字列キー → 文字列値 の永続ストア
///
/// 書き込みは常に値全体の上書き。トランザクションは持たない。
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

/// MARK:データディレクトリを取得する (なければ作成)
pub fn default_data_dir() -> Result<PathBuf, StoreError> {
    let proj_dirs = ProjectDirs::from("jp", "Fukumoto0141", "SHENGZI").ok_or(StoreError::NoDataDir)?;
    let data_dir = proj_dirs.data_dir().to_path_buf();
    fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

/// 1つのJSONファイルにまとめて保存するストア
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// `dir/storage.json` を開く。壊れている・存在しない場合は空から始める
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(STORE_FILE);
        let entries = if path.exists() {
            match Self::read_entries(&path) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "ストアが読めないため空で開始します");
                    BTreeMap::new()
                }
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, entries })
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 一時ファイルに書き切ってから置き換える。途中で落ちても元のファイルは残る
    fn flush(&self) -> Result<(), StoreError> {
        let tmp_path = self.path.with_file_name(STORE_TMP_FILE);
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.entries)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }
}

/// メモリ上だけのストア (テスト用)
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
