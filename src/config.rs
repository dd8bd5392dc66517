// ============================================
// src/config.rs
// 起動設定と、選択中の学年の引き継ぎ
// ============================================

use std::path::PathBuf;

use tracing::warn;

use crate::speech::{CommandSpeaker, DEFAULT_TTS_COMMAND, SilentSpeaker, Speaker};
use crate::store::KeyValueStore;

/// 選択中の学年を保存するキー
pub const SELECTED_GRADE_KEY: &str = "selectedGrade";
pub const DEFAULT_GRADE: &str = "一年级上册";

/// コマンドラインと環境変数から組み立てた設定
#[derive(Debug, Clone)]
pub struct Config {
    /// 生字データ (JSON)
    pub data_file: PathBuf,
    /// 今回だけ使う学年 (保存はしない)
    pub grade: Option<String>,
    pub tts_command: Option<String>,
    pub mute: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data.json"),
            grade: None,
            tts_command: None,
            mute: false,
        }
    }
}

impl Config {
    /// 学年の決定: 引数 > 保存済み > 既定値
    pub fn resolve_grade(&self, store: &dyn KeyValueStore) -> String {
        self.grade
            .clone()
            .unwrap_or_else(|| selected_grade(store))
    }

    pub fn speaker(&self) -> Box<dyn Speaker> {
        if self.mute {
            return Box::new(SilentSpeaker);
        }
        let command = self.tts_command.as_deref().unwrap_or(DEFAULT_TTS_COMMAND);
        match CommandSpeaker::parse(command) {
            Some(speaker) => Box::new(speaker),
            None => {
                warn!("読み上げコマンドが空のため無音にします");
                Box::new(SilentSpeaker)
            }
        }
    }
}

pub fn selected_grade(store: &dyn KeyValueStore) -> String {
    store
        .get(SELECTED_GRADE_KEY)
        .filter(|grade| !grade.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_GRADE.to_string())
}

pub fn save_selected_grade(
    store: &mut dyn KeyValueStore,
    grade: &str,
) -> Result<(), crate::store::StoreError> {
    store.set(SELECTED_GRADE_KEY, grade.to_string())
}
