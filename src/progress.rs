// ============================================
// src/progress.rs
// 学習進度 (learned / review / mastered) の管理と永続化
// ============================================

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::store::KeyValueStore;

const PROGRESS_KEY_PREFIX: &str = "learningProgress_";

/// 学年ごとの保存キー
pub fn progress_key(grade: &str) -> String {
    format!("{PROGRESS_KEY_PREFIX}{grade}")
}

/// 1文字の学習状態
///
/// 複数の集合に入っている場合は mastered > review > learned > new の順で優先する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    New,
    Learned,
    Review,
    Mastered,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::New => "未学习",
            Status::Learned => "已学习",
            Status::Review => "需复习",
            Status::Mastered => "已掌握",
        }
    }
}

/// 3つの集合で表した学習進度
///
/// - `review` と `mastered` は互いに素
/// - `mastered ⊆ learned`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressState {
    pub learned: BTreeSet<String>,
    pub review: BTreeSet<String>,
    pub mastered: BTreeSet<String>,
}

/// 保存形式 (`lastUpdated` 付き)
#[derive(Debug, Serialize)]
struct ProgressRecord<'a> {
    #[serde(flatten)]
    state: &'a ProgressState,
    #[serde(rename = "lastUpdated")]
    last_updated: String,
}

/// 1つのリストを読む。null や配列以外は空、文字列以外の要素は捨てる
///
/// 壊れているのが1つのリストだけなら、残りの2つはそのまま使える。
fn read_list(record: &Value, key: &str) -> BTreeSet<String> {
    match record.get(key) {
        None | Some(Value::Null) => BTreeSet::new(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(other) => {
            warn!(key, value = %other, "進度リストの形式が不正なため空として扱います");
            BTreeSet::new()
        }
    }
}

impl ProgressState {
    /// 学習済みにする。変化があれば true
    pub fn mark_learned(&mut self, character: &str) -> bool {
        self.learned.insert(character.to_string())
    }

    /// 要復習にする (mastered からは外す。learned は触らない)
    pub fn mark_for_review(&mut self, character: &str) -> bool {
        let added = self.review.insert(character.to_string());
        let removed = self.mastered.remove(character);
        added || removed
    }

    /// 習得済みにする (review から外し、learned に入れる)
    pub fn mark_mastered(&mut self, character: &str) -> bool {
        let added = self.mastered.insert(character.to_string());
        let removed = self.review.remove(character);
        let learned = self.learned.insert(character.to_string());
        added || removed || learned
    }

    pub fn status_of(&self, character: &str) -> Status {
        if self.mastered.contains(character) {
            Status::Mastered
        } else if self.review.contains(character) {
            Status::Review
        } else if self.learned.contains(character) {
            Status::Learned
        } else {
            Status::New
        }
    }

    /// 保存データの不整合をできる範囲で直す
    fn normalize(&mut self) {
        let overlap: Vec<String> = self.review.intersection(&self.mastered).cloned().collect();
        for character in overlap {
            self.review.remove(&character);
        }
        for character in &self.mastered {
            self.learned.insert(character.clone());
        }
    }
}

/// (learned, review, mastered) の件数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProgressCounts {
    pub learned: usize,
    pub review: usize,
    pub mastered: usize,
}

/// MARK:ストアから読み込む。無い・壊れている場合は空の状態を返す
pub fn load(store: &dyn KeyValueStore, grade: &str) -> ProgressState {
    let key = progress_key(grade);
    let Some(raw) = store.get(&key) else {
        debug!(%key, "保存された進度がありません");
        return ProgressState::default();
    };

    let record = match serde_json::from_str::<Value>(&raw) {
        Ok(record @ Value::Object(_)) => record,
        Ok(other) => {
            warn!(%key, value = %other, "進度データがオブジェクトではないため空で開始します");
            return ProgressState::default();
        }
        Err(err) => {
            warn!(%key, error = %err, "進度データが壊れているため空で開始します");
            return ProgressState::default();
        }
    };

    let mut state = ProgressState {
        learned: read_list(&record, "learned"),
        review: read_list(&record, "review"),
        mastered: read_list(&record, "mastered"),
    };
    state.normalize();
    state
}

/// MARK:ストアへ保存する (前の値は全て上書き)
pub fn save(store: &mut dyn KeyValueStore, state: &ProgressState, grade: &str) {
    save_at(store, state, grade, Utc::now());
}

fn save_at(store: &mut dyn KeyValueStore, state: &ProgressState, grade: &str, now: DateTime<Utc>) {
    let key = progress_key(grade);
    let record = ProgressRecord {
        state,
        last_updated: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    let json = match serde_json::to_string(&record) {
        Ok(json) => json,
        Err(err) => {
            warn!(%key, error = %err, "進度のシリアライズに失敗しました");
            return;
        }
    };
    if let Err(err) = store.set(&key, json) {
        warn!(%key, error = %err, "進度の保存に失敗しました");
    }
}

/// 最終更新日時 (`stats` サブコマンド用)
pub fn last_updated(store: &dyn KeyValueStore, grade: &str) -> Option<DateTime<Utc>> {
    let raw = store.get(&progress_key(grade))?;
    let record: Value = serde_json::from_str(&raw).ok()?;
    let stamp = record.get("lastUpdated")?.as_str()?;
    DateTime::parse_from_rfc3339(stamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// 1学年ぶんの進度と、その保存先をまとめて持つ
///
/// 状態を変える操作のたびにストアへ書き戻す。
pub struct ProgressTracker {
    grade: String,
    state: ProgressState,
    store: Box<dyn KeyValueStore>,
}

impl ProgressTracker {
    pub fn open(store: Box<dyn KeyValueStore>, grade: &str) -> Self {
        let state = load(store.as_ref(), grade);
        Self {
            grade: grade.to_string(),
            state,
            store,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    #[cfg(test)]
    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn status_of(&self, character: &str) -> Status {
        self.state.status_of(character)
    }

    pub fn counts(&self) -> ProgressCounts {
        ProgressCounts {
            learned: self.state.learned.len(),
            review: self.state.review.len(),
            mastered: self.state.mastered.len(),
        }
    }

    /// 読み上げ後に呼ばれる。初回だけ保存する
    pub fn mark_learned(&mut self, character: &str) -> bool {
        let changed = self.state.mark_learned(character);
        if changed {
            debug!(character, "learned");
            self.persist();
        }
        changed
    }

    pub fn mark_for_review(&mut self, character: &str) {
        self.state.mark_for_review(character);
        debug!(character, "review");
        self.persist();
    }

    pub fn mark_mastered(&mut self, character: &str) {
        self.state.mark_mastered(character);
        debug!(character, "mastered");
        self.persist();
    }

    fn persist(&mut self) {
        save(self.store.as_mut(), &self.state, &self.grade);
    }
}
