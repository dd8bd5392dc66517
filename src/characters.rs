// ============================================
// src/characters.rs
// 生字データ (デッキ) の読み込みとデモデータ
// ============================================

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

/// 1枚のカード。`character` がID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterEntry {
    pub character: String,
    pub pinyin: String,
    pub word_groups: Vec<String>,
    pub sentence: String,
}

impl CharacterEntry {
    fn new(character: &str, pinyin: &str, word_groups: &[&str], sentence: &str) -> Self {
        Self {
            character: character.to_string(),
            pinyin: pinyin.to_string(),
            word_groups: word_groups.iter().map(|w| w.to_string()).collect(),
            sentence: sentence.to_string(),
        }
    }
}

/// data.json の1レコード (`{word, pinyin, words, sentence}`)
#[derive(Debug, Deserialize)]
struct CharacterRecord {
    word: String,
    pinyin: String,
    words: Vec<String>,
    sentence: String,
}

impl From<CharacterRecord> for CharacterEntry {
    fn from(record: CharacterRecord) -> Self {
        Self {
            character: record.word,
            pinyin: record.pinyin,
            word_groups: record.words,
            sentence: record.sentence,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeckSourceError {
    #[error("データファイルを開けません: {0}")]
    Io(#[from] std::io::Error),

    #[error("データファイルの形式が不正です: {0}")]
    Json(#[from] serde_json::Error),

    #[error("学年「{0}」のデータがありません")]
    GradeNotFound(String),
}

/// 演示数据 (読み込みに失敗したときの予備)
pub fn demo_deck() -> Vec<CharacterEntry> {
    vec![
        CharacterEntry::new("天", "tiān", &["天空", "今天"], "蓝蓝的天空像大海。"),
        CharacterEntry::new("地", "dì", &["大地", "土地"], "大地妈妈真温暖。"),
        CharacterEntry::new("人", "rén", &["人们", "好人"], "人们都在努力工作。"),
        CharacterEntry::new("你", "nǐ", &["你好", "你们"], "你们好，新同学！"),
        CharacterEntry::new("我", "wǒ", &["我们", "自我"], "我们是一年级学生。"),
    ]
}

/// トップレベルは配列であることだけ確認する。各学年の中身は使うときに読む
fn read_grades(path: &Path) -> Result<Vec<Value>, DeckSourceError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn grade_name(item: &Value) -> Option<&str> {
    item.get("grade").and_then(Value::as_str)
}

/// データファイルに含まれる学年名の一覧
pub fn list_grades(path: &Path) -> Result<Vec<String>, DeckSourceError> {
    Ok(read_grades(path)?
        .iter()
        .filter_map(grade_name)
        .map(str::to_string)
        .collect())
}

/// 指定学年のデッキを読み込む (エラーはそのまま返す)
///
/// 他の学年のレコードが壊れていても、指定学年が正しければ読み込める。
pub fn try_load_deck(path: &Path, grade: &str) -> Result<Vec<CharacterEntry>, DeckSourceError> {
    let mut grade_record = read_grades(path)?
        .into_iter()
        .find(|item| grade_name(item) == Some(grade))
        .ok_or_else(|| DeckSourceError::GradeNotFound(grade.to_string()))?;
    let characters = match grade_record.get_mut("characters").map(Value::take) {
        Some(Value::Null) | None => return Err(DeckSourceError::GradeNotFound(grade.to_string())),
        Some(characters) => characters,
    };
    let records: Vec<CharacterRecord> = serde_json::from_value(characters)?;
    Ok(dedup(records.into_iter().map(CharacterEntry::from).collect()))
}

/// MARK:デッキを読み込む。失敗したらデモデータにフォールバックする
pub fn load_deck(path: &Path, grade: &str) -> Vec<CharacterEntry> {
    match try_load_deck(path, grade) {
        Ok(deck) => {
            info!(grade, count = deck.len(), path = %path.display(), "デッキを読み込みました");
            deck
        }
        Err(err) => {
            warn!(grade, error = %err, "デッキの読み込みに失敗したため演示数据を使います");
            demo_deck()
        }
    }
}

/// 同じ文字は最初の1つだけ残す
fn dedup(entries: Vec<CharacterEntry>) -> Vec<CharacterEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| {
            let first = seen.insert(entry.character.clone());
            if !first {
                warn!(character = %entry.character, "重複した生字を無視します");
            }
            first
        })
        .collect()
}
