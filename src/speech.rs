// ============================================
// src/speech.rs
// 読み上げ (外部TTSコマンドを呼び出す)
// ============================================

use std::io;
use std::process::{Child, Command, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

/// 読み上げの言語タグ
pub const SPEECH_LANG: &str = "zh-CN";
/// 通常の 0.8 倍速
pub const SPEECH_RATE: f32 = 0.8;
/// espeak の標準速度 (語/分)
const BASE_WPM: f32 = 175.0;

pub const DEFAULT_TTS_COMMAND: &str = "espeak-ng -v cmn -s {rate}";

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error("読み上げコマンド「{0}」を利用できません")]
    Unavailable(String),

    #[error("読み上げに失敗しました: {0}")]
    Io(#[from] io::Error),
}

pub trait Speaker {
    /// 発声を開始して、終了は待たずに戻る
    fn speak(&mut self, text: &str, lang: &str) -> Result<(), SpeechError>;
}

/// 何もしない (`--mute` 用)
#[derive(Debug, Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&mut self, _text: &str, _lang: &str) -> Result<(), SpeechError> {
        Ok(())
    }
}

/// 外部コマンドで読み上げる
///
/// 引数の `{lang}` `{rate}` を置換し、最後に読み上げる文字列を付け足す。
/// 前回の発声がまだ続いていれば止めてから次を始める。
#[derive(Debug)]
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
    current: Option<Child>,
}

impl CommandSpeaker {
    /// コマンドラインを空白で分割する。空なら None
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
            current: None,
        })
    }

    fn build_args(&self, text: &str, lang: &str) -> Vec<String> {
        let wpm = (BASE_WPM * SPEECH_RATE).round().to_string();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{lang}", lang).replace("{rate}", &wpm))
            .collect();
        args.push(text.to_string());
        args
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            // すでに終わっていれば kill はエラーになるが問題ない
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str, lang: &str) -> Result<(), SpeechError> {
        self.cancel();
        let args = self.build_args(text, lang);
        debug!(program = %self.program, ?args, "speak");

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                if err.kind() == io::ErrorKind::NotFound {
                    warn!(program = %self.program, "読み上げコマンドが見つかりません");
                    SpeechError::Unavailable(self.program.clone())
                } else {
                    SpeechError::Io(err)
                }
            })?;
        self.current = Some(child);
        Ok(())
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_program_and_args() {
        let speaker = CommandSpeaker::parse("espeak-ng -v {lang} -s {rate}").unwrap();
        assert_eq!(speaker.program, "espeak-ng");
        assert_eq!(
            speaker.build_args("天", SPEECH_LANG),
            vec!["-v", "zh-CN", "-s", "140", "天"]
        );
        assert!(CommandSpeaker::parse("   ").is_none());
    }

    #[test]
    fn missing_program_is_unavailable() {
        let mut speaker = CommandSpeaker::parse("shengzi-no-such-tts-command").unwrap();
        let result = speaker.speak("天", SPEECH_LANG);
        assert!(matches!(result, Err(SpeechError::Unavailable(_))));
    }

    #[test]
    fn silent_speaker_never_fails() {
        assert!(SilentSpeaker.speak("天", SPEECH_LANG).is_ok());
    }
}
