// ============================================
// src/session.rs
// 学習セッション全体の状態 (デッキ位置・進度・一覧表示)
// ============================================

use tracing::{debug, info, warn};

use crate::characters::{CharacterEntry, load_deck};
use crate::config::Config;
use crate::navigator::DeckNavigator;
use crate::pager::{ListSource, PagedViewer, ViewMode, page_count};
use crate::progress::{ProgressTracker, Status};
use crate::speech::{SPEECH_LANG, Speaker, SpeechError};
use crate::store::KeyValueStore;

/// 画面下部の統計
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub learned: usize,
    pub review: usize,
    pub mastered: usize,
}

/// 艾宾浩斯の目安 (固定文言。スケジューラではない)
pub fn hint_for(status: Status) -> &'static str {
    match status {
        Status::Mastered => {
            "恭喜！这个生字您已经标记为完全掌握。根据艾宾浩斯记忆法，建议31天后进行一次最终复习以巩固长期记忆。"
        }
        Status::Review => {
            "这个生字您标记为需要复习。根据艾宾浩斯记忆法，建议在1小时后、9小时后和1天后分别进行复习。"
        }
        Status::Learned => {
            "这个生字您已经学习过。根据艾宾浩斯记忆法，建议在20分钟后进行一次复习以巩固记忆。"
        }
        Status::New => {
            "这是您第一次学习这个生字。根据艾宾浩斯记忆法，请在20分钟后复习一次，然后按照计划进行后续复习。"
        }
    }
}

/// 1つの学年についての学習セッション
///
/// デッキ位置・進度・一覧表示をそれぞれ1つずつ所有する。画面描画はここを読むだけ。
pub struct Session {
    grade: String,
    navigator: DeckNavigator,
    tracker: ProgressTracker,
    viewer: PagedViewer,
    speaker: Box<dyn Speaker>,
    /// 直前の操作へのフィードバック (次の操作で消える)
    notice: Option<String>,
}

impl Session {
    /// MARK:設定から学年を決め、デッキと進度を読み込む
    pub fn start(config: &Config, store: Box<dyn KeyValueStore>, speaker: Box<dyn Speaker>) -> Self {
        let grade = config.resolve_grade(store.as_ref());
        let deck = load_deck(&config.data_file, &grade);
        Self::new(grade, deck, store, speaker)
    }

    pub fn new(
        grade: String,
        deck: Vec<CharacterEntry>,
        store: Box<dyn KeyValueStore>,
        speaker: Box<dyn Speaker>,
    ) -> Self {
        let tracker = ProgressTracker::open(store, &grade);
        let counts = tracker.counts();
        info!(
            %grade,
            total = deck.len(),
            learned = counts.learned,
            review = counts.review,
            mastered = counts.mastered,
            "セッション開始"
        );
        Self {
            grade,
            navigator: DeckNavigator::new(deck),
            tracker,
            viewer: PagedViewer::default(),
            speaker,
            notice: None,
        }
    }

    // --------------------------------------------------
    // 読み取り
    // --------------------------------------------------

    pub fn grade(&self) -> &str {
        &self.grade
    }

    pub fn navigator(&self) -> &DeckNavigator {
        &self.navigator
    }

    pub fn current(&self) -> Option<&CharacterEntry> {
        self.navigator.current()
    }

    pub fn status_of(&self, character: &str) -> Status {
        self.tracker.status_of(character)
    }

    pub fn current_status(&self) -> Option<Status> {
        self.current().map(|entry| self.status_of(&entry.character))
    }

    pub fn hint(&self) -> Option<&'static str> {
        self.current_status().map(hint_for)
    }

    pub fn stats(&self) -> Stats {
        let counts = self.tracker.counts();
        Stats {
            total: self.navigator.len(),
            learned: counts.learned,
            review: counts.review,
            mastered: counts.mastered,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn viewer_mode(&self) -> ViewMode {
        self.viewer.mode()
    }

    pub fn viewer_open(&self) -> bool {
        self.viewer.is_open()
    }

    /// 一覧に並ぶ生字 (デッキ順)
    pub fn list(&self, source: ListSource) -> Vec<&CharacterEntry> {
        let state = self.tracker.state();
        let set = match source {
            ListSource::Review => &state.review,
            ListSource::Mastered => &state.mastered,
        };
        self.navigator
            .deck()
            .iter()
            .filter(|entry| set.contains(&entry.character))
            .collect()
    }

    /// 開いている一覧の現在ページ
    pub fn visible_page(&self) -> Vec<&CharacterEntry> {
        match self.viewer.mode() {
            ViewMode::Closed => Vec::new(),
            ViewMode::Open { source, .. } => {
                let items = self.list(source);
                self.viewer.visible(&items).to_vec()
            }
        }
    }

    /// (1始まりのページ番号, ページ数)。閉じていれば None
    pub fn page_info(&self) -> Option<(usize, usize)> {
        match self.viewer.mode() {
            ViewMode::Closed => None,
            ViewMode::Open { source, page } => {
                let pages = page_count(&self.list(source), self.viewer.page_size());
                Some(((page + 1).min(pages), pages))
            }
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.open_list_len()
            .is_some_and(|total| self.viewer.has_next_page(total))
    }

    pub fn has_prev_page(&self) -> bool {
        self.viewer.has_prev_page()
    }

    fn open_list_len(&self) -> Option<usize> {
        match self.viewer.mode() {
            ViewMode::Closed => None,
            ViewMode::Open { source, .. } => Some(self.list(source).len()),
        }
    }

    // --------------------------------------------------
    // 操作
    // --------------------------------------------------

    pub fn next(&mut self) {
        self.notice = None;
        if self.navigator.next() {
            debug!(index = self.navigator.index(), "next");
        }
    }

    pub fn prev(&mut self) {
        self.notice = None;
        if self.navigator.prev() {
            debug!(index = self.navigator.index(), "prev");
        }
    }

    /// 読み上げて、まだなら学習済みにする (発声の完了は待たない)
    pub fn speak_current(&mut self) {
        self.notice = None;
        let Some(character) = self.current().map(|entry| entry.character.clone()) else {
            return;
        };
        match self.speaker.speak(&character, SPEECH_LANG) {
            Ok(()) => {}
            Err(SpeechError::Unavailable(program)) => {
                self.notice = Some(format!(
                    "当前环境不支持语音朗读功能（找不到「{program}」），可用 --tts 指定朗读命令。"
                ));
            }
            Err(err) => {
                warn!(error = %err, "読み上げに失敗しました");
                self.notice = Some("语音朗读失败。".to_string());
            }
        }
        self.tracker.mark_learned(&character);
    }

    pub fn mark_review(&mut self) {
        let Some(character) = self.current().map(|entry| entry.character.clone()) else {
            return;
        };
        self.tracker.mark_for_review(&character);
        self.clamp_viewer();
        self.notice = Some(format!(
            "已将\"{character}\"标记为需要复习。系统会根据艾宾浩斯记忆法提醒您复习。"
        ));
    }

    pub fn mark_mastered(&mut self) {
        let Some(character) = self.current().map(|entry| entry.character.clone()) else {
            return;
        };
        self.tracker.mark_mastered(&character);
        self.clamp_viewer();
        self.notice = Some(format!("恭喜！已将\"{character}\"标记为已掌握。"));
    }

    pub fn open_viewer(&mut self, source: ListSource) {
        self.notice = None;
        self.viewer.open(source);
    }

    pub fn close_viewer(&mut self) {
        self.viewer.close();
    }

    pub fn next_page(&mut self) {
        if let Some(total) = self.open_list_len() {
            self.viewer.next_page(total);
        }
    }

    pub fn prev_page(&mut self) {
        self.viewer.prev_page();
    }

    /// 現在ページの `slot` 番目 (0始まり) を開いて一覧を閉じる
    pub fn select_on_page(&mut self, slot: usize) {
        let Some(character) = self
            .visible_page()
            .get(slot)
            .map(|entry| entry.character.clone())
        else {
            return;
        };
        self.navigator.jump_to(&character);
        self.viewer.close();
        self.notice = None;
        debug!(%character, index = self.navigator.index(), "一覧から選択");
    }

    fn clamp_viewer(&mut self) {
        if let Some(total) = self.open_list_len() {
            self.viewer.clamp(total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characters::demo_deck;
    use crate::progress;
    use crate::store::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// 呼ばれた文字を記録するだけ
    #[derive(Default, Clone)]
    struct RecordingSpeaker {
        spoken: Rc<RefCell<Vec<(String, String)>>>,
    }

    impl Speaker for RecordingSpeaker {
        fn speak(&mut self, text: &str, lang: &str) -> Result<(), SpeechError> {
            self.spoken.borrow_mut().push((text.to_string(), lang.to_string()));
            Ok(())
        }
    }

    struct MissingSpeaker;

    impl Speaker for MissingSpeaker {
        fn speak(&mut self, _text: &str, _lang: &str) -> Result<(), SpeechError> {
            Err(SpeechError::Unavailable("espeak-ng".to_string()))
        }
    }

    fn demo_session() -> Session {
        Session::new(
            "一年级上册".to_string(),
            demo_deck(),
            Box::new(MemoryStore::default()),
            Box::new(RecordingSpeaker::default()),
        )
    }

    fn go_to(session: &mut Session, character: &str) {
        session.navigator.jump_to(character);
        assert_eq!(session.current().unwrap().character, character);
    }

    #[test]
    fn mastering_tian() {
        let mut session = demo_session();
        go_to(&mut session, "天");
        session.mark_mastered();

        assert_eq!(session.status_of("天"), Status::Mastered);
        let state = session.tracker.state();
        assert!(state.learned.contains("天"));
        assert!(!state.review.contains("天"));
        assert_eq!(session.notice(), Some("恭喜！已将\"天\"标记为已掌握。"));
    }

    #[test]
    fn review_then_master_di() {
        let mut session = demo_session();
        go_to(&mut session, "地");
        session.mark_review();
        assert_eq!(session.status_of("地"), Status::Review);
        session.mark_mastered();

        let state = session.tracker.state();
        assert!(state.mastered.contains("地"));
        assert!(!state.review.contains("地"));
    }

    #[test]
    fn review_list_of_five_spans_two_pages() {
        let mut session = demo_session();
        for _ in 0..5 {
            session.mark_review();
            session.next();
        }
        assert_eq!(session.stats().review, 5);

        session.open_viewer(ListSource::Review);
        assert_eq!(session.visible_page().len(), 4);
        assert_eq!(session.page_info(), Some((1, 2)));
        assert!(session.has_next_page());

        session.next_page();
        let page: Vec<&str> = session
            .visible_page()
            .iter()
            .map(|e| e.character.as_str())
            .collect();
        assert_eq!(page, vec!["我"]);
        assert_eq!(session.page_info(), Some((2, 2)));

        session.next_page();
        assert_eq!(session.page_info(), Some((2, 2)));
    }

    #[test]
    fn speaking_marks_learned_and_persists() {
        let speaker = RecordingSpeaker::default();
        let spoken = speaker.spoken.clone();
        let mut session = Session::new(
            "一年级上册".to_string(),
            demo_deck(),
            Box::new(MemoryStore::default()),
            Box::new(speaker),
        );
        session.next();
        session.speak_current();

        assert_eq!(
            spoken.borrow().as_slice(),
            &[("地".to_string(), "zh-CN".to_string())]
        );
        assert_eq!(session.current_status(), Some(Status::Learned));
        let stored = progress::load(session.tracker.store(), "一年级上册");
        assert!(stored.learned.contains("地"));
    }

    #[test]
    fn missing_speech_shows_notice_and_still_marks_learned() {
        let mut session = Session::new(
            "一年级上册".to_string(),
            demo_deck(),
            Box::new(MemoryStore::default()),
            Box::new(MissingSpeaker),
        );
        session.speak_current();
        assert!(session.notice().unwrap().contains("espeak-ng"));
        assert_eq!(session.current_status(), Some(Status::Learned));

        session.next();
        assert_eq!(session.notice(), None);
    }

    #[test]
    fn hint_follows_status() {
        let mut session = demo_session();
        assert_eq!(session.hint(), Some(hint_for(Status::New)));
        session.mark_review();
        assert_eq!(session.hint(), Some(hint_for(Status::Review)));
        session.mark_mastered();
        assert_eq!(session.hint(), Some(hint_for(Status::Mastered)));
    }

    #[test]
    fn selecting_from_list_jumps_and_closes() {
        let mut session = demo_session();
        go_to(&mut session, "你");
        session.mark_mastered();
        go_to(&mut session, "天");

        session.open_viewer(ListSource::Mastered);
        session.select_on_page(0);
        assert_eq!(session.current().unwrap().character, "你");
        assert_eq!(session.viewer_mode(), ViewMode::Closed);
    }

    #[test]
    fn selecting_an_empty_slot_does_nothing() {
        let mut session = demo_session();
        session.open_viewer(ListSource::Review);
        session.select_on_page(2);
        assert!(matches!(session.viewer_mode(), ViewMode::Open { .. }));
        assert_eq!(session.navigator().index(), 0);
    }

    #[test]
    fn shrinking_list_pulls_page_back() {
        let mut session = demo_session();
        for _ in 0..5 {
            session.mark_mastered();
            session.next();
        }
        session.open_viewer(ListSource::Mastered);
        session.next_page();
        assert_eq!(session.page_info(), Some((2, 2)));

        // 最後の1枚を要復習に戻すと 1 ページに減る
        session.mark_review();
        assert_eq!(session.page_info(), Some((1, 1)));
        assert_eq!(session.visible_page().len(), 4);
    }

    #[test]
    fn empty_deck_actions_are_noops() {
        let mut session = Session::new(
            "一年级上册".to_string(),
            Vec::new(),
            Box::new(MemoryStore::default()),
            Box::new(RecordingSpeaker::default()),
        );
        session.speak_current();
        session.mark_review();
        session.mark_mastered();
        session.next();
        session.prev();
        assert!(session.current().is_none());
        assert_eq!(session.hint(), None);
        assert_eq!(
            session.stats(),
            Stats {
                total: 0,
                learned: 0,
                review: 0,
                mastered: 0
            }
        );
    }

    #[test]
    fn progress_is_restored_for_the_same_grade() {
        let mut store = MemoryStore::default();
        let mut state = progress::ProgressState::default();
        state.mark_mastered("人");
        progress::save(&mut store, &state, "一年级上册");

        let session = Session::new(
            "一年级上册".to_string(),
            demo_deck(),
            Box::new(store),
            Box::new(RecordingSpeaker::default()),
        );
        assert_eq!(session.status_of("人"), Status::Mastered);
        assert_eq!(session.stats().learned, 1);
    }

    #[test]
    fn start_uses_stored_grade_and_falls_back_to_demo_deck() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MemoryStore::default();
        crate::config::save_selected_grade(&mut store, "二年级上册").unwrap();
        let config = Config {
            data_file: dir.path().join("missing.json"),
            ..Config::default()
        };

        let session = Session::start(&config, Box::new(store), Box::new(RecordingSpeaker::default()));
        assert_eq!(session.grade(), "二年级上册");
        assert_eq!(session.stats().total, 5);
    }
}
