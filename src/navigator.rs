// ============================================
// src/navigator.rs
// デッキ内の現在位置 (前へ / 次へ / ジャンプ)
// ============================================

use crate::characters::CharacterEntry;

/// デッキと現在位置。位置は常に `[0, len-1]` に収まる
#[derive(Debug, Clone)]
pub struct DeckNavigator {
    deck: Vec<CharacterEntry>,
    current_index: usize,
}

impl DeckNavigator {
    pub fn new(deck: Vec<CharacterEntry>) -> Self {
        Self {
            deck,
            current_index: 0,
        }
    }

    pub fn deck(&self) -> &[CharacterEntry] {
        &self.deck
    }

    pub fn len(&self) -> usize {
        self.deck.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deck.is_empty()
    }

    pub fn index(&self) -> usize {
        self.current_index
    }

    /// 空のデッキでは None
    pub fn current(&self) -> Option<&CharacterEntry> {
        self.deck.get(self.current_index)
    }

    pub fn has_next(&self) -> bool {
        self.current_index + 1 < self.deck.len()
    }

    pub fn has_prev(&self) -> bool {
        self.current_index > 0
    }

    /// 末尾では何もしない (先頭へは戻らない)
    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.current_index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.current_index -= 1;
            true
        } else {
            false
        }
    }

    /// 最初に一致した文字へ移動。見つからなければ何もしない
    pub fn jump_to(&mut self, character: &str) -> bool {
        match self.deck.iter().position(|e| e.character == character) {
            Some(index) => {
                self.current_index = index;
                true
            }
            None => false,
        }
    }

    /// 進捗表示用 (1始まりの位置, 総数)
    pub fn position(&self) -> (usize, usize) {
        if self.deck.is_empty() {
            (0, 0)
        } else {
            (self.current_index + 1, self.deck.len())
        }
    }
}
