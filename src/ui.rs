// ============================================
// src/ui.rs
// 画面描画 (Session を読むだけで書き換えない)
// ============================================

use ratatui::{
    prelude::*,
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
};

use crate::pager::ViewMode;
use crate::progress::Status;
use crate::session::Session;

const EMPTY_CHARACTER: &str = "无";
const EMPTY_SENTENCE: &str = "暂无数据";

fn status_color(status: Status) -> Color {
    match status {
        Status::New => Color::Gray,
        Status::Learned => Color::Cyan,
        Status::Review => Color::Yellow,
        Status::Mastered => Color::Green,
    }
}

/// 押せないキーは暗く表示する
fn key_span(label: &'static str, enabled: bool) -> Span<'static> {
    if enabled {
        Span::styled(label, Style::default().fg(Color::White))
    } else {
        Span::styled(label, Style::default().fg(Color::DarkGray))
    }
}

pub fn ui(f: &mut Frame, session: &Session) {
    let size = f.area();
    let title = format!(" {} 生字学习 ", session.grade());
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner_area = block.inner(size);
    f.render_widget(block, size);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // [0] 進捗ゲージ
            Constraint::Length(1), // [1] 空白
            Constraint::Length(1), // [2] 生字
            Constraint::Length(1), // [3] 拼音
            Constraint::Length(1), // [4] 空白
            Constraint::Length(1), // [5] 组词
            Constraint::Length(2), // [6] 例句
            Constraint::Min(2),    // [7] 状態と艾宾浩斯の目安
            Constraint::Length(1), // [8] 統計
            Constraint::Length(1), // [9] フィードバック
            Constraint::Length(1), // [10] キー操作
        ])
        .split(inner_area);

    // 0. 進捗ゲージ (i / n)
    let (position, total) = session.navigator().position();
    let ratio = if total > 0 {
        position as f64 / total as f64
    } else {
        0.0
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta).bg(Color::Black))
        .ratio(ratio)
        .label(format!("{position}/{total}"));
    f.render_widget(gauge, chunks[0]);

    // 1. カード本体
    match session.current() {
        Some(entry) => {
            f.render_widget(
                Paragraph::new(entry.character.as_str())
                    .style(Style::default().fg(Color::White).bold())
                    .centered(),
                chunks[2],
            );
            f.render_widget(
                Paragraph::new(entry.pinyin.as_str())
                    .style(Style::default().fg(Color::Gray))
                    .centered(),
                chunks[3],
            );

            let mut words = Vec::new();
            for (i, word) in entry.word_groups.iter().enumerate() {
                if i > 0 {
                    words.push(Span::raw("  "));
                }
                words.push(Span::styled(
                    format!("[{word}]"),
                    Style::default().fg(Color::LightBlue),
                ));
            }
            f.render_widget(Paragraph::new(Line::from(words)).centered(), chunks[5]);

            f.render_widget(
                Paragraph::new(entry.sentence.as_str())
                    .wrap(Wrap { trim: true })
                    .centered(),
                chunks[6],
            );
        }
        None => {
            f.render_widget(
                Paragraph::new(EMPTY_CHARACTER)
                    .style(Style::default().fg(Color::DarkGray).bold())
                    .centered(),
                chunks[2],
            );
            f.render_widget(Paragraph::new(EMPTY_SENTENCE).centered(), chunks[6]);
        }
    }

    // 2. 状態と目安
    if let (Some(status), Some(hint)) = (session.current_status(), session.hint()) {
        let lines = vec![
            Line::from(Span::styled(
                format!("【{}】", status.label()),
                Style::default().fg(status_color(status)).bold(),
            )),
            Line::from(hint).style(Style::default().fg(Color::Gray)),
        ];
        f.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: true }).centered(),
            chunks[7],
        );
    }

    // 3. 統計
    let stats = session.stats();
    let stats_text = format!(
        "总数: {}  已学习: {}  需复习: {}  已掌握: {}",
        stats.total, stats.learned, stats.review, stats.mastered
    );
    f.render_widget(
        Paragraph::new(stats_text)
            .style(Style::default().fg(Color::Yellow))
            .centered(),
        chunks[8],
    );

    // 4. フィードバック
    if let Some(notice) = session.notice() {
        f.render_widget(
            Paragraph::new(notice)
                .style(Style::default().fg(Color::LightGreen))
                .centered(),
            chunks[9],
        );
    }

    // 5. キー操作
    let nav = session.navigator();
    let has_card = !nav.is_empty();
    let help = Line::from(vec![
        key_span("←上一个", nav.has_prev()),
        Span::raw("  "),
        key_span("→下一个", nav.has_next()),
        Span::raw("  "),
        key_span("[空格]朗读", has_card),
        Span::raw("  "),
        key_span("[r]需复习", has_card),
        Span::raw("  "),
        key_span("[m]已掌握", has_card),
        Span::raw("  "),
        key_span("[v]复习列表 [g]掌握列表 [q]退出", true),
    ]);
    f.render_widget(Paragraph::new(help).centered(), chunks[10]);

    if let ViewMode::Open { source, .. } = session.viewer_mode() {
        render_list(f, session, source.title(), size);
    }
}

/// 要復習 / 習得済み一覧のポップアップ
fn render_list(f: &mut Frame, session: &Session, title: &str, area: Rect) {
    let popup = popup_area(area, 40, 10);
    let (page, pages) = session.page_info().unwrap_or((0, 0));
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {title} ({page}/{pages}) "))
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(popup);
    f.render_widget(Clear, popup);
    f.render_widget(block, popup);

    let items = session.visible_page();
    let mut lines: Vec<Line> = if items.is_empty() {
        vec![Line::from("暂无数据").style(Style::default().fg(Color::DarkGray))]
    } else {
        items
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                Line::from(vec![
                    Span::styled(format!("{}. ", i + 1), Style::default().fg(Color::DarkGray)),
                    Span::styled(entry.character.as_str(), Style::default().bold()),
                    Span::raw("  "),
                    Span::styled(entry.pinyin.as_str(), Style::default().fg(Color::Gray)),
                ])
            })
            .collect()
    };

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        key_span("←上一页", session.has_prev_page()),
        Span::raw("  "),
        key_span("→下一页", session.has_next_page()),
        Span::raw("  "),
        key_span("[1-4]选择 [Esc]关闭", true),
    ]));

    f.render_widget(Paragraph::new(lines), inner);
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(
        area.x + (area.width - w) / 2,
        area.y + (area.height - h) / 2,
        w,
        h,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::characters::demo_deck;
    use crate::pager::ListSource;
    use crate::speech::SilentSpeaker;
    use crate::store::MemoryStore;
    use ratatui::backend::TestBackend;

    fn render(session: &Session) -> String {
        let backend = TestBackend::new(80, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(f, session)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn session_with(deck: Vec<crate::characters::CharacterEntry>) -> Session {
        Session::new(
            "一年级上册".to_string(),
            deck,
            Box::new(MemoryStore::default()),
            Box::new(SilentSpeaker),
        )
    }

    #[test]
    fn draws_current_card_and_stats() {
        let screen = render(&session_with(demo_deck()));
        assert!(screen.contains("tiān"));
        assert!(screen.contains("1/5"));
    }

    #[test]
    fn draws_empty_deck_state() {
        let screen = render(&session_with(Vec::new()));
        assert!(screen.contains("0/0"));
        assert!(!screen.contains("tiān"));
    }

    #[test]
    fn draws_list_popup_when_open() {
        let mut session = session_with(demo_deck());
        session.mark_review();
        session.open_viewer(ListSource::Review);
        let screen = render(&session);
        assert!(screen.contains("(1/1)"));
        assert!(screen.contains("1. "));
    }

    #[test]
    fn popup_fits_small_area() {
        let area = Rect::new(0, 0, 20, 5);
        assert_eq!(popup_area(area, 40, 10), area);
    }
}
