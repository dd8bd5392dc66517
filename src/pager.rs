// ============================================
// src/pager.rs
// 要復習 / 習得済み一覧のページ送り
// ============================================

/// 1ページに並べる枚数
pub const PAGE_SIZE: usize = 4;

/// ceil(len / page_size)。空なら 0
pub fn page_count<T>(items: &[T], page_size: usize) -> usize {
    items.len().div_ceil(page_size)
}

/// `page_index` は呼び出し側で `[0, page_count-1]` に収めておくこと
pub fn page<T>(items: &[T], page_index: usize, page_size: usize) -> &[T] {
    let start = page_index * page_size;
    let end = ((page_index + 1) * page_size).min(items.len());
    &items[start..end]
}

/// 一覧の元になる集合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    Review,
    Mastered,
}

impl ListSource {
    pub fn title(self) -> &'static str {
        match self {
            ListSource::Review => "需要复习的生字",
            ListSource::Mastered => "已掌握的生字",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Closed,
    Open { source: ListSource, page: usize },
}

/// 一覧表示の状態機械
///
/// `Closed -> Open(s, 0)`、ページ送りは端で止まる。開き直すと常に 0 ページ目から。
#[derive(Debug, Clone)]
pub struct PagedViewer {
    mode: ViewMode,
    page_size: usize,
}

impl Default for PagedViewer {
    fn default() -> Self {
        Self {
            mode: ViewMode::Closed,
            page_size: PAGE_SIZE,
        }
    }
}

impl PagedViewer {
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_open(&self) -> bool {
        matches!(self.mode, ViewMode::Open { .. })
    }

    pub fn open(&mut self, source: ListSource) {
        self.mode = ViewMode::Open { source, page: 0 };
    }

    pub fn close(&mut self) {
        self.mode = ViewMode::Closed;
    }

    /// `total` は一覧の件数
    pub fn next_page(&mut self, total: usize) -> bool {
        let pages = total.div_ceil(self.page_size);
        if let ViewMode::Open { page, .. } = &mut self.mode {
            if *page + 1 < pages {
                *page += 1;
                return true;
            }
        }
        false
    }

    pub fn prev_page(&mut self) -> bool {
        if let ViewMode::Open { page, .. } = &mut self.mode {
            if *page > 0 {
                *page -= 1;
                return true;
            }
        }
        false
    }

    /// 件数が減ったときにページ位置を範囲内へ戻す
    pub fn clamp(&mut self, total: usize) {
        let last = total.div_ceil(self.page_size).saturating_sub(1);
        if let ViewMode::Open { page, .. } = &mut self.mode {
            *page = (*page).min(last);
        }
    }

    /// 現在ページの中身
    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        match self.mode {
            ViewMode::Closed => &[],
            ViewMode::Open { page: index, .. } => {
                let last = page_count(items, self.page_size).saturating_sub(1);
                page(items, index.min(last), self.page_size)
            }
        }
    }

    pub fn has_next_page(&self, total: usize) -> bool {
        match self.mode {
            ViewMode::Open { page, .. } => page + 1 < total.div_ceil(self.page_size),
            ViewMode::Closed => false,
        }
    }

    pub fn has_prev_page(&self) -> bool {
        matches!(self.mode, ViewMode::Open { page, .. } if page > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_arithmetic() {
        let empty: [u32; 0] = [];
        let nine: Vec<u32> = (0..9).collect();
        assert_eq!(page_count(&empty, 4), 0);
        assert_eq!(page_count(&nine, 4), 3);
        assert_eq!(page(&nine, 0, 4), &[0, 1, 2, 3]);
        assert_eq!(page(&nine, 1, 4), &[4, 5, 6, 7]);
        assert_eq!(page(&nine, 2, 4), &[8]);
        assert_eq!(page_count(&nine[..8], 4), 2);
    }

    #[test]
    fn open_close_transitions() {
        let mut viewer = PagedViewer::default();
        assert_eq!(viewer.mode(), ViewMode::Closed);

        viewer.open(ListSource::Review);
        assert_eq!(
            viewer.mode(),
            ViewMode::Open {
                source: ListSource::Review,
                page: 0
            }
        );

        viewer.next_page(9);
        viewer.open(ListSource::Mastered);
        assert_eq!(
            viewer.mode(),
            ViewMode::Open {
                source: ListSource::Mastered,
                page: 0
            }
        );

        viewer.close();
        assert!(!viewer.is_open());
    }

    #[test]
    fn paging_is_clamped_without_wraparound() {
        let mut viewer = PagedViewer::default();
        viewer.open(ListSource::Review);
        assert!(!viewer.prev_page());
        assert!(viewer.next_page(9));
        assert!(viewer.next_page(9));
        assert!(!viewer.next_page(9));
        assert!(!viewer.has_next_page(9));
        assert_eq!(
            viewer.mode(),
            ViewMode::Open {
                source: ListSource::Review,
                page: 2
            }
        );
        assert!(viewer.prev_page());
        assert!(viewer.has_prev_page());
    }

    #[test]
    fn paging_while_closed_does_nothing() {
        let mut viewer = PagedViewer::default();
        assert!(!viewer.next_page(9));
        assert!(!viewer.prev_page());
        assert_eq!(viewer.visible(&[1, 2, 3]), &[] as &[i32]);
    }

    #[test]
    fn clamp_after_list_shrinks() {
        let mut viewer = PagedViewer::default();
        viewer.open(ListSource::Review);
        viewer.next_page(5);
        viewer.clamp(4);
        assert_eq!(
            viewer.mode(),
            ViewMode::Open {
                source: ListSource::Review,
                page: 0
            }
        );
        viewer.clamp(0);
        assert!(viewer.is_open());
    }

    #[test]
    fn five_items_make_two_pages() {
        let items = ["天", "地", "人", "你", "我"];
        let mut viewer = PagedViewer::default();
        viewer.open(ListSource::Review);
        assert_eq!(page_count(&items, viewer.page_size()), 2);
        assert_eq!(viewer.visible(&items).len(), 4);
        viewer.next_page(items.len());
        assert_eq!(viewer.visible(&items), &["我"]);
    }
}
