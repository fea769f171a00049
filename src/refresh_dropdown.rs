//! 自動更新間隔を選ぶドロップダウンと手動更新ボタン。

use crossterm::event::KeyEvent;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use crate::autorefresh::{AutoRefreshState, OptionKind, RefreshCatalog};
use crate::dropdown::{
    Dropdown, DropdownRow, DropdownState, DropdownStatus, render_menu, render_trigger,
};
use crate::shortcuts::{DropdownShortcuts, matches_shortcut};

/// 停止中トリガーの幅（セル）。アイコンのみの縮小表示。
pub const DROPDOWN_WIDTH_COLLAPSED: u16 = 50;
/// 稼働中トリガーの幅（セル）。選択中ラベルの分だけ広い。
pub const DROPDOWN_WIDTH_FULL: u16 = 84;
/// 手動更新ボタンの幅（セル）。
const MANUAL_BUTTON_WIDTH: u16 = 5;

/// 停止中に表示するアイコン。
const ICON_PAUSE: &str = "⏸";
/// 稼働中に表示するアイコン。
const ICON_REFRESH: &str = "⟳";

/// トリガーの表示モード。更新状態だけから決まる。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisualMode {
    /// 稼働中の表示（ラベル付き・全幅）。
    Expanded,
    /// 停止中の表示（アイコンのみ・縮小幅）。
    Collapsed,
}

impl VisualMode {
    /// 更新状態から表示モードを決める。
    pub fn for_state(state: &AutoRefreshState) -> Self {
        if state.is_paused() {
            Self::Collapsed
        } else {
            Self::Expanded
        }
    }

    /// トリガー左端のアイコン。
    pub fn icon(self) -> &'static str {
        match self {
            Self::Expanded => ICON_REFRESH,
            Self::Collapsed => ICON_PAUSE,
        }
    }

    /// トリガーの幅（セル）。
    pub fn trigger_width(self) -> u16 {
        match self {
            Self::Expanded => DROPDOWN_WIDTH_FULL,
            Self::Collapsed => DROPDOWN_WIDTH_COLLAPSED,
        }
    }

    /// 選択中ラベルをトリガーに載せるか。
    pub fn label_visible(self) -> bool {
        matches!(self, Self::Expanded)
    }

    /// トリガーの基本スタイル。停止中は薄く表示する。
    pub fn style(self) -> Style {
        match self {
            Self::Expanded => Style::default(),
            Self::Collapsed => Style::default().add_modifier(Modifier::DIM),
        }
    }
}

/// 操作の結果として親へ返すイベント。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoRefreshEvent {
    /// 新しい更新間隔が選ばれた（ミリ秒、0は一時停止）。
    Choose(u64),
    /// 手動更新が要求された。
    ManualRefresh,
}

/// 自動更新間隔ドロップダウン本体。
///
/// 描画のたびに現在の更新状態とカタログから組み立て直す。
pub struct AutoRefreshDropdown<'a> {
    /// 現在の更新状態。
    selected: AutoRefreshState,
    /// 間隔選択肢のカタログ。
    catalog: &'a RefreshCatalog,
    /// 停止中に手動更新ボタンを出すか。
    show_manual_refresh: bool,
}

impl<'a> AutoRefreshDropdown<'a> {
    /// コンポーネントを組み立てる。手動更新ボタンは既定で表示する。
    pub fn new(selected: AutoRefreshState, catalog: &'a RefreshCatalog) -> Self {
        Self {
            selected,
            catalog,
            show_manual_refresh: true,
        }
    }

    /// 手動更新ボタンの表示可否を切り替える。
    pub fn show_manual_refresh(mut self, show: bool) -> Self {
        self.show_manual_refresh = show;
        self
    }

    /// 自動更新そのものが無効化されているか。
    pub fn is_disabled(&self) -> bool {
        self.selected.is_disabled()
    }

    /// 自動更新が止まっているか（無効化も含む）。
    pub fn is_paused(&self) -> bool {
        self.selected.is_paused()
    }

    /// 表示モード。
    pub fn visual_mode(&self) -> VisualMode {
        VisualMode::for_state(&self.selected)
    }

    /// ドロップダウンへ渡す有効/無効ステータス。
    pub fn status(&self) -> DropdownStatus {
        if self.is_disabled() {
            DropdownStatus::Disabled
        } else {
            DropdownStatus::Default
        }
    }

    /// 選択中の選択肢id。
    pub fn selected_id(&self) -> Option<&str> {
        self.catalog.selected_id(&self.selected)
    }

    /// 手動更新ボタンを表示するか。
    pub fn manual_refresh_visible(&self) -> bool {
        self.show_manual_refresh && self.is_paused()
    }

    /// カタログの選択肢をメニュー行へ写像する。
    fn rows(&self) -> Vec<DropdownRow> {
        self.catalog
            .options
            .iter()
            .map(|option| DropdownRow {
                id: option.id.clone(),
                label: option.label.clone(),
                selectable: !option.is_header(),
            })
            .collect()
    }

    /// メニューを開き、選択中の行へハイライトを合わせる。無効時は何も起きない。
    pub fn open_menu(&self, state: &mut DropdownState) {
        state.open_at(&self.rows(), self.selected_id(), self.status());
    }

    /// メニューが開いている間のキー入力を処理する。
    ///
    /// 間隔を確定したときだけ Choose を返し、その場でメニューを閉じる。
    pub fn handle_menu_key(
        &self,
        state: &mut DropdownState,
        key: &KeyEvent,
        sc: &DropdownShortcuts,
    ) -> Option<AutoRefreshEvent> {
        if !state.open {
            return None;
        }
        let rows = self.rows();
        if matches_shortcut(key, &sc.close) {
            // 何も確定せずに閉じる。
            state.close();
        } else if matches_shortcut(key, &sc.down) {
            state.highlight_next(&rows);
        } else if matches_shortcut(key, &sc.up) {
            state.highlight_prev(&rows);
        } else if matches_shortcut(key, &sc.select) {
            // 見出し行の上では確定しない。
            if let Some(idx) = state.selectable_highlight(&rows)
                && let Some(option) = self.catalog.options.get(idx)
                && let OptionKind::Interval(ms) = option.kind()
            {
                state.close();
                return Some(AutoRefreshEvent::Choose(ms));
            }
        }
        None
    }

    /// 手動更新の要求。ボタンが表示されていないときはNone。
    pub fn manual_refresh(&self) -> Option<AutoRefreshEvent> {
        self.manual_refresh_visible()
            .then_some(AutoRefreshEvent::ManualRefresh)
    }

    /// ツールバー領域へトリガー・手動更新ボタン・メニューを描画する。
    pub fn render(&self, f: &mut Frame, area: Rect, state: &DropdownState) {
        let mode = self.visual_mode();
        // 稼働中は選択中ラベルをトリガーに添える。
        let selected = self.catalog.selected_option(&self.selected);
        let label = if mode.label_visible() {
            selected.map(|option| option.label.as_str())
        } else {
            None
        };
        let rows = self.rows();
        let dd = Dropdown {
            icon: mode.icon(),
            label,
            width: mode.trigger_width(),
            // メニューはトリガーの縮小中でも全幅で開く。
            menu_width: DROPDOWN_WIDTH_FULL,
            status: self.status(),
            style: mode.style(),
            rows: &rows,
            selected_id: self.selected_id(),
        };
        let trigger_area = render_trigger(f, area, &dd, state);

        // 停止中だけ手動更新ボタンを添える。
        if self.manual_refresh_visible() {
            render_manual_button(f, area, trigger_area);
        }

        render_menu(f, trigger_area, &dd, state);
    }
}

/// トリガーの右隣に手動更新ボタンを描画する。
fn render_manual_button(f: &mut Frame, area: Rect, trigger_area: Rect) {
    let x = trigger_area.right().saturating_add(1);
    // はみ出す場合は描画を諦める。
    if x.saturating_add(MANUAL_BUTTON_WIDTH) > area.right() {
        return;
    }
    let button_area = Rect {
        x,
        y: area.y,
        width: MANUAL_BUTTON_WIDTH,
        height: area.height.min(3),
    };
    let button = Paragraph::new(Line::from(format!(" {}", ICON_REFRESH)))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(button, button_area);
}
