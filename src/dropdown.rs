//! TUI内での汎用ドロップダウン（トリガー + ポップアップメニュー）。

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

/// メニュー1行分の表示モデル。
#[derive(Clone, Debug)]
pub struct DropdownRow {
    /// 行の識別子。
    pub id: String,
    /// 表示ラベル。
    pub label: String,
    /// 選択可能な行か（falseは区切り見出し）。
    pub selectable: bool,
}

/// コントロールの有効/無効ステータス。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DropdownStatus {
    /// 通常どおり操作できる。
    #[default]
    Default,
    /// メニューを開けない。
    Disabled,
}

/// ドロップダウン自身が管理する開閉・ハイライト状態。
#[derive(Clone, Debug, Default)]
pub struct DropdownState {
    /// メニューが開いているか。
    pub open: bool,
    /// ハイライト中の行インデックス。
    pub highlighted: usize,
}

impl DropdownState {
    /// メニューを開き、選択中の行へハイライトを合わせる。
    ///
    /// 無効化されたコントロールでは何もしない。
    pub fn open_at(&mut self, rows: &[DropdownRow], selected_id: Option<&str>, status: DropdownStatus) {
        // 無効時は開かせない。
        if status == DropdownStatus::Disabled {
            return;
        }
        self.open = true;
        // 選択中の行があればそこへ、無ければ先頭の選択可能行へ合わせる。
        self.highlighted = rows
            .iter()
            .position(|r| r.selectable && selected_id == Some(r.id.as_str()))
            .or_else(|| rows.iter().position(|r| r.selectable))
            .unwrap_or(0);
    }

    /// メニューを閉じる。
    pub fn close(&mut self) {
        self.open = false;
    }

    /// 次の選択可能行へハイライトを移す（末尾で停止）。
    pub fn highlight_next(&mut self, rows: &[DropdownRow]) {
        // 現在位置より後ろにある最初の選択可能行を探す。
        if let Some(next) = rows
            .iter()
            .enumerate()
            .skip(self.highlighted + 1)
            .find(|(_, r)| r.selectable)
        {
            self.highlighted = next.0;
        }
    }

    /// 前の選択可能行へハイライトを移す（先頭で停止）。
    pub fn highlight_prev(&mut self, rows: &[DropdownRow]) {
        // 現在位置より前にある最後の選択可能行を探す。
        if let Some(prev) = rows
            .iter()
            .enumerate()
            .take(self.highlighted)
            .filter(|(_, r)| r.selectable)
            .next_back()
        {
            self.highlighted = prev.0;
        }
    }

    /// ハイライト中の行が選択可能ならそのインデックスを返す。
    pub fn selectable_highlight(&self, rows: &[DropdownRow]) -> Option<usize> {
        rows.get(self.highlighted)
            .filter(|r| r.selectable)
            .map(|_| self.highlighted)
    }
}

/// トリガーとメニューの描画属性一式。
pub struct Dropdown<'a> {
    /// トリガー左端のアイコン。
    pub icon: &'a str,
    /// トリガーに表示するラベル（Noneで非表示）。
    pub label: Option<&'a str>,
    /// トリガーの幅（セル）。
    pub width: u16,
    /// メニューの幅（セル）。
    pub menu_width: u16,
    /// 有効/無効ステータス。
    pub status: DropdownStatus,
    /// トリガーの基本スタイル。
    pub style: Style,
    /// メニューの行一覧。
    pub rows: &'a [DropdownRow],
    /// 選択中の行id。
    pub selected_id: Option<&'a str>,
}

/// 選択行のハイライトに使うスタイル。
fn highlight_style() -> Style {
    Style::default()
        .bg(Color::Rgb(255, 140, 0)) // オレンジ色の背景
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

/// トリガー（閉じた状態の見た目）を描画し、使用した領域を返す。
pub fn render_trigger(f: &mut Frame, area: Rect, dd: &Dropdown, state: &DropdownState) -> Rect {
    // 指定幅を領域内に収める。
    let trigger_area = Rect {
        width: dd.width.min(area.width),
        ..area
    };

    // 無効時は灰色にし、開閉状態で矢印を切り替える。
    let arrow = if state.open { "▲" } else { "▼" };
    let style = if dd.status == DropdownStatus::Disabled {
        dd.style.fg(Color::DarkGray)
    } else {
        dd.style
    };

    // アイコン + ラベル + 矢印を1行に並べる。
    let mut spans = vec![Span::raw(dd.icon.to_string()), Span::raw(" ")];
    if let Some(label) = dd.label {
        spans.push(Span::raw(label.to_string()));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(arrow, Style::default().fg(Color::DarkGray)));

    let trigger = Paragraph::new(Line::from(spans))
        .style(style)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(trigger, trigger_area);

    trigger_area
}

/// 開いているメニューをトリガー直下のポップアップとして描画する。
pub fn render_menu(f: &mut Frame, trigger_area: Rect, dd: &Dropdown, state: &DropdownState) {
    // 閉じていれば何も描かない。
    if !state.open {
        return;
    }

    let frame_area = f.area();
    // トリガー直下に、行数 + 枠線分の高さを確保する。
    let height = (dd.rows.len() as u16 + 2).min(frame_area.height.saturating_sub(trigger_area.bottom()));
    if height < 3 {
        return;
    }
    let menu_area = Rect {
        x: trigger_area.x,
        y: trigger_area.bottom(),
        width: dd.menu_width.min(frame_area.width.saturating_sub(trigger_area.x)),
        height,
    };

    // 既存の描画を消してメニュー用の背景にする。
    f.render_widget(Clear, menu_area);

    // 行ごとにマーカーとスタイルを組み立てる。
    let lines: Vec<Line> = dd
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            if !row.selectable {
                // 見出し行は選択マーカーを付けず灰色で表示する。
                return Line::styled(row.label.clone(), Style::default().fg(Color::DarkGray));
            }
            // 選択中の行にマーカーを付ける。
            let marker = if dd.selected_id == Some(row.id.as_str()) {
                "●"
            } else {
                "○"
            };
            let mut line = Line::from(format!("{} {}", marker, row.label));
            if i == state.highlighted {
                line = line.style(highlight_style());
            }
            line
        })
        .collect();

    let menu = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::DarkGray)),
    );
    f.render_widget(menu, menu_area);
}
