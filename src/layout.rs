//! レイアウト計算のヘルパー関数

use ratatui::prelude::*;

/// メイン画面の4つの領域
pub struct MainLayout {
    /// 更新間隔ドロップダウンを置くツールバーの領域
    pub toolbar: Rect,
    /// サマリーテーブル + INFO Panelの領域
    pub body: Rect,
    /// HELPバーの領域
    pub help_bar: Rect,
    /// STATUSバーの領域
    pub status_bar: Rect,
}

/// ボディ部の2つの領域（サマリーテーブル + INFO Panel）
pub struct BodyLayout {
    /// サマリーテーブルの領域
    pub summary_table: Rect,
    /// INFO Panelの領域
    pub info_panel: Rect,
}

/// メイン画面を4つの領域に分割（Toolbar + Body + HELP + STATUS）
pub fn create_main_layout(area: Rect) -> MainLayout {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // ツールバー
            Constraint::Min(1),    // Body（サマリーテーブル + INFO Panel）
            Constraint::Length(3), // HELPバー
            Constraint::Length(3), // STATUSバー
        ])
        .split(area);

    MainLayout {
        toolbar: chunks[0],
        body: chunks[1],
        help_bar: chunks[2],
        status_bar: chunks[3],
    }
}

/// Body領域を2つに分割（サマリーテーブル 70% + INFO Panel 30%）
pub fn create_body_layout(area: Rect) -> BodyLayout {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(70), // サマリーテーブル
            Constraint::Percentage(30), // INFO Panel
        ])
        .split(area);

    BodyLayout {
        summary_table: chunks[0],
        info_panel: chunks[1],
    }
}
