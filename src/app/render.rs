//! TUI描画関連の関数。

use ratatui::{
    Frame,
    prelude::*,
    widgets::{Block, Borders, Paragraph, Row, Table, Wrap},
};

use crate::{
    autorefresh::AutoRefreshState,
    events::Screen,
    input, layout,
    refresh_dropdown::AutoRefreshDropdown,
    report::{self, TracingFaultReporter},
    shortcuts::Shortcuts,
    snapshot::SystemSnapshot,
};

use super::App;

/// 画面全体のレイアウトを描画する。
pub fn draw(f: &mut Frame, app: &App) {
    // メインレイアウト（ツールバー + Body + HELP + STATUS）を作る。
    let main_layout = layout::create_main_layout(f.area());
    let body_layout = layout::create_body_layout(main_layout.body);

    // サマリー行からテーブル行を組み立てる。
    let summary = app.snapshot.summary_rows();
    let rows = summary
        .iter()
        .map(|(label, value)| Row::new(vec![label.clone(), value.clone()]));

    // サマリーテーブルのウィジェットを構築する。
    let table = Table::new(rows, [Constraint::Length(12), Constraint::Min(10)])
        .block(Block::default().borders(Borders::ALL).title("SYSTEM"))
        .header(Row::new(vec!["item", "value"]).bold())
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(255, 140, 0)) // オレンジ色の背景
                .fg(Color::Black) // 黒文字
                .add_modifier(Modifier::BOLD),
        );

    // 選択中の行をハイライトする。
    let mut table_state = ratatui::widgets::TableState::default();
    if !summary.is_empty() {
        table_state.select(Some(app.ui.selected));
    }
    // テーブルを描画する。
    f.render_stateful_widget(table, body_layout.summary_table, &mut table_state);

    // 選択中の行の情報（またはプレースホルダ）を用意する。
    let (sel_label, sel_value) = summary
        .get(app.ui.selected)
        .map(|(label, value)| (label.clone(), value.clone()))
        .unwrap_or_else(|| ("-".into(), "-".into()));

    // INFOパネル（選択行・設定・上位プロセス・ログ）を描画する。
    let info_text = build_main_info_text(app, &sel_label, &sel_value);
    let info_panel = Paragraph::new(info_text)
        .block(Block::default().borders(Borders::ALL).title("INFO"))
        .wrap(Wrap { trim: true });
    f.render_widget(info_panel, body_layout.info_panel);

    // HELPバー（状況ごとのショートカット）を描画する。
    let help_text = if app.dropdown.open {
        menu_help_text(&app.shortcuts)
    } else {
        get_help_text(&app.ui.screen, &app.shortcuts)
    };
    let help_bar = Paragraph::new(help_text)
        .block(Block::default().borders(Borders::ALL).title("HELP"))
        .wrap(Wrap { trim: true });
    f.render_widget(help_bar, main_layout.help_bar);

    // STATUSバー（画面名・自動更新状態・エラー）を描画する。
    let status_bar = build_status_bar(app);
    f.render_widget(status_bar, main_layout.status_bar);

    // ツールバーは最後に描き、開いたメニューを本文の上へ重ねる。
    // 落ちた場合は報告してから巻き戻す。
    report::guard(&TracingFaultReporter, "toolbar", || {
        draw_toolbar(f, app, main_layout.toolbar);
    });

    // 入力ボックスが開いていれば重ねて描画する。
    if let Some(input_state) = &app.input_box {
        input::render_input_box(f, input_state);
    }
}

/// ツールバーの自動更新ドロップダウンを描画する。
fn draw_toolbar(f: &mut Frame, app: &App, area: Rect) {
    let dropdown = AutoRefreshDropdown::new(app.refresh, &app.catalog)
        .show_manual_refresh(app.cfg.auto_refresh.show_manual_refresh);
    dropdown.render(f, area, &app.dropdown);
}

/// INFOパネル用の情報テキストを構築する。
fn build_main_info_text(app: &App, sel_label: &str, sel_value: &str) -> String {
    let mut lines = vec![
        format!("Selected: {}", sel_label),
        format!("Value: {}", sel_value),
        String::new(),
        format!("Interval: {} ms", app.interval_buf),
        format!("Auto: {}", on_off(app.auto_enabled_buf)),
        format!("Button: {}", on_off(app.show_button_buf)),
        format!("Top: {}", app.top_buf),
        String::new(),
        "Busiest:".to_string(),
    ];

    // 上位プロセスをCPU使用率の降順で並べる。
    if app.snapshot.top_processes.is_empty() {
        lines.push("-".to_string());
    }
    for p in &app.snapshot.top_processes {
        lines.push(format!(
            "{:>5.1}% {:>9} {} ({})",
            p.cpu_usage,
            SystemSnapshot::format_bytes(p.memory),
            p.name,
            p.pid
        ));
    }

    // 直近のログを末尾から数行だけ表示する。
    lines.push(String::new());
    lines.push("Log:".to_string());
    for line in app.ui.log.iter().rev().take(8).rev() {
        lines.push(line.clone());
    }

    lines.join("\n")
}

/// ステータスバーを構築する。
fn build_status_bar(app: &App) -> Paragraph<'static> {
    let screen_name = match app.ui.screen {
        Screen::Main => "Main",
        Screen::Settings => "Settings",
    };

    // 自動更新の状態を短いラベルにする。
    let refresh_info = match app.refresh {
        AutoRefreshState::Disabled => "refresh disabled".to_string(),
        AutoRefreshState::Paused => "refresh paused".to_string(),
        AutoRefreshState::Active(ms) => format!("refresh every {}ms", ms),
    };

    // エラーの有無でステータス文字列を切り替える。
    let status_text = if let Some(err) = &app.ui.error {
        format!("[{}] {} | ERROR: {}", screen_name, refresh_info, err)
    } else {
        format!("[{}] {} | {}", screen_name, refresh_info, app.ui.status)
    };

    // ステータスバーのウィジェットを生成する。
    let mut status_bar = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("STATUS"))
        .wrap(Wrap { trim: true });

    // エラー時は赤色で強調表示する。
    if app.ui.error.is_some() {
        status_bar = status_bar.style(Style::default().fg(Color::Red));
    }

    status_bar
}

/// メニュー展開中のヘルプ文字列を返す。
fn menu_help_text(shortcuts: &Shortcuts) -> String {
    format!(
        "{}/{}: highlight | {}: choose | {}: close",
        format_keys(&shortcuts.dropdown.up),
        format_keys(&shortcuts.dropdown.down),
        format_keys(&shortcuts.dropdown.select),
        format_keys(&shortcuts.dropdown.close)
    )
}

/// 現在画面に応じたヘルプ文字列を返す。
fn get_help_text(screen: &Screen, shortcuts: &Shortcuts) -> String {
    match screen {
        Screen::Main => format!(
            "{}: quit | {}: interval | {}: refresh | {}: settings | {}/{}: navigate",
            format_keys(&shortcuts.main.quit),
            format_keys(&shortcuts.main.interval),
            format_keys(&shortcuts.main.refresh),
            format_keys(&shortcuts.main.settings),
            format_keys(&shortcuts.main.up),
            format_keys(&shortcuts.main.down)
        ),
        Screen::Settings => format!(
            "{}: interval | {}: top processes | {}: auto on/off | {}: button | {}: save | {}: cancel",
            format_keys(&shortcuts.settings.interval_ms),
            format_keys(&shortcuts.settings.top_processes),
            format_keys(&shortcuts.settings.toggle_auto),
            format_keys(&shortcuts.settings.toggle_button),
            format_keys(&shortcuts.settings.save),
            format_keys(&shortcuts.settings.cancel)
        ),
    }
}

/// ショートカットキーの配列を表示用文字列に変換する。
fn format_keys(keys: &[String]) -> String {
    keys.join("/")
}

/// 真偽値を表示用のon/offへ変換する。
fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}
