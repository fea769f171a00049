//! キー入力ハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::{
    events::Screen,
    input::{InputBoxState, InputCallbackId},
    refresh_dropdown::AutoRefreshDropdown,
    report::{self, TracingFaultReporter},
    shortcuts,
    worker::WorkerCmd,
};

use super::{App, apply_refresh_event, initial_refresh_state};

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力ボックスが開いていれば最優先で処理する。
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }

    // 更新間隔メニューが開いていれば次に優先する。
    if app.dropdown.open {
        return handle_dropdown_key(app, k).await;
    }

    // 画面ごとのハンドラへ委譲する。
    match app.ui.screen {
        Screen::Main => handle_main_key(app, k).await,
        Screen::Settings => handle_settings_key(app, k).await,
    }
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// 更新間隔メニューが開いている間のキー処理。
async fn handle_dropdown_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // コンポーネントを組み立ててキーを委譲する。
    // 落ちた場合は報告してから巻き戻す。
    let event = report::guard(&TracingFaultReporter, "refresh menu", || {
        AutoRefreshDropdown::new(app.refresh, &app.catalog)
            .show_manual_refresh(app.cfg.auto_refresh.show_manual_refresh)
            .handle_menu_key(&mut app.dropdown, &k, &app.shortcuts.dropdown)
    });

    // 間隔が確定したら親として適用する。
    if let Some(ev) = event {
        apply_refresh_event(app, ev).await?;
    }
    Ok(false)
}

/// メイン画面のキー処理。
async fn handle_main_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // メイン画面のショートカットを参照する。
    let sc = &app.shortcuts.main;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.settings) {
        // 設定画面へ遷移し、編集バッファを更新する。
        reload_settings_buffers(app);
        app.ui.screen = Screen::Settings;
        app.ui.status = "Settings".into();
    } else if shortcuts::matches_shortcut(&k, &sc.interval) {
        // 更新間隔メニューを開く（無効時は何も起きない）。
        AutoRefreshDropdown::new(app.refresh, &app.catalog)
            .show_manual_refresh(app.cfg.auto_refresh.show_manual_refresh)
            .open_menu(&mut app.dropdown);
    } else if shortcuts::matches_shortcut(&k, &sc.refresh) {
        // 手動更新ボタンが表示されているときだけ反応する。
        let event = AutoRefreshDropdown::new(app.refresh, &app.catalog)
            .show_manual_refresh(app.cfg.auto_refresh.show_manual_refresh)
            .manual_refresh();
        if let Some(ev) = event {
            apply_refresh_event(app, ev).await?;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        // 次の行へ移動する。
        if app.ui.selected + 1 < app.snapshot.summary_rows().len() {
            app.ui.selected += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        // 前の行へ移動する。
        if app.ui.selected > 0 {
            app.ui.selected -= 1;
        }
    }

    Ok(false)
}

/// 設定画面のキー処理。
async fn handle_settings_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 設定画面のショートカットを参照する。
    let sc = &app.shortcuts.settings;

    if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // 変更を破棄してメイン画面へ戻る。
        reload_settings_buffers(app);
        app.ui.error = None;
        app.ui.screen = Screen::Main;
    } else if shortcuts::matches_shortcut(&k, &sc.save) {
        return save_settings(app).await;
    } else if shortcuts::matches_shortcut(&k, &sc.interval_ms) {
        // 既定の更新間隔の入力ボックスを開く。
        app.input_box = Some(InputBoxState::numeric(
            "Default interval (ms):",
            app.interval_buf.clone(),
            InputCallbackId::SettingsIntervalMs,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.top_processes) {
        // 表示プロセス数の入力ボックスを開く。
        app.input_box = Some(InputBoxState::numeric(
            "Top processes:",
            app.top_buf.clone(),
            InputCallbackId::SettingsTopProcesses,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_auto) {
        // 自動更新の有効/無効を切り替える。
        app.auto_enabled_buf = !app.auto_enabled_buf;
    } else if shortcuts::matches_shortcut(&k, &sc.toggle_button) {
        // 手動更新ボタンの表示を切り替える。
        app.show_button_buf = !app.show_button_buf;
    }

    Ok(false)
}

/// 編集バッファを検証して設定へ反映する。
async fn save_settings(app: &mut App) -> Result<bool> {
    // 数値バッファを検証する。
    let Ok(interval_ms) = app.interval_buf.trim().parse::<u64>() else {
        app.ui.error = Some(format!("invalid interval: {}", app.interval_buf));
        return Ok(false);
    };
    let Ok(top_processes) = app.top_buf.trim().parse::<usize>() else {
        app.ui.error = Some(format!("invalid process count: {}", app.top_buf));
        return Ok(false);
    };

    // 編集バッファを設定へ反映する。
    app.cfg.auto_refresh.interval_ms = interval_ms;
    app.cfg.auto_refresh.enabled = app.auto_enabled_buf;
    app.cfg.auto_refresh.show_manual_refresh = app.show_button_buf;
    app.cfg.snapshot.top_processes = top_processes;
    app.ui.error = None;

    // 自動更新状態を新しい設定から作り直す。
    app.refresh = initial_refresh_state(&app.cfg);
    // 開いたままのメニューは閉じておく。
    app.dropdown.close();

    // Workerへ保存と反映を依頼する。
    app.worker_tx
        .send(WorkerCmd::SaveSettings(app.cfg.clone()))
        .await?;

    // 画面状態を更新してメインへ戻る。
    app.ui.screen = Screen::Main;
    app.ui.status = "Saved settings".into();
    Ok(false)
}

/// 入力ボックスのキー処理。
async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力ボックスが無ければ何もしない。
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };

    // 入力ボックス用ショートカットを参照する。
    let sc = &app.shortcuts.input_box;

    // 入力ボックス中でもCtrl+Cで終了できるようにする。
    if is_ctrl_c(&k) {
        return Ok(true);
    }

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        // 入力ボックスを閉じる前に値とコールバック種別を保存する。
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id.clone();
        app.input_box = None;

        // コールバック種別に応じて値を反映する。
        apply_input_callback(app, callback_id, value);
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        // 入力を破棄して入力ボックスを閉じる。
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        // バックスペースを処理する。
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        // デリートを処理する。
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        // 左移動を処理する。
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        // 右移動を処理する。
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        // 行頭移動を処理する。
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        // 行末移動を処理する。
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        // 行をクリアする。
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code {
        // 通常の文字入力を処理する。
        if !k.modifiers.contains(KeyModifiers::CONTROL) {
            // コントロールキーでない場合のみ挿入する。
            input_state.insert_char(c);
        }
    }

    Ok(false)
}

/// 入力ボックスのコールバックを適用する。
fn apply_input_callback(app: &mut App, callback_id: InputCallbackId, value: String) {
    match callback_id {
        InputCallbackId::SettingsIntervalMs => app.interval_buf = value,
        InputCallbackId::SettingsTopProcesses => app.top_buf = value,
    }
}

/// 設定画面用の編集バッファを設定値から再読み込みする。
fn reload_settings_buffers(app: &mut App) {
    // 設定の現在値を編集用バッファへ反映する。
    app.interval_buf = app.cfg.auto_refresh.interval_ms.to_string();
    app.top_buf = app.cfg.snapshot.top_processes.to_string();
    app.auto_enabled_buf = app.cfg.auto_refresh.enabled;
    app.show_button_buf = app.cfg.auto_refresh.show_manual_refresh;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{app::test_app, autorefresh::AutoRefreshState};

    /// 修飾キー無しの文字キーイベントを作る。
    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty())
    }

    /// 修飾キー無しの特殊キーイベントを作る。
    fn key_code(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::empty())
    }

    #[tokio::test]
    async fn test_menu_keys_take_priority_while_open() {
        // メニューが開いている間は画面ショートカットより優先されることを検証する。
        let (mut app, mut worker_rx) = test_app();
        assert_eq!(app.refresh, AutoRefreshState::Active(10_000));

        // 'i' でメニューを開く。
        assert!(!handle_key(&mut app, key('i')).await.unwrap());
        assert!(app.dropdown.open);

        // 開いている間の 'q' は終了ではなく無視される。
        assert!(!handle_key(&mut app, key('q')).await.unwrap());
        assert!(app.dropdown.open);

        // Enterで選択中の間隔を確定する。
        assert!(!handle_key(&mut app, key_code(KeyCode::Enter)).await.unwrap());
        assert!(!app.dropdown.open);
        assert_eq!(app.refresh, AutoRefreshState::Active(10_000));

        // Workerへ設定保存と再取得が順に届く。
        assert!(matches!(
            worker_rx.try_recv().unwrap(),
            WorkerCmd::SaveSettings(_)
        ));
        assert!(matches!(
            worker_rx.try_recv().unwrap(),
            WorkerCmd::RefreshSnapshot
        ));
    }

    #[tokio::test]
    async fn test_choose_interval_from_paused() {
        // 一時停止から間隔を選ぶと稼働状態へ戻ることを検証する。
        let (mut app, mut worker_rx) = test_app();
        app.refresh = AutoRefreshState::Paused;

        assert!(!handle_key(&mut app, key('i')).await.unwrap());
        assert!(app.dropdown.open);
        // 開いた直後は「Paused」の行がハイライトされている。
        assert_eq!(app.dropdown.highlighted, 1);

        // 1つ下の「5s」を確定する。
        assert!(!handle_key(&mut app, key_code(KeyCode::Down)).await.unwrap());
        assert!(!handle_key(&mut app, key_code(KeyCode::Enter)).await.unwrap());
        assert_eq!(app.refresh, AutoRefreshState::Active(5_000));
        assert_eq!(app.cfg.auto_refresh.interval_ms, 5_000);

        assert!(matches!(
            worker_rx.try_recv().unwrap(),
            WorkerCmd::SaveSettings(_)
        ));
        assert!(matches!(
            worker_rx.try_recv().unwrap(),
            WorkerCmd::RefreshSnapshot
        ));
    }

    #[tokio::test]
    async fn test_choose_pause_stops_requests() {
        // 「Paused」を選ぶと再取得が走らないことを検証する。
        let (mut app, mut worker_rx) = test_app();

        assert!(!handle_key(&mut app, key('i')).await.unwrap());
        // 既定カタログの並びで「Paused」は先頭の選択可能行にある。
        while app.dropdown.highlighted > 1 {
            assert!(!handle_key(&mut app, key_code(KeyCode::Up)).await.unwrap());
        }
        assert!(!handle_key(&mut app, key_code(KeyCode::Enter)).await.unwrap());

        assert_eq!(app.refresh, AutoRefreshState::Paused);
        assert_eq!(app.cfg.auto_refresh.interval_ms, 0);
        assert!(matches!(
            worker_rx.try_recv().unwrap(),
            WorkerCmd::SaveSettings(_)
        ));
        // 再取得コマンドは積まれない。
        assert!(worker_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disabled_blocks_menu_open() {
        // 無効化中は 'i' を押してもメニューが開かないことを検証する。
        let (mut app, _worker_rx) = test_app();
        app.refresh = AutoRefreshState::Disabled;

        assert!(!handle_key(&mut app, key('i')).await.unwrap());
        assert!(!app.dropdown.open);
    }

    #[tokio::test]
    async fn test_manual_refresh_only_while_button_visible() {
        // 手動更新キーはボタン表示中だけ効くことを検証する。
        let (mut app, mut worker_rx) = test_app();

        // 稼働中はボタンが無いので何も起きない。
        assert!(!handle_key(&mut app, key('r')).await.unwrap());
        assert!(worker_rx.try_recv().is_err());

        // 一時停止中は再取得が依頼される。
        app.refresh = AutoRefreshState::Paused;
        assert!(!handle_key(&mut app, key('r')).await.unwrap());
        assert!(matches!(
            worker_rx.try_recv().unwrap(),
            WorkerCmd::RefreshSnapshot
        ));
        assert!(app.refresh_in_flight);

        // ボタンを隠す設定なら一時停止中でも効かない。
        app.refresh_in_flight = false;
        app.cfg.auto_refresh.show_manual_refresh = false;
        assert!(!handle_key(&mut app, key('r')).await.unwrap());
        assert!(worker_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_settings_toggle_disables_auto_refresh() {
        // 設定画面で自動更新を切って保存すると無効状態になることを検証する。
        let (mut app, mut worker_rx) = test_app();
        assert!(!handle_key(&mut app, key('t')).await.unwrap());
        assert_eq!(app.ui.screen, Screen::Settings);

        // マスタースイッチを切って保存する。
        assert!(!handle_key(&mut app, key('a')).await.unwrap());
        assert!(!app.auto_enabled_buf);
        assert!(!handle_key(&mut app, key_code(KeyCode::Enter)).await.unwrap());

        assert_eq!(app.ui.screen, Screen::Main);
        assert_eq!(app.refresh, AutoRefreshState::Disabled);
        assert!(!app.cfg.auto_refresh.enabled);
        assert!(matches!(
            worker_rx.try_recv().unwrap(),
            WorkerCmd::SaveSettings(_)
        ));
    }

    #[tokio::test]
    async fn test_settings_rejects_empty_interval() {
        // 数値に解釈できない間隔では保存が拒否されることを検証する。
        let (mut app, _worker_rx) = test_app();
        app.ui.screen = Screen::Settings;
        app.interval_buf = String::new();

        assert!(!handle_key(&mut app, key_code(KeyCode::Enter)).await.unwrap());
        assert_eq!(app.ui.screen, Screen::Settings);
        assert!(app.ui.error.is_some());
    }

    #[tokio::test]
    async fn test_input_box_edits_interval_buffer() {
        // 入力ボックス経由で間隔バッファが書き換わることを検証する。
        let (mut app, _worker_rx) = test_app();
        app.ui.screen = Screen::Settings;

        // 'd' で間隔入力を開き、末尾に '5' を足して確定する。
        assert!(!handle_key(&mut app, key('d')).await.unwrap());
        assert!(app.input_box.is_some());
        assert!(!handle_key(&mut app, key('5')).await.unwrap());
        assert!(!handle_key(&mut app, key_code(KeyCode::Enter)).await.unwrap());
        assert!(app.input_box.is_none());
        assert_eq!(app.interval_buf, "100005");
    }
}
