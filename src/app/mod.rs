//! TUIのイベントループ、入力処理、状態管理。

mod handlers;
mod render;

use anyhow::Result;
use crossterm::event::{self, Event};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;

use crate::{
    autorefresh::{AutoRefreshState, RefreshCatalog},
    config::Config,
    dropdown::DropdownState,
    events::{Screen, UiState},
    input::InputBoxState,
    refresh_dropdown::AutoRefreshEvent,
    shortcuts::Shortcuts,
    snapshot::SystemSnapshot,
    ui::Tui,
    worker::{self, WorkerCmd, WorkerEvent},
};

use handlers::{handle_key, is_ctrl_c};
use render::draw;

/// 入力処理と描画で共有するアプリ状態。
pub struct App {
    /// メモリ上の現在設定。
    pub cfg: Config,
    /// 選択位置やステータスなどUI固有の状態。
    pub ui: UiState,
    /// 最後に取得したシステムスナップショット。
    pub snapshot: SystemSnapshot,
    /// 現在の自動更新状態。
    pub refresh: AutoRefreshState,
    /// 更新間隔の選択肢カタログ。
    pub catalog: RefreshCatalog,
    /// 更新間隔メニューの開閉・ハイライト状態。
    pub dropdown: DropdownState,
    /// 最後にスナップショットを受け取った時刻。
    pub last_refresh: Option<Instant>,
    /// スナップショット取得を依頼してから応答待ちの間true。
    pub refresh_in_flight: bool,
    /// Workerへのコマンド送信チャネル。
    pub worker_tx: mpsc::Sender<WorkerCmd>,
    /// Workerからのイベント受信チャネル。
    pub worker_rx: mpsc::Receiver<WorkerEvent>,

    /// 設定画面で編集する既定の更新間隔（ミリ秒）。
    pub interval_buf: String,
    /// 設定画面で編集する表示プロセス数。
    pub top_buf: String,
    /// 設定画面で編集する自動更新の有効フラグ。
    pub auto_enabled_buf: bool,
    /// 設定画面で編集する手動更新ボタンの表示フラグ。
    pub show_button_buf: bool,

    /// 入力ボックスの状態（入力中はSome）。
    pub input_box: Option<InputBoxState>,

    /// ショートカットキー設定。
    pub shortcuts: Shortcuts,
}

/// ユーザーが終了するまでメインTUIループを回す。
pub async fn run_app(terminal: &mut Tui) -> Result<()> {
    // 設定ファイルを読み込む（初回はデフォルトを生成）。
    let cfg_path = PathBuf::from("config.toml");
    let cfg = Config::load_or_default(&cfg_path)?;

    // ショートカット設定を読み込む（無ければデフォルト）。
    let shortcuts_path = PathBuf::from("shortcut.toml");
    let shortcuts = Shortcuts::load_or_default(&shortcuts_path)?;

    // 更新間隔カタログを読み込む（無ければ既定の選択肢）。
    let catalog_path = PathBuf::from("refresh.toml");
    let catalog = RefreshCatalog::load_or_default(&catalog_path)?;

    // Worker通信用のコマンド/イベントチャネルを作る。
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(64);
    let (tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(256);

    // 初期設定スナップショットでWorkerを起動する。
    tokio::spawn(worker::run(rx_cmd, tx_ev, cfg.clone(), cfg_path));

    // 設定から起動時の自動更新状態を決める。
    let refresh = initial_refresh_state(&cfg);

    // アプリ状態を初期化する。
    let mut app = App {
        cfg: cfg.clone(),
        ui: UiState {
            screen: Screen::Main,
            selected: 0,
            log: vec![],
            status: "Ready".into(),
            error: None,
        },
        snapshot: SystemSnapshot::default(),
        refresh,
        catalog,
        dropdown: DropdownState::default(),
        last_refresh: None,
        refresh_in_flight: false,
        worker_tx: tx_cmd,
        worker_rx: rx_ev,
        interval_buf: cfg.auto_refresh.interval_ms.to_string(),
        top_buf: cfg.snapshot.top_processes.to_string(),
        auto_enabled_buf: cfg.auto_refresh.enabled,
        show_button_buf: cfg.auto_refresh.show_manual_refresh,
        input_box: None,
        shortcuts,
    };

    // 起動直後に最初のスナップショットを取得する。
    request_refresh(&mut app).await?;

    loop {
        // 現在の状態を描画する。
        terminal.draw(|f| draw(f, &app))?;

        // 入力処理の前にWorkerイベントを消化する。
        while let Ok(ev) = app.worker_rx.try_recv() {
            handle_worker_event(&mut app, ev)?;
        }

        // 自動更新の期限が来ていれば取得を依頼する。
        maybe_auto_refresh(&mut app).await?;

        // UIの応答性確保のため短いタイムアウトで入力をポーリングする。
        if event::poll(Duration::from_millis(50))?
            && let Event::Key(k) = event::read()?
        {
            // どのフェーズでもCtrl+Cで終了できるようにする。
            if is_ctrl_c(&k) {
                break;
            }
            if handle_key(&mut app, k).await? {
                break;
            }
        }
    }
    Ok(())
}

/// 設定から起動時の自動更新状態を決める。
///
/// マスタースイッチが切られていれば間隔設定に関わらず無効になる。
pub fn initial_refresh_state(cfg: &Config) -> AutoRefreshState {
    if cfg.auto_refresh.enabled {
        AutoRefreshState::for_interval(cfg.auto_refresh.interval_ms)
    } else {
        AutoRefreshState::Disabled
    }
}

/// WorkerイベントをUI状態へ反映する。
fn handle_worker_event(app: &mut App, ev: WorkerEvent) -> Result<()> {
    match ev {
        WorkerEvent::SnapshotLoaded(snapshot) => {
            // スナップショットを差し替え、次の自動更新の起点を記録する。
            app.snapshot = snapshot;
            app.refresh_in_flight = false;
            app.last_refresh = Some(Instant::now());
            // 選択位置を行数の範囲内へ収める。
            let rows = app.snapshot.summary_rows().len();
            if app.ui.selected >= rows {
                app.ui.selected = rows.saturating_sub(1);
            }
            app.ui.status = format!("Snapshot updated ({} processes)", app.snapshot.process_count);
        }
        WorkerEvent::Log(s) => {
            // ログを追加し、保持上限を超えた古い行は捨てる。
            app.ui.log.push(s);
            let max = app.cfg.ui.log_lines.max(1);
            if app.ui.log.len() > max {
                let excess = app.ui.log.len() - max;
                app.ui.log.drain(..excess);
            }
        }
        WorkerEvent::Error(s) => {
            // 応答待ちを解除してステータスにエラーを表示する。
            app.refresh_in_flight = false;
            app.ui.status = format!("Error: {s}");
        }
    }
    Ok(())
}

/// 自動更新の期限が来ていればWorkerへ取得を依頼する。
async fn maybe_auto_refresh(app: &mut App) -> Result<()> {
    // 停止中・無効中は何もしない。
    let Some(interval) = app.refresh.interval_ms() else {
        return Ok(());
    };
    // 応答待ちの間は二重依頼しない。
    if app.refresh_in_flight {
        return Ok(());
    }
    let due = match app.last_refresh {
        Some(at) => at.elapsed() >= Duration::from_millis(interval),
        None => true,
    };
    if due {
        request_refresh(app).await?;
    }
    Ok(())
}

/// Workerへスナップショット取得を依頼する。
pub async fn request_refresh(app: &mut App) -> Result<()> {
    tracing::info!("snapshot refresh requested");
    app.worker_tx.send(WorkerCmd::RefreshSnapshot).await?;
    app.refresh_in_flight = true;
    app.ui.status = "Refreshing snapshot...".into();
    Ok(())
}

/// ドロップダウンから返されたイベントを適用する。
pub async fn apply_refresh_event(app: &mut App, ev: AutoRefreshEvent) -> Result<()> {
    match ev {
        AutoRefreshEvent::Choose(ms) => {
            // 選んだ間隔を更新状態と設定の両方へ反映する。
            app.refresh = AutoRefreshState::for_interval(ms);
            app.cfg.auto_refresh.interval_ms = ms;
            app.interval_buf = ms.to_string();
            app.worker_tx
                .send(WorkerCmd::SaveSettings(app.cfg.clone()))
                .await?;
            if ms == 0 {
                tracing::info!("auto refresh paused");
                app.ui.status = "Auto refresh paused".into();
            } else {
                tracing::info!("auto refresh interval set: {} ms", ms);
                app.ui.status = format!("Auto refresh every {} ms", ms);
                // 新しい間隔はすぐ1回取得してから刻み始める。
                request_refresh(app).await?;
            }
        }
        AutoRefreshEvent::ManualRefresh => {
            request_refresh(app).await?;
        }
    }
    Ok(())
}

/// テスト用のAppを（Worker無しで）組み立てる。
///
/// Workerへ送られたコマンドを検査できるよう受信側も返す。
#[cfg(test)]
pub(crate) fn test_app() -> (App, mpsc::Receiver<WorkerCmd>) {
    let (tx_cmd, rx_cmd) = mpsc::channel::<WorkerCmd>(8);
    let (_tx_ev, rx_ev) = mpsc::channel::<WorkerEvent>(8);
    let cfg = Config::default();
    let app = App {
        cfg: cfg.clone(),
        ui: UiState {
            screen: Screen::Main,
            selected: 0,
            log: vec![],
            status: "Ready".into(),
            error: None,
        },
        snapshot: SystemSnapshot::default(),
        refresh: initial_refresh_state(&cfg),
        catalog: RefreshCatalog::default(),
        dropdown: DropdownState::default(),
        last_refresh: None,
        refresh_in_flight: false,
        worker_tx: tx_cmd,
        worker_rx: rx_ev,
        interval_buf: cfg.auto_refresh.interval_ms.to_string(),
        top_buf: cfg.snapshot.top_processes.to_string(),
        auto_enabled_buf: cfg.auto_refresh.enabled,
        show_button_buf: cfg.auto_refresh.show_manual_refresh,
        input_box: None,
        shortcuts: Shortcuts::default(),
    };
    (app, rx_cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_refresh_state_honors_master_switch() {
        // マスタースイッチOFFなら間隔に関わらず無効になることを検証する。
        let mut cfg = Config::default();
        assert_eq!(
            initial_refresh_state(&cfg),
            AutoRefreshState::Active(cfg.auto_refresh.interval_ms)
        );

        cfg.auto_refresh.interval_ms = 0;
        assert_eq!(initial_refresh_state(&cfg), AutoRefreshState::Paused);

        cfg.auto_refresh.enabled = false;
        cfg.auto_refresh.interval_ms = 5_000;
        assert_eq!(initial_refresh_state(&cfg), AutoRefreshState::Disabled);
    }

    #[test]
    fn test_snapshot_event_resets_timer_bookkeeping() {
        // スナップショット受信で応答待ちが解除され、起点時刻が記録されることを検証する。
        let (mut app, _rx) = test_app();
        app.refresh_in_flight = true;
        let snapshot = SystemSnapshot {
            process_count: 7,
            ..Default::default()
        };
        handle_worker_event(&mut app, WorkerEvent::SnapshotLoaded(snapshot)).unwrap();
        assert!(!app.refresh_in_flight);
        assert!(app.last_refresh.is_some());
        assert_eq!(app.snapshot.process_count, 7);
        assert!(app.ui.status.contains("7 processes"));
    }

    #[test]
    fn test_log_event_respects_line_cap() {
        // ログが保持上限を超えないことを検証する。
        let (mut app, _rx) = test_app();
        app.cfg.ui.log_lines = 3;
        for i in 0..10 {
            handle_worker_event(&mut app, WorkerEvent::Log(format!("line {i}"))).unwrap();
        }
        assert_eq!(app.ui.log.len(), 3);
        assert_eq!(app.ui.log[0], "line 7");
        assert_eq!(app.ui.log[2], "line 9");
    }

    #[test]
    fn test_error_event_clears_in_flight() {
        // エラー受信でも応答待ちが解除されることを検証する。
        let (mut app, _rx) = test_app();
        app.refresh_in_flight = true;
        handle_worker_event(&mut app, WorkerEvent::Error("boom".into())).unwrap();
        assert!(!app.refresh_in_flight);
        assert!(app.ui.status.contains("boom"));
    }

    #[tokio::test]
    async fn test_auto_refresh_waits_for_interval() {
        // 間隔が経過するまで依頼せず、起点が無ければ即時に依頼することを検証する。
        let (mut app, mut rx) = test_app();
        app.refresh = AutoRefreshState::Active(60_000);
        app.last_refresh = Some(Instant::now());
        maybe_auto_refresh(&mut app).await.unwrap();
        assert!(rx.try_recv().is_err());

        app.last_refresh = None;
        maybe_auto_refresh(&mut app).await.unwrap();
        assert!(matches!(rx.try_recv().unwrap(), WorkerCmd::RefreshSnapshot));

        // 応答待ちの間は重ねて依頼しない。
        maybe_auto_refresh(&mut app).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_paused_and_disabled_never_schedule() {
        // 停止・無効中はいくら待っても依頼しないことを検証する。
        let (mut app, mut rx) = test_app();
        app.refresh = AutoRefreshState::Paused;
        app.last_refresh = None;
        maybe_auto_refresh(&mut app).await.unwrap();
        assert!(rx.try_recv().is_err());

        app.refresh = AutoRefreshState::Disabled;
        maybe_auto_refresh(&mut app).await.unwrap();
        assert!(rx.try_recv().is_err());
    }
}
