//! 自動更新の状態モデルと更新間隔カタログ。

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 親（App）が所有する自動更新の状態。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoRefreshState {
    /// 外部要因により自動更新が無効化されている。
    Disabled,
    /// ユーザー操作で一時停止中。
    Paused,
    /// 指定ミリ秒の間隔で自動更新中。
    Active(u64),
}

impl AutoRefreshState {
    /// 選択された間隔から次の状態を決める（0は停止扱い）。
    pub fn for_interval(milliseconds: u64) -> Self {
        if milliseconds == 0 {
            Self::Paused
        } else {
            Self::Active(milliseconds)
        }
    }

    /// 無効化されているかを判定する。
    pub fn is_disabled(&self) -> bool {
        matches!(self, Self::Disabled)
    }

    /// 停止表示にすべきか（無効化も停止扱い）を判定する。
    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused) || self.is_disabled()
    }

    /// 自動更新が動作中ならその間隔（ミリ秒）を返す。
    pub fn interval_ms(&self) -> Option<u64> {
        match self {
            Self::Active(ms) => Some(*ms),
            _ => None,
        }
    }
}

/// ドロップダウンに並ぶ1件分の選択肢（または見出し行）。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoRefreshOption {
    /// カタログ内で一意な識別子。
    pub id: String,
    /// 表示ラベル。
    pub label: String,
    /// 更新間隔（ミリ秒）。Noneは見出し行、0は停止を表す。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milliseconds: Option<u64>,
}

/// 選択肢の種別ビュー。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionKind {
    /// 選択できない区切り見出し。
    Header,
    /// 選択可能な更新間隔（ミリ秒）。
    Interval(u64),
}

impl AutoRefreshOption {
    /// 見出し行を作成する。
    pub fn header(id: &str, label: &str) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            milliseconds: None,
        }
    }

    /// 選択可能な更新間隔の行を作成する。
    pub fn interval(id: &str, label: &str, milliseconds: u64) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            milliseconds: Some(milliseconds),
        }
    }

    /// 種別（見出し/間隔）を返す。
    pub fn kind(&self) -> OptionKind {
        match self.milliseconds {
            None => OptionKind::Header,
            Some(ms) => OptionKind::Interval(ms),
        }
    }

    /// 見出し行かを判定する。
    pub fn is_header(&self) -> bool {
        self.milliseconds.is_none()
    }
}

/// 表示順に固定された更新間隔カタログ。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCatalog {
    /// 表示順に並んだ選択肢。
    pub options: Vec<AutoRefreshOption>,
}

impl RefreshCatalog {
    /// TOMLから読み込み、無ければデフォルトを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let catalog = if path.exists() {
            // 既存ファイルを読み込んでパースする。
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            // 未作成の場合は既定カタログを利用する。
            Self::default()
        };
        // 不変条件の崩れはログへ警告し、動作は先勝ちで続行する。
        catalog.validate();
        Ok(catalog)
    }

    /// TOMLとして保存する。
    #[allow(dead_code)]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        // 文字列にシリアライズする。
        let content = toml::to_string_pretty(self)?;
        // ファイルへ書き込む。
        std::fs::write(path, content)?;
        Ok(())
    }

    /// カタログの不変条件を検査し、違反は警告ログに残す。
    pub fn validate(&self) {
        // 選択可能行が1つも無いと選択状態を表現できない。
        if self.first_selectable().is_none() {
            tracing::warn!("refresh catalog has no selectable entries");
        }
        // 非見出し行の間隔は一意であること（違反時は先勝ち）。
        let mut seen: Vec<u64> = Vec::new();
        for opt in &self.options {
            if let OptionKind::Interval(ms) = opt.kind() {
                if seen.contains(&ms) {
                    tracing::warn!("duplicate interval {ms}ms in refresh catalog; first match wins");
                } else {
                    seen.push(ms);
                }
            }
        }
    }

    /// 間隔が一致する最初の選択可能行を返す。
    pub fn option_for_interval(&self, milliseconds: u64) -> Option<&AutoRefreshOption> {
        self.options
            .iter()
            .find(|o| o.milliseconds == Some(milliseconds))
    }

    /// 先頭の選択可能行を返す。
    pub fn first_selectable(&self) -> Option<&AutoRefreshOption> {
        self.options.iter().find(|o| !o.is_header())
    }

    /// 現在の状態に対応する選択行を返す（不一致時は先頭の選択可能行へフォールバック）。
    pub fn selected_option(&self, state: &AutoRefreshState) -> Option<&AutoRefreshOption> {
        // 停止・無効化は間隔0の行（停止の選択肢）に対応付ける。
        let ms = state.interval_ms().unwrap_or(0);
        self.option_for_interval(ms).or_else(|| {
            // 一致が無くても描画は継続する。選択表示のみ既定へ倒す。
            tracing::warn!("no catalog entry for {ms}ms; falling back to first selectable");
            self.first_selectable()
        })
    }

    /// 現在の状態に対応する選択行のidを返す。
    pub fn selected_id(&self, state: &AutoRefreshState) -> Option<&str> {
        self.selected_option(state).map(|o| o.id.as_str())
    }
}

impl Default for RefreshCatalog {
    /// 製品既定のカタログ（見出し + 停止 + 5秒〜60秒）。
    fn default() -> Self {
        Self {
            options: vec![
                AutoRefreshOption::header("auto-refresh-header", "Refresh"),
                AutoRefreshOption::interval("auto-refresh-paused", "Paused", 0),
                AutoRefreshOption::interval("auto-refresh-5s", "5s", 5_000),
                AutoRefreshOption::interval("auto-refresh-10s", "10s", 10_000),
                AutoRefreshOption::interval("auto-refresh-15s", "15s", 15_000),
                AutoRefreshOption::interval("auto-refresh-30s", "30s", 30_000),
                AutoRefreshOption::interval("auto-refresh-60s", "60s", 60_000),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_interval_zero_pauses() {
        // 0ミリ秒は停止、それ以外は動作中になることを検証する。
        assert_eq!(AutoRefreshState::for_interval(0), AutoRefreshState::Paused);
        assert_eq!(
            AutoRefreshState::for_interval(5_000),
            AutoRefreshState::Active(5_000)
        );
    }

    #[test]
    fn test_paused_includes_disabled() {
        // 無効化状態も停止表示になることを検証する。
        assert!(AutoRefreshState::Disabled.is_paused());
        assert!(AutoRefreshState::Disabled.is_disabled());
        assert!(AutoRefreshState::Paused.is_paused());
        assert!(!AutoRefreshState::Paused.is_disabled());
        assert!(!AutoRefreshState::Active(5_000).is_paused());
    }

    #[test]
    fn test_default_catalog_intervals_are_unique() {
        // 既定カタログの非見出し行が一意な間隔を持つことを検証する。
        let catalog = RefreshCatalog::default();
        let mut seen = Vec::new();
        for opt in &catalog.options {
            if let OptionKind::Interval(ms) = opt.kind() {
                assert!(!seen.contains(&ms), "duplicate interval {ms}");
                seen.push(ms);
            }
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn test_selected_id_matches_active_interval() {
        // 動作中の間隔が一致する行のidが返ることを検証する。
        let catalog = RefreshCatalog::default();
        let state = AutoRefreshState::Active(10_000);
        assert_eq!(catalog.selected_id(&state), Some("auto-refresh-10s"));
    }

    #[test]
    fn test_selected_id_paused_maps_to_zero_entry() {
        // 停止・無効化は間隔0の行に対応することを検証する。
        let catalog = RefreshCatalog::default();
        assert_eq!(
            catalog.selected_id(&AutoRefreshState::Paused),
            Some("auto-refresh-paused")
        );
        assert_eq!(
            catalog.selected_id(&AutoRefreshState::Disabled),
            Some("auto-refresh-paused")
        );
    }

    #[test]
    fn test_selected_id_falls_back_on_unknown_interval() {
        // カタログに無い間隔は先頭の選択可能行へ倒れることを検証する。
        let catalog = RefreshCatalog::default();
        let state = AutoRefreshState::Active(7_777);
        assert_eq!(catalog.selected_id(&state), Some("auto-refresh-paused"));
    }

    #[test]
    fn test_duplicate_interval_first_match_wins() {
        // 間隔が重複した場合は先に現れた行が選ばれることを検証する。
        let catalog = RefreshCatalog {
            options: vec![
                AutoRefreshOption::interval("first", "5s", 5_000),
                AutoRefreshOption::interval("second", "5s again", 5_000),
            ],
        };
        let state = AutoRefreshState::Active(5_000);
        assert_eq!(catalog.selected_id(&state), Some("first"));
    }

    #[test]
    fn test_header_rows_are_not_selectable() {
        // 見出し行が検索やフォールバックの対象外であることを検証する。
        let catalog = RefreshCatalog {
            options: vec![
                AutoRefreshOption::header("head", "Refresh"),
                AutoRefreshOption::interval("5s", "5s", 5_000),
            ],
        };
        assert!(catalog.option_for_interval(0).is_none());
        assert_eq!(catalog.first_selectable().map(|o| o.id.as_str()), Some("5s"));
        assert_eq!(
            catalog.selected_id(&AutoRefreshState::Paused),
            Some("5s")
        );
    }

    #[test]
    fn test_catalog_toml_round_trip() {
        // 見出し行を含むカタログがTOMLを往復できることを検証する。
        let catalog = RefreshCatalog::default();
        let text = toml::to_string_pretty(&catalog).unwrap();
        let parsed: RefreshCatalog = toml::from_str(&text).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn test_load_or_default_without_file() {
        // ファイルが無い場合に既定カタログが返ることを検証する。
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refresh.toml");
        let catalog = RefreshCatalog::load_or_default(&path).unwrap();
        assert_eq!(catalog, RefreshCatalog::default());
    }

    #[test]
    fn test_load_or_default_reads_existing_file() {
        // 保存済みカタログがそのまま読み戻せることを検証する。
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refresh.toml");
        let custom = RefreshCatalog {
            options: vec![
                AutoRefreshOption::header("head", "Refresh"),
                AutoRefreshOption::interval("off", "Off", 0),
                AutoRefreshOption::interval("2s", "2s", 2_000),
            ],
        };
        custom.save(&path).unwrap();
        let loaded = RefreshCatalog::load_or_default(&path).unwrap();
        assert_eq!(loaded, custom);
    }
}
