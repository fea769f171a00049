//! システム計測値のスナップショット。

use chrono::{DateTime, Local};

/// CPU使用率上位のプロセス1件分。
#[derive(Clone, Debug)]
pub struct ProcessInfo {
    /// プロセスID。
    pub pid: u32,
    /// プロセス名。
    pub name: String,
    /// CPU使用率（%）。
    pub cpu_usage: f32,
    /// 使用メモリ（バイト）。
    pub memory: u64,
}

/// ある時点のシステム計測値。
#[derive(Clone, Debug, Default)]
pub struct SystemSnapshot {
    /// ホスト名。
    pub host_name: Option<String>,
    /// OS起動からの経過秒数。
    pub uptime_secs: u64,
    /// CPU全体の使用率（%）。
    pub cpu_usage: f32,
    /// 総メモリ（バイト）。
    pub total_memory: u64,
    /// 使用中メモリ（バイト）。
    pub used_memory: u64,
    /// 総スワップ（バイト）。
    pub total_swap: u64,
    /// 使用中スワップ（バイト）。
    pub used_swap: u64,
    /// ロードアベレージ（1分・5分・15分）。
    pub load_average: (f64, f64, f64),
    /// プロセス総数。
    pub process_count: usize,
    /// CPU使用率上位のプロセス。
    pub top_processes: Vec<ProcessInfo>,
    /// 取得時刻。
    pub taken_at: Option<DateTime<Local>>,
}

impl SystemSnapshot {
    /// メモリ使用率（%）。総量が0なら0を返す。
    pub fn memory_percent(&self) -> f64 {
        if self.total_memory == 0 {
            return 0.0;
        }
        self.used_memory as f64 / self.total_memory as f64 * 100.0
    }

    /// スワップ使用率（%）。総量が0なら0を返す。
    pub fn swap_percent(&self) -> f64 {
        if self.total_swap == 0 {
            return 0.0;
        }
        self.used_swap as f64 / self.total_swap as f64 * 100.0
    }

    /// 経過秒数を "3d 02:03:04" 形式へ整形する。
    pub fn format_uptime(&self) -> String {
        let days = self.uptime_secs / 86_400;
        let hours = (self.uptime_secs % 86_400) / 3_600;
        let minutes = (self.uptime_secs % 3_600) / 60;
        let seconds = self.uptime_secs % 60;
        if days > 0 {
            format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
        } else {
            format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
        }
    }

    /// バイト数を読みやすい単位へ整形する。
    pub fn format_bytes(bytes: u64) -> String {
        const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
        let mut value = bytes as f64;
        let mut unit = 0;
        while value >= 1024.0 && unit < UNITS.len() - 1 {
            value /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{} {}", bytes, UNITS[0])
        } else {
            format!("{:.1} {}", value, UNITS[unit])
        }
    }

    /// サマリーテーブル1行分の（項目, 値）ペアを並べる。
    pub fn summary_rows(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();
        rows.push((
            "Host".to_string(),
            self.host_name.clone().unwrap_or_else(|| "unknown".to_string()),
        ));
        rows.push(("Uptime".to_string(), self.format_uptime()));
        rows.push(("CPU".to_string(), format!("{:.1} %", self.cpu_usage)));
        rows.push((
            "Memory".to_string(),
            format!(
                "{} / {} ({:.1} %)",
                Self::format_bytes(self.used_memory),
                Self::format_bytes(self.total_memory),
                self.memory_percent()
            ),
        ));
        rows.push((
            "Swap".to_string(),
            format!(
                "{} / {} ({:.1} %)",
                Self::format_bytes(self.used_swap),
                Self::format_bytes(self.total_swap),
                self.swap_percent()
            ),
        ));
        rows.push((
            "Load".to_string(),
            format!(
                "{:.2} {:.2} {:.2}",
                self.load_average.0, self.load_average.1, self.load_average.2
            ),
        ));
        rows.push(("Processes".to_string(), self.process_count.to_string()));
        if let Some(taken_at) = self.taken_at {
            // 最終取得時刻を末尾に添える。
            rows.push(("Sampled".to_string(), taken_at.format("%H:%M:%S").to_string()));
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent_handles_zero_total() {
        // 総メモリ0でもパニックしないことを検証する。
        let snapshot = SystemSnapshot::default();
        assert_eq!(snapshot.memory_percent(), 0.0);
        assert_eq!(snapshot.swap_percent(), 0.0);
    }

    #[test]
    fn test_memory_percent_basic_ratio() {
        // 使用率の計算を検証する。
        let snapshot = SystemSnapshot {
            total_memory: 8_000,
            used_memory: 2_000,
            ..Default::default()
        };
        assert!((snapshot.memory_percent() - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_uptime_with_and_without_days() {
        // 日数の有無で整形が切り替わることを検証する。
        let short = SystemSnapshot {
            uptime_secs: 3 * 3_600 + 4 * 60 + 5,
            ..Default::default()
        };
        assert_eq!(short.format_uptime(), "03:04:05");

        let long = SystemSnapshot {
            uptime_secs: 2 * 86_400 + 3_600 + 2,
            ..Default::default()
        };
        assert_eq!(long.format_uptime(), "2d 01:00:02");
    }

    #[test]
    fn test_format_bytes_units() {
        // 単位の切り替わりを検証する。
        assert_eq!(SystemSnapshot::format_bytes(512), "512 B");
        assert_eq!(SystemSnapshot::format_bytes(2_048), "2.0 KiB");
        assert_eq!(SystemSnapshot::format_bytes(5 * 1_024 * 1_024), "5.0 MiB");
        assert_eq!(
            SystemSnapshot::format_bytes(3 * 1_024 * 1_024 * 1_024),
            "3.0 GiB"
        );
    }

    #[test]
    fn test_summary_rows_cover_all_sections() {
        // サマリー行に主要な項目がそろうことを検証する。
        let snapshot = SystemSnapshot {
            host_name: Some("devbox".to_string()),
            uptime_secs: 60,
            cpu_usage: 12.5,
            total_memory: 1_024,
            used_memory: 512,
            process_count: 42,
            taken_at: Some(Local::now()),
            ..Default::default()
        };
        let rows = snapshot.summary_rows();
        let labels: Vec<&str> = rows.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Host", "Uptime", "CPU", "Memory", "Swap", "Load", "Processes", "Sampled"]
        );
        assert_eq!(rows[0].1, "devbox");
    }

    #[test]
    fn test_summary_rows_skip_sampled_before_first_fetch() {
        // 一度も取得していない間は Sampled 行が出ないことを検証する。
        let rows = SystemSnapshot::default().summary_rows();
        assert!(rows.iter().all(|(label, _)| label != "Sampled"));
    }
}
