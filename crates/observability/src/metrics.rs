//! Relay 指标收集模块
//!
//! 通过 `metrics` facade 记录事件处理与分发指标。

use metrics::{counter, gauge, histogram};

/// 记录带事件名字段的对象
pub fn record_event_processed() {
    counter!("relay_events_processed_total").increment(1);
}

/// 记录被拒绝的事件
///
/// `reason`: `empty_name` / `blocked_prefix` / `not_allowed`
pub fn record_event_blocked(reason: &'static str) {
    counter!("relay_events_blocked_total", "reason" => reason).increment(1);
}

/// 记录传输成功
pub fn record_event_sent(transport: &str) {
    counter!(
        "relay_events_sent_total",
        "transport" => transport.to_string()
    )
    .increment(1);
}

/// 记录进入重试集合的事件
pub fn record_dispatch_retry(transport: &str) {
    counter!(
        "relay_dispatch_retries_total",
        "transport" => transport.to_string()
    )
    .increment(1);
}

/// 记录重试后仍失败而丢弃的事件
pub fn record_dispatch_dropped(transport: &str) {
    counter!(
        "relay_dispatch_dropped_total",
        "transport" => transport.to_string()
    )
    .increment(1);
}

/// 记录单次 flush 的批量大小
pub fn record_flush(batch_size: usize) {
    counter!("relay_flushes_total").increment(1);
    histogram!("relay_flush_batch_size").record(batch_size as f64);
}

/// 记录上下文条目数
pub fn record_context_entries(len: usize) {
    gauge!("relay_context_entries").set(len as f64);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
