//! 模拟脚本加载器
//!
//! 没有浏览器时使用，支持注入失败场景。

use std::collections::HashSet;

use parking_lot::Mutex;
use tracing::instrument;

use crate::error::{BootstrapError, Result};
use crate::loader::ScriptLoader;

/// 模拟脚本加载器
#[derive(Debug, Default)]
pub struct SimulatedScriptLoader {
    /// 应该失败的 URL
    failing: HashSet<String>,
    /// 所有 URL 都失败
    fail_all: bool,
    /// 已尝试的 URL (按顺序)
    attempts: Mutex<Vec<String>>,
}

impl SimulatedScriptLoader {
    /// 创建总是成功的加载器
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建总是失败的加载器
    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// 指定 URL 加载失败
    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// 已尝试的 URL
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().clone()
    }
}

impl ScriptLoader for SimulatedScriptLoader {
    #[instrument(name = "simulated_script_load", skip(self))]
    async fn load(&self, url: &str) -> Result<()> {
        self.attempts.lock().push(url.to_string());
        if self.fail_all || self.failing.contains(url) {
            return Err(BootstrapError::script_load(url, "simulated network error"));
        }
        Ok(())
    }
}
