//! 远程命令执行结果

/// 执行结果 - 一次远程命令调用的输出
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// 退出码（远端未报告时为 -1）
    pub exit_code: i32,

    /// 标准输出
    pub stdout: String,

    /// 标准错误
    pub stderr: String,

    /// 执行时长（秒）
    pub duration_secs: f64,
}

impl ExecutionResult {
    /// 创建成功结果
    pub fn success(stdout: String, duration_secs: f64) -> Self {
        Self {
            exit_code: 0,
            stdout,
            stderr: String::new(),
            duration_secs,
        }
    }

    /// 创建失败结果
    pub fn failure(exit_code: i32, stdout: String, stderr: String, duration_secs: f64) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration_secs,
        }
    }

    /// 判断是否成功
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    /// 判断是否失败
    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// stderr 是否收到任何字节（只有空白也算）
    pub fn has_stderr(&self) -> bool {
        !self.stderr.is_empty()
    }

    /// 去除首尾空白后的 stderr
    pub fn stderr_trimmed(&self) -> &str {
        self.stderr.trim()
    }
}
