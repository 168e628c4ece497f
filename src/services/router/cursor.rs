/// 单个 zone 的候选地址游标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointCursor {
    /// 当前使用的候选地址下标
    pub index: usize,
    /// 自上次成功以来的连续失败次数
    pub consecutive_failures: u32,
    /// 累计失败次数，只增不减
    pub total_failures: u64,
}

impl EndpointCursor {
    /// 记录一次失败并轮换到下一个候选地址，末尾回到开头
    pub fn advance(&mut self, candidates: usize) -> usize {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures = self.total_failures.saturating_add(1);
        if candidates > 1 {
            self.index = (self.index + 1) % candidates;
        }
        self.index
    }

    /// 成功后回到首选地址
    pub fn reset(&mut self) {
        self.index = 0;
        self.consecutive_failures = 0;
    }
}
