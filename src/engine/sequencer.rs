// ==========================================
// 制造订单执行引擎 - 顺序引擎 (Sequencer)
// ==========================================
// 职责: 工序前驱/后继关系与顺序约束判定
// 排序键: seq_no 升序; 同一工单内 seq_no 重复为数据完整性错误,
//         在判定前显式拒绝,不在运行时静默消解
// ==========================================

use crate::domain::order::Operation;
use std::collections::HashSet;

// ==========================================
// Sequencer - 顺序引擎
// ==========================================
pub struct Sequencer;

impl Sequencer {
    /// 创建顺序引擎
    pub fn new() -> Self {
        Self
    }

    /// 校验 seq_no 在工单内无重复,返回首个重复的顺序号
    pub fn find_duplicate_sequence(&self, ops: &[Operation]) -> Option<i32> {
        let mut seen = HashSet::new();
        for op in ops {
            if !seen.insert(op.seq_no) {
                return Some(op.seq_no);
            }
        }
        None
    }

    /// 前驱工序 (严格小于 seq_no 的最大顺序号)
    pub fn predecessor_of<'a>(&self, ops: &'a [Operation], seq_no: i32) -> Option<&'a Operation> {
        ops.iter()
            .filter(|op| op.seq_no < seq_no)
            .max_by_key(|op| op.seq_no)
    }

    /// 后继工序 (严格大于 seq_no 的最小顺序号)
    pub fn successor_of<'a>(&self, ops: &'a [Operation], seq_no: i32) -> Option<&'a Operation> {
        ops.iter()
            .filter(|op| op.seq_no > seq_no)
            .min_by_key(|op| op.seq_no)
    }

    /// 判定顺序约束: 所有 seq_no 更小的工序均为终态
    pub fn predecessors_terminal(&self, ops: &[Operation], seq_no: i32) -> bool {
        ops.iter()
            .filter(|op| op.seq_no < seq_no)
            .all(|op| op.is_terminal())
    }

    /// 首个阻塞前驱 (seq_no 更小且非终态的工序,按顺序号升序取第一个)
    pub fn first_blocking_predecessor<'a>(
        &self,
        ops: &'a [Operation],
        seq_no: i32,
    ) -> Option<&'a Operation> {
        ops.iter()
            .filter(|op| op.seq_no < seq_no && !op.is_terminal())
            .min_by_key(|op| op.seq_no)
    }

    /// 下一道开放工序 (非终态且非执行中,按 seq_no 升序取第一个)
    ///
    /// 完工/跳过响应中的 next_operation 前瞻。最后一道工序终态后返回 None。
    pub fn next_open_operation<'a>(&self, ops: &'a [Operation]) -> Option<&'a Operation> {
        ops.iter()
            .filter(|op| op.status.can_start())
            .min_by_key(|op| op.seq_no)
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}
