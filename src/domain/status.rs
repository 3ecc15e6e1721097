// ==========================================
// 制造订单执行引擎 - 工单状态派生
// ==========================================
// 红线: 工单状态是派生值,不得由任何转换直接写入
// 纯函数: 无副作用,幂等,与工序列表的遍历顺序无关
// ==========================================

use crate::domain::types::{OperationStatus, OrderStatus};

/// 由工序状态快照派生工单状态
///
/// 规则 (按当前快照评估):
/// - 工序列表为空: 返回工单当前状态 (no-op)
/// - 全部工序 PENDING: RELEASED
/// - 全部工序为终态 (COMPLETE/SKIPPED): COMPLETE
/// - 其余情况: IN_PROGRESS
///
/// 状态变更的副作用 (工单 started_at/completed_at 时间戳) 由调用方
/// 在派生值与存储值不一致时应用,不属于派生规则本身。
pub fn derive_order_status(statuses: &[OperationStatus], current: OrderStatus) -> OrderStatus {
    if statuses.is_empty() {
        return current;
    }

    if statuses.iter().all(|s| *s == OperationStatus::Pending) {
        return OrderStatus::Released;
    }

    if statuses.iter().all(|s| s.is_terminal()) {
        return OrderStatus::Complete;
    }

    OrderStatus::InProgress
}
