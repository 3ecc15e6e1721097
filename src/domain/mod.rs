// ==========================================
// 制造订单执行引擎 - 领域模型层
// ==========================================
// 职责: 定义领域实体、状态类型、纯派生规则
// 红线: 不含数据访问逻辑,不含编排逻辑
// ==========================================

pub mod order;
pub mod status;
pub mod types;

// 重导出核心类型
pub use order::{ExecutionLog, Operation, Resource, WorkOrder, SKIP_NOTE_PREFIX};
pub use status::derive_order_status;
pub use types::{OperationStatus, OrderStatus, TransitionAction};
