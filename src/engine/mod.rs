// ==========================================
// 制造订单执行引擎 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: 所有拒绝必须输出可解释的原因
// ==========================================

pub mod allocator;
pub mod material_gate;
pub mod sequencer;

// 重导出核心引擎
pub use allocator::{intervals_overlap, ResourceAllocator};
pub use material_gate::{InMemoryMaterialGate, MaterialGate, UnlimitedMaterialGate};
pub use sequencer::Sequencer;
