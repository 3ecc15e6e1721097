// ==========================================
// 制造订单执行引擎 - 物料闸口 (Material Gate)
// ==========================================
// 职责: 定义物料可用性协作方接口,实现依赖倒置
// 说明: Engine 层定义 trait,库存/BOM 协作方实现适配器
// 语义: 按工序的消耗阶段标签 (stage_tag) 查询/提交,
//       不按整单 BOM; 标签到 BOM 行的映射对本引擎不透明
// ==========================================

use std::collections::HashMap;
use std::sync::Mutex;

// ==========================================
// 物料闸口 Trait
// ==========================================

/// 物料可用性协作方接口
///
/// 开工前调用 check_available,完工时调用 consume (副作用)。
/// 库存数量如何计算不在本引擎范围内。
pub trait MaterialGate: Send + Sync {
    /// 查询某工单某消耗阶段的物料是否可用
    fn check_available(&self, order_id: &str, stage_tag: &str) -> anyhow::Result<bool>;

    /// 提交该阶段的物料消耗
    fn consume(&self, order_id: &str, stage_tag: &str) -> anyhow::Result<()>;
}

// ==========================================
// UnlimitedMaterialGate - 无限物料闸口
// ==========================================

/// 始终放行的物料闸口 (未接入库存协作方时的默认实现)
pub struct UnlimitedMaterialGate;

impl MaterialGate for UnlimitedMaterialGate {
    fn check_available(&self, _order_id: &str, _stage_tag: &str) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn consume(&self, order_id: &str, stage_tag: &str) -> anyhow::Result<()> {
        tracing::debug!(order_id, stage_tag, "物料消耗提交 (无限闸口,无操作)");
        Ok(())
    }
}

// ==========================================
// InMemoryMaterialGate - 内存物料闸口
// ==========================================

/// 内存台账实现 (测试与演示用)
///
/// 只约束已登记的 (工单, 阶段) 组合; 未登记的阶段视为不受限。
pub struct InMemoryMaterialGate {
    stock: Mutex<HashMap<(String, String), i64>>,
}

impl InMemoryMaterialGate {
    /// 创建空台账 (等价于不受限闸口)
    pub fn new() -> Self {
        Self {
            stock: Mutex::new(HashMap::new()),
        }
    }

    /// 登记某工单某阶段的可用份数
    pub fn set_stock(&self, order_id: &str, stage_tag: &str, units: i64) {
        let mut stock = self.stock.lock().expect("物料台账锁中毒");
        stock.insert((order_id.to_string(), stage_tag.to_string()), units);
    }

    /// 查询剩余份数 (未登记返回 None)
    pub fn remaining(&self, order_id: &str, stage_tag: &str) -> Option<i64> {
        let stock = self.stock.lock().expect("物料台账锁中毒");
        stock
            .get(&(order_id.to_string(), stage_tag.to_string()))
            .copied()
    }
}

impl Default for InMemoryMaterialGate {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialGate for InMemoryMaterialGate {
    fn check_available(&self, order_id: &str, stage_tag: &str) -> anyhow::Result<bool> {
        let stock = self
            .stock
            .lock()
            .map_err(|e| anyhow::anyhow!("物料台账锁中毒: {}", e))?;
        match stock.get(&(order_id.to_string(), stage_tag.to_string())) {
            Some(units) => Ok(*units > 0),
            None => Ok(true),
        }
    }

    fn consume(&self, order_id: &str, stage_tag: &str) -> anyhow::Result<()> {
        let mut stock = self
            .stock
            .lock()
            .map_err(|e| anyhow::anyhow!("物料台账锁中毒: {}", e))?;
        if let Some(units) = stock.get_mut(&(order_id.to_string(), stage_tag.to_string())) {
            if *units <= 0 {
                anyhow::bail!(
                    "物料不足: order_id={}, stage_tag={}",
                    order_id,
                    stage_tag
                );
            }
            *units -= 1;
        }
        Ok(())
    }
}
