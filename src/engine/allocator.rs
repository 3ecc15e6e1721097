// ==========================================
// 制造订单执行引擎 - 资源分配器 (Resource Allocator)
// ==========================================
// 职责: 防止任意两个工单的工序在重叠时段占用同一资源
// 策略: 冲突检测仅在开工时进行 (advisory),不做持续复检
// 并发: check-then-act 必须在资源粒度的锁内完成,
//       调用方先持有 lock_handle 的守卫,再做冲突扫描与开工写入,
//       两个并发开工对同一资源恰有一个成功
// ==========================================

use crate::domain::order::Operation;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::operation_repo::OperationRepository;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ResourceAllocator - 资源分配器
// ==========================================
pub struct ResourceAllocator {
    op_repo: Arc<OperationRepository>,
    /// 资源粒度锁表 (resource_code -> 锁)
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ResourceAllocator {
    /// 创建资源分配器
    pub fn new(op_repo: Arc<OperationRepository>) -> Self {
        Self {
            op_repo,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// 取得资源粒度的锁句柄
    ///
    /// 调用方持有返回锁的守卫期间,对该资源的冲突扫描与预订写入
    /// 构成一个临界区。
    pub fn lock_handle(&self, resource_code: &str) -> RepositoryResult<Arc<Mutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        Ok(locks
            .entry(resource_code.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// 扫描资源冲突
    ///
    /// 给定建议预订区间 [start, planned_end),扫描该资源上所有
    /// 执行中的工序,返回首个区间重叠的工序。planned_end 为 None
    /// 表示开放区间 (无计划时长)。
    pub fn find_conflict(
        &self,
        resource_code: &str,
        start: DateTime<Utc>,
        planned_end: Option<DateTime<Utc>>,
    ) -> RepositoryResult<Option<Operation>> {
        let running = self.op_repo.find_running_by_resource(resource_code)?;

        for op in running {
            // 执行中工序的占用区间: [actual_start, actual_start + planned_duration)
            let booked_start = op.actual_start.unwrap_or(start);
            let booked_end = op.planned_end();

            if intervals_overlap(start, planned_end, booked_start, booked_end) {
                return Ok(Some(op));
            }
        }

        Ok(None)
    }

    /// 释放资源 (绑定工序完工时调用)
    ///
    /// 预订本身由 RUNNING 状态派生,工序离开 RUNNING 即视为空闲;
    /// 这里只清理锁表项,避免锁表随资源数量无界增长。
    /// 仍有调用方持有该资源锁句柄时不得移除表项,否则后续调用方
    /// 会拿到一把新锁,与持旧锁的调用方同时进入临界区。
    pub fn release(&self, resource_code: &str) {
        if let Ok(mut locks) = self.locks.lock() {
            if let Some(entry) = locks.get(resource_code) {
                if Arc::strong_count(entry) == 1 {
                    locks.remove(resource_code);
                }
            }
        }
        tracing::debug!(resource_code, "资源已释放");
    }
}

/// 区间重叠判定 (半开区间,end 为 None 表示无界)
pub fn intervals_overlap(
    a_start: DateTime<Utc>,
    a_end: Option<DateTime<Utc>>,
    b_start: DateTime<Utc>,
    b_end: Option<DateTime<Utc>>,
) -> bool {
    let a_before_b = match a_end {
        Some(end) => end <= b_start,
        None => false,
    };
    let b_before_a = match b_end {
        Some(end) => end <= a_start,
        None => false,
    };
    !a_before_b && !b_before_a
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, m, 0).unwrap()
    }

    fn test_allocator() -> ResourceAllocator {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        ResourceAllocator::new(Arc::new(OperationRepository::new(Arc::new(Mutex::new(
            conn,
        )))))
    }

    #[test]
    fn test_release_preserves_held_lock_handle() {
        let allocator = test_allocator();
        let l1 = allocator.lock_handle("CNC-01").unwrap();
        let _guard = l1.lock().unwrap();

        // 锁句柄仍被持有时释放不得移除表项
        allocator.release("CNC-01");

        let l2 = allocator.lock_handle("CNC-01").unwrap();
        assert!(Arc::ptr_eq(&l1, &l2), "释放后必须拿到同一把资源锁");
        assert!(l2.try_lock().is_err(), "临界区未结束,第二个调用方不得进入");
    }

    #[test]
    fn test_release_removes_idle_lock_entry() {
        let allocator = test_allocator();
        drop(allocator.lock_handle("CNC-01").unwrap());

        allocator.release("CNC-01");

        // 无人持有句柄时表项被清理,新句柄可正常加锁
        let l2 = allocator.lock_handle("CNC-01").unwrap();
        assert!(l2.try_lock().is_ok());
    }

    #[test]
    fn test_overlap_basic() {
        // [8:00, 9:00) 与 [8:30, 9:30) 重叠
        assert!(intervals_overlap(
            ts(8, 0),
            Some(ts(9, 0)),
            ts(8, 30),
            Some(ts(9, 30))
        ));
        // [8:00, 9:00) 与 [9:00, 10:00) 不重叠 (半开区间)
        assert!(!intervals_overlap(
            ts(8, 0),
            Some(ts(9, 0)),
            ts(9, 0),
            Some(ts(10, 0))
        ));
        // 完全不相交
        assert!(!intervals_overlap(
            ts(8, 0),
            Some(ts(8, 30)),
            ts(9, 0),
            Some(ts(10, 0))
        ));
    }

    #[test]
    fn test_overlap_open_ended() {
        // 无计划时长的占用视为无界,与任何后续区间重叠
        assert!(intervals_overlap(ts(12, 0), Some(ts(13, 0)), ts(8, 0), None));
        assert!(intervals_overlap(ts(8, 0), None, ts(12, 0), Some(ts(13, 0))));
        assert!(intervals_overlap(ts(8, 0), None, ts(12, 0), None));
    }

    #[test]
    fn test_overlap_containment() {
        // [8:00, 12:00) 包含 [9:00, 10:00)
        assert!(intervals_overlap(
            ts(8, 0),
            Some(ts(12, 0)),
            ts(9, 0),
            Some(ts(10, 0))
        ));
    }
}
