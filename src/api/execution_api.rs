// ==========================================
// 制造订单执行引擎 - 工序执行接口 (Transition Engine)
// ==========================================
// 职责: 编排 start/complete/skip 三种转换,
//       顺序引擎校验 → 资源分配器/物料闸口校验 → 工序台账守卫式写入
//       → 工单状态重派生 → 返回下一道工序前瞻
// 红线: 任何失败都是 no-op,工序与工单保持原状,调用方得到分类错误
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::{
    CompleteOperationRequest, OrderSummary, SkipOperationRequest, StartOperationRequest,
    TransitionResponse,
};
use crate::domain::order::{ExecutionLog, Operation, WorkOrder, SKIP_NOTE_PREFIX};
use crate::domain::types::{OperationStatus, TransitionAction};
use crate::engine::{MaterialGate, ResourceAllocator, Sequencer};
use crate::repository::{
    ExecutionLogRepository, OperationRepository, ResourceRepository, TransitionOutcome,
    WorkOrderRepository,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// 跳过原因最短长度 (业务策略,非硬性不变量)
pub const MIN_SKIP_REASON_LEN: usize = 5;

// ==========================================
// ExecutionApi - 工序执行接口
// ==========================================
pub struct ExecutionApi {
    order_repo: Arc<WorkOrderRepository>,
    op_repo: Arc<OperationRepository>,
    resource_repo: Arc<ResourceRepository>,
    log_repo: Arc<ExecutionLogRepository>,
    sequencer: Sequencer,
    allocator: Arc<ResourceAllocator>,
    material_gate: Arc<dyn MaterialGate>,
}

impl ExecutionApi {
    /// 创建工序执行接口
    pub fn new(
        order_repo: Arc<WorkOrderRepository>,
        op_repo: Arc<OperationRepository>,
        resource_repo: Arc<ResourceRepository>,
        log_repo: Arc<ExecutionLogRepository>,
        allocator: Arc<ResourceAllocator>,
        material_gate: Arc<dyn MaterialGate>,
    ) -> Self {
        Self {
            order_repo,
            op_repo,
            resource_repo,
            log_repo,
            sequencer: Sequencer::new(),
            allocator,
            material_gate,
        }
    }

    // ==========================================
    // 查询接口
    // ==========================================

    /// 查询工单的全部工序 (按 seq_no 升序)
    pub fn list_operations(&self, order_id: &str) -> ApiResult<Vec<Operation>> {
        self.order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工单(id={})不存在", order_id)))?;
        Ok(self.op_repo.list_by_order(order_id)?)
    }

    // ==========================================
    // 开工 (PENDING/QUEUED -> RUNNING)
    // ==========================================

    /// 工序开工
    ///
    /// 校验链: 状态前置 → 前驱终态 → 物料可用 → 资源冲突 (资源锁内)。
    /// 守卫式条件更新保证同一工序的并发开工恰有一个成功。
    pub fn start_operation(
        &self,
        order_id: &str,
        operation_id: &str,
        req: StartOperationRequest,
    ) -> ApiResult<TransitionResponse> {
        let (_, op, ops) = self.resolve(order_id, operation_id)?;

        if !op.status.can_start() {
            return Err(self.invalid_transition(&op, TransitionAction::Start));
        }

        self.check_sequence(&ops, &op)?;

        // 同一工单不得有两道工序同时执行 (前驱规则已覆盖常规路径,此处防御数据异常)
        if let Some(running) = ops
            .iter()
            .find(|o| o.status == OperationStatus::Running)
        {
            tracing::warn!(
                order_id,
                running_operation_id = %running.operation_id,
                "工单已有执行中工序,拒绝开工"
            );
            return Err(self.invalid_transition(running, TransitionAction::Start));
        }

        // 物料闸口: 只查本工序消耗阶段,不查整单 BOM
        if let Some(stage_tag) = &op.stage_tag {
            let available = self
                .material_gate
                .check_available(order_id, stage_tag)
                .map_err(ApiError::Other)?;
            if !available {
                return Err(ApiError::MaterialShortage {
                    order_id: order_id.to_string(),
                    stage_tag: stage_tag.clone(),
                });
            }
        }

        let now = Utc::now();
        let new_notes = req.notes.as_deref().map(|n| op.appended_notes(n));

        let outcome = match req.resource_code.as_deref() {
            Some(resource_code) => {
                let resource = self
                    .resource_repo
                    .find_by_code(resource_code)?
                    .ok_or_else(|| {
                        ApiError::NotFound(format!("资源(code={})不存在", resource_code))
                    })?;

                // 资源粒度临界区: 冲突扫描与开工写入不可拆分
                let lock = self.allocator.lock_handle(resource_code)?;
                let _guard = lock
                    .lock()
                    .map_err(|e| ApiError::InternalError(format!("资源锁中毒: {}", e)))?;

                let planned_end = op.planned_duration_min.map(|m| now + Duration::minutes(m));
                if let Some(conflict) =
                    self.allocator.find_conflict(resource_code, now, planned_end)?
                {
                    return Err(ApiError::ResourceConflict {
                        resource_code: resource.resource_code,
                        conflicting_operation_id: conflict.operation_id,
                    });
                }

                self.op_repo.apply_start(
                    order_id,
                    operation_id,
                    now,
                    Some(resource_code),
                    req.operator.as_deref(),
                    new_notes.as_deref(),
                )?
            }
            None => self.op_repo.apply_start(
                order_id,
                operation_id,
                now,
                None,
                req.operator.as_deref(),
                new_notes.as_deref(),
            )?,
        };

        let outcome = match outcome {
            Some(outcome) => outcome,
            // 守卫落空: 状态前置条件已被并发调用方拿走
            None => return Err(self.refreshed_invalid_transition(order_id, operation_id, TransitionAction::Start)?),
        };

        self.append_log(
            &outcome,
            TransitionAction::Start,
            req.operator.as_deref(),
            serde_json::json!({
                "resource_code": req.resource_code,
            }),
        );
        tracing::info!(
            order_id,
            operation_id,
            seq_no = outcome.operation.seq_no,
            order_status = %outcome.order.status,
            "工序开工"
        );

        self.build_response(outcome, false)
    }

    // ==========================================
    // 完工 (RUNNING -> COMPLETE)
    // ==========================================

    /// 工序完工
    ///
    /// 记录完工/报废数量,派生实际时长,提交物料消耗,释放资源,
    /// 返回下一道开放工序。
    pub fn complete_operation(
        &self,
        order_id: &str,
        operation_id: &str,
        req: CompleteOperationRequest,
    ) -> ApiResult<TransitionResponse> {
        let (_, op, _) = self.resolve(order_id, operation_id)?;

        // NaN 与所有比较均为 false,必须显式拒绝非有限值
        if !req.quantity_completed.is_finite() || req.quantity_completed < 0.0 {
            return Err(ApiError::ValidationError(
                "完工数量必须为非负有限数".to_string(),
            ));
        }
        if !req.quantity_scrapped.is_finite() || req.quantity_scrapped < 0.0 {
            return Err(ApiError::ValidationError(
                "报废数量必须为非负有限数".to_string(),
            ));
        }
        if let Some(minutes) = req.actual_duration_min {
            if minutes < 0 {
                return Err(ApiError::ValidationError("实际时长不能为负".to_string()));
            }
        }

        if op.status != OperationStatus::Running {
            return Err(self.invalid_transition(&op, TransitionAction::Complete));
        }

        let now = Utc::now();
        let actual_duration_min = match req.actual_duration_min {
            Some(minutes) => minutes,
            None => op
                .actual_start
                .map(|start| (now - start).num_minutes().max(0))
                .unwrap_or(0),
        };
        let new_notes = req.notes.as_deref().map(|n| op.appended_notes(n));

        let outcome = self.op_repo.apply_complete(
            order_id,
            operation_id,
            now,
            actual_duration_min,
            req.quantity_completed,
            req.quantity_scrapped,
            new_notes.as_deref(),
        )?;

        let outcome = match outcome {
            Some(outcome) => outcome,
            None => return Err(self.refreshed_invalid_transition(order_id, operation_id, TransitionAction::Complete)?),
        };

        // 物料消耗提交 (协作方副作用,失败降级为告警,不回退已完工状态)
        if let Some(stage_tag) = &outcome.operation.stage_tag {
            if let Err(e) = self.material_gate.consume(order_id, stage_tag) {
                tracing::warn!(
                    order_id,
                    operation_id,
                    stage_tag = %stage_tag,
                    "物料消耗提交失败: {}",
                    e
                );
            }
        }

        // 释放资源 (预订由 RUNNING 状态派生,离开 RUNNING 即空闲)
        if let Some(resource_code) = &outcome.operation.resource_code {
            self.allocator.release(resource_code);
        }

        self.append_log(
            &outcome,
            TransitionAction::Complete,
            req.operator.as_deref(),
            serde_json::json!({
                "quantity_completed": req.quantity_completed,
                "quantity_scrapped": req.quantity_scrapped,
                "actual_duration_min": actual_duration_min,
            }),
        );
        tracing::info!(
            order_id,
            operation_id,
            seq_no = outcome.operation.seq_no,
            order_status = %outcome.order.status,
            "工序完工"
        );

        self.build_response(outcome, true)
    }

    // ==========================================
    // 跳过 (PENDING/QUEUED -> SKIPPED)
    // ==========================================

    /// 工序跳过
    ///
    /// 必须给出原因 (最短 MIN_SKIP_REASON_LEN 字符),顺序约束与开工相同;
    /// 原因以 SKIPPED: 前缀追加进 notes。
    pub fn skip_operation(
        &self,
        order_id: &str,
        operation_id: &str,
        req: SkipOperationRequest,
    ) -> ApiResult<TransitionResponse> {
        let (_, op, ops) = self.resolve(order_id, operation_id)?;

        let reason = req.reason.trim();
        if reason.chars().count() < MIN_SKIP_REASON_LEN {
            return Err(ApiError::ValidationError(format!(
                "跳过原因至少 {} 个字符",
                MIN_SKIP_REASON_LEN
            )));
        }

        if !op.status.can_skip() {
            return Err(self.invalid_transition(&op, TransitionAction::Skip));
        }

        self.check_sequence(&ops, &op)?;

        let now = Utc::now();
        let new_notes = op.appended_notes(&format!("{} {}", SKIP_NOTE_PREFIX, reason));

        let outcome = self
            .op_repo
            .apply_skip(order_id, operation_id, now, &new_notes)?;

        let outcome = match outcome {
            Some(outcome) => outcome,
            None => return Err(self.refreshed_invalid_transition(order_id, operation_id, TransitionAction::Skip)?),
        };

        self.append_log(
            &outcome,
            TransitionAction::Skip,
            req.operator.as_deref(),
            serde_json::json!({ "reason": reason }),
        );
        tracing::info!(
            order_id,
            operation_id,
            seq_no = outcome.operation.seq_no,
            order_status = %outcome.order.status,
            "工序跳过"
        );

        self.build_response(outcome, true)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 按标识解析工单与工序 (归属校验),并校验顺序号完整性
    fn resolve(
        &self,
        order_id: &str,
        operation_id: &str,
    ) -> ApiResult<(WorkOrder, Operation, Vec<Operation>)> {
        let order = self
            .order_repo
            .find_by_id(order_id)?
            .ok_or_else(|| ApiError::NotFound(format!("工单(id={})不存在", order_id)))?;

        let ops = self.op_repo.list_by_order(order_id)?;

        let op = ops
            .iter()
            .find(|o| o.operation_id == operation_id)
            .cloned()
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "工序(id={})不存在或不属于工单(id={})",
                    operation_id, order_id
                ))
            })?;

        // seq_no 重复是下达时应拒绝的数据完整性错误,运行时防御性复检
        if let Some(dup) = self.sequencer.find_duplicate_sequence(&ops) {
            return Err(ApiError::ValidationError(format!(
                "工单(id={})内顺序号 seq={} 重复,数据完整性错误",
                order_id, dup
            )));
        }

        Ok((order, op, ops))
    }

    /// 顺序约束: 所有前驱工序必须为终态
    fn check_sequence(&self, ops: &[Operation], op: &Operation) -> ApiResult<()> {
        if let Some(blocking) = self.sequencer.first_blocking_predecessor(ops, op.seq_no) {
            return Err(ApiError::SequenceViolation {
                seq_no: op.seq_no,
                blocking_seq_no: blocking.seq_no,
            });
        }
        Ok(())
    }

    /// 构造状态前置条件错误
    fn invalid_transition(&self, op: &Operation, action: TransitionAction) -> ApiError {
        ApiError::InvalidTransition {
            status: op.status.to_db_str().to_string(),
            action: action.as_str().to_string(),
        }
    }

    /// 守卫落空后重读当前状态构造错误 (并发调用方已抢先转换)
    fn refreshed_invalid_transition(
        &self,
        order_id: &str,
        operation_id: &str,
        action: TransitionAction,
    ) -> ApiResult<ApiError> {
        let current = self.op_repo.find_by_id(order_id, operation_id)?;
        Ok(match current {
            Some(op) => self.invalid_transition(&op, action),
            None => ApiError::NotFound(format!("工序(id={})不存在", operation_id)),
        })
    }

    /// 追加执行日志 (失败降级为告警,不阻断转换)
    fn append_log(
        &self,
        outcome: &TransitionOutcome,
        action: TransitionAction,
        operator: Option<&str>,
        payload: serde_json::Value,
    ) {
        let log = ExecutionLog {
            log_id: uuid::Uuid::new_v4().to_string(),
            order_id: outcome.operation.order_id.clone(),
            operation_id: outcome.operation.operation_id.clone(),
            action_type: action.as_str().to_string(),
            actor: operator.unwrap_or("system").to_string(),
            payload_json: Some(payload.to_string()),
            detail: Some(format!(
                "{} seq={} ({}) -> 工单状态 {}",
                action,
                outcome.operation.seq_no,
                outcome.operation.op_name,
                outcome.order.status
            )),
            action_ts: Utc::now(),
        };

        if let Err(e) = self.log_repo.insert(&log) {
            tracing::warn!("记录执行日志失败: {}", e);
        }
    }

    /// 组装转换响应 (工单摘要 + 可选下一道工序前瞻)
    fn build_response(
        &self,
        outcome: TransitionOutcome,
        with_next: bool,
    ) -> ApiResult<TransitionResponse> {
        let ops = self.op_repo.list_by_order(&outcome.order.order_id)?;

        let current_seq_no = ops
            .iter()
            .find(|o| o.status == OperationStatus::Running)
            .map(|o| o.seq_no)
            .or_else(|| self.sequencer.next_open_operation(&ops).map(|o| o.seq_no));

        let next_operation = if with_next {
            self.sequencer.next_open_operation(&ops).cloned()
        } else {
            None
        };

        Ok(TransitionResponse {
            operation: outcome.operation,
            order: OrderSummary {
                order_id: outcome.order.order_id,
                order_code: outcome.order.order_code,
                status: outcome.order.status,
                current_seq_no,
            },
            next_operation,
        })
    }
}
