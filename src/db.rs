// ==========================================
// 制造订单执行引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为,避免"部分连接外键开启/部分不开启"
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 提供执行引擎所需的最小 schema (工单/工序/资源/执行日志)
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout (毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化执行引擎 schema
///
/// 说明:
/// - UNIQUE(order_id, seq_no): 同一工单内顺序号重复是数据完整性错误,
///   在工单下达(工序批量创建)时即被拒绝,不在运行时静默消解
/// - 工单/工序由外部协作方创建,本引擎只做状态转换
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS work_order (
            order_id     TEXT PRIMARY KEY,
            order_code   TEXT NOT NULL UNIQUE,
            status       TEXT NOT NULL DEFAULT 'RELEASED',
            started_at   TEXT,
            completed_at TEXT,
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS resource (
            resource_id   TEXT PRIMARY KEY,
            resource_code TEXT NOT NULL UNIQUE,
            resource_name TEXT
        );

        CREATE TABLE IF NOT EXISTS work_order_operation (
            operation_id         TEXT PRIMARY KEY,
            order_id             TEXT NOT NULL REFERENCES work_order(order_id),
            seq_no               INTEGER NOT NULL,
            op_name              TEXT NOT NULL,
            stage_tag            TEXT,
            status               TEXT NOT NULL DEFAULT 'PENDING',
            resource_code        TEXT,
            operator             TEXT,
            planned_duration_min INTEGER,
            actual_start         TEXT,
            actual_end           TEXT,
            actual_duration_min  INTEGER,
            quantity_completed   REAL,
            quantity_scrapped    REAL,
            notes                TEXT,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL,
            UNIQUE(order_id, seq_no)
        );

        CREATE INDEX IF NOT EXISTS idx_operation_order
            ON work_order_operation(order_id, seq_no);
        CREATE INDEX IF NOT EXISTS idx_operation_resource_status
            ON work_order_operation(resource_code, status);

        CREATE TABLE IF NOT EXISTS execution_log (
            log_id       TEXT PRIMARY KEY,
            order_id     TEXT NOT NULL,
            operation_id TEXT NOT NULL,
            action_type  TEXT NOT NULL,
            actor        TEXT NOT NULL,
            payload_json TEXT,
            detail       TEXT,
            action_ts    TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}
