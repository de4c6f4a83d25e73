//! 结果写入服务 - 业务能力层
//!
//! 只负责"合并写入 `<platform>_output.json`"能力，不关心流程。
//! 读取 → 规范化为数组 → 追加 → 整体重写；不去重、不保证原子性。

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value as JsonValue};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::models::{PlatformId, Record};

/// 结果写入服务
///
/// 职责：
/// - 每个平台一个输出文件
/// - 已有内容无法解析时从空数组开始，单个对象视为一个元素
/// - 写入时 4 空格缩进，非 ASCII 字符原样保留
pub struct ResultAggregator {
    output_dir: PathBuf,
}

impl ResultAggregator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `outputs/<platform>_output.json`
    pub fn path_for(&self, platform: PlatformId) -> PathBuf {
        self.output_dir
            .join(format!("{}_output.json", platform.as_str()))
    }

    /// 追加一条记录，返回写入后的总条数
    pub async fn append(&self, platform: PlatformId, record: Record) -> AppResult<usize> {
        self.append_all(platform, vec![record]).await
    }

    /// 逐条追加多条记录，返回写入后的总条数
    pub async fn append_all(&self, platform: PlatformId, records: Vec<Record>) -> AppResult<usize> {
        let path = self.path_for(platform);
        let mut items = read_store(&path).await?;
        let added = records.len();
        items.extend(records.into_iter().map(JsonValue::from));
        write_store(&path, &items).await?;

        info!(
            "💾 已写入 {} 条记录到 {} (共 {} 条)",
            added,
            path.display(),
            items.len()
        );
        Ok(items.len())
    }
}

/// 读取已有存储并规范化为数组
///
/// - 文件不存在 → 空数组
/// - JSON 无效 → 空数组
/// - 单个非数组值 → 包装为一个元素的数组
pub async fn read_store(path: &Path) -> AppResult<Vec<JsonValue>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!("输出文件不存在，将新建: {}", path.display());
        return Ok(Vec::new());
    }

    let content = tokio::fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    Ok(normalize_store(&content, path))
}

/// 非 UTF-8 字节与 JSON 语法错误一样按无效内容处理
fn normalize_store(content: &[u8], path: &Path) -> Vec<JsonValue> {
    match serde_json::from_slice::<JsonValue>(content) {
        Ok(JsonValue::Array(items)) => items,
        Ok(other) => {
            debug!("输出文件不是数组，包装为单元素数组: {}", path.display());
            vec![other]
        }
        Err(e) => {
            warn!("⚠️ 输出文件无法解析，将从空数组开始: {} ({})", path.display(), e);
            Vec::new()
        }
    }
}

/// 整体重写存储文件
pub async fn write_store(path: &Path, items: &[JsonValue]) -> AppResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
    }

    let content = to_pretty_json(items)?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;
    Ok(())
}

/// 4 空格缩进的 JSON
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> AppResult<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}
