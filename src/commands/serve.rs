//! Serve 命令 - 启动 Webhook 服务器

use anyhow::Result;

use crate::config::{Config, SinkKind};
use crate::gateway;

/// 执行服务器启动命令
///
/// # 参数
///
/// * `config` - 应用配置，包含监听地址、端口、凭据等信息
/// * `sink` - 命令行指定的 sink，优先于 `ASKRELAY_SINK`
pub async fn serve_command(mut config: Config, sink: Option<SinkKind>) -> Result<()> {
    if let Some(sink) = sink {
        config.sink = sink;
    }
    gateway::serve(config).await
}
