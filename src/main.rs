//! illumos-dataset 命令行入口
//! 每次调用执行一个数据集操作，结果以 JSON 输出到 stdout

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use illumos_dataset::{
    config::AppConfig, telemetry, AppError, Dataset, DatasetResource, DatasetService,
    SessionManager,
};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "illumos-dataset", version, about = "Manage ZFS datasets on an illumos host over SSH")]
struct Cli {
    /// 配置文件（可选，环境变量优先）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 创建数据集
    Create {
        #[arg(long, conflicts_with = "json")]
        name: Option<String>,
        #[arg(long, default_value = "")]
        compression: String,
        #[arg(long, default_value = "")]
        quota: String,
        /// 以 JSON 记录描述期望状态
        #[arg(long)]
        json: Option<String>,
    },
    /// 按标识符读取数据集
    Get { id: Uuid },
    /// 修改 compression / quota
    Set {
        id: Uuid,
        #[arg(long)]
        compression: Option<String>,
        #[arg(long)]
        quota: Option<String>,
    },
    /// 按标识符查找并销毁数据集
    Destroy { id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载 .env 文件（开发环境）
    dotenv::dotenv().ok();

    let config = AppConfig::load(cli.config.as_deref()).map_err(|e| {
        let error = AppError::from(e);
        eprintln!("{}", error);
        error
    })?;

    telemetry::init_telemetry(&config.logging);

    let session_manager = Arc::new(SessionManager::new(config.ssh.clone()));
    let service = Arc::new(DatasetService::new(session_manager, &config.zfs));
    let resource = DatasetResource::new(service.clone());

    let outcome = run(&resource, cli.command).await;
    service.close().await;

    match outcome {
        Ok(Some(dataset)) => {
            println!("{}", serde_json::to_string_pretty(&dataset)?);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::error!(kind = e.kind(), transport = e.is_transport(), "{}", e);
            Err(e.into())
        }
    }
}

async fn run(
    resource: &DatasetResource,
    command: Command,
) -> illumos_dataset::Result<Option<Dataset>> {
    match command {
        Command::Create {
            name,
            compression,
            quota,
            json,
        } => {
            let desired = match (json, name) {
                (Some(record), _) => Dataset::from_json(&record)?,
                (None, Some(name)) => Dataset::new(name)
                    .with_compression(compression)
                    .with_quota(quota),
                (None, None) => {
                    return Err(AppError::validation(
                        "either --name or --json is required",
                    ))
                }
            };
            resource.create(&desired).await.map(Some)
        }
        Command::Get { id } => resource.read(&id).await.map(Some),
        Command::Set {
            id,
            compression,
            quota,
        } => {
            let current = resource.read(&id).await?;
            let mut desired = current.clone();
            if let Some(compression) = compression {
                desired.compression = compression;
            }
            if let Some(quota) = quota {
                desired.quota = quota;
            }
            resource.update(&id, &current, &desired).await.map(Some)
        }
        Command::Destroy { id } => {
            let state = resource.read(&id).await?;
            resource.delete(&state).await.map(|_| None)
        }
    }
}
