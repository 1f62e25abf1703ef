//! 测试公共模块
//! 提供一个内存中的 zfs 主机，实现 RemoteExecutor

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use illumos_dataset::{
    config::ZfsConfig,
    ssh::{ExecutionResult, RemoteCommand, RemoteExecutor},
    AppError, DatasetResource, DatasetService, Result,
};

#[derive(Debug, Clone, Default)]
struct FakeDataset {
    properties: BTreeMap<String, String>,
}

#[derive(Default)]
struct FakeState {
    datasets: BTreeMap<String, FakeDataset>,
    connected: bool,
    connect_attempts: usize,
    commands: Vec<Vec<String>>,
    connect_error: Option<AppError>,
    destroy_warning: Option<String>,
    list_override: Option<ExecutionResult>,
}

/// 内存中的 zfs 主机
pub struct FakeZfsHost {
    identifier_property: String,
    state: Mutex<FakeState>,
}

impl FakeZfsHost {
    /// 创建带有 `tank` 池的主机
    pub fn new() -> Arc<Self> {
        let host = Self {
            identifier_property: ZfsConfig::default().identifier_property,
            state: Mutex::new(FakeState::default()),
        };
        host.state
            .lock()
            .unwrap()
            .datasets
            .insert("tank".to_string(), FakeDataset::default());
        Arc::new(host)
    }

    pub fn fail_connect(&self, error: AppError) {
        self.state.lock().unwrap().connect_error = Some(error);
    }

    /// destroy 成功但在 stderr 打印警告
    pub fn warn_on_destroy(&self, warning: &str) {
        self.state.lock().unwrap().destroy_warning = Some(warning.to_string());
    }

    /// 替换 list 命令的输出
    pub fn override_list(&self, result: ExecutionResult) {
        self.state.lock().unwrap().list_override = Some(result);
    }

    pub fn exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().datasets.contains_key(name)
    }

    pub fn property(&self, name: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .datasets
            .get(name)
            .and_then(|d| d.properties.get(key).cloned())
    }

    pub fn commands(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().unwrap().connect_attempts
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }

    fn run(&self, state: &mut FakeState, argv: &[String]) -> ExecutionResult {
        if argv.first().map(String::as_str) != Some("zfs") {
            return fail(127, &format!("sh: {}: not found", argv.join(" ")));
        }

        match argv.get(1).map(String::as_str) {
            Some("create") => self.create(state, &argv[2..]),
            Some("list") => self.list(state, &argv[2..]),
            Some("set") => set(state, &argv[2..]),
            Some("destroy") => destroy(state, &argv[2..]),
            _ => fail(2, "unrecognized command"),
        }
    }

    fn create(&self, state: &mut FakeState, args: &[String]) -> ExecutionResult {
        let Some((name, options)) = args.split_last() else {
            return fail(2, "missing dataset name argument");
        };

        let mut properties = BTreeMap::new();
        let mut iter = options.iter();
        while let Some(flag) = iter.next() {
            if flag != "-o" {
                return fail(2, &format!("invalid option '{}'", flag));
            }
            let Some((key, value)) = iter.next().and_then(|p| p.split_once('=')) else {
                return fail(2, "missing '=' for property argument");
            };
            properties.insert(key.to_string(), value.to_string());
        }

        if state.datasets.contains_key(name) {
            return fail(1, &format!("cannot create '{}': dataset already exists", name));
        }
        let parent = name.rsplit_once('/').map(|(parent, _)| parent);
        if let Some(parent) = parent {
            if !state.datasets.contains_key(parent) {
                return fail(1, &format!("cannot create '{}': parent does not exist", name));
            }
        }

        state
            .datasets
            .insert(name.clone(), FakeDataset { properties });
        ExecutionResult::success(String::new(), 0.01)
    }

    fn list(&self, state: &mut FakeState, args: &[String]) -> ExecutionResult {
        if let Some(result) = state.list_override.clone() {
            return result;
        }

        let expected = format!("name,{},compression,quota", self.identifier_property);
        if args != ["-H", "-o", expected.as_str()] {
            return fail(2, "unexpected list arguments");
        }

        let mut stdout = String::new();
        for (name, dataset) in &state.datasets {
            let get = |key: &str, default: &str| {
                dataset
                    .properties
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| default.to_string())
            };
            stdout.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                name,
                get(&self.identifier_property, "-"),
                get("compression", "off"),
                get("quota", "none"),
            ));
        }

        ExecutionResult::success(stdout, 0.01)
    }
}

fn fail(exit_code: i32, stderr: &str) -> ExecutionResult {
    ExecutionResult::failure(exit_code, String::new(), format!("{}\n", stderr), 0.01)
}

fn set(state: &mut FakeState, args: &[String]) -> ExecutionResult {
    let Some((name, assignments)) = args.split_last() else {
        return fail(2, "missing dataset name");
    };
    if assignments.is_empty() {
        return fail(2, "missing property=value argument(s)");
    }

    let Some(dataset) = state.datasets.get_mut(name) else {
        return fail(1, &format!("cannot open '{}': dataset does not exist", name));
    };

    for assignment in assignments {
        let Some((key, value)) = assignment.split_once('=') else {
            return fail(2, &format!("invalid property '{}'", assignment));
        };
        dataset.properties.insert(key.to_string(), value.to_string());
    }

    ExecutionResult::success(String::new(), 0.01)
}

fn destroy(state: &mut FakeState, args: &[String]) -> ExecutionResult {
    let [name] = args else {
        return fail(2, "wrong number of arguments");
    };

    if !state.datasets.contains_key(name) {
        return fail(1, &format!("cannot open '{}': dataset does not exist", name));
    }
    let prefix = format!("{}/", name);
    if state.datasets.keys().any(|other| other.starts_with(&prefix)) {
        return fail(1, &format!("cannot destroy '{}': filesystem has children", name));
    }

    state.datasets.remove(name);
    match &state.destroy_warning {
        Some(warning) => ExecutionResult::failure(0, String::new(), warning.clone(), 0.01),
        None => ExecutionResult::success(String::new(), 0.01),
    }
}

#[async_trait]
impl RemoteExecutor for FakeZfsHost {
    async fn ensure_connected(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.connected {
            return Ok(());
        }
        state.connect_attempts += 1;
        if let Some(error) = &state.connect_error {
            return Err(error.clone());
        }
        state.connected = true;
        Ok(())
    }

    async fn execute(&self, command: &RemoteCommand) -> Result<ExecutionResult> {
        let mut state = self.state.lock().unwrap();
        if !state.connected {
            return Err(AppError::SshSession("not connected".to_string()));
        }

        let argv: Vec<String> = command.argv().into_iter().map(String::from).collect();
        state.commands.push(argv.clone());
        Ok(self.run(&mut state, &argv))
    }

    async fn close(&self) {
        self.state.lock().unwrap().connected = false;
    }
}

/// 基于内存主机的服务
pub fn service_for(host: &Arc<FakeZfsHost>) -> Arc<DatasetService> {
    Arc::new(DatasetService::new(host.clone(), &ZfsConfig::default()))
}

pub fn resource_for(host: &Arc<FakeZfsHost>) -> DatasetResource {
    DatasetResource::new(service_for(host))
}
