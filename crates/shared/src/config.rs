//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::observability::ObservabilityConfig;

/// 环境变量前缀
const ENV_PREFIX: &str = "HABIT";

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（HABIT_ 前缀，层级用双下划线分隔，如 HABIT_REWARD__LEVEL_XP_BASE -> reward.level_xp_base）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let mut config: Self = builder(service_name)?.build()?.try_deserialize()?;
        if config.observability.service_name.is_empty() {
            config.observability.service_name = config.service_name.clone();
        }
        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// 加载配置中的某一段（如 `reward`），该段缺失时使用默认值
///
/// 与 [`AppConfig::load`] 使用同一套文件与环境变量层级。
pub fn load_section<T>(service_name: &str, key: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let config = builder(service_name)?.build()?;
    match config.get::<T>(key) {
        Ok(value) => Ok(value),
        Err(ConfigError::NotFound(_)) => Ok(T::default()),
        Err(e) => Err(e),
    }
}

fn builder(service_name: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let env = std::env::var("HABIT_ENV").unwrap_or_else(|_| "development".to_string());
    let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

    let builder = Config::builder()
        .set_default("service_name", service_name)?
        .set_default("environment", env.clone())?
        .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
        .add_source(
            File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
        )
        .add_source(
            File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                .required(false),
        )
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    Ok(builder)
}
