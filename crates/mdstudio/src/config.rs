use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs::try_exists;

use crate::highlight::DEFAULT_THEME;
use crate::scroll_sync::SyncMode;

const CONFIG_PATH_VAR: &str = "MDSTUDIO_CONFIG_PATH";
const CONFIG_DIR_VAR: &str = "MDSTUDIO_CONFIG_DIR";
const DATA_DIR_VAR: &str = "MDSTUDIO_DATA_DIR";

const DEFAULT_TAB_SIZE: usize = 4;
const DEFAULT_DOCUMENT_TITLE: &str = "Markdown Studio";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub editor: EditorConfig,
    pub sync: SyncConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub export: ExportConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    pub tab_size: usize,
    pub line_numbers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub mode: SyncMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    pub document_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    pub preview: PreviewStyle,
    /// syntect theme for fenced code blocks in the preview.
    #[serde(default = "default_code_theme")]
    pub code_theme: String,
}

fn default_code_theme() -> String {
    DEFAULT_THEME.to_string()
}

/// How the preview pane shows the sanitized markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviewStyle {
    Rendered,
    Markup,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            editor: EditorConfig {
                tab_size: DEFAULT_TAB_SIZE,
                line_numbers: true,
            },
            sync: SyncConfig {
                mode: SyncMode::EditorDrivesPreview,
            },
            storage: StorageConfig::default(),
            export: ExportConfig {
                directory: None,
                document_title: String::from(DEFAULT_DOCUMENT_TITLE),
            },
            ui: UiConfig {
                preview: PreviewStyle::Rendered,
                code_theme: default_code_theme(),
            },
        }
    }
}

impl Config {
    pub async fn load() -> Result<Self> {
        if let Some(config_path) = Self::config_path() {
            if try_exists(&config_path).await? {
                match tokio::fs::read_to_string(&config_path).await {
                    Ok(content) => {
                        if content.trim().is_empty() {
                            log::warn!("Config file is empty, creating new one");
                            let default_config = Self::default();
                            let _ = default_config.save().await;
                            return Ok(default_config);
                        }

                        match serde_json::from_str::<Self>(&content) {
                            Ok(mut config) => {
                                config.validate()?;
                                log::info!(
                                    "Successfully loaded config from: {}",
                                    config_path.display()
                                );
                                return Ok(config);
                            }
                            Err(json_err) => {
                                log::error!("Failed to parse config file: {}", json_err);

                                let backup_path = config_path.with_extension("bak");
                                if let Err(e) = tokio::fs::copy(&config_path, &backup_path).await {
                                    log::warn!("Failed to backup broken config: {}", e);
                                } else {
                                    log::info!(
                                        "Backed up broken config to: {}",
                                        backup_path.display()
                                    );
                                }

                                let default_config = Self::default();
                                let _ = default_config.save().await;
                                return Ok(default_config);
                            }
                        }
                    }
                    Err(io_err) => {
                        log::error!("Failed to read config file: {}", io_err);
                    }
                }
            } else {
                log::info!("Config file does not exist, creating default");
            }
        }

        let default_config = Self::default();
        let _ = default_config.save().await;
        Ok(default_config)
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_path() {
            let mut config_to_save = self.clone();
            config_to_save.validate()?;

            if let Some(parent) = config_path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow::anyhow!(
                        "Failed to create config directory: {} - {}",
                        parent.display(),
                        e
                    )
                })?;
            }

            let content = serde_json::to_string_pretty(&config_to_save)
                .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
            tokio::fs::write(&config_path, content).await.map_err(|e| {
                anyhow::anyhow!(
                    "Failed to write config file: {} - {}",
                    config_path.display(),
                    e
                )
            })?;
            log::info!("Successfully saved config to: {}", config_path.display());
        }
        Ok(())
    }

    /// Validate configuration values and fix invalid ones
    pub fn validate(&mut self) -> Result<()> {
        let mut has_issues = false;

        if self.editor.tab_size == 0 || self.editor.tab_size > 16 {
            log::warn!("Invalid tab size: {}, using default", self.editor.tab_size);
            self.editor.tab_size = DEFAULT_TAB_SIZE;
            has_issues = true;
        }

        if self.export.document_title.trim().is_empty() {
            log::warn!("Empty document title, using default");
            self.export.document_title = DEFAULT_DOCUMENT_TITLE.to_string();
            has_issues = true;
        }

        if self.ui.code_theme.trim().is_empty() {
            log::warn!("Empty code theme, using default");
            self.ui.code_theme = default_code_theme();
            has_issues = true;
        }

        if self
            .storage
            .data_dir
            .as_ref()
            .is_some_and(|dir| dir.as_os_str().is_empty())
        {
            log::warn!("Empty storage directory, using platform default");
            self.storage.data_dir = None;
            has_issues = true;
        }

        if has_issues {
            log::info!("Configuration validation completed with corrections");
        }

        Ok(())
    }

    /// Where the buffer store keeps its file. `None` when no platform
    /// directory can be determined.
    pub fn data_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.storage.data_dir {
            return Some(dir.clone());
        }

        if let Ok(dir) = std::env::var(DATA_DIR_VAR) {
            return Some(PathBuf::from(dir));
        }

        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Target directory for exports; defaults to the working directory.
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("com", "mdstudio", "mdstudio")
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
            return Some(PathBuf::from(path));
        }

        if let Ok(dir) = std::env::var(CONFIG_DIR_VAR) {
            return Some(PathBuf::from(dir).join("config.json"));
        }

        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }
}
