//! Launcher for the current file selection.
//!
//! The launcher remembers which widget it serves, the action group whose `open` and
//! `execute` entries it keeps in sync with the selection, and the selected files.
//! Activating an action launches each selected file through the registry.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::registry::{FileHandle, FileRegistry, LaunchMode, RegistryError};

/// An action the launcher can perform on the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LauncherAction {
    Open,
    Execute,
}

impl LauncherAction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Execute => "execute",
        }
    }

    fn launch_mode(self) -> LaunchMode {
        match self {
            Self::Open => LaunchMode::Open,
            Self::Execute => LaunchMode::Execute,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action: LauncherAction,
    pub label: String,
    pub sensitive: bool,
}

/// The launcher's menu/toolbar actions, with their current sensitivity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroup {
    name: String,
    actions: Vec<Action>,
}

impl ActionGroup {
    /// Creates a group with `open` and `execute`, both insensitive.
    pub fn new(name: impl Into<String>) -> Self {
        let action = |action, label: &str| Action {
            action,
            label: label.to_string(),
            sensitive: false,
        };
        Self {
            name: name.into(),
            actions: vec![
                action(LauncherAction::Open, "_Open"),
                action(LauncherAction::Execute, "_Execute"),
            ],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn is_sensitive(&self, action: LauncherAction) -> bool {
        self.actions.iter().any(|a| a.action == action && a.sensitive)
    }

    fn set_sensitive(&mut self, action: LauncherAction, sensitive: bool) {
        for entry in self.actions.iter_mut().filter(|a| a.action == action) {
            entry.sensitive = sensitive;
        }
    }
}

/// Identifies the view a launcher is attached to (a window label, for example).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WidgetId(pub String);

/// Outcome of activating an action.
#[derive(Debug, Default)]
pub struct LaunchReport {
    pub launched: usize,
    pub failures: Vec<(PathBuf, RegistryError)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherError {
    /// No files are selected
    NothingSelected,
    /// The action doesn't apply to the current selection
    NotApplicable(LauncherAction),
}

impl fmt::Display for LauncherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingSelected => write!(f, "No files selected"),
            Self::NotApplicable(action) => write!(f, "Action '{}' doesn't apply to the selection", action.name()),
        }
    }
}

impl std::error::Error for LauncherError {}

pub struct Launcher {
    registry: Arc<dyn FileRegistry>,
    widget: Option<WidgetId>,
    action_group: Option<ActionGroup>,
    selected_files: Vec<FileHandle>,
}

impl Launcher {
    pub fn new(registry: Arc<dyn FileRegistry>) -> Self {
        Self {
            registry,
            widget: None,
            action_group: None,
            selected_files: Vec::new(),
        }
    }

    pub fn widget(&self) -> Option<&WidgetId> {
        self.widget.as_ref()
    }

    pub fn set_widget(&mut self, widget: Option<WidgetId>) {
        self.widget = widget;
    }

    pub fn action_group(&self) -> Option<&ActionGroup> {
        self.action_group.as_ref()
    }

    /// Attaches an action group and brings its sensitivity in line with the selection.
    pub fn set_action_group(&mut self, action_group: Option<ActionGroup>) {
        self.action_group = action_group;
        self.update_actions();
    }

    pub fn selected_files(&self) -> &[FileHandle] {
        &self.selected_files
    }

    pub fn set_selected_files(&mut self, selected_files: Vec<FileHandle>) {
        self.selected_files = selected_files;
        self.update_actions();
    }

    /// Whether `action` applies to the current selection.
    ///
    /// `open` needs a non-empty selection; `execute` also needs every file to be executable.
    pub fn can_perform(&self, action: LauncherAction) -> bool {
        if self.selected_files.is_empty() {
            return false;
        }
        match action {
            LauncherAction::Open => true,
            LauncherAction::Execute => self.selected_files.iter().all(|f| self.registry.is_executable(f)),
        }
    }

    fn update_actions(&mut self) {
        let open = self.can_perform(LauncherAction::Open);
        let execute = self.can_perform(LauncherAction::Execute);
        if let Some(group) = self.action_group.as_mut() {
            group.set_sensitive(LauncherAction::Open, open);
            group.set_sensitive(LauncherAction::Execute, execute);
        }
    }

    /// Launches every selected file. A failure for one file doesn't stop the others.
    pub fn activate(&self, action: LauncherAction) -> Result<LaunchReport, LauncherError> {
        if self.selected_files.is_empty() {
            return Err(LauncherError::NothingSelected);
        }
        if !self.can_perform(action) {
            return Err(LauncherError::NotApplicable(action));
        }

        let mut report = LaunchReport::default();
        for file in &self.selected_files {
            match self.registry.launch(file, action.launch_mode()) {
                Ok(()) => report.launched += 1,
                Err(e) => {
                    log::warn!("Launcher: {} failed for {}: {}", action.name(), file.path().display(), e);
                    report.failures.push((file.path().to_path_buf(), e));
                }
            }
        }
        Ok(report)
    }
}
