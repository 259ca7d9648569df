//! Task bodies drafted in an external editor.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Draft files under a directory, edited with an external command.
#[derive(Debug, Clone)]
pub struct Drafts {
    dir: PathBuf,
    editor: String,
}

impl Drafts {
    pub fn new(dir: impl Into<PathBuf>, editor: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            editor: editor.into(),
        }
    }

    /// Draft file for a task; id 0 is the draft of a new task.
    pub fn path(&self, task_id: i64) -> PathBuf {
        let name = if task_id > 0 {
            task_id.to_string()
        } else {
            "new".to_string()
        };
        self.dir.join(name)
    }

    /// Write `body` as the draft for `task_id`.
    pub fn set(&self, task_id: i64, body: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating draft dir {}", self.dir.display()))?;
        fs::write(self.path(task_id), body)?;
        Ok(())
    }

    /// Current draft content; a missing draft reads as empty.
    pub fn get(&self, task_id: i64) -> Result<String> {
        read_or_empty(&self.path(task_id))
    }

    /// Open the draft in the editor and return what was saved.
    ///
    /// With `insert` the editor is asked to start in insert mode.
    pub fn edit(&self, task_id: i64, insert: bool) -> Result<String> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(task_id);

        let mut args: Vec<String> = Vec::new();
        if insert {
            args.push("+startinsert".to_string());
        }
        args.push(path.display().to_string());
        args.push("+9999".to_string());

        debug!(editor = %self.editor, path = %path.display(), "Opening editor");
        let status = Command::new(&self.editor)
            .args(&args)
            .status()
            .with_context(|| format!("running editor {}", self.editor))?;

        if !status.success() {
            bail!("editor {} exited with {}", self.editor, status);
        }

        read_or_empty(&path)
    }
}

fn read_or_empty(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(body) => Ok(body),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(err.into()),
    }
}
