//! Loading and saving maps off the main thread.
//!
//! A [`MapDocument`] owns the grid. Starting a save moves the grid into the
//! worker thread, so nothing can edit it until the save is done; starting a
//! load parks the current grid until the new one arrives. Only one task runs
//! at a time and tasks cannot be cancelled.

use crate::error::{MapError, TaskError};
use crate::ir_map::LoadReport;
use crate::loader;
use crate::map::MapGrid;
use crate::registry::TileRegistry;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Load,
    Save,
}

#[derive(Debug)]
pub enum TaskOutcome {
    Saved { path: PathBuf },
    Loaded { path: PathBuf, report: LoadReport },
    /// After a failed load the previous grid is back in place.
    Failed {
        kind: TaskKind,
        path: PathBuf,
        error: MapError,
    },
}

#[derive(Debug)]
pub enum TaskStatus {
    Idle,
    Running,
    Done(TaskOutcome),
}

enum Job {
    Save(JoinHandle<(MapGrid, Result<(), MapError>)>),
    Load {
        previous: Option<MapGrid>,
        handle: JoinHandle<Result<(MapGrid, LoadReport), MapError>>,
    },
}

struct Task {
    path: PathBuf,
    job: Job,
}

impl Task {
    fn is_finished(&self) -> bool {
        match &self.job {
            Job::Save(handle) => handle.is_finished(),
            Job::Load { handle, .. } => handle.is_finished(),
        }
    }
}

/// The map an editor or game is working on, plus at most one background
/// load or save.
pub struct MapDocument {
    registry: Arc<TileRegistry>,
    grid: Option<MapGrid>,
    task: Option<Task>,
}

impl MapDocument {
    pub fn new(registry: Arc<TileRegistry>) -> Self {
        MapDocument {
            registry,
            grid: None,
            task: None,
        }
    }

    pub fn with_grid(registry: Arc<TileRegistry>, grid: MapGrid) -> Self {
        MapDocument {
            registry,
            grid: Some(grid),
            task: None,
        }
    }

    pub fn registry(&self) -> &Arc<TileRegistry> {
        &self.registry
    }

    /// The grid, or `None` while a task holds it or before any map exists.
    pub fn grid(&self) -> Option<&MapGrid> {
        if self.task.is_some() {
            return None;
        }
        self.grid.as_ref()
    }

    pub fn grid_mut(&mut self) -> Option<&mut MapGrid> {
        if self.task.is_some() {
            return None;
        }
        self.grid.as_mut()
    }

    /// Replaces the grid, handing back the old one.
    pub fn set_grid(&mut self, grid: MapGrid) -> Result<Option<MapGrid>, TaskError> {
        if self.task.is_some() {
            return Err(TaskError::Busy);
        }
        Ok(self.grid.replace(grid))
    }

    pub fn is_busy(&self) -> bool {
        self.task.is_some()
    }

    pub fn begin_save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), TaskError> {
        if self.task.is_some() {
            return Err(TaskError::Busy);
        }
        let grid = self.grid.take().ok_or(TaskError::NoMap)?;
        let path = path.as_ref().to_path_buf();
        log::info!("saving map to {}", path.display());

        let target = path.clone();
        let handle = thread::spawn(move || {
            let saved =
                panic::catch_unwind(AssertUnwindSafe(|| loader::save_map_file(&grid, &target)));
            let result = saved.unwrap_or_else(|_| {
                Err(MapError::TaskPanicked {
                    path: target.clone(),
                })
            });
            (grid, result)
        });
        self.task = Some(Task {
            path,
            job: Job::Save(handle),
        });
        Ok(())
    }

    pub fn begin_load<P: AsRef<Path>>(&mut self, path: P) -> Result<(), TaskError> {
        if self.task.is_some() {
            return Err(TaskError::Busy);
        }
        let path = path.as_ref().to_path_buf();
        log::info!("loading map from {}", path.display());

        let registry = Arc::clone(&self.registry);
        let source = path.clone();
        let handle = thread::spawn(move || loader::load_map_file(&source, &registry));
        self.task = Some(Task {
            path,
            job: Job::Load {
                previous: self.grid.take(),
                handle,
            },
        });
        Ok(())
    }

    /// Non-blocking check on the running task. `Done` is reported once; the
    /// grid is available again from then on.
    pub fn poll(&mut self) -> TaskStatus {
        match self.task.take() {
            None => TaskStatus::Idle,
            Some(task) if !task.is_finished() => {
                self.task = Some(task);
                TaskStatus::Running
            }
            Some(task) => TaskStatus::Done(self.finish(task)),
        }
    }

    /// Blocks until the running task ends. `None` when nothing was running.
    pub fn wait(&mut self) -> Option<TaskOutcome> {
        let task = self.task.take()?;
        Some(self.finish(task))
    }

    fn finish(&mut self, task: Task) -> TaskOutcome {
        let Task { path, job } = task;
        let outcome = match job {
            Job::Save(handle) => match handle.join() {
                Ok((grid, result)) => {
                    self.grid = Some(grid);
                    match result {
                        Ok(()) => TaskOutcome::Saved { path },
                        Err(error) => TaskOutcome::Failed {
                            kind: TaskKind::Save,
                            path,
                            error,
                        },
                    }
                }
                Err(_) => {
                    log::error!("save thread for {} died; the map is lost", path.display());
                    TaskOutcome::Failed {
                        kind: TaskKind::Save,
                        error: MapError::TaskPanicked { path: path.clone() },
                        path,
                    }
                }
            },
            Job::Load { previous, handle } => match handle.join() {
                Ok(Ok((grid, report))) => {
                    self.grid = Some(grid);
                    TaskOutcome::Loaded { path, report }
                }
                Ok(Err(error)) => {
                    self.grid = previous;
                    TaskOutcome::Failed {
                        kind: TaskKind::Load,
                        path,
                        error,
                    }
                }
                Err(_) => {
                    self.grid = previous;
                    TaskOutcome::Failed {
                        kind: TaskKind::Load,
                        error: MapError::TaskPanicked { path: path.clone() },
                        path,
                    }
                }
            },
        };

        match &outcome {
            TaskOutcome::Failed { kind, path, error } => {
                log::warn!("{kind:?} of {} failed: {error}", path.display())
            }
            TaskOutcome::Loaded { report, .. } if !report.unknown_tiles.is_empty() => {
                log::warn!("{} cells referenced unknown tiles", report.unknown_tiles.len())
            }
            _ => {}
        }
        outcome
    }
}
