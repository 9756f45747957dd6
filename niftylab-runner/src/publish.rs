//! Publishing: write every artifact to `*.tmp`, then move them all into place.
//!
//! Renames only start once every file has been written, so a failed write
//! leaves the previously published set untouched. Each rename first moves the
//! old file to `*.bak`; if a later rename fails, the files already moved are
//! restored from those backups. `manifest.json` is renamed last and records
//! what was published and the BLAKE3 hash of each file.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{OutputConfig, PipelineConfig};
use crate::export::{write_daily_csv, write_daily_parquet, write_yearly_csv, ExportError};
use crate::pipeline::PipelineOutput;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("cannot create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: ExportError },

    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {} into place: {source}", .path.display())]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("manifest serialization: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// One published file and its content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub blake3: String,
}

/// Where the volatility column came from on this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityProvenance {
    pub column: String,
    pub resolved_by: Option<String>,
    pub points: usize,
    /// Daily rows that received a value.
    pub coverage: usize,
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub rows_in: usize,
    pub archive_rows: usize,
    pub live_rows: usize,
    pub duplicates_removed: usize,
    pub cross_source_overlaps: usize,
    pub coercion_drops: usize,
}

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: NaiveDateTime,
    pub rows: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub has_volume: bool,
    pub years: usize,
    pub skipped_years: Vec<i32>,
    pub volatility: VolatilityProvenance,
    pub merge: MergeSummary,
    pub files: Vec<FileEntry>,
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self, PublishError> {
        let text = fs::read_to_string(path).map_err(|source| PublishError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Result of a publish.
#[derive(Debug, Clone)]
pub struct Published {
    pub manifest: Manifest,
    /// Final paths, manifest last.
    pub paths: Vec<PathBuf>,
    /// Publish-command invocations that did not exit successfully.
    pub hook_failures: usize,
}

/// Writes a run's artifacts into the output directory.
#[derive(Debug, Clone)]
pub struct Publisher {
    output: OutputConfig,
    volatility_column: String,
    command: Vec<String>,
}

/// A file written to its temporary path, waiting to be renamed.
struct Staged {
    tmp: PathBuf,
    path: PathBuf,
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn discard(staged: &[Staged]) {
    for s in staged {
        let _ = fs::remove_file(&s.tmp);
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    PathBuf::from(name)
}

/// A file moved into place, with the previous version it displaced.
struct Installed {
    path: PathBuf,
    backup: Option<PathBuf>,
}

/// Move the previous file aside, then the staged file into place.
fn install(s: &Staged) -> std::io::Result<Installed> {
    let backup = if s.path.exists() {
        let backup = backup_path(&s.path);
        fs::rename(&s.path, &backup)?;
        Some(backup)
    } else {
        None
    };
    if let Err(e) = fs::rename(&s.tmp, &s.path) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, &s.path);
        }
        return Err(e);
    }
    Ok(Installed {
        path: s.path.clone(),
        backup,
    })
}

/// Restore the previous versions of files already moved into place.
fn roll_back(installed: &[Installed]) {
    for done in installed.iter().rev() {
        let restored = match &done.backup {
            Some(backup) => fs::rename(backup, &done.path),
            None => fs::remove_file(&done.path),
        };
        if let Err(e) = restored {
            tracing::error!(file = %done.path.display(), error = %e, "could not restore previous file");
        }
    }
}

impl Publisher {
    pub fn new(output: OutputConfig, volatility_column: impl Into<String>, command: Vec<String>) -> Self {
        Self {
            output,
            volatility_column: volatility_column.into(),
            command,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.output.clone(),
            config.volatility.column.as_str(),
            config.publish.command.clone(),
        )
    }

    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Write the daily CSV, the yearly CSV, the optional Parquet mirror and
    /// the manifest, then run the publish command for each file.
    pub fn publish(&self, run: &PipelineOutput) -> Result<Published, PublishError> {
        let dir = &self.output.dir;
        fs::create_dir_all(dir).map_err(|source| PublishError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let mut staged: Vec<Staged> = Vec::new();
        let mut files: Vec<FileEntry> = Vec::new();

        let result = self.stage_all(run, &mut staged, &mut files);
        if let Err(e) = result {
            discard(&staged);
            return Err(e);
        }

        let manifest = self.manifest(run, files);
        let manifest_path = self.output.manifest_path();
        let json = serde_json::to_string_pretty(&manifest)?;
        let tmp = tmp_path(&manifest_path);
        if let Err(e) = fs::write(&tmp, json) {
            discard(&staged);
            return Err(PublishError::Write {
                path: manifest_path,
                source: ExportError::Io(e),
            });
        }
        staged.push(Staged {
            tmp,
            path: manifest_path,
        });

        let mut installed: Vec<Installed> = Vec::with_capacity(staged.len());
        for (i, s) in staged.iter().enumerate() {
            match install(s) {
                Ok(done) => installed.push(done),
                Err(source) => {
                    discard(&staged[i..]);
                    roll_back(&installed);
                    return Err(PublishError::Rename {
                        path: s.path.clone(),
                        source,
                    });
                }
            }
        }
        for done in &installed {
            if let Some(backup) = &done.backup {
                let _ = fs::remove_file(backup);
            }
        }
        let paths: Vec<PathBuf> = installed.into_iter().map(|done| done.path).collect();
        tracing::info!(dir = %dir.display(), files = paths.len(), "published");

        let hook_failures = paths.iter().filter(|p| !self.run_command(p)).count();
        Ok(Published {
            manifest,
            paths,
            hook_failures,
        })
    }

    fn stage_all(
        &self,
        run: &PipelineOutput,
        staged: &mut Vec<Staged>,
        files: &mut Vec<FileEntry>,
    ) -> Result<(), PublishError> {
        let column = self.volatility_column.as_str();

        self.stage(self.output.daily_path(), staged, files, |tmp| {
            let file = fs::File::create(tmp)?;
            write_daily_csv(BufWriter::new(file), &run.series, column)
        })?;

        self.stage(self.output.yearly_path(), staged, files, |tmp| {
            let file = fs::File::create(tmp)?;
            write_yearly_csv(BufWriter::new(file), &run.yearly)
        })?;

        if self.output.parquet {
            self.stage(self.output.parquet_path(), staged, files, |tmp| {
                write_daily_parquet(tmp, &run.series, column)
            })?;
        }
        Ok(())
    }

    fn stage<F>(
        &self,
        path: PathBuf,
        staged: &mut Vec<Staged>,
        files: &mut Vec<FileEntry>,
        write: F,
    ) -> Result<(), PublishError>
    where
        F: FnOnce(&Path) -> Result<(), ExportError>,
    {
        let tmp = tmp_path(&path);
        let written = write(&tmp).and_then(|()| fs::read(&tmp).map_err(ExportError::from));
        let bytes = match written {
            Ok(bytes) => bytes,
            Err(source) => {
                let _ = fs::remove_file(&tmp);
                return Err(PublishError::Write { path, source });
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        files.push(FileEntry {
            name,
            blake3: blake3::hash(&bytes).to_hex().to_string(),
        });
        staged.push(Staged { tmp, path });
        Ok(())
    }

    fn manifest(&self, run: &PipelineOutput, files: Vec<FileEntry>) -> Manifest {
        Manifest {
            generated_at: chrono::Local::now().naive_local(),
            rows: run.series.len(),
            first_date: run.series.first_date(),
            last_date: run.series.last_date(),
            has_volume: run.series.has_volume(),
            years: run.yearly.metrics.len(),
            skipped_years: run.yearly.skipped.iter().map(|s| s.year).collect(),
            volatility: VolatilityProvenance {
                column: self.volatility_column.clone(),
                resolved_by: run.volatility.resolved_by.clone(),
                points: run.volatility.points.len(),
                coverage: run.series.volatility_coverage(),
                failures: run
                    .volatility
                    .failures
                    .iter()
                    .map(|(name, err)| format!("{name}: {err}"))
                    .collect(),
            },
            merge: MergeSummary {
                rows_in: run.merge.rows_in,
                archive_rows: run.archive_rows,
                live_rows: run.live_rows,
                duplicates_removed: run.merge.duplicates_removed,
                cross_source_overlaps: run.merge.cross_source_overlaps,
                coercion_drops: run.merge.coercion_drops.len(),
            },
            files,
        }
    }

    /// Run the publish command for one file. Returns false on failure; a
    /// failing hook never undoes the publish.
    fn run_command(&self, path: &Path) -> bool {
        let Some((program, args)) = self.command.split_first() else {
            return true;
        };
        let path_str = path.to_string_lossy();
        let args: Vec<String> = args.iter().map(|a| a.replace("{path}", &path_str)).collect();

        match Command::new(program).args(&args).status() {
            Ok(status) if status.success() => {
                tracing::debug!(program = %program, file = %path.display(), "publish command succeeded");
                true
            }
            Ok(status) => {
                tracing::warn!(program = %program, file = %path.display(), %status, "publish command failed");
                false
            }
            Err(e) => {
                tracing::warn!(program = %program, file = %path.display(), error = %e, "publish command could not start");
                false
            }
        }
    }
}
