use crate::error::RenameError;
use crate::metadata::ImageDescriptor;
use crate::registry::NameRegistry;
use std::fs::{self, DirBuilder};
use std::io;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameAction {
    DryRun,
    Moved,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Renamer {
    pub dry_run: bool,
}

impl Renamer {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Moves the file to its computed name. A missing destination directory
    /// is created once, with the source directory's mode plus search bits,
    /// and the move is retried exactly once.
    pub fn apply(&self, desc: &ImageDescriptor) -> Result<RenameAction, RenameError> {
        self.apply_with(desc, None)
    }

    /// Like [`Renamer::apply`], but a live destination is reserved in
    /// `registry` right before the move and released again if it fails.
    /// Dry runs and refused destinations never reserve anything.
    pub fn apply_tracked(
        &self,
        desc: &ImageDescriptor,
        registry: &NameRegistry,
    ) -> Result<RenameAction, RenameError> {
        self.apply_with(desc, Some(registry))
    }

    fn apply_with(
        &self,
        desc: &ImageDescriptor,
        registry: Option<&NameRegistry>,
    ) -> Result<RenameAction, RenameError> {
        let from = desc.original_path();
        let to = desc
            .new_path
            .as_deref()
            .ok_or_else(|| RenameError::MissingTarget(from.to_path_buf()))?;

        if from == to {
            return Ok(RenameAction::Unchanged);
        }
        if self.dry_run {
            return Ok(RenameAction::DryRun);
        }
        if fs::symlink_metadata(to).is_ok() {
            return Err(RenameError::DestinationExists(to.to_path_buf()));
        }

        if let Some(registry) = registry {
            registry.reserve_target(to.to_path_buf());
        }
        let moved = move_file(from, to);
        if let (Err(_), Some(registry)) = (&moved, registry) {
            registry.release_target(to);
        }
        moved.map(|()| RenameAction::Moved)
    }
}

fn move_file(from: &Path, to: &Path) -> Result<(), RenameError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound && missing_parent(to) => {
            create_target_dir(from, to)?;
            fs::rename(from, to).map_err(|source| move_err(from, to, source))
        }
        Err(source) => Err(move_err(from, to, source)),
    }
}

fn move_err(from: &Path, to: &Path, source: io::Error) -> RenameError {
    RenameError::Move {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    }
}

fn missing_parent(to: &Path) -> bool {
    to.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| !p.exists())
        .unwrap_or(false)
}

fn create_target_dir(from: &Path, to: &Path) -> Result<(), RenameError> {
    let Some(dir) = to.parent() else {
        return Ok(());
    };
    let mode = inherited_dir_mode(from)?;
    debug!(dir = %dir.display(), mode = %format!("{mode:o}"), "creating destination directory");

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    set_mode(&mut builder, mode);
    builder.create(dir).map_err(|source| RenameError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Permission bits for new directories: those of the directory holding
/// `from` (or of `from` itself when that directory cannot be read), plus
/// the execute/search bits.
pub fn inherited_dir_mode(from: &Path) -> Result<u32, RenameError> {
    let source_dir = match from.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let meta = fs::metadata(source_dir)
        .or_else(|_| fs::metadata(from))
        .map_err(|source| RenameError::SourcePermissions {
            path: source_dir.to_path_buf(),
            source,
        })?;
    Ok((permission_bits(&meta) | 0o111) & 0o7777)
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o555
    } else {
        0o755
    }
}

#[cfg(unix)]
fn set_mode(builder: &mut DirBuilder, mode: u32) {
    use std::os::unix::fs::DirBuilderExt;
    builder.mode(mode);
}

#[cfg(not(unix))]
fn set_mode(_builder: &mut DirBuilder, _mode: u32) {}
