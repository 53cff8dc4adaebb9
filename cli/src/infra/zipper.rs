//! Zip archiving of application bits.

use std::fs::File;
use std::io::{self, Read as _, Write as _};
use std::path::{Component, Path};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::application::ports::Archiver;
use crate::domain::CfIgnore;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Production implementation of `Archiver` backed by the `zip` crate.
pub struct ZipArchiver;

fn load_ignore(dir: &Path) -> Result<CfIgnore> {
    let path = dir.join(".cfignore");
    match std::fs::read_to_string(&path) {
        Ok(contents) => CfIgnore::parse(&contents),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(CfIgnore::default()),
        Err(e) => Err(e).with_context(|| format!("cannot read {}", path.display())),
    }
}

/// `/`-separated path of `path` below `root`.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

#[cfg(unix)]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(meta: &std::fs::Metadata) -> u32 {
    if meta.is_dir() { 0o755 } else { 0o644 }
}

fn write_archive(dir: &Path, ignore: &CfIgnore, out: &File) -> Result<()> {
    let mut writer = ZipWriter::new(out);
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            relative_name(dir, entry.path()).is_some_and(|name| !ignore.should_ignore(&name))
        });

    for entry in walker {
        let entry = entry.context("cannot walk application directory")?;
        let Some(name) = relative_name(dir, entry.path()) else {
            continue;
        };
        let meta = entry
            .path()
            .symlink_metadata()
            .with_context(|| format!("cannot stat {}", entry.path().display()))?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(mode_of(&meta));

        if meta.file_type().is_symlink() {
            let target = std::fs::read_link(entry.path())
                .with_context(|| format!("cannot read link {}", entry.path().display()))?;
            writer.add_symlink(name, target.to_string_lossy().into_owned(), options)?;
        } else if meta.is_dir() {
            writer.add_directory(format!("{name}/"), options)?;
        } else {
            writer.start_file(name, options)?;
            let mut file = File::open(entry.path())
                .with_context(|| format!("cannot open {}", entry.path().display()))?;
            io::copy(&mut file, &mut writer)?;
        }
    }
    writer.finish()?;
    Ok(())
}

impl Archiver for ZipArchiver {
    fn is_zip_file(&self, path: &Path) -> bool {
        File::open(path).is_ok_and(|file| ZipArchive::new(file).is_ok())
    }

    fn zip(&self, dir: &Path) -> Result<NamedTempFile> {
        if !dir.is_dir() {
            bail!("{} must be a directory", dir.display());
        }
        let ignore = load_ignore(dir)?;
        let archive = tempfile::Builder::new()
            .prefix("droplet-bits")
            .suffix(".zip")
            .tempfile()
            .context("cannot create temporary archive")?;
        write_archive(dir, &ignore, archive.as_file())?;
        tracing::debug!(source = %dir.display(), archive = %archive.path().display(), "zipped application bits");
        Ok(archive)
    }

    fn unzip(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file =
            File::open(archive).with_context(|| format!("cannot open {}", archive.display()))?;
        let mut zip = ZipArchive::new(file)
            .with_context(|| format!("{} is not a zip archive", archive.display()))?;
        std::fs::create_dir_all(dest)
            .with_context(|| format!("cannot create {}", dest.display()))?;
        let root = dest
            .canonicalize()
            .with_context(|| format!("cannot resolve {}", dest.display()))?;

        // Applied last so read-only directories can still receive their children.
        let mut dir_modes = Vec::new();

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let Some(rel) = entry.enclosed_name() else {
                bail!("refusing to extract {} outside of destination", entry.name());
            };
            refuse_symlinked_path(&root, &rel)?;
            let target = root.join(&rel);
            let mode = entry.unix_mode();

            if entry.is_dir() {
                std::fs::create_dir_all(&target)
                    .with_context(|| format!("cannot create {}", target.display()))?;
                if let Some(mode) = mode {
                    dir_modes.push((target, mode));
                }
                continue;
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create {}", parent.display()))?;
            }

            if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
                let mut link = String::new();
                entry.read_to_string(&mut link)?;
                if !link_stays_inside(&rel, Path::new(&link)) {
                    bail!(
                        "refusing to extract symlink {} pointing outside of destination",
                        entry.name()
                    );
                }
                create_symlink(&link, &target)?;
                continue;
            }

            let mut out = File::create(&target)
                .with_context(|| format!("cannot create {}", target.display()))?;
            io::copy(&mut entry, &mut out)?;
            out.flush()?;
            #[cfg(unix)]
            if let Some(mode) = mode {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode & 0o7777))?;
            }
        }

        #[cfg(unix)]
        for (dir, mode) in dir_modes.iter().rev() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(mode & 0o7777))
                .with_context(|| format!("cannot set mode of {}", dir.display()))?;
        }
        #[cfg(not(unix))]
        drop(dir_modes);
        Ok(())
    }
}

/// Fails if `rel`, or any directory on the way to it, is already a symlink
/// below `root`. Writing there would follow the link.
fn refuse_symlinked_path(root: &Path, rel: &Path) -> Result<()> {
    let mut current = root.to_path_buf();
    for component in rel.components() {
        current.push(component);
        match current.symlink_metadata() {
            Ok(meta) if meta.file_type().is_symlink() => {
                bail!(
                    "refusing to extract {} through symlink {}",
                    rel.display(),
                    current.display()
                );
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(e).with_context(|| format!("cannot stat {}", current.display()));
            }
        }
    }
    Ok(())
}

/// Whether a symlink at `rel` pointing to `link` resolves below the
/// extraction root, judged lexically.
fn link_stays_inside(rel: &Path, link: &Path) -> bool {
    let mut depth = rel.components().count().saturating_sub(1);
    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

#[cfg(unix)]
fn create_symlink(link: &str, target: &Path) -> Result<()> {
    std::os::unix::fs::symlink(link, target)
        .with_context(|| format!("cannot create symlink {}", target.display()))
}

#[cfg(not(unix))]
fn create_symlink(link: &str, target: &Path) -> Result<()> {
    std::fs::write(target, link).with_context(|| format!("cannot create {}", target.display()))
}
