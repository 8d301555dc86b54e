//! Artifacts and the messages signed for them

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::cert::MachineComponent;
use crate::error::{ArtifactError, Result};

/// Kind of exported artifact
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    /// A single ballot package file
    #[display("ballot_package")]
    BallotPackage,
    /// A directory of cast vote records
    #[display("cast_vote_records")]
    CastVoteRecords,
}

impl ArtifactType {
    /// Machine components allowed to sign this kind of artifact
    pub const fn allowed_signers(&self) -> &'static [MachineComponent] {
        match self {
            Self::BallotPackage => &[MachineComponent::Admin],
            Self::CastVoteRecords => &[MachineComponent::Scan, MachineComponent::CentralScan],
        }
    }

    /// Prefix binding the message to the artifact type
    fn message_prefix(&self) -> String {
        format!("1//{self}//")
    }
}

/// An exported file or directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Kind of artifact
    pub artifact_type: ArtifactType,
    /// File for a ballot package, directory for cast vote records
    pub path: PathBuf,
}

impl Artifact {
    /// A ballot package file
    pub fn ballot_package(path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_type: ArtifactType::BallotPackage,
            path: path.into(),
        }
    }

    /// A cast vote record directory
    pub fn cast_vote_records(path: impl Into<PathBuf>) -> Self {
        Self {
            artifact_type: ArtifactType::CastVoteRecords,
            path: path.into(),
        }
    }

    /// The bytes that get signed
    ///
    /// A ballot package is signed over its contents. Cast vote records are
    /// signed over a checksum manifest of the directory, so the message does
    /// not depend on directory enumeration order.
    pub fn message(&self) -> Result<Vec<u8>> {
        let mut message = self.artifact_type.message_prefix().into_bytes();
        match self.artifact_type {
            ArtifactType::BallotPackage => message.extend(fs::read(&self.path)?),
            ArtifactType::CastVoteRecords => message.extend(directory_manifest(&self.path)?),
        }
        Ok(message)
    }
}

/// One `"{sha256 hex}  {relative path}\n"` line per file, sorted by path
///
/// Relative paths use `/` separators on every platform. Anything other than
/// regular files and directories, symlinks included, is an error.
pub fn directory_manifest(root: &Path) -> Result<Vec<u8>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        // every non-directory entry must be a regular file
        if !file_type.is_file() {
            return Err(ArtifactError::UnsupportedEntry(entry.into_path()));
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| ArtifactError::NonUtf8Path(entry.path().to_path_buf()))?;
        let components = relative
            .components()
            .map(|component| {
                component
                    .as_os_str()
                    .to_str()
                    .ok_or_else(|| ArtifactError::NonUtf8Path(entry.path().to_path_buf()))
            })
            .collect::<Result<Vec<_>>>()?;
        files.push((components.join("/"), entry.into_path()));
    }
    files.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut manifest = Vec::new();
    for (relative, path) in files {
        let digest = Sha256::digest(fs::read(&path)?);
        writeln!(manifest, "{}  {relative}", hex::encode(digest))?;
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ballot_package_message() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballot-package.zip");
        fs::write(&path, b"contents").unwrap();

        let message = Artifact::ballot_package(&path).message().unwrap();
        assert_eq!(message, b"1//ballot_package//contents");
    }

    #[test]
    fn test_manifest_is_sorted_with_forward_slashes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("z.json"), b"z").unwrap();
        fs::write(dir.path().join("b/nested/cvr.json"), b"").unwrap();
        fs::write(dir.path().join("a.json"), b"a").unwrap();

        let manifest = String::from_utf8(directory_manifest(dir.path()).unwrap()).unwrap();
        let lines: Vec<&str> = manifest.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("  a.json"));
        assert!(lines[1].ends_with("  b/nested/cvr.json"));
        assert!(lines[2].ends_with("  z.json"));
        assert_eq!(
            lines[1],
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855  b/nested/cvr.json"
        );
    }

    #[test]
    fn test_manifest_ignores_creation_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        for name in ["1", "2", "3", "10"] {
            fs::write(first.path().join(name), name).unwrap();
        }
        for name in ["10", "3", "2", "1"] {
            fs::write(second.path().join(name), name).unwrap();
        }
        assert_eq!(
            directory_manifest(first.path()).unwrap(),
            directory_manifest(second.path()).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_manifest_rejects_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cvr-1.json"), b"{}").unwrap();
        fs::write(outside.path().join("forged.json"), b"{}").unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("forged.json"),
            dir.path().join("cvr-2.json"),
        )
        .unwrap();

        let err = directory_manifest(dir.path()).unwrap_err();
        assert!(
            matches!(&err, ArtifactError::UnsupportedEntry(path) if path.ends_with("cvr-2.json")),
            "{err}"
        );
    }

    #[test]
    fn test_allowed_signers() {
        assert_eq!(
            ArtifactType::BallotPackage.allowed_signers(),
            &[MachineComponent::Admin]
        );
        assert!(
            ArtifactType::CastVoteRecords
                .allowed_signers()
                .contains(&MachineComponent::CentralScan)
        );
    }
}
