//! Artifact signature commands

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use eyre::WrapErr;
use vxauth_artifact::{Artifact, ArtifactSigner, ArtifactType, ArtifactVerifier, WriteOptions};

/// Kind of artifact on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum ArtifactKind {
    BallotPackage,
    CastVoteRecords,
}

impl ArtifactKind {
    fn artifact(self, path: PathBuf) -> Artifact {
        let artifact_type = match self {
            Self::BallotPackage => ArtifactType::BallotPackage,
            Self::CastVoteRecords => ArtifactType::CastVoteRecords,
        };
        Artifact {
            artifact_type,
            path,
        }
    }
}

fn read(path: &Path) -> eyre::Result<Vec<u8>> {
    std::fs::read(path).wrap_err_with(|| format!("reading {}", path.display()))
}

pub(crate) fn sign_artifact(
    kind: ArtifactKind,
    path: PathBuf,
    key: &Path,
    cert: &Path,
    output_dir: Option<PathBuf>,
    removable_media: bool,
) -> eyre::Result<()> {
    let key_pem = String::from_utf8(read(key)?).wrap_err("key is not PEM")?;
    let signer = ArtifactSigner::from_pem(&key_pem, &read(cert)?)?;

    let options = WriteOptions {
        output_directory: output_dir,
        removable_media,
    };
    let written = signer.sign_to_file(&kind.artifact(path), &options)?;
    println!("Wrote {}", written.display());
    Ok(())
}

pub(crate) fn verify_artifact(
    kind: ArtifactKind,
    path: PathBuf,
    trust_root: &Path,
    signature: Option<&Path>,
) -> eyre::Result<()> {
    let verifier = ArtifactVerifier::new(&read(trust_root)?)?;
    let artifact = kind.artifact(path);
    match signature {
        Some(signature) => verifier.verify_with_signature_file(&artifact, signature)?,
        None => verifier.verify(&artifact)?,
    }
    println!("Authentic: {}", artifact.path.display());
    Ok(())
}
