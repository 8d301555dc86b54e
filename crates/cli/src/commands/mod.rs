//! Command handlers

mod artifact;
mod card;
mod readers;

pub(crate) use artifact::{ArtifactKind, sign_artifact, verify_artifact};
pub(crate) use card::{RoleArg, program_card, unprogram_card, watch};
pub(crate) use readers::list_readers;
