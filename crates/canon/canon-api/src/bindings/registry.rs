//! linkProject, unlinkProject.

use std::path::PathBuf;

use canon_analysis::registry::{LinkOutcome, Project, ProjectMetadata};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::runtime::CanonRuntime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkProjectArgs {
    pub path: PathBuf,
    #[serde(default)]
    pub metadata: ProjectMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlinkProjectArgs {
    pub project_id: String,
}

pub fn link_project(rt: &CanonRuntime, args: LinkProjectArgs) -> Result<LinkOutcome, ApiError> {
    Ok(rt.registry().link_project(&args.path, &args.metadata)?)
}

/// Soft-delete the project and close its store. Returns the updated record.
pub fn unlink_project(rt: &CanonRuntime, args: UnlinkProjectArgs) -> Result<Project, ApiError> {
    rt.registry().unlink_project(&args.project_id)?;
    rt.release_project(&args.project_id);
    rt.registry()
        .get_project(&args.project_id)?
        .ok_or_else(|| ApiError::unknown_project(&args.project_id))
}
