//! checkCompliance, addException, isExcepted.

use canon_analysis::compliance::{ComplianceOptions, ComplianceReport, PatternException};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::runtime::CanonRuntime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckComplianceArgs {
    pub project_id: String,
    /// Source text to check. It is not read from disk.
    pub code: String,
    /// Project-relative path the code belongs to.
    pub file_path: String,
    #[serde(default)]
    pub options: ComplianceOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddExceptionArgs {
    pub project_id: String,
    pub pattern_id: String,
    pub reason: String,
    pub scope_glob: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsExceptedArgs {
    pub project_id: String,
    pub pattern_id: String,
    pub file_path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsExceptedResult {
    pub excepted: bool,
}

pub fn check_compliance(rt: &CanonRuntime, args: CheckComplianceArgs) -> Result<ComplianceReport, ApiError> {
    let handle = rt.project(&args.project_id)?;
    Ok(handle
        .detector
        .check_compliance(&args.code, &args.file_path, &args.options)?)
}

pub fn add_exception(rt: &CanonRuntime, args: AddExceptionArgs) -> Result<PatternException, ApiError> {
    let handle = rt.project(&args.project_id)?;
    Ok(handle
        .detector
        .add_exception(&args.pattern_id, &args.reason, &args.scope_glob)?)
}

pub fn is_excepted(rt: &CanonRuntime, args: IsExceptedArgs) -> Result<IsExceptedResult, ApiError> {
    let handle = rt.project(&args.project_id)?;
    let excepted = handle.detector.is_excepted(&args.pattern_id, &args.file_path)?;
    Ok(IsExceptedResult { excepted })
}
