//! syncProject, getAggregations, getPortfolioView.

use canon_analysis::aggregation::{AggregationFilter, PatternAggregation, PortfolioView, SyncResult};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::runtime::CanonRuntime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProjectArgs {
    pub project_id: String,
}

/// Merge the project's changes since its checkpoint into the global index.
pub fn sync_project(rt: &CanonRuntime, args: SyncProjectArgs) -> Result<SyncResult, ApiError> {
    // Opening the handle attaches the project's store to the aggregator.
    rt.project(&args.project_id)?;
    Ok(rt.aggregator().sync_project(&args.project_id)?)
}

pub fn get_aggregations(
    rt: &CanonRuntime,
    filter: AggregationFilter,
) -> Result<Vec<PatternAggregation>, ApiError> {
    Ok(rt.aggregator().get_aggregations(&filter)?)
}

pub fn get_portfolio_view(rt: &CanonRuntime) -> Result<PortfolioView, ApiError> {
    Ok(rt.aggregator().get_portfolio_view()?)
}
