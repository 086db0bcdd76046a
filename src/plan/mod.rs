use std::path::{Path, PathBuf};

use crate::blocks::ladder::{LadderBuilder, LadderParams};
use crate::cli::progress::StepContext;
use crate::export::{JsonSerializer, Serializer};
use crate::paths::out_json;
use crate::Result;

/// A validated set of ladder parameters, ready to build.
pub struct LadderPlan {
    pub ladder_params: LadderParams,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TaskKey {
    GeneratePlan,
    PlaceRings,
    PlaceHeaters,
    PlacePhaseLine,
    PlacePads,
    Route,
    Center,
    WriteLayout,
}

pub struct ExecutePlanParams<'a> {
    pub work_dir: &'a Path,
    pub plan: &'a LadderPlan,
    /// Indent the written JSON.
    pub pretty: bool,
    pub ctx: Option<&'a mut StepContext>,
}

pub fn generate_plan(params: &LadderParams) -> Result<LadderPlan> {
    params.validate()?;
    Ok(LadderPlan {
        ladder_params: params.clone(),
    })
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

/// Builds the planned ladder and writes its layout into `work_dir`.
///
/// Returns the path of the written layout.
pub fn execute_plan(params: ExecutePlanParams) -> Result<PathBuf> {
    let ExecutePlanParams {
        work_dir,
        plan,
        pretty,
        mut ctx,
    } = params;

    std::fs::create_dir_all(work_dir)?;

    let mut builder = LadderBuilder::new(plan.ladder_params.clone())?;
    builder.place_rings()?;
    try_finish_task!(ctx, TaskKey::PlaceRings);
    builder.place_heaters()?;
    try_finish_task!(ctx, TaskKey::PlaceHeaters);
    builder.place_phase_line()?;
    try_finish_task!(ctx, TaskKey::PlacePhaseLine);
    builder.place_pads()?;
    try_finish_task!(ctx, TaskKey::PlacePads);
    builder.route()?;
    try_finish_task!(ctx, TaskKey::Route);
    let ladder = builder.center()?;
    try_finish_task!(ctx, TaskKey::Center);

    let layout_path = out_json(work_dir, &plan.ladder_params.name);
    JsonSerializer { pretty }.write_to_file(ladder.cell(), &layout_path)?;
    try_finish_task!(ctx, TaskKey::WriteLayout);

    Ok(layout_path)
}
