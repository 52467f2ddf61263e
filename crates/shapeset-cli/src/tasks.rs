//! Pipeline task parsing and execution.
//!
//! A pipeline is a flat list of task names and their arguments; tasks run
//! in order, threading one shape set through. `create` or `load` must come
//! before any task that needs a loaded set.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use shapeset::{ShapeId, ShapeSet, SimplifyParams};

pub const TASK_HELP: &str = "\
Tasks:
  create <meshes dir> <labels file>   create a new shape set from OBJ meshes and labels
  load <shapeset file>                load a shape set from file
  save <shapeset file>                save the shape set to file
  save-meshes <meshes dir>            save meshes as OBJ files
  index-borders                       find mesh borders and build the border index
  simplify-borders                    apply edge-collapse simplification to all borders
  reload-vertices <meshes dir>        reload mesh vertex positions from OBJ files
  create-region <shape ids> <obj>     compose a region surface (comma-separated shape ids)
  center-and-scale <max dimension>    center the set on the origin and scale to fit
";

#[derive(Debug)]
pub enum Task {
    Create { meshes_dir: PathBuf, labels: PathBuf },
    Load { path: PathBuf },
    Save { path: PathBuf },
    SaveMeshes { dir: PathBuf },
    IndexBorders,
    SimplifyBorders,
    ReloadVertices { dir: PathBuf },
    CreateRegion { shapes: Vec<ShapeId>, output: PathBuf },
    CenterAndScale { max_dimension: f64 },
}

impl Task {
    fn name(&self) -> &'static str {
        match self {
            Task::Create { .. } => "create",
            Task::Load { .. } => "load",
            Task::Save { .. } => "save",
            Task::SaveMeshes { .. } => "save-meshes",
            Task::IndexBorders => "index-borders",
            Task::SimplifyBorders => "simplify-borders",
            Task::ReloadVertices { .. } => "reload-vertices",
            Task::CreateRegion { .. } => "create-region",
            Task::CenterAndScale { .. } => "center-and-scale",
        }
    }
}

/// Parse the raw argument list into tasks.
pub fn parse_tasks(args: &[String]) -> Result<Vec<Task>> {
    let mut tasks = Vec::new();
    let mut iter = args.iter();

    let mut next_arg = |task: &str, what: &str, iter: &mut std::slice::Iter<String>| {
        iter.next()
            .cloned()
            .with_context(|| format!("task '{task}' is missing its {what} argument"))
    };

    while let Some(name) = iter.next() {
        let task = match name.as_str() {
            "create" => Task::Create {
                meshes_dir: next_arg("create", "meshes directory", &mut iter)?.into(),
                labels: next_arg("create", "labels file", &mut iter)?.into(),
            },
            "load" => Task::Load {
                path: next_arg("load", "shapeset file", &mut iter)?.into(),
            },
            "save" => Task::Save {
                path: next_arg("save", "shapeset file", &mut iter)?.into(),
            },
            "save-meshes" => Task::SaveMeshes {
                dir: next_arg("save-meshes", "meshes directory", &mut iter)?.into(),
            },
            "index-borders" => Task::IndexBorders,
            "simplify-borders" => Task::SimplifyBorders,
            "reload-vertices" => Task::ReloadVertices {
                dir: next_arg("reload-vertices", "meshes directory", &mut iter)?.into(),
            },
            "create-region" => {
                let spec = next_arg("create-region", "shape ids", &mut iter)?;
                let shapes = spec
                    .split(',')
                    .map(|s| {
                        s.parse::<ShapeId>()
                            .map_err(|e| anyhow::anyhow!("{e}"))
                            .with_context(|| format!("invalid region definition '{spec}'"))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Task::CreateRegion {
                    shapes,
                    output: next_arg("create-region", "output obj file", &mut iter)?.into(),
                }
            }
            "center-and-scale" => {
                let value = next_arg("center-and-scale", "max dimension", &mut iter)?;
                Task::CenterAndScale {
                    max_dimension: value
                        .parse()
                        .with_context(|| format!("invalid max dimension '{value}'"))?,
                }
            }
            other => bail!("unknown task '{other}'"),
        };
        tasks.push(task);
    }

    Ok(tasks)
}

/// Run a parsed pipeline.
pub fn run_tasks(tasks: &[Task], verbose: bool) -> Result<()> {
    let mut state: Option<ShapeSet> = None;

    for task in tasks {
        if verbose {
            eprintln!("{} {}", "Running".cyan(), task.name());
        }
        match task {
            Task::Create { meshes_dir, labels } => {
                state = Some(
                    ShapeSet::create_from_dir(meshes_dir, labels)
                        .context("creating shape set")?,
                );
            }
            Task::Load { path } => {
                state = Some(
                    ShapeSet::read_file(path)
                        .with_context(|| format!("loading {}", path.display()))?,
                );
            }
            Task::Save { path } => {
                let ss = require(&mut state, task)?;
                ss.write_file(path)
                    .with_context(|| format!("saving {}", path.display()))?;
            }
            Task::SaveMeshes { dir } => {
                let ss = require(&mut state, task)?;
                ss.save_meshes(dir).context("saving meshes")?;
            }
            Task::IndexBorders => {
                let ss = require(&mut state, task)?;
                ss.index_borders().context("indexing borders")?;
                if verbose {
                    eprintln!("  {} {} borders", "Indexed".green(), ss.borders().len());
                }
            }
            Task::SimplifyBorders => {
                let ss = require(&mut state, task)?;
                let result = ss.simplify_borders(&SimplifyParams::default());
                if verbose {
                    eprintln!(
                        "  {} {} collapses ({} rejected), {} vertices removed",
                        "Performed".green(),
                        result.collapses_performed,
                        result.collapses_rejected,
                        result.vertices_removed
                    );
                }
            }
            Task::ReloadVertices { dir } => {
                let ss = require(&mut state, task)?;
                ss.reload_vertices(dir).context("reloading vertices")?;
            }
            Task::CreateRegion { shapes, output } => {
                let ss = require(&mut state, task)?;
                let region = ss.compose_region(shapes).context("composing region")?;
                shapeset::io::write_obj(&region.mesh, output)
                    .with_context(|| format!("writing {}", output.display()))?;
                if verbose {
                    eprintln!(
                        "  {} region '{}' ({} faces)",
                        "Composed".green(),
                        region.mesh.name,
                        region.mesh.face_count()
                    );
                }
            }
            Task::CenterAndScale { max_dimension } => {
                let ss = require(&mut state, task)?;
                ss.scale_and_center(*max_dimension);
            }
        }
    }

    Ok(())
}

fn require<'a>(state: &'a mut Option<ShapeSet>, task: &Task) -> Result<&'a mut ShapeSet> {
    state.as_mut().ok_or_else(|| {
        anyhow::anyhow!(
            "task '{}' needs a shape set; run 'create' or 'load' first",
            task.name()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_a_full_pipeline() {
        let tasks = parse_tasks(&strings(&[
            "create",
            "meshes/",
            "labels.json",
            "index-borders",
            "simplify-borders",
            "save",
            "out.json",
        ]))
        .unwrap();
        assert_eq!(tasks.len(), 4);
        assert!(matches!(tasks[0], Task::Create { .. }));
        assert!(matches!(tasks[1], Task::IndexBorders));
        assert!(matches!(tasks[2], Task::SimplifyBorders));
        assert!(matches!(tasks[3], Task::Save { .. }));
    }

    #[test]
    fn parses_region_shape_ids() {
        let tasks = parse_tasks(&strings(&["create-region", "1,2,5", "out.obj"])).unwrap();
        let Task::CreateRegion { shapes, .. } = &tasks[0] else {
            panic!("expected create-region");
        };
        assert_eq!(shapes, &[ShapeId(1), ShapeId(2), ShapeId(5)]);
    }

    #[test]
    fn rejects_unknown_tasks_and_missing_args() {
        assert!(parse_tasks(&strings(&["frobnicate"])).is_err());
        assert!(parse_tasks(&strings(&["load"])).is_err());
        assert!(parse_tasks(&strings(&["create-region", "1,x", "out.obj"])).is_err());
    }

    #[test]
    fn tasks_requiring_state_fail_without_it() {
        let tasks = parse_tasks(&strings(&["index-borders"])).unwrap();
        assert!(run_tasks(&tasks, false).is_err());
    }
}
