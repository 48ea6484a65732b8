//! Animation command implementations

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use glam::EulerRot;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use s2_anim::{
    AnimationClip, DecodeOptions, PoseBuffer, PoseComposer, Skeleton, sample_matrices_flat,
};

#[derive(Args)]
pub struct ResourceArgs {
    /// Model data (JSON) holding `m_modelSkeleton`
    #[arg(short, long)]
    pub model: PathBuf,

    /// Animation data (JSON) holding `m_animArray`
    #[arg(short, long)]
    pub animation: PathBuf,

    /// Decode key (JSON); defaults to the animation's `m_decodeKey`
    #[arg(short = 'k', long)]
    pub decode_key: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum AnimCommands {
    /// List the clips of an animation resource
    Info {
        #[command(flatten)]
        resources: ResourceArgs,

        /// Show per-clip movement records
        #[arg(short, long)]
        detailed: bool,
    },

    /// Display a model's bone hierarchy
    Bones {
        /// Model data (JSON) holding `m_modelSkeleton`
        model: PathBuf,
    },

    /// Print skinning matrices of a clip at a point in time
    Sample {
        #[command(flatten)]
        resources: ResourceArgs,

        /// Clip name (first clip when omitted)
        #[arg(short, long)]
        clip: Option<String>,

        /// Playback time in seconds
        #[arg(short, long, default_value = "0")]
        time: f32,

        /// Print matrices as a flat JSON array
        #[arg(long)]
        json: bool,
    },

    /// Print the root motion travelled between two times
    Motion {
        #[command(flatten)]
        resources: ResourceArgs,

        /// Clip name (first clip when omitted)
        #[arg(short, long)]
        clip: Option<String>,

        /// Start time in seconds
        #[arg(long, default_value = "0")]
        from: f32,

        /// End time in seconds
        #[arg(long)]
        to: f32,
    },
}

pub fn execute(cmd: AnimCommands) -> Result<()> {
    match cmd {
        AnimCommands::Info {
            resources,
            detailed,
        } => handle_info(&resources, detailed),
        AnimCommands::Bones { model } => handle_bones(&model),
        AnimCommands::Sample {
            resources,
            clip,
            time,
            json,
        } => handle_sample(&resources, clip.as_deref(), time, json),
        AnimCommands::Motion {
            resources,
            clip,
            from,
            to,
        } => handle_motion(&resources, clip.as_deref(), from, to),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON from {}", path.display()))
}

/// Decode key from its own file, or embedded in the animation data
fn resolve_decode_key(path: Option<&Path>, animation: &Value) -> Result<Value> {
    if let Some(path) = path {
        return read_json(path);
    }

    match animation.get("m_decodeKey") {
        Some(key) => Ok(key.clone()),
        None => bail!("Animation data has no m_decodeKey; pass --decode-key"),
    }
}

fn load(resources: &ResourceArgs) -> Result<(Skeleton, Vec<AnimationClip>)> {
    let model = read_json(&resources.model)?;
    let animation = read_json(&resources.animation)?;
    let decode_key = resolve_decode_key(resources.decode_key.as_deref(), &animation)?;

    let skeleton = Skeleton::from_model_data(&model)
        .with_context(|| format!("Failed to build skeleton from {}", resources.model.display()))?;
    log::info!("Loaded skeleton with {} bones", skeleton.len());

    let clips =
        AnimationClip::all_from_data(&animation, &decode_key, &skeleton, &DecodeOptions::default())
            .with_context(|| format!("Failed to decode {}", resources.animation.display()))?;

    Ok((skeleton, clips))
}

fn select_clip<'a>(clips: &'a [AnimationClip], name: Option<&str>) -> Result<&'a AnimationClip> {
    match name {
        Some(name) => clips
            .iter()
            .find(|c| c.name == name)
            .with_context(|| format!("No clip named '{name}'")),
        None => clips.first().context("Animation data contains no clips"),
    }
}

fn handle_info(resources: &ResourceArgs, detailed: bool) -> Result<()> {
    let (skeleton, clips) = load(resources)?;

    println!("=== Animation Information ===");
    println!("Bones: {} ({} skinned)", skeleton.len(), skeleton.render_bone_count());
    println!("Clips: {}", clips.len());

    for clip in &clips {
        let mut flags = Vec::new();
        if clip.flags.looping {
            flags.push("looping");
        }
        if clip.flags.hidden {
            flags.push("hidden");
        }
        if clip.flags.delta {
            flags.push("delta");
        }
        if clip.flags.worldspace {
            flags.push("worldspace");
        }

        println!(
            "\n  {}: {} frames @ {} fps ({:.3}s) [{}]",
            clip.name,
            clip.frame_count,
            clip.fps,
            clip.duration(),
            flags.join(", ")
        );

        if detailed && clip.has_movement() {
            println!("    Movement:");
            for record in &clip.movements {
                println!(
                    "      until frame {:>4}: position {:?}, yaw {:.2}°",
                    record.end_frame, record.position, record.angle
                );
            }
        }
    }

    Ok(())
}

fn handle_bones(model: &Path) -> Result<()> {
    let data = read_json(model)?;
    let skeleton = Skeleton::from_model_data(&data)
        .with_context(|| format!("Failed to build skeleton from {}", model.display()))?;

    println!("=== Skeleton ({} bones) ===", skeleton.len());
    for &root in skeleton.roots() {
        print_bone(&skeleton, root, 0);
    }

    Ok(())
}

fn print_bone(skeleton: &Skeleton, index: usize, depth: usize) {
    let Some(bone) = skeleton.bone(index) else {
        return;
    };

    let render = bone
        .render_index
        .map_or_else(|| "-".to_string(), |r| r.to_string());
    println!(
        "{}{} [render {}] at {:?}",
        "  ".repeat(depth),
        bone.name,
        render,
        bone.position
    );

    for &child in &bone.children {
        print_bone(skeleton, child, depth + 1);
    }
}

fn handle_sample(resources: &ResourceArgs, clip: Option<&str>, time: f32, json: bool) -> Result<()> {
    let (skeleton, clips) = load(resources)?;
    let clip = select_clip(&clips, clip)?;

    if json {
        let flat = sample_matrices_flat(clip, &skeleton, time);
        println!("{}", serde_json::to_string(&flat)?);
        return Ok(());
    }

    let frame = clip.sample(time);
    let mut buffer = PoseBuffer::for_skeleton(&skeleton);
    PoseComposer::new(&skeleton).compose(&frame, &mut buffer);

    println!("=== {} @ {:.3}s ===", clip.name, time);
    for bone in skeleton.bones() {
        let Some(render) = bone.render_index else {
            continue;
        };
        let world = buffer.world_matrices()[bone.index];
        let skinning = buffer.skinning_matrices()[render];
        println!("{:>4} {}", render, bone.name);
        println!("     origin   {:?}", world.w_axis.truncate());
        println!("     skinning {:?}", skinning.to_cols_array());
    }

    Ok(())
}

fn handle_motion(resources: &ResourceArgs, clip: Option<&str>, from: f32, to: f32) -> Result<()> {
    let (_, clips) = load(resources)?;
    let clip = select_clip(&clips, clip)?;

    if !clip.has_movement() {
        println!("Clip '{}' has no root motion", clip.name);
        return Ok(());
    }

    let delta = clip.root_motion_delta(from, to);
    let (_, rotation, translation) = delta.to_scale_rotation_translation();
    let (_, _, yaw) = rotation.to_euler(EulerRot::XYZ);

    println!("=== {} root motion {:.3}s -> {:.3}s ===", clip.name, from, to);
    println!("Translation: {translation:?}");
    println!("Yaw: {:.2}°", yaw.to_degrees());

    Ok(())
}
