//! Text reports for `mdl info`, `mdl bones` and `mdl sequences`

use anyhow::Result;
use goldsrc_mdl::{Mdl, build_clips};
use std::io::Write;

/// Header summary, section counts, body parts and warnings.
pub fn write_info(mdl: &Mdl, out: &mut impl Write) -> Result<()> {
    let header = &mdl.header;
    writeln!(out, "name:        {}", header.name)?;
    writeln!(out, "version:     {}", header.version)?;
    writeln!(out, "file size:   {}", header.file_size)?;
    writeln!(out, "bones:       {}", mdl.bones.len())?;
    writeln!(out, "textures:    {}", mdl.textures.len())?;
    writeln!(out, "body parts:  {}", mdl.body_parts.len())?;
    writeln!(out, "sequences:   {}", mdl.sequences.len())?;
    writeln!(out, "triangles:   {}", mdl.triangle_count())?;

    for (index, part) in mdl.body_parts.iter().enumerate() {
        writeln!(out, "body part {index}: {}", part.name)?;
        for model in &part.models {
            writeln!(
                out,
                "  model {}: {} vertices, {} meshes, {} triangles",
                model.name,
                model.vertices.len(),
                model.meshes.len(),
                model.triangle_count()
            )?;
        }
    }

    for (index, texture) in mdl.textures.iter().enumerate() {
        writeln!(
            out,
            "texture {index}: {} {}x{} flags={:#x} ({:?})",
            texture.name,
            texture.width,
            texture.height,
            texture.flags.bits(),
            texture.image.source
        )?;
    }

    if mdl.warnings.is_empty() {
        writeln!(out, "warnings:    none")?;
    } else {
        writeln!(out, "warnings:    {}", mdl.warnings.len())?;
        for warning in &mdl.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }
    Ok(())
}

/// Skeleton tree, depth first, one indented line per joint.
pub fn write_bones(mdl: &Mdl, out: &mut impl Write) -> Result<()> {
    let skeleton = &mdl.skeleton;
    if skeleton.is_empty() {
        writeln!(out, "(no bones)")?;
        return Ok(());
    }
    for index in skeleton.depth_first() {
        let Some(joint) = skeleton.get(index) else {
            continue;
        };
        let local = mdl.bones[index].position;
        let world = joint.world.w_axis.truncate();
        writeln!(
            out,
            "{:indent$}[{index}] {}  local=({:.3}, {:.3}, {:.3}) world=({:.3}, {:.3}, {:.3})",
            "",
            joint.name,
            local.x,
            local.y,
            local.z,
            world.x,
            world.y,
            world.z,
            indent = skeleton.depth(index) * 2
        )?;
    }
    Ok(())
}

/// One line per sequence.
pub fn write_sequences(mdl: &Mdl, out: &mut impl Write) -> Result<()> {
    if mdl.sequences.is_empty() {
        writeln!(out, "(no sequences)")?;
        return Ok(());
    }
    let clips = build_clips(&mdl.sequences, &mdl.skeleton);
    for (index, (sequence, clip)) in mdl.sequences.iter().zip(&clips).enumerate() {
        writeln!(
            out,
            "[{index}] {}  fps={} frames={} duration={:.2}s looping={} events={} tracks={}",
            sequence.name,
            sequence.fps,
            sequence.frame_count,
            clip.duration,
            sequence.is_looping(),
            sequence.events.len(),
            clip.tracks.len()
        )?;
    }
    Ok(())
}
