//! Show EDL information.

use std::path::PathBuf;

use retrack_edl::{LoadedEdl, TrackRole};

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let loaded =
        LoadedEdl::load(&path).map_err(|e| anyhow::anyhow!("Failed to load EDL: {e}"))?;

    let edl = &loaded.edl;

    println!("EDL: {}", edl.name);
    println!("  Version: {}", edl.version);
    println!("  Total duration: {:.3}s", edl.total_secs());
    println!();

    println!("Resources: {}", edl.resources.len());
    for resource in &edl.resources {
        println!(
            "  {} -> {} ({:.1}s)",
            resource.id,
            resource.path.display(),
            resource.duration_secs
        );
    }
    println!();

    println!("Tracks: {}", edl.tracks.len());
    for track in &edl.tracks {
        let role = match track.role {
            TrackRole::Primary => "primary",
            TrackRole::Secondary => "secondary",
        };
        println!(
            "  {} ({role}{}): {} clips",
            track.title,
            if track.mute { ", muted" } else { "" },
            track.clips.len()
        );
        for (i, clip) in track.clips.iter().enumerate() {
            let mut notes = Vec::new();
            if clip.mute {
                notes.push("mute".to_string());
            }
            if clip.is_speed_adjusted() {
                notes.push(format!("{:.2}x", clip.speed_factor()));
            }
            let notes = if notes.is_empty() {
                String::new()
            } else {
                format!(" [{}]", notes.join(", "))
            };
            println!(
                "    {i}: {:.3}s-{:.3}s from {} @ {:.3}s{notes}",
                clip.timeline_start_secs,
                clip.timeline_end_secs(),
                clip.resource_id,
                clip.source_start_secs
            );
        }
    }
    println!();

    println!(
        "Primary clips: {} muted, {} speed-adjusted",
        edl.muted_clip_count(),
        edl.speed_adjusted_clip_count()
    );

    Ok(())
}
